//! Vertex buffer driver.
//!
//! Buffers live either in a device buffer object or, when the device has no
//! buffer objects, in a host-side copy the renderer reads at draw time. A
//! wholesale data replacement, a storage mode switch or lost history pushes the
//! whole array; otherwise only the edited element ranges are written.

use crate::change_queue::ChangeQueue;
use crate::context::{BufferId, Capabilities, DeviceContext};
use crate::error::SyncResult;
use crate::resources::{DataKey, Resource, ResourceKind, VertexBuffer};
use crate::types::{BufferTarget, DataType, StorageMode};

use super::{ResourceDriver, ResourceHandle, kind_mismatch};

/// Device-side state of one vertex buffer.
#[derive(Debug)]
pub struct BufferHandle {
    buffer: Option<BufferId>,
    /// Effective storage mode of the last sync.
    mode: Option<StorageMode>,
    data_type: DataType,
    len: usize,
    /// Host copy: the whole array in memory mode, a mirror in dynamic mode.
    host: Option<Vec<u8>>,
    key: Option<DataKey>,
    last_synced_version: u64,
    status: String,
}

impl BufferHandle {
    fn new() -> Self {
        Self {
            buffer: None,
            mode: None,
            data_type: DataType::Float,
            len: 0,
            host: None,
            key: None,
            last_synced_version: ChangeQueue::<()>::UNSYNCED,
            status: String::new(),
        }
    }

    /// Device buffer object, if the data lives on the device.
    pub fn buffer_id(&self) -> Option<BufferId> {
        self.buffer
    }

    /// Storage mode in effect after the last sync.
    pub fn effective_mode(&self) -> Option<StorageMode> {
        self.mode
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of synced elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Binding point the data is written through.
    pub fn target(&self) -> BufferTarget {
        BufferTarget::for_data_type(self.data_type)
    }

    /// Host-side bytes, kept for in-memory and dynamic buffers.
    pub fn host_data(&self) -> Option<&[u8]> {
        self.host.as_deref()
    }

    pub fn last_synced_version(&self) -> u64 {
        self.last_synced_version
    }
}

/// Driver for [`VertexBuffer`] resources.
#[derive(Debug, Default)]
pub struct VertexBufferDriver;

impl VertexBufferDriver {
    pub fn new() -> Self {
        Self
    }

    /// Create a handle for `buffer`.
    pub fn init_buffer(&self, _buffer: &VertexBuffer) -> BufferHandle {
        BufferHandle::new()
    }

    /// Sync `buffer` into `handle`.
    pub fn update_buffer(
        &self,
        context: &mut dyn DeviceContext,
        buffer: &VertexBuffer,
        handle: &mut BufferHandle,
    ) -> SyncResult<String> {
        let state = buffer.read();
        let changes = buffer.changes();
        let requested = state.storage_mode();
        let mode = effective_mode(context.capabilities(), requested);
        let data = state.data();

        let mode_changed = handle.mode != Some(mode);
        if !mode_changed && !changes.is_version_stale(handle.last_synced_version) {
            return Ok(handle.status.clone());
        }

        let target = BufferTarget::for_data_type(data.data_type());
        let full = mode_changed
            || handle.key != Some(data.key())
            || changes.has_lost_changes(handle.last_synced_version);

        if full {
            if mode.is_gpu() {
                let id = match handle.buffer {
                    Some(id) => id,
                    None => context.create_buffer()?,
                };
                handle.buffer = Some(id);
                log::trace!(
                    "Buffer {}: full push of {} elements ({})",
                    buffer.id(),
                    data.len(),
                    mode
                );
                context.buffer_data(id, target, data.byte_len(), data.bytes(), mode);
                handle.host = match mode {
                    StorageMode::GpuDynamic => Some(host_copy(data.bytes(), data.byte_len())),
                    _ => None,
                };
            } else {
                if let Some(id) = handle.buffer.take() {
                    log::trace!("Buffer {}: releasing device buffer", buffer.id());
                    context.delete_buffer(id);
                }
                handle.host = Some(host_copy(data.bytes(), data.byte_len()));
            }
        } else {
            let element_size = data.data_type().byte_size();
            for range in changes.changes_since(handle.last_synced_version) {
                let range = range.clamped(data.len());
                let Some(bytes) = data.element_bytes(range.offset, range.len) else {
                    continue;
                };
                if bytes.is_empty() {
                    continue;
                }
                let byte_offset = range.offset * element_size;

                if let Some(host) = handle.host.as_mut() {
                    let end = (byte_offset + bytes.len()).min(host.len());
                    let start = byte_offset.min(end);
                    host[start..end].copy_from_slice(&bytes[..end - start]);
                }
                if let Some(id) = handle.buffer.filter(|_| mode.is_gpu()) {
                    log::trace!(
                        "Buffer {}: writing elements {}..{}",
                        buffer.id(),
                        range.offset,
                        range.offset + range.len
                    );
                    context.buffer_sub_data(id, target, byte_offset, bytes);
                }
            }
        }

        handle.mode = Some(mode);
        handle.key = Some(data.key());
        handle.data_type = data.data_type();
        handle.len = data.len();
        handle.last_synced_version = changes.version();
        handle.status = if mode != requested {
            format!(
                "Storage mode {} is not supported, using {} instead",
                requested, mode
            )
        } else {
            String::new()
        };
        Ok(handle.status.clone())
    }

    /// Forget synced contents; the device buffer is kept.
    pub fn reset_buffer(&self, handle: &mut BufferHandle) {
        handle.mode = None;
        handle.key = None;
        handle.last_synced_version = ChangeQueue::<()>::UNSYNCED;
        handle.status.clear();
    }

    /// Delete the device buffer and drop the host copy.
    pub fn dispose_buffer(&self, context: &mut dyn DeviceContext, handle: &mut BufferHandle) {
        if let Some(id) = handle.buffer.take() {
            context.delete_buffer(id);
        }
        handle.host = None;
        self.reset_buffer(handle);
    }
}

impl ResourceDriver for VertexBufferDriver {
    fn kind(&self) -> ResourceKind {
        ResourceKind::VertexBuffer
    }

    fn init(&self, resource: &Resource) -> SyncResult<ResourceHandle> {
        match resource {
            Resource::VertexBuffer(buffer) => Ok(ResourceHandle::Buffer(self.init_buffer(buffer))),
            other => Err(kind_mismatch(ResourceKind::VertexBuffer, other.kind())),
        }
    }

    fn update(
        &self,
        context: &mut dyn DeviceContext,
        resource: &Resource,
        handle: &mut ResourceHandle,
    ) -> SyncResult<String> {
        match (resource, handle) {
            (Resource::VertexBuffer(buffer), ResourceHandle::Buffer(handle)) => {
                self.update_buffer(context, buffer, handle)
            }
            (Resource::VertexBuffer(_), handle) => {
                Err(kind_mismatch(ResourceKind::VertexBuffer, handle.kind()))
            }
            (other, _) => Err(kind_mismatch(ResourceKind::VertexBuffer, other.kind())),
        }
    }

    fn reset(&self, handle: &mut ResourceHandle) {
        if let ResourceHandle::Buffer(handle) = handle {
            self.reset_buffer(handle);
        }
    }

    fn dispose(&self, context: &mut dyn DeviceContext, handle: &mut ResourceHandle) {
        if let ResourceHandle::Buffer(handle) = handle {
            self.dispose_buffer(context, handle);
        }
    }
}

/// Storage mode actually used for `requested` on a device with `capabilities`.
pub fn effective_mode(capabilities: &Capabilities, requested: StorageMode) -> StorageMode {
    if requested.is_gpu() && !capabilities.buffer_objects {
        StorageMode::InMemory
    } else {
        requested
    }
}

fn host_copy(bytes: Option<&[u8]>, byte_len: usize) -> Vec<u8> {
    bytes.map_or_else(|| vec![0; byte_len], <[u8]>::to_vec)
}
