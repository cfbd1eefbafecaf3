//! Vertex buffer resource.

use parking_lot::{RwLock, RwLockReadGuard};

use crate::change_queue::ChangeQueue;
use crate::types::StorageMode;

use super::{BufferData, ResourceId};

/// A range of elements edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataRange {
    /// First edited element.
    pub offset: usize,
    /// Number of edited elements.
    pub len: usize,
}

impl DataRange {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Clip the range to an array of `total` elements.
    pub fn clamped(&self, total: usize) -> Self {
        let offset = self.offset.min(total);
        Self {
            offset,
            len: self.len.min(total - offset),
        }
    }
}

/// Current contents of a vertex buffer, as seen under its lock.
#[derive(Debug)]
pub struct VertexBufferState {
    data: BufferData,
    storage_mode: StorageMode,
}

impl VertexBufferState {
    pub fn data(&self) -> &BufferData {
        &self.data
    }

    /// Storage mode requested by the application.
    pub fn storage_mode(&self) -> StorageMode {
        self.storage_mode
    }
}

/// Vertex attribute or index data, synchronized to a device buffer.
#[derive(Debug)]
pub struct VertexBuffer {
    id: ResourceId,
    state: RwLock<VertexBufferState>,
    changes: ChangeQueue<DataRange>,
}

impl VertexBuffer {
    pub fn new(data: BufferData, storage_mode: StorageMode) -> Self {
        Self::with_history_capacity(data, storage_mode, ChangeQueue::<DataRange>::DEFAULT_CAPACITY)
    }

    /// Create a buffer whose change log retains at most `capacity` edits.
    pub fn with_history_capacity(data: BufferData, storage_mode: StorageMode, capacity: usize) -> Self {
        Self {
            id: ResourceId::next(),
            state: RwLock::new(VertexBufferState { data, storage_mode }),
            changes: ChangeQueue::with_capacity(capacity),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Edit log of this buffer.
    pub fn changes(&self) -> &ChangeQueue<DataRange> {
        &self.changes
    }

    /// Lock the buffer for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, VertexBufferState> {
        self.state.read()
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.state.read().storage_mode
    }

    pub fn set_storage_mode(&self, mode: StorageMode) {
        let mut state = self.state.write();
        if state.storage_mode != mode {
            state.storage_mode = mode;
            self.changes.touch();
        }
    }

    /// Replace the data wholesale.
    pub fn set_data(&self, data: BufferData) {
        let mut state = self.state.write();
        state.data = data;
        self.changes.touch();
    }

    /// Copy `values` over the elements starting at `offset`.
    ///
    /// Values past the end of the buffer are dropped. Returns the number of
    /// elements written, which is zero if the buffer has no bytes.
    pub fn write<T: bytemuck::Pod>(&self, offset: usize, values: &[T]) -> usize {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        let mut state = self.state.write();
        let element_size = state.data.data_type().byte_size();
        let range = DataRange::new(offset, bytes.len() / element_size).clamped(state.data.len());
        let (start, end) = state.data.clamped_byte_range(range.offset, range.len);
        let Some(target) = state.data.bytes_mut() else {
            return 0;
        };
        target[start..end].copy_from_slice(&bytes[..end - start]);
        self.changes.record_edit(range);
        range.len
    }

    /// Edit elements in place and record the edited range.
    ///
    /// `edit` receives the bytes of the range clamped to the buffer.
    pub fn modify(&self, range: DataRange, edit: impl FnOnce(&mut [u8])) {
        let mut state = self.state.write();
        let range = range.clamped(state.data.len());
        let (start, end) = state.data.clamped_byte_range(range.offset, range.len);
        if let Some(bytes) = state.data.bytes_mut() {
            edit(&mut bytes[start..end]);
        }
        self.changes.record_edit(range);
    }

    /// Record that a range changed without touching the bytes.
    ///
    /// The range is recorded as given; drivers clamp it when syncing.
    pub fn mark_dirty(&self, range: DataRange) {
        let _state = self.state.write();
        self.changes.record_edit(range);
    }
}

static_assertions::assert_impl_all!(VertexBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_clamping() {
        assert_eq!(DataRange::new(2, 10).clamped(5), DataRange::new(2, 3));
        assert_eq!(DataRange::new(8, 1).clamped(5), DataRange::new(5, 0));
        assert_eq!(DataRange::new(0, 5).clamped(5), DataRange::new(0, 5));
    }

    #[test]
    fn test_write_records_edit() {
        let buffer = VertexBuffer::new(BufferData::from_f32(&[0.0; 4]), StorageMode::GpuDynamic);
        let version = buffer.changes().version();
        let key = buffer.read().data().key();

        assert_eq!(buffer.write(2, &[5.0f32, 6.0, 7.0]), 2);

        let state = buffer.read();
        assert_eq!(state.data().key(), key);
        assert_eq!(
            state.data().bytes(),
            Some(bytemuck::cast_slice::<f32, u8>(&[0.0, 0.0, 5.0, 6.0]))
        );
        assert_eq!(buffer.changes().changes_since(version), vec![DataRange::new(2, 2)]);
    }

    #[test]
    fn test_set_data_touches() {
        let buffer = VertexBuffer::new(BufferData::from_u16(&[0, 1, 2]), StorageMode::GpuStatic);
        let version = buffer.changes().version();
        buffer.set_data(BufferData::from_u16(&[0, 1, 2, 3]));
        assert!(buffer.changes().is_version_stale(version));
        assert_eq!(buffer.read().data().len(), 4);

        let version = buffer.changes().version();
        buffer.set_storage_mode(StorageMode::GpuStatic);
        assert!(!buffer.changes().is_version_stale(version));
        buffer.set_storage_mode(StorageMode::InMemory);
        assert!(buffer.changes().is_version_stale(version));
    }

    #[test]
    fn test_modify_without_bytes() {
        let buffer = VertexBuffer::new(
            BufferData::empty(crate::types::DataType::Float, 8),
            StorageMode::GpuStatic,
        );
        let mut called = false;
        buffer.modify(DataRange::new(0, 2), |_| called = true);
        assert!(!called);
        assert_eq!(buffer.changes().len(), 1);
    }
}
