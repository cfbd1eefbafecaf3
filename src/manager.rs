//! Host-side bookkeeping of synchronized resources.
//!
//! The [`ResourceManager`] owns one lazily created handle per resource, picks
//! the driver for each resource from its [`DriverRegistry`], and turns driver
//! results into a [`ResourceStatus`]. Device-thread operations take the device
//! context explicitly; [`ResourceManager::destroy`] can be called from any
//! thread and is carried out on the next [`ResourceManager::process_pending`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::config::ManagerConfig;
use crate::context::DeviceContext;
use crate::destroy::{Completion, DestructionGuard, DeviceTaskQueue};
use crate::drivers::{DriverRegistry, ResourceHandle};
use crate::error::SyncError;
use crate::resources::{
    BufferData, Resource, ResourceId, ShaderProgram, Texture, TextureDescriptor, VertexBuffer,
};
use crate::types::StorageMode;

/// Outcome of the last synchronization of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    /// The device mirrors the resource exactly.
    Ready,
    /// Usable, with an unsupported feature substituted.
    Degraded(String),
    /// The last update failed; the resource must be changed before it can sync.
    Error(String),
    /// The device can not represent the resource at all.
    Unsupported(String),
    /// The device objects were released.
    Disposed,
}

impl ResourceStatus {
    /// Human-readable detail, empty for `Ready` and `Disposed`.
    pub fn message(&self) -> &str {
        match self {
            Self::Degraded(message) | Self::Error(message) | Self::Unsupported(message) => message,
            Self::Ready | Self::Disposed => "",
        }
    }

    /// Returns true if the resource can be used for rendering.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Ready | Self::Degraded(_))
    }

    fn from_update(result: &Result<String, SyncError>) -> Self {
        match result {
            Ok(status) if status.is_empty() => Self::Ready,
            Ok(status) => Self::Degraded(status.clone()),
            Err(SyncError::Unsupported(message)) => Self::Unsupported(message.clone()),
            Err(err) => Self::Error(err.message()),
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("READY"),
            Self::Degraded(message) => write!(f, "READY ({})", message),
            Self::Error(message) => write!(f, "ERROR ({})", message),
            Self::Unsupported(message) => write!(f, "UNSUPPORTED ({})", message),
            Self::Disposed => f.write_str("DISPOSED"),
        }
    }
}

struct Entry {
    resource: Resource,
    handle: Option<ResourceHandle>,
    guard: Arc<DestructionGuard>,
    status: ResourceStatus,
}

type Entries = Arc<Mutex<HashMap<ResourceId, Entry>>>;

/// Keeps every resource's device twin up to date.
///
/// # Example
///
/// ```ignore
/// let manager = ResourceManager::new(DriverRegistry::with_default_drivers(), ManagerConfig::default());
/// let texture = manager.create_texture(TextureDescriptor::new_2d(64, 64, TextureFormat::Rgba, DataType::UnsignedByte));
///
/// // device thread, every frame
/// manager.process_pending(&mut device);
/// let status = manager.update(&mut device, &Resource::from(texture.clone()));
/// ```
pub struct ResourceManager {
    registry: DriverRegistry,
    config: ManagerConfig,
    entries: Entries,
    tasks: DeviceTaskQueue,
    shut_down: AtomicBool,
}

impl ResourceManager {
    pub fn new(registry: DriverRegistry, config: ManagerConfig) -> Self {
        Self {
            registry,
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
            tasks: DeviceTaskQueue::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Create a manager with the built-in drivers and default configuration.
    pub fn with_default_drivers() -> Self {
        Self::new(DriverRegistry::with_default_drivers(), ManagerConfig::default())
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    // === Resource creation ===

    /// Create a texture using the configured history capacity.
    pub fn create_texture(&self, descriptor: TextureDescriptor) -> Arc<Texture> {
        Arc::new(Texture::with_history_capacity(
            descriptor,
            self.config.default_history_capacity,
        ))
    }

    /// Create a vertex buffer using the configured history capacity.
    pub fn create_vertex_buffer(&self, data: BufferData, mode: StorageMode) -> Arc<VertexBuffer> {
        Arc::new(VertexBuffer::with_history_capacity(
            data,
            mode,
            self.config.default_history_capacity,
        ))
    }

    /// Create an empty shader program using the configured history capacity.
    pub fn create_shader_program(&self) -> Arc<ShaderProgram> {
        Arc::new(ShaderProgram::with_history_capacity(
            self.config.default_history_capacity,
        ))
    }

    // === Device thread ===

    /// Sync `resource` with the device, creating its handle on first use.
    pub fn update(&self, context: &mut dyn DeviceContext, resource: &Resource) -> ResourceStatus {
        if self.shut_down.load(Ordering::Acquire) {
            return ResourceStatus::Disposed;
        }
        let mut entries = self.entries.lock();
        let entry = entries.entry(resource.id()).or_insert_with(|| Entry {
            resource: resource.clone(),
            handle: None,
            guard: Arc::new(DestructionGuard::new()),
            status: ResourceStatus::Ready,
        });
        if entry.guard.is_destroyed() {
            return ResourceStatus::Disposed;
        }

        let result = self.registry.get(resource.kind()).and_then(|driver| {
            let handle = match &mut entry.handle {
                Some(handle) => handle,
                slot => slot.insert(driver.init(resource)?),
            };
            driver.update(context, resource, handle)
        });

        let status = ResourceStatus::from_update(&result);
        if let Err(err) = &result {
            log::warn!("{} {}: update failed: {}", resource.kind(), resource.id(), err);
        }
        if status != entry.status {
            log::debug!(
                "{} {}: {} -> {}",
                resource.kind(),
                resource.id(),
                entry.status,
                status
            );
            entry.status = status.clone();
        }
        status
    }

    /// Force the next update of `resource` to resend everything.
    pub fn reset(&self, resource: &Resource) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&resource.id()) else {
            return;
        };
        if let (Some(handle), Ok(driver)) =
            (entry.handle.as_mut(), self.registry.get(resource.kind()))
        {
            driver.reset(handle);
        }
    }

    /// Reset every handle, e.g. after the device context was recreated.
    pub fn reset_all(&self) {
        let mut entries = self.entries.lock();
        for entry in entries.values_mut() {
            if let (Some(handle), Ok(driver)) =
                (entry.handle.as_mut(), self.registry.get(entry.resource.kind()))
            {
                driver.reset(handle);
            }
        }
    }

    /// Release the device objects of `resource` now.
    ///
    /// Returns false if the resource is unknown or was already released.
    pub fn dispose(&self, context: &mut dyn DeviceContext, resource: &Resource) -> bool {
        let guard = match self.entries.lock().get(&resource.id()) {
            Some(entry) => Arc::clone(&entry.guard),
            None => return false,
        };
        if !guard.try_claim() {
            return false;
        }
        dispose_entry(&self.entries, &self.registry, context, resource.id());
        true
    }

    /// Run destruction requests queued from other threads.
    ///
    /// Runs at most [`ManagerConfig::max_tasks_per_pass`] tasks. Returns the
    /// number of tasks run.
    pub fn process_pending(&self, context: &mut dyn DeviceContext) -> usize {
        self.tasks.run_pending(context, self.config.max_tasks_per_pass)
    }

    /// Stop the manager.
    ///
    /// Runs every queued request, then releases all live handles if
    /// [`ManagerConfig::dispose_on_shutdown`] is set. Resources whose
    /// destruction was requested are released either way. Later destruction
    /// requests complete immediately without doing anything.
    pub fn shutdown(&self, context: &mut dyn DeviceContext) {
        {
            // destroy checks the flag and submits under the same lock
            let _entries = self.entries.lock();
            if self.shut_down.swap(true, Ordering::AcqRel) {
                return;
            }
        }
        self.tasks.run_pending(context, 0);
        self.tasks.shutdown();

        let dispose_all = self.config.dispose_on_shutdown;
        let remaining: Vec<ResourceId> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, entry)| {
                entry.guard.is_destroyed() || (dispose_all && entry.guard.try_claim())
            })
            .map(|(id, _)| *id)
            .collect();
        if !remaining.is_empty() {
            log::debug!("Resource manager: disposing {} resources on shutdown", remaining.len());
        }
        for id in remaining {
            dispose_entry(&self.entries, &self.registry, context, id);
        }
    }

    // === Any thread ===

    /// Request release of `resource` from any thread.
    ///
    /// Only the first request for a resource does anything; the teardown runs
    /// on the device thread during [`process_pending`](Self::process_pending).
    /// Unknown resources, repeated requests and requests after shutdown return
    /// an already completed [`Completion`].
    pub fn destroy(&self, resource: &Resource) -> Completion {
        let id = resource.id();
        let entries = self.entries.lock();
        let Some(entry) = entries.get(&id) else {
            return Completion::completed();
        };
        if self.shut_down.load(Ordering::Acquire) || !entry.guard.try_claim() {
            return Completion::completed();
        }

        log::trace!("{} {}: destruction queued", resource.kind(), id);
        let shared = Arc::clone(&self.entries);
        let registry = self.registry.clone();
        let completion = self.tasks.submit(Box::new(move |context: &mut dyn DeviceContext| {
            dispose_entry(&shared, &registry, context, id);
        }));
        drop(entries);
        completion
    }

    /// Status of the last update of the resource with `id`.
    pub fn status(&self, id: ResourceId) -> Option<ResourceStatus> {
        let entries = self.entries.lock();
        let entry = entries.get(&id)?;
        if entry.guard.is_destroyed() {
            Some(ResourceStatus::Disposed)
        } else {
            Some(entry.status.clone())
        }
    }

    /// Inspect the handle of the resource with `id`.
    pub fn with_handle<R>(&self, id: ResourceId, f: impl FnOnce(&ResourceHandle) -> R) -> Option<R> {
        self.entries.lock().get(&id)?.handle.as_ref().map(f)
    }

    /// Number of tracked resources.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of destruction requests waiting for the device thread.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.pending()
    }
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("resources", &self.len())
            .field("tasks", &self.tasks)
            .finish()
    }
}

/// Remove the entry for `id` and dispose its handle. The caller must have
/// claimed the entry's guard.
fn dispose_entry(
    entries: &Mutex<HashMap<ResourceId, Entry>>,
    registry: &DriverRegistry,
    context: &mut dyn DeviceContext,
    id: ResourceId,
) {
    let Some(entry) = entries.lock().remove(&id) else {
        return;
    };
    let Entry {
        resource,
        handle,
        ..
    } = entry;
    let Some(mut handle) = handle else {
        return;
    };
    match registry.get(resource.kind()) {
        Ok(driver) => {
            log::trace!("{} {}: disposing", resource.kind(), id);
            driver.dispose(context, &mut handle);
        }
        Err(err) => log::warn!("{} {}: cannot dispose: {}", resource.kind(), id, err),
    }
}

static_assertions::assert_impl_all!(ResourceManager: Send, Sync);
