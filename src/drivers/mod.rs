//! Resource drivers.
//!
//! A driver knows how to realize one kind of [`Resource`] on the device. Drivers
//! are stateless and shared; everything they remember about a particular
//! resource lives in its [`ResourceHandle`], which the host creates once with
//! [`ResourceDriver::init`] and then passes to every later call.
//!
//! # Lifecycle
//!
//! ```text
//! init ──► update ──► update ──► ... ──► dispose
//!            ▲           │
//!            └── reset ◄─┘   (device lost its contents)
//! ```
//!
//! All four operations run on the thread that owns the device.

pub mod buffer;
pub mod shader;
pub mod texture;

pub use buffer::{BufferHandle, VertexBufferDriver};
pub use shader::{ShaderHandle, ShaderProgramDriver};
pub use texture::{TextureDriver, TextureHandle};

use std::collections::HashMap;
use std::sync::Arc;

use crate::change_queue::ChangeQueue;
use crate::context::DeviceContext;
use crate::error::{SyncError, SyncResult};
use crate::resources::{Resource, ResourceKind};

/// Device-side twin of one resource.
#[derive(Debug)]
pub enum ResourceHandle {
    Texture(TextureHandle),
    Buffer(BufferHandle),
    Shader(ShaderHandle),
}

impl ResourceHandle {
    /// Kind of resource this handle mirrors.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Texture(_) => ResourceKind::Texture,
            Self::Buffer(_) => ResourceKind::VertexBuffer,
            Self::Shader(_) => ResourceKind::Shader,
        }
    }

    /// Version of the resource's change queue at the end of the last successful sync.
    ///
    /// [`ChangeQueue::UNSYNCED`] until the first sync and after a reset.
    pub fn last_synced_version(&self) -> u64 {
        match self {
            Self::Texture(handle) => handle.last_synced_version(),
            Self::Buffer(handle) => handle.last_synced_version(),
            Self::Shader(handle) => handle.last_synced_version(),
        }
    }

    /// Returns true if a sync has completed since creation or the last reset.
    pub fn is_synced(&self) -> bool {
        self.last_synced_version() != ChangeQueue::<()>::UNSYNCED
    }

    pub fn as_texture(&self) -> Option<&TextureHandle> {
        match self {
            Self::Texture(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&BufferHandle> {
        match self {
            Self::Buffer(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_shader(&self) -> Option<&ShaderHandle> {
        match self {
            Self::Shader(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Synchronizes one kind of resource with the device.
pub trait ResourceDriver: Send + Sync {
    /// Kind of resource this driver handles.
    fn kind(&self) -> ResourceKind;

    /// Create a handle whose cached state forces a full sync on first update.
    fn init(&self, resource: &Resource) -> SyncResult<ResourceHandle>;

    /// Push pending changes of `resource` to the device.
    ///
    /// Returns an empty string when the device mirrors the resource exactly,
    /// or a description of the substitution made when it doesn't. With no
    /// pending changes this issues no device calls and returns the previous
    /// status. On error the handle's cached state is left as it was.
    fn update(
        &self,
        context: &mut dyn DeviceContext,
        resource: &Resource,
        handle: &mut ResourceHandle,
    ) -> SyncResult<String>;

    /// Forget everything synced so the next update repopulates the device
    /// objects. Device objects are kept.
    fn reset(&self, handle: &mut ResourceHandle);

    /// Delete every device object referenced by `handle`.
    fn dispose(&self, context: &mut dyn DeviceContext, handle: &mut ResourceHandle);
}

fn kind_mismatch(expected: ResourceKind, found: ResourceKind) -> SyncError {
    SyncError::KindMismatch { expected, found }
}

/// Drivers keyed by the kind of resource they handle.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<ResourceKind, Arc<dyn ResourceDriver>>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the texture, vertex buffer and shader drivers.
    pub fn with_default_drivers() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TextureDriver::new()));
        registry.register(Arc::new(VertexBufferDriver::new()));
        registry.register(Arc::new(ShaderProgramDriver::new()));
        registry
    }

    /// Register `driver` for its kind, returning the driver it replaces.
    pub fn register(&mut self, driver: Arc<dyn ResourceDriver>) -> Option<Arc<dyn ResourceDriver>> {
        self.drivers.insert(driver.kind(), driver)
    }

    /// The driver for `kind`.
    pub fn get(&self, kind: ResourceKind) -> SyncResult<&Arc<dyn ResourceDriver>> {
        self.drivers.get(&kind).ok_or(SyncError::NoDriver(kind))
    }

    /// Returns true if a driver is registered for `kind`.
    pub fn contains(&self, kind: ResourceKind) -> bool {
        self.drivers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("kinds", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

static_assertions::assert_impl_all!(DriverRegistry: Send, Sync);
