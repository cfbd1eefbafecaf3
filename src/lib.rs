//! # RedLilium Sync
//!
//! Keeps host-side GPU resources and their device-side counterparts in step.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`ChangeQueue`] - Versioned, bounded log of edits made to a resource
//! - [`Texture`], [`VertexBuffer`] and [`ShaderProgram`] - Host-side resources
//! - [`ResourceDriver`] - Per-kind synchronization with [`TextureDriver`],
//!   [`VertexBufferDriver`] and [`ShaderProgramDriver`]
//! - [`DeviceContext`] - The device seam, with a recording [`DummyDevice`] for testing
//! - [`ResourceManager`] - Handle bookkeeping and destruction from any thread
//!
//! Drivers push only what changed since the last sync, fall back to supported
//! formats and storage modes when the device lacks a feature, and report those
//! substitutions as a status string instead of failing.
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_sync::{BufferData, DummyDevice, Resource, ResourceManager, StorageMode};
//!
//! let manager = ResourceManager::with_default_drivers();
//! let buffer = manager.create_vertex_buffer(BufferData::from_f32(&[0.0; 12]), StorageMode::GpuStatic);
//! let resource = Resource::from(buffer.clone());
//!
//! let mut device = DummyDevice::new();
//! manager.update(&mut device, &resource);
//! buffer.write(3, &[1.0f32, 2.0, 3.0]);
//! manager.update(&mut device, &resource); // uploads three floats
//! ```

pub mod backend;
pub mod change_queue;
pub mod config;
pub mod context;
pub mod destroy;
pub mod drivers;
pub mod error;
pub mod manager;
pub mod resources;
pub mod types;

// Re-export main types for convenience
pub use backend::{DeviceCall, DummyDevice};
pub use change_queue::ChangeQueue;
pub use config::ManagerConfig;
pub use context::{
    BufferId, Capabilities, DeviceContext, ImageSpec, ProgramId, ShaderId, SubImageSpec,
    TextureId, VariableInfo,
};
pub use destroy::{Completion, DestructionGuard, DeviceTask, DeviceTaskQueue};
pub use drivers::{
    BufferHandle, DriverRegistry, ResourceDriver, ResourceHandle, ShaderHandle,
    ShaderProgramDriver, TextureDriver, TextureHandle, VertexBufferDriver,
};
pub use error::{DeviceError, SyncError, SyncResult};
pub use manager::{ResourceManager, ResourceStatus};
pub use resources::{
    BufferData, DataKey, DataRange, ImageRegion, MipmapRegion, Resource, ResourceId,
    ResourceKind, ShaderProgram, SurfaceOwner, Texture, TextureDescriptor, VertexBuffer,
};
pub use types::{
    BufferTarget, DataType, DepthCompare, Filter, ShaderStage, ShaderStages, StorageMode,
    TextureFormat, TextureParameters, TextureTarget, TextureTargets, WrapMode,
};

/// Sync library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the sync subsystem.
///
/// Only logs the version; call it once at startup if that is useful.
pub fn init() {
    log::info!("RedLilium Sync v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_registry() {
        let registry = DriverRegistry::with_default_drivers();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains(ResourceKind::Shader));
    }

    #[test]
    fn test_dummy_device() {
        let device = DummyDevice::new();
        assert_eq!(device.name(), "Dummy Device");
        assert!(device.calls().is_empty());
    }
}
