//! Synchronization error types.

use thiserror::Error;

use crate::resources::ResourceKind;

/// Errors reported by primitive device operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device refused to create an object.
    #[error("Failed to create device object: {0}")]
    ObjectCreationFailed(String),
    /// The device ran out of memory.
    #[error("Out of device memory")]
    OutOfMemory,
    /// The device context was lost.
    #[error("Device context lost")]
    ContextLost,
}

/// Unrecoverable failure of a driver update.
///
/// A resource whose update returned one of these should be treated as errored
/// until the application changes it. Advisory degradations are *not* errors;
/// they are reported through the status string of a successful update.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The device has no support for the requested configuration and no substitute exists.
    #[error("{0}")]
    Unsupported(String),
    /// The resource tried to change a property fixed by the object that owns it.
    #[error("{0}")]
    OwnerConflict(String),
    /// One or more shader stages failed to compile or are unsupported.
    #[error("{}", .0.join("; "))]
    Compile(Vec<String>),
    /// The shader program failed to link.
    #[error("Error linking program: {0}")]
    Link(String),
    /// A primitive device operation failed.
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// A resource, handle or driver of the wrong kind was supplied.
    #[error("Expected a {expected} but got a {found}")]
    KindMismatch {
        expected: ResourceKind,
        found: ResourceKind,
    },
    /// No driver is registered for the resource kind.
    #[error("No driver registered for {0}")]
    NoDriver(ResourceKind),
}

impl SyncError {
    /// Human-readable description of the failure.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::Unsupported("Depth textures are not supported".to_string());
        assert_eq!(err.message(), "Depth textures are not supported");

        let err = SyncError::Compile(vec![
            "Error compiling VERTEX shader: bad".to_string(),
            "Hardware does not support shader type: GEOMETRY".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Error compiling VERTEX shader: bad; Hardware does not support shader type: GEOMETRY"
        );
    }

    #[test]
    fn test_device_error_conversion() {
        let err: SyncError = DeviceError::OutOfMemory.into();
        assert_eq!(err, SyncError::Device(DeviceError::OutOfMemory));
        assert_eq!(err.to_string(), "Out of device memory");
    }

    #[test]
    fn test_kind_mismatch_display() {
        let err = SyncError::KindMismatch {
            expected: ResourceKind::Texture,
            found: ResourceKind::Shader,
        };
        assert_eq!(err.to_string(), "Expected a Texture but got a ShaderProgram");
    }
}
