//! Client-side resources.
//!
//! Resources are the application's description of content that should exist on
//! the device. They are freely shared between threads: every mutation takes the
//! resource's write lock and records the edit in its [`ChangeQueue`] before the
//! lock is released, so a driver holding the read lock always sees a payload and
//! change history that agree with each other.
//!
//! [`ChangeQueue`]: crate::ChangeQueue

mod buffer;
mod data;
mod shader;
mod texture;

pub use buffer::*;
pub use data::*;
pub use shader::*;
pub use texture::*;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type tag selecting the driver responsible for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture,
    VertexBuffer,
    Shader,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Texture => "Texture",
            Self::VertexBuffer => "VertexBuffer",
            Self::Shader => "ShaderProgram",
        };
        f.write_str(name)
    }
}

/// A shared reference to any synchronizable resource.
#[derive(Debug, Clone)]
pub enum Resource {
    Texture(Arc<Texture>),
    VertexBuffer(Arc<VertexBuffer>),
    Shader(Arc<ShaderProgram>),
}

impl Resource {
    /// Identity of the underlying resource.
    pub fn id(&self) -> ResourceId {
        match self {
            Self::Texture(texture) => texture.id(),
            Self::VertexBuffer(buffer) => buffer.id(),
            Self::Shader(program) => program.id(),
        }
    }

    /// Kind tag of the underlying resource.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Texture(_) => ResourceKind::Texture,
            Self::VertexBuffer(_) => ResourceKind::VertexBuffer,
            Self::Shader(_) => ResourceKind::Shader,
        }
    }
}

impl From<Arc<Texture>> for Resource {
    fn from(texture: Arc<Texture>) -> Self {
        Self::Texture(texture)
    }
}

impl From<Arc<VertexBuffer>> for Resource {
    fn from(buffer: Arc<VertexBuffer>) -> Self {
        Self::VertexBuffer(buffer)
    }
}

impl From<Arc<ShaderProgram>> for Resource {
    fn from(program: Arc<ShaderProgram>) -> Self {
        Self::Shader(program)
    }
}

static_assertions::assert_impl_all!(Resource: Send, Sync);
