//! Value types shared by resources, drivers and devices.

mod buffer;
mod shader;
mod texture;

pub use buffer::*;
pub use shader::*;
pub use texture::*;
