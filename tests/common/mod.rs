//! Common utilities for synchronization integration tests.
//!
//! Shared device profiles and resource builders used across the test files.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use redlilium_sync::{
    BufferData, Capabilities, DataType, DeviceCall, DummyDevice, ShaderProgram, StorageMode,
    Texture, TextureDescriptor, TextureFormat, VertexBuffer,
};

pub const VERTEX_SOURCE: &str = "in vec3 position;\nin vec2 uv;\nuniform mat4 mvp;\nvoid main() {}";
pub const GEOMETRY_SOURCE: &str = "uniform float width;\nvoid main() {}";
pub const FRAGMENT_SOURCE: &str = "uniform sampler2D albedo;\nvoid main() {}";

static LOGGER: Once = Once::new();

/// Route `log` output through the test harness once per process.
pub fn init_logger() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

// ============================================================================
// Device profiles
// ============================================================================

/// Device profiles the drivers must handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Everything supported.
    Full,
    /// Fixed-function era hardware: no buffer objects, no GLSL, no float textures.
    Legacy,
    /// Shaders and buffer objects, but no float textures or geometry shaders.
    Embedded,
}

impl Profile {
    pub fn capabilities(self) -> Capabilities {
        match self {
            Profile::Full => Capabilities::default(),
            Profile::Legacy => Capabilities::legacy(),
            Profile::Embedded => Capabilities::default()
                .with_unclamped_float_textures(false)
                .with_shader_stages(
                    redlilium_sync::ShaderStages::VERTEX | redlilium_sync::ShaderStages::FRAGMENT,
                ),
        }
    }

    pub fn device(self) -> DummyDevice {
        DummyDevice::with_capabilities(self.capabilities())
    }
}

// ============================================================================
// Resources
// ============================================================================

/// A `size`x`size` RGBA8 texture filled with `fill`.
pub fn rgba_texture(size: u32, fill: u8) -> Arc<Texture> {
    let texture = Arc::new(Texture::new(TextureDescriptor::new_2d(
        size,
        size,
        TextureFormat::Rgba,
        DataType::UnsignedByte,
    )));
    texture.set_image(0, 0, BufferData::from_u8(&vec![fill; (size * size * 4) as usize]));
    texture
}

/// A vertex buffer holding `0.0, 1.0, 2.0, ...`.
pub fn float_buffer(len: usize, mode: StorageMode) -> Arc<VertexBuffer> {
    let values: Vec<f32> = (0..len).map(|i| i as f32).collect();
    Arc::new(VertexBuffer::new(BufferData::from_f32(&values), mode))
}

pub fn basic_program() -> Arc<ShaderProgram> {
    Arc::new(ShaderProgram::from_sources(VERTEX_SOURCE, FRAGMENT_SOURCE))
}

// ============================================================================
// Call matchers
// ============================================================================

pub fn is_tex_image(call: &DeviceCall) -> bool {
    matches!(call, DeviceCall::TexImage { .. })
}

pub fn is_tex_sub_image(call: &DeviceCall) -> bool {
    matches!(call, DeviceCall::TexSubImage { .. })
}

pub fn is_buffer_upload(call: &DeviceCall) -> bool {
    matches!(
        call,
        DeviceCall::BufferData { .. } | DeviceCall::BufferSubData { .. }
    )
}

pub fn is_compile(call: &DeviceCall) -> bool {
    matches!(call, DeviceCall::CompileShader(_))
}

pub fn is_link(call: &DeviceCall) -> bool {
    matches!(call, DeviceCall::LinkProgram(_))
}
