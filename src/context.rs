//! The device seen by drivers: capability queries and primitive operations.
//!
//! Drivers never talk to a graphics API directly. Everything they need from the
//! device goes through a [`DeviceContext`], which is implemented by the host for
//! its real API and by [`DummyDevice`](crate::backend::dummy::DummyDevice) for
//! tests. Every method is called from the thread that currently owns the device.

use crate::error::DeviceError;
use crate::resources::ImageRegion;
use crate::types::{
    BufferTarget, DataType, ShaderStage, ShaderStages, StorageMode, TextureFormat,
    TextureParameters, TextureTarget, TextureTargets,
};

/// Native id of a device texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Native id of a device buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Native id of a linked program object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Native id of a single-stage shader object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// What the device supports.
///
/// Passed around as a plain value so every caller (and every test) controls
/// exactly which features a device reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Texture targets that can be created.
    pub texture_targets: TextureTargets,
    /// Maximum width and height of 1D and 2D textures.
    pub max_texture_size: u32,
    /// Maximum face size of cube maps.
    pub max_cube_map_size: u32,
    /// Maximum dimension of volume textures.
    pub max_3d_texture_size: u32,
    /// Whether dimensions that are not powers of two are allowed.
    pub npot_textures: bool,
    /// Whether depth-format textures are supported.
    pub depth_textures: bool,
    /// Whether `_FLOAT` formats keep values outside of `[0, 1]`.
    pub unclamped_float_textures: bool,
    /// Whether device-resident buffer objects exist.
    pub buffer_objects: bool,
    /// Programmable stages available.
    pub shader_stages: ShaderStages,
    /// GLSL version times 100 (e.g. 330), or `None` without GLSL.
    pub glsl_version: Option<u32>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            texture_targets: TextureTargets::all(),
            max_texture_size: 8192,
            max_cube_map_size: 8192,
            max_3d_texture_size: 2048,
            npot_textures: true,
            depth_textures: true,
            unclamped_float_textures: true,
            buffer_objects: true,
            shader_stages: ShaderStages::all(),
            glsl_version: Some(330),
        }
    }
}

impl Capabilities {
    /// A fixed-function era device: 1D/2D/cube textures only, no float
    /// textures, no NPOT, no buffer objects and no GLSL.
    pub fn legacy() -> Self {
        Self {
            texture_targets: TextureTargets::T1D | TextureTargets::T2D | TextureTargets::CUBE_MAP,
            max_texture_size: 2048,
            max_cube_map_size: 1024,
            max_3d_texture_size: 0,
            npot_textures: false,
            depth_textures: true,
            unclamped_float_textures: false,
            buffer_objects: false,
            shader_stages: ShaderStages::empty(),
            glsl_version: None,
        }
    }

    pub fn with_texture_targets(mut self, targets: TextureTargets) -> Self {
        self.texture_targets = targets;
        self
    }

    /// Set the same maximum size for every target.
    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = size;
        self.max_cube_map_size = size;
        self.max_3d_texture_size = size;
        self
    }

    pub fn with_npot_textures(mut self, supported: bool) -> Self {
        self.npot_textures = supported;
        self
    }

    pub fn with_depth_textures(mut self, supported: bool) -> Self {
        self.depth_textures = supported;
        self
    }

    pub fn with_unclamped_float_textures(mut self, supported: bool) -> Self {
        self.unclamped_float_textures = supported;
        self
    }

    pub fn with_buffer_objects(mut self, supported: bool) -> Self {
        self.buffer_objects = supported;
        self
    }

    pub fn with_shader_stages(mut self, stages: ShaderStages) -> Self {
        self.shader_stages = stages;
        self
    }

    pub fn with_glsl_version(mut self, version: Option<u32>) -> Self {
        self.glsl_version = version;
        self
    }

    /// Returns true if textures of `target` can be created.
    pub fn supports_target(&self, target: TextureTarget) -> bool {
        self.texture_targets.contains(target.as_flag())
    }

    /// Returns true if shaders for `stage` can be compiled.
    pub fn supports_stage(&self, stage: ShaderStage) -> bool {
        self.shader_stages.contains(stage.as_flag())
    }

    /// Returns true if any GLSL program can be built.
    pub fn supports_glsl(&self) -> bool {
        !self.shader_stages.is_empty() && self.glsl_version.is_some()
    }

    /// Maximum dimension of textures of `target`.
    pub fn max_size(&self, target: TextureTarget) -> u32 {
        match target {
            TextureTarget::T1d | TextureTarget::T2d => self.max_texture_size,
            TextureTarget::CubeMap => self.max_cube_map_size,
            TextureTarget::T3d => self.max_3d_texture_size,
        }
    }
}

/// Format and size of a whole mipmap image being allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpec {
    /// Layer (cube face) of the image.
    pub layer: usize,
    /// Mip level of the image.
    pub level: usize,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: TextureFormat,
    pub data_type: DataType,
    /// Size of the image in bytes.
    pub byte_len: usize,
}

/// Location of a region replaced inside an already allocated mipmap image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubImageSpec {
    pub layer: usize,
    pub level: usize,
    pub region: ImageRegion,
    pub format: TextureFormat,
    pub data_type: DataType,
}

/// An attribute or uniform of a linked program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableInfo {
    pub name: String,
    /// GLSL type name, e.g. `vec3`.
    pub ty: String,
    pub location: i32,
}

/// Primitive device operations.
///
/// Object creation can fail; uploads can not. Compilation and linking report
/// the device's info log as the error.
pub trait DeviceContext {
    /// What this device supports.
    fn capabilities(&self) -> &Capabilities;

    // === Textures ===

    fn create_texture(&mut self, target: TextureTarget) -> Result<TextureId, DeviceError>;
    fn delete_texture(&mut self, texture: TextureId);
    /// Make `texture` current for subsequent texture calls.
    fn bind_texture(&mut self, target: TextureTarget, texture: TextureId);
    /// Restore whatever texture was bound before the last [`bind_texture`](Self::bind_texture).
    fn restore_texture(&mut self, target: TextureTarget);
    /// Push every sampling parameter of the bound texture at once.
    fn set_texture_parameters(&mut self, target: TextureTarget, parameters: &TextureParameters);
    /// Allocate a whole mipmap image of the bound texture, uploading `data` if given.
    fn tex_image(&mut self, target: TextureTarget, image: &ImageSpec, data: Option<&[u8]>);
    /// Replace a region of an allocated mipmap image of the bound texture.
    ///
    /// `data` holds exactly the region's texels, tightly packed.
    fn tex_sub_image(&mut self, target: TextureTarget, image: &SubImageSpec, data: &[u8]);

    // === Buffers ===

    fn create_buffer(&mut self) -> Result<BufferId, DeviceError>;
    fn delete_buffer(&mut self, buffer: BufferId);
    /// Allocate `byte_len` bytes for `buffer`, uploading `data` if given.
    fn buffer_data(
        &mut self,
        buffer: BufferId,
        target: BufferTarget,
        byte_len: usize,
        data: Option<&[u8]>,
        mode: StorageMode,
    );
    /// Overwrite bytes of `buffer` starting at `byte_offset`.
    fn buffer_sub_data(
        &mut self,
        buffer: BufferId,
        target: BufferTarget,
        byte_offset: usize,
        data: &[u8],
    );

    // === Programs ===

    fn create_program(&mut self) -> Result<ProgramId, DeviceError>;
    fn delete_program(&mut self, program: ProgramId);
    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderId, DeviceError>;
    fn delete_shader(&mut self, shader: ShaderId);
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId);
    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> Result<(), String>;
    fn link_program(&mut self, program: ProgramId) -> Result<(), String>;
    /// Active attributes of a linked program.
    fn query_attributes(&mut self, program: ProgramId) -> Vec<VariableInfo>;
    /// Active uniforms of a linked program.
    fn query_uniforms(&mut self, program: ProgramId) -> Vec<VariableInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capabilities() {
        let caps = Capabilities::default();
        assert!(caps.supports_target(TextureTarget::T3d));
        assert!(caps.supports_stage(ShaderStage::Geometry));
        assert!(caps.supports_glsl());
        assert_eq!(caps.max_size(TextureTarget::T3d), 2048);
    }

    #[test]
    fn test_legacy_capabilities() {
        let caps = Capabilities::legacy();
        assert!(!caps.supports_target(TextureTarget::T3d));
        assert!(!caps.supports_glsl());
        assert!(!caps.buffer_objects);
        assert!(!caps.unclamped_float_textures);
    }

    #[test]
    fn test_capability_builders() {
        let caps = Capabilities::default()
            .with_shader_stages(ShaderStages::VERTEX | ShaderStages::FRAGMENT)
            .with_max_texture_size(64);
        assert!(!caps.supports_stage(ShaderStage::Geometry));
        assert_eq!(caps.max_size(TextureTarget::CubeMap), 64);

        let caps = caps.with_glsl_version(None);
        assert!(!caps.supports_glsl());
    }
}
