//! Dummy device for testing and development.
//!
//! This device doesn't talk to any GPU but keeps enough bookkeeping (live
//! objects, buffer contents, attached shaders) to behave like one, and records
//! every call in order so tests can assert on exactly what a driver issued.

use std::collections::{HashMap, HashSet};

use crate::context::{
    BufferId, Capabilities, DeviceContext, ImageSpec, ProgramId, ShaderId, SubImageSpec,
    TextureId, VariableInfo,
};
use crate::error::DeviceError;
use crate::types::{
    BufferTarget, ShaderStage, StorageMode, TextureParameters, TextureTarget,
};

/// One call received by a [`DummyDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateTexture(TextureId, TextureTarget),
    DeleteTexture(TextureId),
    BindTexture(TextureId),
    RestoreTexture,
    SetTextureParameters(TextureParameters),
    /// Full image allocation; `uploaded` is false when no data was given.
    TexImage { image: ImageSpec, uploaded: bool },
    /// Partial replace of `byte_len` bytes.
    TexSubImage { image: SubImageSpec, byte_len: usize },
    CreateBuffer(BufferId),
    DeleteBuffer(BufferId),
    BufferData {
        buffer: BufferId,
        target: BufferTarget,
        byte_len: usize,
        mode: StorageMode,
        uploaded: bool,
    },
    BufferSubData {
        buffer: BufferId,
        target: BufferTarget,
        byte_offset: usize,
        byte_len: usize,
    },
    CreateProgram(ProgramId),
    DeleteProgram(ProgramId),
    CreateShader(ShaderId, ShaderStage),
    DeleteShader(ShaderId),
    AttachShader(ProgramId, ShaderId),
    DetachShader(ProgramId, ShaderId),
    CompileShader(ShaderId),
    LinkProgram(ProgramId),
    QueryAttributes(ProgramId),
    QueryUniforms(ProgramId),
}

impl DeviceCall {
    /// Returns true for calls that create a device object.
    pub fn is_creation(&self) -> bool {
        matches!(
            self,
            Self::CreateTexture(..)
                | Self::CreateBuffer(_)
                | Self::CreateProgram(_)
                | Self::CreateShader(..)
        )
    }

    /// Returns true for calls that delete a device object.
    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            Self::DeleteTexture(_)
                | Self::DeleteBuffer(_)
                | Self::DeleteProgram(_)
                | Self::DeleteShader(_)
        )
    }
}

#[derive(Debug)]
struct DummyShader {
    stage: ShaderStage,
    source: Option<String>,
}

/// Recording device with configurable capabilities.
///
/// Compilation fails for sources containing `#error`, with the rest of that
/// line as the log. Linking collects `in`/`attribute` declarations of the
/// vertex stage and `uniform` declarations of every stage.
#[derive(Debug)]
pub struct DummyDevice {
    capabilities: Capabilities,
    calls: Vec<DeviceCall>,
    next_id: u32,
    textures: HashSet<TextureId>,
    buffers: HashMap<BufferId, Vec<u8>>,
    programs: HashMap<ProgramId, Vec<ShaderId>>,
    shaders: HashMap<ShaderId, DummyShader>,
    bound_textures: Vec<TextureId>,
    fail_creation: bool,
    fail_link: bool,
}

impl DummyDevice {
    /// Create a device with full capabilities.
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    /// Create a device reporting `capabilities`.
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            calls: Vec::new(),
            next_id: 1,
            textures: HashSet::new(),
            buffers: HashMap::new(),
            programs: HashMap::new(),
            shaders: HashMap::new(),
            bound_textures: Vec::new(),
            fail_creation: false,
            fail_link: false,
        }
    }

    /// Get the device name.
    pub fn name(&self) -> &'static str {
        "Dummy Device"
    }

    /// Make every following object creation fail.
    pub fn set_fail_creation(&mut self, fail: bool) {
        self.fail_creation = fail;
    }

    /// Make every following link fail.
    pub fn set_fail_link(&mut self, fail: bool) {
        self.fail_link = fail;
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Forget the recorded calls; objects stay alive.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|&call| predicate(call)).count()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    /// Texture bound by the innermost unrestored [`bind_texture`](DeviceContext::bind_texture).
    pub fn bound_texture(&self) -> Option<TextureId> {
        self.bound_textures.last().copied()
    }

    /// Bytes currently stored in `buffer`.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Shaders attached to `program`.
    pub fn attached_shaders(&self, program: ProgramId) -> &[ShaderId] {
        self.programs.get(&program).map(Vec::as_slice).unwrap_or(&[])
    }

    fn allocate_id(&mut self) -> Result<u32, DeviceError> {
        if self.fail_creation {
            return Err(DeviceError::ObjectCreationFailed(
                "creation disabled on dummy device".to_string(),
            ));
        }
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    fn declarations<'a>(source: &'a str, qualifiers: &[&str]) -> Vec<(&'a str, &'a str)> {
        source
            .lines()
            .filter_map(|line| {
                let mut words = line.trim().trim_end_matches(';').split_whitespace();
                let qualifier = words.next()?;
                if !qualifiers.contains(&qualifier) {
                    return None;
                }
                let ty = words.next()?;
                let name = words.next()?;
                Some((ty, name))
            })
            .collect()
    }

    fn program_variables(
        &self,
        program: ProgramId,
        stages: &[ShaderStage],
        qualifiers: &[&str],
    ) -> Vec<VariableInfo> {
        let mut variables: Vec<VariableInfo> = Vec::new();
        for shader in self.attached_shaders(program) {
            let Some(DummyShader {
                stage,
                source: Some(source),
            }) = self.shaders.get(shader)
            else {
                continue;
            };
            if !stages.contains(stage) {
                continue;
            }
            for (ty, name) in Self::declarations(source, qualifiers) {
                if variables.iter().any(|v| v.name == name) {
                    continue;
                }
                variables.push(VariableInfo {
                    name: name.to_string(),
                    ty: ty.to_string(),
                    location: variables.len() as i32,
                });
            }
        }
        variables
    }
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceContext for DummyDevice {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn create_texture(&mut self, target: TextureTarget) -> Result<TextureId, DeviceError> {
        let id = TextureId(self.allocate_id()?);
        log::trace!("DummyDevice: creating texture {:?} ({})", id, target);
        self.textures.insert(id);
        self.calls.push(DeviceCall::CreateTexture(id, target));
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        log::trace!("DummyDevice: deleting texture {:?}", texture);
        self.textures.remove(&texture);
        self.calls.push(DeviceCall::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, _target: TextureTarget, texture: TextureId) {
        log::trace!("DummyDevice: binding texture {:?}", texture);
        self.bound_textures.push(texture);
        self.calls.push(DeviceCall::BindTexture(texture));
    }

    fn restore_texture(&mut self, _target: TextureTarget) {
        log::trace!("DummyDevice: restoring texture binding");
        self.bound_textures.pop();
        self.calls.push(DeviceCall::RestoreTexture);
    }

    fn set_texture_parameters(&mut self, _target: TextureTarget, parameters: &TextureParameters) {
        log::trace!("DummyDevice: setting texture parameters {:?}", parameters);
        self.calls.push(DeviceCall::SetTextureParameters(*parameters));
    }

    fn tex_image(&mut self, _target: TextureTarget, image: &ImageSpec, data: Option<&[u8]>) {
        log::trace!(
            "DummyDevice: allocating image layer {} level {} ({}x{}x{} {})",
            image.layer,
            image.level,
            image.width,
            image.height,
            image.depth,
            image.format
        );
        self.calls.push(DeviceCall::TexImage {
            image: *image,
            uploaded: data.is_some(),
        });
    }

    fn tex_sub_image(&mut self, _target: TextureTarget, image: &SubImageSpec, data: &[u8]) {
        log::trace!(
            "DummyDevice: replacing region {:?} of layer {} level {}",
            image.region,
            image.layer,
            image.level
        );
        self.calls.push(DeviceCall::TexSubImage {
            image: *image,
            byte_len: data.len(),
        });
    }

    fn create_buffer(&mut self) -> Result<BufferId, DeviceError> {
        let id = BufferId(self.allocate_id()?);
        log::trace!("DummyDevice: creating buffer {:?}", id);
        self.buffers.insert(id, Vec::new());
        self.calls.push(DeviceCall::CreateBuffer(id));
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        log::trace!("DummyDevice: deleting buffer {:?}", buffer);
        self.buffers.remove(&buffer);
        self.calls.push(DeviceCall::DeleteBuffer(buffer));
    }

    fn buffer_data(
        &mut self,
        buffer: BufferId,
        target: BufferTarget,
        byte_len: usize,
        data: Option<&[u8]>,
        mode: StorageMode,
    ) {
        log::trace!(
            "DummyDevice: allocating {} bytes for buffer {:?} ({})",
            byte_len,
            buffer,
            mode
        );
        if let Some(contents) = self.buffers.get_mut(&buffer) {
            contents.clear();
            contents.resize(byte_len, 0);
            if let Some(data) = data {
                let len = data.len().min(byte_len);
                contents[..len].copy_from_slice(&data[..len]);
            }
        }
        self.calls.push(DeviceCall::BufferData {
            buffer,
            target,
            byte_len,
            mode,
            uploaded: data.is_some(),
        });
    }

    fn buffer_sub_data(
        &mut self,
        buffer: BufferId,
        target: BufferTarget,
        byte_offset: usize,
        data: &[u8],
    ) {
        log::trace!(
            "DummyDevice: writing {} bytes at {} into buffer {:?}",
            data.len(),
            byte_offset,
            buffer
        );
        if let Some(contents) = self.buffers.get_mut(&buffer) {
            let start = byte_offset.min(contents.len());
            let end = (byte_offset + data.len()).min(contents.len());
            contents[start..end].copy_from_slice(&data[..end - start]);
        }
        self.calls.push(DeviceCall::BufferSubData {
            buffer,
            target,
            byte_offset,
            byte_len: data.len(),
        });
    }

    fn create_program(&mut self) -> Result<ProgramId, DeviceError> {
        let id = ProgramId(self.allocate_id()?);
        log::trace!("DummyDevice: creating program {:?}", id);
        self.programs.insert(id, Vec::new());
        self.calls.push(DeviceCall::CreateProgram(id));
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        log::trace!("DummyDevice: deleting program {:?}", program);
        self.programs.remove(&program);
        self.calls.push(DeviceCall::DeleteProgram(program));
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderId, DeviceError> {
        let id = ShaderId(self.allocate_id()?);
        log::trace!("DummyDevice: creating {} shader {:?}", stage, id);
        self.shaders.insert(
            id,
            DummyShader {
                stage,
                source: None,
            },
        );
        self.calls.push(DeviceCall::CreateShader(id, stage));
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        log::trace!("DummyDevice: deleting shader {:?}", shader);
        self.shaders.remove(&shader);
        self.calls.push(DeviceCall::DeleteShader(shader));
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        log::trace!("DummyDevice: attaching {:?} to {:?}", shader, program);
        if let Some(attached) = self.programs.get_mut(&program) {
            if !attached.contains(&shader) {
                attached.push(shader);
            }
        }
        self.calls.push(DeviceCall::AttachShader(program, shader));
    }

    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        log::trace!("DummyDevice: detaching {:?} from {:?}", shader, program);
        if let Some(attached) = self.programs.get_mut(&program) {
            attached.retain(|s| *s != shader);
        }
        self.calls.push(DeviceCall::DetachShader(program, shader));
    }

    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> Result<(), String> {
        log::trace!("DummyDevice: compiling shader {:?}", shader);
        self.calls.push(DeviceCall::CompileShader(shader));
        let entry = self
            .shaders
            .get_mut(&shader)
            .ok_or_else(|| format!("unknown shader {:?}", shader))?;
        if let Some(line) = source.lines().find(|line| line.trim_start().starts_with("#error")) {
            entry.source = None;
            return Err(line.trim_start().trim_start_matches("#error").trim().to_string());
        }
        entry.source = Some(source.to_string());
        Ok(())
    }

    fn link_program(&mut self, program: ProgramId) -> Result<(), String> {
        log::trace!("DummyDevice: linking program {:?}", program);
        self.calls.push(DeviceCall::LinkProgram(program));
        if self.fail_link {
            return Err("link disabled on dummy device".to_string());
        }
        let attached = self.attached_shaders(program);
        if attached.is_empty() {
            return Err("no shaders attached".to_string());
        }
        let uncompiled = attached
            .iter()
            .any(|shader| self.shaders.get(shader).is_none_or(|s| s.source.is_none()));
        if uncompiled {
            return Err("attached shader is not compiled".to_string());
        }
        Ok(())
    }

    fn query_attributes(&mut self, program: ProgramId) -> Vec<VariableInfo> {
        self.calls.push(DeviceCall::QueryAttributes(program));
        self.program_variables(program, &[ShaderStage::Vertex], &["in", "attribute"])
    }

    fn query_uniforms(&mut self, program: ProgramId) -> Vec<VariableInfo> {
        self.calls.push(DeviceCall::QueryUniforms(program));
        self.program_variables(program, &ShaderStage::ALL, &["uniform"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_device_creation() {
        let device = DummyDevice::new();
        assert_eq!(device.name(), "Dummy Device");
        assert!(device.calls().is_empty());
        assert!(device.capabilities().buffer_objects);
    }

    #[test]
    fn test_object_tracking() {
        let mut device = DummyDevice::new();
        let texture = device.create_texture(TextureTarget::T2d).unwrap();
        let buffer = device.create_buffer().unwrap();
        assert_ne!(texture.0, buffer.0);
        assert_eq!(device.live_textures(), 1);
        assert_eq!(device.live_buffers(), 1);

        device.delete_texture(texture);
        device.delete_buffer(buffer);
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.count_calls(DeviceCall::is_creation), 2);
        assert_eq!(device.count_calls(DeviceCall::is_deletion), 2);
    }

    #[test]
    fn test_creation_failure() {
        let mut device = DummyDevice::new();
        device.set_fail_creation(true);
        assert!(matches!(
            device.create_program(),
            Err(DeviceError::ObjectCreationFailed(_))
        ));
    }

    #[test]
    fn test_buffer_contents() {
        let mut device = DummyDevice::new();
        let buffer = device.create_buffer().unwrap();
        device.buffer_data(
            buffer,
            BufferTarget::Array,
            4,
            Some(&[1, 2, 3, 4]),
            StorageMode::GpuStatic,
        );
        device.buffer_sub_data(buffer, BufferTarget::Array, 2, &[9, 9, 9]);
        assert_eq!(device.buffer_contents(buffer), Some(&[1, 2, 9, 9][..]));
    }

    #[test]
    fn test_compile_and_link() {
        let mut device = DummyDevice::new();
        let program = device.create_program().unwrap();
        let vertex = device.create_shader(ShaderStage::Vertex).unwrap();
        let fragment = device.create_shader(ShaderStage::Fragment).unwrap();

        let err = device.compile_shader(vertex, "#error missing semicolon").unwrap_err();
        assert_eq!(err, "missing semicolon");

        device
            .compile_shader(
                vertex,
                "in vec3 position;\nin vec2 uv;\nuniform mat4 mvp;\nvoid main() {}",
            )
            .unwrap();
        device
            .compile_shader(fragment, "in vec2 uv;\nuniform sampler2D tex;\nuniform mat4 mvp;")
            .unwrap();
        device.attach_shader(program, vertex);
        device.attach_shader(program, fragment);
        device.link_program(program).unwrap();

        let attributes = device.query_attributes(program);
        assert_eq!(
            attributes.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            vec!["position", "uv"]
        );
        assert_eq!(attributes[0].ty, "vec3");

        let uniforms = device.query_uniforms(program);
        assert_eq!(uniforms.len(), 2);
        assert_eq!(uniforms[1].name, "tex");
        assert_eq!(uniforms[1].location, 1);
    }

    #[test]
    fn test_link_failure() {
        let mut device = DummyDevice::new();
        let program = device.create_program().unwrap();
        assert!(device.link_program(program).is_err());

        let shader = device.create_shader(ShaderStage::Vertex).unwrap();
        device.compile_shader(shader, "void main() {}").unwrap();
        device.attach_shader(program, shader);
        device.set_fail_link(true);
        assert!(device.link_program(program).is_err());
        device.set_fail_link(false);
        assert!(device.link_program(program).is_ok());
    }
}
