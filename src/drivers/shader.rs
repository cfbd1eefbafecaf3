//! GLSL shader program driver.
//!
//! Each stage moves between absent and compiled-and-attached purely by
//! comparing the source it was last compiled from with the resource's current
//! source. Only stages whose source changed are touched; if any did, the
//! program is relinked and its attribute and uniform tables are refreshed.
//!
//! A failed compile or link leaves the tables of the last successful link in
//! place, so callers keep seeing the locations of the program that is still
//! usable on the device.

use std::collections::HashMap;

use crate::change_queue::ChangeQueue;
use crate::context::{DeviceContext, ProgramId, ShaderId, VariableInfo};
use crate::error::{SyncError, SyncResult};
use crate::resources::{Resource, ResourceKind, ShaderProgram};
use crate::types::ShaderStage;

use super::{ResourceDriver, ResourceHandle, kind_mismatch};

#[derive(Debug, Default)]
struct StageSlot {
    shader: Option<ShaderId>,
    /// Source the shader was last compiled from successfully.
    source: Option<String>,
}

/// Device-side state of one shader program.
#[derive(Debug)]
pub struct ShaderHandle {
    program: Option<ProgramId>,
    /// Indexed by [`ShaderStage::index`].
    stages: [StageSlot; 3],
    attributes: HashMap<String, VariableInfo>,
    uniforms: HashMap<String, VariableInfo>,
    /// A stage changed since the program was last linked.
    needs_link: bool,
    last_synced_version: u64,
}

impl ShaderHandle {
    fn new() -> Self {
        Self {
            program: None,
            stages: Default::default(),
            attributes: HashMap::new(),
            uniforms: HashMap::new(),
            needs_link: false,
            last_synced_version: ChangeQueue::<()>::UNSYNCED,
        }
    }

    /// Device program object, once created.
    pub fn program_id(&self) -> Option<ProgramId> {
        self.program
    }

    /// Shader object currently attached for `stage`.
    pub fn shader_id(&self, stage: ShaderStage) -> Option<ShaderId> {
        self.stages[stage.index()].shader
    }

    /// Source `stage` was last compiled from.
    pub fn compiled_source(&self, stage: ShaderStage) -> Option<&str> {
        self.stages[stage.index()].source.as_deref()
    }

    /// Active attribute `name` of the last linked program.
    pub fn attribute(&self, name: &str) -> Option<&VariableInfo> {
        self.attributes.get(name)
    }

    /// Active uniform `name` of the last linked program.
    pub fn uniform(&self, name: &str) -> Option<&VariableInfo> {
        self.uniforms.get(name)
    }

    pub fn attributes(&self) -> &HashMap<String, VariableInfo> {
        &self.attributes
    }

    pub fn uniforms(&self) -> &HashMap<String, VariableInfo> {
        &self.uniforms
    }

    pub fn last_synced_version(&self) -> u64 {
        self.last_synced_version
    }
}

/// Driver for [`ShaderProgram`] resources.
#[derive(Debug, Default)]
pub struct ShaderProgramDriver;

impl ShaderProgramDriver {
    pub fn new() -> Self {
        Self
    }

    /// Create a handle for `program`.
    pub fn init_program(&self, _program: &ShaderProgram) -> ShaderHandle {
        ShaderHandle::new()
    }

    /// Sync `program` into `handle`.
    ///
    /// Succeeds with an empty status or fails; shader programs have no
    /// degraded form.
    pub fn update_program(
        &self,
        context: &mut dyn DeviceContext,
        program: &ShaderProgram,
        handle: &mut ShaderHandle,
    ) -> SyncResult<String> {
        let capabilities = *context.capabilities();
        if !capabilities.supports_glsl() {
            return Err(SyncError::Unsupported(
                "GLSL is not supported on current hardware".to_string(),
            ));
        }

        let state = program.read();
        let changes = program.changes();
        if !changes.is_version_stale(handle.last_synced_version) {
            return Ok(String::new());
        }

        let program_id = match handle.program {
            Some(id) => id,
            None => {
                let id = context.create_program()?;
                handle.program = Some(id);
                id
            }
        };

        let mut problems = Vec::new();
        for stage in ShaderStage::ALL {
            let slot = &mut handle.stages[stage.index()];
            // Removal is keyed on the shader object: a failed compile leaves
            // one attached without a cached source.
            let Some(source) = state.source(stage) else {
                if let Some(shader) = slot.shader.take() {
                    log::trace!("Program {}: removing {} stage", program.id(), stage);
                    context.detach_shader(program_id, shader);
                    context.delete_shader(shader);
                    handle.needs_link = true;
                }
                slot.source = None;
                continue;
            };
            if slot.source.as_deref() == Some(source) {
                continue;
            }
            handle.needs_link = true;

            if !capabilities.supports_stage(stage) {
                problems.push(format!("Hardware does not support shader type: {}", stage));
                continue;
            }

            let shader = match slot.shader {
                Some(shader) => shader,
                None => {
                    let shader = context.create_shader(stage)?;
                    context.attach_shader(program_id, shader);
                    slot.shader = Some(shader);
                    shader
                }
            };
            log::trace!("Program {}: compiling {} stage", program.id(), stage);
            match context.compile_shader(shader, source) {
                Ok(()) => slot.source = Some(source.to_string()),
                Err(info_log) => {
                    slot.source = None;
                    problems.push(format!("Error compiling {} shader: {}", stage, info_log));
                }
            }
        }

        if !problems.is_empty() {
            return Err(SyncError::Compile(problems));
        }
        if handle.needs_link {
            context.link_program(program_id).map_err(SyncError::Link)?;
            handle.needs_link = false;
            handle.attributes = context
                .query_attributes(program_id)
                .into_iter()
                .map(|info| (info.name.clone(), info))
                .collect();
            handle.uniforms = context
                .query_uniforms(program_id)
                .into_iter()
                .map(|info| (info.name.clone(), info))
                .collect();
        }

        handle.last_synced_version = changes.version();
        Ok(String::new())
    }

    /// Forget compiled sources so every stage recompiles; objects are kept.
    pub fn reset_program(&self, handle: &mut ShaderHandle) {
        for slot in &mut handle.stages {
            slot.source = None;
        }
        handle.last_synced_version = ChangeQueue::<()>::UNSYNCED;
    }

    /// Delete every shader object and the program.
    pub fn dispose_program(&self, context: &mut dyn DeviceContext, handle: &mut ShaderHandle) {
        let program = handle.program.take();
        for slot in &mut handle.stages {
            if let Some(shader) = slot.shader.take() {
                if let Some(program) = program {
                    context.detach_shader(program, shader);
                }
                context.delete_shader(shader);
            }
        }
        if let Some(program) = program {
            context.delete_program(program);
        }
        handle.attributes.clear();
        handle.uniforms.clear();
        self.reset_program(handle);
    }
}

impl ResourceDriver for ShaderProgramDriver {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Shader
    }

    fn init(&self, resource: &Resource) -> SyncResult<ResourceHandle> {
        match resource {
            Resource::Shader(program) => Ok(ResourceHandle::Shader(self.init_program(program))),
            other => Err(kind_mismatch(ResourceKind::Shader, other.kind())),
        }
    }

    fn update(
        &self,
        context: &mut dyn DeviceContext,
        resource: &Resource,
        handle: &mut ResourceHandle,
    ) -> SyncResult<String> {
        match (resource, handle) {
            (Resource::Shader(program), ResourceHandle::Shader(handle)) => {
                self.update_program(context, program, handle)
            }
            (Resource::Shader(_), handle) => Err(kind_mismatch(ResourceKind::Shader, handle.kind())),
            (other, _) => Err(kind_mismatch(ResourceKind::Shader, other.kind())),
        }
    }

    fn reset(&self, handle: &mut ResourceHandle) {
        if let ResourceHandle::Shader(handle) = handle {
            self.reset_program(handle);
        }
    }

    fn dispose(&self, context: &mut dyn DeviceContext, handle: &mut ResourceHandle) {
        if let ResourceHandle::Shader(handle) = handle {
            self.dispose_program(context, handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceCall, DummyDevice};
    use crate::context::Capabilities;
    use crate::types::ShaderStages;

    const VERTEX: &str = "in vec3 position;\nuniform mat4 mvp;\nvoid main() {}";
    const FRAGMENT: &str = "uniform vec4 color;\nvoid main() {}";

    fn is_compile(call: &DeviceCall) -> bool {
        matches!(call, DeviceCall::CompileShader(_))
    }

    #[test]
    fn test_compile_and_link() {
        let driver = ShaderProgramDriver::new();
        let program = ShaderProgram::from_sources(VERTEX, FRAGMENT);
        let mut handle = driver.init_program(&program);
        let mut device = DummyDevice::new();

        assert_eq!(driver.update_program(&mut device, &program, &mut handle).unwrap(), "");
        assert_eq!(device.count_calls(is_compile), 2);
        assert_eq!(device.live_shaders(), 2);
        assert_eq!(handle.attribute("position").map(|a| a.ty.as_str()), Some("vec3"));
        assert!(handle.uniform("mvp").is_some());
        assert!(handle.uniform("color").is_some());
        assert_eq!(handle.shader_id(ShaderStage::Geometry), None);
    }

    #[test]
    fn test_idempotent_update() {
        let driver = ShaderProgramDriver::new();
        let program = ShaderProgram::from_sources(VERTEX, FRAGMENT);
        let mut handle = driver.init_program(&program);
        let mut device = DummyDevice::new();
        driver.update_program(&mut device, &program, &mut handle).unwrap();
        device.clear_calls();

        assert_eq!(driver.update_program(&mut device, &program, &mut handle).unwrap(), "");
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_glsl_unsupported() {
        let driver = ShaderProgramDriver::new();
        let program = ShaderProgram::from_sources(VERTEX, FRAGMENT);
        let mut handle = driver.init_program(&program);
        let mut device = DummyDevice::with_capabilities(Capabilities::legacy());
        assert_eq!(
            driver.update_program(&mut device, &program, &mut handle),
            Err(SyncError::Unsupported(
                "GLSL is not supported on current hardware".to_string()
            ))
        );
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_compile_error_keeps_tables() {
        let driver = ShaderProgramDriver::new();
        let program = ShaderProgram::from_sources(VERTEX, FRAGMENT);
        let mut handle = driver.init_program(&program);
        let mut device = DummyDevice::new();
        driver.update_program(&mut device, &program, &mut handle).unwrap();
        let synced = handle.last_synced_version();

        program.set_source(ShaderStage::Fragment, Some("#error bad token".to_string()));
        let err = driver.update_program(&mut device, &program, &mut handle).unwrap_err();
        assert_eq!(
            err,
            SyncError::Compile(vec!["Error compiling FRAGMENT shader: bad token".to_string()])
        );
        assert_eq!(handle.last_synced_version(), synced);
        assert_eq!(handle.compiled_source(ShaderStage::Fragment), None);
        assert!(handle.uniform("color").is_some());

        // the failing source is retried
        device.clear_calls();
        assert!(driver.update_program(&mut device, &program, &mut handle).is_err());
        assert_eq!(device.count_calls(is_compile), 1);

        // reverting recompiles the shader object and relinks
        device.clear_calls();
        program.set_source(ShaderStage::Fragment, Some(FRAGMENT.to_string()));
        assert_eq!(driver.update_program(&mut device, &program, &mut handle).unwrap(), "");
        assert_eq!(device.count_calls(is_compile), 1);
        assert_eq!(device.count_calls(|c| matches!(c, DeviceCall::LinkProgram(_))), 1);
    }

    #[test]
    fn test_remove_stage_that_failed_to_compile() {
        let driver = ShaderProgramDriver::new();
        let program = ShaderProgram::from_sources(VERTEX, FRAGMENT);
        program.set_source(ShaderStage::Geometry, Some("void main() {}".to_string()));
        let mut handle = driver.init_program(&program);
        let mut device = DummyDevice::new();
        driver.update_program(&mut device, &program, &mut handle).unwrap();
        assert_eq!(device.live_shaders(), 3);

        program.set_source(ShaderStage::Geometry, Some("#error broken".to_string()));
        assert!(driver.update_program(&mut device, &program, &mut handle).is_err());

        device.clear_calls();
        program.set_source(ShaderStage::Geometry, None);
        assert_eq!(driver.update_program(&mut device, &program, &mut handle).unwrap(), "");
        assert_eq!(device.live_shaders(), 2);
        assert_eq!(handle.shader_id(ShaderStage::Geometry), None);
        assert_eq!(device.count_calls(|c| matches!(c, DeviceCall::DeleteShader(_))), 1);
        assert_eq!(device.count_calls(|c| matches!(c, DeviceCall::LinkProgram(_))), 1);
        assert!(handle.uniform("mvp").is_some());
    }

    #[test]
    fn test_unsupported_stage() {
        let driver = ShaderProgramDriver::new();
        let program = ShaderProgram::from_sources(VERTEX, FRAGMENT);
        program.set_source(ShaderStage::Geometry, Some("void main() {}".to_string()));
        let mut handle = driver.init_program(&program);
        let mut device = DummyDevice::with_capabilities(
            Capabilities::default().with_shader_stages(ShaderStages::VERTEX | ShaderStages::FRAGMENT),
        );

        let err = driver.update_program(&mut device, &program, &mut handle).unwrap_err();
        assert_eq!(err.message(), "Hardware does not support shader type: GEOMETRY");
        assert_eq!(device.count_calls(|c| matches!(c, DeviceCall::LinkProgram(_))), 0);

        // dropping the stage links what already compiled
        device.clear_calls();
        program.set_source(ShaderStage::Geometry, None);
        assert_eq!(driver.update_program(&mut device, &program, &mut handle).unwrap(), "");
        assert_eq!(device.count_calls(is_compile), 0);
        assert_eq!(device.count_calls(|c| matches!(c, DeviceCall::LinkProgram(_))), 1);
        assert!(handle.attribute("position").is_some());
    }

    #[test]
    fn test_link_failure() {
        let driver = ShaderProgramDriver::new();
        let program = ShaderProgram::from_sources(VERTEX, FRAGMENT);
        let mut handle = driver.init_program(&program);
        let mut device = DummyDevice::new();
        device.set_fail_link(true);

        let err = driver.update_program(&mut device, &program, &mut handle).unwrap_err();
        assert_eq!(
            err.message(),
            "Error linking program: link disabled on dummy device"
        );
        assert!(handle.attributes().is_empty());
    }

    #[test]
    fn test_dispose() {
        let driver = ShaderProgramDriver::new();
        let program = ShaderProgram::from_sources(VERTEX, FRAGMENT);
        let mut handle = driver.init_program(&program);
        let mut device = DummyDevice::new();
        driver.update_program(&mut device, &program, &mut handle).unwrap();

        driver.dispose_program(&mut device, &mut handle);
        driver.dispose_program(&mut device, &mut handle);
        assert_eq!(device.live_programs(), 0);
        assert_eq!(device.live_shaders(), 0);
        assert_eq!(device.count_calls(DeviceCall::is_deletion), 3);
        assert!(handle.uniforms().is_empty());
    }
}
