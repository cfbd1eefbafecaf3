//! Shader program resource.

use parking_lot::{RwLock, RwLockReadGuard};

use crate::change_queue::ChangeQueue;
use crate::types::ShaderStage;

use super::ResourceId;

/// Source code of every stage, as seen under the program's lock.
#[derive(Debug, Default)]
pub struct ShaderProgramState {
    vertex: Option<String>,
    geometry: Option<String>,
    fragment: Option<String>,
}

impl ShaderProgramState {
    /// Source of `stage`, or `None` if the program has no such stage.
    pub fn source(&self, stage: ShaderStage) -> Option<&str> {
        match stage {
            ShaderStage::Vertex => self.vertex.as_deref(),
            ShaderStage::Geometry => self.geometry.as_deref(),
            ShaderStage::Fragment => self.fragment.as_deref(),
        }
    }

    fn slot(&mut self, stage: ShaderStage) -> &mut Option<String> {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Geometry => &mut self.geometry,
            ShaderStage::Fragment => &mut self.fragment,
        }
    }
}

/// A GLSL program made of up to one shader per stage.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ResourceId,
    state: RwLock<ShaderProgramState>,
    changes: ChangeQueue<ShaderStage>,
}

impl ShaderProgram {
    /// Create a program with no stages.
    pub fn new() -> Self {
        Self::with_history_capacity(ChangeQueue::<ShaderStage>::DEFAULT_CAPACITY)
    }

    /// Create a program with no stages whose edit log keeps `capacity` edits.
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            id: ResourceId::next(),
            state: RwLock::new(ShaderProgramState::default()),
            changes: ChangeQueue::with_capacity(capacity),
        }
    }

    /// Create a program from vertex and fragment sources.
    pub fn from_sources(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        let program = Self::new();
        program.set_source(ShaderStage::Vertex, Some(vertex.into()));
        program.set_source(ShaderStage::Fragment, Some(fragment.into()));
        program
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Edit log of this program; each edit names the stage that changed.
    pub fn changes(&self) -> &ChangeQueue<ShaderStage> {
        &self.changes
    }

    /// Lock the program for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, ShaderProgramState> {
        self.state.read()
    }

    /// Copy of the source of `stage`.
    pub fn source(&self, stage: ShaderStage) -> Option<String> {
        self.state.read().source(stage).map(str::to_owned)
    }

    /// Set or remove (`None`) the source of `stage`.
    pub fn set_source(&self, stage: ShaderStage, source: Option<String>) {
        let mut state = self.state.write();
        let slot = state.slot(stage);
        if *slot != source {
            *slot = source;
            self.changes.record_edit(stage);
        }
    }
}

impl Default for ShaderProgram {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(ShaderProgram: Send, Sync);
