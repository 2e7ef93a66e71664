use glam::Vec3;
use mapwright_command::{CommandError, CommandProcessor, MoveVerticesCommand};
use mapwright_common::{EditorConfig, NodeId, Ray3};
use mapwright_model::{Hit, MapDocument, PickResult};

use crate::error::ToolError;
use crate::grid::Grid;
use crate::handles::VertexHandleManager;

/// Name of the undo step a drag produces.
pub const MOVE_VERTICES_GROUP: &str = "Move Vertices";

/// Outcome of one step of a vertex move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResult {
    /// The vertices moved; keep dragging.
    Continue,
    /// This step was rejected but the drag goes on.
    Deny,
}

/// Selects and moves brush vertices and patch control points.
///
/// The tool does not own the document or the command processor; callers
/// pass them in so every edit lands in the shared undo history.
#[derive(Debug, Clone)]
pub struct VertexTool {
    handles: VertexHandleManager,
    grid: Grid,
    handle_radius: f32,
    moving: bool,
}

impl VertexTool {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            handles: VertexHandleManager::new(),
            grid: Grid::new(config.grid_size),
            handle_radius: config.handle_radius,
            moving: false,
        }
    }

    pub fn handles(&self) -> &VertexHandleManager {
        &self.handles
    }

    pub fn handles_mut(&mut self) -> &mut VertexHandleManager {
        &mut self.handles
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn handle_radius(&self) -> f32 {
        self.handle_radius
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Edit the vertices of `nodes`.
    pub fn rebuild_handles(&mut self, document: &MapDocument, nodes: impl IntoIterator<Item = NodeId>) {
        self.handles.rebuild(document, nodes);
    }

    /// Add handle hits along `ray` to `result`.
    pub fn pick(&self, ray: &Ray3, result: &mut PickResult) {
        self.handles.pick(ray, self.handle_radius, result);
    }

    /// Select the handles referenced by `hits`. Without `add` the previous
    /// selection is replaced; with `add` each hit handle is toggled.
    pub fn select(&mut self, hits: &[Hit], add: bool) {
        if !add {
            self.handles.deselect_all();
        }
        for vertex in hits.iter().filter_map(Hit::vertex) {
            if add {
                self.handles.toggle(vertex);
            } else {
                self.handles.select(vertex);
            }
        }
        tracing::debug!(selected = self.handles.selected_count(), "vertex selection changed");
    }

    /// Start moving the selection. All moves until `end_move` form one
    /// undo step.
    pub fn begin_move(&mut self, processor: &mut CommandProcessor) -> Result<(), ToolError> {
        if self.moving {
            return Err(ToolError::AlreadyMoving);
        }
        if !self.handles.any_selected() {
            return Err(ToolError::EmptySelection);
        }
        processor.begin_group(MOVE_VERTICES_GROUP);
        self.moving = true;
        Ok(())
    }

    /// Translate the selected vertices by `delta`.
    pub fn move_by(
        &mut self,
        processor: &mut CommandProcessor,
        document: &mut MapDocument,
        delta: Vec3,
    ) -> Result<MoveResult, ToolError> {
        if !self.moving {
            return Err(ToolError::NotMoving);
        }
        if delta == Vec3::ZERO {
            return Ok(MoveResult::Continue);
        }
        let command = MoveVerticesCommand::new(self.handles.selected(), delta);
        match processor.submit(document, Box::new(command)) {
            Ok(()) => {}
            Err(CommandError::Model(err)) => {
                tracing::warn!("vertex move rejected: {err}");
                return Ok(MoveResult::Deny);
            }
            Err(err) => return Err(err.into()),
        }
        self.handles.refresh(document);
        Ok(MoveResult::Continue)
    }

    /// Commit the running move as one undo step.
    pub fn end_move(&mut self, processor: &mut CommandProcessor) -> Result<(), ToolError> {
        if !self.moving {
            return Err(ToolError::NotMoving);
        }
        self.moving = false;
        processor.end_group()?;
        Ok(())
    }

    /// Revert the running move and discard it from the history.
    pub fn cancel_move(
        &mut self,
        processor: &mut CommandProcessor,
        document: &mut MapDocument,
    ) -> Result<(), ToolError> {
        if !self.moving {
            return Err(ToolError::NotMoving);
        }
        self.moving = false;
        processor.rollback_group(document)?;
        self.handles.refresh(document);
        tracing::debug!("vertex move cancelled");
        Ok(())
    }

    /// Move the selection by `delta` as a single undo step.
    pub fn nudge(
        &mut self,
        processor: &mut CommandProcessor,
        document: &mut MapDocument,
        delta: Vec3,
    ) -> Result<MoveResult, ToolError> {
        self.begin_move(processor)?;
        let result = match self.move_by(processor, document, delta) {
            Ok(result) => result,
            Err(err) => {
                self.cancel_move(processor, document)?;
                return Err(err);
            }
        };
        self.end_move(processor)?;
        Ok(result)
    }
}
