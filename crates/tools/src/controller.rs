//! Routing of mouse and keyboard input to the vertex tool.
//!
//! A controller owns a tool and a list of parts. Every event is offered to
//! the parts in order until one of them handles it. A drag belongs to the
//! part that accepted `start_drag` until it ends or is cancelled.

use glam::Vec3;
use mapwright_command::CommandProcessor;
use mapwright_common::ray::EPSILON;
use mapwright_input::{InputState, Key, ModifierKeys, MouseButtons};
use mapwright_model::{Hit, MapDocument};

use crate::error::ToolError;
use crate::handles::HANDLE_HIT_TYPE;
use crate::vertex_tool::{MoveResult, VertexTool};

/// The document and undo history a tool edits.
pub struct ToolContext<'a> {
    pub processor: &'a mut CommandProcessor,
    pub document: &'a mut MapDocument,
}

impl<'a> ToolContext<'a> {
    pub fn new(processor: &'a mut CommandProcessor, document: &'a mut MapDocument) -> Self {
        Self {
            processor,
            document,
        }
    }
}

/// One aspect of a tool's input handling. Each method returns `Ok(true)` if
/// the part handled the event.
pub trait ToolControllerPart<T> {
    fn mouse_click(
        &mut self,
        _tool: &mut T,
        _input: &InputState,
        _context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        Ok(false)
    }

    fn mouse_double_click(
        &mut self,
        _tool: &mut T,
        _input: &InputState,
        _context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        Ok(false)
    }

    fn start_drag(
        &mut self,
        _tool: &mut T,
        _input: &InputState,
        _context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        Ok(false)
    }

    /// Continue a drag this part started. Returning `Ok(false)` ends it.
    fn drag(
        &mut self,
        _tool: &mut T,
        _input: &InputState,
        _context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        Ok(false)
    }

    fn end_drag(
        &mut self,
        _tool: &mut T,
        _input: &InputState,
        _context: &mut ToolContext<'_>,
    ) -> Result<(), ToolError> {
        Ok(())
    }

    fn cancel(&mut self, _tool: &mut T, _context: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        Ok(false)
    }

    fn key_down(
        &mut self,
        _tool: &mut T,
        _key: Key,
        _input: &InputState,
        _context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        Ok(false)
    }
}

/// The closest handle hit of the current pick result.
pub fn find_handle_hit(input: &InputState) -> Option<Hit> {
    input.pick_result().first_of(HANDLE_HIT_TYPE).cloned()
}

/// Every handle hit stacked at the position of the closest one.
pub fn find_handle_hits(input: &InputState) -> Vec<Hit> {
    let Some(first) = find_handle_hit(input) else {
        return Vec::new();
    };
    input
        .pick_result()
        .all_of(HANDLE_HIT_TYPE)
        .into_iter()
        .filter(|hit| hit.hit_point.abs_diff_eq(first.hit_point, EPSILON))
        .cloned()
        .collect()
}

/// Clicking on handles changes the vertex selection.
#[derive(Debug, Default)]
pub struct SelectVertexPart;

impl ToolControllerPart<VertexTool> for SelectVertexPart {
    fn mouse_click(
        &mut self,
        tool: &mut VertexTool,
        input: &InputState,
        _context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        if !input.mouse_buttons_pressed(MouseButtons::LEFT) {
            return Ok(false);
        }
        let allowed = ModifierKeys::SHIFT | ModifierKeys::CTRL_CMD;
        if !allowed.contains(input.modifier_keys()) {
            return Ok(false);
        }

        let hits = if input.modifier_keys_down(ModifierKeys::CTRL_CMD) {
            find_handle_hits(input)
        } else {
            find_handle_hit(input).into_iter().collect()
        };

        if hits.is_empty() {
            if !input.modifier_keys_pressed(ModifierKeys::NONE) || !tool.handles().any_selected() {
                return Ok(false);
            }
            tool.handles_mut().deselect_all();
            tracing::debug!("vertex selection cleared");
            return Ok(true);
        }

        tool.select(&hits, input.modifier_keys_down(ModifierKeys::SHIFT));
        Ok(true)
    }

    /// Double clicking a handle selects every handle of its node.
    fn mouse_double_click(
        &mut self,
        tool: &mut VertexTool,
        input: &InputState,
        _context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        if !input.mouse_buttons_pressed(MouseButtons::LEFT) {
            return Ok(false);
        }
        let Some(vertex) = find_handle_hit(input).and_then(|hit| hit.vertex()) else {
            return Ok(false);
        };
        if !input.modifier_keys_down(ModifierKeys::SHIFT) {
            tool.handles_mut().deselect_all();
        }
        for v in tool.handles().handles_of(vertex.node) {
            tool.handles_mut().select(v);
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    plane_point: Vec3,
    plane_normal: Vec3,
    applied: Vec3,
}

/// Dragging a handle moves the selected vertices; arrow keys nudge them.
#[derive(Debug, Default)]
pub struct MoveVertexPart {
    drag: Option<DragState>,
}

impl MoveVertexPart {
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The world axis most aligned with the view direction. Dragging happens
    /// in the plane perpendicular to it.
    fn drag_plane_normal(direction: Vec3) -> Vec3 {
        let abs = direction.abs();
        if abs.z >= abs.x && abs.z >= abs.y {
            Vec3::Z
        } else if abs.x >= abs.y {
            Vec3::X
        } else {
            Vec3::Y
        }
    }
}

impl ToolControllerPart<VertexTool> for MoveVertexPart {
    fn start_drag(
        &mut self,
        tool: &mut VertexTool,
        input: &InputState,
        context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        if !input.mouse_buttons_pressed(MouseButtons::LEFT) {
            return Ok(false);
        }
        let Some(hit) = find_handle_hit(input) else {
            return Ok(false);
        };
        let Some(vertex) = hit.vertex() else {
            return Ok(false);
        };
        if !tool.handles().is_selected(vertex) {
            if !input.modifier_keys_down(ModifierKeys::SHIFT) {
                tool.handles_mut().deselect_all();
            }
            tool.handles_mut().select(vertex);
        }

        tool.begin_move(context.processor)?;
        self.drag = Some(DragState {
            plane_point: hit.hit_point,
            plane_normal: Self::drag_plane_normal(input.pick_ray().direction),
            applied: Vec3::ZERO,
        });
        tracing::debug!(selected = tool.handles().selected_count(), "vertex drag started");
        Ok(true)
    }

    fn drag(
        &mut self,
        tool: &mut VertexTool,
        input: &InputState,
        context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        let Some(state) = self.drag.as_mut() else {
            return Ok(false);
        };
        let ray = input.pick_ray();
        let Some(distance) = ray.intersect_plane(state.plane_point, state.plane_normal) else {
            return Ok(true);
        };
        let total = ray.point_at(distance) - state.plane_point;
        let target = if input.modifier_keys_down(ModifierKeys::ALT) {
            total
        } else {
            tool.grid().snap_delta(total)
        };
        let step = target - state.applied;
        if step == Vec3::ZERO {
            return Ok(true);
        }

        match tool.move_by(context.processor, context.document, step)? {
            MoveResult::Continue => {
                state.applied = target;
                Ok(true)
            }
            MoveResult::Deny => Ok(true),
        }
    }

    fn end_drag(
        &mut self,
        tool: &mut VertexTool,
        _input: &InputState,
        context: &mut ToolContext<'_>,
    ) -> Result<(), ToolError> {
        if self.drag.take().is_some() {
            tool.end_move(context.processor)?;
        }
        Ok(())
    }

    fn cancel(
        &mut self,
        tool: &mut VertexTool,
        context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        if self.drag.take().is_none() {
            return Ok(false);
        }
        tool.cancel_move(context.processor, context.document)?;
        Ok(true)
    }

    fn key_down(
        &mut self,
        tool: &mut VertexTool,
        key: Key,
        _input: &InputState,
        context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        if self.drag.is_some() || !tool.handles().any_selected() {
            return Ok(false);
        }
        let direction = match key {
            Key::Up => Vec3::Y,
            Key::Down => Vec3::NEG_Y,
            Key::Left => Vec3::NEG_X,
            Key::Right => Vec3::X,
            _ => return Ok(false),
        };
        let delta = direction * tool.grid().step();
        tool.nudge(context.processor, context.document, delta)?;
        Ok(true)
    }
}

/// Input controller of the vertex tool.
pub struct VertexToolController {
    tool: VertexTool,
    parts: Vec<Box<dyn ToolControllerPart<VertexTool>>>,
    drag_owner: Option<usize>,
}

impl VertexToolController {
    pub fn new(tool: VertexTool) -> Self {
        Self {
            tool,
            parts: vec![
                Box::new(SelectVertexPart),
                Box::new(MoveVertexPart::default()),
            ],
            drag_owner: None,
        }
    }

    pub fn tool(&self) -> &VertexTool {
        &self.tool
    }

    pub fn tool_mut(&mut self) -> &mut VertexTool {
        &mut self.tool
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_owner.is_some()
    }

    pub fn mouse_click(
        &mut self,
        input: &InputState,
        context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        for part in &mut self.parts {
            if part.mouse_click(&mut self.tool, input, context)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn mouse_double_click(
        &mut self,
        input: &InputState,
        context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        for part in &mut self.parts {
            if part.mouse_double_click(&mut self.tool, input, context)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn start_drag(
        &mut self,
        input: &InputState,
        context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        if self.drag_owner.is_some() {
            return Ok(false);
        }
        for (index, part) in self.parts.iter_mut().enumerate() {
            if part.start_drag(&mut self.tool, input, context)? {
                self.drag_owner = Some(index);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Forward a drag to the owning part. The drag ends if the part declines.
    pub fn drag(
        &mut self,
        input: &InputState,
        context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        let Some(index) = self.drag_owner else {
            return Ok(false);
        };
        let Some(part) = self.parts.get_mut(index) else {
            return Ok(false);
        };
        if part.drag(&mut self.tool, input, context)? {
            return Ok(true);
        }
        self.drag_owner = None;
        part.end_drag(&mut self.tool, input, context)?;
        Ok(false)
    }

    pub fn end_drag(
        &mut self,
        input: &InputState,
        context: &mut ToolContext<'_>,
    ) -> Result<(), ToolError> {
        let Some(index) = self.drag_owner.take() else {
            return Ok(());
        };
        match self.parts.get_mut(index) {
            Some(part) => part.end_drag(&mut self.tool, input, context),
            None => Ok(()),
        }
    }

    /// Cancel the running drag, or offer the cancel to each part.
    pub fn cancel(&mut self, context: &mut ToolContext<'_>) -> Result<bool, ToolError> {
        if let Some(index) = self.drag_owner.take() {
            return match self.parts.get_mut(index) {
                Some(part) => part.cancel(&mut self.tool, context),
                None => Ok(false),
            };
        }
        for part in &mut self.parts {
            if part.cancel(&mut self.tool, context)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Escape cancels a running drag; other keys go to the parts in order.
    pub fn key_down(
        &mut self,
        key: Key,
        input: &InputState,
        context: &mut ToolContext<'_>,
    ) -> Result<bool, ToolError> {
        if key == Key::Escape && self.drag_owner.is_some() {
            return self.cancel(context);
        }
        for part in &mut self.parts {
            if part.key_down(&mut self.tool, key, input, context)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
