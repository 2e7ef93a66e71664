//! Editor tools: snapping grid, vertex handles, the vertex tool and its
//! input controller, and the map inspector.
//!
//! # Invariants
//! - Tools mutate the document only through commands submitted to the
//!   shared `CommandProcessor`.
//! - One drag produces at most one undo step.

pub mod controller;
pub mod error;
pub mod grid;
pub mod handles;
pub mod inspector;
pub mod vertex_tool;

pub use controller::{
    MoveVertexPart, SelectVertexPart, ToolContext, ToolControllerPart, VertexToolController,
    find_handle_hit, find_handle_hits,
};
pub use error::ToolError;
pub use grid::Grid;
pub use handles::{HANDLE_HIT_TYPE, VertexHandleManager};
pub use inspector::{EntityInfo, MapInspector, MapSummary};
pub use vertex_tool::{MOVE_VERTICES_GROUP, MoveResult, VertexTool};
