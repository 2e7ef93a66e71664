//! Map document model: worldspawn and entity properties, brushes, Bezier
//! patches, and ray picking.
//!
//! # Invariants
//! - A document always has exactly one worldspawn entity.
//! - Entity property order is preserved across updates.
//! - Notifications are appended to the event log and dispatched to every
//!   observer in registration order.

pub mod brush;
pub mod document;
pub mod entity;
pub mod entity_definition_file_spec;
pub mod error;
pub mod patch;
pub mod patch_node;
pub mod pick;

pub use brush::BrushNode;
pub use document::{DocumentEvent, DocumentObserver, MapDocument, ObserverId};
pub use entity::{Entity, EntityProperty, property_keys};
pub use entity_definition_file_spec::EntityDefinitionFileSpec;
pub use error::ModelError;
pub use patch::{BezierPatch, GridPoint, PatchGrid, PatchPoint, make_patch_grid};
pub use patch_node::PatchNode;
pub use pick::{EditorContext, Hit, HitTarget, HitType, PickResult, VertexRef};
