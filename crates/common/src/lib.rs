//! Shared types for the map editor workspace.
//!
//! # Invariants
//! - Every node in a map document is addressed by a `NodeId`.
//! - Ray directions are unit length (or zero for a degenerate ray).

pub mod config;
pub mod ray;
pub mod types;

pub use config::{ConfigError, EditorConfig, MAX_PATCH_SUBDIVISIONS};
pub use ray::Ray3;
pub use types::{Color, NodeId};
