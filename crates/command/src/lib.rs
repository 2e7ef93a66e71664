//! Undoable document commands and the processor that stores them.
//!
//! # Invariants
//! - Every stored command is reversible via `undo()`.
//! - Undo after do restores the document state hash.
//! - Storing a new command clears the redo stack.
//! - A command that fails to perform is never stored.

pub mod command;
pub mod move_vertices;
pub mod processor;
pub mod set_entity_definition_file;
pub mod set_property;

pub use command::{Command, CommandError, CommandGroup, CommandState, CommandType};
pub use move_vertices::MoveVerticesCommand;
pub use processor::CommandProcessor;
pub use set_entity_definition_file::SetEntityDefinitionFileCommand;
pub use set_property::SetPropertyCommand;
