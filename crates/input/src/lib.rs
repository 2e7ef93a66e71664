//! Mouse and keyboard input for the editor tools.
//!
//! # Invariants
//! - Tools read input only through `InputState`, never raw window events.
//! - The pick result of a frame is computed once and shared by all tool parts.

pub mod event;
pub mod state;

pub use event::{InputEvent, Key, ModifierKeys, MouseButton, MouseButtons};
pub use state::InputState;
