use mapwright_model::{MapDocument, ModelError};
use std::any::Any;

/// Identifies the kind of a command. Only commands of the same type are
/// offered to each other for collation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandType(pub &'static str);

/// Lifecycle of a command held by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Default,
    Doing,
    Done,
    Undoing,
}

/// Errors from performing or undoing commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("cannot {action} command '{name}' in state {state:?}")]
    InvalidState {
        name: String,
        action: &'static str,
        state: CommandState,
    },
    #[error("no command group is open")]
    NoOpenGroup,
    #[error("cannot undo or redo while command group '{0}' is open")]
    GroupOpen(String),
}

/// An undoable unit of document mutation.
///
/// `perform_do` must capture whatever `perform_undo` needs to restore the
/// document exactly. A command that fails in `perform_do` must leave the
/// document unchanged.
pub trait Command: std::fmt::Debug {
    fn name(&self) -> &str;

    fn command_type(&self) -> CommandType;

    fn is_undoable(&self) -> bool {
        true
    }

    fn modifies_document(&self) -> bool {
        true
    }

    fn perform_do(&mut self, document: &mut MapDocument) -> Result<(), CommandError>;

    fn perform_undo(&mut self, document: &mut MapDocument) -> Result<(), CommandError>;

    /// Absorb `other`, which has already been performed, into `self`.
    /// Returns true if `other` can be dropped.
    fn collate_with(&mut self, _other: &dyn Command) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// Several commands stored and undone as one step.
#[derive(Debug)]
pub struct CommandGroup {
    name: String,
    commands: Vec<Box<dyn Command>>,
}

impl CommandGroup {
    pub const TYPE: CommandType = CommandType("CommandGroup");

    pub fn new(name: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }

    pub fn commands(&self) -> &[Box<dyn Command>] {
        &self.commands
    }
}

impl Command for CommandGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn command_type(&self) -> CommandType {
        Self::TYPE
    }

    fn modifies_document(&self) -> bool {
        self.commands.iter().any(|c| c.modifies_document())
    }

    /// Performs every command in order. If one fails, the commands already
    /// performed are undone again before the error is returned.
    fn perform_do(&mut self, document: &mut MapDocument) -> Result<(), CommandError> {
        for index in 0..self.commands.len() {
            if let Err(err) = self.commands[index].perform_do(document) {
                for command in self.commands[..index].iter_mut().rev() {
                    if let Err(restore) = command.perform_undo(document) {
                        tracing::error!(command = command.name(), "group restore failed: {restore}");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Undoes every command in reverse order. If one fails, the commands
    /// already undone are performed again before the error is returned.
    fn perform_undo(&mut self, document: &mut MapDocument) -> Result<(), CommandError> {
        undo_in_reverse(&mut self.commands, document)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Undo `commands` last to first. On failure the commands already undone are
/// performed again, so the document is back where it started.
pub(crate) fn undo_in_reverse(
    commands: &mut [Box<dyn Command>],
    document: &mut MapDocument,
) -> Result<(), CommandError> {
    for index in (0..commands.len()).rev() {
        if let Err(err) = commands[index].perform_undo(document) {
            for command in &mut commands[index + 1..] {
                if let Err(restore) = command.perform_do(document) {
                    tracing::error!(command = command.name(), "group restore failed: {restore}");
                }
            }
            return Err(err);
        }
    }
    Ok(())
}
