use mapwright_command::CommandError;

/// Errors from driving an editor tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("no vertices selected")]
    EmptySelection,
    #[error("no move in progress")]
    NotMoving,
    #[error("a move is already in progress")]
    AlreadyMoving,
}
