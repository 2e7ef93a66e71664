use mapwright_common::NodeId;

/// Errors from document model operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("entity {0} not found")]
    EntityNotFound(NodeId),
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("vertex {index} of node {node} not found")]
    VertexNotFound { node: NodeId, index: usize },
    #[error("the worldspawn entity cannot be removed")]
    CannotRemoveWorldspawn,
    #[error("document has no worldspawn entity")]
    MissingWorldspawn,
    #[error("invalid patch size {rows}x{columns} with {points} control points")]
    InvalidPatchSize {
        rows: usize,
        columns: usize,
        points: usize,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
