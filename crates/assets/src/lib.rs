//! Texture assets: pixel buffers per mip level, usage counting, upload
//! through a renderer backend, and content-addressed collections.
//!
//! The renderer consumes textures through the `TextureBackend` trait, never
//! through a concrete graphics API.
//!
//! # Invariants
//! - Every mip buffer holds at least `bytes_per_pixel * w * h` bytes.
//! - A prepared texture has a non-zero id and no pixel buffers.

pub mod backend;
pub mod collection;
pub mod texture;

pub use backend::{
    BackendCall, BlendFactor, CullFace, RecordingBackend, TextureBackend, TextureFilter,
};
pub use collection::{TextureCollection, TextureId};
pub use texture::{
    Texture, TextureBlendFunc, TextureCulling, TextureFormat, TextureType, select_texture_type,
    size_at_mip_level,
};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("texture '{name}' has invalid size {width}x{height}")]
    InvalidSize {
        name: String,
        width: usize,
        height: usize,
    },
    #[error("texture '{name}' mip level {level} needs {expected} bytes, got {actual}")]
    BufferTooSmall {
        name: String,
        level: usize,
        expected: usize,
        actual: usize,
    },
    #[error("usage count of texture '{0}' is already zero")]
    UsageUnderflow(String),
    #[error("texture '{0}' cannot be prepared with id 0")]
    InvalidTextureId(String),
    #[error("texture '{0}' is already prepared")]
    AlreadyPrepared(String),
}
