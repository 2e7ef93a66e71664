use serde::{Deserialize, Serialize};

use crate::texture::TextureFormat;

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

/// Source or destination factor of a blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Which faces the rasterizer discards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullFace {
    Front,
    Back,
    FrontAndBack,
}

/// The renderer operations textures need. Texture id 0 means "no texture".
pub trait TextureBackend {
    /// Allocate a new non-zero texture id.
    fn create_texture(&mut self) -> u32;

    fn bind_texture(&mut self, texture_id: u32);

    fn set_filters(&mut self, min: TextureFilter, mag: TextureFilter);

    fn set_wrap_repeat(&mut self);

    fn set_generate_mipmaps(&mut self, enabled: bool);

    fn set_max_level(&mut self, level: usize);

    fn upload(&mut self, level: usize, width: usize, height: usize, format: TextureFormat, data: &[u8]);

    fn set_face_culling(&mut self, enabled: bool);

    fn cull_face(&mut self, face: CullFace);

    fn push_blend_state(&mut self);

    fn pop_blend_state(&mut self);

    fn blend_func(&mut self, src: BlendFactor, dest: BlendFactor);

    fn disable_blend(&mut self);
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CreateTexture(u32),
    BindTexture(u32),
    SetFilters(TextureFilter, TextureFilter),
    SetWrapRepeat,
    SetGenerateMipmaps(bool),
    SetMaxLevel(usize),
    Upload {
        level: usize,
        width: usize,
        height: usize,
        format: TextureFormat,
        bytes: usize,
    },
    SetFaceCulling(bool),
    CullFace(CullFace),
    PushBlendState,
    PopBlendState,
    BlendFunc(BlendFactor, BlendFactor),
    DisableBlend,
}

/// Backend that records every call instead of talking to a GPU. Used by the
/// CLI dry runs and in tests.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    next_id: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of uploads recorded so far.
    pub fn upload_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Upload { .. }))
            .count()
    }
}

impl TextureBackend for RecordingBackend {
    fn create_texture(&mut self) -> u32 {
        self.next_id += 1;
        self.calls.push(BackendCall::CreateTexture(self.next_id));
        self.next_id
    }

    fn bind_texture(&mut self, texture_id: u32) {
        self.calls.push(BackendCall::BindTexture(texture_id));
    }

    fn set_filters(&mut self, min: TextureFilter, mag: TextureFilter) {
        self.calls.push(BackendCall::SetFilters(min, mag));
    }

    fn set_wrap_repeat(&mut self) {
        self.calls.push(BackendCall::SetWrapRepeat);
    }

    fn set_generate_mipmaps(&mut self, enabled: bool) {
        self.calls.push(BackendCall::SetGenerateMipmaps(enabled));
    }

    fn set_max_level(&mut self, level: usize) {
        self.calls.push(BackendCall::SetMaxLevel(level));
    }

    fn upload(&mut self, level: usize, width: usize, height: usize, format: TextureFormat, data: &[u8]) {
        self.calls.push(BackendCall::Upload {
            level,
            width,
            height,
            format,
            bytes: data.len(),
        });
    }

    fn set_face_culling(&mut self, enabled: bool) {
        self.calls.push(BackendCall::SetFaceCulling(enabled));
    }

    fn cull_face(&mut self, face: CullFace) {
        self.calls.push(BackendCall::CullFace(face));
    }

    fn push_blend_state(&mut self) {
        self.calls.push(BackendCall::PushBlendState);
    }

    fn pop_blend_state(&mut self) {
        self.calls.push(BackendCall::PopBlendState);
    }

    fn blend_func(&mut self, src: BlendFactor, dest: BlendFactor) {
        self.calls.push(BackendCall::BlendFunc(src, dest));
    }

    fn disable_blend(&mut self) {
        self.calls.push(BackendCall::DisableBlend);
    }
}
