use mapwright_common::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::AssetError;
use crate::backend::{BlendFactor, CullFace, TextureBackend, TextureFilter};

/// Pixel layout of the texture buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    Rgb,
    Rgba,
    Bgra,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgb => 3,
            TextureFormat::Rgba | TextureFormat::Bgra => 4,
        }
    }
}

/// Masked textures treat one color as fully transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureType {
    Opaque,
    Masked,
}

pub fn select_texture_type(masked: bool) -> TextureType {
    if masked {
        TextureType::Masked
    } else {
        TextureType::Opaque
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureCulling {
    #[default]
    Default,
    None,
    Front,
    Back,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureBlendFunc {
    #[default]
    UseDefault,
    UseFactors {
        src: BlendFactor,
        dest: BlendFactor,
    },
    DisableBlend,
}

/// Size of mip level `level`: each side halves per level, never below 1.
pub fn size_at_mip_level(width: usize, height: usize, level: usize) -> (usize, usize) {
    let shift = |side: usize| side.checked_shr(level as u32).unwrap_or(0).max(1);
    (shift(width), shift(height))
}

/// A texture and its pixel data until it is uploaded to the renderer.
///
/// Once prepared, the buffers are dropped and the texture is addressed by
/// its renderer id.
#[derive(Debug, Clone)]
pub struct Texture {
    name: String,
    absolute_path: PathBuf,
    relative_path: PathBuf,
    width: usize,
    height: usize,
    average_color: Color,
    usage_count: usize,
    overridden: bool,
    format: TextureFormat,
    texture_type: TextureType,
    surface_parms: BTreeSet<String>,
    culling: TextureCulling,
    blend_func: TextureBlendFunc,
    texture_id: u32,
    buffers: Vec<Vec<u8>>,
}

impl Texture {
    /// Create a texture from one buffer per mip level.
    pub fn new(
        name: impl Into<String>,
        width: usize,
        height: usize,
        average_color: Color,
        buffers: Vec<Vec<u8>>,
        format: TextureFormat,
        texture_type: TextureType,
    ) -> Result<Self, AssetError> {
        let name = name.into();
        if width == 0 || height == 0 {
            return Err(AssetError::InvalidSize {
                name,
                width,
                height,
            });
        }
        for (level, buffer) in buffers.iter().enumerate() {
            let (w, h) = size_at_mip_level(width, height, level);
            let expected = format.bytes_per_pixel() * w * h;
            if buffer.len() < expected {
                return Err(AssetError::BufferTooSmall {
                    name,
                    level,
                    expected,
                    actual: buffer.len(),
                });
            }
        }
        let mut texture = Self::placeholder(name, width, height, format, texture_type);
        texture.average_color = average_color;
        texture.buffers = buffers;
        Ok(texture)
    }

    /// A texture without pixel data, e.g. one whose file failed to load.
    pub fn placeholder(
        name: impl Into<String>,
        width: usize,
        height: usize,
        format: TextureFormat,
        texture_type: TextureType,
    ) -> Self {
        Self {
            name: name.into(),
            absolute_path: PathBuf::new(),
            relative_path: PathBuf::new(),
            width,
            height,
            average_color: Color::default(),
            usage_count: 0,
            overridden: false,
            format,
            texture_type,
            surface_parms: BTreeSet::new(),
            culling: TextureCulling::Default,
            blend_func: TextureBlendFunc::UseDefault,
            texture_id: 0,
            buffers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    pub fn set_absolute_path(&mut self, path: impl Into<PathBuf>) {
        self.absolute_path = path.into();
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    pub fn set_relative_path(&mut self, path: impl Into<PathBuf>) {
        self.relative_path = path.into();
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn average_color(&self) -> Color {
        self.average_color
    }

    pub fn masked(&self) -> bool {
        self.texture_type == TextureType::Masked
    }

    pub fn set_opaque(&mut self) {
        self.texture_type = TextureType::Opaque;
    }

    pub fn surface_parms(&self) -> &BTreeSet<String> {
        &self.surface_parms
    }

    pub fn set_surface_parms(&mut self, parms: BTreeSet<String>) {
        self.surface_parms = parms;
    }

    pub fn culling(&self) -> TextureCulling {
        self.culling
    }

    pub fn set_culling(&mut self, culling: TextureCulling) {
        self.culling = culling;
    }

    pub fn blend_func(&self) -> TextureBlendFunc {
        self.blend_func
    }

    pub fn set_blend_func(&mut self, src: BlendFactor, dest: BlendFactor) {
        self.blend_func = TextureBlendFunc::UseFactors { src, dest };
    }

    pub fn disable_blend(&mut self) {
        self.blend_func = TextureBlendFunc::DisableBlend;
    }

    pub fn usage_count(&self) -> usize {
        self.usage_count
    }

    pub fn inc_usage_count(&mut self) {
        self.usage_count += 1;
    }

    pub fn dec_usage_count(&mut self) -> Result<(), AssetError> {
        self.usage_count = self
            .usage_count
            .checked_sub(1)
            .ok_or_else(|| AssetError::UsageUnderflow(self.name.clone()))?;
        Ok(())
    }

    pub fn overridden(&self) -> bool {
        self.overridden
    }

    pub fn set_overridden(&mut self, overridden: bool) {
        self.overridden = overridden;
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn texture_type(&self) -> TextureType {
        self.texture_type
    }

    pub fn texture_id(&self) -> u32 {
        self.texture_id
    }

    pub fn is_prepared(&self) -> bool {
        self.texture_id != 0
    }

    /// Pixel data per mip level. Empty once the texture is prepared.
    pub fn buffers_if_unprepared(&self) -> &[Vec<u8>] {
        &self.buffers
    }

    /// Upload the pixel data under `texture_id` and drop the buffers.
    ///
    /// A texture without buffers stays unprepared.
    pub fn prepare(
        &mut self,
        backend: &mut dyn TextureBackend,
        texture_id: u32,
        min_filter: TextureFilter,
        mag_filter: TextureFilter,
    ) -> Result<(), AssetError> {
        if texture_id == 0 {
            return Err(AssetError::InvalidTextureId(self.name.clone()));
        }
        if self.is_prepared() {
            return Err(AssetError::AlreadyPrepared(self.name.clone()));
        }
        if self.buffers.is_empty() {
            tracing::debug!(texture = %self.name, "no pixel data, not preparing");
            return Ok(());
        }

        backend.bind_texture(texture_id);
        backend.set_filters(min_filter, mag_filter);
        backend.set_wrap_repeat();

        let levels = if self.masked() {
            backend.set_generate_mipmaps(false);
            backend.set_filters(TextureFilter::Nearest, TextureFilter::Nearest);
            1
        } else if self.buffers.len() == 1 {
            backend.set_generate_mipmaps(true);
            1
        } else {
            backend.set_max_level(self.buffers.len() - 1);
            self.buffers.len()
        };

        for (level, buffer) in self.buffers.iter().take(levels).enumerate() {
            let (w, h) = size_at_mip_level(self.width, self.height, level);
            backend.upload(level, w, h, self.format, buffer);
        }

        tracing::debug!(texture = %self.name, texture_id, levels, "texture prepared");
        self.buffers.clear();
        self.texture_id = texture_id;
        Ok(())
    }

    /// Change the filters of a prepared texture. Masked textures always use
    /// nearest filtering.
    pub fn set_mode(
        &self,
        backend: &mut dyn TextureBackend,
        min_filter: TextureFilter,
        mag_filter: TextureFilter,
    ) {
        if !self.is_prepared() {
            return;
        }
        self.activate(backend);
        if self.masked() {
            backend.set_filters(TextureFilter::Nearest, TextureFilter::Nearest);
        } else {
            backend.set_filters(min_filter, mag_filter);
        }
        self.deactivate(backend);
    }

    /// Bind the texture and apply its culling and blend state.
    pub fn activate(&self, backend: &mut dyn TextureBackend) {
        if !self.is_prepared() {
            return;
        }
        backend.bind_texture(self.texture_id);
        match self.culling {
            TextureCulling::None => backend.set_face_culling(false),
            TextureCulling::Front => backend.cull_face(CullFace::Front),
            TextureCulling::Both => backend.cull_face(CullFace::FrontAndBack),
            TextureCulling::Default | TextureCulling::Back => {}
        }
        match self.blend_func {
            TextureBlendFunc::UseDefault => {}
            TextureBlendFunc::UseFactors { src, dest } => {
                backend.push_blend_state();
                backend.blend_func(src, dest);
            }
            TextureBlendFunc::DisableBlend => {
                backend.push_blend_state();
                backend.disable_blend();
            }
        }
    }

    /// Undo what `activate` changed and unbind the texture.
    pub fn deactivate(&self, backend: &mut dyn TextureBackend) {
        if !self.is_prepared() {
            return;
        }
        if self.blend_func != TextureBlendFunc::UseDefault {
            backend.pop_blend_state();
        }
        match self.culling {
            TextureCulling::None => backend.set_face_culling(true),
            TextureCulling::Front | TextureCulling::Both => backend.cull_face(CullFace::Back),
            TextureCulling::Default | TextureCulling::Back => {}
        }
        backend.bind_texture(0);
    }
}
