use mapwright_common::Color;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::AssetError;
use crate::backend::{TextureBackend, TextureFilter};
use crate::texture::{Texture, TextureBlendFunc, TextureCulling, TextureFormat, TextureType};

/// Content-derived texture id: the first eight bytes of a SHA-256 over the
/// texture's name, size and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureId(pub u64);

impl TextureId {
    pub fn of(name: &str, width: usize, height: usize, format: TextureFormat) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update((width as u64).to_le_bytes());
        hasher.update((height as u64).to_le_bytes());
        hasher.update([format as u8]);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        TextureId(u64::from_le_bytes(bytes))
    }
}

/// Metadata of one texture as written to a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ManifestEntry {
    id: TextureId,
    name: String,
    width: usize,
    height: usize,
    format: TextureFormat,
    texture_type: TextureType,
    average_color: Color,
    relative_path: PathBuf,
    #[serde(default)]
    surface_parms: BTreeSet<String>,
    #[serde(default)]
    culling: TextureCulling,
    #[serde(default)]
    blend_func: TextureBlendFunc,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    path: PathBuf,
    textures: Vec<ManifestEntry>,
}

/// Textures loaded from one source (a wad file or a texture directory).
#[derive(Debug, Clone, Default)]
pub struct TextureCollection {
    path: PathBuf,
    textures: BTreeMap<TextureId, Texture>,
}

impl TextureCollection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            textures: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a texture and return its id. A texture with the same id is
    /// replaced.
    pub fn add(&mut self, texture: Texture) -> TextureId {
        let id = TextureId::of(
            texture.name(),
            texture.width(),
            texture.height(),
            texture.format(),
        );
        if self.textures.insert(id, texture).is_some() {
            tracing::debug!(?id, "replaced texture");
        }
        id
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(&id)
    }

    pub fn get_mut(&mut self, id: TextureId) -> Option<&mut Texture> {
        self.textures.get_mut(&id)
    }

    /// Case-insensitive lookup by texture name.
    pub fn find_by_name(&self, name: &str) -> Option<&Texture> {
        self.textures
            .values()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    pub fn textures(&self) -> impl Iterator<Item = (TextureId, &Texture)> {
        self.textures.iter().map(|(id, t)| (*id, t))
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Number of textures referenced at least once.
    pub fn used_count(&self) -> usize {
        self.textures.values().filter(|t| t.usage_count() > 0).count()
    }

    /// Prepare every texture that still holds pixel data, allocating a
    /// renderer id for each. Returns how many were prepared.
    pub fn prepare(
        &mut self,
        backend: &mut dyn TextureBackend,
        min_filter: TextureFilter,
        mag_filter: TextureFilter,
    ) -> Result<usize, AssetError> {
        let mut prepared = 0;
        for texture in self.textures.values_mut() {
            if texture.is_prepared() || texture.buffers_if_unprepared().is_empty() {
                continue;
            }
            let id = backend.create_texture();
            texture.prepare(backend, id, min_filter, mag_filter)?;
            prepared += 1;
        }
        tracing::info!(path = %self.path.display(), prepared, "texture collection prepared");
        Ok(prepared)
    }

    /// Save texture metadata (no pixel data) to a JSON file.
    pub fn save_manifest(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let manifest = Manifest {
            path: self.path.clone(),
            textures: self
                .textures
                .iter()
                .map(|(id, t)| ManifestEntry {
                    id: *id,
                    name: t.name().to_string(),
                    width: t.width(),
                    height: t.height(),
                    format: t.format(),
                    texture_type: t.texture_type(),
                    average_color: t.average_color(),
                    relative_path: t.relative_path().to_path_buf(),
                    surface_parms: t.surface_parms().clone(),
                    culling: t.culling(),
                    blend_func: t.blend_func(),
                })
                .collect(),
        };
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &manifest)?;
        Ok(())
    }

    /// Load a manifest. Textures come back as placeholders without pixel
    /// data.
    pub fn load_manifest(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path.as_ref())?;
        let manifest: Manifest = serde_json::from_reader(file)?;
        let mut collection = Self::new(manifest.path);
        for entry in manifest.textures {
            let mut texture = Texture::placeholder(
                entry.name,
                entry.width,
                entry.height,
                entry.format,
                entry.texture_type,
            );
            texture.set_relative_path(entry.relative_path);
            texture.set_surface_parms(entry.surface_parms);
            texture.set_culling(entry.culling);
            match entry.blend_func {
                TextureBlendFunc::UseDefault => {}
                TextureBlendFunc::UseFactors { src, dest } => texture.set_blend_func(src, dest),
                TextureBlendFunc::DisableBlend => texture.disable_blend(),
            }
            let id = collection.add(texture);
            if id != entry.id {
                tracing::warn!(expected = ?entry.id, actual = ?id, "manifest texture id mismatch");
            }
        }
        tracing::debug!(path = %path.as_ref().display(), textures = collection.len(), "loaded manifest");
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BlendFactor, RecordingBackend};

    fn solid(name: &str, size: usize) -> Texture {
        Texture::new(
            name,
            size,
            size,
            Color::new(0.5, 0.5, 0.5, 1.0),
            vec![vec![128; 3 * size * size]],
            TextureFormat::Rgb,
            TextureType::Opaque,
        )
        .unwrap()
    }

    #[test]
    fn content_addressed_ids() {
        let mut collection = TextureCollection::new("base.wad");
        let a = collection.add(solid("brick", 16));
        let b = collection.add(solid("brick", 16));
        let c = collection.add(solid("brick", 32));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn find_by_name_ignores_case() {
        let mut collection = TextureCollection::new("base.wad");
        let id = collection.add(solid("BRICK1", 16));
        assert_eq!(collection.find_by_name("brick1").map(Texture::name), Some("BRICK1"));
        assert!(collection.find_by_name("stone").is_none());

        collection.get_mut(id).unwrap().inc_usage_count();
        assert_eq!(collection.used_count(), 1);
    }

    #[test]
    fn prepare_allocates_ids() {
        let mut collection = TextureCollection::new("base.wad");
        let a = collection.add(solid("a", 8));
        collection.add(solid("b", 8));
        collection.add(Texture::placeholder(
            "missing",
            8,
            8,
            TextureFormat::Rgb,
            TextureType::Opaque,
        ));

        let mut backend = RecordingBackend::new();
        let prepared = collection
            .prepare(&mut backend, TextureFilter::Linear, TextureFilter::Linear)
            .unwrap();
        assert_eq!(prepared, 2);
        assert!(collection.get(a).unwrap().is_prepared());
        assert_eq!(backend.upload_count(), 2);
    }

    #[test]
    fn manifest_save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut collection = TextureCollection::new("textures/base");
        let mut water = solid("*water", 64);
        water.set_relative_path("liquids/water.tga");
        water.set_blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        water.set_culling(TextureCulling::None);
        let id = collection.add(water);
        collection.save_manifest(tmp.path()).unwrap();

        let loaded = TextureCollection::load_manifest(tmp.path()).unwrap();
        assert_eq!(loaded.path(), Path::new("textures/base"));
        let texture = loaded.get(id).unwrap();
        assert_eq!(texture.width(), 64);
        assert_eq!(texture.relative_path(), Path::new("liquids/water.tga"));
        assert_eq!(texture.culling(), TextureCulling::None);
        assert!(matches!(texture.blend_func(), TextureBlendFunc::UseFactors { .. }));
        assert!(texture.buffers_if_unprepared().is_empty());
    }
}
