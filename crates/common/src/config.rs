use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound for patch subdivisions per surface. A grid side holds
/// `2^n` quads per surface.
pub const MAX_PATCH_SUBDIVISIONS: usize = 8;

/// Errors from loading or saving the editor configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Editor settings shared by the command layer and the tools.
///
/// Keys missing from a config file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Grid step used to snap vertex moves. Zero disables snapping.
    pub grid_size: f32,
    /// Radius of the pick sphere around a vertex handle.
    pub handle_radius: f32,
    /// Subdivisions per 3x3 surface when a patch grid is built.
    pub patch_subdivisions: usize,
    /// Maximum age of the last stored command for it to absorb a new one.
    pub collation_interval_ms: u64,
    /// Number of undo steps kept. Zero keeps everything.
    pub max_undo_levels: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: 16.0,
            handle_radius: 3.0,
            patch_subdivisions: 3,
            collation_interval_ms: 1000,
            max_undo_levels: 0,
        }
    }
}

impl EditorConfig {
    pub fn collation_interval(&self) -> Duration {
        Duration::from_millis(self.collation_interval_ms)
    }

    /// Load a config from a YAML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Self = serde_yaml::from_reader(file)?;
        config.validate()?;
        tracing::debug!(path = %path.as_ref().display(), "loaded editor config");
        Ok(config)
    }

    /// Write the config as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_yaml::to_writer(file, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid_size >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "grid_size",
                reason: format!("must be non-negative, got {}", self.grid_size),
            });
        }
        if !(self.handle_radius > 0.0) {
            return Err(ConfigError::Invalid {
                key: "handle_radius",
                reason: format!("must be positive, got {}", self.handle_radius),
            });
        }
        if self.patch_subdivisions > MAX_PATCH_SUBDIVISIONS {
            return Err(ConfigError::Invalid {
                key: "patch_subdivisions",
                reason: format!(
                    "at most {MAX_PATCH_SUBDIVISIONS} supported, got {}",
                    self.patch_subdivisions
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.collation_interval(), Duration::from_secs(1));
    }

    #[test]
    fn partial_file_uses_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "grid_size: 8.0").unwrap();
        let config = EditorConfig::load(tmp.path()).unwrap();
        assert_eq!(config.grid_size, 8.0);
        assert_eq!(config.handle_radius, 3.0);
        assert_eq!(config.patch_subdivisions, 3);
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let config = EditorConfig {
            max_undo_levels: 50,
            ..EditorConfig::default()
        };
        config.save(tmp.path()).unwrap();
        assert_eq!(EditorConfig::load(tmp.path()).unwrap(), config);
    }

    #[test]
    fn negative_radius_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "handle_radius: -1.0").unwrap();
        assert!(matches!(
            EditorConfig::load(tmp.path()),
            Err(ConfigError::Invalid { key: "handle_radius", .. })
        ));
    }
}
