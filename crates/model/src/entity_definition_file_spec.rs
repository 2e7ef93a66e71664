use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const BUILTIN_PREFIX: &str = "builtin:";
const EXTERNAL_PREFIX: &str = "external:";

/// Where the entity definitions of a map come from.
///
/// Stored on the worldspawn as a string: `builtin:<path>` for a definition
/// file shipped with the game configuration, `external:<path>` for a file
/// chosen by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityDefinitionFileSpec {
    #[default]
    Unset,
    Builtin(PathBuf),
    External(PathBuf),
}

impl EntityDefinitionFileSpec {
    pub fn builtin(path: impl Into<PathBuf>) -> Self {
        Self::Builtin(path.into())
    }

    pub fn external(path: impl Into<PathBuf>) -> Self {
        Self::External(path.into())
    }

    /// Parse the stored string form. A bare path without a prefix is
    /// read as an external file, as older maps store it that way.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Some(path) = s.strip_prefix(BUILTIN_PREFIX) {
            Self::Builtin(PathBuf::from(path))
        } else if let Some(path) = s.strip_prefix(EXTERNAL_PREFIX) {
            Self::External(PathBuf::from(path))
        } else if s.is_empty() {
            Self::Unset
        } else {
            Self::External(PathBuf::from(s))
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin(_))
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Unset => None,
            Self::Builtin(p) | Self::External(p) => Some(p),
        }
    }
}

impl std::fmt::Display for EntityDefinitionFileSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => Ok(()),
            Self::Builtin(p) => write!(f, "{BUILTIN_PREFIX}{}", p.to_string_lossy()),
            Self::External(p) => write!(f, "{EXTERNAL_PREFIX}{}", p.to_string_lossy()),
        }
    }
}

impl FromStr for EntityDefinitionFileSpec {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_forms() {
        assert_eq!(EntityDefinitionFileSpec::Unset.to_string(), "");
        assert_eq!(
            EntityDefinitionFileSpec::builtin("Quake.fgd").to_string(),
            "builtin:Quake.fgd"
        );
        assert_eq!(
            EntityDefinitionFileSpec::external("/maps/defs/custom.def").to_string(),
            "external:/maps/defs/custom.def"
        );
    }

    #[test]
    fn parse_prefixed() {
        let spec = EntityDefinitionFileSpec::parse("builtin:Quake.fgd");
        assert!(spec.is_builtin());
        assert_eq!(spec.path(), Some(Path::new("Quake.fgd")));

        let spec: EntityDefinitionFileSpec = "external:/tmp/a.fgd".parse().unwrap();
        assert!(spec.is_external());
        assert_eq!(spec.path(), Some(Path::new("/tmp/a.fgd")));
    }

    #[test]
    fn parse_empty_is_unset() {
        assert_eq!(EntityDefinitionFileSpec::parse(""), EntityDefinitionFileSpec::Unset);
        assert_eq!(EntityDefinitionFileSpec::parse("  "), EntityDefinitionFileSpec::Unset);
        assert!(!EntityDefinitionFileSpec::Unset.is_set());
        assert!(EntityDefinitionFileSpec::Unset.path().is_none());
    }

    #[test]
    fn bare_path_is_external() {
        let spec = EntityDefinitionFileSpec::parse("defs/old.def");
        assert_eq!(spec, EntityDefinitionFileSpec::external("defs/old.def"));
    }

    #[test]
    fn string_form_parses_back() {
        for spec in [
            EntityDefinitionFileSpec::Unset,
            EntityDefinitionFileSpec::builtin("Quake2.fgd"),
            EntityDefinitionFileSpec::external("C:/defs/x.fgd"),
        ] {
            assert_eq!(EntityDefinitionFileSpec::parse(&spec.to_string()), spec);
        }
    }
}
