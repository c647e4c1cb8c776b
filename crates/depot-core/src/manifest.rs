//! Manifest parsing for depot.yml
//!
//! The manifest is the user's declared intent: which assets exist, where
//! they are packed from, where they land on pull. Assets keep their YAML
//! declaration order; the lockfile is serialized in the same order, which
//! is what makes re-resolving with unchanged inputs byte-identical.

use std::path::Path;

use depot_fs::RelPath;
use serde_yaml::Value;
use tracing::debug;

use crate::{Error, Result};

/// Default manifest filename.
pub const MANIFEST_FILE: &str = "depot.yml";

/// One declared asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    /// Asset name; the remote object is named `<name>.zip`.
    pub name: String,

    /// Local directory packed on push, relative to the working dir.
    /// Defaults to the asset name when omitted.
    pub source: RelPath,

    /// Local directory populated on pull, relative to the working dir.
    pub destination: RelPath,

    /// Ordered glob patterns excluded when packing.
    pub excludes: Vec<String>,
}

/// Parsed, validated manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Remote store location, `owner/repo`.
    pub repository: String,

    /// Target release tag.
    pub version: String,

    /// Assets in declaration order.
    pub assets: Vec<AssetSpec>,
}

impl Manifest {
    /// Load and validate a manifest file.
    ///
    /// # Errors
    ///
    /// [`Error::ManifestNotFound`] if the file is absent,
    /// [`Error::Validation`] if it does not parse or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| depot_fs::Error::io(path, e))?;
        Self::parse(&content)
    }

    /// Parse manifest content.
    ///
    /// Parsing walks the raw YAML document rather than deriving, for two
    /// reasons: mapping order must be preserved (it fixes the lockfile's
    /// serialization order) and duplicate asset keys must be rejected
    /// instead of silently overwriting.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] on malformed or inconsistent content.
    pub fn parse(content: &str) -> Result<Self> {
        let doc: Value = serde_yaml::from_str(content)
            .map_err(|e| Error::validation(format!("YAML parse error: {e}")))?;

        let root = doc
            .as_mapping()
            .ok_or_else(|| Error::validation("root must be a mapping"))?;

        let repository = require_str(root, "repository")?;
        let version = require_str(root, "version")?;

        let mut assets = Vec::new();
        if let Some(raw_assets) = root.get(Value::from("assets")) {
            let mapping = raw_assets
                .as_mapping()
                .ok_or_else(|| Error::validation("assets must be a mapping"))?;

            for (key, spec) in mapping {
                let name = key
                    .as_str()
                    .ok_or_else(|| Error::validation("asset names must be strings"))?;
                assets.push(parse_asset(name, spec)?);
            }
        }

        let manifest = Self {
            repository,
            version,
            assets,
        };
        manifest.validate()?;
        debug!(
            repository = %manifest.repository,
            version = %manifest.version,
            assets = manifest.assets.len(),
            "manifest loaded"
        );
        Ok(manifest)
    }

    /// Look up an asset by name.
    pub fn get(&self, name: &str) -> Option<&AssetSpec> {
        self.assets.iter().find(|a| a.name == name)
    }

    /// Structural validation: unique names, valid names, non-overlapping
    /// destinations.
    fn validate(&self) -> Result<()> {
        if self.repository.is_empty() {
            return Err(Error::validation("repository must not be empty"));
        }
        if self.version.is_empty() {
            return Err(Error::validation("version must not be empty"));
        }

        for (i, asset) in self.assets.iter().enumerate() {
            if !is_valid_asset_name(&asset.name) {
                return Err(Error::validation(format!(
                    "invalid asset name '{}'",
                    asset.name
                )));
            }
            for other in &self.assets[i + 1..] {
                if asset.name == other.name {
                    return Err(Error::validation(format!(
                        "duplicate asset name '{}'",
                        asset.name
                    )));
                }
                if destinations_overlap(&asset.destination, &other.destination) {
                    return Err(Error::validation(format!(
                        "destinations of '{}' and '{}' overlap: {} vs {}",
                        asset.name, other.name, asset.destination, other.destination
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_asset(name: &str, spec: &Value) -> Result<AssetSpec> {
    let mapping = spec
        .as_mapping()
        .ok_or_else(|| Error::validation(format!("asset '{name}' must be a mapping")))?;

    let source_raw = match mapping.get(Value::from("source")) {
        Some(v) => v
            .as_str()
            .ok_or_else(|| Error::validation(format!("asset '{name}' source must be a string")))?
            .to_string(),
        None => name.to_string(),
    };

    let destination_raw = mapping
        .get(Value::from("destination"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::validation(format!("asset '{name}' missing required field: destination"))
        })?;

    let mut excludes = Vec::new();
    if let Some(raw) = mapping.get(Value::from("excludes")) {
        let seq = raw.as_sequence().ok_or_else(|| {
            Error::validation(format!("asset '{name}' excludes must be a list"))
        })?;
        for item in seq {
            let pattern = item.as_str().ok_or_else(|| {
                Error::validation(format!("asset '{name}' excludes must be strings"))
            })?;
            excludes.push(pattern.to_string());
        }
    }

    let source = RelPath::new(&source_raw).map_err(|_| {
        Error::validation(format!("asset '{name}' source is not a clean relative path"))
    })?;
    let destination = RelPath::new(destination_raw).map_err(|_| {
        Error::validation(format!(
            "asset '{name}' destination is not a clean relative path"
        ))
    })?;

    Ok(AssetSpec {
        name: name.to_string(),
        source,
        destination,
        excludes,
    })
}

fn require_str(mapping: &serde_yaml::Mapping, field: &str) -> Result<String> {
    mapping
        .get(Value::from(field))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::validation(format!("missing required field: {field}")))
}

/// Asset names become remote object filenames, so keep them conservative.
fn is_valid_asset_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !name.starts_with('.')
}

/// Two destinations overlap when equal or when one contains the other.
fn destinations_overlap(a: &RelPath, b: &RelPath) -> bool {
    let (a, b) = (a.as_str(), b.as_str());
    a == b
        || a.starts_with(&format!("{b}/"))
        || b.starts_with(&format!("{a}/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const BASIC: &str = r#"
repository: "acme/datasets"
version: "v1.2.0"

assets:
  models:
    source: "build/models"
    destination: "assets/models"
    excludes:
      - "**/*.tmp"
  textures:
    destination: "assets/textures"
"#;

    #[test]
    fn parses_assets_in_declaration_order() {
        let manifest = Manifest::parse(BASIC).unwrap();
        assert_eq!(manifest.repository, "acme/datasets");
        assert_eq!(manifest.version, "v1.2.0");

        let names: Vec<_> = manifest.assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["models", "textures"]);
    }

    #[test]
    fn source_defaults_to_asset_name() {
        let manifest = Manifest::parse(BASIC).unwrap();
        let textures = manifest.get("textures").unwrap();
        assert_eq!(textures.source.as_str(), "textures");
        assert!(textures.excludes.is_empty());
    }

    #[test]
    fn excludes_keep_order() {
        let manifest = Manifest::parse(
            r#"
repository: "acme/datasets"
version: "v1"
assets:
  data:
    destination: "d"
    excludes: ["*.log", "*.tmp"]
"#,
        )
        .unwrap();
        assert_eq!(
            manifest.get("data").unwrap().excludes,
            vec!["*.log", "*.tmp"]
        );
    }

    #[test]
    fn missing_repository_is_rejected() {
        let err = Manifest::parse("version: v1\n").unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn missing_destination_is_rejected() {
        let err = Manifest::parse(
            r#"
repository: "acme/datasets"
version: "v1"
assets:
  data:
    source: "data"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("destination"));
    }

    #[test]
    fn overlapping_destinations_are_rejected() {
        let err = Manifest::parse(
            r#"
repository: "acme/datasets"
version: "v1"
assets:
  all:
    destination: "assets"
  models:
    destination: "assets/models"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn sibling_destinations_do_not_overlap() {
        let manifest = Manifest::parse(
            r#"
repository: "acme/datasets"
version: "v1"
assets:
  a:
    destination: "assets/a"
  ab:
    destination: "assets/ab"
"#,
        )
        .unwrap();
        assert_eq!(manifest.assets.len(), 2);
    }

    #[test]
    fn absolute_destination_is_rejected() {
        let err = Manifest::parse(
            r#"
repository: "acme/datasets"
version: "v1"
assets:
  data:
    destination: "/abs/path"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn traversal_in_destination_is_rejected() {
        let err = Manifest::parse(
            r#"
repository: "acme/datasets"
version: "v1"
assets:
  data:
    destination: "../outside"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[rstest]
    #[case("bad/name")]
    #[case(".hidden")]
    #[case("spaced name")]
    #[case("")]
    fn invalid_asset_name_is_rejected(#[case] name: &str) {
        let content = format!(
            "repository: \"acme/datasets\"\nversion: \"v1\"\nassets:\n  \"{name}\":\n    destination: \"d\"\n"
        );
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.to_string().contains("invalid asset name"));
    }

    #[test]
    fn load_missing_file_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::load(&dir.path().join(MANIFEST_FILE)).unwrap_err();
        assert!(matches!(err, Error::ManifestNotFound { .. }));
    }
}
