//! Kit metadata parsing and validation.

use genesis_types::{GenesisError, Result, SemVer};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::Path;

/// Kit metadata from kit.yml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitMetadata {
    /// Kit name
    pub name: String,

    /// Kit version
    pub version: String,

    /// Kit author
    #[serde(default)]
    pub author: String,

    /// Kit description
    #[serde(default)]
    pub description: String,

    /// Minimum Genesis version required
    #[serde(default)]
    pub genesis_version_min: Option<String>,

    /// Available features
    #[serde(default)]
    pub features: HashMap<String, FeatureMetadata>,

    /// Declarative secret groupings, keyed by feature
    #[serde(flatten)]
    pub secrets: SecretsMetadata,
}

/// Feature metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureMetadata {
    /// Feature description
    #[serde(default)]
    pub description: String,

    /// Features this feature depends on
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Features incompatible with this one
    #[serde(default)]
    pub conflicts_with: Vec<String>,

    /// Whether this is a default feature
    #[serde(default)]
    pub default: bool,
}

/// The three declarative secret groupings of a kit, each keyed by feature.
///
/// The shapes under each feature vary per grouping (and kits get them wrong
/// often enough that parse failures must be reportable per path), so these
/// stay raw YAML until the plan parser walks them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretsMetadata {
    /// `certificates: { <feature>: { <base-path>: { <leaf>: <x509-spec> } } }`
    #[serde(default)]
    pub certificates: Value,

    /// `credentials: { <feature>: { <path>: <string-spec> | { <key>: <cred-line> } } }`
    #[serde(default)]
    pub credentials: Value,

    /// `provided: { <feature>: { <path>: { type, keys: {...} } } }`
    #[serde(default)]
    pub provided: Value,
}

impl SecretsMetadata {
    /// The block of a grouping enabled by one feature, if any.
    pub fn feature_block<'a>(section: &'a Value, feature: &str) -> Option<&'a Value> {
        match section {
            Value::Mapping(_) => section.get(feature),
            _ => None,
        }
    }

    /// Whether the kit declares any secrets at all.
    pub fn is_empty(&self) -> bool {
        [&self.certificates, &self.credentials, &self.provided]
            .iter()
            .all(|v| matches!(v, Value::Null))
    }
}

impl KitMetadata {
    /// Load metadata from kit.yml file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = genesis_core::util::fs::expand_path(path);
        let doc = genesis_core::util::data::load_yaml_file(&path)
            .map_err(|e| GenesisError::Kit(format!("Failed to read kit.yml: {}", e)))?;

        serde_yaml::from_value(doc)
            .map_err(|e| GenesisError::Kit(format!("Failed to parse kit.yml: {}", e)))
    }

    /// Parse metadata from a single YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::from_fragments(&[content])
    }

    /// Parse metadata from a base document plus overlay fragments,
    /// deep-merged in order (later fragments win per key).
    pub fn from_fragments(fragments: &[&str]) -> Result<Self> {
        let mut merged = Value::Null;
        for fragment in fragments {
            let doc = genesis_core::util::data::load_yaml(fragment)
                .map_err(|e| GenesisError::Kit(format!("Failed to parse kit.yml: {}", e)))?;
            merged = genesis_core::util::data::deep_merge(merged, doc);
        }

        serde_yaml::from_value(merged)
            .map_err(|e| GenesisError::Kit(format!("Failed to parse kit.yml: {}", e)))
    }

    /// Validate metadata.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(GenesisError::Kit("Kit name cannot be empty".to_string()));
        }

        if self.version.is_empty() {
            return Err(GenesisError::Kit("Kit version cannot be empty".to_string()));
        }

        SemVer::parse(&self.version)
            .map_err(|_| GenesisError::Kit(format!("Invalid kit version: {}", self.version)))?;

        if let Some(ref min_version) = self.genesis_version_min {
            SemVer::parse(min_version)
                .map_err(|_| GenesisError::Kit(format!(
                    "Invalid genesis_version_min: {}",
                    min_version
                )))?;
        }

        Ok(())
    }

    /// Check if a feature exists.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains_key(feature)
    }

    /// Get default features.
    pub fn default_features(&self) -> Vec<String> {
        self.features.iter()
            .filter(|(_, meta)| meta.default)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Validate feature dependencies.
    ///
    /// `base` is implicit and always valid; anything else must be declared,
    /// have its dependencies enabled, and not conflict.
    pub fn validate_features(&self, features: &[String]) -> Result<()> {
        for feature in features {
            if feature == "base" {
                continue;
            }

            if !self.has_feature(feature) {
                return Err(GenesisError::Kit(format!(
                    "Unknown feature: {}",
                    feature
                )));
            }

            let meta = &self.features[feature];

            for dep in &meta.depends_on {
                if !features.contains(dep) {
                    return Err(GenesisError::Kit(format!(
                        "Feature '{}' requires feature '{}'",
                        feature, dep
                    )));
                }
            }

            for conflict in &meta.conflicts_with {
                if features.contains(conflict) {
                    return Err(GenesisError::Kit(format!(
                        "Feature '{}' conflicts with feature '{}'",
                        feature, conflict
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIT_YML: &str = r#"
name: shield
version: 2.1.0
features:
  ha:
    description: high availability
    depends_on: [backups]
  backups:
    description: scheduled backups
certificates:
  base:
    my-cert:
      ca: { is_ca: true }
      server: { names: [srv.example] }
credentials:
  base:
    crazy/thing:
      id: random 32 fixed
provided:
  ha:
    creds/manual:
      type: generic
      keys:
        license: { sensitive: true }
"#;

    #[test]
    fn test_parse_kit_with_secret_groupings() {
        let kit = KitMetadata::from_yaml(KIT_YML).unwrap();
        kit.validate().unwrap();

        assert_eq!(kit.name, "shield");
        assert!(kit.has_feature("ha"));
        assert!(!kit.secrets.is_empty());

        let base_certs =
            SecretsMetadata::feature_block(&kit.secrets.certificates, "base").unwrap();
        assert!(base_certs.get("my-cert").is_some());
        assert!(SecretsMetadata::feature_block(&kit.secrets.certificates, "ha").is_none());
    }

    #[test]
    fn test_validate_features() {
        let kit = KitMetadata::from_yaml(KIT_YML).unwrap();

        kit.validate_features(&["base".into()]).unwrap();
        kit.validate_features(&["base".into(), "backups".into(), "ha".into()])
            .unwrap();

        assert!(kit.validate_features(&["nope".into()]).is_err());
        // ha requires backups
        assert!(kit.validate_features(&["base".into(), "ha".into()]).is_err());
    }

    #[test]
    fn test_from_fragments_merges_overlays() {
        let overlay = "credentials:\n  base:\n    extra/key: rsa 2048\nversion: 2.2.0\n";
        let kit = KitMetadata::from_fragments(&[KIT_YML, overlay]).unwrap();

        assert_eq!(kit.version, "2.2.0");
        let base_creds =
            SecretsMetadata::feature_block(&kit.secrets.credentials, "base").unwrap();
        // overlay adds a path; the base document's entries survive the merge
        assert!(base_creds.get("extra/key").is_some());
        assert!(base_creds.get("crazy/thing").is_some());
    }

    #[test]
    fn test_validate_rejects_bad_version() {
        let mut kit = KitMetadata::from_yaml(KIT_YML).unwrap();
        kit.version = "not-a-version".into();
        assert!(kit.validate().is_err());
    }
}
