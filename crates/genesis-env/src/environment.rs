//! Genesis environment representation.

use genesis_core::config::resolve_env_refs;
use genesis_types::{EnvName, GenesisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kit selection within an environment file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitSection {
    /// Kit name
    pub name: String,

    /// Kit version
    pub version: String,

    /// Enabled features (beyond the implicit `base`)
    #[serde(default)]
    pub features: Vec<String>,
}

/// Genesis bookkeeping within an environment file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenesisSection {
    /// Environment name
    pub env: String,

    /// Override for the vault path prefix (defaults to the env slug plus
    /// kit name)
    #[serde(default)]
    pub secrets_path: Option<String>,

    /// Path (under the secrets mount) of a shared root CA that signs this
    /// environment's top-level certificates
    #[serde(default)]
    pub root_ca_path: Option<String>,
}

/// A loaded environment file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    /// Genesis bookkeeping
    pub genesis: GenesisSection,

    /// Kit selection
    pub kit: KitSection,

    #[serde(skip)]
    name: Option<EnvName>,
}

impl Environment {
    /// Load and validate an environment from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = genesis_core::util::fs::expand_path(path);
        let content = genesis_core::util::fs::slurp(&path).map_err(|e| {
            GenesisError::Environment(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate an environment from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut env: Environment = serde_yaml::from_str(content)
            .map_err(|e| GenesisError::Environment(format!("Failed to parse env file: {}", e)))?;

        env.name = Some(EnvName::new(&env.genesis.env)?);

        // Metadata values may reference environment variables
        if let Some(ref p) = env.genesis.root_ca_path {
            env.genesis.root_ca_path = Some(resolve_env_refs(p)?);
        }
        if let Some(ref p) = env.genesis.secrets_path {
            env.genesis.secrets_path = Some(resolve_env_refs(p)?);
        }

        Ok(env)
    }

    /// The validated environment name.
    pub fn name(&self) -> &EnvName {
        self.name
            .as_ref()
            .expect("Environment constructed without validation")
    }

    /// Enabled features, always starting with the implicit `base`.
    pub fn features(&self) -> Vec<String> {
        let mut features = vec!["base".to_string()];
        for f in &self.kit.features {
            if f != "base" && !features.contains(f) {
                features.push(f.clone());
            }
        }
        features
    }

    /// The vault prefix this environment's secrets live under, ending with
    /// a slash.
    ///
    /// Defaults to `<mount>/<env-slug>/<kit-name>/`; an explicit
    /// `secrets_path` replaces the slug/kit portion.
    pub fn secrets_base(&self, mount: &str) -> String {
        let mount = mount.trim_end_matches('/');
        let tail = match &self.genesis.secrets_path {
            Some(p) => p.trim_matches('/').to_string(),
            None => format!("{}/{}", self.name().slug(), self.kit.name),
        };
        format!("{}/{}/", mount, tail)
    }

    /// Full path of the shared root CA, if one is configured.
    pub fn root_ca_path(&self) -> Option<&str> {
        self.genesis.root_ca_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_YML: &str = r#"
genesis:
  env: us-west-sandbox
kit:
  name: shield
  version: 2.1.0
  features:
    - ha
"#;

    #[test]
    fn test_load_environment() {
        let env = Environment::from_yaml(ENV_YML).unwrap();
        assert_eq!(env.name().as_str(), "us-west-sandbox");
        assert_eq!(env.features(), vec!["base", "ha"]);
        assert_eq!(env.root_ca_path(), None);
    }

    #[test]
    fn test_secrets_base_default_and_override() {
        let env = Environment::from_yaml(ENV_YML).unwrap();
        assert_eq!(
            env.secrets_base("/secret/"),
            "/secret/us/west/sandbox/shield/"
        );

        let yml = ENV_YML.replace(
            "  env: us-west-sandbox",
            "  env: us-west-sandbox\n  secrets_path: custom/prefix",
        );
        let env = Environment::from_yaml(&yml).unwrap();
        assert_eq!(env.secrets_base("/secret"), "/secret/custom/prefix/");
    }

    #[test]
    fn test_invalid_env_name_rejected() {
        let yml = ENV_YML.replace("us-west-sandbox", "Bad_Name");
        assert!(Environment::from_yaml(&yml).is_err());
    }
}
