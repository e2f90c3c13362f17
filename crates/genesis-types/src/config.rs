//! Shared configuration structures.

use serde::{Deserialize, Serialize};

/// Connection settings for a secret store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store URL
    pub url: String,

    /// Store alias/name
    #[serde(default = "default_store_name")]
    pub name: String,

    /// Skip TLS verification
    #[serde(default)]
    pub insecure: bool,

    /// Vault namespace (Enterprise)
    #[serde(default)]
    pub namespace: Option<String>,

    /// Mount point for secrets
    #[serde(default = "default_mount")]
    pub mount: String,
}

fn default_store_name() -> String {
    "default".to_string()
}

fn default_mount() -> String {
    "/secret/".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "https://127.0.0.1:8200".to_string(),
            name: default_store_name(),
            insecure: false,
            namespace: None,
            mount: default_mount(),
        }
    }
}

