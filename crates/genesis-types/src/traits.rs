//! Core trait definitions for Genesis abstractions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::{KeyUsage, StoreStatus};
use crate::errors::Result;

/// A point-in-time dump of every secret under one or more path prefixes.
///
/// Populated by a single `export` per validation run; read-only thereafter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretSnapshot(HashMap<String, HashMap<String, String>>);

impl SecretSnapshot {
    fn norm(path: &str) -> &str {
        path.trim_start_matches('/')
    }

    /// Wrap an already-collected path → key → value map.
    ///
    /// Stores differ on whether exported paths carry a leading slash, so
    /// keys are normalized with it stripped; lookups do the same.
    pub fn from_map(map: HashMap<String, HashMap<String, String>>) -> Self {
        let mut snapshot = Self::default();
        for (path, keys) in map {
            snapshot.insert(path, keys);
        }
        snapshot
    }

    /// All keys stored under a path.
    pub fn get(&self, path: &str) -> Option<&HashMap<String, String>> {
        self.0.get(Self::norm(path))
    }

    /// One value under a path.
    pub fn value(&self, path: &str, key: &str) -> Option<&str> {
        self.get(path).and_then(|m| m.get(key)).map(String::as_str)
    }

    /// Whether a path (or a specific key under it) exists.
    pub fn contains(&self, path: &str, key: Option<&str>) -> bool {
        match key {
            Some(k) => self.value(path, k).is_some(),
            None => self.0.contains_key(Self::norm(path)),
        }
    }

    /// Insert a path's key map, replacing any existing entry.
    pub fn insert(&mut self, path: String, keys: HashMap<String, String>) {
        self.0.insert(Self::norm(&path).to_string(), keys);
    }

    /// Number of paths captured.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over all captured paths.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Everything the store needs to issue (or re-issue) an X.509 certificate.
#[derive(Debug, Clone)]
pub struct X509IssueSpec {
    /// Full vault path the certificate is written to
    pub path: String,
    /// Subject CN and SANs; the first name is the CN
    pub names: Vec<String>,
    /// Issue as a certificate authority
    pub is_ca: bool,
    /// Validity period in days
    pub ttl_days: u32,
    /// Full vault path of the signing CA; None means self-signed
    pub signer: Option<String>,
    /// Key usage and extended key usage to assert
    pub usage: Vec<KeyUsage>,
    /// Leave an existing certificate untouched
    pub no_clobber: bool,
}

/// Trait for secret storage backends.
///
/// `SafeClient` implements this against the external `safe` CLI;
/// `MemoryStore` implements it in-process for tests. All paths are full
/// vault paths (the caller composes environment prefixes).
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// The store's name/alias.
    fn name(&self) -> &str;

    /// Probe availability: TCP reach, initialization, seal state, auth.
    async fn status(&self) -> Result<StoreStatus>;

    /// Read all keys under a path. Absence returns an empty map, not an
    /// error.
    async fn get(&self, path: &str) -> Result<HashMap<String, String>>;

    /// Read one key under a path; None if absent.
    async fn get_key(&self, path: &str, key: &str) -> Result<Option<String>>;

    /// Write one key. With `no_clobber`, an existing value is preserved.
    async fn set(&self, path: &str, key: &str, value: &str, no_clobber: bool) -> Result<()>;

    /// Whether a path (or a specific key under it) exists.
    async fn has(&self, path: &str, key: Option<&str>) -> Result<bool>;

    /// Delete a path and everything under it. Missing paths are tolerated.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Delete a single key under a path. Missing keys are tolerated.
    async fn delete_key(&self, path: &str, key: &str) -> Result<()>;

    /// Dump every secret under the given prefixes in one round-trip.
    async fn export(&self, prefixes: &[String]) -> Result<SecretSnapshot>;

    /// Generate a random string of `size` characters at `path:key`,
    /// optionally constrained to a character policy.
    async fn gen_random(
        &self,
        path: &str,
        key: &str,
        size: usize,
        policy: Option<&str>,
        no_clobber: bool,
    ) -> Result<()>;

    /// Generate an SSH keypair (`private`, `public`, `fingerprint`).
    async fn gen_ssh(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()>;

    /// Generate an RSA keypair (`private`, `public`).
    async fn gen_rsa(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()>;

    /// Generate Diffie-Hellman parameters (`dhparam-pem`).
    async fn gen_dhparams(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()>;

    /// Derive a formatted sibling of an existing value (e.g. base64,
    /// bcrypt) at `path:dest_key`.
    async fn format_value(
        &self,
        path: &str,
        key: &str,
        format: &str,
        dest_key: &str,
        no_clobber: bool,
    ) -> Result<()>;

    /// Issue an X.509 certificate (`certificate`, `key`, `combined`, plus
    /// `crl` and `serial` for CAs).
    async fn issue_x509(&self, spec: &X509IssueSpec) -> Result<()>;

    /// Re-issue an existing certificate with a fresh validity period.
    ///
    /// Returns the store's human-readable renewal report, which includes a
    /// line of the form `Renewed <path> - expiry set to <DATE>`. When
    /// `subject` is given, the subject CN is re-asserted during renewal.
    async fn renew_x509(
        &self,
        path: &str,
        signer: Option<&str>,
        subject: Option<&str>,
    ) -> Result<String>;

    /// Ask the store whether `path`'s certificate is signed by `signer`'s.
    async fn verify_signage(&self, path: &str, signer: &str) -> Result<bool>;
}
