//! Type-safe identifiers and version types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{GenesisError, Result};

/// A validated Genesis environment name.
///
/// Environment names must:
/// - Start with a lowercase letter or digit
/// - Contain only lowercase letters, digits, and hyphens
/// - Not start or end with a hyphen
///
/// # Example
///
/// ```
/// use genesis_types::EnvName;
///
/// let env = EnvName::new("us-west-prod").unwrap();
/// assert_eq!(env.as_str(), "us-west-prod");
///
/// // Invalid names are rejected
/// assert!(EnvName::new("Invalid-Name").is_err());
/// assert!(EnvName::new("-invalid").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvName(String);

impl EnvName {
    /// Create a new validated environment name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name doesn't meet validation requirements.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        if !Self::is_valid(name) {
            return Err(GenesisError::Validation(format!(
                "Invalid environment name '{}': must contain only lowercase letters, digits, and hyphens, \
                and must start with a letter or digit",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Check if a name is valid without allocating.
    pub fn is_valid(name: &str) -> bool {
        if name.is_empty() || name.ends_with('-') {
            return false;
        }

        let mut chars = name.chars();
        let first = chars.next().unwrap();

        // Must start with lowercase letter or digit
        if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
            return false;
        }

        // All characters must be lowercase, digits, or hyphens
        chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The vault path slug for this environment (hyphens become slashes).
    ///
    /// For example, "us-west-prod" becomes "us/west/prod".
    pub fn slug(&self) -> String {
        self.0.replace('-', "/")
    }

    /// Extract the prefix components of an environment name.
    ///
    /// For example, "us-west-prod" returns ["us", "us-west", "us-west-prod"]
    pub fn prefixes(&self) -> Vec<String> {
        let parts: Vec<&str> = self.0.split('-').collect();
        let mut prefixes = Vec::new();

        for i in 1..=parts.len() {
            prefixes.push(parts[..i].join("-"));
        }

        prefixes
    }
}

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EnvName {
    type Err = GenesisError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A validated secret path, optionally carrying a key (`P` or `P:K`).
///
/// Vault paths never contain `:`; the single-colon `P:K` form is the only
/// exception, used by `random` and `uuid` plans to address one key under a
/// path. Keys themselves never contain `:`.
///
/// # Example
///
/// ```
/// use genesis_types::SecretPath;
///
/// let plain = SecretPath::parse("things/admin").unwrap();
/// assert!(plain.key().is_none());
///
/// let keyed = SecretPath::parse("things/admin:password").unwrap();
/// assert_eq!(keyed.key(), Some("password"));
///
/// assert!(SecretPath::parse("a:b:c").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretPath {
    path: String,
    key: Option<String>,
}

impl SecretPath {
    /// Parse a `P` or `P:K` form.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        let path = parts.next().unwrap_or("");
        let key = parts.next();

        if parts.next().is_some() {
            return Err(GenesisError::Secret(format!(
                "Secret path '{}' contains more than one colon",
                s
            )));
        }
        if path.is_empty() {
            return Err(GenesisError::Secret(format!("Secret path '{}' has an empty path", s)));
        }
        if let Some(k) = key {
            if k.is_empty() {
                return Err(GenesisError::Secret(format!("Secret path '{}' has an empty key", s)));
            }
        }

        Ok(Self {
            path: path.to_string(),
            key: key.map(String::from),
        })
    }

    /// The vault path portion.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The key portion, if the `P:K` form was used.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(k) => write!(f, "{}:{}", self.path, k),
            None => write!(f, "{}", self.path),
        }
    }
}

/// Semantic version type following semver 2.0.0 specification.
///
/// # Example
///
/// ```
/// use genesis_types::SemVer;
///
/// let v1 = SemVer::parse("1.2.3").unwrap();
/// let v2 = SemVer::parse("1.2.4").unwrap();
/// assert!(v1 < v2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemVer {
    /// Major version number (incompatible API changes)
    pub major: u32,
    /// Minor version number (backwards-compatible features)
    pub minor: u32,
    /// Patch version number (backwards-compatible bug fixes)
    pub patch: u32,
    /// Pre-release version identifier
    pub pre_release: Option<String>,
    /// Build metadata
    pub build: Option<String>,
}

impl SemVer {
    /// Parse a semantic version string.
    ///
    /// # Errors
    ///
    /// Returns an error if the version string is not valid semver.
    pub fn parse(version: &str) -> Result<Self> {
        let (core, build) = match version.split_once('+') {
            Some((c, b)) => (c, Some(b.to_string())),
            None => (version, None),
        };
        let (core, pre_release) = match core.split_once('-') {
            Some((c, p)) => (c, Some(p.to_string())),
            None => (core, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(GenesisError::Validation(format!(
                "Invalid semantic version '{}': expected format X.Y.Z",
                version
            )));
        }

        let major = parts[0].parse().map_err(|_| {
            GenesisError::Validation(format!("Invalid major version: {}", parts[0]))
        })?;

        let minor = parts[1].parse().map_err(|_| {
            GenesisError::Validation(format!("Invalid minor version: {}", parts[1]))
        })?;

        let patch = parts[2].parse().map_err(|_| {
            GenesisError::Validation(format!("Invalid patch version: {}", parts[2]))
        })?;

        Ok(Self {
            major,
            minor,
            patch,
            pre_release,
            build,
        })
    }

    /// Check if this version meets a minimum version requirement.
    pub fn meets_requirement(&self, min: &SemVer) -> bool {
        self >= min
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre_release {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.major.cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then(self.pre_release.cmp(&other.pre_release))
    }
}
