//! Secret kind implementations.
//!
//! Each kind is a variant of [`SecretKind`]; the capability set every kind
//! answers (expected keys, description, filterable attributes, plan-level
//! validation) dispatches on the tag.

pub mod x509;
pub mod ssh;
pub mod rsa;
pub mod dhparams;
pub mod random;
pub mod uuid_secret;
pub mod user_provided;
pub mod invalid;

pub use x509::{CertInfo, X509Plan};
pub use ssh::SshPlan;
pub use rsa::RsaPlan;
pub use dhparams::DhParamsPlan;
pub use random::RandomPlan;
pub use uuid_secret::UuidPlan;
pub use user_provided::ProvidedPlan;
pub use invalid::InvalidPlan;

use genesis_types::{CheckStatus, GenesisError, Result, SecretPath, SecretType};

/// One validation finding on a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// Short check name (`priv`, `size`, `ttl`, ...)
    pub name: String,
    /// Outcome
    pub status: CheckStatus,
    /// Human detail
    pub msg: String,
}

impl Check {
    fn new(name: impl Into<String>, status: CheckStatus, msg: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            msg: msg.into(),
        }
    }

    /// A passing check.
    pub fn ok(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Ok, msg)
    }

    /// A passing check with a caveat.
    pub fn warn(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warn, msg)
    }

    /// A missing key or secret.
    pub fn missing(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Missing, msg)
    }

    /// A failing check.
    pub fn error(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Error, msg)
    }
}

/// Shared size bounds for generated key material.
pub(crate) fn key_size_in_bounds(kind: &str, path: &str, size: u32) -> Result<()> {
    if !(1024..=16384).contains(&size) {
        return Err(GenesisError::Secret(format!(
            "{} secret at '{}' has size {} outside 1024..16384",
            kind, path, size
        )));
    }
    Ok(())
}

/// A single declarative secret request, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretKind {
    /// X.509 certificate
    X509(X509Plan),
    /// SSH keypair
    Ssh(SshPlan),
    /// RSA keypair
    Rsa(RsaPlan),
    /// Diffie-Hellman parameters
    DhParams(DhParamsPlan),
    /// Random string
    Random(RandomPlan),
    /// UUID
    Uuid(UuidPlan),
    /// Operator-provided value
    Provided(ProvidedPlan),
    /// Parse or resolution failure, carried for reporting
    Invalid(InvalidPlan),
}

impl SecretKind {
    /// The kind's type tag.
    pub fn secret_type(&self) -> SecretType {
        match self {
            SecretKind::X509(_) => SecretType::X509,
            SecretKind::Ssh(_) => SecretType::SSH,
            SecretKind::Rsa(_) => SecretType::RSA,
            SecretKind::DhParams(_) => SecretType::DHParams,
            SecretKind::Random(_) => SecretType::Random,
            SecretKind::Uuid(_) => SecretType::UUID,
            SecretKind::Provided(_) => SecretType::Provided,
            SecretKind::Invalid(_) => SecretType::Invalid,
        }
    }

    /// Whether this plan's values must never be overwritten by `recreate`.
    pub fn fixed(&self) -> bool {
        match self {
            SecretKind::Ssh(p) => p.fixed,
            SecretKind::Rsa(p) => p.fixed,
            SecretKind::DhParams(p) => p.fixed,
            SecretKind::Random(p) => p.fixed,
            SecretKind::Uuid(p) => p.fixed,
            SecretKind::Provided(p) => p.fixed,
            SecretKind::X509(_) | SecretKind::Invalid(_) => false,
        }
    }

    /// Whether this kind addresses a single key (`P:K` path form).
    pub fn is_path_keyed(&self) -> bool {
        matches!(
            self,
            SecretKind::Random(_) | SecretKind::Uuid(_) | SecretKind::Provided(_)
        )
    }

    /// Keys this plan is expected to have in the store, given its path.
    pub fn expected_keys(&self, path: &str) -> Vec<String> {
        let keyed = || {
            SecretPath::parse(path)
                .ok()
                .and_then(|p| p.key().map(String::from))
                .into_iter()
                .collect::<Vec<_>>()
        };

        match self {
            SecretKind::X509(p) => p.expected_keys().into_iter().map(String::from).collect(),
            SecretKind::Ssh(p) => p.expected_keys().into_iter().map(String::from).collect(),
            SecretKind::Rsa(p) => p.expected_keys().into_iter().map(String::from).collect(),
            SecretKind::DhParams(p) => p.expected_keys().into_iter().map(String::from).collect(),
            SecretKind::Random(p) => {
                let mut keys = keyed();
                if let Some(first) = keys.first().cloned() {
                    if let Some(dest) = p.formatted_key(&first) {
                        keys.push(dest);
                    }
                }
                keys
            }
            SecretKind::Uuid(_) | SecretKind::Provided(_) => keyed(),
            SecretKind::Invalid(_) => Vec::new(),
        }
    }

    /// Human summary.
    pub fn describe(&self) -> String {
        match self {
            SecretKind::X509(p) => p.describe(),
            SecretKind::Ssh(p) => p.describe(),
            SecretKind::Rsa(p) => p.describe(),
            SecretKind::DhParams(p) => p.describe(),
            SecretKind::Random(p) => p.describe(),
            SecretKind::Uuid(p) => p.describe(),
            SecretKind::Provided(p) => p.describe(),
            SecretKind::Invalid(p) => p.describe(),
        }
    }

    /// Attribute lookup for the path-filter engine (`key=value` atoms).
    pub fn attribute(&self, key: &str) -> Option<String> {
        let flag = |b: bool| Some(if b { "true" } else { "false" }.to_string());
        match key {
            "type" => Some(self.secret_type().to_string()),
            "fixed" => flag(self.fixed()),
            "size" => match self {
                SecretKind::Ssh(p) => Some(p.size.to_string()),
                SecretKind::Rsa(p) => Some(p.size.to_string()),
                SecretKind::DhParams(p) => Some(p.size.to_string()),
                SecretKind::Random(p) => Some(p.size.to_string()),
                _ => None,
            },
            "base_path" => match self {
                SecretKind::X509(p) => Some(p.base_path.clone()),
                _ => None,
            },
            "signed_by" => match self {
                SecretKind::X509(p) => Some(p.signed_by.clone().unwrap_or_default()),
                _ => None,
            },
            "is_ca" => match self {
                SecretKind::X509(p) => flag(p.is_ca),
                _ => None,
            },
            "self_signed" => match self {
                SecretKind::X509(p) => Some(p.self_signed.to_string()),
                _ => None,
            },
            "format" => match self {
                SecretKind::Random(p) => p.format.clone(),
                _ => None,
            },
            "version" => match self {
                SecretKind::Uuid(p) => Some(p.version.to_string()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Plan-level sanity checks, run when the caller asks for
    /// pre-validation. Failures become error plans.
    pub fn validate_plan(&self, path: &str) -> Result<()> {
        match self {
            SecretKind::X509(p) => p.validate(path),
            SecretKind::Ssh(p) => p.validate(path),
            SecretKind::Rsa(p) => p.validate(path),
            SecretKind::DhParams(p) => p.validate(path),
            SecretKind::Random(p) => p.validate(path),
            SecretKind::Uuid(p) => p.validate(path),
            SecretKind::Provided(_) | SecretKind::Invalid(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_keys_for_keyed_kinds() {
        let kind = SecretKind::Random(RandomPlan {
            size: 32,
            format: Some("base64".into()),
            destination: None,
            valid_chars: None,
            fixed: false,
        });
        assert_eq!(
            kind.expected_keys("crazy/thing:token"),
            vec!["token".to_string(), "token-base64".to_string()]
        );
    }

    #[test]
    fn test_attribute_lookup() {
        let kind = SecretKind::Rsa(RsaPlan { size: 2048, fixed: true });
        assert_eq!(kind.attribute("type").unwrap(), "rsa");
        assert_eq!(kind.attribute("fixed").unwrap(), "true");
        assert_eq!(kind.attribute("size").unwrap(), "2048");
        assert!(kind.attribute("is_ca").is_none());
    }
}
