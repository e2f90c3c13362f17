//! UUID plans.

use genesis_types::{GenesisError, Result, UuidVersion};
use std::collections::HashMap;
use uuid::Uuid;

use super::Check;

/// A UUID plan
/// (`uuid [v1|time|v3|md5|v4|random|v5|sha1] [namespace ...] [name <n>] [fixed]`).
///
/// The plan's path uses the `P:K` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidPlan {
    /// UUID version (defaults to v4)
    pub version: UuidVersion,
    /// Namespace for name-based versions: a well-known name or a literal
    /// UUID
    pub namespace: Option<String>,
    /// Name input for name-based versions
    pub name: Option<String>,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl UuidPlan {
    /// Resolve the namespace to a UUID, defaulting to the DNS namespace for
    /// name-based versions.
    pub fn namespace_uuid(&self) -> Result<Uuid> {
        match self.namespace.as_deref() {
            None | Some("dns") => Ok(Uuid::NAMESPACE_DNS),
            Some("url") => Ok(Uuid::NAMESPACE_URL),
            Some("oid") => Ok(Uuid::NAMESPACE_OID),
            Some("x500") => Ok(Uuid::NAMESPACE_X500),
            Some(literal) => Uuid::parse_str(literal).map_err(|e| {
                GenesisError::Secret(format!("Invalid UUID namespace '{}': {}", literal, e))
            }),
        }
    }

    /// The deterministic value for name-based versions; `None` for v1/v4.
    pub fn deterministic_value(&self) -> Result<Option<String>> {
        if !self.version.is_name_based() {
            return Ok(None);
        }
        let name = self.name.as_deref().ok_or_else(|| {
            GenesisError::Secret(format!("{} UUIDs require a name", self.version))
        })?;
        let ns = self.namespace_uuid()?;
        let value = match self.version {
            UuidVersion::V3 => Uuid::new_v3(&ns, name.as_bytes()),
            UuidVersion::V5 => Uuid::new_v5(&ns, name.as_bytes()),
            _ => unreachable!(),
        };
        Ok(Some(value.to_string()))
    }

    /// Re-emit the cred-line this plan parses from.
    pub fn to_cred_line(&self) -> String {
        let mut line = format!("uuid {}", self.version);
        if let Some(ns) = &self.namespace {
            line.push_str(&format!(" namespace {}", ns));
        }
        if let Some(name) = &self.name {
            line.push_str(&format!(" name {}", name));
        }
        if self.fixed {
            line.push_str(" fixed");
        }
        line
    }

    /// Pre-validation: name-based versions need a name and a sound
    /// namespace.
    pub fn validate(&self, path: &str) -> Result<()> {
        if self.version.is_name_based() {
            if self.name.is_none() {
                return Err(GenesisError::Secret(format!(
                    "uuid secret at '{}' is {} and requires a name",
                    path, self.version
                )));
            }
            self.namespace_uuid()?;
        }
        Ok(())
    }

    /// Human summary.
    pub fn describe(&self) -> String {
        format!("{} UUID", self.version)
    }

    /// Validate a stored value against this plan.
    pub fn check_secret(&self, key: &str, keys: &HashMap<String, String>, checks: &mut Vec<Check>) {
        let Some(value) = keys.get(key) else {
            return;
        };

        match Uuid::parse_str(value) {
            Ok(_) => checks.push(Check::ok("valid", "parses as a UUID")),
            Err(e) => {
                checks.push(Check::error("valid", format!("not a UUID: {}", e)));
                return;
            }
        }

        if let Ok(Some(expected)) = self.deterministic_value() {
            if value.eq_ignore_ascii_case(&expected) {
                checks.push(Check::ok("hash", "matches namespace and name"));
            } else {
                checks.push(Check::error(
                    "hash",
                    "does not match declared namespace and name",
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v5_is_deterministic() {
        let plan = UuidPlan {
            version: UuidVersion::V5,
            namespace: Some("dns".into()),
            name: Some("foo.example".into()),
            fixed: false,
        };
        let a = plan.deterministic_value().unwrap().unwrap();
        let b = plan.deterministic_value().unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_v4_is_not_deterministic() {
        let plan = UuidPlan {
            version: UuidVersion::V4,
            namespace: None,
            name: None,
            fixed: false,
        };
        assert!(plan.deterministic_value().unwrap().is_none());
    }

    #[test]
    fn test_validate_requires_name_for_v3() {
        let plan = UuidPlan {
            version: UuidVersion::V3,
            namespace: None,
            name: None,
            fixed: false,
        };
        assert!(plan.validate("p:k").is_err());
    }

    #[test]
    fn test_tampered_value_fails_hash_check() {
        let plan = UuidPlan {
            version: UuidVersion::V5,
            namespace: Some("dns".into()),
            name: Some("foo.example".into()),
            fixed: false,
        };

        let mut keys = HashMap::new();
        keys.insert("id".to_string(), plan.deterministic_value().unwrap().unwrap());
        let mut checks = Vec::new();
        plan.check_secret("id", &keys, &mut checks);
        assert!(checks.iter().all(|c| c.status == genesis_types::CheckStatus::Ok));

        keys.insert(
            "id".to_string(),
            "11111111-2222-3333-4444-555555555555".to_string(),
        );
        let mut checks = Vec::new();
        plan.check_secret("id", &keys, &mut checks);
        assert!(checks
            .iter()
            .any(|c| c.name == "hash" && c.status == genesis_types::CheckStatus::Error));
    }

    #[test]
    fn test_literal_namespace() {
        let plan = UuidPlan {
            version: UuidVersion::V5,
            namespace: Some("6ba7b810-9dad-11d1-80b4-00c04fd430c8".into()),
            name: Some("foo.example".into()),
            fixed: false,
        };
        // 6ba7b810... is the DNS namespace; same output as the token form
        let dns = UuidPlan {
            namespace: Some("dns".into()),
            ..plan.clone()
        };
        assert_eq!(
            plan.deterministic_value().unwrap(),
            dns.deterministic_value().unwrap()
        );
    }
}
