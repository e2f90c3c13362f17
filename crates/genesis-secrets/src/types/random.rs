//! Random string plans.

use genesis_core::util::chars::matches_charset;
use genesis_types::{GenesisError, Result};
use std::collections::HashMap;

use super::Check;

/// A random string plan
/// (`random <N> [fmt <F> [at <K>]] [allowed-chars <S>] [fixed]`).
///
/// The plan's path uses the `P:K` form; `format` derives a sibling value at
/// `destination` (default `<key>-<format>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomPlan {
    /// Number of characters to generate
    pub size: usize,
    /// Derived sibling format (e.g. `base64`, `bcrypt`)
    pub format: Option<String>,
    /// Key of the derived sibling
    pub destination: Option<String>,
    /// Character policy the value is drawn from
    pub valid_chars: Option<String>,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl RandomPlan {
    /// The key the formatted sibling lands at, when `format` is set.
    pub fn formatted_key(&self, key: &str) -> Option<String> {
        self.format.as_ref().map(|fmt| {
            self.destination
                .clone()
                .unwrap_or_else(|| format!("{}-{}", key, fmt))
        })
    }

    /// Re-emit the cred-line this plan parses from.
    pub fn to_cred_line(&self) -> String {
        let mut line = format!("random {}", self.size);
        if let Some(fmt) = &self.format {
            line.push_str(&format!(" fmt {}", fmt));
            if let Some(dest) = &self.destination {
                line.push_str(&format!(" at {}", dest));
            }
        }
        if let Some(chars) = &self.valid_chars {
            line.push_str(&format!(" allowed-chars {}", chars));
        }
        if self.fixed {
            line.push_str(" fixed");
        }
        line
    }

    /// Pre-validation: size and charset sanity.
    pub fn validate(&self, path: &str) -> Result<()> {
        if self.size == 0 {
            return Err(GenesisError::Secret(format!(
                "random secret at '{}' must have a positive size",
                path
            )));
        }
        if let Some(chars) = &self.valid_chars {
            genesis_core::util::chars::expand_charset(chars)?;
        }
        Ok(())
    }

    /// Human summary.
    pub fn describe(&self) -> String {
        format!("random password ({} chars)", self.size)
    }

    /// Validate a stored value against this plan.
    pub fn check_secret(&self, key: &str, keys: &HashMap<String, String>, checks: &mut Vec<Check>) {
        let Some(value) = keys.get(key) else {
            return;
        };

        if value.chars().count() == self.size {
            checks.push(Check::ok("length", format!("{} characters", self.size)));
        } else {
            checks.push(Check::error(
                "length",
                format!("{} characters, expected {}", value.chars().count(), self.size),
            ));
        }

        if let Some(policy) = &self.valid_chars {
            match matches_charset(value, policy) {
                Ok(true) => checks.push(Check::ok("chars", format!("only '{}' characters", policy))),
                Ok(false) => checks.push(Check::error(
                    "chars",
                    format!("contains characters outside '{}'", policy),
                )),
                Err(e) => checks.push(Check::error("chars", e.to_string())),
            }
        }

        if let Some(dest) = self.formatted_key(key) {
            if keys.contains_key(&dest) {
                checks.push(Check::ok("formatted", format!("'{}' sibling present", dest)));
            } else {
                checks.push(Check::missing("formatted", format!("'{}' sibling absent", dest)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_key_defaults() {
        let plan = RandomPlan {
            size: 32,
            format: Some("base64".into()),
            destination: None,
            valid_chars: None,
            fixed: false,
        };
        assert_eq!(plan.formatted_key("token").unwrap(), "token-base64");

        let plan = RandomPlan {
            destination: Some("token-b64".into()),
            ..plan
        };
        assert_eq!(plan.formatted_key("token").unwrap(), "token-b64");
    }

    #[test]
    fn test_cred_line_round_trip_shape() {
        let plan = RandomPlan {
            size: 16,
            format: Some("base64".into()),
            destination: Some("k-b64".into()),
            valid_chars: Some("a-z0-9".into()),
            fixed: true,
        };
        assert_eq!(
            plan.to_cred_line(),
            "random 16 fmt base64 at k-b64 allowed-chars a-z0-9 fixed"
        );
    }

    #[test]
    fn test_check_secret_length_and_charset() {
        let plan = RandomPlan {
            size: 8,
            format: None,
            destination: None,
            valid_chars: Some("a-f0-9".into()),
            fixed: false,
        };

        let mut keys = HashMap::new();
        keys.insert("id".to_string(), "deadbeef".to_string());
        let mut checks = Vec::new();
        plan.check_secret("id", &keys, &mut checks);
        assert!(checks.iter().all(|c| c.status == genesis_types::CheckStatus::Ok));

        keys.insert("id".to_string(), "DEADBEEF".to_string());
        let mut checks = Vec::new();
        plan.check_secret("id", &keys, &mut checks);
        assert!(checks
            .iter()
            .any(|c| c.name == "chars" && c.status == genesis_types::CheckStatus::Error));
    }
}
