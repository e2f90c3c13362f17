//! Operator-provided secret plans.

use genesis_types::{GenesisError, Result};
use serde_yaml::Value;

/// One operator-provided value (`provided[feature][path].keys.<key>`).
///
/// The plan's path uses the `P:K` form; one plan is produced per declared
/// key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedPlan {
    /// Provided subtype; only `generic` is defined
    pub subtype: String,
    /// Hide the value while prompting
    pub sensitive: bool,
    /// Capture multiple lines (terminated by EOF)
    pub multiline: bool,
    /// Prompt shown to the operator
    pub prompt: String,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl ProvidedPlan {
    /// Parse one key's spec from a `provided` block.
    pub fn from_spec(path: &str, key: &str, subtype: &str, spec: &Value) -> Result<Self> {
        let spec = spec.as_mapping().ok_or_else(|| {
            GenesisError::Secret(format!(
                "provided key '{}' under '{}' must be a map",
                key, path
            ))
        })?;

        if let Some(t) = spec.get("type") {
            let t = t.as_str().unwrap_or("");
            if t != "generic" {
                return Err(GenesisError::Secret(format!(
                    "provided key '{}' under '{}' has unknown type '{}'",
                    key, path, t
                )));
            }
        }

        let sensitive = spec.get("sensitive").and_then(Value::as_bool).unwrap_or(true);
        let multiline = spec.get("multiline").and_then(Value::as_bool).unwrap_or(false);
        let fixed = spec.get("fixed").and_then(Value::as_bool).unwrap_or(false);

        let prompt = match spec.get("prompt") {
            Some(p) => p
                .as_str()
                .map(String::from)
                .ok_or_else(|| {
                    GenesisError::Secret(format!(
                        "provided key '{}' under '{}' has a non-string prompt",
                        key, path
                    ))
                })?,
            None => format!("Value for {} {}", path, key),
        };

        Ok(Self {
            subtype: subtype.to_string(),
            sensitive,
            multiline,
            prompt,
            fixed,
        })
    }

    /// Human summary.
    pub fn describe(&self) -> String {
        let mut parts = vec!["provided value"];
        if self.sensitive {
            parts.insert(0, "sensitive");
        }
        if self.multiline {
            parts.insert(0, "multiline");
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let spec: Value = serde_yaml::from_str("{}").unwrap();
        let plan = ProvidedPlan::from_spec("creds/manual", "license", "generic", &spec).unwrap();
        assert!(plan.sensitive);
        assert!(!plan.multiline);
        assert!(!plan.fixed);
        assert_eq!(plan.prompt, "Value for creds/manual license");
    }

    #[test]
    fn test_explicit_fields() {
        let spec: Value = serde_yaml::from_str(
            "sensitive: false\nmultiline: true\nprompt: Paste the license\nfixed: true\n",
        )
        .unwrap();
        let plan = ProvidedPlan::from_spec("creds/manual", "license", "generic", &spec).unwrap();
        assert!(!plan.sensitive);
        assert!(plan.multiline);
        assert!(plan.fixed);
        assert_eq!(plan.prompt, "Paste the license");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let spec: Value = serde_yaml::from_str("type: exotic").unwrap();
        assert!(ProvidedPlan::from_spec("p", "k", "generic", &spec).is_err());
    }
}
