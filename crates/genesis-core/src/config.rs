//! Runtime configuration for the secret lifecycle engine.
//!
//! Settings are sourced from the process environment at startup and passed
//! down explicitly; nothing below this layer reads environment variables.

use genesis_types::{GenesisError, Result};

/// Environment variable naming the secrets mount point.
pub const ENV_SECRETS_MOUNT: &str = "GENESIS_SECRETS_MOUNT";
/// Environment variable carrying a subject CN to re-assert on renewal.
pub const ENV_RENEW_SUBJECT: &str = "GENESIS_RENEW_SUBJECT";
/// Environment variable suppressing better-than-worst validation notes.
pub const ENV_HIDE_PROBLEMATIC: &str = "GENESIS_HIDE_PROBLEMATIC_SECRETS";

/// Engine-level settings captured once from the environment.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Mount point all environment secret paths live under
    pub secrets_mount: String,
    /// Subject CN to re-assert when renewing certificates
    pub renew_subject: Option<String>,
    /// Only report each plan's worst findings
    pub hide_problematic: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            secrets_mount: "/secret/".to_string(),
            renew_subject: None,
            hide_problematic: false,
        }
    }
}

impl RuntimeConfig {
    /// Capture settings from the process environment.
    pub fn from_env() -> Self {
        let secrets_mount = std::env::var(ENV_SECRETS_MOUNT)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "/secret/".to_string());

        let renew_subject = std::env::var(ENV_RENEW_SUBJECT)
            .ok()
            .filter(|s| !s.is_empty());

        let hide_problematic = std::env::var(ENV_HIDE_PROBLEMATIC)
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes" | "y"))
            .unwrap_or(false);

        Self {
            secrets_mount,
            renew_subject,
            hide_problematic,
        }
    }
}

/// Resolve `${VAR}` references in a metadata value.
///
/// Returns an error naming the variable when it is unset; a value without
/// references passes through unchanged.
pub fn resolve_env_refs(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            GenesisError::Config(format!("Unterminated ${{...}} reference in '{}'", input))
        })?;
        let var = &after[..end];
        if var.is_empty() {
            return Err(GenesisError::Config(format!(
                "Empty ${{}} reference in '{}'",
                input
            )));
        }
        let value = std::env::var(var).map_err(|_| {
            GenesisError::Config(format!(
                "Environment variable '{}' referenced by '{}' is not set",
                var, input
            ))
        })?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env_refs_passthrough() {
        assert_eq!(resolve_env_refs("plain-value").unwrap(), "plain-value");
    }

    #[test]
    fn test_resolve_env_refs_substitutes() {
        std::env::set_var("GENESIS_TEST_REF_VAR", "resolved");
        assert_eq!(
            resolve_env_refs("prefix-${GENESIS_TEST_REF_VAR}-suffix").unwrap(),
            "prefix-resolved-suffix"
        );
    }

    #[test]
    fn test_resolve_env_refs_unset_errors() {
        std::env::remove_var("GENESIS_TEST_UNSET_VAR");
        let err = resolve_env_refs("${GENESIS_TEST_UNSET_VAR}").unwrap_err();
        assert!(err.to_string().contains("GENESIS_TEST_UNSET_VAR"));
    }

    #[test]
    fn test_resolve_env_refs_unterminated() {
        assert!(resolve_env_refs("${BROKEN").is_err());
    }
}
