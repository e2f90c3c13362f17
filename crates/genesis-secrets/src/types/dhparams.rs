//! Diffie-Hellman parameter plans.

use genesis_core::util::process::run_with_stdin;
use genesis_types::Result;
use openssl::dh::Dh;
use std::collections::HashMap;

use super::{key_size_in_bounds, Check};

/// A DH parameter plan (`dhparam[s] <bits> [fixed]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhParamsPlan {
    /// Prime size in bits
    pub size: u32,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl DhParamsPlan {
    /// Keys this plan writes to the store.
    pub fn expected_keys(&self) -> Vec<&'static str> {
        vec!["dhparam-pem"]
    }

    /// Re-emit the cred-line this plan parses from.
    pub fn to_cred_line(&self) -> String {
        if self.fixed {
            format!("dhparams {} fixed", self.size)
        } else {
            format!("dhparams {}", self.size)
        }
    }

    /// Pre-validation: size bounds.
    pub fn validate(&self, path: &str) -> Result<()> {
        key_size_in_bounds("dhparams", path, self.size)
    }

    /// Human summary.
    pub fn describe(&self) -> String {
        format!("{} bit DH parameters", self.size)
    }

    /// Validate stored parameters against this plan.
    pub fn check_secret(&self, keys: &HashMap<String, String>, checks: &mut Vec<Check>) {
        let Some(pem) = keys.get("dhparam-pem") else {
            return;
        };

        let dh = match Dh::params_from_pem(pem.as_bytes()) {
            Ok(dh) => {
                checks.push(Check::ok("valid", "DH parameters parse"));
                dh
            }
            Err(e) => {
                checks.push(Check::error("valid", format!("unparseable DH parameters: {}", e)));
                return;
            }
        };

        // The toolchain's own consistency check, fed over stdin; absence of
        // the binary falls back to the parse above
        if let Ok((stdout, rc, stderr)) =
            run_with_stdin("openssl", &["dhparam", "-check", "-noout", "-text"], pem)
        {
            if rc != 0 {
                checks.push(Check::error(
                    "check",
                    format!("openssl dhparam -check failed: {}", stderr.trim()),
                ));
            } else if stdout.contains("WARNING") {
                checks.push(Check::warn("check", "openssl dhparam -check raised warnings"));
            } else {
                checks.push(Check::ok("check", "openssl dhparam -check passes"));
            }
        }

        let bits = dh.prime_p().num_bits() as u32;
        if bits == self.size {
            checks.push(Check::ok("size", format!("{} bits", bits)));
        } else {
            checks.push(Check::error(
                "size",
                format!("{} bits, expected {}", bits, self.size),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cred_line_and_bounds() {
        let plan = DhParamsPlan { size: 2048, fixed: false };
        assert_eq!(plan.to_cred_line(), "dhparams 2048");
        assert!(plan.validate("p").is_ok());
        assert!(DhParamsPlan { size: 100, fixed: false }.validate("p").is_err());
    }

    #[test]
    fn test_check_secret_flags_size_mismatch() {
        let dh = Dh::generate_params(512, 2).unwrap();
        let pem = String::from_utf8_lossy(&dh.params_to_pem().unwrap()).to_string();

        let mut keys = HashMap::new();
        keys.insert("dhparam-pem".to_string(), pem);

        let plan = DhParamsPlan { size: 1024, fixed: false };
        let mut checks = Vec::new();
        plan.check_secret(&keys, &mut checks);
        assert!(checks
            .iter()
            .any(|c| c.name == "size" && c.status == genesis_types::CheckStatus::Error));
    }
}
