//! RSA keypair plans.

use openssl::pkey::PKey;
use genesis_types::Result;
use std::collections::HashMap;

use super::{key_size_in_bounds, Check};

/// An RSA keypair plan (`rsa <bits> [fixed]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPlan {
    /// Key size in bits
    pub size: u32,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl RsaPlan {
    /// Keys this plan writes to the store.
    pub fn expected_keys(&self) -> Vec<&'static str> {
        vec!["private", "public"]
    }

    /// Re-emit the cred-line this plan parses from.
    pub fn to_cred_line(&self) -> String {
        if self.fixed {
            format!("rsa {} fixed", self.size)
        } else {
            format!("rsa {}", self.size)
        }
    }

    /// Pre-validation: size bounds.
    pub fn validate(&self, path: &str) -> Result<()> {
        key_size_in_bounds("rsa", path, self.size)
    }

    /// Human summary.
    pub fn describe(&self) -> String {
        format!("{} bit RSA keypair", self.size)
    }

    /// Validate stored key material against this plan.
    pub fn check_secret(&self, keys: &HashMap<String, String>, checks: &mut Vec<Check>) {
        let private = match keys.get("private") {
            Some(pem) => match PKey::private_key_from_pem(pem.as_bytes()) {
                Ok(k) => {
                    checks.push(Check::ok("priv", "private key parses"));
                    Some(k)
                }
                Err(e) => {
                    checks.push(Check::error("priv", format!("unparseable private key: {}", e)));
                    None
                }
            },
            None => None,
        };

        let public = match keys.get("public") {
            Some(pem) => match PKey::public_key_from_pem(pem.as_bytes()) {
                Ok(k) => {
                    checks.push(Check::ok("pub", "public key parses"));
                    Some(k)
                }
                Err(e) => {
                    checks.push(Check::error("pub", format!("unparseable public key: {}", e)));
                    None
                }
            },
            None => None,
        };

        if let (Some(private), Some(public)) = (&private, &public) {
            let agree = match (private.rsa(), public.rsa()) {
                (Ok(priv_rsa), Ok(pub_rsa)) => priv_rsa.n() == pub_rsa.n(),
                _ => false,
            };
            if agree {
                checks.push(Check::ok("agree", "public and private moduli agree"));
            } else {
                checks.push(Check::error("agree", "public and private moduli disagree"));
            }
        }

        if let Some(private) = &private {
            match private.rsa() {
                Ok(rsa) => {
                    let bits = rsa.n().num_bits() as u32;
                    if bits == self.size {
                        checks.push(Check::ok("size", format!("{} bits", bits)));
                    } else {
                        checks.push(Check::error(
                            "size",
                            format!("{} bits, expected {}", bits, self.size),
                        ));
                    }
                }
                Err(_) => checks.push(Check::error("size", "not an RSA key")),
            }
        }
    }
}
