//! SSH keypair plans.

use genesis_core::util::fs::scratch_file;
use genesis_core::util::process::run;
use genesis_types::{GenesisError, Result};
use openssl::pkey::{PKey, Private};
use sha2::{Digest, Sha256};

use super::{key_size_in_bounds, Check};

/// An SSH keypair plan (`ssh <bits> [fixed]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshPlan {
    /// RSA key size in bits
    pub size: u32,
    /// Never overwritten by `recreate`
    pub fixed: bool,
}

impl SshPlan {
    /// Keys this plan writes to the store.
    pub fn expected_keys(&self) -> Vec<&'static str> {
        vec!["private", "public", "fingerprint"]
    }

    /// Re-emit the cred-line this plan parses from.
    pub fn to_cred_line(&self) -> String {
        if self.fixed {
            format!("ssh {} fixed", self.size)
        } else {
            format!("ssh {}", self.size)
        }
    }

    /// Pre-validation: size bounds.
    pub fn validate(&self, path: &str) -> Result<()> {
        key_size_in_bounds("ssh", path, self.size)
    }

    /// Human summary.
    pub fn describe(&self) -> String {
        format!("{} bit SSH keypair", self.size)
    }

    /// Validate stored key material against this plan.
    pub fn check_secret(
        &self,
        keys: &std::collections::HashMap<String, String>,
        checks: &mut Vec<Check>,
    ) {
        let Some(private_pem) = keys.get("private") else {
            return;
        };

        let key: PKey<Private> = match PKey::private_key_from_pem(private_pem.as_bytes()) {
            Ok(k) => k,
            Err(e) => {
                checks.push(Check::error("priv", format!("unparseable private key: {}", e)));
                return;
            }
        };
        checks.push(Check::ok("priv", "private key parses"));

        let derived = match openssh_public_line(&key) {
            Ok(line) => line,
            Err(e) => {
                checks.push(Check::error("pub", e.to_string()));
                return;
            }
        };

        match keys.get("public") {
            Some(stored) if same_public(stored, &derived) => {
                checks.push(Check::ok("pub", "public key derives from private"));
            }
            Some(_) => {
                checks.push(Check::error(
                    "pub",
                    "public key does not derive from private key",
                ));
            }
            None => {}
        }

        if let Some(stored_fp) = keys.get("fingerprint") {
            match ssh_fingerprint(&derived) {
                Ok(fp) if &fp == stored_fp => {
                    checks.push(Check::ok("fingerprint", "fingerprint matches"));
                }
                Ok(_) => {
                    checks.push(Check::error("fingerprint", "fingerprint does not match key"));
                }
                Err(e) => checks.push(Check::error("fingerprint", e.to_string())),
            }
        }

        if let Some(public) = keys.get("public") {
            checks.push(self.check_bits(&key, public));
        }
    }

    /// Compare the keypair's size with the declared one, asking ssh-keygen
    /// when it is available and falling back to the modulus width.
    fn check_bits(&self, key: &PKey<Private>, public_line: &str) -> Check {
        let bits = keygen_bits(public_line).or_else(|| {
            key.rsa().ok().map(|rsa| rsa.n().num_bits() as u32)
        });

        match bits {
            Some(bits) if bits == self.size => Check::ok("size", format!("{} bits", bits)),
            Some(bits) => Check::error(
                "size",
                format!("{} bits, expected {}", bits, self.size),
            ),
            None => Check::warn("size", "could not determine key size"),
        }
    }
}

/// Bit size as reported by `ssh-keygen -lf`, when the tool is usable.
fn keygen_bits(public_line: &str) -> Option<u32> {
    let file = scratch_file(&format!("{}\n", public_line)).ok()?;
    let path = file.path().to_string_lossy().to_string();
    let (stdout, rc, _) = run("ssh-keygen", &["-l", "-f", &path]).ok()?;
    if rc != 0 {
        return None;
    }
    stdout.split_whitespace().next()?.parse().ok()
}

fn same_public(stored: &str, derived: &str) -> bool {
    let fields = |s: &str| -> Vec<String> {
        s.split_whitespace().take(2).map(String::from).collect()
    };
    fields(stored) == fields(derived)
}

/// OpenSSH `ssh-rsa` public line for an RSA private key.
pub fn openssh_public_line(key: &PKey<Private>) -> Result<String> {
    let rsa = key
        .rsa()
        .map_err(|e| GenesisError::Validation(format!("Not an RSA key: {}", e)))?;

    fn put_string(buf: &mut Vec<u8>, data: &[u8]) {
        buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
        buf.extend_from_slice(data);
    }
    fn put_mpint(buf: &mut Vec<u8>, data: &[u8]) {
        let mut trimmed = data;
        while trimmed.len() > 1 && trimmed[0] == 0 && (trimmed[1] & 0x80) == 0 {
            trimmed = &trimmed[1..];
        }
        if !trimmed.is_empty() && (trimmed[0] & 0x80) != 0 {
            buf.extend_from_slice(&((trimmed.len() + 1) as u32).to_be_bytes());
            buf.push(0);
            buf.extend_from_slice(trimmed);
        } else {
            put_string(buf, trimmed);
        }
    }

    let mut blob = Vec::new();
    put_string(&mut blob, b"ssh-rsa");
    put_mpint(&mut blob, &rsa.e().to_vec());
    put_mpint(&mut blob, &rsa.n().to_vec());

    Ok(format!("ssh-rsa {}", base64::encode(&blob)))
}

/// SHA256 fingerprint of an OpenSSH public line, in ssh-keygen notation.
pub fn ssh_fingerprint(public_line: &str) -> Result<String> {
    let blob_b64 = public_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| GenesisError::Validation("Malformed OpenSSH public key".to_string()))?;
    let blob = base64::decode(blob_b64)
        .map_err(|e| GenesisError::Validation(format!("Malformed OpenSSH public key: {}", e)))?;

    let digest = Sha256::digest(&blob);
    let mut encoded = base64::encode(digest);
    while encoded.ends_with('=') {
        encoded.pop();
    }
    Ok(format!("SHA256:{}", encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::rsa::Rsa;

    #[test]
    fn test_cred_line_round_trip() {
        let plan = SshPlan { size: 2048, fixed: true };
        assert_eq!(plan.to_cred_line(), "ssh 2048 fixed");
    }

    #[test]
    fn test_validate_bounds() {
        assert!(SshPlan { size: 2048, fixed: false }.validate("p").is_ok());
        assert!(SshPlan { size: 512, fixed: false }.validate("p").is_err());
        assert!(SshPlan { size: 32768, fixed: false }.validate("p").is_err());
    }

    #[test]
    fn test_check_secret_on_fresh_keypair() {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let private = String::from_utf8_lossy(&key.private_key_to_pem_pkcs8().unwrap()).to_string();
        let public = openssh_public_line(&key).unwrap();
        let fingerprint = ssh_fingerprint(&public).unwrap();

        let mut keys = std::collections::HashMap::new();
        keys.insert("private".to_string(), private);
        keys.insert("public".to_string(), public);
        keys.insert("fingerprint".to_string(), fingerprint);

        let plan = SshPlan { size: 2048, fixed: false };
        let mut checks = Vec::new();
        plan.check_secret(&keys, &mut checks);
        assert!(checks.iter().all(|c| c.status == genesis_types::CheckStatus::Ok));
    }

    #[test]
    fn test_check_secret_flags_mismatched_public() {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let other = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

        let mut keys = std::collections::HashMap::new();
        keys.insert(
            "private".to_string(),
            String::from_utf8_lossy(&key.private_key_to_pem_pkcs8().unwrap()).to_string(),
        );
        keys.insert("public".to_string(), openssh_public_line(&other).unwrap());

        let plan = SshPlan { size: 2048, fixed: false };
        let mut checks = Vec::new();
        plan.check_secret(&keys, &mut checks);
        assert!(checks
            .iter()
            .any(|c| c.name == "pub" && c.status == genesis_types::CheckStatus::Error));
    }
}
