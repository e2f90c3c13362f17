//! X.509 certificate plans and certificate inspection.

use chrono::{DateTime, Utc};
use genesis_core::util::process::run_with_stdin;
use genesis_types::{GenesisError, KeyUsage, Result};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use serde_yaml::Value;

/// Rewritten for compatibility with kits authored against the original
/// proof-of-concept metadata layout.
const LEGACY_SIGNER: &str = "base.application/certs.ca";
const LEGACY_SIGNER_REWRITE: &str = "application/certs/ca";

/// Default validity when a spec does not declare `valid_for`.
const DEFAULT_CA_TTL: &str = "10y";
const DEFAULT_LEAF_TTL: &str = "3y";

/// An X.509 certificate plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Plan {
    /// The YAML key grouping this leaf with its CA
    pub base_path: String,
    /// Issue as a certificate authority
    pub is_ca: bool,
    /// 0 = signed, 1 = unsigned leaf treated as self-signed, 2 = explicit
    /// self-reference in `signed_by`
    pub self_signed: u8,
    /// Path of the signing CA, when signed
    pub signed_by: Option<String>,
    /// `signed_by` is absolute under the mount rather than relative to the
    /// environment prefix
    pub signed_by_abs_path: bool,
    /// Subject CN (first entry) and SANs
    pub names: Vec<String>,
    /// Declared key usage; `None` means the role's default set
    pub usage: Option<Vec<KeyUsage>>,
    /// Declared validity period (`<posint>[ymdh]`)
    pub valid_for: Option<String>,
}

impl X509Plan {
    /// Parse one leaf's x509-spec from kit metadata.
    pub fn from_spec(base_path: &str, spec: &Value) -> Result<Self> {
        let spec = spec.as_mapping().ok_or_else(|| {
            GenesisError::Secret("x509 spec must be a map".to_string())
        })?;

        let is_ca = spec
            .get("is_ca")
            .map(|v| {
                v.as_bool().ok_or_else(|| {
                    GenesisError::Secret("is_ca must be a boolean".to_string())
                })
            })
            .transpose()?
            .unwrap_or(false);

        let signed_by = match spec.get("signed_by") {
            None => None,
            Some(v) => {
                let s = v.as_str().ok_or_else(|| {
                    GenesisError::Secret("signed_by must be a string".to_string())
                })?;
                if s == LEGACY_SIGNER {
                    Some(LEGACY_SIGNER_REWRITE.to_string())
                } else {
                    Some(s.to_string())
                }
            }
        };

        let names = match spec.get("names") {
            None => Vec::new(),
            Some(v) => v
                .as_sequence()
                .ok_or_else(|| GenesisError::Secret("names must be a list".to_string()))?
                .iter()
                .map(|n| {
                    n.as_str().map(String::from).ok_or_else(|| {
                        GenesisError::Secret("names must be a list of strings".to_string())
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let usage = match spec.get("usage") {
            None => None,
            Some(v) => {
                let tokens = v
                    .as_sequence()
                    .ok_or_else(|| GenesisError::Secret("usage must be a list".to_string()))?;
                let mut parsed = Vec::new();
                for token in tokens {
                    let s = token.as_str().ok_or_else(|| {
                        GenesisError::Secret("usage must be a list of strings".to_string())
                    })?;
                    parsed.push(KeyUsage::from_token(s)?);
                }
                Some(parsed)
            }
        };

        let valid_for = match spec.get("valid_for") {
            None => None,
            Some(v) => Some(match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => {
                    return Err(GenesisError::Secret(
                        "valid_for must be a string or number".to_string(),
                    ))
                }
            }),
        };

        Ok(Self {
            base_path: base_path.to_string(),
            is_ca,
            self_signed: 0,
            signed_by,
            signed_by_abs_path: false,
            names,
            usage,
            valid_for,
        })
    }

    /// Re-emit the spec this plan parses from.
    pub fn to_spec(&self) -> Value {
        let mut map = serde_yaml::Mapping::new();
        if self.is_ca {
            map.insert("is_ca".into(), Value::Bool(true));
        }
        if let Some(signer) = &self.signed_by {
            map.insert("signed_by".into(), Value::String(signer.clone()));
        }
        if !self.names.is_empty() {
            map.insert(
                "names".into(),
                Value::Sequence(self.names.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(usage) = &self.usage {
            map.insert(
                "usage".into(),
                Value::Sequence(
                    usage
                        .iter()
                        .map(|u| Value::String(u.token().to_string()))
                        .collect(),
                ),
            );
        }
        if let Some(ttl) = &self.valid_for {
            map.insert("valid_for".into(), Value::String(ttl.clone()));
        }
        Value::Mapping(map)
    }

    /// Validity period in days, defaulted by role.
    pub fn ttl_days(&self) -> Result<u32> {
        let ttl = self.valid_for.as_deref().unwrap_or(if self.is_ca {
            DEFAULT_CA_TTL
        } else {
            DEFAULT_LEAF_TTL
        });
        genesis_core::time::parse_valid_for(ttl)
    }

    /// The declared usage set, or the default for this plan's role.
    pub fn effective_usage(&self) -> Vec<KeyUsage> {
        match &self.usage {
            Some(usage) => usage.clone(),
            None if self.is_ca => KeyUsage::default_ca_set(),
            None => KeyUsage::default_leaf_set(),
        }
    }

    /// Keys this plan writes to the store.
    pub fn expected_keys(&self) -> Vec<&'static str> {
        if self.is_ca {
            vec!["certificate", "combined", "key", "crl", "serial"]
        } else {
            vec!["certificate", "combined", "key"]
        }
    }

    /// Pre-resolution sanity checks.
    pub fn validate(&self, path: &str) -> Result<()> {
        if !self.is_ca && self.names.is_empty() {
            return Err(GenesisError::Secret(format!(
                "x509 secret at '{}' must specify names (or be a CA)",
                path
            )));
        }
        if let Some(ttl) = &self.valid_for {
            genesis_core::time::parse_valid_for(ttl)?;
        }
        if let Some(signer) = &self.signed_by {
            // Accepted by shape alone; a missing target surfaces at
            // resolution as an orphan.
            let path_shaped = !signer.is_empty()
                && signer
                    .split('/')
                    .all(|seg| {
                        !seg.is_empty()
                            && seg
                                .chars()
                                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
                    });
            if !path_shaped {
                return Err(GenesisError::Secret(format!(
                    "x509 secret at '{}' has malformed signed_by '{}'",
                    path, signer
                )));
            }
        }
        Ok(())
    }

    /// Human summary.
    pub fn describe(&self) -> String {
        let role = if self.is_ca { "CA certificate" } else { "certificate" };
        match self.self_signed {
            0 => match &self.signed_by {
                Some(signer) => format!("{} signed by {}", role, signer),
                None => role.to_string(),
            },
            _ => format!("self-signed {}", role),
        }
    }
}

/// Everything the validator needs to know about a stored certificate.
pub struct CertInfo {
    /// Subject CN, if present
    pub cn: Option<String>,
    /// Subject alternative names
    pub sans: Vec<String>,
    /// Start of validity
    pub not_before: DateTime<Utc>,
    /// End of validity
    pub not_after: DateTime<Utc>,
    /// Subject key identifier (hex)
    pub subject_key_id: Option<String>,
    /// Authority key identifier (hex)
    pub authority_key_id: Option<String>,
    /// RSA modulus (hex), when the key is RSA
    pub modulus: Option<String>,
    /// Basic-constraints CA flag
    pub is_ca: bool,
    /// Key usage and extended key usage found on the certificate
    pub usage: Vec<KeyUsage>,
    /// Whether the certificate carries usage extensions at all
    pub has_usage_ext: bool,
    /// Issuer DN equals subject DN
    pub issuer_eq_subject: bool,
    cert: X509,
}

fn asn1_to_datetime(when: &Asn1TimeRef) -> Result<DateTime<Utc>> {
    let epoch = Asn1Time::from_unix(0)
        .map_err(|e| GenesisError::Validation(format!("Failed to build epoch: {}", e)))?;
    let diff = epoch
        .diff(when)
        .map_err(|e| GenesisError::Validation(format!("Failed to diff ASN1 time: {}", e)))?;
    let secs = i64::from(diff.days) * 86_400 + i64::from(diff.secs);
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| GenesisError::Validation("ASN1 time out of range".to_string()))
}

fn name_cn(name: &openssl::x509::X509NameRef) -> Option<String> {
    name.entries_by_nid(openssl::nid::Nid::COMMONNAME)
        .next()
        .map(|e| String::from_utf8_lossy(e.data().as_slice()).to_string())
}

fn name_entries(name: &openssl::x509::X509NameRef) -> Vec<(String, String)> {
    name.entries()
        .map(|e| {
            (
                e.object().to_string(),
                String::from_utf8_lossy(e.data().as_slice()).to_string(),
            )
        })
        .collect()
}

impl CertInfo {
    /// Parse a PEM certificate, using the TLS toolchain for the extension
    /// fields the native bindings do not expose.
    pub fn parse(pem: &str) -> Result<Self> {
        let cert = X509::from_pem(pem.as_bytes())
            .map_err(|e| GenesisError::Validation(format!("Unparseable certificate: {}", e)))?;

        let cn = name_cn(cert.subject_name());
        let issuer_eq_subject =
            name_entries(cert.issuer_name()) == name_entries(cert.subject_name());

        let sans = cert
            .subject_alt_names()
            .map(|stack| {
                stack
                    .iter()
                    .filter_map(|gn| {
                        gn.dnsname()
                            .map(String::from)
                            .or_else(|| gn.ipaddress().map(format_ip))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let not_before = asn1_to_datetime(cert.not_before())?;
        let not_after = asn1_to_datetime(cert.not_after())?;

        let subject_key_id = cert.subject_key_id().map(|id| hex_string(id.as_slice()));
        let authority_key_id = cert.authority_key_id().map(|id| hex_string(id.as_slice()));

        let modulus = cert
            .public_key()
            .ok()
            .and_then(|k| k.rsa().ok())
            .map(|rsa| rsa.n().to_hex_str().map(|s| s.to_string()))
            .transpose()
            .map_err(|e| GenesisError::Validation(format!("Failed to read modulus: {}", e)))?;

        let (is_ca, usage, has_usage_ext) = Self::inspect_extensions(pem)?;

        Ok(Self {
            cn,
            sans,
            not_before,
            not_after,
            subject_key_id,
            authority_key_id,
            modulus,
            is_ca,
            usage,
            has_usage_ext,
            issuer_eq_subject,
            cert,
        })
    }

    /// Whether this certificate's signature verifies against the given
    /// (PEM) signer certificate.
    pub fn signed_by(&self, signer_pem: &str) -> bool {
        let Ok(signer) = X509::from_pem(signer_pem.as_bytes()) else {
            return false;
        };
        let Ok(key) = signer.public_key() else {
            return false;
        };
        self.cert.verify(&key).unwrap_or(false)
    }

    /// Whether the certificate's signature verifies against its own key.
    pub fn self_verifies(&self) -> bool {
        self.cert
            .public_key()
            .ok()
            .map(|k| self.cert.verify(&k).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Pull basic constraints and (extended) key usage out of an
    /// `openssl x509 -text` dump, fed over stdin.
    fn inspect_extensions(pem: &str) -> Result<(bool, Vec<KeyUsage>, bool)> {
        let (stdout, rc, stderr) =
            run_with_stdin("openssl", &["x509", "-noout", "-text"], pem)?;
        if rc != 0 {
            return Err(GenesisError::Validation(format!(
                "openssl x509 -text failed: {}",
                stderr.trim()
            )));
        }

        let mut is_ca = false;
        let mut usage = Vec::new();
        let mut has_usage_ext = false;

        let lines: Vec<&str> = stdout.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("X509v3 Basic Constraints") {
                if let Some(next) = lines.get(i + 1) {
                    is_ca = next.contains("CA:TRUE");
                }
            } else if trimmed.starts_with("X509v3 Key Usage")
                || trimmed.starts_with("X509v3 Extended Key Usage")
            {
                has_usage_ext = true;
                if let Some(next) = lines.get(i + 1) {
                    for label in next.trim().split(',') {
                        if let Some(u) = KeyUsage::from_openssl_label(label.trim()) {
                            usage.push(u);
                        }
                    }
                }
            }
        }

        Ok((is_ca, usage, has_usage_ext))
    }
}

fn format_ip(raw: &[u8]) -> String {
    match raw.len() {
        4 => format!("{}.{}.{}.{}", raw[0], raw[1], raw[2], raw[3]),
        _ => raw.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(":"),
    }
}

fn hex_string(raw: &[u8]) -> String {
    hex::encode_upper(raw)
}

/// Parse a PEM private key and return its RSA modulus as hex.
pub fn private_key_modulus(pem: &str) -> Result<String> {
    let key: PKey<Private> = PKey::private_key_from_pem(pem.as_bytes())
        .map_err(|e| GenesisError::Validation(format!("Unparseable private key: {}", e)))?;
    let rsa = key
        .rsa()
        .map_err(|e| GenesisError::Validation(format!("Not an RSA key: {}", e)))?;
    rsa.n()
        .to_hex_str()
        .map(|s| s.to_string())
        .map_err(|e| GenesisError::Validation(format!("Failed to read modulus: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_spec_parses_fields() {
        let spec: Value = serde_yaml::from_str(
            "is_ca: true\nnames: [ca.example]\nusage: [crl_sign, key_cert_sign]\nvalid_for: 2y\n",
        )
        .unwrap();
        let plan = X509Plan::from_spec("my-certs", &spec).unwrap();
        assert!(plan.is_ca);
        assert_eq!(plan.names, vec!["ca.example"]);
        assert_eq!(plan.ttl_days().unwrap(), 730);
        assert_eq!(
            plan.usage.as_deref(),
            Some(&[KeyUsage::CrlSign, KeyUsage::KeyCertSign][..])
        );
    }

    #[test]
    fn test_legacy_signer_rewrite() {
        let spec: Value =
            serde_yaml::from_str("signed_by: base.application/certs.ca\nnames: [a]").unwrap();
        let plan = X509Plan::from_spec("b", &spec).unwrap();
        assert_eq!(plan.signed_by.as_deref(), Some("application/certs/ca"));
    }

    #[test]
    fn test_spec_round_trip() {
        let spec: Value = serde_yaml::from_str(
            "signed_by: things/ca\nnames: [a.example, b.example]\nvalid_for: 90d\n",
        )
        .unwrap();
        let plan = X509Plan::from_spec("things", &spec).unwrap();
        let reparsed = X509Plan::from_spec("things", &plan.to_spec()).unwrap();
        assert_eq!(plan, reparsed);
    }

    #[test]
    fn test_validate_rejects_leaf_without_names() {
        let spec: Value = serde_yaml::from_str("signed_by: things/ca").unwrap();
        let plan = X509Plan::from_spec("things", &spec).unwrap();
        assert!(plan.validate("things/server").is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_signer() {
        let spec: Value = serde_yaml::from_str("names: [a]\nsigned_by: 'bad path!'").unwrap();
        let plan = X509Plan::from_spec("things", &spec).unwrap();
        assert!(plan.validate("things/server").is_err());
    }

    #[test]
    fn test_effective_usage_defaults() {
        let spec: Value = serde_yaml::from_str("is_ca: true").unwrap();
        let ca = X509Plan::from_spec("c", &spec).unwrap();
        assert_eq!(ca.effective_usage(), KeyUsage::default_ca_set());

        let spec: Value = serde_yaml::from_str("names: [x]").unwrap();
        let leaf = X509Plan::from_spec("c", &spec).unwrap();
        assert_eq!(leaf.effective_usage(), KeyUsage::default_leaf_set());
    }
}
