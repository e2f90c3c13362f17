//! Common enumerations used throughout Genesis.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{GenesisError, Result};

/// Log level enumeration for the logging system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// No logging
    None,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Detailed trace messages
    Trace,
}

impl FromStr for LogLevel {
    type Err = GenesisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(LogLevel::None),
            "ERROR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "TRACE" => Ok(LogLevel::Trace),
            _ => Err(GenesisError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::None => write!(f, "NONE"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Trace => write!(f, "TRACE"),
        }
    }
}

/// Secret type enumeration for different kinds of secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecretType {
    /// X.509 certificates (CA, signed, self-signed)
    X509,
    /// SSH key pairs
    SSH,
    /// RSA key pairs
    RSA,
    /// Diffie-Hellman parameters
    DHParams,
    /// Random passwords/strings
    Random,
    /// UUIDs (v1, v3, v4, v5)
    UUID,
    /// Operator-provided secret
    Provided,
    /// Invalid secret definition, carried through the pipeline for reporting
    Invalid,
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretType::X509 => write!(f, "x509"),
            SecretType::SSH => write!(f, "ssh"),
            SecretType::RSA => write!(f, "rsa"),
            SecretType::DHParams => write!(f, "dhparams"),
            SecretType::Random => write!(f, "random"),
            SecretType::UUID => write!(f, "uuid"),
            SecretType::Provided => write!(f, "provided"),
            SecretType::Invalid => write!(f, "error"),
        }
    }
}

/// Lifecycle actions the executor can drive against a plan set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretAction {
    /// Generate anything missing; existing values are never touched
    Add,
    /// Regenerate everything except `fixed` plans
    Recreate,
    /// Re-issue x509 certificates, extending their expiry
    Renew,
    /// Delete the plan's paths from the store
    Remove,
}

impl SecretAction {
    /// Whether this action can destroy existing secret values.
    pub fn is_destructive(&self) -> bool {
        matches!(self, SecretAction::Recreate | SecretAction::Remove)
    }

    /// Past-tense verb for summary lines.
    pub fn past_tense(&self) -> &'static str {
        match self {
            SecretAction::Add => "added",
            SecretAction::Recreate => "recreated",
            SecretAction::Renew => "renewed",
            SecretAction::Remove => "removed",
        }
    }
}

impl fmt::Display for SecretAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretAction::Add => write!(f, "add"),
            SecretAction::Recreate => write!(f, "recreate"),
            SecretAction::Renew => write!(f, "renew"),
            SecretAction::Remove => write!(f, "remove"),
        }
    }
}

impl FromStr for SecretAction {
    type Err = GenesisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "add" => Ok(SecretAction::Add),
            "recreate" | "rotate" => Ok(SecretAction::Recreate),
            "renew" => Ok(SecretAction::Renew),
            "remove" => Ok(SecretAction::Remove),
            _ => Err(GenesisError::Validation(format!("Invalid secret action: {}", s))),
        }
    }
}

/// Outcome of a single validation check.
///
/// Ordered by severity so a plan's aggregate result is the maximum of its
/// checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// The check passed
    Ok,
    /// The check passed with a caveat (e.g. certificate expiring soon)
    Warn,
    /// An expected key or secret is absent
    Missing,
    /// The check failed
    Error,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "ok"),
            CheckStatus::Warn => write!(f, "warn"),
            CheckStatus::Missing => write!(f, "missing"),
            CheckStatus::Error => write!(f, "error"),
        }
    }
}

/// Result of probing a secret store's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    /// Reachable, unsealed, and authenticated
    Ok,
    /// TCP connection failed
    Unreachable,
    /// Reachable but never initialized
    Uninitialized,
    /// Reachable but sealed
    Sealed,
    /// Reachable and unsealed, but our token is invalid
    Unauthenticated,
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreStatus::Ok => write!(f, "ok"),
            StoreStatus::Unreachable => write!(f, "unreachable"),
            StoreStatus::Uninitialized => write!(f, "uninitialized"),
            StoreStatus::Sealed => write!(f, "sealed"),
            StoreStatus::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

/// X.509 key usage and extended key usage tokens accepted in kit metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsage {
    /// digitalSignature
    DigitalSignature,
    /// nonRepudiation (older name for contentCommitment)
    NonRepudiation,
    /// contentCommitment (newer name for nonRepudiation)
    ContentCommitment,
    /// keyEncipherment
    KeyEncipherment,
    /// dataEncipherment
    DataEncipherment,
    /// keyAgreement
    KeyAgreement,
    /// keyCertSign
    KeyCertSign,
    /// cRLSign
    CrlSign,
    /// encipherOnly
    EncipherOnly,
    /// decipherOnly
    DecipherOnly,
    /// TLS client authentication (extended)
    ClientAuth,
    /// TLS server authentication (extended)
    ServerAuth,
    /// Code signing (extended)
    CodeSigning,
    /// Email protection (extended)
    EmailProtection,
    /// Time stamping (extended)
    Timestamping,
}

impl KeyUsage {
    /// All known usage tokens.
    pub const ALL: [KeyUsage; 15] = [
        KeyUsage::DigitalSignature,
        KeyUsage::NonRepudiation,
        KeyUsage::ContentCommitment,
        KeyUsage::KeyEncipherment,
        KeyUsage::DataEncipherment,
        KeyUsage::KeyAgreement,
        KeyUsage::KeyCertSign,
        KeyUsage::CrlSign,
        KeyUsage::EncipherOnly,
        KeyUsage::DecipherOnly,
        KeyUsage::ClientAuth,
        KeyUsage::ServerAuth,
        KeyUsage::CodeSigning,
        KeyUsage::EmailProtection,
        KeyUsage::Timestamping,
    ];

    /// The default usage set for leaf certificates.
    pub fn default_leaf_set() -> Vec<KeyUsage> {
        vec![KeyUsage::ServerAuth, KeyUsage::ClientAuth]
    }

    /// The default usage set for certificate authorities.
    pub fn default_ca_set() -> Vec<KeyUsage> {
        vec![
            KeyUsage::ServerAuth,
            KeyUsage::ClientAuth,
            KeyUsage::CrlSign,
            KeyUsage::KeyCertSign,
        ]
    }

    /// The snake_case token used in kit metadata.
    pub fn token(&self) -> &'static str {
        match self {
            KeyUsage::DigitalSignature => "digital_signature",
            KeyUsage::NonRepudiation => "non_repudiation",
            KeyUsage::ContentCommitment => "content_commitment",
            KeyUsage::KeyEncipherment => "key_encipherment",
            KeyUsage::DataEncipherment => "data_encipherment",
            KeyUsage::KeyAgreement => "key_agreement",
            KeyUsage::KeyCertSign => "key_cert_sign",
            KeyUsage::CrlSign => "crl_sign",
            KeyUsage::EncipherOnly => "encipher_only",
            KeyUsage::DecipherOnly => "decipher_only",
            KeyUsage::ClientAuth => "client_auth",
            KeyUsage::ServerAuth => "server_auth",
            KeyUsage::CodeSigning => "code_signing",
            KeyUsage::EmailProtection => "email_protection",
            KeyUsage::Timestamping => "timestamping",
        }
    }

    /// Parse a kit metadata token.
    pub fn from_token(s: &str) -> Result<Self> {
        KeyUsage::ALL
            .iter()
            .copied()
            .find(|u| u.token() == s)
            .ok_or_else(|| GenesisError::Secret(format!("Unknown key usage '{}'", s)))
    }

    /// Whether this is an extended key usage rather than a key usage bit.
    pub fn is_extended(&self) -> bool {
        matches!(
            self,
            KeyUsage::ClientAuth
                | KeyUsage::ServerAuth
                | KeyUsage::CodeSigning
                | KeyUsage::EmailProtection
                | KeyUsage::Timestamping
        )
    }

    /// The label openssl prints for this usage in `-text` output.
    pub fn openssl_label(&self) -> &'static str {
        match self {
            KeyUsage::DigitalSignature => "Digital Signature",
            KeyUsage::NonRepudiation | KeyUsage::ContentCommitment => "Non Repudiation",
            KeyUsage::KeyEncipherment => "Key Encipherment",
            KeyUsage::DataEncipherment => "Data Encipherment",
            KeyUsage::KeyAgreement => "Key Agreement",
            KeyUsage::KeyCertSign => "Certificate Sign",
            KeyUsage::CrlSign => "CRL Sign",
            KeyUsage::EncipherOnly => "Encipher Only",
            KeyUsage::DecipherOnly => "Decipher Only",
            KeyUsage::ClientAuth => "TLS Web Client Authentication",
            KeyUsage::ServerAuth => "TLS Web Server Authentication",
            KeyUsage::CodeSigning => "Code Signing",
            KeyUsage::EmailProtection => "E-mail Protection",
            KeyUsage::Timestamping => "Time Stamping",
        }
    }

    /// Parse a usage back out of an openssl `-text` label.
    pub fn from_openssl_label(s: &str) -> Option<Self> {
        KeyUsage::ALL
            .iter()
            .copied()
            .find(|u| u.openssl_label() == s)
    }

    /// Canonical form for set comparison.
    ///
    /// `non_repudiation` and `content_commitment` are synonymous; either
    /// satisfies a request for the other.
    pub fn canonical(&self) -> KeyUsage {
        match self {
            KeyUsage::ContentCommitment => KeyUsage::NonRepudiation,
            other => *other,
        }
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for KeyUsage {
    type Err = GenesisError;

    fn from_str(s: &str) -> Result<Self> {
        KeyUsage::from_token(s)
    }
}

/// UUID versions supported by the `uuid` cred-line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UuidVersion {
    /// Time-based
    V1,
    /// MD5 name-based
    V3,
    /// Random
    V4,
    /// SHA1 name-based
    V5,
}

impl UuidVersion {
    /// Parse a cred-line version token (`v1|time|v3|md5|v4|random|v5|sha1`).
    pub fn from_token(s: &str) -> Result<Self> {
        match s {
            "v1" | "time" => Ok(UuidVersion::V1),
            "v3" | "md5" => Ok(UuidVersion::V3),
            "v4" | "random" => Ok(UuidVersion::V4),
            "v5" | "sha1" => Ok(UuidVersion::V5),
            _ => Err(GenesisError::Secret(format!("Unknown UUID version '{}'", s))),
        }
    }

    /// Whether this version derives the UUID from a namespace and name.
    pub fn is_name_based(&self) -> bool {
        matches!(self, UuidVersion::V3 | UuidVersion::V5)
    }
}

impl fmt::Display for UuidVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UuidVersion::V1 => write!(f, "v1"),
            UuidVersion::V3 => write!(f, "v3"),
            UuidVersion::V4 => write!(f, "v4"),
            UuidVersion::V5 => write!(f, "v5"),
        }
    }
}
