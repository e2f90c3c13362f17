//! In-process secret store used by tests.
//!
//! Implements the full [`SecretStore`] contract, including native X.509
//! issuance, so the executor and validator can be exercised without a
//! running Vault or the `safe` binary.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use genesis_types::traits::{SecretSnapshot, SecretStore, X509IssueSpec};
use genesis_types::{GenesisError, KeyUsage, Result, StoreError, StoreStatus};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::dh::Dh;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage as KeyUsageExt, SubjectAlternativeName,
    SubjectKeyIdentifier,
};
use openssl::x509::{X509, X509Builder, X509NameBuilder};
use parking_lot::Mutex;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// An in-memory secret store.
///
/// Writes are recorded in a mutation log so tests can assert idempotence
/// (a second `add` over the same plan set must log nothing).
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    data: Mutex<HashMap<String, HashMap<String, String>>>,
    mutations: Mutex<Vec<String>>,
}

fn secret_err(msg: impl Into<String>) -> GenesisError {
    GenesisError::Secret(msg.into())
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            name: "memory".to_string(),
            ..Default::default()
        }
    }

    fn norm(path: &str) -> String {
        path.trim_start_matches('/').to_string()
    }

    fn log(&self, entry: String) {
        self.mutations.lock().push(entry);
    }

    /// Every write performed since the last [`clear_mutations`].
    ///
    /// [`clear_mutations`]: MemoryStore::clear_mutations
    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().clone()
    }

    /// Forget the mutation log.
    pub fn clear_mutations(&self) {
        self.mutations.lock().clear();
    }

    /// Directly overwrite one value, bypassing no-clobber (test setup for
    /// tamper scenarios).
    pub fn tamper(&self, path: &str, key: &str, value: &str) {
        self.data
            .lock()
            .entry(Self::norm(path))
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    fn put(&self, path: &str, entries: Vec<(&str, String)>) {
        let mut data = self.data.lock();
        let map = data.entry(Self::norm(path)).or_default();
        for (key, value) in entries {
            map.insert(key.to_string(), value);
        }
    }

    fn read(&self, path: &str) -> HashMap<String, String> {
        self.data.lock().get(&Self::norm(path)).cloned().unwrap_or_default()
    }

    fn generate_keypair(bits: u32) -> Result<PKey<Private>> {
        let rsa = Rsa::generate(bits)
            .map_err(|e| secret_err(format!("Failed to generate RSA key: {}", e)))?;
        PKey::from_rsa(rsa).map_err(|e| secret_err(format!("Failed to wrap RSA key: {}", e)))
    }

    fn pem_private(key: &PKey<Private>) -> Result<String> {
        let pem = key
            .private_key_to_pem_pkcs8()
            .map_err(|e| secret_err(format!("Failed to encode private key: {}", e)))?;
        Ok(String::from_utf8_lossy(&pem).to_string())
    }

    fn pem_public(key: &PKey<Private>) -> Result<String> {
        let pem = key
            .public_key_to_pem()
            .map_err(|e| secret_err(format!("Failed to encode public key: {}", e)))?;
        Ok(String::from_utf8_lossy(&pem).to_string())
    }

    /// OpenSSH `ssh-rsa` public line for an RSA private key.
    fn openssh_public(key: &PKey<Private>) -> Result<String> {
        let rsa = key
            .rsa()
            .map_err(|e| secret_err(format!("Not an RSA key: {}", e)))?;

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

    /// SHA256 fingerprint of an OpenSSH public line, in ssh-keygen's
    /// `SHA256:...` notation.
    fn ssh_fingerprint(public_line: &str) -> Result<String> {
        let blob_b64 = public_line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| secret_err("Malformed OpenSSH public key"))?;
        let blob = base64::decode(blob_b64)
            .map_err(|e| secret_err(format!("Malformed OpenSSH public key: {}", e)))?;

        let digest = Sha256::digest(&blob);
        let mut encoded = base64::encode(digest);
        while encoded.ends_with('=') {
            encoded.pop();
        }
        Ok(format!("SHA256:{}", encoded))
    }

    fn subject_name(cn: &str) -> Result<openssl::x509::X509Name> {
        let mut builder = X509NameBuilder::new()
            .map_err(|e| secret_err(format!("Failed to create name builder: {}", e)))?;
        builder
            .append_entry_by_text("CN", cn)
            .map_err(|e| secret_err(format!("Failed to set CN: {}", e)))?;
        Ok(builder.build())
    }

    fn signer_material(&self, signer: &str) -> Result<(X509, PKey<Private>)> {
        let material = self.read(signer);
        let cert_pem = material
            .get("certificate")
            .ok_or_else(|| StoreError::NotFound(format!("{}:certificate", signer)))?;
        let key_pem = material
            .get("key")
            .ok_or_else(|| StoreError::NotFound(format!("{}:key", signer)))?;

        let cert = X509::from_pem(cert_pem.as_bytes())
            .map_err(|e| secret_err(format!("Bad signer certificate at {}: {}", signer, e)))?;
        let key = PKey::private_key_from_pem(key_pem.as_bytes())
            .map_err(|e| secret_err(format!("Bad signer key at {}: {}", signer, e)))?;
        Ok((cert, key))
    }

    fn build_certificate(
        names: &[String],
        usage: &[KeyUsage],
        is_ca: bool,
        ttl_days: u32,
        key: &PKey<Private>,
        issuer: Option<(&X509, &PKey<Private>)>,
    ) -> Result<X509> {
        let mut builder = X509Builder::new()
            .map_err(|e| secret_err(format!("Failed to create X509 builder: {}", e)))?;

        builder
            .set_version(2)
            .map_err(|e| secret_err(format!("Failed to set version: {}", e)))?;

        let mut serial = BigNum::new()
            .map_err(|e| secret_err(format!("Failed to create serial: {}", e)))?;
        serial
            .rand(64, MsbOption::MAYBE_ZERO, false)
            .map_err(|e| secret_err(format!("Failed to randomize serial: {}", e)))?;
        let serial_asn1 = serial
            .to_asn1_integer()
            .map_err(|e| secret_err(format!("Failed to convert serial: {}", e)))?;
        builder
            .set_serial_number(&serial_asn1)
            .map_err(|e| secret_err(format!("Failed to set serial number: {}", e)))?;

        let cn = names.first().map(String::as_str).unwrap_or("ca");
        let subject = Self::subject_name(cn)?;
        builder
            .set_subject_name(&subject)
            .map_err(|e| secret_err(format!("Failed to set subject: {}", e)))?;

        match issuer {
            Some((issuer_cert, _)) => builder
                .set_issuer_name(issuer_cert.subject_name())
                .map_err(|e| secret_err(format!("Failed to set issuer: {}", e)))?,
            None => builder
                .set_issuer_name(&subject)
                .map_err(|e| secret_err(format!("Failed to set issuer: {}", e)))?,
        }

        let not_before = Asn1Time::days_from_now(0)
            .map_err(|e| secret_err(format!("Failed to create not_before: {}", e)))?;
        let not_after = Asn1Time::days_from_now(ttl_days)
            .map_err(|e| secret_err(format!("Failed to create not_after: {}", e)))?;
        builder
            .set_not_before(&not_before)
            .map_err(|e| secret_err(format!("Failed to set not_before: {}", e)))?;
        builder
            .set_not_after(&not_after)
            .map_err(|e| secret_err(format!("Failed to set not_after: {}", e)))?;

        builder
            .set_pubkey(key)
            .map_err(|e| secret_err(format!("Failed to set pubkey: {}", e)))?;

        let mut basic = BasicConstraints::new();
        basic.critical();
        if is_ca {
            basic.ca();
        }
        builder
            .append_extension(
                basic
                    .build()
                    .map_err(|e| secret_err(format!("Failed to build basic constraints: {}", e)))?,
            )
            .map_err(|e| secret_err(format!("Failed to append basic constraints: {}", e)))?;

        let plain: Vec<KeyUsage> = usage.iter().copied().filter(|u| !u.is_extended()).collect();
        if !plain.is_empty() {
            let mut ku = KeyUsageExt::new();
            ku.critical();
            for u in &plain {
                match u.canonical() {
                    KeyUsage::DigitalSignature => ku.digital_signature(),
                    KeyUsage::NonRepudiation => ku.non_repudiation(),
                    KeyUsage::KeyEncipherment => ku.key_encipherment(),
                    KeyUsage::DataEncipherment => ku.data_encipherment(),
                    KeyUsage::KeyAgreement => ku.key_agreement(),
                    KeyUsage::KeyCertSign => ku.key_cert_sign(),
                    KeyUsage::CrlSign => ku.crl_sign(),
                    KeyUsage::EncipherOnly => ku.encipher_only(),
                    KeyUsage::DecipherOnly => ku.decipher_only(),
                    _ => &mut ku,
                };
            }
            builder
                .append_extension(
                    ku.build()
                        .map_err(|e| secret_err(format!("Failed to build key usage: {}", e)))?,
                )
                .map_err(|e| secret_err(format!("Failed to append key usage: {}", e)))?;
        }

        let extended: Vec<KeyUsage> = usage.iter().copied().filter(KeyUsage::is_extended).collect();
        if !extended.is_empty() {
            let mut eku = ExtendedKeyUsage::new();
            for u in &extended {
                match u {
                    KeyUsage::ServerAuth => eku.server_auth(),
                    KeyUsage::ClientAuth => eku.client_auth(),
                    KeyUsage::CodeSigning => eku.code_signing(),
                    KeyUsage::EmailProtection => eku.email_protection(),
                    KeyUsage::Timestamping => eku.time_stamping(),
                    _ => &mut eku,
                };
            }
            builder
                .append_extension(
                    eku.build()
                        .map_err(|e| secret_err(format!("Failed to build extended key usage: {}", e)))?,
                )
                .map_err(|e| secret_err(format!("Failed to append extended key usage: {}", e)))?;
        }

        if !names.is_empty() {
            let mut san = SubjectAlternativeName::new();
            for name in names {
                if name.parse::<std::net::IpAddr>().is_ok() {
                    san.ip(name);
                } else {
                    san.dns(name);
                }
            }
            let ctx = builder.x509v3_context(issuer.map(|(c, _)| &**c), None);
            let ext = san
                .build(&ctx)
                .map_err(|e| secret_err(format!("Failed to build SAN: {}", e)))?;
            builder
                .append_extension(ext)
                .map_err(|e| secret_err(format!("Failed to append SAN: {}", e)))?;
        }

        {
            let ctx = builder.x509v3_context(issuer.map(|(c, _)| &**c), None);
            let skid = SubjectKeyIdentifier::new()
                .build(&ctx)
                .map_err(|e| secret_err(format!("Failed to build subject key id: {}", e)))?;
            builder
                .append_extension(skid)
                .map_err(|e| secret_err(format!("Failed to append subject key id: {}", e)))?;
        }

        if let Some((issuer_cert, _)) = issuer {
            let ctx = builder.x509v3_context(Some(&**issuer_cert), None);
            let akid = openssl::x509::extension::AuthorityKeyIdentifier::new()
                .keyid(true)
                .build(&ctx)
                .map_err(|e| secret_err(format!("Failed to build authority key id: {}", e)))?;
            builder
                .append_extension(akid)
                .map_err(|e| secret_err(format!("Failed to append authority key id: {}", e)))?;
        }

        let signing_key = issuer.map(|(_, k)| k).unwrap_or(key);
        builder
            .sign(signing_key, MessageDigest::sha256())
            .map_err(|e| secret_err(format!("Failed to sign certificate: {}", e)))?;

        Ok(builder.build())
    }

    fn store_certificate(
        &self,
        path: &str,
        cert: &X509,
        key: &PKey<Private>,
        is_ca: bool,
    ) -> Result<()> {
        let cert_pem = cert
            .to_pem()
            .map_err(|e| secret_err(format!("Failed to encode certificate: {}", e)))?;
        let cert_pem = String::from_utf8_lossy(&cert_pem).to_string();
        let key_pem = Self::pem_private(key)?;
        let combined = format!("{}{}", cert_pem, key_pem);

        let serial = cert
            .serial_number()
            .to_bn()
            .and_then(|bn| bn.to_hex_str().map(|s| s.to_string()))
            .unwrap_or_default();

        let mut entries = vec![
            ("certificate", cert_pem),
            ("key", key_pem),
            ("combined", combined),
        ];
        if is_ca {
            entries.push(("serial", serial));
            entries.push(("crl", String::new()));
        }
        self.put(path, entries);
        Ok(())
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn status(&self) -> Result<StoreStatus> {
        Ok(StoreStatus::Ok)
    }

    async fn get(&self, path: &str) -> Result<HashMap<String, String>> {
        Ok(self.read(path))
    }

    async fn get_key(&self, path: &str, key: &str) -> Result<Option<String>> {
        Ok(self.read(path).get(key).cloned())
    }

    async fn set(&self, path: &str, key: &str, value: &str, no_clobber: bool) -> Result<()> {
        if no_clobber && self.read(path).contains_key(key) {
            return Ok(());
        }
        self.put(path, vec![(key, value.to_string())]);
        self.log(format!("set {}:{}", path, key));
        Ok(())
    }

    async fn has(&self, path: &str, key: Option<&str>) -> Result<bool> {
        let map = self.read(path);
        Ok(match key {
            Some(k) => map.contains_key(k),
            None => !map.is_empty(),
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        if self.data.lock().remove(&Self::norm(path)).is_some() {
            self.log(format!("rm {}", path));
        }
        Ok(())
    }

    async fn delete_key(&self, path: &str, key: &str) -> Result<()> {
        let mut data = self.data.lock();
        if let Some(map) = data.get_mut(&Self::norm(path)) {
            if map.remove(key).is_some() {
                self.log(format!("rm {}:{}", path, key));
            }
            if map.is_empty() {
                data.remove(&Self::norm(path));
            }
        }
        Ok(())
    }

    async fn export(&self, prefixes: &[String]) -> Result<SecretSnapshot> {
        let data = self.data.lock();
        let mut snapshot = SecretSnapshot::default();
        for (path, keys) in data.iter() {
            let matched = prefixes.iter().any(|p| {
                let p = p.trim_start_matches('/');
                path.starts_with(p.trim_end_matches('/'))
            });
            if matched {
                snapshot.insert(path.clone(), keys.clone());
            }
        }
        Ok(snapshot)
    }

    async fn gen_random(
        &self,
        path: &str,
        key: &str,
        size: usize,
        policy: Option<&str>,
        no_clobber: bool,
    ) -> Result<()> {
        if no_clobber && self.read(path).contains_key(key) {
            return Ok(());
        }

        let alphabet: Vec<char> = match policy {
            Some(p) => genesis_core::util::chars::expand_charset(p)
                .map_err(|e| secret_err(format!("Bad character policy '{}': {}", p, e)))?,
            None => ('a'..='z')
                .chain('A'..='Z')
                .chain('0'..='9')
                .collect(),
        };

        let mut rng = rand::thread_rng();
        let value: String = (0..size)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
            .collect();

        self.put(path, vec![(key, value)]);
        self.log(format!("gen {}:{}", path, key));
        Ok(())
    }

    async fn gen_ssh(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        if no_clobber && self.read(path).contains_key("private") {
            return Ok(());
        }

        let key = Self::generate_keypair(bits)?;
        let public = Self::openssh_public(&key)?;
        let fingerprint = Self::ssh_fingerprint(&public)?;

        self.put(
            path,
            vec![
                ("private", Self::pem_private(&key)?),
                ("public", public),
                ("fingerprint", fingerprint),
            ],
        );
        self.log(format!("ssh {}", path));
        Ok(())
    }

    async fn gen_rsa(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        if no_clobber && self.read(path).contains_key("private") {
            return Ok(());
        }

        let key = Self::generate_keypair(bits)?;
        self.put(
            path,
            vec![
                ("private", Self::pem_private(&key)?),
                ("public", Self::pem_public(&key)?),
            ],
        );
        self.log(format!("rsa {}", path));
        Ok(())
    }

    async fn gen_dhparams(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        if no_clobber && self.read(path).contains_key("dhparam-pem") {
            return Ok(());
        }

        let dh = Dh::generate_params(bits, 2)
            .map_err(|e| secret_err(format!("Failed to generate DH params: {}", e)))?;
        let pem = dh
            .params_to_pem()
            .map_err(|e| secret_err(format!("Failed to encode DH params: {}", e)))?;

        self.put(path, vec![("dhparam-pem", String::from_utf8_lossy(&pem).to_string())]);
        self.log(format!("dhparam {}", path));
        Ok(())
    }

    async fn format_value(
        &self,
        path: &str,
        key: &str,
        format: &str,
        dest_key: &str,
        no_clobber: bool,
    ) -> Result<()> {
        if no_clobber && self.read(path).contains_key(dest_key) {
            return Ok(());
        }

        let value = self
            .read(path)
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{}:{}", path, key)))?;

        let formatted = match format {
            "base64" => base64::encode(value.as_bytes()),
            "bcrypt" => bcrypt::hash(&value, bcrypt::DEFAULT_COST)
                .map_err(|e| secret_err(format!("Failed to bcrypt value: {}", e)))?,
            other => {
                return Err(secret_err(format!("Unknown format '{}'", other)));
            }
        };

        self.put(path, vec![(dest_key, formatted)]);
        self.log(format!("fmt {}:{}", path, dest_key));
        Ok(())
    }

    async fn issue_x509(&self, spec: &X509IssueSpec) -> Result<()> {
        if spec.no_clobber && self.read(&spec.path).contains_key("certificate") {
            return Ok(());
        }

        let key = Self::generate_keypair(2048)?;

        let issuer = match &spec.signer {
            Some(signer) => Some(self.signer_material(signer)?),
            None => None,
        };
        let issuer_ref = issuer.as_ref().map(|(c, k)| (c, k));

        let cert = Self::build_certificate(
            &spec.names,
            &spec.usage,
            spec.is_ca,
            spec.ttl_days,
            &key,
            issuer_ref,
        )?;

        self.store_certificate(&spec.path, &cert, &key, spec.is_ca)?;
        self.log(format!("x509 issue {}", spec.path));
        Ok(())
    }

    async fn renew_x509(
        &self,
        path: &str,
        signer: Option<&str>,
        subject: Option<&str>,
    ) -> Result<String> {
        let material = self.read(path);
        let cert_pem = material
            .get("certificate")
            .ok_or_else(|| StoreError::NotFound(format!("{}:certificate", path)))?;
        let key_pem = material
            .get("key")
            .ok_or_else(|| StoreError::NotFound(format!("{}:key", path)))?;

        let old = X509::from_pem(cert_pem.as_bytes())
            .map_err(|e| secret_err(format!("Bad certificate at {}: {}", path, e)))?;
        let key = PKey::private_key_from_pem(key_pem.as_bytes())
            .map_err(|e| secret_err(format!("Bad key at {}: {}", path, e)))?;

        let mut names = Vec::new();
        if let Some(cn) = subject {
            names.push(cn.to_string());
        } else if let Some(entry) = old
            .subject_name()
            .entries_by_nid(openssl::nid::Nid::COMMONNAME)
            .next()
        {
            names.push(String::from_utf8_lossy(entry.data().as_slice()).to_string());
        }
        if let Some(sans) = old.subject_alt_names() {
            for san in sans {
                if let Some(dns) = san.dnsname() {
                    if !names.contains(&dns.to_string()) {
                        names.push(dns.to_string());
                    }
                }
            }
        }

        let epoch = Asn1Time::from_unix(0)
            .map_err(|e| secret_err(format!("Failed to build epoch: {}", e)))?;
        let issued = epoch
            .diff(old.not_before())
            .map_err(|e| secret_err(format!("Failed to diff not_before: {}", e)))?;
        let expires = epoch
            .diff(old.not_after())
            .map_err(|e| secret_err(format!("Failed to diff not_after: {}", e)))?;
        let ttl_days = (expires.days - issued.days).max(1) as u32;

        let was_ca = self.read(path).contains_key("serial");

        let issuer = match signer {
            Some(s) => Some(self.signer_material(s)?),
            None => None,
        };
        let issuer_ref = issuer.as_ref().map(|(c, k)| (c, k));

        // Renewal reissues with the role's default usage set; declared
        // usage is reasserted by the next recreate
        let usage = if was_ca {
            KeyUsage::default_ca_set()
        } else {
            KeyUsage::default_leaf_set()
        };

        let cert = Self::build_certificate(&names, &usage, was_ca, ttl_days, &key, issuer_ref)?;
        self.store_certificate(path, &cert, &key, was_ca)?;
        self.log(format!("x509 renew {}", path));

        let expiry = Utc::now() + Duration::days(i64::from(ttl_days));
        Ok(format!(
            "Renewed x509 certificate at {} - expiry set to {}\n",
            path,
            expiry.to_rfc3339()
        ))
    }

    async fn verify_signage(&self, path: &str, signer: &str) -> Result<bool> {
        let cert_pem = match self.read(path).get("certificate").cloned() {
            Some(p) => p,
            None => return Ok(false),
        };
        let signer_pem = match self.read(signer).get("certificate").cloned() {
            Some(p) => p,
            None => return Ok(false),
        };

        let cert = X509::from_pem(cert_pem.as_bytes())
            .map_err(|e| secret_err(format!("Bad certificate at {}: {}", path, e)))?;
        let signer_cert = X509::from_pem(signer_pem.as_bytes())
            .map_err(|e| secret_err(format!("Bad certificate at {}: {}", signer, e)))?;
        let signer_key = signer_cert
            .public_key()
            .map_err(|e| secret_err(format!("Bad public key at {}: {}", signer, e)))?;

        Ok(cert.verify(&signer_key).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_no_clobber_preserves() {
        let store = MemoryStore::new();
        store.set("a/b", "k", "first", false).await.unwrap();
        store.set("a/b", "k", "second", true).await.unwrap();
        assert_eq!(store.get_key("a/b", "k").await.unwrap().unwrap(), "first");

        store.set("a/b", "k", "third", false).await.unwrap();
        assert_eq!(store.get_key("a/b", "k").await.unwrap().unwrap(), "third");
    }

    #[tokio::test]
    async fn test_gen_random_respects_policy_and_size() {
        let store = MemoryStore::new();
        store
            .gen_random("a/r", "val", 24, Some("a-f0-9"), false)
            .await
            .unwrap();
        let value = store.get_key("a/r", "val").await.unwrap().unwrap();
        assert_eq!(value.len(), 24);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn test_issue_and_verify_chain() {
        let store = MemoryStore::new();
        store
            .issue_x509(&X509IssueSpec {
                path: "certs/ca".into(),
                names: vec!["ca.example".into()],
                is_ca: true,
                ttl_days: 365,
                signer: None,
                usage: KeyUsage::default_ca_set(),
                no_clobber: false,
            })
            .await
            .unwrap();
        store
            .issue_x509(&X509IssueSpec {
                path: "certs/server".into(),
                names: vec!["srv.example".into()],
                is_ca: false,
                ttl_days: 90,
                signer: Some("certs/ca".into()),
                usage: KeyUsage::default_leaf_set(),
                no_clobber: false,
            })
            .await
            .unwrap();

        assert!(store.verify_signage("certs/server", "certs/ca").await.unwrap());
        assert!(!store.verify_signage("certs/ca", "certs/server").await.unwrap());

        let ca = store.get("certs/ca").await.unwrap();
        assert!(ca.contains_key("serial"));
        assert!(ca.contains_key("crl"));
        let server = store.get("certs/server").await.unwrap();
        assert!(!server.contains_key("serial"));
    }

    #[tokio::test]
    async fn test_renew_reports_expiry() {
        let store = MemoryStore::new();
        store
            .issue_x509(&X509IssueSpec {
                path: "certs/self".into(),
                names: vec!["self.example".into()],
                is_ca: false,
                ttl_days: 30,
                signer: None,
                usage: KeyUsage::default_leaf_set(),
                no_clobber: false,
            })
            .await
            .unwrap();

        let report = store.renew_x509("certs/self", None, None).await.unwrap();
        assert!(report.contains("expiry set to"));
    }

    #[tokio::test]
    async fn test_mutation_log_tracks_writes() {
        let store = MemoryStore::new();
        store.gen_rsa("keys/a", 2048, true).await.unwrap();
        assert_eq!(store.mutations(), vec!["rsa keys/a".to_string()]);

        store.clear_mutations();
        store.gen_rsa("keys/a", 2048, true).await.unwrap();
        assert!(store.mutations().is_empty());
    }
}
