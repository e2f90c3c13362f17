//! Secret store client driving the external `safe` CLI.

use async_trait::async_trait;
use genesis_core::util::fs::scratch_file;
use genesis_core::util::process::{
    capture_async, capture_async_with_stdin, redact_secrets, Captured,
};
use genesis_types::traits::{SecretSnapshot, SecretStore, X509IssueSpec};
use genesis_types::{GenesisError, Result, StoreConfig, StoreError, StoreStatus};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Client for a Vault-backed secret store, driven through `safe`.
///
/// Every invocation pins the target to this client's URL: `SAFE_TARGET` is
/// cleared and `VAULT_ADDR` is forced, so the operator's ambient target can
/// never leak into a run. Debug output from safe is suppressed.
#[derive(Debug, Clone)]
pub struct SafeClient {
    config: StoreConfig,
}

impl SafeClient {
    /// Create a client for the given store.
    pub fn new(config: StoreConfig) -> Result<Self> {
        Url::parse(&config.url)
            .map_err(|e| GenesisError::Config(format!("Invalid store URL '{}': {}", config.url, e)))?;
        Ok(Self { config })
    }

    /// The store configuration this client is pinned to.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("safe");
        cmd.env_remove("SAFE_TARGET")
            .env_remove("DEBUG")
            .env_remove("SAFE_DEBUG")
            .env("VAULT_ADDR", &self.config.url);
        if self.config.insecure {
            cmd.env("VAULT_SKIP_VERIFY", "1");
        }
        if let Some(ns) = &self.config.namespace {
            cmd.env("VAULT_NAMESPACE", ns);
        }
        cmd
    }

    /// Run a safe command, capturing stdout, exit code, and stderr.
    pub async fn run(&self, args: &[&str]) -> Result<Captured> {
        self.run_redacted(args, &[]).await
    }

    /// Run a safe command whose argv carries secret material; the given
    /// substrings are scrubbed from the debug log.
    async fn run_redacted(&self, args: &[&str], secrets: &[&str]) -> Result<Captured> {
        tracing::debug!(
            target: "genesis::vault",
            cmd = %redact_secrets(&format!("safe {}", args.join(" ")), secrets),
        );

        let mut cmd = self.command();
        cmd.args(args);
        capture_async(&mut cmd)
            .await
            .map_err(|e| StoreError::Unreachable(format!("failed to exec safe: {}", e)).into())
    }

    /// Run a safe command feeding `input` on stdin (auth flows).
    async fn run_with_input(&self, args: &[&str], input: &str) -> Result<Captured> {
        tracing::debug!(target: "genesis::vault", cmd = %format!("safe {}", args.join(" ")));

        let mut cmd = self.command();
        cmd.args(args);
        capture_async_with_stdin(&mut cmd, input)
            .await
            .map_err(|e| StoreError::Protocol(format!("safe did not finish: {}", e)).into())
    }

    /// Classify a failed safe invocation into the store error taxonomy.
    fn classify(&self, context: &str, stderr: &str) -> StoreError {
        let lower = stderr.to_lowercase();
        let detail = format!("{}: {}", context, stderr.trim());

        if lower.contains("connection refused")
            || lower.contains("no such host")
            || lower.contains("i/o timeout")
        {
            StoreError::Unreachable(detail)
        } else if lower.contains("sealed") {
            StoreError::Sealed(detail)
        } else if lower.contains("not initialized") || lower.contains("not yet initialized") {
            StoreError::Uninitialized(detail)
        } else if lower.contains("403")
            || lower.contains("permission denied")
            || lower.contains("missing client token")
            || lower.contains("invalid token")
        {
            StoreError::Unauthenticated(detail)
        } else if lower.contains("404") || lower.contains("not found") {
            StoreError::NotFound(detail)
        } else {
            StoreError::Protocol(detail)
        }
    }

    fn check(&self, context: &str, captured: &Captured) -> Result<()> {
        let (_, rc, stderr) = captured;
        if *rc == 0 {
            Ok(())
        } else {
            Err(self.classify(context, stderr).into())
        }
    }

    /// Authenticate against the store, trying the supported credential
    /// sources in order: approle, token, userpass, github. With none of the
    /// variables set, the ambient safe session is assumed valid.
    pub async fn authenticate(&self) -> Result<()> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let attempt = if let (Some(role), Some(secret)) =
            (var("VAULT_ROLE_ID"), var("VAULT_SECRET_ID"))
        {
            Some((vec!["auth", "approle"], format!("{}\n{}\n", role, secret)))
        } else if let Some(token) = var("VAULT_AUTH_TOKEN") {
            Some((vec!["auth", "token"], format!("{}\n", token)))
        } else if let (Some(user), Some(pass)) = (var("VAULT_USERNAME"), var("VAULT_PASSWORD")) {
            Some((vec!["auth", "userpass"], format!("{}\n{}\n", user, pass)))
        } else {
            var("VAULT_GITHUB_TOKEN").map(|token| (vec!["auth", "github"], format!("{}\n", token)))
        };

        match attempt {
            Some((args, input)) => {
                let captured = self.run_with_input(&args, &input).await?;
                self.check("auth", &captured)
            }
            None => Ok(()),
        }
    }

    async fn tcp_reachable(&self) -> bool {
        let Ok(url) = Url::parse(&self.config.url) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };
        let port = url.port_or_known_default().unwrap_or(8200);

        matches!(
            tokio::time::timeout(
                Duration::from_secs(2),
                tokio::net::TcpStream::connect((host, port)),
            )
            .await,
            Ok(Ok(_))
        )
    }

    async fn health(&self) -> Result<HealthResponse> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.config.insecure)
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| StoreError::Protocol(format!("failed to build HTTP client: {}", e)))?;

        let url = format!("{}/v1/sys/health", self.config.url.trim_end_matches('/'));

        // sys/health answers with a status code per state; any body with the
        // initialized/sealed fields is good enough
        let resp = client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(format!("health check failed: {}", e)))?;

        resp.json()
            .await
            .map_err(|e| StoreError::Protocol(format!("unparseable health response: {}", e)).into())
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    initialized: bool,
    sealed: bool,
}

/// Shape of `safe export` output: path → key → value.
type ExportDump = HashMap<String, HashMap<String, serde_json::Value>>;

fn stringify_export(dump: ExportDump) -> SecretSnapshot {
    let mut snapshot = SecretSnapshot::default();
    for (path, keys) in dump {
        let mut out = HashMap::new();
        for (key, value) in keys {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            out.insert(key, value);
        }
        snapshot.insert(path, out);
    }
    snapshot
}

#[async_trait]
impl SecretStore for SafeClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn status(&self) -> Result<StoreStatus> {
        if !self.tcp_reachable().await {
            return Ok(StoreStatus::Unreachable);
        }

        let health = match self.health().await {
            Ok(h) => h,
            Err(_) => return Ok(StoreStatus::Unreachable),
        };
        if !health.initialized {
            return Ok(StoreStatus::Uninitialized);
        }
        if health.sealed {
            return Ok(StoreStatus::Sealed);
        }

        // Reachable and unsealed; see whether our token works
        let captured = self.run(&["paths", &self.config.mount]).await?;
        match self.check("status probe", &captured) {
            Ok(()) => Ok(StoreStatus::Ok),
            Err(GenesisError::Store(StoreError::Unauthenticated(_))) => {
                Ok(StoreStatus::Unauthenticated)
            }
            // NotFound just means nothing lives under the mount yet
            Err(GenesisError::Store(StoreError::NotFound(_))) => Ok(StoreStatus::Ok),
            Err(e) => Err(e),
        }
    }

    async fn get(&self, path: &str) -> Result<HashMap<String, String>> {
        let captured = self.run(&["export", path]).await?;
        let (stdout, rc, stderr) = &captured;

        if *rc != 0 {
            return match self.classify(path, stderr) {
                StoreError::NotFound(_) => Ok(HashMap::new()),
                other => Err(other.into()),
            };
        }

        let dump: ExportDump = serde_json::from_str(stdout)
            .map_err(|e| StoreError::Protocol(format!("unparseable export of {}: {}", path, e)))?;

        let snapshot = stringify_export(dump);
        Ok(snapshot.get(path).cloned().unwrap_or_default())
    }

    async fn get_key(&self, path: &str, key: &str) -> Result<Option<String>> {
        let target = format!("{}:{}", path, key);
        let captured = self.run(&["get", &target]).await?;
        let (stdout, rc, stderr) = &captured;

        if *rc != 0 {
            return match self.classify(&target, stderr) {
                StoreError::NotFound(_) => Ok(None),
                other => Err(other.into()),
            };
        }

        Ok(Some(stdout.trim_end_matches('\n').to_string()))
    }

    async fn set(&self, path: &str, key: &str, value: &str, no_clobber: bool) -> Result<()> {
        if no_clobber && self.has(path, Some(key)).await? {
            return Ok(());
        }

        // Multiline values travel via a scratch file (key@file) so they
        // never appear on a command line
        if value.contains('\n') {
            let file = scratch_file(value)?;
            let arg = format!("{}@{}", key, file.path().display());
            let captured = self.run(&["set", path, &arg]).await?;
            return self.check(path, &captured);
        }

        let pair = format!("{}={}", key, value);
        let captured = self.run_redacted(&["set", path, &pair], &[value]).await?;
        self.check(path, &captured)
    }

    async fn has(&self, path: &str, key: Option<&str>) -> Result<bool> {
        let target = match key {
            Some(k) => format!("{}:{}", path, k),
            None => path.to_string(),
        };
        let (_, rc, _) = self.run(&["exists", &target]).await?;
        Ok(rc == 0)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let captured = self.run(&["rm", "-f", path]).await?;
        match self.check(path, &captured) {
            Err(GenesisError::Store(StoreError::NotFound(_))) => Ok(()),
            other => other,
        }
    }

    async fn delete_key(&self, path: &str, key: &str) -> Result<()> {
        let target = format!("{}:{}", path, key);
        let captured = self.run(&["rm", "-f", &target]).await?;
        match self.check(&target, &captured) {
            Err(GenesisError::Store(StoreError::NotFound(_))) => Ok(()),
            other => other,
        }
    }

    async fn export(&self, prefixes: &[String]) -> Result<SecretSnapshot> {
        let mut args = vec!["export"];
        args.extend(prefixes.iter().map(String::as_str));

        let captured = self.run(&args).await?;
        let (stdout, rc, stderr) = &captured;

        if *rc != 0 {
            return match self.classify("export", stderr) {
                StoreError::NotFound(_) => Ok(SecretSnapshot::default()),
                other => Err(other.into()),
            };
        }

        let dump: ExportDump = serde_json::from_str(stdout)
            .map_err(|e| StoreError::Protocol(format!("unparseable export: {}", e)))?;
        Ok(stringify_export(dump))
    }

    async fn gen_random(
        &self,
        path: &str,
        key: &str,
        size: usize,
        policy: Option<&str>,
        no_clobber: bool,
    ) -> Result<()> {
        let size = size.to_string();
        let target = format!("{}:{}", path, key);
        let mut args = vec!["gen", "-l", size.as_str()];
        if let Some(policy) = policy {
            args.push("-p");
            args.push(policy);
        }
        if no_clobber {
            args.push("--no-clobber");
        }
        args.push(target.as_str());

        let captured = self.run(&args).await?;
        self.check(&target, &captured)
    }

    async fn gen_ssh(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        let bits = bits.to_string();
        let mut args = vec!["ssh", bits.as_str()];
        if no_clobber {
            args.push("--no-clobber");
        }
        args.push(path);

        let captured = self.run(&args).await?;
        self.check(path, &captured)
    }

    async fn gen_rsa(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        let bits = bits.to_string();
        let mut args = vec!["rsa", bits.as_str()];
        if no_clobber {
            args.push("--no-clobber");
        }
        args.push(path);

        let captured = self.run(&args).await?;
        self.check(path, &captured)
    }

    async fn gen_dhparams(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        let bits = bits.to_string();
        let mut args = vec!["dhparam", bits.as_str()];
        if no_clobber {
            args.push("--no-clobber");
        }
        args.push(path);

        let captured = self.run(&args).await?;
        self.check(path, &captured)
    }

    async fn format_value(
        &self,
        path: &str,
        key: &str,
        format: &str,
        dest_key: &str,
        no_clobber: bool,
    ) -> Result<()> {
        if no_clobber && self.has(path, Some(dest_key)).await? {
            return Ok(());
        }

        let captured = self.run(&["fmt", format, path, key, dest_key]).await?;
        self.check(path, &captured)
    }

    async fn issue_x509(&self, spec: &X509IssueSpec) -> Result<()> {
        let ttl = format!("{}d", spec.ttl_days);
        let mut args: Vec<String> = vec!["x509".into(), "issue".into(), "-t".into(), ttl];

        for name in &spec.names {
            args.push("-n".into());
            args.push(name.clone());
        }
        for usage in &spec.usage {
            args.push("-u".into());
            args.push(usage.token().to_string());
        }
        if spec.is_ca {
            args.push("--ca".into());
        }
        if let Some(signer) = &spec.signer {
            args.push("--signed-by".into());
            args.push(signer.clone());
        }
        if spec.no_clobber {
            args.push("--no-clobber".into());
        }
        args.push(spec.path.clone());

        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let captured = self.run(&argv).await?;
        self.check(&spec.path, &captured)
    }

    async fn renew_x509(
        &self,
        path: &str,
        signer: Option<&str>,
        subject: Option<&str>,
    ) -> Result<String> {
        let mut args: Vec<String> = vec!["x509".into(), "renew".into()];
        if let Some(signer) = signer {
            args.push("--signed-by".into());
            args.push(signer.to_string());
        }
        if let Some(subject) = subject {
            args.push("--subject".into());
            args.push(format!("cn={}", subject));
        }
        args.push(path.to_string());

        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let captured = self.run(&argv).await?;
        self.check(path, &captured)?;
        Ok(captured.0)
    }

    async fn verify_signage(&self, path: &str, signer: &str) -> Result<bool> {
        let (_, rc, _) = self
            .run(&["x509", "validate", "--signed-by", signer, path])
            .await?;
        Ok(rc == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SafeClient {
        SafeClient::new(StoreConfig::default()).unwrap()
    }

    #[test]
    fn test_rejects_bad_url() {
        let config = StoreConfig {
            url: "not a url".into(),
            ..Default::default()
        };
        assert!(SafeClient::new(config).is_err());
    }

    #[test]
    fn test_classify_store_errors() {
        let c = client();
        assert!(matches!(
            c.classify("x", "dial tcp: connection refused"),
            StoreError::Unreachable(_)
        ));
        assert!(matches!(
            c.classify("x", "Vault is sealed"),
            StoreError::Sealed(_)
        ));
        assert!(matches!(
            c.classify("x", "server is not initialized"),
            StoreError::Uninitialized(_)
        ));
        assert!(matches!(
            c.classify("x", "Code: 403. missing client token"),
            StoreError::Unauthenticated(_)
        ));
        assert!(matches!(
            c.classify("x", "secret/foo not found"),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            c.classify("x", "something exploded"),
            StoreError::Protocol(_)
        ));
    }

    #[test]
    fn test_stringify_export() {
        let dump: ExportDump = serde_json::from_str(
            r#"{"secret/a": {"user": "admin", "count": 3}}"#,
        )
        .unwrap();
        let snapshot = stringify_export(dump);
        assert_eq!(snapshot.value("secret/a", "user"), Some("admin"));
        assert_eq!(snapshot.value("secret/a", "count"), Some("3"));
    }
}
