//! Secret validation against declared intent.
//!
//! One `export` under the environment prefix (plus the optional root CA
//! path) populates a snapshot; every plan is then checked against it.
//! Validation is best-effort: it finishes all plans and never aborts the
//! run.

use crate::plan::{Plan, PlanSet};
use crate::progress::{ProgressEvent, ProgressSink, Summary};
use crate::types::x509::{private_key_modulus, CertInfo, X509Plan};
use crate::types::{Check, SecretKind};
use genesis_types::traits::{SecretSnapshot, SecretStore};
use genesis_types::{CheckStatus, KeyUsage, Result, SecretPath};
use std::collections::{BTreeSet, HashMap};

/// Knobs for a validation run.
#[derive(Debug, Clone, Default)]
pub struct ValidatorOptions {
    /// Environment vault prefix, ending with `/`
    pub base: String,
    /// Mount-absolute path of the shared root CA, exported alongside the
    /// environment prefix
    pub root_ca_path: Option<String>,
    /// Only report each plan's worst findings
    pub hide_problematic: bool,
    /// Check existence and expected keys only; skip deep inspection
    pub presence_only: bool,
}

/// The validation outcome for one plan.
#[derive(Debug, Clone)]
pub struct PlanReport {
    /// Plan path (relative to the environment prefix)
    pub path: String,
    /// Worst outcome among the checks
    pub status: CheckStatus,
    /// Individual findings, in check order
    pub checks: Vec<Check>,
}

impl PlanReport {
    /// Findings worth showing, honoring the hide-problematic setting.
    pub fn visible_checks(&self, hide_problematic: bool) -> Vec<&Check> {
        self.checks
            .iter()
            .filter(|c| !hide_problematic || self.status == CheckStatus::Ok || c.status == self.status)
            .collect()
    }

    fn compact(&self) -> String {
        self.checks
            .iter()
            .map(|c| format!("{}={}", c.name, c.status))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The validation outcome for a whole plan set.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Per-plan reports, in resolved order
    pub reports: Vec<PlanReport>,
    /// Outcome counts
    pub summary: Summary,
}

impl ValidationReport {
    /// Whether anything was missing or failed.
    pub fn failed(&self) -> bool {
        self.summary.failed()
    }
}

/// Checks every plan's invariants against one store snapshot.
pub struct Validator<'a> {
    store: &'a dyn SecretStore,
    sink: &'a mut dyn ProgressSink,
    opts: ValidatorOptions,
}

impl<'a> Validator<'a> {
    /// Create a validator over a store and a progress sink.
    pub fn new(
        store: &'a dyn SecretStore,
        sink: &'a mut dyn ProgressSink,
        opts: ValidatorOptions,
    ) -> Self {
        Self { store, sink, opts }
    }

    fn full(&self, rel: &str) -> String {
        format!("{}{}", self.opts.base, rel.trim_start_matches('/'))
    }

    /// Validate a plan set.
    pub async fn validate(&mut self, set: &PlanSet) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        if set.is_empty() {
            self.sink.event(ProgressEvent::Empty {
                msg: "no secrets to check".to_string(),
            });
            return Ok(report);
        }

        self.sink.event(ProgressEvent::Wait {
            msg: format!("retrieving secrets under {}", self.opts.base),
        });
        let mut prefixes = vec![self.opts.base.clone()];
        if let Some(root) = &self.opts.root_ca_path {
            prefixes.push(root.clone());
        }
        let snapshot = self.store.export(&prefixes).await?;
        self.sink.event(ProgressEvent::WaitDone);

        let label = if self.opts.presence_only { "check" } else { "validate" };
        self.sink.event(ProgressEvent::Init {
            action: label.to_string(),
            total: set.len(),
        });

        let total = set.len();
        for (i, plan) in set.iter().enumerate() {
            self.sink.event(ProgressEvent::StartItem {
                index: i + 1,
                total,
                path: plan.path.clone(),
                label: plan.kind.describe(),
            });

            let checks = self.check_plan(plan, &snapshot).await;
            let status = checks
                .iter()
                .map(|c| c.status)
                .max()
                .unwrap_or(CheckStatus::Ok);

            let plan_report = PlanReport {
                path: plan.path.clone(),
                status,
                checks,
            };
            self.sink.event(ProgressEvent::DoneItem {
                status,
                msg: Some(plan_report.compact()),
            });
            report.summary.record(status);
            report.reports.push(plan_report);
        }

        self.sink.event(ProgressEvent::Completed {
            summary: report.summary,
        });
        Ok(report)
    }

    async fn check_plan(&mut self, plan: &Plan, snapshot: &SecretSnapshot) -> Vec<Check> {
        let mut checks = Vec::new();

        if let SecretKind::Invalid(inv) = &plan.kind {
            checks.push(Check::error("definition", inv.error.clone()));
            return checks;
        }

        let (full_path, key) = match SecretPath::parse(&plan.path) {
            Ok(parsed) => (self.full(parsed.path()), parsed.key().map(String::from)),
            Err(e) => {
                checks.push(Check::error("path", e.to_string()));
                return checks;
            }
        };

        let Some(stored) = snapshot.get(&full_path) else {
            checks.push(Check::missing("present", "secret not found in store"));
            return checks;
        };

        for expected in plan.kind.expected_keys(&plan.path) {
            if !stored.contains_key(&expected) {
                checks.push(Check::missing(expected.clone(), "key absent"));
            }
        }

        if self.opts.presence_only {
            if checks.is_empty() {
                checks.push(Check::ok("present", "all expected keys present"));
            }
            return checks;
        }

        match &plan.kind {
            SecretKind::Ssh(p) => p.check_secret(stored, &mut checks),
            SecretKind::Rsa(p) => p.check_secret(stored, &mut checks),
            SecretKind::DhParams(p) => p.check_secret(stored, &mut checks),
            SecretKind::Random(p) => {
                if let Some(key) = &key {
                    p.check_secret(key, stored, &mut checks);
                }
            }
            SecretKind::Uuid(p) => {
                if let Some(key) = &key {
                    p.check_secret(key, stored, &mut checks);
                }
            }
            SecretKind::Provided(_) => {
                if checks.is_empty() {
                    checks.push(Check::ok("present", "value present"));
                }
            }
            SecretKind::X509(x) => {
                self.check_x509(plan, x, stored, snapshot, &mut checks).await;
            }
            SecretKind::Invalid(_) => unreachable!("handled above"),
        }

        checks
    }

    async fn check_x509(
        &mut self,
        plan: &Plan,
        x: &X509Plan,
        stored: &HashMap<String, String>,
        snapshot: &SecretSnapshot,
        checks: &mut Vec<Check>,
    ) {
        let Some(cert_pem) = stored.get("certificate") else {
            return;
        };

        let info = match CertInfo::parse(cert_pem) {
            Ok(info) => {
                checks.push(Check::ok("valid", "certificate parses"));
                info
            }
            Err(e) => {
                checks.push(Check::error("valid", e.to_string()));
                return;
            }
        };

        if let Some(first) = x.names.first() {
            match &info.cn {
                Some(cn) if cn == first => checks.push(Check::ok("cn", format!("CN '{}'", cn))),
                Some(cn) => checks.push(Check::error(
                    "cn",
                    format!("CN is '{}', expected '{}'", cn, first),
                )),
                None => checks.push(Check::error("cn", format!("no CN, expected '{}'", first))),
            }
        }

        let declared: BTreeSet<&str> = x.names.iter().map(String::as_str).collect();
        let present: BTreeSet<&str> = info.sans.iter().map(String::as_str).collect();
        let missing: Vec<&&str> = declared.difference(&present).collect();
        let extra: Vec<&&str> = present.difference(&declared).collect();
        if missing.is_empty() && extra.is_empty() {
            checks.push(Check::ok("san", "SANs match declared names"));
        } else {
            let mut parts = Vec::new();
            if !missing.is_empty() {
                parts.push(format!("missing {:?}", missing));
            }
            if !extra.is_empty() {
                parts.push(format!("extra {:?}", extra));
            }
            checks.push(Check::error("san", parts.join("; ")));
        }

        if info.is_ca == x.is_ca {
            checks.push(Check::ok(
                "is_ca",
                if x.is_ca { "is a CA" } else { "is not a CA" },
            ));
        } else {
            checks.push(Check::error(
                "is_ca",
                format!("CA flag is {}, expected {}", info.is_ca, x.is_ca),
            ));
        }

        self.check_signage(plan, x, &info, snapshot, checks).await;

        if let Some(key_pem) = stored.get("key") {
            match (private_key_modulus(key_pem), &info.modulus) {
                (Ok(key_mod), Some(cert_mod)) if &key_mod == cert_mod => {
                    checks.push(Check::ok("modulus", "key matches certificate"));
                }
                (Ok(_), Some(_)) => {
                    checks.push(Check::error("modulus", "key does not match certificate"));
                }
                (Ok(_), None) => {
                    checks.push(Check::warn("modulus", "certificate key is not RSA"));
                }
                (Err(e), _) => checks.push(Check::error("modulus", e.to_string())),
            }
        }

        let now = chrono::Utc::now();
        if now < info.not_before {
            checks.push(Check::error("ttl", "certificate is not yet valid"));
        } else if now > info.not_after {
            checks.push(Check::error("ttl", "certificate has expired"));
        } else {
            let days = genesis_core::time::days_until(info.not_after);
            if days <= 30 {
                checks.push(Check::warn("ttl", format!("expires in {} days", days)));
            } else {
                checks.push(Check::ok("ttl", format!("expires in {} days", days)));
            }
        }

        let expected: BTreeSet<KeyUsage> =
            x.effective_usage().iter().map(|u| u.canonical()).collect();
        let found: BTreeSet<KeyUsage> = info.usage.iter().map(|u| u.canonical()).collect();
        if expected == found {
            checks.push(Check::ok("usage", "key usage matches"));
        } else {
            let missing: Vec<String> =
                expected.difference(&found).map(|u| u.token().to_string()).collect();
            let extra: Vec<String> =
                found.difference(&expected).map(|u| u.token().to_string()).collect();
            let mut parts = Vec::new();
            if !missing.is_empty() {
                parts.push(format!("missing {}", missing.join("+")));
            }
            if !extra.is_empty() {
                parts.push(format!("extra {}", extra.join("+")));
            }
            checks.push(Check::error("usage", parts.join("; ")));
        }
    }

    /// Signage: self-signed plans verify against themselves (key-id
    /// equality, falling back to issuer==subject); signed plans prefer a
    /// key-id match against the signer, then chain verification, then the
    /// store's own validation.
    async fn check_signage(
        &mut self,
        plan: &Plan,
        x: &X509Plan,
        info: &CertInfo,
        snapshot: &SecretSnapshot,
        checks: &mut Vec<Check>,
    ) {
        if x.self_signed > 0 {
            let ok = match (&info.subject_key_id, &info.authority_key_id) {
                (Some(skid), Some(akid)) => skid == akid,
                _ => info.issuer_eq_subject,
            };
            if ok {
                checks.push(Check::ok("self-signed", "certificate is self-signed"));
            } else {
                checks.push(Check::error("self-signed", "certificate is not self-signed"));
            }
            return;
        }

        let Some(signer) = &x.signed_by else {
            return;
        };
        let signer_full = if x.signed_by_abs_path {
            signer.clone()
        } else {
            self.full(signer)
        };

        let signer_pem = snapshot.value(&signer_full, "certificate");

        let verdict = match signer_pem {
            Some(pem) => match CertInfo::parse(pem) {
                Ok(signer_info) => {
                    match (&info.authority_key_id, &signer_info.subject_key_id) {
                        (Some(akid), Some(skid)) => Some(akid == skid),
                        _ => Some(info.signed_by(pem)),
                    }
                }
                Err(_) => Some(info.signed_by(pem)),
            },
            None => self
                .store
                .verify_signage(&self.full(&plan.path), &signer_full)
                .await
                .ok(),
        };

        match verdict {
            Some(true) => checks.push(Check::ok("signed", format!("signed by {}", signer))),
            Some(false) => checks.push(Check::error(
                "signed",
                format!("not signed by {}", signer),
            )),
            None => checks.push(Check::warn(
                "signed",
                format!("could not verify signage by {}", signer),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Executor, ExecutorOptions};
    use crate::parser::parse_kit_secrets;
    use crate::progress::BufferedSink;
    use crate::resolver::{resolve, ResolveOptions};
    use genesis_kit::KitMetadata;
    use genesis_types::SecretAction;
    use genesis_vault::MemoryStore;

    const BASE: &str = "secret/us/west/sandbox/shield/";

    fn plan_set(yaml: &str) -> PlanSet {
        let kit =
            KitMetadata::from_yaml(&format!("name: t\nversion: 0.0.1\n{}", yaml)).unwrap();
        let plans = parse_kit_secrets(&kit.secrets, &["base".to_string()]);
        resolve(plans, &ResolveOptions::default()).unwrap()
    }

    fn options() -> ValidatorOptions {
        ValidatorOptions {
            base: BASE.to_string(),
            ..Default::default()
        }
    }

    async fn add_all(store: &MemoryStore, set: &PlanSet) {
        let mut sink = BufferedSink::new();
        let opts = ExecutorOptions {
            base: BASE.to_string(),
            no_prompt: true,
            ..Default::default()
        };
        Executor::new(store, &mut sink, opts)
            .run(SecretAction::Add, set)
            .await
            .unwrap();
    }

    fn report_for<'a>(report: &'a ValidationReport, path: &str) -> &'a PlanReport {
        report
            .reports
            .iter()
            .find(|r| r.path == path)
            .unwrap_or_else(|| panic!("no report for {}", path))
    }

    #[tokio::test]
    async fn test_fresh_rsa_reports_all_ok() {
        let set = plan_set("credentials:\n  base:\n    work/signing_key: rsa 2048 fixed\n");
        let store = MemoryStore::new();
        add_all(&store, &set).await;

        let mut sink = BufferedSink::new();
        let report = Validator::new(&store, &mut sink, options())
            .validate(&set)
            .await
            .unwrap();

        let r = report_for(&report, "work/signing_key");
        assert_eq!(r.status, CheckStatus::Ok);
        let names: Vec<&str> = r.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["priv", "pub", "agree", "size"]);
    }

    #[tokio::test]
    async fn test_fresh_certificates_validate_clean() {
        let set = plan_set(
            "certificates:\n  base:\n    my-cert:\n      ca: { is_ca: true }\n      server: { names: [srv.example], valid_for: 90d }\n",
        );
        let store = MemoryStore::new();
        add_all(&store, &set).await;

        let mut sink = BufferedSink::new();
        let report = Validator::new(&store, &mut sink, options())
            .validate(&set)
            .await
            .unwrap();

        assert!(!report.failed(), "report: {:#?}", report.reports);
        let server = report_for(&report, "my-cert/server");
        assert!(server.checks.iter().any(|c| c.name == "signed"));
        let ca = report_for(&report, "my-cert/ca");
        assert!(ca.checks.iter().any(|c| c.name == "self-signed"));
    }

    #[tokio::test]
    async fn test_missing_secret_reports_missing() {
        let set = plan_set("credentials:\n  base:\n    work/signing_key: rsa 2048\n");
        let store = MemoryStore::new();

        let mut sink = BufferedSink::new();
        let report = Validator::new(&store, &mut sink, options())
            .validate(&set)
            .await
            .unwrap();

        assert_eq!(report_for(&report, "work/signing_key").status, CheckStatus::Missing);
        assert!(report.failed());
    }

    #[tokio::test]
    async fn test_tampered_uuid_fails_hash_check() {
        let set = plan_set(
            "credentials:\n  base:\n    ids/thing:\n      id: uuid v5 namespace dns name foo.example\n",
        );
        let store = MemoryStore::new();
        add_all(&store, &set).await;

        store.tamper(
            &format!("{}ids/thing", BASE),
            "id",
            "11111111-2222-3333-4444-555555555555",
        );

        let mut sink = BufferedSink::new();
        let report = Validator::new(&store, &mut sink, options())
            .validate(&set)
            .await
            .unwrap();

        let r = report_for(&report, "ids/thing:id");
        assert_eq!(r.status, CheckStatus::Error);
        assert!(r
            .checks
            .iter()
            .any(|c| c.name == "hash" && c.status == CheckStatus::Error));
    }

    #[tokio::test]
    async fn test_short_ttl_warns() {
        let set = plan_set(
            "certificates:\n  base:\n    my-cert:\n      ca: { is_ca: true }\n      server: { names: [srv.example], valid_for: 10d }\n",
        );
        let store = MemoryStore::new();
        add_all(&store, &set).await;

        let mut sink = BufferedSink::new();
        let report = Validator::new(&store, &mut sink, options())
            .validate(&set)
            .await
            .unwrap();

        let server = report_for(&report, "my-cert/server");
        assert_eq!(server.status, CheckStatus::Warn);
        assert!(server
            .checks
            .iter()
            .any(|c| c.name == "ttl" && c.status == CheckStatus::Warn));
    }

    #[tokio::test]
    async fn test_presence_only_skips_deep_checks() {
        let set = plan_set("credentials:\n  base:\n    work/signing_key: rsa 2048\n");
        let store = MemoryStore::new();
        add_all(&store, &set).await;

        let mut sink = BufferedSink::new();
        let opts = ValidatorOptions {
            presence_only: true,
            ..options()
        };
        let report = Validator::new(&store, &mut sink, opts).validate(&set).await.unwrap();

        let r = report_for(&report, "work/signing_key");
        assert_eq!(r.checks.len(), 1);
        assert_eq!(r.checks[0].name, "present");
    }

    #[tokio::test]
    async fn test_error_plans_surface_in_report() {
        let set = plan_set("credentials:\n  base:\n    bad/cred: random 16\n");
        let store = MemoryStore::new();

        let mut sink = BufferedSink::new();
        let report = Validator::new(&store, &mut sink, options())
            .validate(&set)
            .await
            .unwrap();

        let r = report_for(&report, "bad/cred");
        assert_eq!(r.status, CheckStatus::Error);
        assert_eq!(r.checks[0].name, "definition");
    }

    #[test]
    fn test_hide_problematic_filters_better_notes() {
        let report = PlanReport {
            path: "p".into(),
            status: CheckStatus::Error,
            checks: vec![
                Check::ok("valid", "fine"),
                Check::error("san", "missing"),
            ],
        };
        assert_eq!(report.visible_checks(false).len(), 2);
        let visible = report.visible_checks(true);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "san");
    }
}
