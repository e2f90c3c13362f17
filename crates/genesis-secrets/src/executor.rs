//! Action executor: drives a secret store to realize plan sets.
//!
//! The executor is linear (one plan at a time) so the progress sink sees
//! ordered, interleaving-free events and so CA certificates are guaranteed
//! visible to their signees.

use crate::plan::{Plan, PlanSet};
use crate::progress::{ProgressEvent, ProgressSink, Summary};
use crate::types::SecretKind;
use genesis_types::traits::{SecretStore, X509IssueSpec};
use genesis_types::{CheckStatus, GenesisError, Result, SecretAction, SecretPath};
use uuid::Uuid;

/// Knobs for an executor run.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Environment vault prefix, ending with `/`
    pub base: String,
    /// Confirm each item (`y/n/q`)
    pub interactive: bool,
    /// Skip the destructive-action confirmation
    pub no_prompt: bool,
    /// Re-assert the subject CN when renewing
    pub renew_subject: bool,
}

/// Drives `add / recreate / renew / remove` for each plan, in resolver
/// order, reporting per-item progress through a sink.
pub struct Executor<'a> {
    store: &'a dyn SecretStore,
    sink: &'a mut dyn ProgressSink,
    opts: ExecutorOptions,
}

impl<'a> Executor<'a> {
    /// Create an executor over a store and a progress sink.
    pub fn new(
        store: &'a dyn SecretStore,
        sink: &'a mut dyn ProgressSink,
        opts: ExecutorOptions,
    ) -> Self {
        Self { store, sink, opts }
    }

    fn full(&self, rel: &str) -> String {
        format!("{}{}", self.opts.base, rel.trim_start_matches('/'))
    }

    /// Split a `P:K` plan path into its full vault path and key.
    fn keyed(&self, plan: &Plan) -> Result<(String, String)> {
        let parsed = SecretPath::parse(&plan.path)?;
        let key = parsed.key().ok_or_else(|| {
            GenesisError::Bug(format!("plan '{}' should carry a key", plan.path))
        })?;
        Ok((self.full(parsed.path()), key.to_string()))
    }

    /// Run one lifecycle action over a plan set.
    pub async fn run(&mut self, action: SecretAction, set: &PlanSet) -> Result<Summary> {
        let plans: Vec<&Plan> = set
            .iter()
            .filter(|p| match action {
                // Only certificates renew; everything else drops silently
                SecretAction::Renew => matches!(p.kind, SecretKind::X509(_)),
                _ => true,
            })
            .collect();

        let mut summary = Summary::default();

        if plans.is_empty() {
            self.sink.event(ProgressEvent::Empty {
                msg: format!("no secrets to {}", action),
            });
            return Ok(summary);
        }

        if action.is_destructive() && !self.opts.no_prompt && !self.opts.interactive {
            let answer = self.sink.inline_prompt(
                &format!(
                    "{} will overwrite or delete existing secrets under {} - proceed? [y/n]",
                    action, self.opts.base
                ),
                &['y', 'n'],
            )?;
            if answer != 'y' {
                return Err(GenesisError::Abort(format!("{} declined", action)));
            }
        }

        self.sink.event(ProgressEvent::Init {
            action: action.to_string(),
            total: plans.len(),
        });

        let total = plans.len();
        for (i, plan) in plans.iter().enumerate() {
            self.sink.event(ProgressEvent::StartItem {
                index: i + 1,
                total,
                path: plan.path.clone(),
                label: plan.kind.describe(),
            });

            if self.opts.interactive {
                let answer = self
                    .sink
                    .inline_prompt(&format!("{} {}? [y/n/q]", action, plan.path), &['y', 'n', 'q'])?;
                match answer {
                    'n' => {
                        summary.skipped += 1;
                        self.sink.event(ProgressEvent::DoneItem {
                            status: CheckStatus::Ok,
                            msg: Some("skipped".to_string()),
                        });
                        continue;
                    }
                    'q' => {
                        summary.skipped += total - i;
                        summary.aborted = true;
                        self.sink.event(ProgressEvent::Abort {
                            msg: format!("quit; {} remaining items skipped", total - i),
                        });
                        break;
                    }
                    _ => {}
                }
            }

            if let SecretKind::Invalid(inv) = &plan.kind {
                summary.record(CheckStatus::Error);
                self.sink.event(ProgressEvent::DoneItem {
                    status: CheckStatus::Error,
                    msg: Some(inv.error.clone()),
                });
                continue;
            }

            match self.run_one(action, plan).await {
                Ok((status, msg)) => {
                    if status == CheckStatus::Ok && msg.as_deref() == Some("skipped") {
                        summary.skipped += 1;
                    } else {
                        summary.record(status);
                    }
                    self.sink.event(ProgressEvent::DoneItem { status, msg });
                }
                Err(e) => {
                    // One failed issuance may invalidate downstream
                    // signees; report the current item, then stop.
                    summary.record(CheckStatus::Error);
                    self.sink.event(ProgressEvent::DoneItem {
                        status: CheckStatus::Error,
                        msg: Some(e.to_string()),
                    });
                    self.sink.event(ProgressEvent::Abort {
                        msg: format!("{} failed on {}", action, plan.path),
                    });
                    return Err(e);
                }
            }
        }

        self.sink.event(ProgressEvent::Completed { summary });
        Ok(summary)
    }

    async fn run_one(
        &mut self,
        action: SecretAction,
        plan: &Plan,
    ) -> Result<(CheckStatus, Option<String>)> {
        match action {
            SecretAction::Add => self.generate(plan, true).await,
            SecretAction::Recreate => {
                // fixed plans are never overwritten
                self.generate(plan, plan.kind.fixed()).await
            }
            SecretAction::Renew => self.renew(plan).await,
            SecretAction::Remove => self.remove(plan).await,
        }
    }

    async fn generate(
        &mut self,
        plan: &Plan,
        no_clobber: bool,
    ) -> Result<(CheckStatus, Option<String>)> {
        match &plan.kind {
            SecretKind::X509(x) => {
                let signer = match (&x.signed_by, x.signed_by_abs_path) {
                    (Some(s), true) => Some(s.clone()),
                    (Some(s), false) => Some(self.full(s)),
                    (None, _) => None,
                };
                let spec = X509IssueSpec {
                    path: self.full(&plan.path),
                    names: x.names.clone(),
                    is_ca: x.is_ca,
                    ttl_days: x.ttl_days()?,
                    signer,
                    usage: x.effective_usage(),
                    no_clobber,
                };
                self.store.issue_x509(&spec).await?;
                Ok((CheckStatus::Ok, None))
            }
            SecretKind::Ssh(p) => {
                self.store.gen_ssh(&self.full(&plan.path), p.size, no_clobber).await?;
                Ok((CheckStatus::Ok, None))
            }
            SecretKind::Rsa(p) => {
                self.store.gen_rsa(&self.full(&plan.path), p.size, no_clobber).await?;
                Ok((CheckStatus::Ok, None))
            }
            SecretKind::DhParams(p) => {
                self.store
                    .gen_dhparams(&self.full(&plan.path), p.size, no_clobber)
                    .await?;
                Ok((CheckStatus::Ok, None))
            }
            SecretKind::Random(p) => {
                let (path, key) = self.keyed(plan)?;
                self.store
                    .gen_random(&path, &key, p.size, p.valid_chars.as_deref(), no_clobber)
                    .await?;
                if let (Some(format), Some(dest)) = (&p.format, p.formatted_key(&key)) {
                    self.store
                        .format_value(&path, &key, format, &dest, no_clobber)
                        .await?;
                }
                Ok((CheckStatus::Ok, None))
            }
            SecretKind::Uuid(p) => {
                let (path, key) = self.keyed(plan)?;
                if no_clobber && self.store.has(&path, Some(&key)).await? {
                    return Ok((CheckStatus::Ok, Some("skipped".to_string())));
                }
                let value = match p.deterministic_value()? {
                    Some(v) => v,
                    None => match p.version {
                        genesis_types::UuidVersion::V1 => {
                            Uuid::now_v1(b"gnesis").to_string()
                        }
                        _ => Uuid::new_v4().to_string(),
                    },
                };
                self.store.set(&path, &key, &value, no_clobber).await?;
                Ok((CheckStatus::Ok, None))
            }
            SecretKind::Provided(p) => {
                let (path, key) = self.keyed(plan)?;
                if self.store.has(&path, Some(&key)).await? && no_clobber {
                    return Ok((CheckStatus::Ok, Some("skipped".to_string())));
                }
                let value = if p.multiline {
                    self.sink.prompt_multiline(&p.prompt)?
                } else {
                    self.sink.prompt(&p.prompt, p.sensitive)?
                };
                self.store.set(&path, &key, &value, false).await?;
                Ok((CheckStatus::Ok, None))
            }
            SecretKind::Invalid(_) => unreachable!("error plans are reported before dispatch"),
        }
    }

    async fn renew(&mut self, plan: &Plan) -> Result<(CheckStatus, Option<String>)> {
        let SecretKind::X509(x) = &plan.kind else {
            unreachable!("renew runs over x509 plans only");
        };

        let signer = match (&x.signed_by, x.signed_by_abs_path) {
            (Some(s), true) => Some(s.clone()),
            (Some(s), false) => Some(self.full(s)),
            (None, _) => None,
        };
        let subject = if self.opts.renew_subject {
            x.names.first().map(String::as_str)
        } else {
            None
        };

        let report = self
            .store
            .renew_x509(&self.full(&plan.path), signer.as_deref(), subject)
            .await?;

        match parse_renewal_expiry(&report) {
            Some(expiry) => {
                let days = genesis_core::time::days_until(expiry);
                Ok((CheckStatus::Ok, Some(format!("expires in {} days", days))))
            }
            None => Ok((
                CheckStatus::Warn,
                Some("renewed, but the new expiry was not reported".to_string()),
            )),
        }
    }

    async fn remove(&mut self, plan: &Plan) -> Result<(CheckStatus, Option<String>)> {
        match &plan.kind {
            SecretKind::Random(p) => {
                let (path, key) = self.keyed(plan)?;
                self.store.delete_key(&path, &key).await?;
                if let Some(dest) = p.formatted_key(&key) {
                    self.store.delete_key(&path, &dest).await?;
                }
            }
            SecretKind::Uuid(_) | SecretKind::Provided(_) => {
                let (path, key) = self.keyed(plan)?;
                self.store.delete_key(&path, &key).await?;
            }
            _ => {
                self.store.delete(&self.full(&plan.path)).await?;
            }
        }
        Ok((CheckStatus::Ok, None))
    }
}

/// Pull the new expiry out of a store renewal report
/// (`Renewed … expiry set to <DATE>`).
fn parse_renewal_expiry(report: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let regex = regex::Regex::new(r"(?m)^Renewed\b.*\bexpiry set to (.+?)\s*$").ok()?;
    let captures = regex.captures(report)?;
    genesis_core::time::parse_expiry(captures.get(1)?.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_kit_secrets;
    use crate::progress::BufferedSink;
    use crate::resolver::{resolve, ResolveOptions};
    use genesis_kit::KitMetadata;
    use genesis_vault::MemoryStore;

    const BASE: &str = "secret/us/west/sandbox/shield/";

    fn plan_set(yaml: &str) -> PlanSet {
        let kit =
            KitMetadata::from_yaml(&format!("name: t\nversion: 0.0.1\n{}", yaml)).unwrap();
        let plans = parse_kit_secrets(&kit.secrets, &["base".to_string()]);
        resolve(plans, &ResolveOptions::default()).unwrap()
    }

    fn opts() -> ExecutorOptions {
        ExecutorOptions {
            base: BASE.to_string(),
            no_prompt: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let set = plan_set(
            "credentials:\n  base:\n    crazy/thing:\n      id: random 32 fixed\n      token: random 16\n    work/signing_key: rsa 2048\n",
        );
        let store = MemoryStore::new();
        let mut sink = BufferedSink::new();

        let summary = Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Add, &set)
            .await
            .unwrap();
        assert_eq!(summary.ok, 3);

        store.clear_mutations();
        Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Add, &set)
            .await
            .unwrap();
        assert!(
            store.mutations().is_empty(),
            "second add mutated the store: {:?}",
            store.mutations()
        );
    }

    #[tokio::test]
    async fn test_recreate_honors_fixed() {
        let set = plan_set(
            "credentials:\n  base:\n    crazy/thing:\n      id: random 32 fixed\n      token: random 16\n",
        );
        let store = MemoryStore::new();
        let mut sink = BufferedSink::new();

        Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Add, &set)
            .await
            .unwrap();
        let id_before = store.get_key(&format!("{}crazy/thing", BASE), "id").await.unwrap();
        let token_before =
            store.get_key(&format!("{}crazy/thing", BASE), "token").await.unwrap();

        Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Recreate, &set)
            .await
            .unwrap();

        let id_after = store.get_key(&format!("{}crazy/thing", BASE), "id").await.unwrap();
        let token_after =
            store.get_key(&format!("{}crazy/thing", BASE), "token").await.unwrap();

        assert_eq!(id_before, id_after, "fixed value must be preserved");
        assert_ne!(token_before, token_after, "non-fixed value must rotate");
    }

    #[tokio::test]
    async fn test_uuid_v5_is_stable_across_adds() {
        let set = plan_set(
            "credentials:\n  base:\n    ids/thing:\n      id: uuid v5 namespace dns name foo.example\n",
        );
        let store = MemoryStore::new();
        let mut sink = BufferedSink::new();

        Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Add, &set)
            .await
            .unwrap();
        let first = store.get_key(&format!("{}ids/thing", BASE), "id").await.unwrap();

        Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Recreate, &set)
            .await
            .unwrap();
        let second = store.get_key(&format!("{}ids/thing", BASE), "id").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_remove_deletes_formatted_sibling() {
        let set = plan_set(
            "credentials:\n  base:\n    crazy/thing:\n      token: random 16 fmt base64 at token-b64\n",
        );
        let store = MemoryStore::new();
        let mut sink = BufferedSink::new();

        Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Add, &set)
            .await
            .unwrap();
        let path = format!("{}crazy/thing", BASE);
        assert!(store.has(&path, Some("token")).await.unwrap());
        assert!(store.has(&path, Some("token-b64")).await.unwrap());

        Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Remove, &set)
            .await
            .unwrap();
        assert!(!store.has(&path, Some("token")).await.unwrap());
        assert!(!store.has(&path, Some("token-b64")).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_issues_certificate_chain() {
        let set = plan_set(
            "certificates:\n  base:\n    my-cert:\n      ca: { is_ca: true }\n      server: { names: [srv.example] }\n",
        );
        let store = MemoryStore::new();
        let mut sink = BufferedSink::new();

        Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Add, &set)
            .await
            .unwrap();

        let ca = format!("{}my-cert/ca", BASE);
        let server = format!("{}my-cert/server", BASE);
        assert!(store.has(&ca, Some("certificate")).await.unwrap());
        assert!(store.has(&server, Some("certificate")).await.unwrap());
        assert!(store.verify_signage(&server, &ca).await.unwrap());
    }

    #[tokio::test]
    async fn test_renew_reports_remaining_days() {
        let set = plan_set(
            "certificates:\n  base:\n    my-cert:\n      ca: { is_ca: true }\n      server: { names: [srv.example], valid_for: 90d }\n",
        );
        let store = MemoryStore::new();
        let mut sink = BufferedSink::new();

        Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Add, &set)
            .await
            .unwrap();
        Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Renew, &set)
            .await
            .unwrap();

        assert!(sink.events.iter().any(|e| e.contains("expires in")));
    }

    #[tokio::test]
    async fn test_renew_silently_filters_non_certificates() {
        let set = plan_set("credentials:\n  base:\n    work/signing_key: rsa 2048\n");
        let store = MemoryStore::new();
        let mut sink = BufferedSink::new();

        let summary = Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Renew, &set)
            .await
            .unwrap();
        assert_eq!(summary.total(), 0);
        assert!(sink.saw("empty"));
    }

    #[tokio::test]
    async fn test_provided_prompts_then_skips_when_present() {
        let set = plan_set(
            "provided:\n  base:\n    creds/manual:\n      type: generic\n      keys:\n        license: { prompt: License key }\n",
        );
        let store = MemoryStore::new();

        let mut sink = BufferedSink::with_answers(vec!["SECRET-LICENSE"]);
        Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Add, &set)
            .await
            .unwrap();
        assert_eq!(
            store
                .get_key(&format!("{}creds/manual", BASE), "license")
                .await
                .unwrap()
                .unwrap(),
            "SECRET-LICENSE"
        );

        // all target keys present: no prompt on the second add
        let mut sink = BufferedSink::new();
        let summary = Executor::new(&store, &mut sink, opts())
            .run(SecretAction::Add, &set)
            .await
            .unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(!sink.saw("prompt"));
    }

    #[tokio::test]
    async fn test_interactive_quit_aborts_remainder() {
        let set = plan_set(
            "credentials:\n  base:\n    a/key: rsa 2048\n    b/key: rsa 2048\n    c/key: rsa 2048\n",
        );
        let store = MemoryStore::new();
        let mut sink = BufferedSink::with_answers(vec!["y", "q"]);
        let options = ExecutorOptions {
            interactive: true,
            ..opts()
        };

        let summary = Executor::new(&store, &mut sink, options)
            .run(SecretAction::Add, &set)
            .await
            .unwrap();

        assert!(summary.aborted);
        assert_eq!(summary.ok, 1);
        assert_eq!(summary.skipped, 2);
        assert!(!store.has(&format!("{}c/key", BASE), None).await.unwrap());
    }

    #[tokio::test]
    async fn test_declined_confirmation_aborts() {
        let set = plan_set("credentials:\n  base:\n    a/key: rsa 2048\n");
        let store = MemoryStore::new();
        let mut sink = BufferedSink::with_answers(vec!["n"]);
        let options = ExecutorOptions {
            base: BASE.to_string(),
            no_prompt: false,
            ..Default::default()
        };

        let err = Executor::new(&store, &mut sink, options)
            .run(SecretAction::Remove, &set)
            .await
            .unwrap_err();
        assert!(matches!(err, GenesisError::Abort(_)));
    }

    #[test]
    fn test_parse_renewal_expiry() {
        let report = "Renewed x509 certificate at secret/x - expiry set to 2033-01-15T00:00:00+00:00\n";
        assert!(parse_renewal_expiry(report).is_some());
        assert!(parse_renewal_expiry("nothing here").is_none());
    }
}
