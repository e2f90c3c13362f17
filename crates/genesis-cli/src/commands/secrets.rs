//! Secret management commands.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use genesis_core::config::RuntimeConfig;
use genesis_core::term::{colorize, status_glyph};
use genesis_env::Environment;
use genesis_kit::KitMetadata;
use genesis_secrets::executor::{Executor, ExecutorOptions};
use genesis_secrets::filter::apply_filters;
use genesis_secrets::plan::PlanSet;
use genesis_secrets::progress::Summary;
use genesis_secrets::resolver::{resolve, ResolveOptions};
use genesis_secrets::validator::{Validator, ValidatorOptions};
use genesis_secrets::parse_kit_secrets;
use genesis_types::{CheckStatus, SecretAction, SecretStore, StoreConfig, StoreStatus};
use genesis_vault::{SafeClient, StoreRegistry};
use std::path::Path;
use std::sync::Arc;

use crate::ui::TerminalSink;

/// Everything a secrets subcommand needs, assembled once.
pub struct SecretsRun {
    pub env: Environment,
    pub set: PlanSet,
    pub base: String,
    pub registry: StoreRegistry,
    pub config: RuntimeConfig,
}

impl SecretsRun {
    pub async fn prepare(env_name: &str, vault: Option<&str>, filters: &[String]) -> Result<Self> {
        let config = RuntimeConfig::from_env();

        let env_file = format!("{}.yml", env_name);
        let env = Environment::load(&env_file)
            .with_context(|| format!("Failed to load environment '{}'", env_name))?;

        let kit_yml = Path::new(".genesis")
            .join("kits")
            .join(&env.kit.name)
            .join("kit.yml");
        let kit = KitMetadata::load(&kit_yml)
            .with_context(|| format!("Failed to load kit '{}'", env.kit.name))?;
        kit.validate().context("Invalid kit metadata")?;

        let features = env.features();
        kit.validate_features(&features)
            .context("Invalid feature selection")?;

        let plans = parse_kit_secrets(&kit.secrets, &features);
        let resolve_opts = ResolveOptions {
            root_ca_path: env.root_ca_path().map(String::from),
            validate: true,
        };
        let set = resolve(plans, &resolve_opts).context("Failed to resolve secret plans")?;

        let selected = apply_filters(&set, filters).context("Bad secret path filter")?;
        let set = set.narrowed(&selected.iter().map(String::as_str).collect::<Vec<_>>());

        let url = vault
            .map(String::from)
            .or_else(|| std::env::var("VAULT_ADDR").ok())
            .context("No vault target: pass --vault or set VAULT_ADDR")?;
        let store_config = StoreConfig {
            url,
            mount: config.secrets_mount.clone(),
            ..Default::default()
        };
        let client = SafeClient::new(store_config)?;
        client.authenticate().await.context("Vault authentication failed")?;

        match client.status().await? {
            StoreStatus::Ok => {}
            StoreStatus::Unreachable => bail!("Vault at {} is unreachable", client.config().url),
            StoreStatus::Uninitialized => bail!("Vault at {} is not initialized", client.config().url),
            StoreStatus::Sealed => bail!("Vault at {} is sealed", client.config().url),
            StoreStatus::Unauthenticated => {
                bail!("Not authenticated to vault at {}", client.config().url)
            }
        }

        let base = env.secrets_base(&config.secrets_mount);
        let mut registry = StoreRegistry::new();
        registry.register(Arc::new(client));

        Ok(Self {
            env,
            set,
            base,
            registry,
            config,
        })
    }

    fn executor_options(&self, interactive: bool, no_prompt: bool) -> ExecutorOptions {
        ExecutorOptions {
            base: self.base.clone(),
            interactive,
            no_prompt,
            renew_subject: self.config.renew_subject.is_some(),
        }
    }
}

async fn run_action(
    env_name: &str,
    vault: Option<&str>,
    filters: &[String],
    action: SecretAction,
    interactive: bool,
    no_prompt: bool,
    quiet: bool,
) -> Result<Summary> {
    let run = SecretsRun::prepare(env_name, vault, filters).await?;

    println!(
        "{}",
        colorize(&format!(
            "#G{{{}}} secrets for #C{{{}}} under #C{{{}}}",
            action,
            run.env.name(),
            run.base
        ))
    );

    let store = run.registry.default_store()?;
    let mut sink = TerminalSink::new(quiet);
    let summary = Executor::new(store.as_ref(), &mut sink, run.executor_options(interactive, no_prompt))
        .run(action, &run.set)
        .await?;

    Ok(summary)
}

pub async fn add(
    env_name: &str,
    vault: Option<&str>,
    filters: &[String],
    interactive: bool,
    quiet: bool,
) -> Result<i32> {
    let summary =
        run_action(env_name, vault, filters, SecretAction::Add, interactive, true, quiet).await?;
    Ok(summary.exit_code())
}

pub async fn rotate(
    env_name: &str,
    vault: Option<&str>,
    filters: &[String],
    yes: bool,
    interactive: bool,
    quiet: bool,
) -> Result<i32> {
    let summary = run_action(
        env_name,
        vault,
        filters,
        SecretAction::Recreate,
        interactive,
        yes,
        quiet,
    )
    .await?;
    Ok(summary.exit_code())
}

pub async fn renew(
    env_name: &str,
    vault: Option<&str>,
    filters: &[String],
    interactive: bool,
    quiet: bool,
) -> Result<i32> {
    let summary = run_action(
        env_name,
        vault,
        filters,
        SecretAction::Renew,
        interactive,
        true,
        quiet,
    )
    .await?;
    Ok(summary.exit_code())
}

pub async fn remove(
    env_name: &str,
    vault: Option<&str>,
    filters: &[String],
    yes: bool,
    interactive: bool,
    quiet: bool,
) -> Result<i32> {
    let summary = run_action(
        env_name,
        vault,
        filters,
        SecretAction::Remove,
        interactive,
        yes,
        quiet,
    )
    .await?;
    Ok(summary.exit_code())
}

pub async fn check(
    env_name: &str,
    vault: Option<&str>,
    filters: &[String],
    validate: bool,
    quiet: bool,
) -> Result<i32> {
    let run = SecretsRun::prepare(env_name, vault, filters).await?;

    let verb = if validate { "Validating" } else { "Checking" };
    println!(
        "{}",
        colorize(&format!(
            "#G{{{}}} secrets for #C{{{}}} under #C{{{}}}",
            verb,
            run.env.name(),
            run.base
        ))
    );

    let store = run.registry.default_store()?;
    let mut sink = TerminalSink::new(quiet);
    let options = ValidatorOptions {
        base: run.base.clone(),
        root_ca_path: run.env.root_ca_path().map(String::from),
        hide_problematic: run.config.hide_problematic,
        presence_only: !validate,
    };
    let report = Validator::new(store.as_ref(), &mut sink, options)
        .validate(&run.set)
        .await?;

    if !quiet {
        for plan_report in &report.reports {
            if plan_report.status == CheckStatus::Ok {
                continue;
            }
            println!(
                "\n{} {}",
                plan_report.path.cyan(),
                plan_report.status.to_string().red()
            );
            for check in plan_report.visible_checks(run.config.hide_problematic) {
                println!("    {}: {} - {}", check.name, check.status, check.msg);
            }
        }
    }

    if report.failed() {
        println!("\n{} Some secrets are missing or invalid", status_glyph(false));
        Ok(1)
    } else {
        println!("\n{} All secrets are valid", status_glyph(true));
        Ok(0)
    }
}
