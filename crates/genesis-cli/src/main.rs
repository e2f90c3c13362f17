//! Genesis CLI entry point.

mod cli;
mod commands;
mod ui;

use clap::Parser;
use cli::{Cli, Commands};
use genesis_types::{GenesisError, LogLevel};

/// Exit codes: 0 full success, 1 error-level outcome or aborted
/// confirmation, 2 usage or parse errors (clap uses 2 on its own).
fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<GenesisError>() {
        Some(
            GenesisError::Config(_)
            | GenesisError::Environment(_)
            | GenesisError::Kit(_)
            | GenesisError::Filter(_)
            | GenesisError::Secret(_),
        ) => 2,
        _ => 1,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.debug {
        LogLevel::Debug
    } else if cli.verbose {
        LogLevel::Info
    } else {
        LogLevel::Warn
    };
    let _ = genesis_core::log::init_with_level(level);

    let vault = cli.vault.as_deref();
    let quiet = cli.quiet;

    let result = match &cli.command {
        Commands::AddSecrets { env, interactive, filters } => {
            commands::secrets::add(env, vault, filters, *interactive, quiet).await
        }
        Commands::RotateSecrets { env, yes, interactive, filters } => {
            commands::secrets::rotate(env, vault, filters, *yes, *interactive, quiet).await
        }
        Commands::RenewSecrets { env, interactive, filters } => {
            commands::secrets::renew(env, vault, filters, *interactive, quiet).await
        }
        Commands::RemoveSecrets { env, yes, interactive, filters } => {
            commands::secrets::remove(env, vault, filters, *yes, *interactive, quiet).await
        }
        Commands::CheckSecrets { env, validate, filters } => {
            commands::secrets::check(env, vault, filters, *validate, quiet).await
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_code_for(&err));
        }
    }
}
