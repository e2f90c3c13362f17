//! CLI structure and command definitions.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "genesis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "BOSH Deployment Lifecycle Manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Vault URL (defaults to VAULT_ADDR)
    #[arg(long, global = true)]
    pub vault: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate missing secrets for an environment
    #[command(name = "add-secrets")]
    AddSecrets {
        /// Environment name
        env: String,

        /// Confirm each secret individually
        #[arg(short, long)]
        interactive: bool,

        /// Narrow to matching secret paths (path, key=value, /regex/)
        filters: Vec<String>,
    },

    /// Regenerate secrets for an environment (fixed secrets are preserved)
    #[command(name = "rotate-secrets")]
    RotateSecrets {
        /// Environment name
        env: String,

        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,

        /// Confirm each secret individually
        #[arg(short, long)]
        interactive: bool,

        /// Narrow to matching secret paths (path, key=value, /regex/)
        filters: Vec<String>,
    },

    /// Renew certificates for an environment, extending their expiry
    #[command(name = "renew-secrets")]
    RenewSecrets {
        /// Environment name
        env: String,

        /// Confirm each certificate individually
        #[arg(short, long)]
        interactive: bool,

        /// Narrow to matching secret paths (path, key=value, /regex/)
        filters: Vec<String>,
    },

    /// Remove secrets for an environment
    #[command(name = "remove-secrets")]
    RemoveSecrets {
        /// Environment name
        env: String,

        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,

        /// Confirm each secret individually
        #[arg(short, long)]
        interactive: bool,

        /// Narrow to matching secret paths (path, key=value, /regex/)
        filters: Vec<String>,
    },

    /// Check secrets for an environment
    #[command(name = "check-secrets")]
    CheckSecrets {
        /// Environment name
        env: String,

        /// Fully validate contents instead of checking existence
        #[arg(long)]
        validate: bool,

        /// Narrow to matching secret paths (path, key=value, /regex/)
        filters: Vec<String>,
    },
}
