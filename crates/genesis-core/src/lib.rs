//! # Genesis Core
//!
//! Core utilities, configuration management, logging, and common
//! functionality for the Genesis secret lifecycle engine.
//!
//! This crate provides:
//!
//! - **Configuration**: Runtime settings sourced from the environment, plus
//!   a typed `${VAR}` reference resolver for metadata values
//! - **Logging**: Structured logging built on tracing
//! - **Terminal**: Colored output, terminal detection, formatting
//! - **Process Execution**: Safe argv-only command execution, including
//!   stdin-fed pipelines for the TLS toolchain
//! - **File Operations**: YAML handling, path utilities, scratch files
//! - **Time Utilities**: TTL parsing, expiry math

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod log;
pub mod term;
pub mod time;
pub mod util;

// Re-export commonly used items
pub use config::RuntimeConfig;
pub use genesis_types::{GenesisError, Result};

/// Genesis application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Genesis application name
pub const APP_NAME: &str = "genesis";
