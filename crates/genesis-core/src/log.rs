//! Logging system for Genesis.
//!
//! Thin wrapper over tracing-subscriber; library crates emit `tracing`
//! events and the front-end picks the verbosity.

use genesis_types::{LogLevel, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system with default configuration.
pub fn init_default() -> Result<()> {
    init_with_level(LogLevel::Warn)
}

/// Initialize logging at an explicit level.
///
/// `RUST_LOG` overrides the requested level when set.
pub fn init_with_level(level: LogLevel) -> Result<()> {
    let directive = match level {
        LogLevel::None => "off",
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
