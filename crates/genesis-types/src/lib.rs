//! # Genesis Types
//!
//! Core types, traits, and enums shared across all Genesis crates.
//!
//! This crate provides the fundamental building blocks for the Genesis
//! secret lifecycle engine, including:
//!
//! - Type-safe wrappers for environment names, secret paths, and versions
//! - Common enums for secret types, lifecycle actions, check outcomes, and
//!   X.509 key-usage tokens
//! - The `SecretStore` trait and the `SecretSnapshot` it exports
//! - Error types and result aliases
//!
//! ## Example
//!
//! ```
//! use genesis_types::{EnvName, SecretPath};
//!
//! // Create a validated environment name
//! let env = EnvName::new("us-west-prod").unwrap();
//! assert_eq!(env.slug(), "us/west/prod");
//!
//! // Parse a keyed secret path
//! let path = SecretPath::parse("things/admin:password").unwrap();
//! assert_eq!(path.key(), Some("password"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod identifiers;
pub mod enums;
pub mod traits;
pub mod config;

// Re-export common types for convenience
pub use errors::{GenesisError, Result, StoreError};
pub use identifiers::{EnvName, SecretPath, SemVer};
pub use enums::{CheckStatus, KeyUsage, LogLevel, SecretAction, SecretType, StoreStatus, UuidVersion};
pub use traits::{SecretSnapshot, SecretStore, X509IssueSpec};
pub use config::StoreConfig;
