//! # Genesis Secrets
//!
//! The secret lifecycle engine: parses a kit's declarative secret
//! descriptions for an enabled feature set, computes a build order honoring
//! CA signing dependencies, drives a secret store through idempotent
//! `add / recreate / renew / remove` operations, and validates existing
//! secrets against their declared intent.
//!
//! Secret kinds:
//! - X509 certificates (CA, self-signed, signed)
//! - SSH keys
//! - RSA keys
//! - DH parameters
//! - Random passwords
//! - UUIDs
//! - Operator-provided secrets

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod plan;
pub mod parser;
pub mod resolver;
pub mod filter;
pub mod progress;
pub mod executor;
pub mod validator;

pub use executor::{Executor, ExecutorOptions};
pub use filter::apply_filters;
pub use parser::parse_kit_secrets;
pub use plan::{Plan, PlanSet};
pub use progress::{BufferedSink, ProgressEvent, ProgressSink, Summary};
pub use resolver::{resolve, ResolveOptions};
pub use types::SecretKind;
pub use validator::{PlanReport, ValidationReport, Validator, ValidatorOptions};
