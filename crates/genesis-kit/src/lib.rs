//! # Genesis Kit
//!
//! Kit metadata handling: parsing and validating `kit.yml`, including the
//! declarative secret groupings (`certificates`, `credentials`, `provided`)
//! the secret lifecycle engine consumes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod metadata;

pub use metadata::{FeatureMetadata, KitMetadata, SecretsMetadata};
