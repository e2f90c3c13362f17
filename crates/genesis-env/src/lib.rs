//! # Genesis Environment
//!
//! Environment file handling: name, kit selection, enabled features, and the
//! vault prefix all of the environment's secrets live under.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod environment;

pub use environment::Environment;
