//! # Genesis Vault
//!
//! Secret store backends for the Genesis secret lifecycle engine:
//!
//! - [`SafeClient`] drives the external `safe` CLI against a pinned Vault
//!   target
//! - [`MemoryStore`] implements the same contract in-process for tests
//! - [`StoreRegistry`] tracks known stores explicitly, replacing any notion
//!   of a process-global "current target"

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod registry;
pub mod safe;

pub use memory::MemoryStore;
pub use registry::StoreRegistry;
pub use safe::SafeClient;
