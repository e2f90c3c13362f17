//! Error types for Genesis operations.

use thiserror::Error;

/// Errors produced by a secret store backend.
///
/// Every store call can fail with one of these; the executor aborts the run
/// after reporting the current item, while the validator treats them as
/// best-effort failures on the affected plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store's address does not answer at the TCP level
    #[error("secret store unreachable: {0}")]
    Unreachable(String),

    /// The store is reachable but sealed
    #[error("secret store is sealed: {0}")]
    Sealed(String),

    /// No valid authentication for the store
    #[error("not authenticated to secret store: {0}")]
    Unauthenticated(String),

    /// The store has never been initialized
    #[error("secret store is not initialized: {0}")]
    Uninitialized(String),

    /// The requested path or key does not exist
    #[error("secret not found: {0}")]
    NotFound(String),

    /// The store answered, but not in the shape we expected
    #[error("secret store protocol error: {0}")]
    Protocol(String),
}

/// The main error type for Genesis operations.
///
/// This enum covers all major error categories that can occur during
/// Genesis operations, from configuration errors to secret lifecycle
/// failures.
#[derive(Error, Debug)]
pub enum GenesisError {
    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Environment-related error
    #[error("Environment error: {0}")]
    Environment(String),

    /// Kit-related error
    #[error("Kit error: {0}")]
    Kit(String),

    /// Malformed secret metadata (wrong YAML shape, unparseable cred-line,
    /// colon in path or key, unknown type)
    #[error("Secret error: {0}")]
    Secret(String),

    /// Cyclical or ambiguous CA signage
    #[error("Dependency error: {0}")]
    Dependency(String),

    /// Secret store operation error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An unparseable secret path filter
    #[error("Bad filter: {0}")]
    Filter(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operator declined a confirmation or quit an interactive run
    #[error("Aborted: {0}")]
    Abort(String),

    /// Interactive operation requested without a controlling terminal
    #[error("No controlling terminal: {0}")]
    NoTty(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal bug - should never happen in production
    #[error("Bug detected: {0}\n\nThis is an internal error. Please report this issue at:\nhttps://github.com/genesis-community/genesis-rs/issues")]
    Bug(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// A specialized Result type for Genesis operations.
pub type Result<T> = std::result::Result<T, GenesisError>;

impl GenesisError {
    /// Whether this error should terminate an executor run.
    ///
    /// Parse and validation failures are carried on plans instead of raised,
    /// so anything that reaches the executor as an `Err` is fatal except a
    /// store `NotFound`, which `remove` tolerates.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GenesisError::Store(StoreError::NotFound(_)))
    }
}

/// Helper macro to create and return a GenesisError::Bug
///
/// This should be used for conditions that should never occur
/// in normal operation and indicate a bug in Genesis itself.
///
/// # Example
///
/// ```ignore
/// if some_impossible_condition {
///     bug!("This should never happen: {:?}", condition);
/// }
/// ```
#[macro_export]
macro_rules! bug {
    ($msg:expr) => {
        return Err($crate::GenesisError::Bug($msg.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::GenesisError::Bug(format!($fmt, $($arg)*)))
    };
}

/// Helper macro to bail out with a GenesisError
///
/// This is used for expected error conditions.
///
/// # Example
///
/// ```ignore
/// if !valid {
///     bail!(Validation, "Invalid configuration: {}", reason);
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($variant:ident, $msg:expr) => {
        return Err($crate::GenesisError::$variant($msg.to_string()))
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::GenesisError::$variant(format!($fmt, $($arg)*)))
    };
    ($msg:expr) => {
        return Err($crate::GenesisError::Other($msg.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::GenesisError::Other(format!($fmt, $($arg)*)))
    };
}
