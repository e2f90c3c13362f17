//! Error plans carried through the pipeline for reporting.

/// A secret definition that failed to parse or resolve.
///
/// Kept in the plan set so the failure surfaces in reports instead of
/// crashing the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPlan {
    /// Human-readable diagnostic
    pub error: String,
}

impl InvalidPlan {
    /// Wrap a diagnostic.
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }

    /// Human summary.
    pub fn describe(&self) -> String {
        format!("invalid definition: {}", self.error)
    }
}
