//! Terminal user-interface components.

pub mod progress;

pub use progress::TerminalSink;
