//! Tracing and logging setup shared by the binaries.

/// Subscriber initialization (filters, formatters).
pub mod tracing;

pub use self::tracing::{LogConfig, LogFormat, init};
