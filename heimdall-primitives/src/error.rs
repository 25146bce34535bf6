//! Shared error definitions for monitoring primitives.

use thiserror::Error;

/// Result alias used throughout the monitoring runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing monitoring primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent name failed validation.
    #[error("invalid agent name `{name}`: {reason}")]
    InvalidAgentName {
        /// The offending name as supplied by the caller.
        name: String,
        /// Human-readable reason for rejection.
        reason: &'static str,
    },

    /// Telemetry span failed validation.
    #[error("invalid telemetry span: {reason}")]
    InvalidSpan {
        /// Human-readable reason for rejection.
        reason: &'static str,
    },
}
