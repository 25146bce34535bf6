//! BifrostWatch: per-agent telemetry span buffers and health scoring.
//!
//! Spans are retained in bounded per-agent ring buffers; health is always
//! recomputed from the retained spans inside the scoring window, never
//! cached.

#![warn(missing_docs, clippy::pedantic)]

mod config;
mod health;
mod watch;

pub use config::{StatusThresholds, WatchConfig};
pub use health::{AgentHealth, HealthStatus};
pub use watch::BifrostWatch;

use thiserror::Error;

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors surfaced by the telemetry watch.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Watch configuration was invalid.
    #[error("invalid watch configuration: {0}")]
    InvalidConfig(&'static str),
    /// Cognitive integrity values must lie in `[0, 1]`.
    #[error("cognitive integrity {value} outside [0, 1]")]
    InvalidIntegrity {
        /// The rejected value.
        value: f64,
    },
}
