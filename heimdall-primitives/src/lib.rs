//! Core shared types for the HEIMDALL monitoring runtime.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod name;
mod span;

/// Error type and result alias shared across the runtime.
pub use error::{Error, Result};
/// Validated name of a monitored logical agent.
pub use name::AgentName;
/// Telemetry span record, outcome enum, and supporting builder.
pub use span::{OperationOutcome, SpanId, TelemetrySpan, TelemetrySpanBuilder};
