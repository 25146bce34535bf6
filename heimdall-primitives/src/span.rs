//! Telemetry span records describing one monitored agent operation.

use std::fmt::{self, Display, Formatter};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{AgentName, Error, Result};

/// Unique identifier for a telemetry span.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpanId(Uuid);

impl SpanId {
    /// Generates a random span identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::random()
    }
}

impl Display for SpanId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Terminal outcome of a monitored operation.
///
/// The three variants partition every recorded operation: a span is exactly
/// one of success, error, or timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationOutcome {
    /// Operation completed normally.
    Success,
    /// Operation failed with an error.
    Error,
    /// Operation exceeded its deadline.
    Timeout,
}

impl OperationOutcome {
    /// Returns `true` when the outcome counts as a failure for gating
    /// purposes (errors and timeouts both do).
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Error | Self::Timeout)
    }
}

/// Immutable record of one agent operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySpan {
    id: SpanId,
    agent: AgentName,
    operation: String,
    started: SystemTime,
    ended: SystemTime,
    outcome: OperationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
}

impl TelemetrySpan {
    /// Creates a builder for a new span covering the named operation.
    #[must_use]
    pub fn builder(agent: AgentName, operation: impl Into<String>) -> TelemetrySpanBuilder {
        TelemetrySpanBuilder {
            id: SpanId::random(),
            agent,
            operation: operation.into(),
            started: SystemTime::now(),
            ended: None,
            outcome: OperationOutcome::Success,
            detail: None,
            metadata: Map::new(),
        }
    }

    /// Returns the unique span identifier.
    #[must_use]
    pub fn id(&self) -> SpanId {
        self.id
    }

    /// Returns the agent that produced the span.
    #[must_use]
    pub fn agent(&self) -> &AgentName {
        &self.agent
    }

    /// Returns the operation name.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Returns the start timestamp.
    #[must_use]
    pub fn started(&self) -> SystemTime {
        self.started
    }

    /// Returns the end timestamp.
    #[must_use]
    pub fn ended(&self) -> SystemTime {
        self.ended
    }

    /// Returns the recorded outcome.
    #[must_use]
    pub fn outcome(&self) -> OperationOutcome {
        self.outcome
    }

    /// Returns the optional human-readable detail string.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the free-form metadata map.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns the operation latency derived from the span bounds.
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.ended.duration_since(self.started).unwrap_or_default()
    }
}

/// Builder used to assemble [`TelemetrySpan`] instances safely.
#[derive(Debug)]
pub struct TelemetrySpanBuilder {
    id: SpanId,
    agent: AgentName,
    operation: String,
    started: SystemTime,
    ended: Option<SystemTime>,
    outcome: OperationOutcome,
    detail: Option<String>,
    metadata: Map<String, Value>,
}

impl TelemetrySpanBuilder {
    /// Overrides the start timestamp (defaults to builder creation time).
    #[must_use]
    pub fn started_at(mut self, started: SystemTime) -> Self {
        self.started = started;
        self
    }

    /// Sets the end timestamp (defaults to `build` time).
    #[must_use]
    pub fn ended_at(mut self, ended: SystemTime) -> Self {
        self.ended = Some(ended);
        self
    }

    /// Sets the outcome (defaults to [`OperationOutcome::Success`]).
    #[must_use]
    pub fn outcome(mut self, outcome: OperationOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Attaches a detail string, typically an error message.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Inserts a metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Finalizes the span.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSpan`] when the operation name is empty or the
    /// end timestamp precedes the start timestamp.
    pub fn build(self) -> Result<TelemetrySpan> {
        if self.operation.trim().is_empty() {
            return Err(Error::InvalidSpan {
                reason: "operation name must not be empty",
            });
        }

        let ended = self.ended.unwrap_or_else(SystemTime::now);
        if ended < self.started {
            return Err(Error::InvalidSpan {
                reason: "span end precedes span start",
            });
        }

        Ok(TelemetrySpan {
            id: self.id,
            agent: self.agent,
            operation: self.operation,
            started: self.started,
            ended,
            outcome: self.outcome,
            detail: self.detail,
            metadata: self.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> AgentName {
        AgentName::new("odin").unwrap()
    }

    #[test]
    fn builder_produces_span_with_latency() {
        let started = SystemTime::now();
        let span = TelemetrySpan::builder(agent(), "sync_memory")
            .started_at(started)
            .ended_at(started + Duration::from_millis(250))
            .outcome(OperationOutcome::Success)
            .build()
            .unwrap();

        assert_eq!(span.operation(), "sync_memory");
        assert_eq!(span.latency(), Duration::from_millis(250));
        assert!(!span.outcome().is_failure());
    }

    #[test]
    fn rejects_empty_operation() {
        let err = TelemetrySpan::builder(agent(), "  ").build();
        assert!(err.is_err());
    }

    #[test]
    fn rejects_end_before_start() {
        let started = SystemTime::now();
        let result = TelemetrySpan::builder(agent(), "op")
            .started_at(started)
            .ended_at(started - Duration::from_secs(1))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn errors_and_timeouts_are_failures() {
        assert!(OperationOutcome::Error.is_failure());
        assert!(OperationOutcome::Timeout.is_failure());
        assert!(!OperationOutcome::Success.is_failure());
    }

    #[test]
    fn serializes_outcome_snake_case() {
        let json = serde_json::to_string(&OperationOutcome::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
    }
}
