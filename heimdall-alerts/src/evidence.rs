//! Evidence records fed to the alert engine.

use std::collections::BTreeMap;
use std::time::SystemTime;

use heimdall_primitives::{AgentName, OperationOutcome};
use serde::{Deserialize, Serialize};

/// One observation considered during rule evaluation.
///
/// Evidence is typically derived from a telemetry span plus the health
/// figures current at the time it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    agent: AgentName,
    outcome: OperationOutcome,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    observed_at: SystemTime,
}

impl Evidence {
    /// Creates evidence for the given agent and outcome, stamped now.
    #[must_use]
    pub fn new(agent: AgentName, outcome: OperationOutcome) -> Self {
        Self {
            agent,
            outcome,
            metrics: BTreeMap::new(),
            detail: None,
            observed_at: SystemTime::now(),
        }
    }

    /// Attaches a named numeric metric.
    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Attaches a detail string (error message, log excerpt).
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Overrides the observation timestamp.
    #[must_use]
    pub fn observed_at(mut self, at: SystemTime) -> Self {
        self.observed_at = at;
        self
    }

    /// Returns the agent the observation concerns.
    #[must_use]
    pub fn agent(&self) -> &AgentName {
        &self.agent
    }

    /// Returns the recorded outcome.
    #[must_use]
    pub fn outcome(&self) -> OperationOutcome {
        self.outcome
    }

    /// Returns the named metric, if present.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Returns all metrics.
    #[must_use]
    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    /// Returns the detail string, if present.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns when the observation was made.
    #[must_use]
    pub fn when(&self) -> SystemTime {
        self.observed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_metrics_and_detail() {
        let evidence = Evidence::new(
            AgentName::new("odin").unwrap(),
            OperationOutcome::Error,
        )
        .with_metric("error_rate", 0.4)
        .with_detail("connection refused");

        assert_eq!(evidence.metric("error_rate"), Some(0.4));
        assert_eq!(evidence.metric("latency"), None);
        assert_eq!(evidence.detail(), Some("connection refused"));
    }
}
