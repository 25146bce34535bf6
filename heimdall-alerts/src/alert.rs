//! Triggered alert instances.

use std::fmt::{self, Display, Formatter};
use std::time::SystemTime;

use heimdall_primitives::AgentName;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::evidence::Evidence;
use crate::rule::AlertSeverity;

/// Unique identifier for a triggered alert.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(Uuid);

impl AlertId {
    /// Generates a random alert identifier.
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

impl Display for AlertId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Lifecycle status of an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AlertStatus {
    /// Alert is live and unhandled.
    Active,
    /// Alert has been explicitly resolved.
    Resolved {
        /// Operator-supplied resolution note.
        note: String,
        /// When resolution happened.
        at: SystemTime,
    },
}

/// A triggered instance of an alert rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    id: AlertId,
    rule_id: String,
    severity: AlertSeverity,
    message: String,
    evidence: Vec<Evidence>,
    #[serde(default)]
    implicated: Vec<AgentName>,
    status: AlertStatus,
    triggered_at: SystemTime,
}

impl Alert {
    pub(crate) fn fire(
        rule_id: impl Into<String>,
        severity: AlertSeverity,
        message: impl Into<String>,
        evidence: Vec<Evidence>,
        implicated: Vec<AgentName>,
        triggered_at: SystemTime,
    ) -> Self {
        Self {
            id: AlertId::random(),
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            evidence,
            implicated,
            status: AlertStatus::Active,
            triggered_at,
        }
    }

    /// Returns the alert identifier.
    #[must_use]
    pub fn id(&self) -> AlertId {
        self.id
    }

    /// Returns the id of the rule that fired.
    #[must_use]
    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    /// Returns the severity inherited from the rule.
    #[must_use]
    pub fn severity(&self) -> AlertSeverity {
        self.severity
    }

    /// Returns the rendered alert message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the evidence snapshot captured when the rule fired.
    #[must_use]
    pub fn evidence(&self) -> &[Evidence] {
        &self.evidence
    }

    /// Returns the agents whose evidence satisfied the rule's condition.
    #[must_use]
    pub fn implicated(&self) -> &[AgentName] {
        &self.implicated
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> &AlertStatus {
        &self.status
    }

    /// Returns `true` while the alert is unresolved.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    /// Returns when the rule fired.
    #[must_use]
    pub fn triggered_at(&self) -> SystemTime {
        self.triggered_at
    }

    pub(crate) fn mark_resolved(&mut self, note: String, at: SystemTime) {
        self.status = AlertStatus::Resolved { note, at };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fired_alert_starts_active() {
        let alert = Alert::fire(
            "rule-1",
            AlertSeverity::Critical,
            "agent loki failing",
            Vec::new(),
            Vec::new(),
            SystemTime::now(),
        );
        assert!(alert.is_active());
        assert_eq!(alert.rule_id(), "rule-1");
    }

    #[test]
    fn resolution_changes_status() {
        let mut alert = Alert::fire(
            "rule-1",
            AlertSeverity::Warning,
            "m",
            Vec::new(),
            Vec::new(),
            SystemTime::now(),
        );
        alert.mark_resolved("restarted".into(), SystemTime::now());
        assert!(!alert.is_active());
        assert!(matches!(alert.status(), AlertStatus::Resolved { .. }));
    }
}
