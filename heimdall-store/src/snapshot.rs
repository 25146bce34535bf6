//! Serializable snapshot of monitor state.

use chrono::{DateTime, Utc};
use heimdall_alerts::Alert;
use heimdall_causal::CausalNodeSnapshot;
use heimdall_primitives::AgentName;
use heimdall_protocol::{BreakerState, QuarantineEntry, RemediationInstruction};
use serde::{Deserialize, Serialize};

/// One agent's breaker state at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerEntry {
    /// Agent the breaker guards.
    pub agent: AgentName,
    /// Breaker state at capture time.
    pub state: BreakerState,
}

/// One quarantined agent at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinedAgent {
    /// The held agent.
    pub agent: AgentName,
    /// The quarantine record.
    pub entry: QuarantineEntry,
}

/// Point-in-time capture of all durable monitor state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    /// When the snapshot was captured.
    pub captured_at: DateTime<Utc>,
    /// Breaker states per known agent.
    #[serde(default)]
    pub breakers: Vec<BreakerEntry>,
    /// Quarantined agents.
    #[serde(default)]
    pub quarantined: Vec<QuarantinedAgent>,
    /// Causal graph nodes.
    #[serde(default)]
    pub causal_nodes: Vec<CausalNodeSnapshot>,
    /// Alerts that were active at capture time.
    #[serde(default)]
    pub active_alerts: Vec<Alert>,
    /// Remediation instructions not yet drained.
    #[serde(default)]
    pub pending_remediation: Vec<RemediationInstruction>,
}

impl MonitorSnapshot {
    /// Creates an empty snapshot stamped now.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            captured_at: Utc::now(),
            breakers: Vec::new(),
            quarantined: Vec::new(),
            causal_nodes: Vec::new(),
            active_alerts: Vec::new(),
            pending_remediation: Vec::new(),
        }
    }
}
