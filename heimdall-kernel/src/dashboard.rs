//! Wire representation of the monitor dashboard.

use chrono::{DateTime, Utc};
use heimdall_alerts::Alert;
use heimdall_causal::CausalNodeSnapshot;
use heimdall_drift::DriftAssessment;
use heimdall_protocol::RemediationInstruction;
use heimdall_store::{BreakerEntry, QuarantinedAgent};
use heimdall_telemetry::AgentHealth;
use serde::{Deserialize, Serialize};

use crate::HeimdallKernel;

/// Number of causal nodes surfaced as top risks.
const TOP_RISKS: usize = 10;

/// Point-in-time view of the whole monitor, serialized for the admin
/// surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// When this view was assembled.
    pub generated_at: DateTime<Utc>,
    /// Health of every agent seen in the scoring window, sorted by name.
    pub agents: Vec<AgentHealth>,
    /// Circuit breaker state per agent, sorted by name.
    pub breakers: Vec<BreakerEntry>,
    /// Agents currently quarantined, sorted by name.
    pub quarantined: Vec<QuarantinedAgent>,
    /// Alerts that have fired and are not yet resolved.
    pub active_alerts: Vec<Alert>,
    /// Highest failure-probability operations, most likely first.
    pub top_risks: Vec<CausalNodeSnapshot>,
    /// Drift assessments for every observed messaging pair.
    pub drift: Vec<DriftAssessment>,
    /// Remediation instructions awaiting an operator.
    pub pending_remediation: Vec<RemediationInstruction>,
}

pub(crate) async fn build(kernel: &HeimdallKernel) -> DashboardSnapshot {
    let mut top_risks = kernel.causal().snapshot().await;
    top_risks.truncate(TOP_RISKS);

    DashboardSnapshot {
        generated_at: Utc::now(),
        agents: kernel.watch().health_report().await,
        breakers: kernel
            .protocol()
            .breaker_states()
            .await
            .into_iter()
            .map(|(agent, state)| BreakerEntry { agent, state })
            .collect(),
        quarantined: kernel
            .protocol()
            .quarantined()
            .await
            .into_iter()
            .map(|(agent, entry)| QuarantinedAgent { agent, entry })
            .collect(),
        active_alerts: kernel.alerts().active_alerts().await,
        top_risks,
        drift: kernel.drift().assess_all().await,
        pending_remediation: kernel.protocol().pending_remediation().await,
    }
}
