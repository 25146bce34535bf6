//! HEIMDALL monitor kernel.
//!
//! Wires the telemetry watch, alert engine, causal graph, drift watch, and
//! Gjallarhorn protocol into the three operations the platform consumes:
//! recording agent operations, gating them, and producing dashboard
//! snapshots.

#![warn(missing_docs, clippy::pedantic)]

mod dashboard;
mod flusher;

use std::collections::VecDeque;
use std::time::SystemTime;

use heimdall_alerts::{Alert, AlertId, AlertSeverity, Evidence, GjallarhornAlerts};
use heimdall_causal::CausalGraph;
use heimdall_config::MonitorConfig;
use heimdall_drift::{A2aMessage, A2aWatch, DriftAssessment};
use heimdall_primitives::{AgentName, TelemetrySpan};
use heimdall_protocol::{
    GateDecision, GjallarhornProtocol, QuarantineEntry, RemediationInstruction,
};
use heimdall_store::{BreakerEntry, MonitorSnapshot, QuarantinedAgent};
use heimdall_telemetry::{AgentHealth, BifrostWatch};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub use dashboard::DashboardSnapshot;
pub use flusher::SnapshotFlusher;

/// Result alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors surfaced by the kernel.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Telemetry subsystem failure.
    #[error(transparent)]
    Telemetry(#[from] heimdall_telemetry::TelemetryError),
    /// Alert subsystem failure.
    #[error(transparent)]
    Alerts(#[from] heimdall_alerts::AlertError),
    /// Causal subsystem failure.
    #[error(transparent)]
    Causal(#[from] heimdall_causal::CausalError),
    /// Drift subsystem failure.
    #[error(transparent)]
    Drift(#[from] heimdall_drift::DriftError),
    /// Protocol subsystem failure.
    #[error(transparent)]
    Protocol(#[from] heimdall_protocol::ProtocolError),
    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] heimdall_config::ConfigError),
    /// Snapshot store failure.
    #[error(transparent)]
    Store(#[from] heimdall_store::StoreError),
}

/// Number of evidence records retained for rule evaluation.
const EVIDENCE_CAPACITY: usize = 256;

/// Directive attached to remediation instructions raised by emergency
/// alerts.
const EMERGENCY_DIRECTIVE: &str = "isolate agent and restart its runtime";

/// Core runtime that wires every monitoring subsystem together.
#[derive(Debug)]
pub struct HeimdallKernel {
    config: MonitorConfig,
    watch: BifrostWatch,
    alerts: GjallarhornAlerts,
    causal: CausalGraph,
    drift: A2aWatch,
    protocol: GjallarhornProtocol,
    evidence: RwLock<VecDeque<Evidence>>,
}

impl HeimdallKernel {
    /// Builds a kernel from a validated configuration, registering its alert
    /// rules.
    ///
    /// # Errors
    ///
    /// Returns a [`KernelError`] when any subsystem rejects its section or a
    /// configured rule is invalid.
    pub async fn new(config: MonitorConfig) -> KernelResult<Self> {
        config.validate()?;

        let watch = BifrostWatch::new(config.watch)?;
        let alerts = GjallarhornAlerts::new();
        for rule in &config.rules {
            alerts.add_rule(rule.clone()).await?;
        }
        let causal = CausalGraph::new(config.causal)?;
        let drift = A2aWatch::new(config.drift)?;
        let protocol = GjallarhornProtocol::new(config.protocol)?;

        Ok(Self {
            config,
            watch,
            alerts,
            causal,
            drift,
            protocol,
            evidence: RwLock::new(VecDeque::with_capacity(EVIDENCE_CAPACITY)),
        })
    }

    /// Returns the configuration the kernel was built from.
    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Records one completed agent operation, stamped now.
    ///
    /// Feeds every subsystem and returns the alerts fired by this
    /// observation. Alerts of [`AlertSeverity::Emergency`] quarantine the
    /// agents implicated by their matching evidence and enqueue a
    /// remediation instruction for each.
    pub async fn record_agent_operation(&self, span: TelemetrySpan) -> Vec<Alert> {
        self.record_agent_operation_at(span, SystemTime::now()).await
    }

    /// Records one completed agent operation against an explicit clock, for
    /// deterministic replay.
    pub async fn record_agent_operation_at(
        &self,
        span: TelemetrySpan,
        now: SystemTime,
    ) -> Vec<Alert> {
        let agent = span.agent().clone();
        let ok = !span.outcome().is_failure();

        self.protocol.record_result_at(&agent, ok, now).await;
        self.causal.observe(&span).await;
        self.watch.record(span.clone()).await;

        let health = self.watch.health_of(&agent).await;
        let evidence = build_evidence(&span, health.as_ref());

        let batch: Vec<Evidence> = {
            let mut buffer = self.evidence.write().await;
            buffer.push_back(evidence);
            while buffer.len() > EVIDENCE_CAPACITY {
                buffer.pop_front();
            }
            buffer.iter().cloned().collect()
        };

        let fired = self.alerts.evaluate_at(&batch, now).await;
        for alert in &fired {
            if alert.severity() != AlertSeverity::Emergency {
                continue;
            }
            // Quarantine the agents whose evidence matched, not whichever
            // agent happened to record the triggering span.
            for culprit in alert.implicated() {
                warn!(
                    agent = %culprit,
                    alert_id = %alert.id(),
                    "emergency alert; quarantining agent"
                );
                self.protocol
                    .quarantine(culprit.clone(), alert.message().to_owned())
                    .await;
                self.protocol
                    .push_remediation(RemediationInstruction::new(
                        culprit.clone(),
                        EMERGENCY_DIRECTIVE,
                    ))
                    .await;
            }
        }

        fired
    }

    /// Decides whether an agent operation may proceed right now.
    ///
    /// Quarantine blocks first; otherwise the agent's breaker decides.
    pub async fn should_allow_operation(&self, agent: &AgentName) -> GateDecision {
        self.should_allow_operation_at(agent, SystemTime::now()).await
    }

    /// Gate check against an explicit clock.
    pub async fn should_allow_operation_at(
        &self,
        agent: &AgentName,
        now: SystemTime,
    ) -> GateDecision {
        self.protocol.gate_at(agent, now).await
    }

    /// Records an observed agent-to-agent message.
    pub async fn record_a2a_message(&self, message: A2aMessage) {
        self.drift.record(message).await;
    }

    /// Sets the cognitive integrity input for an agent.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Telemetry`] when the value lies outside
    /// `[0, 1]`.
    pub async fn set_cognitive_integrity(
        &self,
        agent: &AgentName,
        value: f64,
    ) -> KernelResult<()> {
        self.watch.set_cognitive_integrity(agent, value).await?;
        Ok(())
    }

    /// Resolves an active alert.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Alerts`] when the alert is unknown or already
    /// resolved.
    pub async fn resolve_alert(&self, id: AlertId, note: impl Into<String>) -> KernelResult<Alert> {
        Ok(self.alerts.resolve(id, note).await?)
    }

    /// Releases an agent from quarantine.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Protocol`] when the agent is not quarantined.
    pub async fn release_agent(&self, agent: &AgentName) -> KernelResult<QuarantineEntry> {
        let entry = self.protocol.release(agent).await?;
        info!(agent = %agent, "agent released by operator");
        Ok(entry)
    }

    /// Removes and returns up to `limit` pending remediation instructions.
    pub async fn drain_remediation(&self, limit: usize) -> Vec<RemediationInstruction> {
        self.protocol.drain_remediation(limit).await
    }

    /// Returns the current health snapshot for one agent, if seen.
    #[must_use]
    pub async fn health_of(&self, agent: &AgentName) -> Option<AgentHealth> {
        self.watch.health_of(agent).await
    }

    /// Returns the drift assessments for all observed agent pairs.
    #[must_use]
    pub async fn drift_assessments(&self) -> Vec<DriftAssessment> {
        self.drift.assess_all().await
    }

    /// Captures the durable monitor state for persistence.
    #[must_use]
    pub async fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            captured_at: chrono::Utc::now(),
            breakers: self
                .protocol
                .breaker_states()
                .await
                .into_iter()
                .map(|(agent, state)| BreakerEntry { agent, state })
                .collect(),
            quarantined: self
                .protocol
                .quarantined()
                .await
                .into_iter()
                .map(|(agent, entry)| QuarantinedAgent { agent, entry })
                .collect(),
            causal_nodes: self.causal.snapshot().await,
            active_alerts: self.alerts.active_alerts().await,
            pending_remediation: self.protocol.pending_remediation().await,
        }
    }

    /// Builds the dashboard view consumed by the admin surface.
    #[must_use]
    pub async fn dashboard(&self) -> DashboardSnapshot {
        dashboard::build(self).await
    }

    pub(crate) fn watch(&self) -> &BifrostWatch {
        &self.watch
    }

    pub(crate) fn alerts(&self) -> &GjallarhornAlerts {
        &self.alerts
    }

    pub(crate) fn causal(&self) -> &CausalGraph {
        &self.causal
    }

    pub(crate) fn drift(&self) -> &A2aWatch {
        &self.drift
    }

    pub(crate) fn protocol(&self) -> &GjallarhornProtocol {
        &self.protocol
    }
}

/// Converts a span plus the agent's current health into rule evidence.
fn build_evidence(span: &TelemetrySpan, health: Option<&AgentHealth>) -> Evidence {
    let mut evidence = Evidence::new(span.agent().clone(), span.outcome())
        .with_metric("latency_ms", span.latency().as_secs_f64() * 1000.0)
        .observed_at(span.ended());

    if let Some(health) = health {
        evidence = evidence
            .with_metric("error_rate", health.error_rate)
            .with_metric("success_rate", health.success_rate)
            .with_metric("overall_score", health.overall_score);
    }
    if let Some(detail) = span.detail() {
        evidence = evidence.with_detail(detail);
    }
    for (key, value) in span.metadata() {
        if let Value::Number(number) = value {
            if let Some(number) = number.as_f64() {
                evidence = evidence.with_metric(key.clone(), number);
            }
        }
    }
    evidence
}
