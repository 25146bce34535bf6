//! The Gjallarhorn protocol facade.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::SystemTime;

use heimdall_primitives::AgentName;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::breaker::{BreakerConfig, BreakerState, CircuitBreaker};
use crate::quarantine::{QuarantineEntry, QuarantineList};
use crate::remediation::{RemediationInstruction, RemediationQueue};
use crate::ProtocolResult;

/// Configuration for [`GjallarhornProtocol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Breaker settings applied to every agent.
    pub breaker: BreakerConfig,
    /// Capacity of the remediation queue.
    pub remediation_capacity: NonZeroUsize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            breaker: BreakerConfig::default(),
            remediation_capacity: NonZeroUsize::new(128).expect("non-zero"),
        }
    }
}

impl ProtocolConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Propagates breaker validation failures.
    pub fn validate(&self) -> ProtocolResult<()> {
        self.breaker.validate()
    }
}

/// Outcome of an operation gate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Operation may proceed.
    Allow,
    /// Operation is blocked.
    Block {
        /// Why the operation was blocked.
        reason: String,
    },
}

impl GateDecision {
    /// Returns `true` when the operation may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

#[derive(Debug)]
struct ProtocolInner {
    breakers: HashMap<AgentName, CircuitBreaker>,
    quarantine: QuarantineList,
    remediation: RemediationQueue,
}

/// Per-agent failure isolation: breakers, quarantine, and remediation.
///
/// Breakers are created lazily from the shared configuration the first time
/// an agent is seen. Quarantine takes precedence over breaker state when
/// gating.
#[derive(Debug)]
pub struct GjallarhornProtocol {
    config: ProtocolConfig,
    inner: RwLock<ProtocolInner>,
}

impl GjallarhornProtocol {
    /// Creates a protocol instance with the supplied configuration.
    ///
    /// # Errors
    ///
    /// Propagates configuration validation failures.
    pub fn new(config: ProtocolConfig) -> ProtocolResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            inner: RwLock::new(ProtocolInner {
                breakers: HashMap::new(),
                quarantine: QuarantineList::new(),
                remediation: RemediationQueue::new(config.remediation_capacity),
            }),
        })
    }

    /// Feeds an operation result into the agent's breaker.
    pub async fn record_result(&self, agent: &AgentName, ok: bool) {
        self.record_result_at(agent, ok, SystemTime::now()).await;
    }

    /// Feeds an operation result with an explicit clock.
    pub async fn record_result_at(&self, agent: &AgentName, ok: bool, now: SystemTime) {
        let mut inner = self.inner.write().await;
        let breaker = inner
            .breakers
            .entry(agent.clone())
            .or_insert_with(|| CircuitBreaker::new(self.config.breaker));
        breaker.record_result_at(ok, now);
    }

    /// Gate check for an agent operation, stamped now.
    pub async fn gate(&self, agent: &AgentName) -> GateDecision {
        self.gate_at(agent, SystemTime::now()).await
    }

    /// Gate check with an explicit clock.
    ///
    /// Quarantine blocks first; otherwise the breaker's timed state decides.
    pub async fn gate_at(&self, agent: &AgentName, now: SystemTime) -> GateDecision {
        let mut inner = self.inner.write().await;

        if let Some(entry) = inner.quarantine.get(agent) {
            return GateDecision::Block {
                reason: format!("quarantined: {}", entry.reason),
            };
        }

        let Some(breaker) = inner.breakers.get_mut(agent) else {
            return GateDecision::Allow;
        };
        let state = breaker.check_at(now);
        if state.allows_operations() {
            GateDecision::Allow
        } else {
            GateDecision::Block {
                reason: "circuit breaker open".to_owned(),
            }
        }
    }

    /// Quarantines an agent.
    pub async fn quarantine(&self, agent: AgentName, reason: impl Into<String>) {
        let mut inner = self.inner.write().await;
        inner.quarantine.impose(agent, reason);
    }

    /// Releases a quarantined agent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProtocolError::NotQuarantined`] when the agent is not
    /// held.
    pub async fn release(&self, agent: &AgentName) -> ProtocolResult<QuarantineEntry> {
        let mut inner = self.inner.write().await;
        inner.quarantine.release(agent)
    }

    /// Returns all quarantined agents.
    #[must_use]
    pub async fn quarantined(&self) -> Vec<(AgentName, QuarantineEntry)> {
        self.inner.read().await.quarantine.entries()
    }

    /// Enqueues a remediation instruction.
    pub async fn push_remediation(&self, instruction: RemediationInstruction) {
        let mut inner = self.inner.write().await;
        inner.remediation.push(instruction);
    }

    /// Removes and returns up to `limit` remediation instructions.
    pub async fn drain_remediation(&self, limit: usize) -> Vec<RemediationInstruction> {
        let mut inner = self.inner.write().await;
        inner.remediation.drain(limit)
    }

    /// Returns the pending remediation instructions without removing them.
    #[must_use]
    pub async fn pending_remediation(&self) -> Vec<RemediationInstruction> {
        self.inner.read().await.remediation.pending()
    }

    /// Returns each known agent's breaker state (untimed), sorted by agent.
    #[must_use]
    pub async fn breaker_states(&self) -> Vec<(AgentName, BreakerState)> {
        let inner = self.inner.read().await;
        let mut out: Vec<_> = inner
            .breakers
            .iter()
            .map(|(agent, breaker)| (agent.clone(), breaker.state()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn agent(name: &str) -> AgentName {
        AgentName::new(name).unwrap()
    }

    fn protocol() -> GjallarhornProtocol {
        GjallarhornProtocol::new(ProtocolConfig {
            breaker: BreakerConfig {
                failure_threshold: 2,
                success_threshold: 1,
                open_timeout: Duration::from_secs(30),
            },
            remediation_capacity: NonZeroUsize::new(8).unwrap(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn unknown_agent_is_allowed() {
        let protocol = protocol();
        assert!(protocol.gate(&agent("odin")).await.is_allowed());
    }

    #[tokio::test]
    async fn breaker_blocks_after_failures_and_recovers() {
        let protocol = protocol();
        let start = SystemTime::now();
        let loki = agent("loki");

        protocol.record_result_at(&loki, false, start).await;
        protocol.record_result_at(&loki, false, start).await;
        assert!(!protocol.gate_at(&loki, start).await.is_allowed());

        // After the timeout the gate probes half-open and allows.
        let later = start + Duration::from_secs(31);
        assert!(protocol.gate_at(&loki, later).await.is_allowed());
        protocol.record_result_at(&loki, true, later).await;
        assert!(protocol.gate_at(&loki, later).await.is_allowed());

        let states = protocol.breaker_states().await;
        assert_eq!(states, vec![(loki, BreakerState::Closed)]);
    }

    #[tokio::test]
    async fn quarantine_overrides_closed_breaker() {
        let protocol = protocol();
        let odin = agent("odin");

        protocol.quarantine(odin.clone(), "manual isolation").await;
        let decision = protocol.gate(&odin).await;
        assert!(matches!(decision, GateDecision::Block { ref reason } if reason.contains("manual isolation")));

        protocol.release(&odin).await.unwrap();
        assert!(protocol.gate(&odin).await.is_allowed());
    }

    #[tokio::test]
    async fn remediation_flows_through_queue() {
        let protocol = protocol();
        protocol
            .push_remediation(RemediationInstruction::new(agent("thor"), "restart"))
            .await;
        assert_eq!(protocol.pending_remediation().await.len(), 1);

        let drained = protocol.drain_remediation(10).await;
        assert_eq!(drained.len(), 1);
        assert!(protocol.pending_remediation().await.is_empty());
    }
}
