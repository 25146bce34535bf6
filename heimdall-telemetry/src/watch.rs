//! The BifrostWatch span buffer.

use std::collections::HashMap;
use std::time::SystemTime;

use heimdall_primitives::{AgentName, TelemetrySpan};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::WatchConfig;
use crate::health::{score_spans, AgentHealth};
use crate::{TelemetryError, TelemetryResult};

#[derive(Debug, Default)]
struct AgentRing {
    spans: std::collections::VecDeque<TelemetrySpan>,
    cognitive_integrity: f64,
}

impl AgentRing {
    fn new() -> Self {
        Self {
            spans: std::collections::VecDeque::new(),
            cognitive_integrity: 1.0,
        }
    }
}

/// Buffers telemetry spans per agent and scores health over a trailing
/// window.
///
/// Each agent keeps a bounded ring of its most recent spans; health snapshots
/// are recomputed from the retained spans on every query.
#[derive(Debug)]
pub struct BifrostWatch {
    config: WatchConfig,
    inner: RwLock<HashMap<AgentName, AgentRing>>,
}

impl BifrostWatch {
    /// Creates a watch using the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfig`] when the configuration fails
    /// validation.
    pub fn new(config: WatchConfig) -> TelemetryResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            inner: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the associated configuration.
    #[must_use]
    pub const fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Records a span, evicting the oldest entry once the agent ring is full.
    pub async fn record(&self, span: TelemetrySpan) {
        let mut guard = self.inner.write().await;
        let ring = guard
            .entry(span.agent().clone())
            .or_insert_with(AgentRing::new);
        ring.spans.push_back(span);
        while ring.spans.len() > self.config.ring_capacity.get() {
            ring.spans.pop_front();
        }
    }

    /// Sets the cognitive integrity input for an agent.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidIntegrity`] when the value lies
    /// outside `[0, 1]`.
    pub async fn set_cognitive_integrity(
        &self,
        agent: &AgentName,
        value: f64,
    ) -> TelemetryResult<()> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(TelemetryError::InvalidIntegrity { value });
        }
        let mut guard = self.inner.write().await;
        let ring = guard.entry(agent.clone()).or_insert_with(AgentRing::new);
        ring.cognitive_integrity = value;
        debug!(agent = %agent, value, "cognitive integrity updated");
        Ok(())
    }

    /// Returns the most recent spans for an agent, oldest first, up to
    /// `limit`.
    #[must_use]
    pub async fn recent(&self, agent: &AgentName, limit: usize) -> Vec<TelemetrySpan> {
        let guard = self.inner.read().await;
        let Some(ring) = guard.get(agent) else {
            return Vec::new();
        };
        let take = limit.min(ring.spans.len());
        ring.spans
            .iter()
            .rev()
            .take(take)
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    /// Computes the current health snapshot for one agent.
    ///
    /// Returns `None` for agents the watch has never seen.
    #[must_use]
    pub async fn health_of(&self, agent: &AgentName) -> Option<AgentHealth> {
        let guard = self.inner.read().await;
        let ring = guard.get(agent)?;
        Some(score_spans(
            agent,
            ring.spans.iter(),
            ring.cognitive_integrity,
            SystemTime::now(),
            &self.config,
        ))
    }

    /// Computes health snapshots for every agent the watch has seen.
    #[must_use]
    pub async fn health_report(&self) -> Vec<AgentHealth> {
        let now = SystemTime::now();
        let guard = self.inner.read().await;
        let mut report: Vec<AgentHealth> = guard
            .iter()
            .map(|(agent, ring)| {
                score_spans(
                    agent,
                    ring.spans.iter(),
                    ring.cognitive_integrity,
                    now,
                    &self.config,
                )
            })
            .collect();
        report.sort_by(|a, b| a.agent.cmp(&b.agent));
        report
    }
}
