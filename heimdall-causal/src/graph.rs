//! The bounded causal graph.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{self, Display, Formatter};
use std::time::SystemTime;

use heimdall_primitives::{AgentName, TelemetrySpan};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{CausalConfig, CausalResult};

/// Key identifying one `agent:operation` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpKey {
    agent: AgentName,
    operation: String,
}

impl OpKey {
    /// Creates a key for the given agent and operation.
    #[must_use]
    pub fn new(agent: AgentName, operation: impl Into<String>) -> Self {
        Self {
            agent,
            operation: operation.into(),
        }
    }

    /// Returns the agent component.
    #[must_use]
    pub fn agent(&self) -> &AgentName {
        &self.agent
    }

    /// Returns the operation component.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Display for OpKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.agent, self.operation)
    }
}

impl From<&TelemetrySpan> for OpKey {
    fn from(span: &TelemetrySpan) -> Self {
        Self::new(span.agent().clone(), span.operation())
    }
}

#[derive(Debug, Clone)]
struct CausalNode {
    failures: u64,
    successes: u64,
    last_failure: Option<SystemTime>,
    last_updated: SystemTime,
    downstream: HashSet<OpKey>,
}

impl CausalNode {
    fn new(now: SystemTime) -> Self {
        Self {
            failures: 0,
            successes: 0,
            last_failure: None,
            last_updated: now,
            downstream: HashSet::new(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn failure_probability(&self) -> f64 {
        // Laplace-smoothed so single observations stay close to the prior.
        (self.failures as f64 + 1.0) / ((self.failures + self.successes) as f64 + 2.0)
    }
}

/// Serializable view of one causal node, for snapshots and dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalNodeSnapshot {
    /// Rendered `agent:operation` key.
    pub key: String,
    /// Failures observed for the key.
    pub failures: u64,
    /// Successes observed for the key.
    pub successes: u64,
    /// Smoothed failure probability.
    pub failure_probability: f64,
    /// Keys of operations observed to fail downstream of this one.
    pub downstream: Vec<String>,
    /// Most recent failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<SystemTime>,
}

#[derive(Debug, Default)]
struct GraphInner {
    nodes: HashMap<OpKey, CausalNode>,
    recent_failures: VecDeque<(OpKey, SystemTime)>,
}

/// In-memory frequency table with failure linkage.
///
/// `observe` feeds spans in; the probability accessors answer gating and
/// dashboard queries. All timing derives from span end timestamps, so replays
/// are deterministic.
#[derive(Debug)]
pub struct CausalGraph {
    config: CausalConfig,
    inner: RwLock<GraphInner>,
}

impl CausalGraph {
    /// Creates a graph with the supplied configuration.
    ///
    /// # Errors
    ///
    /// Propagates configuration validation failures.
    pub fn new(config: CausalConfig) -> CausalResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            inner: RwLock::new(GraphInner::default()),
        })
    }

    /// Returns the number of tracked nodes.
    #[must_use]
    pub async fn len(&self) -> usize {
        self.inner.read().await.nodes.len()
    }

    /// Returns `true` when no nodes are tracked.
    #[must_use]
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.nodes.is_empty()
    }

    /// Folds a span into the graph.
    pub async fn observe(&self, span: &TelemetrySpan) {
        let key = OpKey::from(span);
        let now = span.ended();
        let failed = span.outcome().is_failure();

        let mut inner = self.inner.write().await;

        if failed {
            // Link this failure downstream of other recent failures.
            let window = self.config.linkage_window;
            inner
                .recent_failures
                .retain(|(_, at)| now.duration_since(*at).is_ok_and(|d| d <= window) || *at > now);
            let predecessors: Vec<OpKey> = inner
                .recent_failures
                .iter()
                .map(|(k, _)| k.clone())
                .filter(|k| *k != key)
                .collect();
            for predecessor in predecessors {
                if let Some(node) = inner.nodes.get_mut(&predecessor) {
                    node.downstream.insert(key.clone());
                }
            }
            inner.recent_failures.push_back((key.clone(), now));
        }

        let node = inner
            .nodes
            .entry(key.clone())
            .or_insert_with(|| CausalNode::new(now));
        if failed {
            node.failures += 1;
            node.last_failure = Some(now);
        } else {
            node.successes += 1;
        }
        node.last_updated = now;

        // Bounded table: drop the least recently updated node.
        while inner.nodes.len() > self.config.max_nodes.get() {
            let Some(oldest) = inner
                .nodes
                .iter()
                .min_by_key(|(_, node)| node.last_updated)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            inner.nodes.remove(&oldest);
            debug!(key = %oldest, "causal node evicted");
        }
    }

    /// Returns the smoothed failure probability for a key, if tracked.
    #[must_use]
    pub async fn failure_probability(&self, agent: &AgentName, operation: &str) -> Option<f64> {
        let key = OpKey::new(agent.clone(), operation);
        let inner = self.inner.read().await;
        inner.nodes.get(&key).map(CausalNode::failure_probability)
    }

    /// Returns the cascade risk for a key, if tracked.
    ///
    /// The base failure probability is amplified by the fraction of linked
    /// downstream operations that are themselves failure-prone, clamped to
    /// `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub async fn cascade_risk(&self, agent: &AgentName, operation: &str) -> Option<f64> {
        let key = OpKey::new(agent.clone(), operation);
        let inner = self.inner.read().await;
        let node = inner.nodes.get(&key)?;

        let base = node.failure_probability();
        if node.downstream.is_empty() {
            return Some(base);
        }
        let risky = node
            .downstream
            .iter()
            .filter_map(|k| inner.nodes.get(k))
            .filter(|n| n.failure_probability() > 0.5)
            .count();
        let amplification = risky as f64 / node.downstream.len() as f64;
        Some((base * (1.0 + amplification)).clamp(0.0, 1.0))
    }

    /// Exports all nodes, sorted by descending failure probability.
    #[must_use]
    pub async fn snapshot(&self) -> Vec<CausalNodeSnapshot> {
        let inner = self.inner.read().await;
        let mut nodes: Vec<CausalNodeSnapshot> = inner
            .nodes
            .iter()
            .map(|(key, node)| CausalNodeSnapshot {
                key: key.to_string(),
                failures: node.failures,
                successes: node.successes,
                failure_probability: node.failure_probability(),
                downstream: node.downstream.iter().map(ToString::to_string).collect(),
                last_failure: node.last_failure,
            })
            .collect();
        nodes.sort_by(|a, b| {
            b.failure_probability
                .total_cmp(&a.failure_probability)
                .then_with(|| a.key.cmp(&b.key))
        });
        nodes
    }
}
