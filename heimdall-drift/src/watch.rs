//! Rolling message log and drift heuristics.

use std::collections::{BTreeSet, HashSet, VecDeque};

use heimdall_primitives::AgentName;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::message::A2aMessage;
use crate::{DriftConfig, DriftResult};

/// Heuristic that contributed to a drift score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftSignalKind {
    /// Large fraction of identical payloads (agents looping on each other).
    RepeatedPayloads,
    /// Elevated delivery failure ratio.
    ElevatedErrors,
    /// Delivery latency growing across the log.
    LatencyGrowth,
}

/// One contributing heuristic with its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftSignal {
    /// Which heuristic fired.
    pub kind: DriftSignalKind,
    /// Raw (unclamped) heuristic value.
    pub value: f64,
}

/// Drift verdict for one sender/receiver pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAssessment {
    /// Sending agent.
    pub from: AgentName,
    /// Receiving agent.
    pub to: AgentName,
    /// `true` when the combined score crosses the configured threshold.
    pub drifting: bool,
    /// Combined score in `[0, 1]`.
    pub score: f64,
    /// Messages for the pair currently in the log.
    pub samples: usize,
    /// Raw heuristic values behind the score.
    pub signals: Vec<DriftSignal>,
}

/// Bounded log of agent-to-agent traffic with per-pair drift scoring.
#[derive(Debug)]
pub struct A2aWatch {
    config: DriftConfig,
    log: RwLock<VecDeque<A2aMessage>>,
}

impl A2aWatch {
    /// Creates a watch with the supplied configuration.
    ///
    /// # Errors
    ///
    /// Propagates configuration validation failures.
    pub fn new(config: DriftConfig) -> DriftResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            log: RwLock::new(VecDeque::with_capacity(config.log_capacity.get())),
        })
    }

    /// Appends a message, evicting the oldest once the log is full.
    pub async fn record(&self, message: A2aMessage) {
        let mut log = self.log.write().await;
        log.push_back(message);
        while log.len() > self.config.log_capacity.get() {
            log.pop_front();
        }
    }

    /// Returns the number of messages currently retained.
    #[must_use]
    pub async fn len(&self) -> usize {
        self.log.read().await.len()
    }

    /// Returns `true` when the log is empty.
    #[must_use]
    pub async fn is_empty(&self) -> bool {
        self.log.read().await.is_empty()
    }

    /// Returns the distinct sender/receiver pairs present in the log.
    #[must_use]
    pub async fn pairs(&self) -> Vec<(AgentName, AgentName)> {
        let log = self.log.read().await;
        let pairs: BTreeSet<(AgentName, AgentName)> = log
            .iter()
            .map(|m| (m.from().clone(), m.to().clone()))
            .collect();
        pairs.into_iter().collect()
    }

    /// Scores one sender/receiver pair.
    ///
    /// Pairs with fewer than `min_samples` messages are reported as not
    /// drifting with a zero score.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub async fn assess(&self, from: &AgentName, to: &AgentName) -> DriftAssessment {
        let log = self.log.read().await;
        let messages: Vec<&A2aMessage> = log
            .iter()
            .filter(|m| m.from() == from && m.to() == to)
            .collect();
        let samples = messages.len();

        if samples < self.config.min_samples {
            return DriftAssessment {
                from: from.clone(),
                to: to.clone(),
                drifting: false,
                score: 0.0,
                samples,
                signals: Vec::new(),
            };
        }

        let distinct: HashSet<&[u8]> = messages.iter().map(|m| m.payload().as_ref()).collect();
        let repeat_ratio = 1.0 - distinct.len() as f64 / samples as f64;

        let failures = messages.iter().filter(|m| !m.is_ok()).count();
        let error_ratio = failures as f64 / samples as f64;

        let half = samples / 2;
        let early_mean = mean_latency_ms(&messages[..half]);
        let late_mean = mean_latency_ms(&messages[half..]);
        let growth = if early_mean > 0.0 {
            late_mean / early_mean
        } else {
            1.0
        };

        let signals = vec![
            DriftSignal {
                kind: DriftSignalKind::RepeatedPayloads,
                value: repeat_ratio,
            },
            DriftSignal {
                kind: DriftSignalKind::ElevatedErrors,
                value: error_ratio,
            },
            DriftSignal {
                kind: DriftSignalKind::LatencyGrowth,
                value: growth,
            },
        ];

        let score = ((repeat_ratio / self.config.repeat_threshold).clamp(0.0, 1.0)
            + (error_ratio / self.config.error_threshold).clamp(0.0, 1.0)
            + ((growth - 1.0) / (self.config.latency_growth_threshold - 1.0)).clamp(0.0, 1.0))
            / 3.0;
        let drifting = score >= self.config.score_threshold;
        if drifting {
            debug!(from = %from, to = %to, score, "a2a drift detected");
        }

        DriftAssessment {
            from: from.clone(),
            to: to.clone(),
            drifting,
            score,
            samples,
            signals,
        }
    }

    /// Scores every pair currently present in the log.
    #[must_use]
    pub async fn assess_all(&self) -> Vec<DriftAssessment> {
        let mut out = Vec::new();
        for (from, to) in self.pairs().await {
            out.push(self.assess(&from, &to).await);
        }
        out
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_latency_ms(messages: &[&A2aMessage]) -> f64 {
    if messages.is_empty() {
        return 0.0;
    }
    let total: f64 = messages
        .iter()
        .map(|m| m.latency().as_secs_f64() * 1000.0)
        .sum();
    total / messages.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use std::time::Duration;

    use bytes::Bytes;

    fn agent(name: &str) -> AgentName {
        AgentName::new(name).unwrap()
    }

    fn message(payload: &str) -> A2aMessage {
        A2aMessage::new(agent("odin"), agent("thor"), Bytes::copy_from_slice(payload.as_bytes()))
            .with_latency(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn log_respects_capacity() {
        let config = DriftConfig {
            log_capacity: NonZeroUsize::new(5).unwrap(),
            ..DriftConfig::default()
        };
        let watch = A2aWatch::new(config).unwrap();
        for i in 0..8 {
            watch.record(message(&format!("m{i}"))).await;
        }
        assert_eq!(watch.len().await, 5);
    }

    #[tokio::test]
    async fn too_few_samples_is_not_drifting() {
        let watch = A2aWatch::new(DriftConfig::default()).unwrap();
        for i in 0..3 {
            watch.record(message(&format!("m{i}"))).await;
        }
        let assessment = watch.assess(&agent("odin"), &agent("thor")).await;
        assert!(!assessment.drifting);
        assert_eq!(assessment.samples, 3);
        assert!(assessment.signals.is_empty());
    }

    #[tokio::test]
    async fn repeated_failing_payloads_drift() {
        let watch = A2aWatch::new(DriftConfig::default()).unwrap();
        for _ in 0..12 {
            watch.record(message("retry the same thing").failed()).await;
        }

        let assessment = watch.assess(&agent("odin"), &agent("thor")).await;
        assert!(assessment.drifting);
        assert!(assessment.score > 0.5);
        assert!(assessment
            .signals
            .iter()
            .any(|s| s.kind == DriftSignalKind::RepeatedPayloads && s.value > 0.9));
    }

    #[tokio::test]
    async fn varied_healthy_traffic_does_not_drift() {
        let watch = A2aWatch::new(DriftConfig::default()).unwrap();
        for i in 0..20 {
            watch.record(message(&format!("payload-{i}"))).await;
        }

        let assessment = watch.assess(&agent("odin"), &agent("thor")).await;
        assert!(!assessment.drifting);
        assert!(assessment.score < 0.2);
    }

    #[tokio::test]
    async fn latency_growth_raises_score() {
        let watch = A2aWatch::new(DriftConfig::default()).unwrap();
        for i in 0..10 {
            let latency = if i < 5 {
                Duration::from_millis(10)
            } else {
                Duration::from_millis(100)
            };
            watch
                .record(message(&format!("p{i}")).with_latency(latency))
                .await;
        }

        let assessment = watch.assess(&agent("odin"), &agent("thor")).await;
        let growth = assessment
            .signals
            .iter()
            .find(|s| s.kind == DriftSignalKind::LatencyGrowth)
            .unwrap();
        assert!(growth.value > 5.0);
    }

    #[tokio::test]
    async fn pairs_are_tracked_separately() {
        let watch = A2aWatch::new(DriftConfig::default()).unwrap();
        watch.record(message("x")).await;
        watch
            .record(A2aMessage::new(
                agent("freya"),
                agent("odin"),
                Bytes::from_static(b"y"),
            ))
            .await;

        let pairs = watch.pairs().await;
        assert_eq!(pairs.len(), 2);
        let all = watch.assess_all().await;
        assert_eq!(all.len(), 2);
    }
}
