//! Alert rule definitions and condition matching.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use heimdall_primitives::{AgentName, OperationOutcome};
use serde::{Deserialize, Serialize};

use crate::evidence::Evidence;
use crate::{AlertError, AlertResult};

/// Severity attached to a rule and to the alerts it raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Informational; no action expected.
    Info,
    /// Something needs attention soon.
    Warning,
    /// Service-affecting; act now.
    Critical,
    /// Agent must be isolated and remediated.
    Emergency,
}

/// Comparison operator for threshold conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricOp {
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
}

impl MetricOp {
    pub(crate) fn holds(self, observed: f64, bound: f64) -> bool {
        match self {
            Self::Gt => observed > bound,
            Self::Ge => observed >= bound,
            Self::Lt => observed < bound,
            Self::Le => observed <= bound,
        }
    }
}

/// Condition evaluated against a batch of evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertCondition {
    /// The latest evidence carrying `metric` satisfies `op` against `value`.
    Threshold {
        /// Metric name to inspect.
        metric: String,
        /// Comparison applied to the observed value.
        op: MetricOp,
        /// Bound the observation is compared against.
        value: f64,
    },
    /// The latest value of `metric` deviates from the mean of the earlier
    /// samples by at least `deviations` standard deviations.
    ///
    /// Requires at least `min_samples` baseline samples; a zero-variance
    /// baseline never matches.
    Anomaly {
        /// Metric name to inspect.
        metric: String,
        /// Minimum baseline samples (excluding the latest) required.
        min_samples: usize,
        /// Deviation multiplier that trips the condition.
        deviations: f64,
    },
    /// At least `min_matches` evidence detail strings contain `substring`
    /// (case-insensitive).
    Pattern {
        /// Substring searched for in evidence details.
        substring: String,
        /// Minimum number of matching records.
        min_matches: usize,
    },
    /// At least `min_agents` distinct agents present the given outcome.
    Cascade {
        /// Minimum number of distinct agents affected.
        min_agents: usize,
        /// Outcome that counts as affected.
        outcome: OperationOutcome,
    },
}

impl AlertCondition {
    /// Returns a concise, human-readable label for the condition.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Threshold { metric, op, value } => {
                format!("threshold `{metric}` {op:?} {value}")
            }
            Self::Anomaly {
                metric, deviations, ..
            } => format!("anomaly `{metric}` at {deviations} deviations"),
            Self::Pattern {
                substring,
                min_matches,
            } => format!("pattern `{substring}` x{min_matches}"),
            Self::Cascade {
                min_agents,
                outcome,
            } => format!("cascade of {min_agents}+ agents with {outcome:?}"),
        }
    }

    pub(crate) fn validate(&self) -> AlertResult<()> {
        match self {
            Self::Threshold { metric, value, .. } => {
                if metric.trim().is_empty() {
                    return Err(AlertError::InvalidRule("threshold metric must be named"));
                }
                if !value.is_finite() {
                    return Err(AlertError::InvalidRule("threshold value must be finite"));
                }
            }
            Self::Anomaly {
                metric,
                min_samples,
                deviations,
            } => {
                if metric.trim().is_empty() {
                    return Err(AlertError::InvalidRule("anomaly metric must be named"));
                }
                if *min_samples == 0 {
                    return Err(AlertError::InvalidRule(
                        "anomaly min_samples must be greater than zero",
                    ));
                }
                if !deviations.is_finite() || *deviations <= 0.0 {
                    return Err(AlertError::InvalidRule(
                        "anomaly deviations must be positive and finite",
                    ));
                }
            }
            Self::Pattern {
                substring,
                min_matches,
            } => {
                if substring.trim().is_empty() {
                    return Err(AlertError::InvalidRule("pattern substring must be set"));
                }
                if *min_matches == 0 {
                    return Err(AlertError::InvalidRule(
                        "pattern min_matches must be greater than zero",
                    ));
                }
            }
            Self::Cascade { min_agents, .. } => {
                if *min_agents == 0 {
                    return Err(AlertError::InvalidRule(
                        "cascade min_agents must be greater than zero",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Evaluates the condition against a batch of evidence, ordered oldest
    /// to newest.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn matches(&self, evidence: &[Evidence]) -> bool {
        match self {
            Self::Threshold { metric, op, value } => evidence
                .iter()
                .rev()
                .find_map(|e| e.metric(metric))
                .is_some_and(|observed| op.holds(observed, *value)),
            Self::Anomaly {
                metric,
                min_samples,
                deviations,
            } => {
                let values: Vec<f64> =
                    evidence.iter().filter_map(|e| e.metric(metric)).collect();
                let Some((latest, baseline)) = values.split_last() else {
                    return false;
                };
                if baseline.len() < *min_samples {
                    return false;
                }
                let mean = baseline.iter().sum::<f64>() / baseline.len() as f64;
                let variance = baseline
                    .iter()
                    .map(|v| (v - mean).powi(2))
                    .sum::<f64>()
                    / baseline.len() as f64;
                let std_dev = variance.sqrt();
                std_dev > 0.0 && (latest - mean).abs() >= deviations * std_dev
            }
            Self::Pattern {
                substring,
                min_matches,
            } => {
                let needle = substring.to_lowercase();
                let matches = evidence
                    .iter()
                    .filter_map(Evidence::detail)
                    .filter(|detail| detail.to_lowercase().contains(&needle))
                    .count();
                matches >= *min_matches
            }
            Self::Cascade {
                min_agents,
                outcome,
            } => {
                let affected: HashSet<&str> = evidence
                    .iter()
                    .filter(|e| e.outcome() == *outcome)
                    .map(|e| e.agent().as_str())
                    .collect();
                affected.len() >= *min_agents
            }
        }
    }

    /// Returns the agents whose evidence satisfied the condition, sorted by
    /// name.
    ///
    /// Follow-up actions such as quarantine target these agents, not the
    /// agent whose operation happened to trigger evaluation.
    #[must_use]
    pub fn implicated(&self, evidence: &[Evidence]) -> Vec<AgentName> {
        let mut agents = BTreeSet::new();
        match self {
            Self::Threshold { metric, .. } | Self::Anomaly { metric, .. } => {
                if let Some(latest) = evidence.iter().rev().find(|e| e.metric(metric).is_some()) {
                    agents.insert(latest.agent().clone());
                }
            }
            Self::Pattern { substring, .. } => {
                let needle = substring.to_lowercase();
                for record in evidence {
                    if record
                        .detail()
                        .is_some_and(|detail| detail.to_lowercase().contains(&needle))
                    {
                        agents.insert(record.agent().clone());
                    }
                }
            }
            Self::Cascade { outcome, .. } => {
                for record in evidence.iter().filter(|e| e.outcome() == *outcome) {
                    agents.insert(record.agent().clone());
                }
            }
        }
        agents.into_iter().collect()
    }
}

/// A registered alert rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    id: String,
    name: String,
    condition: AlertCondition,
    severity: AlertSeverity,
    cooldown: Duration,
}

impl AlertRule {
    /// Creates a validated rule.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::InvalidRule`] when the id or name is empty or
    /// the condition parameters are out of range.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        condition: AlertCondition,
        severity: AlertSeverity,
        cooldown: Duration,
    ) -> AlertResult<Self> {
        let id = id.into();
        let name = name.into();
        if id.trim().is_empty() {
            return Err(AlertError::InvalidRule("rule id cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(AlertError::InvalidRule("rule name cannot be empty"));
        }
        condition.validate()?;

        Ok(Self {
            id,
            name,
            condition,
            severity,
            cooldown,
        })
    }

    /// Re-validates the rule, for instances produced by deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::InvalidRule`] under the same conditions as
    /// [`AlertRule::new`].
    pub fn validate(&self) -> AlertResult<()> {
        if self.id.trim().is_empty() {
            return Err(AlertError::InvalidRule("rule id cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(AlertError::InvalidRule("rule name cannot be empty"));
        }
        self.condition.validate()
    }

    /// Returns the rule identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the condition.
    #[must_use]
    pub fn condition(&self) -> &AlertCondition {
        &self.condition
    }

    /// Returns the severity.
    #[must_use]
    pub fn severity(&self) -> AlertSeverity {
        self.severity
    }

    /// Returns the cooldown applied after the rule fires.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heimdall_primitives::AgentName;

    fn evidence(agent: &str, outcome: OperationOutcome) -> Evidence {
        Evidence::new(AgentName::new(agent).unwrap(), outcome)
    }

    #[test]
    fn threshold_uses_latest_metric() {
        let condition = AlertCondition::Threshold {
            metric: "error_rate".into(),
            op: MetricOp::Gt,
            value: 0.3,
        };
        let batch = vec![
            evidence("odin", OperationOutcome::Success).with_metric("error_rate", 0.9),
            evidence("odin", OperationOutcome::Success).with_metric("error_rate", 0.1),
        ];
        // Latest value (0.1) is under the bound even though an older one is
        // not.
        assert!(!condition.matches(&batch));

        let batch = vec![
            evidence("odin", OperationOutcome::Success).with_metric("error_rate", 0.1),
            evidence("odin", OperationOutcome::Error).with_metric("error_rate", 0.5),
        ];
        assert!(condition.matches(&batch));
    }

    #[test]
    fn anomaly_requires_baseline_and_spread() {
        let condition = AlertCondition::Anomaly {
            metric: "latency_ms".into(),
            min_samples: 3,
            deviations: 2.0,
        };

        let mut batch: Vec<Evidence> = [100.0, 102.0, 98.0]
            .iter()
            .map(|v| evidence("thor", OperationOutcome::Success).with_metric("latency_ms", *v))
            .collect();
        batch.push(evidence("thor", OperationOutcome::Success).with_metric("latency_ms", 900.0));
        assert!(condition.matches(&batch));

        // Flat baseline never matches.
        let mut flat: Vec<Evidence> = [100.0, 100.0, 100.0]
            .iter()
            .map(|v| evidence("thor", OperationOutcome::Success).with_metric("latency_ms", *v))
            .collect();
        flat.push(evidence("thor", OperationOutcome::Success).with_metric("latency_ms", 900.0));
        assert!(!condition.matches(&flat));

        // Too few baseline samples.
        let short = vec![
            evidence("thor", OperationOutcome::Success).with_metric("latency_ms", 100.0),
            evidence("thor", OperationOutcome::Success).with_metric("latency_ms", 900.0),
        ];
        assert!(!condition.matches(&short));
    }

    #[test]
    fn pattern_counts_case_insensitive_matches() {
        let condition = AlertCondition::Pattern {
            substring: "timeout".into(),
            min_matches: 2,
        };
        let batch = vec![
            evidence("freya", OperationOutcome::Timeout).with_detail("Upstream TIMEOUT"),
            evidence("freya", OperationOutcome::Error).with_detail("bad gateway"),
            evidence("freya", OperationOutcome::Timeout).with_detail("timeout waiting for lock"),
        ];
        assert!(condition.matches(&batch));
        assert!(!condition.matches(&batch[..2]));
    }

    #[test]
    fn cascade_counts_distinct_agents() {
        let condition = AlertCondition::Cascade {
            min_agents: 2,
            outcome: OperationOutcome::Error,
        };
        let same_agent = vec![
            evidence("odin", OperationOutcome::Error),
            evidence("odin", OperationOutcome::Error),
        ];
        assert!(!condition.matches(&same_agent));

        let spread = vec![
            evidence("odin", OperationOutcome::Error),
            evidence("thor", OperationOutcome::Error),
            evidence("freya", OperationOutcome::Success),
        ];
        assert!(condition.matches(&spread));
    }

    #[test]
    fn cascade_implicates_only_affected_agents() {
        let condition = AlertCondition::Cascade {
            min_agents: 2,
            outcome: OperationOutcome::Error,
        };
        let batch = vec![
            evidence("loki", OperationOutcome::Error),
            evidence("thor", OperationOutcome::Error),
            evidence("odin", OperationOutcome::Success),
        ];

        let implicated = condition.implicated(&batch);
        assert_eq!(
            implicated,
            vec![
                AgentName::new("loki").unwrap(),
                AgentName::new("thor").unwrap()
            ]
        );
    }

    #[test]
    fn threshold_implicates_the_latest_metric_carrier() {
        let condition = AlertCondition::Threshold {
            metric: "error_rate".into(),
            op: MetricOp::Ge,
            value: 0.5,
        };
        let batch = vec![
            evidence("odin", OperationOutcome::Error).with_metric("error_rate", 0.9),
            evidence("loki", OperationOutcome::Error).with_metric("error_rate", 1.0),
            evidence("freya", OperationOutcome::Success).with_detail("no metrics here"),
        ];

        let implicated = condition.implicated(&batch);
        assert_eq!(implicated, vec![AgentName::new("loki").unwrap()]);
    }

    #[test]
    fn rule_validation_rejects_bad_parameters() {
        assert!(AlertRule::new(
            "",
            "x",
            AlertCondition::Cascade {
                min_agents: 1,
                outcome: OperationOutcome::Error
            },
            AlertSeverity::Warning,
            Duration::from_secs(60),
        )
        .is_err());

        assert!(AlertRule::new(
            "r1",
            "bad anomaly",
            AlertCondition::Anomaly {
                metric: "m".into(),
                min_samples: 0,
                deviations: 2.0
            },
            AlertSeverity::Warning,
            Duration::from_secs(60),
        )
        .is_err());

        assert!(AlertRule::new(
            "r2",
            "bad threshold",
            AlertCondition::Threshold {
                metric: " ".into(),
                op: MetricOp::Gt,
                value: 1.0
            },
            AlertSeverity::Info,
            Duration::from_secs(60),
        )
        .is_err());
    }

    #[test]
    fn severities_are_ordered() {
        assert!(AlertSeverity::Emergency > AlertSeverity::Critical);
        assert!(AlertSeverity::Critical > AlertSeverity::Warning);
        assert!(AlertSeverity::Warning > AlertSeverity::Info);
    }
}
