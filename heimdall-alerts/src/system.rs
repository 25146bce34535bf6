//! The Gjallarhorn alert engine.

use std::collections::HashMap;
use std::time::SystemTime;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::alert::{Alert, AlertId};
use crate::evidence::Evidence;
use crate::rule::AlertRule;
use crate::{AlertError, AlertResult};

/// Alerts retained in the engine's history, active and resolved combined.
const ALERT_HISTORY_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct EngineState {
    last_fired: HashMap<String, SystemTime>,
    alerts: Vec<Alert>,
}

impl EngineState {
    /// Drops the oldest entries once the history exceeds its cap, taking
    /// resolved alerts before active ones.
    fn prune(&mut self) {
        while self.alerts.len() > ALERT_HISTORY_CAPACITY {
            let index = self
                .alerts
                .iter()
                .position(|alert| !alert.is_active())
                .unwrap_or(0);
            let dropped = self.alerts.remove(index);
            debug!(alert_id = %dropped.id(), "alert pruned from history");
        }
    }
}

/// Rule registry and evaluator with per-rule cooldowns.
///
/// Rules are evaluated in insertion order. A rule that matches while within
/// its cooldown of the previous firing is suppressed; suppression does not
/// refresh the cooldown clock. The alert history is bounded; once it exceeds
/// its cap the oldest resolved alerts are dropped first.
#[derive(Debug, Default)]
pub struct GjallarhornAlerts {
    rules: RwLock<Vec<AlertRule>>,
    state: RwLock<EngineState>,
}

impl GjallarhornAlerts {
    /// Constructs an engine with no rules registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule, keeping insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::DuplicateRule`] when a rule with the same id is
    /// already present.
    pub async fn add_rule(&self, rule: AlertRule) -> AlertResult<()> {
        let mut guard = self.rules.write().await;
        if guard.iter().any(|existing| existing.id() == rule.id()) {
            return Err(AlertError::DuplicateRule {
                id: rule.id().to_owned(),
            });
        }
        guard.push(rule);
        Ok(())
    }

    /// Returns a copy of the registered rules.
    #[must_use]
    pub async fn rules(&self) -> Vec<AlertRule> {
        self.rules.read().await.clone()
    }

    /// Evaluates a batch of evidence against every rule, stamped now.
    ///
    /// Returns the alerts fired by this batch.
    pub async fn evaluate(&self, evidence: &[Evidence]) -> Vec<Alert> {
        self.evaluate_at(evidence, SystemTime::now()).await
    }

    /// Evaluates a batch of evidence with an explicit clock, for
    /// deterministic replay.
    pub async fn evaluate_at(&self, evidence: &[Evidence], now: SystemTime) -> Vec<Alert> {
        let rules = self.rules.read().await;
        let mut state = self.state.write().await;
        let mut fired = Vec::new();

        for rule in rules.iter() {
            if !rule.condition().matches(evidence) {
                continue;
            }

            let within_cooldown = state
                .last_fired
                .get(rule.id())
                .and_then(|last| now.duration_since(*last).ok())
                .is_some_and(|elapsed| elapsed < rule.cooldown());
            if within_cooldown {
                debug!(rule = rule.id(), "alert suppressed by cooldown");
                continue;
            }

            let alert = Alert::fire(
                rule.id(),
                rule.severity(),
                format!("{}: {}", rule.name(), rule.condition().label()),
                evidence.to_vec(),
                rule.condition().implicated(evidence),
                now,
            );
            info!(
                rule = rule.id(),
                severity = ?rule.severity(),
                alert_id = %alert.id(),
                "alert fired"
            );
            state.last_fired.insert(rule.id().to_owned(), now);
            state.alerts.push(alert.clone());
            fired.push(alert);
        }
        state.prune();

        fired
    }

    /// Returns all currently active alerts.
    #[must_use]
    pub async fn active_alerts(&self) -> Vec<Alert> {
        self.state
            .read()
            .await
            .alerts
            .iter()
            .filter(|alert| alert.is_active())
            .cloned()
            .collect()
    }

    /// Resolves an active alert, recording the operator note.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::UnknownAlert`] when no alert has the supplied
    /// id, or [`AlertError::AlreadyResolved`] when it was resolved before.
    pub async fn resolve(&self, id: AlertId, note: impl Into<String>) -> AlertResult<Alert> {
        let mut state = self.state.write().await;
        let alert = state
            .alerts
            .iter_mut()
            .find(|alert| alert.id() == id)
            .ok_or(AlertError::UnknownAlert { id })?;
        if !alert.is_active() {
            return Err(AlertError::AlreadyResolved { id });
        }
        alert.mark_resolved(note.into(), SystemTime::now());
        Ok(alert.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use heimdall_primitives::{AgentName, OperationOutcome};

    use crate::rule::{AlertCondition, AlertSeverity, MetricOp};

    async fn engine_with_threshold_rule(cooldown: Duration) -> GjallarhornAlerts {
        let engine = GjallarhornAlerts::new();
        let rule = AlertRule::new(
            "high-error-rate",
            "High error rate",
            AlertCondition::Threshold {
                metric: "error_rate".into(),
                op: MetricOp::Gt,
                value: 0.5,
            },
            AlertSeverity::Critical,
            cooldown,
        )
        .unwrap();
        engine.add_rule(rule).await.unwrap();
        engine
    }

    fn failing_evidence() -> Vec<Evidence> {
        vec![
            Evidence::new(AgentName::new("loki").unwrap(), OperationOutcome::Error)
                .with_metric("error_rate", 0.8),
        ]
    }

    #[tokio::test]
    async fn firing_records_active_alert() {
        let engine = GjallarhornAlerts::new();
        engine
            .add_rule(
                AlertRule::new(
                    "high-error-rate",
                    "High error rate",
                    AlertCondition::Threshold {
                        metric: "error_rate".into(),
                        op: MetricOp::Gt,
                        value: 0.5,
                    },
                    AlertSeverity::Critical,
                    Duration::from_secs(300),
                )
                .unwrap(),
            )
            .await
            .unwrap();

        let fired = engine.evaluate(&failing_evidence()).await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].severity(), AlertSeverity::Critical);
        assert_eq!(engine.active_alerts().await.len(), 1);
    }

    #[tokio::test]
    async fn cooldown_suppresses_refire() {
        let engine = engine_with_threshold_rule(Duration::from_secs(300)).await;
        let start = SystemTime::now();

        let first = engine.evaluate_at(&failing_evidence(), start).await;
        assert_eq!(first.len(), 1);

        // Matching evidence inside the cooldown never re-fires.
        let inside = engine
            .evaluate_at(&failing_evidence(), start + Duration::from_secs(100))
            .await;
        assert!(inside.is_empty());

        // Suppression did not refresh the clock: the rule fires again once
        // the original cooldown elapses.
        let after = engine
            .evaluate_at(&failing_evidence(), start + Duration::from_secs(301))
            .await;
        assert_eq!(after.len(), 1);
    }

    #[tokio::test]
    async fn alert_history_is_bounded() {
        let engine = engine_with_threshold_rule(Duration::ZERO).await;
        for _ in 0..(ALERT_HISTORY_CAPACITY + 20) {
            let fired = engine.evaluate(&failing_evidence()).await;
            engine.resolve(fired[0].id(), "handled").await.unwrap();
        }
        // The newest firing stays active and survives pruning.
        engine.evaluate(&failing_evidence()).await;

        let state = engine.state.read().await;
        assert!(state.alerts.len() <= ALERT_HISTORY_CAPACITY);
        assert!(state.alerts.iter().any(Alert::is_active));
    }

    #[tokio::test]
    async fn duplicate_rule_ids_are_rejected() {
        let engine = engine_with_threshold_rule(Duration::from_secs(60)).await;
        let duplicate = AlertRule::new(
            "high-error-rate",
            "Copy",
            AlertCondition::Cascade {
                min_agents: 1,
                outcome: OperationOutcome::Error,
            },
            AlertSeverity::Info,
            Duration::from_secs(60),
        )
        .unwrap();
        assert!(matches!(
            engine.add_rule(duplicate).await,
            Err(AlertError::DuplicateRule { .. })
        ));
    }

    #[tokio::test]
    async fn resolve_is_single_shot() {
        let engine = engine_with_threshold_rule(Duration::from_secs(60)).await;
        let fired = engine.evaluate(&failing_evidence()).await;
        let id = fired[0].id();

        let resolved = engine.resolve(id, "agent restarted").await.unwrap();
        assert!(!resolved.is_active());
        assert!(engine.active_alerts().await.is_empty());

        assert!(matches!(
            engine.resolve(id, "again").await,
            Err(AlertError::AlreadyResolved { .. })
        ));
        assert!(matches!(
            engine.resolve(AlertId::random(), "ghost").await,
            Err(AlertError::UnknownAlert { .. })
        ));
    }
}
