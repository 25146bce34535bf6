//! Health scoring over telemetry spans.

use std::time::{Duration, SystemTime};

use heimdall_primitives::{AgentName, OperationOutcome, TelemetrySpan};
use serde::{Deserialize, Serialize};

use crate::config::{StatusThresholds, WatchConfig};

/// Weights of the overall-score formula.
const W_SUCCESS: f64 = 0.4;
const W_ERROR: f64 = 0.3;
const W_LATENCY: f64 = 0.15;
const W_INTEGRITY: f64 = 0.15;

/// Four-level health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// All figures within nominal bounds.
    Healthy,
    /// At least one figure crossed the degraded cutoff.
    Degraded,
    /// At least one figure crossed the unhealthy cutoff.
    Unhealthy,
    /// At least one figure crossed the critical cutoff.
    Critical,
}

impl HealthStatus {
    /// Classifies a set of health figures against the configured cutoffs.
    ///
    /// Classification is monotonic: raising the success rate or lowering the
    /// error rate (with the score moving accordingly) can never produce a
    /// worse label.
    #[must_use]
    pub fn classify(
        overall: f64,
        success_rate: f64,
        error_rate: f64,
        thresholds: &StatusThresholds,
    ) -> Self {
        if overall < thresholds.critical_score
            || success_rate < thresholds.critical_success_rate
            || error_rate > thresholds.critical_error_rate
        {
            Self::Critical
        } else if overall < thresholds.unhealthy_score
            || success_rate < thresholds.unhealthy_success_rate
            || error_rate > thresholds.unhealthy_error_rate
        {
            Self::Unhealthy
        } else if overall < thresholds.degraded_score
            || success_rate < thresholds.degraded_success_rate
            || error_rate > thresholds.degraded_error_rate
        {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }

    /// Returns `true` for `Unhealthy` and `Critical`.
    #[must_use]
    pub const fn is_failing(self) -> bool {
        matches!(self, Self::Unhealthy | Self::Critical)
    }
}

/// Point-in-time health snapshot for one agent.
///
/// Derived entirely from the spans inside the scoring window; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentHealth {
    /// Agent the snapshot describes.
    pub agent: AgentName,
    /// Classified status.
    pub status: HealthStatus,
    /// Weighted overall score in `[0, 1]`.
    pub overall_score: f64,
    /// Fraction of in-window operations that succeeded.
    pub success_rate: f64,
    /// Fraction of in-window operations that failed (errors plus timeouts).
    pub error_rate: f64,
    /// Mean latency of in-window operations, in milliseconds.
    pub avg_latency_ms: f64,
    /// Cognitive integrity input used for the score.
    pub cognitive_integrity: f64,
    /// Successful operations in the window.
    pub successes: u64,
    /// Errored operations in the window.
    pub errors: u64,
    /// Timed-out operations in the window.
    pub timeouts: u64,
    /// Moment the snapshot was computed.
    pub computed_at: SystemTime,
}

impl AgentHealth {
    /// Total operations observed inside the window.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.successes + self.errors + self.timeouts
    }
}

/// Computes a health snapshot from the spans whose end time falls inside the
/// trailing scoring window.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn score_spans<'a>(
    agent: &AgentName,
    spans: impl Iterator<Item = &'a TelemetrySpan>,
    cognitive_integrity: f64,
    now: SystemTime,
    config: &WatchConfig,
) -> AgentHealth {
    let window_start = now
        .checked_sub(config.scoring_window)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut successes: u64 = 0;
    let mut errors: u64 = 0;
    let mut timeouts: u64 = 0;
    let mut latency_sum = Duration::ZERO;

    for span in spans.filter(|span| span.ended() >= window_start) {
        match span.outcome() {
            OperationOutcome::Success => successes += 1,
            OperationOutcome::Error => errors += 1,
            OperationOutcome::Timeout => timeouts += 1,
        }
        latency_sum += span.latency();
    }

    let total = successes + errors + timeouts;
    let (success_rate, error_rate, avg_latency_ms) = if total == 0 {
        // No data: neutral figures rather than treating silence as failure.
        (1.0, 0.0, 0.0)
    } else {
        (
            successes as f64 / total as f64,
            (errors + timeouts) as f64 / total as f64,
            latency_sum.as_secs_f64() * 1000.0 / total as f64,
        )
    };

    let latency_ceiling_ms = config.latency_ceiling.as_secs_f64() * 1000.0;
    let latency_term = 1.0 - (avg_latency_ms / latency_ceiling_ms).min(1.0);
    let overall = W_SUCCESS * success_rate
        + W_ERROR * (1.0 - error_rate)
        + W_LATENCY * latency_term
        + W_INTEGRITY * cognitive_integrity;

    AgentHealth {
        agent: agent.clone(),
        status: HealthStatus::classify(overall, success_rate, error_rate, &config.thresholds),
        overall_score: overall,
        success_rate,
        error_rate,
        avg_latency_ms,
        cognitive_integrity,
        successes,
        errors,
        timeouts,
        computed_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heimdall_primitives::TelemetrySpan;

    fn agent() -> AgentName {
        AgentName::new("thor").unwrap()
    }

    fn span_with(
        outcome: OperationOutcome,
        latency: Duration,
        ended: SystemTime,
    ) -> TelemetrySpan {
        TelemetrySpan::builder(agent(), "op")
            .started_at(ended - latency)
            .ended_at(ended)
            .outcome(outcome)
            .build()
            .unwrap()
    }

    #[test]
    fn outcome_counts_partition_total() {
        let now = SystemTime::now();
        let spans = vec![
            span_with(OperationOutcome::Success, Duration::from_millis(10), now),
            span_with(OperationOutcome::Error, Duration::from_millis(10), now),
            span_with(OperationOutcome::Timeout, Duration::from_millis(10), now),
            span_with(OperationOutcome::Success, Duration::from_millis(10), now),
        ];

        let health = score_spans(&agent(), spans.iter(), 1.0, now, &WatchConfig::default());
        assert_eq!(health.total(), 4);
        assert_eq!(health.successes, 2);
        assert_eq!(health.errors, 1);
        assert_eq!(health.timeouts, 1);
        let rate_sum = health.success_rate + health.error_rate;
        assert!((rate_sum - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn spans_outside_window_are_ignored() {
        let now = SystemTime::now();
        let stale = now - Duration::from_secs(7200);
        let spans = vec![
            span_with(OperationOutcome::Error, Duration::from_millis(10), stale),
            span_with(OperationOutcome::Success, Duration::from_millis(10), now),
        ];

        let health = score_spans(&agent(), spans.iter(), 1.0, now, &WatchConfig::default());
        assert_eq!(health.total(), 1);
        assert_eq!(health.errors, 0);
        assert_eq!(health.status, HealthStatus::Healthy);
    }

    #[test]
    fn all_success_low_latency_scores_one() {
        let now = SystemTime::now();
        let spans = vec![span_with(
            OperationOutcome::Success,
            Duration::ZERO,
            now,
        )];
        let health = score_spans(&agent(), spans.iter(), 1.0, now, &WatchConfig::default());
        assert!((health.overall_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_window_reports_neutral_healthy() {
        let now = SystemTime::now();
        let health = score_spans(&agent(), std::iter::empty(), 1.0, now, &WatchConfig::default());
        assert_eq!(health.total(), 0);
        assert_eq!(health.status, HealthStatus::Healthy);
    }

    #[test]
    fn classification_is_monotonic_in_rates() {
        let thresholds = StatusThresholds::default();
        let mut previous = HealthStatus::Critical;
        // Sweep success upward with error downward; the label must never get
        // worse from one step to the next.
        for step in 0..=20 {
            let success = f64::from(step) / 20.0;
            let error = 1.0 - success;
            let overall = W_SUCCESS * success + W_ERROR * (1.0 - error) + W_LATENCY + W_INTEGRITY;
            let status = HealthStatus::classify(overall, success, error, &thresholds);
            assert!(status <= previous, "status worsened at step {step}");
            previous = status;
        }
        assert_eq!(previous, HealthStatus::Healthy);
    }

    #[test]
    fn high_latency_degrades_score() {
        let now = SystemTime::now();
        let spans = vec![span_with(
            OperationOutcome::Success,
            Duration::from_millis(4000),
            now,
        )];
        let health = score_spans(&agent(), spans.iter(), 1.0, now, &WatchConfig::default());
        // Latency term bottoms out: 0.4 + 0.3 + 0.0 + 0.15.
        assert!((health.overall_score - 0.85).abs() < 1e-9);
        assert_eq!(health.status, HealthStatus::Healthy);
    }
}
