//! Configuration for the telemetry watch.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{TelemetryError, TelemetryResult};

/// Status cutoffs applied to the computed health figures.
///
/// A snapshot is `Critical` when any figure crosses the critical cutoff,
/// `Unhealthy` when any crosses the unhealthy cutoff, `Degraded` when any
/// crosses the degraded cutoff, and `Healthy` otherwise. Score and success
/// cutoffs are lower bounds; error cutoffs are upper bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    /// Overall score below which an agent is at best degraded.
    pub degraded_score: f64,
    /// Overall score below which an agent is at best unhealthy.
    pub unhealthy_score: f64,
    /// Overall score below which an agent is critical.
    pub critical_score: f64,
    /// Success rate below which an agent is at best degraded.
    pub degraded_success_rate: f64,
    /// Success rate below which an agent is at best unhealthy.
    pub unhealthy_success_rate: f64,
    /// Success rate below which an agent is critical.
    pub critical_success_rate: f64,
    /// Error rate above which an agent is at best degraded.
    pub degraded_error_rate: f64,
    /// Error rate above which an agent is at best unhealthy.
    pub unhealthy_error_rate: f64,
    /// Error rate above which an agent is critical.
    pub critical_error_rate: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            degraded_score: 0.8,
            unhealthy_score: 0.6,
            critical_score: 0.4,
            degraded_success_rate: 0.9,
            unhealthy_success_rate: 0.7,
            critical_success_rate: 0.5,
            degraded_error_rate: 0.1,
            unhealthy_error_rate: 0.3,
            critical_error_rate: 0.5,
        }
    }
}

impl StatusThresholds {
    /// Validates cutoff ordering and ranges.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfig`] when any cutoff lies outside
    /// `[0, 1]` or the cutoffs are not ordered by severity.
    pub fn validate(&self) -> TelemetryResult<()> {
        let all = [
            self.degraded_score,
            self.unhealthy_score,
            self.critical_score,
            self.degraded_success_rate,
            self.unhealthy_success_rate,
            self.critical_success_rate,
            self.degraded_error_rate,
            self.unhealthy_error_rate,
            self.critical_error_rate,
        ];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0 || *v > 1.0) {
            return Err(TelemetryError::InvalidConfig(
                "status cutoffs must lie in [0, 1]",
            ));
        }
        if !(self.critical_score <= self.unhealthy_score
            && self.unhealthy_score <= self.degraded_score)
        {
            return Err(TelemetryError::InvalidConfig(
                "score cutoffs must be ordered critical <= unhealthy <= degraded",
            ));
        }
        if !(self.critical_success_rate <= self.unhealthy_success_rate
            && self.unhealthy_success_rate <= self.degraded_success_rate)
        {
            return Err(TelemetryError::InvalidConfig(
                "success cutoffs must be ordered critical <= unhealthy <= degraded",
            ));
        }
        if !(self.degraded_error_rate <= self.unhealthy_error_rate
            && self.unhealthy_error_rate <= self.critical_error_rate)
        {
            return Err(TelemetryError::InvalidConfig(
                "error cutoffs must be ordered degraded <= unhealthy <= critical",
            ));
        }
        Ok(())
    }
}

/// Configuration for [`BifrostWatch`](crate::BifrostWatch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Maximum spans retained per agent.
    pub ring_capacity: NonZeroUsize,
    /// Trailing window over which health is scored.
    pub scoring_window: Duration,
    /// Latency at or above which the latency term bottoms out.
    pub latency_ceiling: Duration,
    /// Status classification cutoffs.
    pub thresholds: StatusThresholds,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ring_capacity: NonZeroUsize::new(100).expect("non-zero"),
            scoring_window: Duration::from_secs(3600),
            latency_ceiling: Duration::from_millis(2000),
            thresholds: StatusThresholds::default(),
        }
    }
}

impl WatchConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfig`] when a duration is zero or
    /// the thresholds are inconsistent.
    pub fn validate(&self) -> TelemetryResult<()> {
        if self.scoring_window.is_zero() {
            return Err(TelemetryError::InvalidConfig(
                "scoring window must be greater than zero",
            ));
        }
        if self.latency_ceiling.is_zero() {
            return Err(TelemetryError::InvalidConfig(
                "latency ceiling must be greater than zero",
            ));
        }
        self.thresholds.validate()
    }
}
