//! A2AWatch: drift detection over agent-to-agent message traffic.
//!
//! A bounded rolling log of inter-agent messages is scored per sender/receiver
//! pair with three heuristics: repeated payloads, elevated error ratio, and
//! latency growth across the log.

#![warn(missing_docs, clippy::pedantic)]

mod message;
mod watch;

pub use message::A2aMessage;
pub use watch::{A2aWatch, DriftAssessment, DriftSignal, DriftSignalKind};

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for drift operations.
pub type DriftResult<T> = Result<T, DriftError>;

/// Errors surfaced by the drift watch.
#[derive(Debug, Error)]
pub enum DriftError {
    /// Configuration failed validation.
    #[error("invalid drift configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Configuration for [`A2aWatch`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Messages retained in the rolling log.
    pub log_capacity: NonZeroUsize,
    /// Minimum messages for a pair before drift is assessed.
    pub min_samples: usize,
    /// Repeated-payload ratio treated as fully drifted.
    pub repeat_threshold: f64,
    /// Error ratio treated as fully drifted.
    pub error_threshold: f64,
    /// Latency growth factor (late mean over early mean) treated as fully
    /// drifted.
    pub latency_growth_threshold: f64,
    /// Combined score at or above which a pair counts as drifting.
    pub score_threshold: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            log_capacity: NonZeroUsize::new(256).expect("non-zero"),
            min_samples: 10,
            repeat_threshold: 0.5,
            error_threshold: 0.3,
            latency_growth_threshold: 2.0,
            score_threshold: 0.5,
        }
    }
}

impl DriftConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DriftError::InvalidConfig`] when ratios leave `[0, 1]`, the
    /// growth threshold is not above 1, or `min_samples` is zero.
    pub fn validate(&self) -> DriftResult<()> {
        if self.min_samples == 0 {
            return Err(DriftError::InvalidConfig(
                "min_samples must be greater than zero",
            ));
        }
        for ratio in [
            self.repeat_threshold,
            self.error_threshold,
            self.score_threshold,
        ] {
            if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) || ratio == 0.0 {
                return Err(DriftError::InvalidConfig(
                    "ratio thresholds must lie in (0, 1]",
                ));
            }
        }
        if !self.latency_growth_threshold.is_finite() || self.latency_growth_threshold <= 1.0 {
            return Err(DriftError::InvalidConfig(
                "latency growth threshold must exceed 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        DriftConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_degenerate_thresholds() {
        let mut config = DriftConfig::default();
        config.latency_growth_threshold = 1.0;
        assert!(config.validate().is_err());

        let mut config = DriftConfig::default();
        config.min_samples = 0;
        assert!(config.validate().is_err());

        let mut config = DriftConfig::default();
        config.error_threshold = 0.0;
        assert!(config.validate().is_err());
    }
}
