//! Three-state circuit breaker.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ProtocolError, ProtocolResult};

/// Breaker thresholds and timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures while closed that trip the breaker.
    pub failure_threshold: u32,
    /// Successes while half-open required to close again.
    pub success_threshold: u32,
    /// Time an open breaker waits before probing half-open.
    pub open_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(30),
        }
    }
}

impl BreakerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidConfig`] when a threshold or the
    /// timeout is zero.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.failure_threshold == 0 {
            return Err(ProtocolError::InvalidConfig(
                "failure threshold must be greater than zero",
            ));
        }
        if self.success_threshold == 0 {
            return Err(ProtocolError::InvalidConfig(
                "success threshold must be greater than zero",
            ));
        }
        if self.open_timeout.is_zero() {
            return Err(ProtocolError::InvalidConfig(
                "open timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// States a breaker can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Operations flow normally; failures are counted.
    Closed,
    /// Operations are blocked until the open timeout elapses.
    Open,
    /// A limited probe period; successes close, any failure reopens.
    HalfOpen,
}

impl BreakerState {
    /// Returns `true` when operations may proceed.
    #[must_use]
    pub const fn allows_operations(self) -> bool {
        matches!(self, Self::Closed | Self::HalfOpen)
    }
}

/// Per-agent circuit breaker state machine.
///
/// The open-to-half-open transition happens lazily at check time once the
/// open timeout has elapsed, so callers drive all timing explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: BreakerState,
    consecutive_failures: u32,
    half_open_successes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    opened_at: Option<SystemTime>,
}

impl CircuitBreaker {
    /// Creates a closed breaker with the supplied configuration.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: BreakerState::Closed,
            consecutive_failures: 0,
            half_open_successes: 0,
            opened_at: None,
        }
    }

    /// Returns the current state without applying timing transitions.
    #[must_use]
    pub const fn state(&self) -> BreakerState {
        self.state
    }

    /// Applies the timing transition and returns the effective state now.
    pub fn check(&mut self) -> BreakerState {
        self.check_at(SystemTime::now())
    }

    /// Applies the timing transition against an explicit clock.
    pub fn check_at(&mut self, now: SystemTime) -> BreakerState {
        if self.state == BreakerState::Open {
            let elapsed = self
                .opened_at
                .and_then(|at| now.duration_since(at).ok())
                .is_some_and(|d| d >= self.config.open_timeout);
            if elapsed {
                debug!("breaker probing half-open");
                self.state = BreakerState::HalfOpen;
                self.half_open_successes = 0;
            }
        }
        self.state
    }

    /// Records an operation result, stamped now.
    pub fn record_result(&mut self, ok: bool) {
        self.record_result_at(ok, SystemTime::now());
    }

    /// Records an operation result against an explicit clock.
    pub fn record_result_at(&mut self, ok: bool, now: SystemTime) {
        match self.state {
            BreakerState::Closed => {
                if ok {
                    self.consecutive_failures = 0;
                } else {
                    self.consecutive_failures += 1;
                    if self.consecutive_failures >= self.config.failure_threshold {
                        debug!(
                            failures = self.consecutive_failures,
                            "breaker tripped open"
                        );
                        self.state = BreakerState::Open;
                        self.opened_at = Some(now);
                    }
                }
            }
            // Results from in-flight work that raced the trip carry no
            // signal while open.
            BreakerState::Open => {}
            BreakerState::HalfOpen => {
                if ok {
                    self.half_open_successes += 1;
                    if self.half_open_successes >= self.config.success_threshold {
                        debug!("breaker closed after successful probes");
                        self.state = BreakerState::Closed;
                        self.consecutive_failures = 0;
                        self.half_open_successes = 0;
                        self.opened_at = None;
                    }
                } else {
                    debug!("half-open probe failed; breaker reopened");
                    self.state = BreakerState::Open;
                    self.opened_at = Some(now);
                    self.half_open_successes = 0;
                }
            }
        }
    }
}
