//! Gjallarhorn protocol: failure isolation for monitored agents.
//!
//! Combines a per-agent three-state circuit breaker with an advisory
//! quarantine list and a bounded remediation work queue.

#![warn(missing_docs, clippy::pedantic)]

mod breaker;
mod protocol;
mod quarantine;
mod remediation;

pub use breaker::{BreakerConfig, BreakerState, CircuitBreaker};
pub use protocol::{GateDecision, GjallarhornProtocol, ProtocolConfig};
pub use quarantine::{QuarantineEntry, QuarantineList};
pub use remediation::{RemediationInstruction, RemediationQueue};

use thiserror::Error;

/// Result alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors surfaced by the protocol layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Configuration failed validation.
    #[error("invalid protocol configuration: {0}")]
    InvalidConfig(&'static str),
    /// The agent is not quarantined.
    #[error("agent `{agent}` is not quarantined")]
    NotQuarantined {
        /// The agent whose release was requested.
        agent: heimdall_primitives::AgentName,
    },
}
