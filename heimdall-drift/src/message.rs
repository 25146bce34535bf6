//! Agent-to-agent message records.

use std::time::{Duration, SystemTime};

use bytes::Bytes;
use heimdall_primitives::AgentName;
use serde::{Deserialize, Serialize};

/// One observed agent-to-agent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct A2aMessage {
    from: AgentName,
    to: AgentName,
    payload: Bytes,
    latency: Duration,
    ok: bool,
    sent_at: SystemTime,
}

impl A2aMessage {
    /// Creates a successful message record stamped now.
    #[must_use]
    pub fn new(from: AgentName, to: AgentName, payload: Bytes) -> Self {
        Self {
            from,
            to,
            payload,
            latency: Duration::ZERO,
            ok: true,
            sent_at: SystemTime::now(),
        }
    }

    /// Sets the observed delivery latency.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Marks the message as failed.
    #[must_use]
    pub fn failed(mut self) -> Self {
        self.ok = false;
        self
    }

    /// Overrides the send timestamp.
    #[must_use]
    pub fn sent_at(mut self, at: SystemTime) -> Self {
        self.sent_at = at;
        self
    }

    /// Returns the sending agent.
    #[must_use]
    pub fn from(&self) -> &AgentName {
        &self.from
    }

    /// Returns the receiving agent.
    #[must_use]
    pub fn to(&self) -> &AgentName {
        &self.to
    }

    /// Returns the message payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Returns the delivery latency.
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Returns `true` when delivery succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Returns when the message was sent.
    #[must_use]
    pub fn when(&self) -> SystemTime {
        self.sent_at
    }
}
