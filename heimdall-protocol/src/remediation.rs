//! Remediation work queue.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::time::SystemTime;

use heimdall_primitives::AgentName;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Advisory instruction telling an operator (or automation) how to heal an
/// agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationInstruction {
    /// Agent the instruction targets.
    pub agent: AgentName,
    /// What should be done (restart, reload memory, rotate credentials...).
    pub directive: String,
    /// When the instruction was issued.
    pub issued_at: SystemTime,
}

impl RemediationInstruction {
    /// Creates an instruction stamped now.
    #[must_use]
    pub fn new(agent: AgentName, directive: impl Into<String>) -> Self {
        Self {
            agent,
            directive: directive.into(),
            issued_at: SystemTime::now(),
        }
    }
}

/// Bounded FIFO of remediation instructions.
///
/// When full, the oldest instruction is dropped; remediation is advisory, so
/// losing stale entries is preferable to unbounded growth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationQueue {
    capacity: NonZeroUsize,
    queue: VecDeque<RemediationInstruction>,
}

impl RemediationQueue {
    /// Creates a queue with the supplied capacity.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            queue: VecDeque::with_capacity(capacity.get()),
        }
    }

    /// Enqueues an instruction, dropping the oldest entry when full.
    pub fn push(&mut self, instruction: RemediationInstruction) {
        if self.queue.len() == self.capacity.get() {
            if let Some(dropped) = self.queue.pop_front() {
                warn!(
                    agent = %dropped.agent,
                    directive = %dropped.directive,
                    "remediation queue full; dropped oldest instruction"
                );
            }
        }
        self.queue.push_back(instruction);
    }

    /// Removes and returns up to `limit` instructions, oldest first.
    pub fn drain(&mut self, limit: usize) -> Vec<RemediationInstruction> {
        let take = limit.min(self.queue.len());
        self.queue.drain(..take).collect()
    }

    /// Returns the queue length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` when the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns a snapshot of the pending instructions, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<RemediationInstruction> {
        self.queue.iter().cloned().collect()
    }
}

impl Default for RemediationQueue {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(128).expect("non-zero"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str) -> AgentName {
        AgentName::new(name).unwrap()
    }

    #[test]
    fn drains_in_fifo_order() {
        let mut queue = RemediationQueue::default();
        queue.push(RemediationInstruction::new(agent("odin"), "restart"));
        queue.push(RemediationInstruction::new(agent("thor"), "reload"));

        let drained = queue.drain(5);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].agent, agent("odin"));
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_drops_oldest() {
        let mut queue = RemediationQueue::new(NonZeroUsize::new(2).unwrap());
        queue.push(RemediationInstruction::new(agent("a"), "one"));
        queue.push(RemediationInstruction::new(agent("b"), "two"));
        queue.push(RemediationInstruction::new(agent("c"), "three"));

        assert_eq!(queue.len(), 2);
        let drained = queue.drain(2);
        assert_eq!(drained[0].directive, "two");
        assert_eq!(drained[1].directive, "three");
    }

    #[test]
    fn drain_respects_limit() {
        let mut queue = RemediationQueue::default();
        for i in 0..5 {
            queue.push(RemediationInstruction::new(agent("a"), format!("d{i}")));
        }
        let first = queue.drain(2);
        assert_eq!(first.len(), 2);
        assert_eq!(queue.len(), 3);
    }
}
