//! Advisory quarantine for misbehaving agents.

use std::collections::HashMap;
use std::time::SystemTime;

use heimdall_primitives::AgentName;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ProtocolError, ProtocolResult};

/// One quarantine record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    /// Why the agent was isolated.
    pub reason: String,
    /// When the quarantine was imposed.
    pub imposed_at: SystemTime,
}

/// Set of quarantined agents.
///
/// Quarantine is advisory: it blocks gating decisions but does not touch the
/// breaker state, and it persists until explicitly released.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineList {
    entries: HashMap<AgentName, QuarantineEntry>,
}

impl QuarantineList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Quarantines an agent; a repeated call refreshes the reason and
    /// timestamp.
    pub fn impose(&mut self, agent: AgentName, reason: impl Into<String>) {
        let reason = reason.into();
        info!(agent = %agent, reason = %reason, "agent quarantined");
        self.entries.insert(
            agent,
            QuarantineEntry {
                reason,
                imposed_at: SystemTime::now(),
            },
        );
    }

    /// Releases a quarantined agent.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotQuarantined`] when the agent is not held.
    pub fn release(&mut self, agent: &AgentName) -> ProtocolResult<QuarantineEntry> {
        let entry = self
            .entries
            .remove(agent)
            .ok_or_else(|| ProtocolError::NotQuarantined {
                agent: agent.clone(),
            })?;
        info!(agent = %agent, "agent released from quarantine");
        Ok(entry)
    }

    /// Returns the quarantine entry for an agent, if held.
    #[must_use]
    pub fn get(&self, agent: &AgentName) -> Option<&QuarantineEntry> {
        self.entries.get(agent)
    }

    /// Returns `true` when the agent is held.
    #[must_use]
    pub fn contains(&self, agent: &AgentName) -> bool {
        self.entries.contains_key(agent)
    }

    /// Returns all held agents with their entries, sorted by agent name.
    #[must_use]
    pub fn entries(&self) -> Vec<(AgentName, QuarantineEntry)> {
        let mut out: Vec<_> = self
            .entries
            .iter()
            .map(|(agent, entry)| (agent.clone(), entry.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Returns the number of held agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str) -> AgentName {
        AgentName::new(name).unwrap()
    }

    #[test]
    fn impose_and_release() {
        let mut list = QuarantineList::new();
        list.impose(agent("loki"), "cascade risk");
        assert!(list.contains(&agent("loki")));

        let entry = list.release(&agent("loki")).unwrap();
        assert_eq!(entry.reason, "cascade risk");
        assert!(list.is_empty());
    }

    #[test]
    fn release_of_free_agent_fails() {
        let mut list = QuarantineList::new();
        assert!(matches!(
            list.release(&agent("odin")),
            Err(ProtocolError::NotQuarantined { .. })
        ));
    }

    #[test]
    fn reimpose_refreshes_reason() {
        let mut list = QuarantineList::new();
        list.impose(agent("loki"), "first");
        list.impose(agent("loki"), "second");
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(&agent("loki")).unwrap().reason, "second");
    }
}
