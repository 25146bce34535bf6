//! Persistence seam for HEIMDALL monitor state.
//!
//! The monitor itself is in-memory; a [`SnapshotStore`] lets deployments
//! carry breaker, quarantine, alert, and causal state across restarts.

#![warn(missing_docs, clippy::pedantic)]

mod file;
mod memory;
mod snapshot;

pub use file::FileSnapshotStore;
pub use memory::MemoryStore;
pub use snapshot::{BreakerEntry, MonitorSnapshot, QuarantinedAgent};

use async_trait::async_trait;
use thiserror::Error;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by snapshot stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure.
    #[error("snapshot store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot (de)serialization failure.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait implemented by snapshot persistence backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persists a snapshot.
    async fn persist(&self, snapshot: &MonitorSnapshot) -> StoreResult<()>;

    /// Returns the most recently persisted snapshot, if any.
    async fn load_latest(&self) -> StoreResult<Option<MonitorSnapshot>>;

    /// Removes all persisted snapshots.
    async fn clear(&self) -> StoreResult<()>;
}
