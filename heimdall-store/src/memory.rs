//! In-memory snapshot store.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::snapshot::MonitorSnapshot;
use crate::{SnapshotStore, StoreResult};

/// Store keeping only the latest snapshot in memory.
///
/// Useful for tests and deployments that accept losing state on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    latest: Mutex<Option<MonitorSnapshot>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn persist(&self, snapshot: &MonitorSnapshot) -> StoreResult<()> {
        *self.latest.lock().await = Some(snapshot.clone());
        Ok(())
    }

    async fn load_latest(&self) -> StoreResult<Option<MonitorSnapshot>> {
        Ok(self.latest.lock().await.clone())
    }

    async fn clear(&self) -> StoreResult<()> {
        *self.latest.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_only_latest() {
        let store = MemoryStore::new();
        assert!(store.load_latest().await.unwrap().is_none());

        let first = MonitorSnapshot::empty();
        store.persist(&first).await.unwrap();
        let second = MonitorSnapshot::empty();
        store.persist(&second).await.unwrap();

        let loaded = store.load_latest().await.unwrap().unwrap();
        assert_eq!(loaded.captured_at, second.captured_at);

        store.clear().await.unwrap();
        assert!(store.load_latest().await.unwrap().is_none());
    }
}
