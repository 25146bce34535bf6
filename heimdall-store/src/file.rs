//! File-backed snapshot store writing newline-delimited JSON.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::warn;

use crate::snapshot::MonitorSnapshot;
use crate::{SnapshotStore, StoreResult};

/// Append-only NDJSON journal of snapshots; the last line wins on load.
pub struct FileSnapshotStore {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl FileSnapshotStore {
    /// Opens (or creates) a snapshot journal at the provided path.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors encountered while preparing the file.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Returns the underlying journal path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn persist(&self, snapshot: &MonitorSnapshot) -> StoreResult<()> {
        let line = serde_json::to_vec(snapshot)?;
        let mut guard = self.file.lock().await;
        guard.write_all(&line).await?;
        guard.write_u8(b'\n').await?;
        guard.flush().await?;
        Ok(())
    }

    async fn load_latest(&self) -> StoreResult<Option<MonitorSnapshot>> {
        let data = fs::read(&self.path).await?;
        // A crash can leave a truncated tail line; scan backwards to the
        // newest line that still parses.
        for chunk in data
            .split(|byte| *byte == b'\n')
            .rev()
            .filter(|chunk| !chunk.is_empty())
        {
            match serde_json::from_slice(chunk) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(error) => {
                    warn!(path = %self.path.display(), %error, "skipping corrupt snapshot line");
                }
            }
        }
        Ok(None)
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut guard = self.file.lock().await;
        guard.rewind().await?;
        guard.set_len(0).await?;
        guard.flush().await?;
        Ok(())
    }
}
