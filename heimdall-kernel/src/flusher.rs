//! Periodic persistence of monitor snapshots.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use heimdall_store::SnapshotStore;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::HeimdallKernel;

/// Background task that captures a [`MonitorSnapshot`] on a fixed interval
/// and writes it to a [`SnapshotStore`].
///
/// The interval comes from the kernel's `snapshot_interval` setting. Persist
/// failures are logged and the loop keeps going. Shutdown is graceful: an
/// in-flight persist always runs to completion, so the journal never ends on
/// a partial line.
///
/// [`MonitorSnapshot`]: heimdall_store::MonitorSnapshot
pub struct SnapshotFlusher {
    stop: Arc<AtomicBool>,
    notify: Arc<Notify>,
    worker: JoinHandle<()>,
}

impl fmt::Debug for SnapshotFlusher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotFlusher")
            .field("stop", &self.stop.load(Ordering::Relaxed))
            .field("finished", &self.worker.is_finished())
            .finish()
    }
}

impl SnapshotFlusher {
    /// Spawns the flush loop on the current tokio runtime.
    #[must_use]
    pub fn spawn(kernel: Arc<HeimdallKernel>, store: Arc<dyn SnapshotStore>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());
        let worker = tokio::spawn(run_flush_loop(
            kernel,
            store,
            Arc::clone(&stop),
            Arc::clone(&notify),
        ));
        Self {
            stop,
            notify,
            worker,
        }
    }

    /// Signals the loop to stop and waits for the worker to finish.
    ///
    /// Any persist already underway completes before this returns.
    pub async fn shutdown(self) {
        self.stop.store(true, Ordering::Release);
        self.notify.notify_one();
        if self.worker.await.is_err() {
            warn!("snapshot flusher worker panicked");
        }
    }
}

async fn run_flush_loop(
    kernel: Arc<HeimdallKernel>,
    store: Arc<dyn SnapshotStore>,
    stop: Arc<AtomicBool>,
    notify: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(kernel.config().snapshot_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so the initial snapshot
    // lands one interval after spawn.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            () = notify.notified() => break,
        }
        if stop.load(Ordering::Acquire) {
            break;
        }

        let snapshot = kernel.snapshot().await;
        match store.persist(&snapshot).await {
            Ok(()) => {
                debug!(
                    breakers = snapshot.breakers.len(),
                    quarantined = snapshot.quarantined.len(),
                    "monitor snapshot persisted"
                );
            }
            Err(error) => {
                warn!(%error, "failed to persist monitor snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use heimdall_config::MonitorConfig;
    use heimdall_store::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn flusher_persists_on_interval() {
        let mut config = MonitorConfig::default();
        config.snapshot_interval = Duration::from_millis(20);

        let kernel = Arc::new(HeimdallKernel::new(config).await.unwrap());
        let store = Arc::new(MemoryStore::new());
        let flusher = SnapshotFlusher::spawn(Arc::clone(&kernel), store.clone());

        tokio::time::sleep(Duration::from_millis(120)).await;
        flusher.shutdown().await;

        let persisted = store.load_latest().await.unwrap();
        assert!(persisted.is_some());
    }

    #[tokio::test]
    async fn shutdown_returns_without_waiting_for_the_interval() {
        let mut config = MonitorConfig::default();
        config.snapshot_interval = Duration::from_secs(3600);

        let kernel = Arc::new(HeimdallKernel::new(config).await.unwrap());
        let store = Arc::new(MemoryStore::new());
        let flusher = SnapshotFlusher::spawn(kernel, store);

        tokio::time::timeout(Duration::from_secs(1), flusher.shutdown())
            .await
            .expect("shutdown must not block on the next tick");
    }
}
