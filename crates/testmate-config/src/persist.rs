//! Fire-and-forget settings writes
//!
//! Migration persists values without making the caller wait. Each write runs
//! as a detached task on the ambient tokio runtime; a failure is logged and
//! otherwise forgotten. Persistence is therefore eventual, not transactional:
//! a crash between writing the new key and clearing the old one leaves both
//! populated, and the next resolution migrates again.
//!
//! [`DetachedWrites::settle`] waits for everything spawned so far. Nothing
//! on the resolution path calls it; it exists for shutdown and tests.

use futures::future::join_all;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use testmate_settings::StoreError;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Tracker for detached persistence tasks
#[derive(Debug, Clone, Default)]
pub struct DetachedWrites {
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl DetachedWrites {
    /// Create empty tracker
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `write` in the background; `what` names it in the log on failure
    ///
    /// Without a tokio runtime the write cannot run and is dropped with an
    /// error log.
    pub fn spawn<F>(&self, what: impl Into<String>, write: F)
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let what = what.into();
        let Ok(handle) = Handle::try_current() else {
            tracing::error!(write = %what, "no async runtime; settings write dropped");
            return;
        };

        let task = handle.spawn(async move {
            match write.await {
                Ok(()) => tracing::trace!(write = %what, "settings write done"),
                Err(error) => tracing::error!(write = %what, %error, "settings write failed"),
            }
        });

        let mut pending = self.pending.lock();
        pending.retain(|task| !task.is_finished());
        pending.push(task);
    }

    /// Number of writes not yet finished
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.lock().iter().filter(|t| !t.is_finished()).count()
    }

    /// Wait until every write spawned so far has finished
    pub async fn settle(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.pending.lock());
            if tasks.is_empty() {
                return;
            }
            for result in join_all(tasks).await {
                if let Err(error) = result {
                    tracing::error!(%error, "settings write task aborted");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn settle_waits_for_all_writes() {
        let writes = DetachedWrites::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            writes.spawn("counter", async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        writes.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(writes.pending(), 0);
    }

    #[tokio::test]
    async fn failed_write_is_swallowed() {
        let writes = DetachedWrites::new();
        writes.spawn("failing", async {
            Err(StoreError::rejected(
                "k",
                testmate_settings::Scope::Global,
                "nope",
            ))
        });
        writes.settle().await;
        assert_eq!(writes.pending(), 0);
    }

    #[test]
    fn without_runtime_write_is_dropped() {
        let writes = DetachedWrites::new();
        writes.spawn("orphan", async { Ok(()) });
        assert_eq!(writes.pending(), 0);
    }
}
