use burrow_core::{ShortCode, UrlRepository};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

/// Hands hit-count increments to a background worker.
///
/// Recording a hit never waits on storage. The worker applies increments one
/// at a time with a read-modify-write through the repository, so a single
/// tracker never loses its own updates. When the queue is full new hits are
/// dropped; the counter is best-effort.
///
/// The worker runs until every clone of the tracker has been dropped.
#[derive(Debug, Clone)]
pub struct HitTracker {
    tx: mpsc::Sender<ShortCode>,
}

impl HitTracker {
    /// Starts the worker on the current tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `repository` - Store whose `hit_count` fields are incremented
    /// * `capacity` - Maximum number of queued increments (at least 1)
    pub fn spawn<R: UrlRepository>(repository: Arc<R>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(run(repository, rx));
        Self { tx }
    }

    /// Queues one hit for `code`.
    pub fn record(&self, code: &ShortCode) {
        match self.tx.try_send(code.clone()) {
            Ok(()) => trace!(code = %code, "queued hit"),
            Err(TrySendError::Full(_)) => {
                debug!(code = %code, "hit queue full, dropping hit");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(code = %code, "hit worker stopped, dropping hit");
            }
        }
    }
}

async fn run<R: UrlRepository>(repository: Arc<R>, mut rx: mpsc::Receiver<ShortCode>) {
    while let Some(code) = rx.recv().await {
        increment(repository.as_ref(), &code).await;
    }
    debug!("hit worker stopped");
}

async fn increment<R: UrlRepository>(repository: &R, code: &ShortCode) {
    let mut record = match repository.find_by_code(code).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            trace!(code = %code, "record gone before hit was applied");
            return;
        }
        Err(e) => {
            warn!(code = %code, error = %e, "failed to load record for hit");
            return;
        }
    };

    record.hit_count = record.hit_count.saturating_add(1);
    if let Err(e) = repository.save(record).await {
        warn!(code = %code, error = %e, "failed to save hit count");
    }
}
