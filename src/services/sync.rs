use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::db::SharedListStore;
use crate::error::AppResult;
use crate::models::{MovieId, Person, StarRating};

/// One best-effort write against the shared document
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOp {
    ReplaceFavorites(Vec<MovieId>),
    ReplaceSeen(Vec<MovieId>),
    MergeRating {
        movie_id: MovieId,
        person: Person,
        rating: StarRating,
    },
}

impl SyncOp {
    /// The part of the shared document this operation overwrites
    pub fn target(&self) -> SyncTarget {
        match self {
            SyncOp::ReplaceFavorites(_) => SyncTarget::Favorites,
            SyncOp::ReplaceSeen(_) => SyncTarget::Seen,
            SyncOp::MergeRating { movie_id, .. } => SyncTarget::Rating(*movie_id),
        }
    }
}

/// A piece of the shared document that can fall behind local state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTarget {
    Favorites,
    Seen,
    Rating(MovieId),
}

enum SyncMessage {
    Op(SyncOp),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Synced,
    Syncing,
    /// Some failed write has not been superseded; the store is behind
    Diverged,
}

/// Visible health of the background persistence
///
/// A target stays in `diverged` until a later write to that same target
/// succeeds. Writing seen never vouches for favorites.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStatus {
    pub pending: usize,
    pub applied: u64,
    pub failed: u64,
    pub diverged: BTreeSet<SyncTarget>,
    pub last_error: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl SyncStatus {
    pub fn state(&self) -> SyncState {
        if !self.diverged.is_empty() {
            SyncState::Diverged
        } else if self.pending > 0 {
            SyncState::Syncing
        } else {
            SyncState::Synced
        }
    }

    /// Marks `targets` as behind local state
    pub fn record_failure(
        &mut self,
        targets: impl IntoIterator<Item = SyncTarget>,
        error: String,
    ) {
        self.failed += 1;
        self.diverged.extend(targets);
        self.last_error = Some(error);
    }

    fn record_success(&mut self, target: SyncTarget) {
        self.applied += 1;
        self.last_synced_at = Some(Utc::now());
        if self.diverged.remove(&target) && self.diverged.is_empty() {
            self.last_error = None;
        }
    }
}

/// Fire-and-forget writer for the shared document
///
/// Local state is authoritative for the session. Operations are queued and
/// applied in order by one background task; failures are logged and recorded
/// in [`SyncStatus`] but never retried or rolled back.
#[derive(Clone)]
pub struct SyncWriter {
    write_tx: mpsc::UnboundedSender<SyncMessage>,
    status: Arc<Mutex<SyncStatus>>,
}

/// Handle for gracefully shutting down the sync writer
pub struct SyncHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Stops the writer after applying everything already queued
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Sync writer shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Sync writer task failed");
        }
    }
}

impl SyncWriter {
    /// Creates a writer and spawns its background task
    pub fn spawn(store: Arc<dyn SharedListStore>) -> (Self, SyncHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let status = Arc::new(Mutex::new(SyncStatus::default()));

        let task_status = status.clone();
        let task = tokio::spawn(async move {
            Self::writer_task(store, task_status, write_rx, shutdown_rx).await;
        });

        (
            Self { write_tx, status },
            SyncHandle { shutdown_tx, task },
        )
    }

    pub fn replace_favorites(&self, favorites: Vec<MovieId>) {
        self.enqueue(SyncOp::ReplaceFavorites(favorites));
    }

    pub fn replace_seen(&self, seen: Vec<MovieId>) {
        self.enqueue(SyncOp::ReplaceSeen(seen));
    }

    pub fn merge_rating(&self, movie_id: MovieId, person: Person, rating: StarRating) {
        self.enqueue(SyncOp::MergeRating {
            movie_id,
            person,
            rating,
        });
    }

    /// Waits until every operation queued before this call has been attempted
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.write_tx.send(SyncMessage::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.lock_status().clone()
    }

    /// Records a failure that happened outside the writer, e.g. on initial load
    pub fn record_failure(
        &self,
        targets: impl IntoIterator<Item = SyncTarget>,
        error: String,
    ) {
        self.lock_status().record_failure(targets, error);
    }

    fn enqueue(&self, op: SyncOp) {
        let target = op.target();
        self.lock_status().pending += 1;

        if let Err(e) = self.write_tx.send(SyncMessage::Op(op)) {
            tracing::error!(error = %e, "Failed to queue shared list write");
            let mut status = self.lock_status();
            status.pending = status.pending.saturating_sub(1);
            status.record_failure([target], "sync writer stopped".to_string());
        }
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, SyncStatus> {
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Background task applying queued operations in order
    async fn writer_task(
        store: Arc<dyn SharedListStore>,
        status: Arc<Mutex<SyncStatus>>,
        mut write_rx: mpsc::UnboundedReceiver<SyncMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(store = store.name(), "Sync writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    Self::handle(store.as_ref(), &status, msg).await;
                }
                Some(()) = shutdown_rx.recv() => {
                    let pending = status.lock().map(|s| s.pending).unwrap_or_default();
                    tracing::info!(pending = pending, "Sync writer shutting down, flushing remaining writes");

                    while let Ok(msg) = write_rx.try_recv() {
                        Self::handle(store.as_ref(), &status, msg).await;
                    }

                    tracing::info!("Sync writer task stopped");
                    break;
                }
                else => break,
            }
        }
    }

    async fn handle(store: &dyn SharedListStore, status: &Mutex<SyncStatus>, msg: SyncMessage) {
        match msg {
            SyncMessage::Flush(done) => {
                let _ = done.send(());
            }
            SyncMessage::Op(op) => {
                let result = Self::apply(store, &op).await;
                let mut status = status.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                status.pending = status.pending.saturating_sub(1);
                match result {
                    Ok(()) => status.record_success(op.target()),
                    Err(e) => {
                        tracing::error!(error = %e, op = ?op, "Failed to persist shared list change");
                        status.record_failure([op.target()], e.to_string());
                    }
                }
            }
        }
    }

    async fn apply(store: &dyn SharedListStore, op: &SyncOp) -> AppResult<()> {
        match op {
            SyncOp::ReplaceFavorites(ids) => store.replace_favorites(ids).await,
            SyncOp::ReplaceSeen(ids) => store.replace_seen(ids).await,
            SyncOp::MergeRating {
                movie_id,
                person,
                rating,
            } => store
                .merge_rating(*movie_id, *person, *rating)
                .await
                .map(|_| ()),
        }
    }
}
