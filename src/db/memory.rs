use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::db::SharedListStore;
use crate::error::{AppError, AppResult};
use crate::models::{MovieId, RatingsMap, SharedListDocument};

/// Process-local shared list store
///
/// Used when no Redis is configured and in tests. It can be flipped into an
/// unavailable mode in which every call fails.
#[derive(Clone, Default)]
pub struct MemoryListStore {
    document: Arc<RwLock<Option<SharedListDocument>>>,
    unavailable: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with an existing document
    pub fn with_document(document: SharedListDocument) -> Self {
        Self {
            document: Arc::new(RwLock::new(Some(document))),
            ..Self::default()
        }
    }

    /// Current stored document, `None` if never created
    pub async fn snapshot(&self) -> Option<SharedListDocument> {
        self.document.read().await.clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful field writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    async fn update<F>(&self, apply: F) -> AppResult<()>
    where
        F: FnOnce(&mut SharedListDocument) + Send,
    {
        self.check_available()?;
        let mut guard = self.document.write().await;
        apply(guard.get_or_insert_with(SharedListDocument::default));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait::async_trait]
impl SharedListStore for MemoryListStore {
    async fn load_or_create(&self) -> AppResult<SharedListDocument> {
        self.check_available()?;
        let mut guard = self.document.write().await;
        Ok(guard.get_or_insert_with(SharedListDocument::default).clone())
    }

    async fn replace_favorites(&self, favorites: &[MovieId]) -> AppResult<()> {
        let favorites = favorites.to_vec();
        self.update(move |doc| doc.favorites = favorites).await
    }

    async fn replace_seen(&self, seen: &[MovieId]) -> AppResult<()> {
        let seen = seen.to_vec();
        self.update(move |doc| doc.seen = seen).await
    }

    async fn replace_ratings(&self, ratings: &RatingsMap) -> AppResult<()> {
        let ratings = ratings.clone();
        self.update(move |doc| doc.ratings = ratings).await
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
