pub mod memory;
pub mod redis;
pub mod view_store;

pub use self::memory::MemoryListStore;
pub use self::redis::create_redis_client;
pub use self::redis::DocumentField;
pub use self::redis::RedisListStore;
pub use self::view_store::{FileViewStore, MemoryViewStore, ViewStore};

use crate::{
    error::AppResult,
    models::{MovieId, Person, RatingsMap, SharedListDocument, StarRating},
};

/// Storage for the single shared list document
///
/// Writes replace one top-level field at a time. There is no concurrency
/// token: two writers racing on the same field end with the last write.
#[async_trait::async_trait]
pub trait SharedListStore: Send + Sync {
    /// Reads the whole document, creating it with empty lists if absent
    async fn load_or_create(&self) -> AppResult<SharedListDocument>;

    async fn replace_favorites(&self, favorites: &[MovieId]) -> AppResult<()>;

    async fn replace_seen(&self, seen: &[MovieId]) -> AppResult<()>;

    async fn replace_ratings(&self, ratings: &RatingsMap) -> AppResult<()>;

    /// Merges one person's rating into the stored ratings map
    ///
    /// Read-modify-write over the whole `ratings` field: a rating written by
    /// another client between the read and the write is lost.
    async fn merge_rating(
        &self,
        movie_id: MovieId,
        person: Person,
        rating: StarRating,
    ) -> AppResult<RatingsMap> {
        let mut ratings = self.load_or_create().await?.ratings;
        ratings.entry(movie_id).or_default().set(person, rating);
        self.replace_ratings(&ratings).await?;
        Ok(ratings)
    }

    /// Store name for logging
    fn name(&self) -> &'static str;
}
