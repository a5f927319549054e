use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::db::SharedListStore;
use crate::error::{AppError, AppResult};
use crate::models::{MovieId, MovieRating, Person, RatingsMap, SharedListDocument, StarRating};
use crate::services::sync::{SyncTarget, SyncWriter};

/// Result of toggling a favorite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteToggle {
    Added,
    Removed,
    /// Seen movies cannot be favorites; nothing changed
    AlreadySeen,
}

/// Serializable view of the shared lists
#[derive(Debug, Clone, Serialize)]
pub struct ListsSnapshot {
    pub favorites: Vec<MovieId>,
    pub seen: Vec<MovieId>,
    pub ratings: RatingsMap,
}

/// Local source of truth for favorites, seen and ratings
///
/// Every mutation updates local state first and then queues the changed
/// field(s) on the [`SyncWriter`]. Favorites and seen are kept disjoint.
pub struct SharedLists {
    favorites: Vec<MovieId>,
    seen: Vec<MovieId>,
    ratings: RatingsMap,
    sync: SyncWriter,
}

impl SharedLists {
    pub fn from_document(mut document: SharedListDocument, sync: SyncWriter) -> Self {
        if document.normalize() {
            tracing::warn!("Shared document had overlapping or duplicate ids, normalized locally");
        }

        Self {
            favorites: document.favorites,
            seen: document.seen,
            ratings: document.ratings,
            sync,
        }
    }

    /// Reads the shared document once; a failing store yields empty lists
    pub async fn load(store: &dyn SharedListStore, sync: SyncWriter) -> Self {
        match store.load_or_create().await {
            Ok(document) => {
                tracing::info!(
                    favorites = document.favorites.len(),
                    seen = document.seen.len(),
                    ratings = document.ratings.len(),
                    store = store.name(),
                    "Loaded shared lists"
                );
                Self::from_document(document, sync)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load shared lists, starting empty");
                // whole-field writes from empty lists would clobber the remote ones
                sync.record_failure([SyncTarget::Favorites, SyncTarget::Seen], e.to_string());
                Self::from_document(SharedListDocument::default(), sync)
            }
        }
    }

    pub fn favorites(&self) -> &[MovieId] {
        &self.favorites
    }

    pub fn seen(&self) -> &[MovieId] {
        &self.seen
    }

    pub fn ratings(&self) -> &RatingsMap {
        &self.ratings
    }

    pub fn rating(&self, movie_id: MovieId) -> MovieRating {
        self.ratings.get(&movie_id).copied().unwrap_or_default()
    }

    pub fn is_favorite(&self, movie_id: MovieId) -> bool {
        self.favorites.contains(&movie_id)
    }

    pub fn is_seen(&self, movie_id: MovieId) -> bool {
        self.seen.contains(&movie_id)
    }

    /// 1-based position in the favorites ranking
    pub fn rank_of(&self, movie_id: MovieId) -> Option<usize> {
        self.favorites
            .iter()
            .position(|id| *id == movie_id)
            .map(|i| i + 1)
    }

    pub fn sync(&self) -> &SyncWriter {
        &self.sync
    }

    pub fn snapshot(&self) -> ListsSnapshot {
        ListsSnapshot {
            favorites: self.favorites.clone(),
            seen: self.seen.clone(),
            ratings: self.ratings.clone(),
        }
    }

    /// Moves a movie from favorites to seen and persists both lists
    pub fn mark_seen(&mut self, movie_id: MovieId) {
        self.favorites.retain(|id| *id != movie_id);
        if !self.seen.contains(&movie_id) {
            self.seen.push(movie_id);
        }

        tracing::info!(movie_id = movie_id, "Marked movie as seen");
        self.sync.replace_favorites(self.favorites.clone());
        self.sync.replace_seen(self.seen.clone());
    }

    pub fn toggle_favorite(&mut self, movie_id: MovieId) -> FavoriteToggle {
        let outcome = if self.favorites.contains(&movie_id) {
            self.favorites.retain(|id| *id != movie_id);
            FavoriteToggle::Removed
        } else if self.seen.contains(&movie_id) {
            tracing::debug!(movie_id = movie_id, "Refusing to favorite a seen movie");
            return FavoriteToggle::AlreadySeen;
        } else {
            self.favorites.push(movie_id);
            FavoriteToggle::Added
        };

        self.sync.replace_favorites(self.favorites.clone());
        outcome
    }

    /// Returns true if the movie was a favorite
    pub fn remove_favorite(&mut self, movie_id: MovieId) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|id| *id != movie_id);
        self.sync.replace_favorites(self.favorites.clone());
        before != self.favorites.len()
    }

    /// Returns true if the movie was seen
    pub fn remove_seen(&mut self, movie_id: MovieId) -> bool {
        let before = self.seen.len();
        self.seen.retain(|id| *id != movie_id);
        self.sync.replace_seen(self.seen.clone());
        before != self.seen.len()
    }

    /// Moves the favorite at `from` to `to` and persists the whole ranking
    pub fn reorder(&mut self, from: usize, to: usize) -> AppResult<()> {
        let len = self.favorites.len();
        if from >= len || to >= len {
            return Err(AppError::InvalidInput(format!(
                "Cannot move favorite {} to {} in a list of {}",
                from, to, len
            )));
        }

        let id = self.favorites.remove(from);
        self.favorites.insert(to, id);

        tracing::debug!(movie_id = id, from = from, to = to, "Reordered favorites");
        self.sync.replace_favorites(self.favorites.clone());
        Ok(())
    }

    /// Moves `active` to the position currently held by `over`
    pub fn move_favorite(&mut self, active: MovieId, over: MovieId) -> AppResult<()> {
        let position = |id: MovieId| {
            self.favorites
                .iter()
                .position(|f| *f == id)
                .ok_or_else(|| AppError::NotFound(format!("Movie {} is not a favorite", id)))
        };
        let from = position(active)?;
        let to = position(over)?;

        if from == to {
            return Ok(());
        }
        self.reorder(from, to)
    }

    /// Records one person's rating locally and queues a merge into the store
    pub fn rate(&mut self, movie_id: MovieId, person: Person, rating: StarRating) -> MovieRating {
        let entry = self.ratings.entry(movie_id).or_default();
        entry.set(person, rating);
        let updated = *entry;

        tracing::info!(
            movie_id = movie_id,
            person = %person,
            rating = rating.value(),
            "Rated movie"
        );
        self.sync.merge_rating(movie_id, person, rating);
        updated
    }

    /// Up to `count` random ids for the hero banner
    ///
    /// Draws from favorites, or from seen when there are no favorites.
    pub fn banner_ids<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<MovieId> {
        let source = if self.favorites.is_empty() {
            &self.seen
        } else {
            &self.favorites
        };
        source.choose_multiple(rng, count).copied().collect()
    }
}
