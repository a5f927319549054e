//! Movie metadata provider abstraction
//!
//! The dashboard only talks to the metadata service through this trait, so
//! tests and alternative catalogues can stand in for TMDB.
use std::future::Future;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{
        DiscoverQuery, Genre, MovieDetails, MovieId, MovieImages, MovieSummary, Page,
        ReleaseDatesResponse, WatchProvidersResponse,
    },
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Certification shown when a region has no rating or the lookup fails
pub const UNRATED_CERTIFICATION: &str = "L";

/// Genre names hidden from the genre picker
pub const HIDDEN_GENRE_NAMES: [&str; 2] = ["Música", "Music"];

/// Trait for movie metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch one movie summary by id
    async fn movie(&self, id: MovieId) -> AppResult<MovieSummary>;

    /// Fetch the full record with cast, watch providers and videos
    async fn movie_details(&self, id: MovieId) -> AppResult<MovieDetails>;

    /// Free-text title search
    async fn search(&self, query: &str, page: u32) -> AppResult<Page<MovieSummary>>;

    /// Popularity-ordered listing with filters
    async fn discover(&self, query: &DiscoverQuery) -> AppResult<Page<MovieSummary>>;

    async fn genres(&self) -> AppResult<Vec<Genre>>;

    async fn images(&self, id: MovieId) -> AppResult<MovieImages>;

    async fn release_dates(&self, id: MovieId) -> AppResult<ReleaseDatesResponse>;

    /// Streaming, rental and purchase options keyed by country
    async fn watch_providers(&self, id: MovieId) -> AppResult<WatchProvidersResponse>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Outcome of resolving many ids against the provider
#[derive(Debug)]
pub struct Resolved<T> {
    /// Resolved records in the order of the requested ids
    pub items: Vec<T>,
    pub failed: Vec<MovieId>,
}

/// Fetches one record per id in parallel
///
/// One failing id never affects the others; failures are logged and
/// reported back. Output order follows `ids`, not completion order.
async fn resolve_each<T, F, Fut>(
    provider: Arc<dyn MetadataProvider>,
    ids: &[MovieId],
    fetch: F,
) -> Resolved<T>
where
    T: Send + 'static,
    F: Fn(Arc<dyn MetadataProvider>, MovieId) -> Fut,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
{
    let mut tasks = Vec::with_capacity(ids.len());

    for &id in ids {
        let task = tokio::spawn(fetch(provider.clone(), id));
        tasks.push((id, task));
    }

    let mut resolved = Resolved {
        items: Vec::with_capacity(ids.len()),
        failed: Vec::new(),
    };

    for (id, task) in tasks {
        match task.await {
            Ok(Ok(item)) => resolved.items.push(item),
            Ok(Err(e)) => {
                tracing::warn!(movie_id = id, error = %e, "Movie lookup failed");
                resolved.failed.push(id);
            }
            Err(e) => {
                tracing::error!(movie_id = id, error = %e, "Task join error");
                resolved.failed.push(id);
            }
        }
    }

    if !resolved.failed.is_empty() {
        tracing::warn!(
            success_count = resolved.items.len(),
            error_count = resolved.failed.len(),
            provider = provider.name(),
            "Partial movie resolution failure"
        );
    }

    resolved
}

/// Resolves ids to summaries, isolating failures per id
pub async fn resolve_movies(
    provider: Arc<dyn MetadataProvider>,
    ids: &[MovieId],
) -> Resolved<MovieSummary> {
    resolve_each(provider, ids, |p, id| async move { p.movie(id).await }).await
}

/// Resolves ids to full details, isolating failures per id
pub async fn resolve_details(
    provider: Arc<dyn MetadataProvider>,
    ids: &[MovieId],
) -> Resolved<MovieDetails> {
    resolve_each(provider, ids, |p, id| async move { p.movie_details(id).await }).await
}

/// Region certification for a movie, or [`UNRATED_CERTIFICATION`]
///
/// Never fails: lookup errors are logged and degrade to the sentinel.
pub async fn certification(provider: &dyn MetadataProvider, id: MovieId, region: &str) -> String {
    match provider.release_dates(id).await {
        Ok(response) => response
            .certification_for(region)
            .unwrap_or(UNRATED_CERTIFICATION)
            .to_string(),
        Err(e) => {
            tracing::warn!(movie_id = id, error = %e, "Certification lookup failed");
            UNRATED_CERTIFICATION.to_string()
        }
    }
}

/// Genres offered for browsing, without the hidden ones
pub fn visible_genres(genres: Vec<Genre>) -> Vec<Genre> {
    genres
        .into_iter()
        .filter(|g| !HIDDEN_GENRE_NAMES.contains(&g.name.as_str()))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::movie;
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_resolve_movies_isolates_failures_and_keeps_order() {
        let mut mock = MockMetadataProvider::new();
        mock.expect_movie().returning(|id| {
            if id == 2 {
                Err(AppError::ExternalApi("TMDB API returned status 404".into()))
            } else {
                Ok(movie(id))
            }
        });
        mock.expect_name().return_const("mock");

        let resolved = resolve_movies(Arc::new(mock), &[3, 2, 1]).await;

        let ids: Vec<_> = resolved.items.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(resolved.failed, vec![2]);
    }

    #[tokio::test]
    async fn test_resolve_movies_empty() {
        let mock = MockMetadataProvider::new();
        let resolved = resolve_movies(Arc::new(mock), &[]).await;
        assert!(resolved.items.is_empty());
        assert!(resolved.failed.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_details_all_failing() {
        let mut mock = MockMetadataProvider::new();
        mock.expect_movie_details()
            .returning(|_| Err(AppError::ExternalApi("down".into())));
        mock.expect_name().return_const("mock");

        let resolved = resolve_details(Arc::new(mock), &[5, 6]).await;
        assert!(resolved.items.is_empty());
        assert_eq!(resolved.failed, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_certification_falls_back_on_error() {
        let mut mock = MockMetadataProvider::new();
        mock.expect_release_dates()
            .returning(|_| Err(AppError::ExternalApi("boom".into())));

        assert_eq!(certification(&mock, 1, "BR").await, "L");
    }

    #[tokio::test]
    async fn test_certification_falls_back_when_region_missing() {
        let mut mock = MockMetadataProvider::new();
        mock.expect_release_dates().returning(|_| {
            Ok(serde_json::from_str(
                r#"{"results": [{"iso_3166_1": "US", "release_dates": [{"certification": "R"}]}]}"#,
            )
            .unwrap())
        });

        assert_eq!(certification(&mock, 1, "BR").await, "L");
        assert_eq!(certification(&mock, 1, "US").await, "R");
    }

    #[test]
    fn test_visible_genres_hides_music() {
        let genres = vec![
            Genre { id: 28, name: "Ação".into() },
            Genre { id: 10402, name: "Música".into() },
            Genre { id: 18, name: "Drama".into() },
        ];

        let names: Vec<_> = visible_genres(genres).into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["Ação", "Drama"]);
    }
}
