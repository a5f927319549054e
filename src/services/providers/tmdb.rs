//! TMDB (The Movie Database) metadata provider
//!
//! Every request carries the API key and the configured locale. Detail
//! lookups append credits, watch providers and videos in one round trip.
//!
//! API Flow:
//! 1. Listings: /discover/movie and /search/movie → pages of summaries
//! 2. Details: /movie/{id}?append_to_response=credits,watch/providers,videos
//! 3. Extras: /movie/{id}/images, /movie/{id}/release_dates, /genre/movie/list
use crate::{
    error::{AppError, AppResult},
    models::{
        DiscoverQuery, Genre, MovieDetails, MovieId, MovieImages, MovieSummary, Page,
        ReleaseDatesResponse, TmdbMovieDetails, WatchProvidersResponse,
    },
    services::providers::MetadataProvider,
};
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize};

const DETAIL_APPENDS: &str = "credits,watch/providers,videos";

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, language: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
        }
    }

    /// GETs `path` and decodes the JSON body
    ///
    /// Any non-success status becomes [`AppError::ExternalApi`].
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        tracing::debug!(path = %path, "Fetching from TMDB");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn movie(&self, id: MovieId) -> AppResult<MovieSummary> {
        self.get_json(&format!("/movie/{}", id), &[]).await
    }

    async fn movie_details(&self, id: MovieId) -> AppResult<MovieDetails> {
        let raw: TmdbMovieDetails = self
            .get_json(
                &format!("/movie/{}", id),
                &[("append_to_response", DETAIL_APPENDS.to_string())],
            )
            .await?;

        Ok(MovieDetails::from(raw))
    }

    async fn search(&self, query: &str, page: u32) -> AppResult<Page<MovieSummary>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let results: Page<MovieSummary> = self
            .get_json(
                "/search/movie",
                &[("query", query.to_string()), ("page", page.to_string())],
            )
            .await?;

        tracing::info!(
            query = %query,
            page = page,
            results = results.results.len(),
            provider = "tmdb",
            "Movie search completed"
        );

        Ok(results)
    }

    async fn discover(&self, query: &DiscoverQuery) -> AppResult<Page<MovieSummary>> {
        let results: Page<MovieSummary> =
            self.get_json("/discover/movie", &query.to_params()).await?;

        tracing::info!(
            page = query.page,
            genre = ?query.with_genre,
            year = ?query.year,
            min_rating = ?query.min_rating,
            results = results.results.len(),
            provider = "tmdb",
            "Discover completed"
        );

        Ok(results)
    }

    async fn genres(&self) -> AppResult<Vec<Genre>> {
        #[derive(Deserialize)]
        struct GenreList {
            genres: Vec<Genre>,
        }

        let list: GenreList = self.get_json("/genre/movie/list", &[]).await?;
        Ok(list.genres)
    }

    async fn images(&self, id: MovieId) -> AppResult<MovieImages> {
        self.get_json(&format!("/movie/{}/images", id), &[]).await
    }

    async fn release_dates(&self, id: MovieId) -> AppResult<ReleaseDatesResponse> {
        self.get_json(&format!("/movie/{}/release_dates", id), &[])
            .await
    }

    async fn watch_providers(&self, id: MovieId) -> AppResult<WatchProvidersResponse> {
        self.get_json(&format!("/movie/{}/watch/providers", id), &[])
            .await
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
