use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::models::{
    CountryProviders, FilterState, Genre, MovieDetails, MovieId, MovieImages, MovieRating,
    MovieSummary, Person, StarRating, Video,
};
use crate::services::{
    AddOutcome, CollectionSnapshot, FavoriteToggle, ListsSnapshot, RouletteSnapshot, SpinTicket,
    SyncState, SyncStatus, WatchStats,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub from: usize,
    pub to: usize,
}

/// A rating given either as a value or as a pointer position on the stars
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RatingInput {
    Value { value: f32 },
    Pointer { star: u8, left_half: bool },
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub person: Person,
    #[serde(flatten)]
    pub rating: RatingInput,
}

impl RatingInput {
    fn to_star_rating(&self) -> AppResult<StarRating> {
        match *self {
            RatingInput::Value { value } => StarRating::new(value),
            RatingInput::Pointer { star, left_half } => StarRating::from_pointer(star, left_half),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub movie_id: MovieId,
    pub rating: MovieRating,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub movie_id: MovieId,
    pub outcome: FavoriteToggle,
    pub lists: ListsSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct AddCandidateRequest {
    pub movie_id: MovieId,
}

#[derive(Debug, Serialize)]
pub struct AddCandidateResponse {
    pub outcome: AddOutcome,
    pub roulette: RouletteSnapshot,
}

#[derive(Debug, Serialize)]
pub struct MovieDetailsResponse {
    #[serde(flatten)]
    pub details: MovieDetails,
    pub trailer: Option<Video>,
}

#[derive(Debug, Serialize)]
pub struct CertificationResponse {
    pub movie_id: MovieId,
    pub certification: String,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub state: SyncState,
    #[serde(flatten)]
    pub status: SyncStatus,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn get_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.dashboard.genres().await?))
}

pub async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> AppResult<Json<MovieDetailsResponse>> {
    let details = state.dashboard.details(id).await?;
    let trailer = details.trailer().cloned();
    Ok(Json(MovieDetailsResponse { details, trailer }))
}

/// Never fails; unknown certifications come back as the unrated sentinel
pub async fn get_certification(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> Json<CertificationResponse> {
    let certification = state.dashboard.certification(id).await;
    Json(CertificationResponse {
        movie_id: id,
        certification,
    })
}

pub async fn get_images(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> AppResult<Json<MovieImages>> {
    Ok(Json(state.dashboard.images(id).await?))
}

pub async fn get_watch_providers(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> AppResult<Json<CountryProviders>> {
    Ok(Json(state.dashboard.watch_providers(id).await?))
}

pub async fn get_view(State(state): State<AppState>) -> Json<CollectionSnapshot> {
    Json(state.dashboard.current().await)
}

pub async fn show_popular(State(state): State<AppState>) -> Json<CollectionSnapshot> {
    Json(state.dashboard.show_popular().await)
}

pub async fn show_favorites(State(state): State<AppState>) -> Json<CollectionSnapshot> {
    Json(state.dashboard.show_favorites().await)
}

pub async fn show_seen(State(state): State<AppState>) -> Json<CollectionSnapshot> {
    Json(state.dashboard.show_seen().await)
}

pub async fn show_roulette(State(state): State<AppState>) -> Json<CollectionSnapshot> {
    Json(state.dashboard.show_roulette().await)
}

pub async fn search(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> AppResult<Json<CollectionSnapshot>> {
    Ok(Json(state.dashboard.search(&payload.query).await?))
}

pub async fn show_genre(
    State(state): State<AppState>,
    Path(genre_id): Path<i64>,
) -> Json<CollectionSnapshot> {
    Json(state.dashboard.show_genre(genre_id).await)
}

pub async fn load_more(State(state): State<AppState>) -> AppResult<Json<CollectionSnapshot>> {
    Ok(Json(state.dashboard.load_more().await?))
}

pub async fn apply_filters(
    State(state): State<AppState>,
    Json(filters): Json<FilterState>,
) -> Json<CollectionSnapshot> {
    Json(state.dashboard.apply_filters(filters).await)
}

pub async fn clear_filters(State(state): State<AppState>) -> Json<CollectionSnapshot> {
    Json(state.dashboard.clear_filters().await)
}

pub async fn get_lists(State(state): State<AppState>) -> Json<ListsSnapshot> {
    Json(state.dashboard.lists().await)
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> Json<ToggleResponse> {
    let outcome = state.dashboard.toggle_favorite(id).await;
    Json(ToggleResponse {
        movie_id: id,
        outcome,
        lists: state.dashboard.lists().await,
    })
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> AppResult<Json<ListsSnapshot>> {
    Ok(Json(state.dashboard.remove_favorite(id).await?))
}

pub async fn reorder_favorites(
    State(state): State<AppState>,
    Json(payload): Json<ReorderRequest>,
) -> AppResult<Json<CollectionSnapshot>> {
    Ok(Json(
        state
            .dashboard
            .reorder_favorites(payload.from, payload.to)
            .await?,
    ))
}

pub async fn mark_seen(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> Json<ListsSnapshot> {
    Json(state.dashboard.mark_seen(id).await)
}

pub async fn remove_seen(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> AppResult<Json<ListsSnapshot>> {
    Ok(Json(state.dashboard.remove_seen(id).await?))
}

pub async fn rate_movie(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
    Json(payload): Json<RateRequest>,
) -> AppResult<Json<RatingResponse>> {
    let rating = payload.rating.to_star_rating()?;
    let rating = state.dashboard.rate(id, payload.person, rating).await;
    Ok(Json(RatingResponse {
        movie_id: id,
        rating,
    }))
}

pub async fn get_roulette(State(state): State<AppState>) -> Json<RouletteSnapshot> {
    Json(state.dashboard.roulette().await)
}

pub async fn add_candidate(
    State(state): State<AppState>,
    Json(payload): Json<AddCandidateRequest>,
) -> AppResult<(StatusCode, Json<AddCandidateResponse>)> {
    let (outcome, roulette) = state.dashboard.add_candidate(payload.movie_id).await?;
    let status = match outcome {
        AddOutcome::Added => StatusCode::CREATED,
        AddOutcome::Duplicate => StatusCode::OK,
    };
    Ok((status, Json(AddCandidateResponse { outcome, roulette })))
}

pub async fn remove_candidate(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> AppResult<Json<RouletteSnapshot>> {
    Ok(Json(state.dashboard.remove_candidate(id).await?))
}

pub async fn spin(State(state): State<AppState>) -> AppResult<Json<SpinTicket>> {
    Ok(Json(state.dashboard.spin().await?))
}

pub async fn complete_spin(
    State(state): State<AppState>,
    Path(spin_id): Path<u64>,
) -> AppResult<Json<MovieSummary>> {
    Ok(Json(state.dashboard.complete_spin(spin_id).await?))
}

pub async fn undo_last_spin(State(state): State<AppState>) -> Json<RouletteSnapshot> {
    Json(state.dashboard.undo_last_spin().await)
}

pub async fn get_sync_status(State(state): State<AppState>) -> Json<SyncResponse> {
    let status = state.dashboard.sync_status();
    Json(SyncResponse {
        state: status.state(),
        status,
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<WatchStats> {
    Json(state.dashboard.stats().await)
}

pub async fn get_banner(State(state): State<AppState>) -> Json<Vec<MovieSummary>> {
    Json(state.dashboard.banner().await)
}
