use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Metadata
        .route("/genres", get(handlers::get_genres))
        .route("/movies/:id", get(handlers::get_movie))
        .route("/movies/:id/certification", get(handlers::get_certification))
        .route("/movies/:id/images", get(handlers::get_images))
        .route("/movies/:id/providers", get(handlers::get_watch_providers))
        // Active view
        .route("/view", get(handlers::get_view))
        .route("/view/popular", post(handlers::show_popular))
        .route("/view/favorites", post(handlers::show_favorites))
        .route("/view/seen", post(handlers::show_seen))
        .route("/view/roulette", post(handlers::show_roulette))
        .route("/view/search", post(handlers::search))
        .route("/view/genre/:id", post(handlers::show_genre))
        .route("/view/more", post(handlers::load_more))
        .route(
            "/filters",
            put(handlers::apply_filters).delete(handlers::clear_filters),
        )
        // Shared lists
        .route("/lists", get(handlers::get_lists))
        .route("/favorites/reorder", post(handlers::reorder_favorites))
        .route("/favorites/:id/toggle", post(handlers::toggle_favorite))
        .route("/favorites/:id", delete(handlers::remove_favorite))
        .route(
            "/seen/:id",
            post(handlers::mark_seen).delete(handlers::remove_seen),
        )
        .route("/ratings/:id", put(handlers::rate_movie))
        // Roulette
        .route("/roulette", get(handlers::get_roulette))
        .route("/roulette/candidates", post(handlers::add_candidate))
        .route("/roulette/candidates/:id", delete(handlers::remove_candidate))
        .route("/roulette/spin", post(handlers::spin))
        .route("/roulette/spin/:spin_id/complete", post(handlers::complete_spin))
        .route("/roulette/last", delete(handlers::undo_last_spin))
        // Extras
        .route("/sync", get(handlers::get_sync_status))
        .route("/stats", get(handlers::get_stats))
        .route("/banner", get(handlers::get_banner))
}
