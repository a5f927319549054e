use std::collections::HashSet;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};

use dashmovie::api::{create_router, AppState};
use dashmovie::db::{MemoryListStore, MemoryViewStore, ViewStore};
use dashmovie::error::{AppError, AppResult};
use dashmovie::models::{
    ActiveView, CountryProviders, DiscoverQuery, Genre, MovieDetails, MovieId, MovieImages,
    MovieSummary, Page, ReleaseDatesResponse, SharedListDocument, WatchProvidersResponse,
};
use dashmovie::services::{Dashboard, MetadataProvider};

/// In-process stand-in for the metadata service
#[derive(Default)]
struct FakeCatalogue {
    missing: HashSet<MovieId>,
}

fn summary(id: MovieId) -> MovieSummary {
    MovieSummary {
        id,
        title: format!("Filme {}", id),
        poster_path: Some(format!("/p{}.jpg", id)),
        backdrop_path: None,
        release_date: "2021-06-01".to_string(),
        vote_average: 7.5,
        overview: String::new(),
        adult: false,
    }
}

#[async_trait::async_trait]
impl MetadataProvider for FakeCatalogue {
    async fn movie(&self, id: MovieId) -> AppResult<MovieSummary> {
        if self.missing.contains(&id) {
            return Err(AppError::ExternalApi(
                "TMDB API returned status 404 Not Found".to_string(),
            ));
        }
        Ok(summary(id))
    }

    async fn movie_details(&self, id: MovieId) -> AppResult<MovieDetails> {
        Ok(MovieDetails {
            summary: self.movie(id).await?,
            runtime_minutes: 95,
            genres: vec![Genre {
                id: 35,
                name: "Comédia".to_string(),
            }],
            cast: vec![],
            watch_providers: Default::default(),
            videos: serde_json::from_value(json!([
                {"key": "abc", "site": "YouTube", "type": "Trailer", "name": "Trailer"}
            ]))?,
        })
    }

    async fn search(&self, query: &str, page: u32) -> AppResult<Page<MovieSummary>> {
        let base = if query == "matrix" { 600 } else { 900 };
        Ok(Page {
            page,
            results: vec![summary(base + i64::from(page))],
            total_pages: 3,
        })
    }

    async fn discover(&self, query: &DiscoverQuery) -> AppResult<Page<MovieSummary>> {
        let first = i64::from(query.page) * 1000;
        let mut results: Vec<_> = (first..first + 20).map(summary).collect();
        results[1].adult = true;
        Ok(Page {
            page: query.page,
            results,
            total_pages: 500,
        })
    }

    async fn genres(&self) -> AppResult<Vec<Genre>> {
        Ok(vec![
            Genre {
                id: 28,
                name: "Ação".to_string(),
            },
            Genre {
                id: 10402,
                name: "Música".to_string(),
            },
        ])
    }

    async fn images(&self, _id: MovieId) -> AppResult<MovieImages> {
        Ok(MovieImages::default())
    }

    async fn release_dates(&self, _id: MovieId) -> AppResult<ReleaseDatesResponse> {
        Ok(serde_json::from_value(json!({
            "results": [{"iso_3166_1": "BR", "release_dates": [{"certification": ""}, {"certification": "14"}]}]
        }))?)
    }

    async fn watch_providers(&self, _id: MovieId) -> AppResult<WatchProvidersResponse> {
        Ok(serde_json::from_value(json!({
            "results": {"BR": {"link": "https://example.test/br", "flatrate": [
                {"provider_id": 8, "provider_name": "Netflix"}
            ]}}
        }))?)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct TestApp {
    server: TestServer,
    dashboard: Dashboard,
    store: MemoryListStore,
    view_store: MemoryViewStore,
}

async fn create_test_app(document: SharedListDocument, saved_view: Option<ActiveView>) -> TestApp {
    create_test_app_with(FakeCatalogue::default(), document, saved_view).await
}

async fn create_test_app_with(
    catalogue: FakeCatalogue,
    document: SharedListDocument,
    saved_view: Option<ActiveView>,
) -> TestApp {
    let store = MemoryListStore::with_document(document);
    let view_store = MemoryViewStore::new(saved_view);

    let (dashboard, _sync) = Dashboard::start_with_rng(
        Arc::new(catalogue),
        Arc::new(store.clone()),
        Arc::new(view_store.clone()),
        "BR".to_string(),
        StdRng::seed_from_u64(2024),
    )
    .await;

    let app = create_router(AppState::new(dashboard.clone()));
    TestApp {
        server: TestServer::new(app).unwrap(),
        dashboard,
        store,
        view_store,
    }
}

fn lists(favorites: Vec<MovieId>, seen: Vec<MovieId>) -> SharedListDocument {
    SharedListDocument {
        favorites,
        seen,
        ..Default::default()
    }
}

fn movie_ids(view: &Value) -> Vec<i64> {
    view["movies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(SharedListDocument::default(), None).await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_popular_feed_on_first_load() {
    let app = create_test_app(SharedListDocument::default(), None).await;

    let response = app.server.get("/api/v1/view").await;
    response.assert_status_ok();
    let view: Value = response.json();

    assert_eq!(view["view"], "popular");
    assert_eq!(view["state"], "populated");
    let ids = movie_ids(&view);
    assert_eq!(ids.len(), 18);
    // adult title dropped
    assert!(!ids.contains(&(ids[0] + 1)));
}

#[tokio::test]
async fn test_filters_start_at_page_one_and_load_more_dedupes() {
    let app = create_test_app(SharedListDocument::default(), None).await;

    let response = app
        .server
        .put("/api/v1/filters")
        .json(&json!({"genre_id": 28, "year": 2020, "min_rating": 7.0}))
        .await;
    response.assert_status_ok();
    let view: Value = response.json();
    assert_eq!(view["filters"]["genre_id"], 28);
    assert_eq!(movie_ids(&view)[0], 1000);

    let more: Value = app.server.post("/api/v1/view/more").await.json();
    let ids = movie_ids(&more);
    assert_eq!(ids.len(), 36);
    assert_eq!(ids[18], 2000);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());

    let cleared: Value = app.server.delete("/api/v1/filters").await.json();
    assert_eq!(cleared["filters"]["genre_id"], Value::Null);
    assert_eq!(movie_ids(&cleared).len(), 18);
}

#[tokio::test]
async fn test_search_and_empty_query() {
    let app = create_test_app(SharedListDocument::default(), None).await;

    let response = app
        .server
        .post("/api/v1/view/search")
        .json(&json!({"query": "matrix"}))
        .await;
    response.assert_status_ok();
    let view: Value = response.json();
    assert_eq!(view["view"], "search");
    assert_eq!(view["query"], "matrix");
    assert_eq!(movie_ids(&view), vec![601]);

    let response = app
        .server
        .post("/api/v1/view/search")
        .json(&json!({"query": "   "}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_favorites_view_is_restored_and_persisted() {
    let app = create_test_app(lists(vec![3, 1], vec![]), Some(ActiveView::Favorites)).await;

    let view: Value = app.server.get("/api/v1/view").await.json();
    assert_eq!(view["view"], "favorites");
    assert_eq!(movie_ids(&view), vec![3, 1]);
    assert_eq!(view["movies"][1]["rank"], 2);

    app.server.post("/api/v1/view/seen").await.assert_status_ok();
    assert_eq!(
        app.view_store.load().await.unwrap(),
        Some(ActiveView::Seen)
    );
}

#[tokio::test]
async fn test_missing_favorite_does_not_blank_the_view() {
    let catalogue = FakeCatalogue {
        missing: HashSet::from([2]),
    };
    let app = create_test_app_with(catalogue, lists(vec![1, 2, 3], vec![]), None).await;

    let view: Value = app.server.post("/api/v1/view/favorites").await.json();
    assert_eq!(movie_ids(&view), vec![1, 3]);
    assert!(view["notice"].is_string());
}

#[tokio::test]
async fn test_list_operations_keep_favorites_and_seen_disjoint() {
    let app = create_test_app(lists(vec![10, 20], vec![]), None).await;

    let response = app.server.post("/api/v1/favorites/30/toggle").await;
    response.assert_status_ok();
    let toggled: Value = response.json();
    assert_eq!(toggled["outcome"], "added");
    assert_eq!(toggled["lists"]["favorites"], json!([10, 20, 30]));

    let seen: Value = app.server.post("/api/v1/seen/20").await.json();
    assert_eq!(seen["favorites"], json!([10, 30]));
    assert_eq!(seen["seen"], json!([20]));

    let rejected: Value = app.server.post("/api/v1/favorites/20/toggle").await.json();
    assert_eq!(rejected["outcome"], "already_seen");

    app.server
        .delete("/api/v1/seen/20")
        .await
        .assert_status_ok();
    app.server
        .delete("/api/v1/seen/20")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.dashboard.flush().await;
    let stored = app.store.snapshot().await.unwrap();
    assert_eq!(stored.favorites, vec![10, 30]);
    assert!(stored.seen.is_empty());
}

#[tokio::test]
async fn test_reorder_favorites() {
    let app = create_test_app(lists(vec![1, 2, 3], vec![]), None).await;

    app.server
        .post("/api/v1/favorites/reorder")
        .json(&json!({"from": 0, "to": 2}))
        .await
        .assert_status(StatusCode::CONFLICT);

    app.server.post("/api/v1/view/favorites").await.assert_status_ok();
    let response = app
        .server
        .post("/api/v1/favorites/reorder")
        .json(&json!({"from": 0, "to": 2}))
        .await;
    response.assert_status_ok();
    assert_eq!(movie_ids(&response.json()), vec![2, 3, 1]);

    app.dashboard.flush().await;
    assert_eq!(app.store.snapshot().await.unwrap().favorites, vec![2, 3, 1]);
}

#[tokio::test]
async fn test_ratings_merge_per_person() {
    let app = create_test_app(SharedListDocument::default(), None).await;

    app.server
        .put("/api/v1/ratings/42")
        .json(&json!({"person": "personA", "value": 3.5}))
        .await
        .assert_status_ok();

    let response = app
        .server
        .put("/api/v1/ratings/42")
        .json(&json!({"person": "personB", "star": 4, "left_half": false}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["rating"], json!({"personA": 3.5, "personB": 4.0}));

    app.server
        .put("/api/v1/ratings/42")
        .json(&json!({"person": "personA", "value": 5.5}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.dashboard.flush().await;
    let stored = app.store.snapshot().await.unwrap();
    assert_eq!(
        serde_json::to_value(stored.ratings[&42]).unwrap(),
        json!({"personA": 3.5, "personB": 4.0})
    );

    let sync: Value = app.server.get("/api/v1/sync").await.json();
    assert_eq!(sync["state"], "synced");
    assert_eq!(sync["pending"], 0);
}

#[tokio::test]
async fn test_sync_failure_is_visible_but_local_state_stands() {
    let app = create_test_app(SharedListDocument::default(), None).await;
    app.store.set_unavailable(true);

    let toggled: Value = app.server.post("/api/v1/favorites/7/toggle").await.json();
    assert_eq!(toggled["lists"]["favorites"], json!([7]));

    app.dashboard.flush().await;
    let sync: Value = app.server.get("/api/v1/sync").await.json();
    assert_eq!(sync["state"], "diverged");
    assert_eq!(sync["failed"], 1);

    let current: Value = app.server.get("/api/v1/lists").await.json();
    assert_eq!(current["favorites"], json!([7]));
}

#[tokio::test]
async fn test_roulette_round_trip() {
    let app = create_test_app(SharedListDocument::default(), None).await;

    app.server
        .post("/api/v1/roulette/spin")
        .await
        .assert_status(StatusCode::CONFLICT);

    let added = app
        .server
        .post("/api/v1/roulette/candidates")
        .json(&json!({"movie_id": 11}))
        .await;
    added.assert_status(StatusCode::CREATED);
    let added: Value = added.json();
    assert_eq!(added["roulette"]["state"], "needs_one_more");

    let duplicate = app
        .server
        .post("/api/v1/roulette/candidates")
        .json(&json!({"movie_id": 11}))
        .await;
    duplicate.assert_status_ok();
    assert_eq!(duplicate.json::<Value>()["outcome"], "duplicate");

    app.server
        .post("/api/v1/roulette/candidates")
        .json(&json!({"movie_id": 12}))
        .await
        .assert_status(StatusCode::CREATED);

    let ticket: Value = app.server.post("/api/v1/roulette/spin").await.json();
    let spin_id = ticket["spin_id"].as_u64().unwrap();
    let index = ticket["index"].as_u64().unwrap() as usize;
    let expected = ticket["segments"][index]["id"].clone();

    let selected: Value = app
        .server
        .post(&format!("/api/v1/roulette/spin/{}/complete", spin_id))
        .await
        .json();
    assert_eq!(selected["id"], expected);

    let roulette: Value = app.server.get("/api/v1/roulette").await.json();
    assert_eq!(roulette["last_selected"]["id"], expected);

    let undone: Value = app.server.delete("/api/v1/roulette/last").await.json();
    assert_eq!(undone["last_selected"], Value::Null);
    assert_eq!(undone["pool"].as_array().unwrap().len(), 2);

    app.server
        .delete("/api/v1/roulette/candidates/99")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_movie_detail_endpoints() {
    let app = create_test_app(SharedListDocument::default(), None).await;

    let details: Value = app.server.get("/api/v1/movies/5").await.json();
    assert_eq!(details["id"], 5);
    assert_eq!(details["runtime_minutes"], 95);
    assert_eq!(details["trailer"]["key"], "abc");

    let certification: Value = app
        .server
        .get("/api/v1/movies/5/certification")
        .await
        .json();
    assert_eq!(certification["certification"], "14");

    let providers: CountryProviders = app.server.get("/api/v1/movies/5/providers").await.json();
    assert_eq!(providers.flatrate[0].provider_name, "Netflix");

    let genres: Vec<Genre> = app.server.get("/api/v1/genres").await.json();
    assert_eq!(genres.len(), 1);
    assert_eq!(genres[0].name, "Ação");
}

#[tokio::test]
async fn test_stats_and_banner() {
    let app = create_test_app(lists(vec![], vec![1, 2]), None).await;

    let stats: Value = app.server.get("/api/v1/stats").await.json();
    assert_eq!(stats["total_watched"], 2);
    assert_eq!(stats["total_runtime"], json!({"hours": 3, "minutes": 10}));
    assert_eq!(stats["average_vote"], 7.5);
    assert_eq!(stats["top_genre"]["id"], 35);

    let banner: Vec<Value> = app.server.get("/api/v1/banner").await.json();
    assert_eq!(banner.len(), 2);
}
