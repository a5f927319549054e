use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::{SharedListStore, ViewStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    ActiveView, CountryProviders, FilterState, Genre, MovieDetails, MovieId, MovieImages,
    MovieRating, MovieSummary, Person, StarRating,
};
use crate::services::display::{DisplayedCollection, LoadState, LoadTicket};
use crate::services::feed::{self, Feed, FeedRequest, FeedSource};
use crate::services::lists::{FavoriteToggle, ListsSnapshot, SharedLists};
use crate::services::providers::{self, MetadataProvider, Resolved};
use crate::services::roulette::{AddOutcome, Roulette, RouletteSnapshot, SpinTicket};
use crate::services::stats::WatchStats;
use crate::services::sync::{SyncHandle, SyncStatus, SyncWriter};

/// Movies shown in the hero banner
pub const BANNER_SIZE: usize = 5;

const LOAD_FAILED_NOTICE: &str = "Could not load movies, try again later";
const LOAD_MORE_FAILED_NOTICE: &str = "Could not load more movies";
const ALREADY_SEEN_NOTICE: &str = "Movies already seen cannot be added to favorites";

/// One movie in the displayed grid, with its list badges
#[derive(Debug, Clone, Serialize)]
pub struct DisplayedMovie {
    #[serde(flatten)]
    pub movie: MovieSummary,
    /// 1-based favorites rank
    pub rank: Option<usize>,
    pub favorite: bool,
    pub seen: bool,
    pub rating: MovieRating,
}

/// What the client renders for the active view
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSnapshot {
    pub view: ActiveView,
    pub state: LoadState,
    pub movies: Vec<DisplayedMovie>,
    pub notice: Option<String>,
    pub filters: FilterState,
    pub query: Option<String>,
}

/// Where a view switch gets its movies from
enum ViewTarget {
    Feed(ActiveView, FeedSource),
    Favorites,
    Seen,
    Roulette,
}

impl ViewTarget {
    fn view(&self) -> ActiveView {
        match self {
            ViewTarget::Feed(view, _) => *view,
            ViewTarget::Favorites => ActiveView::Favorites,
            ViewTarget::Seen => ActiveView::Seen,
            ViewTarget::Roulette => ActiveView::Roulette,
        }
    }
}

enum LoadJob {
    Feed(FeedRequest),
    Resolve(Vec<MovieId>),
    Listed(Vec<MovieSummary>),
}

enum LoadOutcome {
    Page(Vec<MovieSummary>),
    Resolved(Resolved<MovieSummary>),
    Listed(Vec<MovieSummary>),
    Failed(AppError),
}

struct DashboardState {
    lists: SharedLists,
    display: DisplayedCollection,
    feed: Feed,
    /// Filters chosen for the popular feed; genre browsing keeps its own
    popular_filters: FilterState,
    roulette: Roulette,
    genres: Option<Vec<Genre>>,
    rng: StdRng,
}

impl DashboardState {
    fn apply(&mut self, ticket: &LoadTicket, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Page(page) => {
                self.display.append(ticket, page);
            }
            LoadOutcome::Listed(movies) => {
                self.display.complete(ticket, movies);
            }
            LoadOutcome::Resolved(resolved) => {
                // Drop ids that left the list while they were being resolved
                let lists = &self.lists;
                let movies = resolved
                    .items
                    .into_iter()
                    .filter(|m| match ticket.view {
                        ActiveView::Favorites => lists.is_favorite(m.id),
                        ActiveView::Seen => lists.is_seen(m.id),
                        _ => true,
                    })
                    .collect();

                if self.display.complete(ticket, movies) && !resolved.failed.is_empty() {
                    self.display.set_notice(format!(
                        "{} movie(s) could not be loaded",
                        resolved.failed.len()
                    ));
                }
            }
            LoadOutcome::Failed(e) => {
                tracing::warn!(view = %ticket.view, error = %e, "Failed to load view");
                self.display.fail(ticket, LOAD_FAILED_NOTICE);
            }
        }
    }

    /// Mirrors the roulette pool while the roulette view is shown
    fn refresh_roulette_view(&mut self) {
        if self.display.view() == ActiveView::Roulette {
            let ticket = self.display.ticket();
            self.display.complete(&ticket, self.roulette.pool().to_vec());
        }
    }

    fn collection(&self) -> CollectionSnapshot {
        let view = self.display.view();
        let movies = self
            .display
            .movies()
            .iter()
            .map(|m| DisplayedMovie {
                movie: m.clone(),
                rank: self.lists.rank_of(m.id),
                favorite: self.lists.is_favorite(m.id),
                seen: self.lists.is_seen(m.id),
                rating: self.lists.rating(m.id),
            })
            .collect();

        let (filters, query) = match (view.is_paged(), self.feed.source()) {
            (true, FeedSource::Search(query)) => (FilterState::default(), Some(query.clone())),
            (true, FeedSource::Discover(filters)) => (filters.clone(), None),
            (false, _) => (FilterState::default(), None),
        };

        CollectionSnapshot {
            view,
            state: self.display.state(),
            movies,
            notice: self.display.notice().map(str::to_string),
            filters,
            query,
        }
    }
}

/// Process-wide application state behind the HTTP surface
///
/// All mutations go through here. Remote fetches run without holding the
/// state lock; their results are applied with the ticket of the view that
/// requested them, so a view that was switched away from in the meantime
/// never receives them.
#[derive(Clone)]
pub struct Dashboard {
    provider: Arc<dyn MetadataProvider>,
    view_store: Arc<dyn ViewStore>,
    sync: SyncWriter,
    region: String,
    state: Arc<RwLock<DashboardState>>,
}

impl Dashboard {
    /// Loads the shared lists, restores the last view and starts syncing
    pub async fn start(
        provider: Arc<dyn MetadataProvider>,
        store: Arc<dyn SharedListStore>,
        view_store: Arc<dyn ViewStore>,
        region: String,
    ) -> (Self, SyncHandle) {
        Self::start_with_rng(provider, store, view_store, region, StdRng::from_entropy()).await
    }

    pub async fn start_with_rng(
        provider: Arc<dyn MetadataProvider>,
        store: Arc<dyn SharedListStore>,
        view_store: Arc<dyn ViewStore>,
        region: String,
        rng: StdRng,
    ) -> (Self, SyncHandle) {
        let (sync, handle) = SyncWriter::spawn(store.clone());
        let lists = SharedLists::load(store.as_ref(), sync.clone()).await;

        let dashboard = Self {
            provider,
            view_store,
            sync,
            region,
            state: Arc::new(RwLock::new(DashboardState {
                lists,
                display: DisplayedCollection::new(),
                feed: Feed::new(),
                popular_filters: FilterState::default(),
                roulette: Roulette::new(),
                genres: None,
                rng,
            })),
        };

        dashboard.restore().await;
        (dashboard, handle)
    }

    async fn restore(&self) {
        let saved = match self.view_store.load().await {
            Ok(view) => view.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read the saved view, starting on popular");
                ActiveView::default()
            }
        };

        let view = saved.restorable();
        tracing::info!(saved = %saved, view = %view, "Restoring view");

        let target = match view {
            ActiveView::Favorites => ViewTarget::Favorites,
            ActiveView::Seen => ViewTarget::Seen,
            ActiveView::Roulette => ViewTarget::Roulette,
            _ => ViewTarget::Feed(ActiveView::Popular, FeedSource::default()),
        };
        self.load(target).await;
    }

    /// Switches view, fetches its contents and remembers the view locally
    async fn open(&self, target: ViewTarget) -> CollectionSnapshot {
        let view = target.view();
        if let Err(e) = self.view_store.save(view).await {
            tracing::warn!(view = %view, error = %e, "Failed to persist active view");
        }
        self.load(target).await
    }

    async fn load(&self, target: ViewTarget) -> CollectionSnapshot {
        let (ticket, job) = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let ticket = state.display.begin(target.view());
            if let ViewTarget::Feed(ActiveView::Popular, FeedSource::Discover(filters)) = &target {
                state.popular_filters = filters.clone();
            }
            let job = match target {
                ViewTarget::Feed(_, source) => LoadJob::Feed(state.feed.start(source, &mut state.rng)),
                ViewTarget::Favorites => LoadJob::Resolve(state.lists.favorites().to_vec()),
                ViewTarget::Seen => LoadJob::Resolve(state.lists.seen().to_vec()),
                ViewTarget::Roulette => LoadJob::Listed(state.roulette.pool().to_vec()),
            };
            (ticket, job)
        };

        let outcome = match job {
            LoadJob::Feed(request) => {
                tracing::debug!(view = %ticket.view, page = request.page, "Loading feed page");
                match feed::fetch_page(self.provider.as_ref(), &request).await {
                    Ok(page) => LoadOutcome::Page(page),
                    Err(e) => LoadOutcome::Failed(e),
                }
            }
            LoadJob::Resolve(ids) => {
                LoadOutcome::Resolved(providers::resolve_movies(self.provider.clone(), &ids).await)
            }
            LoadJob::Listed(movies) => LoadOutcome::Listed(movies),
        };

        let mut state = self.state.write().await;
        state.apply(&ticket, outcome);
        state.collection()
    }

    pub async fn current(&self) -> CollectionSnapshot {
        self.state.read().await.collection()
    }

    pub async fn show_popular(&self) -> CollectionSnapshot {
        let filters = self.state.read().await.popular_filters.clone();
        self.open(ViewTarget::Feed(ActiveView::Popular, FeedSource::Discover(filters)))
            .await
    }

    pub async fn show_favorites(&self) -> CollectionSnapshot {
        self.open(ViewTarget::Favorites).await
    }

    pub async fn show_seen(&self) -> CollectionSnapshot {
        self.open(ViewTarget::Seen).await
    }

    pub async fn show_roulette(&self) -> CollectionSnapshot {
        self.open(ViewTarget::Roulette).await
    }

    pub async fn search(&self, query: &str) -> AppResult<CollectionSnapshot> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        tracing::info!(query = %query, "Searching movies");
        Ok(self
            .open(ViewTarget::Feed(
                ActiveView::Search,
                FeedSource::Search(query.to_string()),
            ))
            .await)
    }

    pub async fn show_genre(&self, genre_id: i64) -> CollectionSnapshot {
        let filters = FilterState {
            genre_id: Some(genre_id),
            ..Default::default()
        };
        self.open(ViewTarget::Feed(ActiveView::Genre, FeedSource::Discover(filters)))
            .await
    }

    /// Restarts the popular feed with `filters`
    pub async fn apply_filters(&self, filters: FilterState) -> CollectionSnapshot {
        let filters = filters.normalized();
        tracing::info!(filters = ?filters, "Applying filters");
        self.open(ViewTarget::Feed(ActiveView::Popular, FeedSource::Discover(filters)))
            .await
    }

    /// Back to the unfiltered popular feed, random first page included
    pub async fn clear_filters(&self) -> CollectionSnapshot {
        self.open(ViewTarget::Feed(ActiveView::Popular, FeedSource::default()))
            .await
    }

    /// Appends the next page of a paged view
    pub async fn load_more(&self) -> AppResult<CollectionSnapshot> {
        let (ticket, request) = {
            let mut state = self.state.write().await;
            let view = state.display.view();
            if !view.is_paged() {
                return Err(AppError::Conflict(format!(
                    "The {} view has no more pages",
                    view
                )));
            }
            if state.display.is_loading() {
                return Err(AppError::Conflict(
                    "The current view is still loading".to_string(),
                ));
            }
            (state.display.ticket(), state.feed.next())
        };

        let result = feed::fetch_page(self.provider.as_ref(), &request).await;

        let mut state = self.state.write().await;
        match result {
            Ok(page) => {
                if let Some(added) = state.display.append(&ticket, page) {
                    tracing::debug!(page = request.page, added = added, "Loaded more movies");
                }
            }
            Err(e) => {
                tracing::warn!(page = request.page, error = %e, "Failed to load more movies");
                if state.display.ticket() == ticket {
                    state.display.set_notice(LOAD_MORE_FAILED_NOTICE);
                }
            }
        }
        Ok(state.collection())
    }

    pub async fn lists(&self) -> ListsSnapshot {
        self.state.read().await.lists.snapshot()
    }

    pub async fn toggle_favorite(&self, movie_id: MovieId) -> FavoriteToggle {
        let mut state = self.state.write().await;
        let outcome = state.lists.toggle_favorite(movie_id);

        match outcome {
            FavoriteToggle::Removed if state.display.view() == ActiveView::Favorites => {
                state.display.remove(movie_id);
            }
            FavoriteToggle::AlreadySeen => state.display.set_notice(ALREADY_SEEN_NOTICE),
            _ => {}
        }
        outcome
    }

    pub async fn remove_favorite(&self, movie_id: MovieId) -> AppResult<ListsSnapshot> {
        let mut state = self.state.write().await;
        if !state.lists.remove_favorite(movie_id) {
            return Err(AppError::NotFound(format!(
                "Movie {} is not a favorite",
                movie_id
            )));
        }
        if state.display.view() == ActiveView::Favorites {
            state.display.remove(movie_id);
        }
        Ok(state.lists.snapshot())
    }

    /// Marks a movie as seen and takes it off the grid
    pub async fn mark_seen(&self, movie_id: MovieId) -> ListsSnapshot {
        let mut state = self.state.write().await;
        state.lists.mark_seen(movie_id);
        match state.display.view() {
            ActiveView::Seen => {}
            // the roulette grid mirrors the pool, which keeps seen movies
            ActiveView::Roulette => state.refresh_roulette_view(),
            _ => {
                state.display.remove(movie_id);
            }
        }
        state.lists.snapshot()
    }

    pub async fn remove_seen(&self, movie_id: MovieId) -> AppResult<ListsSnapshot> {
        let mut state = self.state.write().await;
        if !state.lists.remove_seen(movie_id) {
            return Err(AppError::NotFound(format!(
                "Movie {} is not in the seen list",
                movie_id
            )));
        }
        if state.display.view() == ActiveView::Seen {
            state.display.remove(movie_id);
        }
        Ok(state.lists.snapshot())
    }

    /// Drag-and-drop reorder of the displayed favorites
    ///
    /// Positions refer to the grid. The moved movie takes the ranking slot
    /// of the movie it was dropped on.
    pub async fn reorder_favorites(&self, from: usize, to: usize) -> AppResult<CollectionSnapshot> {
        let mut state = self.state.write().await;
        if state.display.view() != ActiveView::Favorites {
            return Err(AppError::Conflict(
                "Favorites can only be reordered from the favorites view".to_string(),
            ));
        }
        if state.display.is_loading() {
            return Err(AppError::Conflict(
                "Favorites are still loading".to_string(),
            ));
        }

        let active = state.display.id_at(from)?;
        let over = state.display.id_at(to)?;
        state.lists.move_favorite(active, over)?;
        state.display.move_item(from, to)?;

        Ok(state.collection())
    }

    pub async fn rate(
        &self,
        movie_id: MovieId,
        person: Person,
        rating: StarRating,
    ) -> MovieRating {
        self.state.write().await.lists.rate(movie_id, person, rating)
    }

    pub async fn roulette(&self) -> RouletteSnapshot {
        self.state.read().await.roulette.snapshot()
    }

    /// Adds a movie to the roulette, looking it up if it is not on screen
    pub async fn add_candidate(&self, movie_id: MovieId) -> AppResult<(AddOutcome, RouletteSnapshot)> {
        let on_screen = {
            let state = self.state.read().await;
            state
                .display
                .movies()
                .iter()
                .find(|m| m.id == movie_id)
                .cloned()
        };
        let movie = match on_screen {
            Some(movie) => movie,
            None => self.provider.movie(movie_id).await?,
        };

        let mut state = self.state.write().await;
        let outcome = state.roulette.add(movie);
        if outcome == AddOutcome::Duplicate {
            state.display.set_notice("This movie is already in the roulette");
        }
        state.refresh_roulette_view();
        Ok((outcome, state.roulette.snapshot()))
    }

    pub async fn remove_candidate(&self, movie_id: MovieId) -> AppResult<RouletteSnapshot> {
        let mut state = self.state.write().await;
        if !state.roulette.remove(movie_id) {
            return Err(AppError::NotFound(format!(
                "Movie {} is not in the roulette",
                movie_id
            )));
        }
        state.refresh_roulette_view();
        Ok(state.roulette.snapshot())
    }

    pub async fn spin(&self) -> AppResult<SpinTicket> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.roulette.spin(&mut state.rng)
    }

    pub async fn complete_spin(&self, spin_id: u64) -> AppResult<MovieSummary> {
        self.state.write().await.roulette.complete_spin(spin_id)
    }

    pub async fn undo_last_spin(&self) -> RouletteSnapshot {
        let mut state = self.state.write().await;
        if let Some(movie) = state.roulette.undo_last() {
            tracing::info!(movie_id = movie.id, "Undid last roulette pick");
        }
        state.roulette.snapshot()
    }

    /// Genres for the picker, fetched once per process
    pub async fn genres(&self) -> AppResult<Vec<Genre>> {
        if let Some(genres) = &self.state.read().await.genres {
            return Ok(genres.clone());
        }

        let genres = providers::visible_genres(self.provider.genres().await?);
        self.state.write().await.genres = Some(genres.clone());
        Ok(genres)
    }

    pub async fn details(&self, movie_id: MovieId) -> AppResult<MovieDetails> {
        self.provider.movie_details(movie_id).await
    }

    pub async fn certification(&self, movie_id: MovieId) -> String {
        providers::certification(self.provider.as_ref(), movie_id, &self.region).await
    }

    pub async fn images(&self, movie_id: MovieId) -> AppResult<MovieImages> {
        self.provider.images(movie_id).await
    }

    /// Watch providers in the configured region
    pub async fn watch_providers(&self, movie_id: MovieId) -> AppResult<CountryProviders> {
        let mut response = self.provider.watch_providers(movie_id).await?;
        Ok(response.results.remove(&self.region).unwrap_or_default())
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync.status()
    }

    /// Waits for queued shared list writes to be attempted
    pub async fn flush(&self) {
        self.sync.flush().await
    }

    pub async fn stats(&self) -> WatchStats {
        let (seen, ratings) = {
            let state = self.state.read().await;
            (state.lists.seen().to_vec(), state.lists.ratings().clone())
        };

        let resolved = providers::resolve_details(self.provider.clone(), &seen).await;
        let mut stats = WatchStats::compute(&resolved.items, &ratings);
        stats.unresolved = resolved.failed.len();
        stats
    }

    pub async fn banner(&self) -> Vec<MovieSummary> {
        let ids = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            state.lists.banner_ids(&mut state.rng, BANNER_SIZE)
        };
        providers::resolve_movies(self.provider.clone(), &ids).await.items
    }
}
