use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{ActiveView, MovieId, MovieSummary};
use crate::services::feed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Loading,
    Populated,
    Empty,
}

/// Identifies the load a response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    pub view: ActiveView,
}

/// The collection currently shown to the client
///
/// Each view switch bumps a generation counter. Results carry the ticket
/// they were requested with and are dropped if the generation has moved on,
/// so a slow response never overwrites a newer view.
#[derive(Debug, Clone)]
pub struct DisplayedCollection {
    view: ActiveView,
    movies: Vec<MovieSummary>,
    state: LoadState,
    notice: Option<String>,
    generation: u64,
}

impl Default for DisplayedCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayedCollection {
    pub fn new() -> Self {
        Self {
            view: ActiveView::Popular,
            movies: Vec::new(),
            state: LoadState::Loading,
            notice: None,
            generation: 0,
        }
    }

    pub fn view(&self) -> ActiveView {
        self.view
    }

    pub fn movies(&self) -> &[MovieSummary] {
        &self.movies
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    /// Switches to `view` and enters the loading state
    pub fn begin(&mut self, view: ActiveView) -> LoadTicket {
        self.generation += 1;
        self.view = view;
        self.movies.clear();
        self.state = LoadState::Loading;
        self.notice = None;
        self.ticket()
    }

    /// Ticket for follow-up loads within the current view
    pub fn ticket(&self) -> LoadTicket {
        LoadTicket {
            generation: self.generation,
            view: self.view,
        }
    }

    fn is_current(&self, ticket: &LoadTicket) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale_view = %ticket.view,
                current_view = %self.view,
                "Discarding response for an abandoned view"
            );
            return false;
        }
        true
    }

    /// Applies loaded movies; returns false if the ticket is stale
    pub fn complete(&mut self, ticket: &LoadTicket, movies: Vec<MovieSummary>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.movies = movies;
        self.settle();
        true
    }

    /// Resolves a failed load to an empty collection with a notice
    pub fn fail(&mut self, ticket: &LoadTicket, notice: impl Into<String>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.movies.clear();
        self.notice = Some(notice.into());
        self.settle();
        true
    }

    /// Merges another page into the current collection
    ///
    /// Returns how many movies were added, or `None` if the ticket is stale.
    pub fn append(&mut self, ticket: &LoadTicket, page: Vec<MovieSummary>) -> Option<usize> {
        if !self.is_current(ticket) {
            return None;
        }
        let added = feed::merge_page(&mut self.movies, page);
        self.settle();
        Some(added)
    }

    /// Sets a transient notice without touching the movies
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn remove(&mut self, movie_id: MovieId) -> bool {
        let before = self.movies.len();
        self.movies.retain(|m| m.id != movie_id);
        let removed = before != self.movies.len();
        if removed && !self.is_loading() {
            self.settle();
        }
        removed
    }

    /// Id of the movie shown at `index`
    pub fn id_at(&self, index: usize) -> AppResult<MovieId> {
        self.movies.get(index).map(|m| m.id).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Position {} is outside the {} displayed movies",
                index,
                self.movies.len()
            ))
        })
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> AppResult<()> {
        self.id_at(from)?;
        self.id_at(to)?;
        let movie = self.movies.remove(from);
        self.movies.insert(to, movie);
        Ok(())
    }

    fn settle(&mut self) {
        self.state = if self.movies.is_empty() {
            LoadState::Empty
        } else {
            LoadState::Populated
        };
    }
}
