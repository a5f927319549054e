use rand::Rng;
use std::collections::HashSet;
use std::ops::RangeInclusive;

use crate::error::AppResult;
use crate::models::{DiscoverQuery, FilterState, MovieSummary};
use crate::services::providers::MetadataProvider;

/// Maximum movies kept from one remote page
pub const PAGE_SIZE: usize = 18;

/// Pages the unfiltered feed may start on
pub const RANDOM_PAGE_RANGE: RangeInclusive<u32> = 1..=50;

/// What the paged feed is listing
#[derive(Debug, Clone, PartialEq)]
pub enum FeedSource {
    Discover(FilterState),
    Search(String),
}

impl Default for FeedSource {
    fn default() -> Self {
        FeedSource::Discover(FilterState::default())
    }
}

/// One page to fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRequest {
    pub source: FeedSource,
    pub page: u32,
}

/// Page cursor for popular, genre and search listings
///
/// An unfiltered listing starts on a random page so the home screen varies
/// between sessions. Any filter or search starts on page 1. "Load more"
/// always continues sequentially from wherever the listing started.
#[derive(Debug, Clone)]
pub struct Feed {
    source: FeedSource,
    next_page: u32,
}

impl Default for Feed {
    fn default() -> Self {
        Self::new()
    }
}

impl Feed {
    pub fn new() -> Self {
        Self {
            source: FeedSource::default(),
            next_page: 1,
        }
    }

    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    /// Active filters; a search has none
    pub fn filters(&self) -> FilterState {
        match &self.source {
            FeedSource::Discover(filters) => filters.clone(),
            FeedSource::Search(_) => FilterState::default(),
        }
    }

    /// Restarts the listing and returns the request for its first page
    pub fn start<R: Rng + ?Sized>(&mut self, source: FeedSource, rng: &mut R) -> FeedRequest {
        let source = match source {
            FeedSource::Discover(filters) => FeedSource::Discover(filters.normalized()),
            search => search,
        };

        let first_page = match &source {
            FeedSource::Discover(filters) if !filters.is_active() => {
                rng.gen_range(RANDOM_PAGE_RANGE)
            }
            _ => 1,
        };

        self.source = source;
        self.next_page = first_page + 1;

        FeedRequest {
            source: self.source.clone(),
            page: first_page,
        }
    }

    /// Request for the page after the last one handed out
    pub fn next(&mut self) -> FeedRequest {
        let page = self.next_page;
        self.next_page += 1;

        FeedRequest {
            source: self.source.clone(),
            page,
        }
    }
}

/// Fetches the movies of one feed page
pub async fn fetch_page(
    provider: &dyn MetadataProvider,
    request: &FeedRequest,
) -> AppResult<Vec<MovieSummary>> {
    let page = match &request.source {
        FeedSource::Discover(filters) => {
            provider
                .discover(&DiscoverQuery::new(filters, request.page))
                .await?
        }
        FeedSource::Search(query) => provider.search(query, request.page).await?,
    };
    Ok(page.results)
}

/// Drops adult titles and caps the page at [`PAGE_SIZE`]
pub fn shape_page(results: Vec<MovieSummary>) -> Vec<MovieSummary> {
    results
        .into_iter()
        .filter(|m| !m.adult)
        .take(PAGE_SIZE)
        .collect()
}

/// Appends a shaped page, skipping ids already listed
///
/// Returns the number of movies added. Merging the same page twice adds
/// nothing the second time.
pub fn merge_page(existing: &mut Vec<MovieSummary>, page: Vec<MovieSummary>) -> usize {
    let mut known: HashSet<_> = existing.iter().map(|m| m.id).collect();
    let before = existing.len();

    existing.extend(
        shape_page(page)
            .into_iter()
            .filter(|m| known.insert(m.id)),
    );

    existing.len() - before
}
