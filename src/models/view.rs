use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Which collection the client is currently looking at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    #[default]
    Popular,
    Favorites,
    Seen,
    Search,
    Genre,
    Roulette,
}

impl ActiveView {
    /// View to resume after a restart.
    ///
    /// Search and genre views depend on input that is not persisted, so they
    /// fall back to the popular feed.
    pub fn restorable(self) -> Self {
        match self {
            ActiveView::Search | ActiveView::Genre => ActiveView::Popular,
            other => other,
        }
    }

    /// Views whose contents come from the paged feed
    pub fn is_paged(self) -> bool {
        matches!(
            self,
            ActiveView::Popular | ActiveView::Search | ActiveView::Genre
        )
    }
}

impl Display for ActiveView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActiveView::Popular => "popular",
            ActiveView::Favorites => "favorites",
            ActiveView::Seen => "seen",
            ActiveView::Search => "search",
            ActiveView::Genre => "genre",
            ActiveView::Roulette => "roulette",
        };
        write!(f, "{}", name)
    }
}
