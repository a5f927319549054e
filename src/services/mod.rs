pub mod dashboard;
pub mod display;
pub mod feed;
pub mod lists;
pub mod providers;
pub mod roulette;
pub mod stats;
pub mod sync;

pub use dashboard::{CollectionSnapshot, Dashboard, DisplayedMovie};
pub use lists::{FavoriteToggle, ListsSnapshot, SharedLists};
pub use providers::{MetadataProvider, TmdbProvider};
pub use roulette::{AddOutcome, Roulette, RouletteSnapshot, SpinTicket};
pub use stats::WatchStats;
pub use sync::{SyncHandle, SyncState, SyncStatus, SyncTarget, SyncWriter};
