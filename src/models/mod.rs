use serde::{Deserialize, Deserializer};

pub mod filter;
pub mod movie;
pub mod shared_list;
pub mod view;

pub use filter::{DiscoverQuery, FilterState};
pub use movie::{
    CastMember, CountryProviders, Genre, ImageInfo, MovieDetails, MovieImages, MovieSummary,
    Page, ReleaseDatesResponse, TmdbMovieDetails, Video, WatchProvider, WatchProvidersResponse,
};
pub use shared_list::{MovieRating, Person, RatingsMap, SharedListDocument, StarRating};
pub use view::ActiveView;

/// Externally assigned movie identifier
pub type MovieId = i64;

/// Treats an explicit JSON `null` the same as a missing field.
///
/// The metadata service sends `null` for unknown runtimes, overviews and
/// release dates on obscure titles.
pub(crate) fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
