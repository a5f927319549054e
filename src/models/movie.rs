use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{null_to_default, MovieId};

/// A movie as it appears in grids, the roulette and the banner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: MovieId,
    #[serde(default, deserialize_with = "null_to_default")]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    /// ISO date, possibly partial or empty for unreleased titles
    #[serde(default, deserialize_with = "null_to_default")]
    pub release_date: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "null_to_default")]
    pub overview: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub adult: bool,
}

impl MovieSummary {
    /// Release year parsed from the leading part of the release date
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.get(..4)?.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub character: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchProvider {
    pub provider_id: i64,
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
}

/// Where a movie can be watched in one country
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CountryProviders {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<WatchProvider>,
    #[serde(default)]
    pub rent: Vec<WatchProvider>,
    #[serde(default)]
    pub buy: Vec<WatchProvider>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    #[serde(default)]
    pub name: String,
}

impl Video {
    pub fn is_youtube_trailer(&self) -> bool {
        self.site == "YouTube" && self.video_type == "Trailer"
    }
}

/// Full movie record shown in the detail modal; fetched on demand, never persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub summary: MovieSummary,
    pub runtime_minutes: u32,
    pub genres: Vec<Genre>,
    pub cast: Vec<CastMember>,
    /// Country code (ISO 3166-1) to providers
    pub watch_providers: BTreeMap<String, CountryProviders>,
    pub videos: Vec<Video>,
}

impl MovieDetails {
    pub fn trailer(&self) -> Option<&Video> {
        self.videos.iter().find(|v| v.is_youtube_trailer())
    }
}

// ============================================================================
// TMDB wire types
// ============================================================================

/// One page of list results
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchProvidersResponse {
    #[serde(default)]
    pub results: BTreeMap<String, CountryProviders>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideosResponse {
    #[serde(default)]
    pub results: Vec<Video>,
}

/// Raw `/movie/{id}` response with credits, watch providers and videos appended
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    #[serde(flatten)]
    pub summary: MovieSummary,
    #[serde(default, deserialize_with = "null_to_default")]
    pub runtime: u32,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub credits: Option<Credits>,
    #[serde(rename = "watch/providers", default)]
    pub watch_providers: Option<WatchProvidersResponse>,
    #[serde(default)]
    pub videos: Option<VideosResponse>,
}

impl From<TmdbMovieDetails> for MovieDetails {
    fn from(raw: TmdbMovieDetails) -> Self {
        Self {
            summary: raw.summary,
            runtime_minutes: raw.runtime,
            genres: raw.genres,
            cast: raw.credits.unwrap_or_default().cast,
            watch_providers: raw.watch_providers.unwrap_or_default().results,
            videos: raw.videos.unwrap_or_default().results,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseDatesResponse {
    #[serde(default)]
    pub results: Vec<CountryReleaseDates>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryReleaseDates {
    pub iso_3166_1: String,
    #[serde(default)]
    pub release_dates: Vec<ReleaseDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseDate {
    #[serde(default, deserialize_with = "null_to_default")]
    pub certification: String,
}

impl ReleaseDatesResponse {
    /// First non-empty certification published for `region`
    pub fn certification_for(&self, region: &str) -> Option<&str> {
        self.results
            .iter()
            .find(|r| r.iso_3166_1 == region)?
            .release_dates
            .iter()
            .map(|rd| rd.certification.as_str())
            .find(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageInfo {
    pub file_path: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub iso_639_1: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MovieImages {
    #[serde(default)]
    pub backdrops: Vec<ImageInfo>,
    #[serde(default)]
    pub posters: Vec<ImageInfo>,
    #[serde(default)]
    pub logos: Vec<ImageInfo>,
}
