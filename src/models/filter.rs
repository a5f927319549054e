use serde::{Deserialize, Serialize};

/// Genre ids never shown in the feed (documentary, music)
pub const EXCLUDED_GENRE_IDS: [i64; 2] = [99, 10402];

/// Vote-count floor for the default feed and mixed filters
pub const DEFAULT_VOTE_FLOOR: u32 = 300;

/// Looser vote-count floor when browsing a single genre
pub const GENRE_VOTE_FLOOR: u32 = 100;

const SORT_BY: &str = "popularity.desc";

/// User-selected feed filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub genre_id: Option<i64>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub min_rating: Option<f32>,
}

impl FilterState {
    /// A minimum rating of zero (or below) filters nothing and is dropped.
    pub fn normalized(mut self) -> Self {
        if matches!(self.min_rating, Some(r) if r <= 0.0) {
            self.min_rating = None;
        }
        self
    }

    pub fn is_active(&self) -> bool {
        self.genre_id.is_some() || self.year.is_some() || self.min_rating.is_some()
    }

    pub fn is_genre_only(&self) -> bool {
        self.genre_id.is_some() && self.year.is_none() && self.min_rating.is_none()
    }
}

/// Parameters of one `/discover/movie` request
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverQuery {
    pub page: u32,
    pub with_genre: Option<i64>,
    pub year: Option<i32>,
    pub min_rating: Option<f32>,
    pub vote_count_floor: u32,
}

impl DiscoverQuery {
    /// Builds the query for `page`, adding the fixed quality constraints
    pub fn new(filters: &FilterState, page: u32) -> Self {
        let vote_count_floor = if filters.is_genre_only() {
            GENRE_VOTE_FLOOR
        } else {
            DEFAULT_VOTE_FLOOR
        };

        Self {
            page,
            with_genre: filters.genre_id,
            year: filters.year,
            min_rating: filters.min_rating,
            vote_count_floor,
        }
    }

    /// Query-string pairs, excluding the api key and locale
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let without = EXCLUDED_GENRE_IDS
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut params = vec![
            ("page", self.page.to_string()),
            ("sort_by", SORT_BY.to_string()),
            ("include_adult", "false".to_string()),
            ("without_genres", without),
            ("vote_count.gte", self.vote_count_floor.to_string()),
        ];

        if let Some(genre) = self.with_genre {
            params.push(("with_genres", genre.to_string()));
        }
        if let Some(year) = self.year {
            params.push(("primary_release_year", year.to_string()));
        }
        if let Some(rating) = self.min_rating {
            params.push(("vote_average.gte", rating.to_string()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_zero_min_rating_is_no_filter() {
        let filters = FilterState {
            min_rating: Some(0.0),
            ..Default::default()
        }
        .normalized();

        assert_eq!(filters.min_rating, None);
        assert!(!filters.is_active());
    }

    #[test]
    fn test_fixed_constraints_always_present() {
        let params = DiscoverQuery::new(&FilterState::default(), 7).to_params();

        assert_eq!(param(&params, "page"), Some("7"));
        assert_eq!(param(&params, "include_adult"), Some("false"));
        assert_eq!(param(&params, "without_genres"), Some("99,10402"));
        assert_eq!(param(&params, "vote_count.gte"), Some("300"));
        assert_eq!(param(&params, "with_genres"), None);
    }

    #[test]
    fn test_genre_only_uses_looser_floor() {
        let genre_only = FilterState {
            genre_id: Some(28),
            ..Default::default()
        };
        let query = DiscoverQuery::new(&genre_only, 1);
        assert_eq!(query.vote_count_floor, GENRE_VOTE_FLOOR);
        assert_eq!(param(&query.to_params(), "with_genres"), Some("28"));

        let mixed = FilterState {
            genre_id: Some(28),
            year: Some(2020),
            min_rating: Some(7.0),
        };
        let params = DiscoverQuery::new(&mixed, 1).to_params();
        assert_eq!(param(&params, "vote_count.gte"), Some("300"));
        assert_eq!(param(&params, "primary_release_year"), Some("2020"));
        assert_eq!(param(&params, "vote_average.gte"), Some("7"));
    }
}
