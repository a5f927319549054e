use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;

use super::MovieId;
use crate::error::{AppError, AppResult};

/// One of the two people sharing the lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Person {
    #[serde(rename = "personA")]
    PersonA,
    #[serde(rename = "personB")]
    PersonB,
}

impl Display for Person {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Person::PersonA => write!(f, "personA"),
            Person::PersonB => write!(f, "personB"),
        }
    }
}

/// Star rating in `[0, 5]` with half-star precision
///
/// [`StarRating::new`] rejects anything off the grid. Deserializing is
/// lenient instead: stored values written by other clients are snapped to
/// the nearest half star so one odd entry never makes the document unreadable.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(into = "f32")]
pub struct StarRating(f32);

impl StarRating {
    pub const MAX: f32 = 5.0;

    pub fn new(value: f32) -> AppResult<Self> {
        if !(0.0..=Self::MAX).contains(&value) || (value * 2.0).fract() != 0.0 {
            return Err(AppError::InvalidInput(format!(
                "Rating must be between 0 and 5 in steps of 0.5, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Rating picked on a five-star control.
    ///
    /// `star` is the 1-based star under the pointer; the left half of a star
    /// selects half a point less than the star itself.
    pub fn from_pointer(star: u8, in_left_half: bool) -> AppResult<Self> {
        if !(1..=5).contains(&star) {
            return Err(AppError::InvalidInput(format!(
                "Star index must be between 1 and 5, got {}",
                star
            )));
        }
        let value = f32::from(star) - if in_left_half { 0.5 } else { 0.0 };
        Self::new(value)
    }

    /// Nearest valid rating, clamped to the scale
    pub fn snapped(value: f32) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self((value.clamp(0.0, Self::MAX) * 2.0).round() / 2.0)
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl<'de> Deserialize<'de> for StarRating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f32::deserialize(deserializer)?;
        let rating = Self::snapped(value);
        if rating.0 != value {
            tracing::warn!(
                stored = value,
                used = rating.0,
                "Stored rating is off the half-star scale"
            );
        }
        Ok(rating)
    }
}

impl From<StarRating> for f32 {
    fn from(rating: StarRating) -> Self {
        rating.0
    }
}

/// Both people's ratings for one movie
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRating {
    #[serde(rename = "personA", default, skip_serializing_if = "Option::is_none")]
    pub person_a: Option<StarRating>,
    #[serde(rename = "personB", default, skip_serializing_if = "Option::is_none")]
    pub person_b: Option<StarRating>,
}

impl MovieRating {
    pub fn get(&self, person: Person) -> Option<StarRating> {
        match person {
            Person::PersonA => self.person_a,
            Person::PersonB => self.person_b,
        }
    }

    pub fn set(&mut self, person: Person, rating: StarRating) {
        match person {
            Person::PersonA => self.person_a = Some(rating),
            Person::PersonB => self.person_b = Some(rating),
        }
    }
}

pub type RatingsMap = BTreeMap<MovieId, MovieRating>;

/// The single document shared by both people
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedListDocument {
    /// Ranked favorites, first is the top pick
    #[serde(default)]
    pub favorites: Vec<MovieId>,
    /// Watched movies, order not meaningful
    #[serde(default)]
    pub seen: Vec<MovieId>,
    #[serde(default)]
    pub ratings: RatingsMap,
}

impl SharedListDocument {
    /// Drops duplicate ids and any favorite that is also seen.
    ///
    /// Returns true when the document had to be changed.
    pub fn normalize(&mut self) -> bool {
        let before = (self.favorites.len(), self.seen.len());

        let mut seen_set = HashSet::new();
        self.seen.retain(|id| seen_set.insert(*id));

        let mut fav_set = HashSet::new();
        self.favorites
            .retain(|id| !seen_set.contains(id) && fav_set.insert(*id));

        before != (self.favorites.len(), self.seen.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_rating_accepts_half_steps() {
        assert_eq!(StarRating::new(3.5).unwrap().value(), 3.5);
        assert_eq!(StarRating::new(0.0).unwrap().value(), 0.0);
        assert_eq!(StarRating::new(5.0).unwrap().value(), 5.0);
    }

    #[test]
    fn test_star_rating_rejects_out_of_range_and_fractions() {
        assert!(StarRating::new(5.5).is_err());
        assert!(StarRating::new(-0.5).is_err());
        assert!(StarRating::new(3.3).is_err());
        assert!(StarRating::new(f32::NAN).is_err());
    }

    #[test]
    fn test_from_pointer_halves() {
        assert_eq!(StarRating::from_pointer(4, true).unwrap().value(), 3.5);
        assert_eq!(StarRating::from_pointer(4, false).unwrap().value(), 4.0);
        assert_eq!(StarRating::from_pointer(1, true).unwrap().value(), 0.5);
        assert!(StarRating::from_pointer(0, false).is_err());
        assert!(StarRating::from_pointer(6, false).is_err());
    }

    #[test]
    fn test_document_wire_format() {
        let json = r#"{"favorites": [3, 1], "seen": [7], "ratings": {"7": {"personA": 3.5}}}"#;
        let doc: SharedListDocument = serde_json::from_str(json).unwrap();

        assert_eq!(doc.favorites, vec![3, 1]);
        assert_eq!(doc.ratings[&7].get(Person::PersonA).unwrap().value(), 3.5);
        assert_eq!(doc.ratings[&7].get(Person::PersonB), None);

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["ratings"]["7"], serde_json::json!({"personA": 3.5}));
    }

    #[test]
    fn test_stored_rating_off_the_scale_is_snapped() {
        let json = r#"{"ratings": {"7": {"personA": 3.3, "personB": 9}}}"#;
        let doc: SharedListDocument = serde_json::from_str(json).unwrap();

        assert_eq!(doc.ratings[&7].person_a, Some(StarRating::new(3.5).unwrap()));
        assert_eq!(doc.ratings[&7].person_b, Some(StarRating::new(5.0).unwrap()));
        assert_eq!(StarRating::snapped(-1.0).value(), 0.0);
        assert_eq!(StarRating::snapped(f32::NAN).value(), 0.0);
        // user input stays strict
        assert!(StarRating::new(3.3).is_err());
    }

    #[test]
    fn test_missing_fields_default() {
        let doc: SharedListDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(doc, SharedListDocument::default());
    }

    #[test]
    fn test_normalize_enforces_disjoint_lists() {
        let mut doc = SharedListDocument {
            favorites: vec![1, 2, 2, 3],
            seen: vec![3, 4, 4],
            ratings: RatingsMap::new(),
        };

        assert!(doc.normalize());
        assert_eq!(doc.favorites, vec![1, 2]);
        assert_eq!(doc.seen, vec![3, 4]);
        assert!(!doc.normalize());
    }
}
