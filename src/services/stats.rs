use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Genre, MovieDetails, Person, RatingsMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Runtime {
    pub hours: u32,
    pub minutes: u32,
}

impl Runtime {
    pub fn from_minutes(total: u32) -> Self {
        Self {
            hours: total / 60,
            minutes: total % 60,
        }
    }
}

/// Aggregates over the seen list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchStats {
    pub total_watched: usize,
    pub total_runtime: Runtime,
    /// Mean metadata vote, one decimal
    pub average_vote: f64,
    #[serde(rename = "personA_average")]
    pub person_a_average: Option<f64>,
    #[serde(rename = "personB_average")]
    pub person_b_average: Option<f64>,
    pub top_genre: Option<Genre>,
    /// Seen ids that could not be resolved and are left out of the numbers
    pub unresolved: usize,
}

impl WatchStats {
    pub fn compute(seen: &[MovieDetails], ratings: &RatingsMap) -> Self {
        let total_minutes = seen.iter().map(|m| m.runtime_minutes).sum();

        let average_vote = if seen.is_empty() {
            0.0
        } else {
            let sum: f64 = seen.iter().map(|m| m.summary.vote_average).sum();
            round_one_decimal(sum / seen.len() as f64)
        };

        Self {
            total_watched: seen.len(),
            total_runtime: Runtime::from_minutes(total_minutes),
            average_vote,
            person_a_average: person_average(seen, ratings, Person::PersonA),
            person_b_average: person_average(seen, ratings, Person::PersonB),
            top_genre: top_genre(seen),
            unresolved: 0,
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean of one person's ratings over the seen movies they rated
fn person_average(seen: &[MovieDetails], ratings: &RatingsMap, person: Person) -> Option<f64> {
    let values: Vec<f64> = seen
        .iter()
        .filter_map(|m| ratings.get(&m.summary.id)?.get(person))
        .map(|r| f64::from(r.value()))
        .collect();

    if values.is_empty() {
        return None;
    }
    Some(round_one_decimal(values.iter().sum::<f64>() / values.len() as f64))
}

/// Most frequent genre; ties go to the genre that reached the count first
fn top_genre(seen: &[MovieDetails]) -> Option<Genre> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    let mut best: Option<(&Genre, usize)> = None;

    for genre in seen.iter().flat_map(|m| &m.genres) {
        let count = counts.entry(genre.id).or_default();
        *count += 1;
        if best.map_or(true, |(_, top)| *count > top) {
            best = Some((genre, *count));
        }
    }

    best.map(|(genre, _)| genre.clone())
}
