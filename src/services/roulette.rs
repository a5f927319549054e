use rand::Rng;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{MovieId, MovieSummary};

/// Fewest candidates a spin accepts
pub const MIN_CANDIDATES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Added,
    /// Already in the pool; nothing changed
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    Empty,
    NeedsOneMore,
    Ready,
}

/// A drawn spin waiting for its animation to finish
///
/// `segments` is the pool as it was when the index was drawn. The wheel is
/// rendered from it, so `index` always names the segment it lands on even
/// if the live pool changes before completion.
#[derive(Debug, Clone, Serialize)]
pub struct SpinTicket {
    pub spin_id: u64,
    pub index: usize,
    pub segments: Vec<MovieSummary>,
}

impl SpinTicket {
    pub fn selected(&self) -> &MovieSummary {
        &self.segments[self.index]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouletteSnapshot {
    pub pool: Vec<MovieSummary>,
    pub state: PoolState,
    pub last_selected: Option<MovieSummary>,
    pub spinning: Option<u64>,
}

/// Session-only candidate pool with uniform selection and one-step undo
#[derive(Debug, Default)]
pub struct Roulette {
    pool: Vec<MovieSummary>,
    last_selected: Option<MovieSummary>,
    active_spin: Option<SpinTicket>,
    next_spin_id: u64,
}

impl Roulette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(&self) -> &[MovieSummary] {
        &self.pool
    }

    pub fn last_selected(&self) -> Option<&MovieSummary> {
        self.last_selected.as_ref()
    }

    pub fn contains(&self, movie_id: MovieId) -> bool {
        self.pool.iter().any(|m| m.id == movie_id)
    }

    pub fn pool_state(&self) -> PoolState {
        match self.pool.len() {
            0 => PoolState::Empty,
            n if n < MIN_CANDIDATES => PoolState::NeedsOneMore,
            _ => PoolState::Ready,
        }
    }

    pub fn snapshot(&self) -> RouletteSnapshot {
        RouletteSnapshot {
            pool: self.pool.clone(),
            state: self.pool_state(),
            last_selected: self.last_selected.clone(),
            spinning: self.active_spin.as_ref().map(|s| s.spin_id),
        }
    }

    pub fn add(&mut self, movie: MovieSummary) -> AddOutcome {
        if self.contains(movie.id) {
            tracing::debug!(movie_id = movie.id, "Movie already in the roulette");
            return AddOutcome::Duplicate;
        }

        tracing::debug!(movie_id = movie.id, pool = self.pool.len() + 1, "Added roulette candidate");
        self.pool.push(movie);
        AddOutcome::Added
    }

    /// Removes a candidate; clears the last pick if it was that movie
    pub fn remove(&mut self, movie_id: MovieId) -> bool {
        let before = self.pool.len();
        self.pool.retain(|m| m.id != movie_id);

        if self.last_selected.as_ref().map(|m| m.id) == Some(movie_id) {
            self.last_selected = None;
        }
        before != self.pool.len()
    }

    /// Draws the winning index before any animation starts
    ///
    /// Selection is with replacement: the pool is not depleted. A spin that
    /// was never completed is abandoned and its ticket stops being accepted.
    pub fn spin<R: Rng + ?Sized>(&mut self, rng: &mut R) -> AppResult<SpinTicket> {
        if self.pool.len() < MIN_CANDIDATES {
            return Err(AppError::Conflict(format!(
                "The roulette needs at least {} movies to spin, it has {}",
                MIN_CANDIDATES,
                self.pool.len()
            )));
        }

        if let Some(abandoned) = &self.active_spin {
            tracing::warn!(
                spin_id = abandoned.spin_id,
                "Abandoning a spin that was never completed"
            );
        }

        self.next_spin_id += 1;
        let ticket = SpinTicket {
            spin_id: self.next_spin_id,
            index: rng.gen_range(0..self.pool.len()),
            segments: self.pool.clone(),
        };

        tracing::info!(
            spin_id = ticket.spin_id,
            index = ticket.index,
            candidates = ticket.segments.len(),
            "Roulette spin drawn"
        );
        self.active_spin = Some(ticket.clone());
        Ok(ticket)
    }

    /// Publishes the result of a spin once its animation has ended
    pub fn complete_spin(&mut self, spin_id: u64) -> AppResult<MovieSummary> {
        let ticket = match self.active_spin.take() {
            Some(ticket) if ticket.spin_id == spin_id => ticket,
            other => {
                self.active_spin = other;
                return Err(AppError::NotFound(format!(
                    "No spin {} in progress",
                    spin_id
                )));
            }
        };

        let selected = ticket.selected().clone();
        tracing::info!(spin_id = spin_id, movie_id = selected.id, "Roulette selected a movie");
        self.last_selected = Some(selected.clone());
        Ok(selected)
    }

    /// Forgets the most recent pick; returns it, or `None` if there was none
    pub fn undo_last(&mut self) -> Option<MovieSummary> {
        self.last_selected.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::test_support::movie;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn roulette_with(ids: impl IntoIterator<Item = MovieId>) -> Roulette {
        let mut roulette = Roulette::new();
        for id in ids {
            roulette.add(movie(id));
        }
        roulette
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut roulette = Roulette::new();
        assert_eq!(roulette.add(movie(1)), AddOutcome::Added);
        assert_eq!(roulette.add(movie(1)), AddOutcome::Duplicate);
        assert_eq!(roulette.pool().len(), 1);
    }

    #[test]
    fn test_pool_states() {
        let mut roulette = Roulette::new();
        assert_eq!(roulette.pool_state(), PoolState::Empty);
        roulette.add(movie(1));
        assert_eq!(roulette.pool_state(), PoolState::NeedsOneMore);
        roulette.add(movie(2));
        assert_eq!(roulette.pool_state(), PoolState::Ready);
    }

    #[test]
    fn test_spin_requires_two_candidates() {
        let mut rng = StdRng::seed_from_u64(0);

        let mut roulette = Roulette::new();
        assert!(matches!(roulette.spin(&mut rng), Err(AppError::Conflict(_))));

        roulette.add(movie(1));
        assert!(matches!(roulette.spin(&mut rng), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_spin_is_uniform() {
        const N: usize = 6;
        const SPINS: usize = 10_000;

        let mut rng = StdRng::seed_from_u64(1234);
        let mut roulette = roulette_with(1..=N as MovieId);
        let mut counts = [0usize; N];

        for _ in 0..SPINS {
            let ticket = roulette.spin(&mut rng).unwrap();
            assert!(ticket.index < N);
            counts[ticket.index] += 1;
            roulette.complete_spin(ticket.spin_id).unwrap();
        }

        // ~6 standard deviations of a binomial(10_000, 1/6)
        let expected = SPINS as f64 / N as f64;
        for count in counts {
            assert!(
                (count as f64 - expected).abs() < 225.0,
                "counts {:?} not uniform",
                counts
            );
        }
        assert_eq!(roulette.pool().len(), N);
    }

    #[test]
    fn test_spin_snapshot_survives_mid_spin_removal() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut roulette = roulette_with([10, 20, 30]);

        let ticket = roulette.spin(&mut rng).unwrap();
        let expected = ticket.selected().id;

        roulette.remove(expected);
        roulette.add(movie(40));

        let selected = roulette.complete_spin(ticket.spin_id).unwrap();
        assert_eq!(selected.id, expected);
        assert_eq!(roulette.last_selected().map(|m| m.id), Some(expected));
    }

    #[test]
    fn test_complete_only_the_active_spin() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut roulette = roulette_with([1, 2]);

        let ticket = roulette.spin(&mut rng).unwrap();
        assert!(matches!(
            roulette.complete_spin(ticket.spin_id + 1),
            Err(AppError::NotFound(_))
        ));
        assert!(roulette.complete_spin(ticket.spin_id).is_ok());
        assert!(roulette.complete_spin(ticket.spin_id).is_err());
    }

    #[test]
    fn test_unfinished_spin_is_replaced() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut roulette = roulette_with([1, 2]);

        let abandoned = roulette.spin(&mut rng).unwrap();
        roulette.remove(1);
        roulette.remove(2);
        roulette.add(movie(3));
        roulette.add(movie(4));

        let ticket = roulette.spin(&mut rng).unwrap();
        assert_eq!(roulette.snapshot().spinning, Some(ticket.spin_id));
        assert!(matches!(
            roulette.complete_spin(abandoned.spin_id),
            Err(AppError::NotFound(_))
        ));

        let selected = roulette.complete_spin(ticket.spin_id).unwrap();
        assert!([3, 4].contains(&selected.id));
        assert_eq!(roulette.snapshot().spinning, None);
    }

    #[test]
    fn test_undo_last() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut roulette = roulette_with([1, 2]);

        assert_eq!(roulette.undo_last(), None);

        let ticket = roulette.spin(&mut rng).unwrap();
        let selected = roulette.complete_spin(ticket.spin_id).unwrap();

        assert_eq!(roulette.undo_last(), Some(selected));
        assert_eq!(roulette.last_selected(), None);
        assert_eq!(roulette.pool().len(), 2);
    }

    #[test]
    fn test_removing_last_pick_clears_it() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut roulette = roulette_with([1, 2]);

        let ticket = roulette.spin(&mut rng).unwrap();
        let selected = roulette.complete_spin(ticket.spin_id).unwrap();
        let other = if selected.id == 1 { 2 } else { 1 };

        assert!(roulette.remove(other));
        assert!(roulette.last_selected().is_some());

        assert!(roulette.remove(selected.id));
        assert!(roulette.last_selected().is_none());
        assert_eq!(roulette.pool_state(), PoolState::Empty);
    }
}
