//! Fitness contracts.
//!
//! The engine asks a [`FitnessProvider`] for one value per objective and
//! never interprets it beyond "better or worse" in the run's
//! [`Direction`]. Coverage-style objectives report `0.0` (minimizing) when
//! the goal is reached; hosts with other conventions override
//! [`FitnessProvider::covers`].

use std::cmp::Ordering;

use crate::candidate::ObjectiveId;
use crate::error::SearchError;

/// Optimisation direction shared by all objectives of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Lower values are better.
    #[default]
    Minimize,
    /// Higher values are better.
    Maximize,
}

impl Direction {
    /// Maps a raw value to a key where lower is always better.
    ///
    /// `NaN` (unevaluated) maps to `+inf`, the worst key.
    pub fn orient(self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::INFINITY;
        }
        match self {
            Direction::Minimize => value,
            Direction::Maximize => -value,
        }
    }

    /// Orders `a` before `b` when `a` is better.
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        self.orient(a).total_cmp(&self.orient(b))
    }

    /// Returns `true` if `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        self.orient(a) < self.orient(b)
    }

    /// The worst representable value in this direction.
    pub fn worst(self) -> f64 {
        match self {
            Direction::Minimize => f64::INFINITY,
            Direction::Maximize => f64::NEG_INFINITY,
        }
    }
}

/// Computes objective values for candidates.
///
/// Evaluation is synchronous; providers that need internal caches should use
/// interior mutability.
pub trait FitnessProvider<C> {
    /// Number of objectives. Objective ids run from `0` to `n - 1`.
    fn num_objectives(&self) -> usize;

    /// Fitness of `candidate` for one objective.
    fn evaluate(&self, candidate: &C, objective: ObjectiveId) -> f64;

    /// Whether this objective maximizes. Defaults to minimizing.
    fn is_maximizing(&self, _objective: ObjectiveId) -> bool {
        false
    }

    /// Whether `value` means the objective is fully satisfied (the target is
    /// covered). Defaults to `value <= 0.0` for minimizing objectives and
    /// never for maximizing ones.
    fn covers(&self, objective: ObjectiveId, value: f64) -> bool {
        !self.is_maximizing(objective) && value <= 0.0
    }
}

/// Checks the provider's objectives and returns their common direction.
pub(crate) fn resolve_direction<C, F: FitnessProvider<C> + ?Sized>(
    fitness: &F,
) -> Result<Direction, SearchError> {
    let n = fitness.num_objectives();
    if n == 0 {
        return Err(SearchError::NoObjectives);
    }
    let first = fitness.is_maximizing(ObjectiveId(0));
    if (1..n).any(|i| fitness.is_maximizing(ObjectiveId(i)) != first) {
        return Err(SearchError::MixedObjectiveDirections);
    }
    Ok(if first {
        Direction::Maximize
    } else {
        Direction::Minimize
    })
}

/// Normalizes a raw objective value into a heuristic score in `[0, 1]`
/// (higher is better, `1.0` means covered).
///
/// Minimizing distances map through `1 / (1 + v)`, maximizing scores through
/// `v / (1 + v)`. Negative inputs are clamped to zero.
pub fn normalized_heuristic(direction: Direction, value: f64, covered: bool) -> f64 {
    if covered {
        return 1.0;
    }
    if value.is_nan() {
        return 0.0;
    }
    let v = value.max(0.0);
    let h = match direction {
        Direction::Minimize => 1.0 / (1.0 + v),
        Direction::Maximize => {
            if v.is_infinite() {
                1.0
            } else {
                v / (1.0 + v)
            }
        }
    };
    // A finite, uncovered value never reaches a perfect score.
    h.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mixed;

    impl FitnessProvider<u8> for Mixed {
        fn num_objectives(&self) -> usize {
            2
        }
        fn evaluate(&self, _candidate: &u8, _objective: ObjectiveId) -> f64 {
            0.0
        }
        fn is_maximizing(&self, objective: ObjectiveId) -> bool {
            objective.index() == 1
        }
    }

    struct Empty;

    impl FitnessProvider<u8> for Empty {
        fn num_objectives(&self) -> usize {
            0
        }
        fn evaluate(&self, _candidate: &u8, _objective: ObjectiveId) -> f64 {
            0.0
        }
    }

    struct Maximizing;

    impl FitnessProvider<u8> for Maximizing {
        fn num_objectives(&self) -> usize {
            3
        }
        fn evaluate(&self, candidate: &u8, _objective: ObjectiveId) -> f64 {
            f64::from(*candidate)
        }
        fn is_maximizing(&self, _objective: ObjectiveId) -> bool {
            true
        }
    }

    #[test]
    fn test_direction_compare() {
        assert!(Direction::Minimize.is_better(1.0, 2.0));
        assert!(Direction::Maximize.is_better(2.0, 1.0));
        assert!(!Direction::Minimize.is_better(1.0, 1.0));
        assert_eq!(Direction::Minimize.compare(1.0, 2.0), Ordering::Less);
        assert_eq!(Direction::Maximize.compare(1.0, 2.0), Ordering::Greater);
    }

    #[test]
    fn test_nan_is_worst() {
        assert!(Direction::Minimize.is_better(1e300, f64::NAN));
        assert!(Direction::Maximize.is_better(-1e300, f64::NAN));
    }

    #[test]
    fn test_resolve_direction() {
        assert!(matches!(
            resolve_direction(&Mixed),
            Err(SearchError::MixedObjectiveDirections)
        ));
        assert!(matches!(
            resolve_direction(&Empty),
            Err(SearchError::NoObjectives)
        ));
        assert_eq!(resolve_direction(&Maximizing).ok(), Some(Direction::Maximize));
    }

    #[test]
    fn test_default_covers() {
        assert!(Empty.covers(ObjectiveId(0), 0.0));
        assert!(!Empty.covers(ObjectiveId(0), 0.5));
        assert!(!Maximizing.covers(ObjectiveId(0), 100.0));
    }

    #[test]
    fn test_normalized_heuristic() {
        let d = Direction::Minimize;
        assert!((normalized_heuristic(d, 0.0, true) - 1.0).abs() < 1e-12);
        assert!((normalized_heuristic(d, 1.0, false) - 0.5).abs() < 1e-12);
        assert!(normalized_heuristic(d, 3.0, false) < normalized_heuristic(d, 1.0, false));
        assert!(normalized_heuristic(d, f64::INFINITY, false).abs() < 1e-12);

        let d = Direction::Maximize;
        assert!((normalized_heuristic(d, 1.0, false) - 0.5).abs() < 1e-12);
        assert!(normalized_heuristic(d, 9.0, false) > normalized_heuristic(d, 1.0, false));
        assert!(normalized_heuristic(d, -4.0, false).abs() < 1e-12);
    }
}
