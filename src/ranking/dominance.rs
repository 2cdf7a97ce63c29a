//! Pareto dominance.

use crate::fitness::Direction;

/// Outcome of a Pareto-dominance comparison between `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    /// `a` is no worse in every objective and strictly better in one.
    ADominates,
    /// `b` is no worse in every objective and strictly better in one.
    BDominates,
    /// Neither dominates (includes identical vectors).
    Incomparable,
}

/// Compares objective vectors under the run's optimisation direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DominanceComparator {
    direction: Direction,
}

impl DominanceComparator {
    /// Creates a comparator for the given direction.
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }

    /// The direction this comparator orients values with.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Compares two raw objective vectors.
    ///
    /// # Panics
    /// Debug builds panic if the vectors have different lengths.
    pub fn compare(&self, a: &[f64], b: &[f64]) -> Dominance {
        debug_assert_eq!(a.len(), b.len(), "objective vectors differ in length");
        let mut a_better = false;
        let mut b_better = false;
        for (&va, &vb) in a.iter().zip(b.iter()) {
            let (ka, kb) = (self.direction.orient(va), self.direction.orient(vb));
            if ka < kb {
                a_better = true;
            } else if kb < ka {
                b_better = true;
            }
            if a_better && b_better {
                return Dominance::Incomparable;
            }
        }
        match (a_better, b_better) {
            (true, false) => Dominance::ADominates,
            (false, true) => Dominance::BDominates,
            _ => Dominance::Incomparable,
        }
    }

    /// Maps a raw objective vector to minimizing keys.
    pub fn orient(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.direction.orient(v)).collect()
    }
}

/// Dominance between two vectors where every objective is minimized.
pub fn dominance(a: &[f64], b: &[f64]) -> Dominance {
    DominanceComparator::new(Direction::Minimize).compare(a, b)
}
