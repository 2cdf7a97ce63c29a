//! Parent selection.
//!
//! Selection works on one scalar key per individual where **lower is
//! better**. The engine derives keys from aggregate fitness oriented by the
//! run's direction, or from a single target's fitness for target-focused
//! strategies.
//!
//! # References
//!
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"
//! - Goldberg & Deb (1991), "A Comparative Analysis of Selection Schemes
//!   Used in Genetic Algorithms"

use rand::Rng;
use std::cmp::Ordering;

/// Selection strategy for choosing parents.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use u_evosearch::engine::Selection;
///
/// let keys = [3.0, 0.5, 2.0];
/// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
/// let idx = Selection::Tournament(3).select(&keys, &mut rng);
/// assert!(idx < keys.len());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Pick `k` individuals at random, keep the best.
    ///
    /// - k=2: light pressure
    /// - k=3-5: moderate pressure (typical default)
    /// - k>5: strong pressure
    Tournament(usize),

    /// Fitness-proportionate selection on inverted keys.
    ///
    /// **Warning**: Susceptible to super-individual dominance when key
    /// variance is high.
    Roulette,

    /// Linear rank selection: weight `n - rank` with rank 0 the best.
    ///
    /// Reference: Baker (1985), "Adaptive Selection Methods for Genetic
    /// Algorithms"
    Rank,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Tournament(3)
    }
}

impl Selection {
    /// Selects an index into `keys`.
    ///
    /// # Panics
    /// Panics if `keys` is empty.
    pub fn select<R: Rng>(&self, keys: &[f64], rng: &mut R) -> usize {
        assert!(!keys.is_empty(), "cannot select from empty population");

        match self {
            Selection::Tournament(k) => tournament(keys, *k, rng),
            Selection::Roulette => roulette(keys, rng),
            Selection::Rank => rank(keys, rng),
        }
    }
}

fn tournament<R: Rng>(keys: &[f64], k: usize, rng: &mut R) -> usize {
    let n = keys.len();
    let mut best = rng.random_range(0..n);
    for _ in 1..k.max(1) {
        let idx = rng.random_range(0..n);
        if keys[idx] < keys[best] {
            best = idx;
        }
    }
    best
}

/// weight_i = max_key - key_i + epsilon, so the lowest key weighs most.
fn roulette<R: Rng>(keys: &[f64], rng: &mut R) -> usize {
    let n = keys.len();
    if n == 1 {
        return 0;
    }

    let finite_max = keys
        .iter()
        .copied()
        .filter(|k| k.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !finite_max.is_finite() {
        return rng.random_range(0..n);
    }

    let epsilon = 1e-10;
    let weights: Vec<f64> = keys
        .iter()
        .map(|&k| {
            if k.is_finite() {
                (finite_max - k + epsilon).max(epsilon)
            } else {
                epsilon
            }
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return rng.random_range(0..n);
    }

    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > threshold {
            return i;
        }
    }
    n - 1
}

fn rank<R: Rng>(keys: &[f64], rng: &mut R) -> usize {
    let n = keys.len();
    if n == 1 {
        return 0;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| keys[a].partial_cmp(&keys[b]).unwrap_or(Ordering::Equal));

    let total = (n * (n + 1)) as f64 / 2.0;
    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (r, &idx) in order.iter().enumerate() {
        cumulative += (n - r) as f64;
        if cumulative > threshold {
            return idx;
        }
    }
    order[n - 1]
}
