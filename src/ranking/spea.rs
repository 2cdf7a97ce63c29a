//! SPEA2 ranking: strength, raw fitness, nearest-neighbour density and
//! archive truncation.
//!
//! Objectives are **minimized** (orient them first). Density uses the
//! distance to the nearest neighbour (`k = 1`) in objective space.
//!
//! When several candidates share the lexicographically smallest distance
//! profile during truncation, the one that appears first in the current
//! archive order is removed.
//!
//! # References
//!
//! - Zitzler, Laumanns & Thiele (2001), "SPEA2: Improving the Strength
//!   Pareto Evolutionary Algorithm"

use std::cmp::Ordering;

use super::dominance::{dominance, Dominance};

/// Per-solution SPEA2 scores.
#[derive(Debug, Clone)]
pub struct StrengthResult {
    /// How many solutions each one dominates.
    pub strength: Vec<usize>,
    /// Sum of the strengths of each solution's dominators (0 = non-dominated).
    pub raw_fitness: Vec<f64>,
    /// `1 / (σ + 2)` where σ is the distance to the nearest neighbour.
    pub density: Vec<f64>,
    /// `raw_fitness + density`. Values below `1.0` are non-dominated.
    pub fitness: Vec<f64>,
}

/// Euclidean distance between two objective vectors.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Computes strength, raw fitness, density and total fitness for every
/// solution of the union.
///
/// # Complexity
/// O(m * n²)
pub fn compute_strength(objectives: &[Vec<f64>]) -> StrengthResult {
    let n = objectives.len();
    let mut strength = vec![0usize; n];
    let mut dominators: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            match dominance(&objectives[i], &objectives[j]) {
                Dominance::ADominates => {
                    strength[i] += 1;
                    dominators[j].push(i);
                }
                Dominance::BDominates => {
                    strength[j] += 1;
                    dominators[i].push(j);
                }
                Dominance::Incomparable => {}
            }
        }
    }

    let raw_fitness: Vec<f64> = dominators
        .iter()
        .map(|ds| ds.iter().map(|&d| strength[d] as f64).sum())
        .collect();

    let density: Vec<f64> = (0..n)
        .map(|i| {
            let sigma = (0..n)
                .filter(|&j| j != i)
                .map(|j| euclidean_distance(&objectives[i], &objectives[j]))
                .fold(f64::INFINITY, f64::min);
            1.0 / (sigma + 2.0)
        })
        .collect();

    let fitness = raw_fitness
        .iter()
        .zip(density.iter())
        .map(|(r, d)| r + d)
        .collect();

    StrengthResult {
        strength,
        raw_fitness,
        density,
        fitness,
    }
}

/// SPEA2 environmental selection.
///
/// Copies every solution with fitness below `1.0`. If that is too few, fills
/// up with the best dominated solutions (fitness ascending). If too many,
/// repeatedly removes the solution whose sorted distance list to the other
/// survivors is lexicographically smallest.
///
/// Returns `min(target, n)` distinct indices together with the scores.
pub fn environmental_select(objectives: &[Vec<f64>], target: usize) -> (Vec<usize>, StrengthResult) {
    let scores = compute_strength(objectives);
    let n = objectives.len();

    let mut archive: Vec<usize> = (0..n).filter(|&i| scores.fitness[i] < 1.0).collect();

    if archive.len() < target {
        let mut rest: Vec<usize> = (0..n).filter(|&i| scores.fitness[i] >= 1.0).collect();
        rest.sort_by(|&a, &b| scores.fitness[a].total_cmp(&scores.fitness[b]).then(a.cmp(&b)));
        let room = target - archive.len();
        archive.extend(rest.into_iter().take(room));
    } else if archive.len() > target {
        truncate(objectives, &mut archive, target);
    }

    (archive, scores)
}

/// Iterative nearest-neighbour truncation of `archive` down to `target`.
fn truncate(objectives: &[Vec<f64>], archive: &mut Vec<usize>, target: usize) {
    // For each archive member: distances to every other member, ascending,
    // tagged with the neighbour's index so removals can prune them.
    let mut lists: Vec<(usize, Vec<(f64, usize)>)> = archive
        .iter()
        .map(|&i| {
            let mut list: Vec<(f64, usize)> = archive
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| (euclidean_distance(&objectives[i], &objectives[j]), j))
                .collect();
            list.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            (i, list)
        })
        .collect();

    while lists.len() > target {
        let mut victim = 0;
        for pos in 1..lists.len() {
            if lexicographic_cmp(&lists[pos].1, &lists[victim].1) == Ordering::Less {
                victim = pos;
            }
        }
        let (removed, _) = lists.remove(victim);
        for (_, list) in lists.iter_mut() {
            list.retain(|&(_, j)| j != removed);
        }
    }

    archive.clear();
    archive.extend(lists.into_iter().map(|(i, _)| i));
}

fn lexicographic_cmp(a: &[(f64, usize)], b: &[(f64, usize)]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.0.total_cmp(&y.0) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_and_raw_fitness() {
        // 0 dominates 1 and 2; 1 dominates 2.
        let objs = vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]];
        let s = compute_strength(&objs);
        assert_eq!(s.strength, vec![2, 1, 0]);
        assert!((s.raw_fitness[0] - 0.0).abs() < 1e-12);
        assert!((s.raw_fitness[1] - 2.0).abs() < 1e-12);
        assert!((s.raw_fitness[2] - 3.0).abs() < 1e-12);
        assert!(s.fitness[0] < 1.0);
        assert!(s.fitness[1] >= 1.0);
    }

    #[test]
    fn test_density_nearest_neighbour() {
        let objs = vec![vec![0.0, 3.0], vec![3.0, 0.0], vec![0.0, 4.0]];
        let s = compute_strength(&objs);
        // Nearest neighbour of index 0 is index 2 at distance 1.
        assert!((s.density[0] - 1.0 / 3.0).abs() < 1e-12);
        // Single solution: no neighbour, density vanishes.
        let single = compute_strength(&[vec![1.0, 1.0]]);
        assert!(single.density[0].abs() < 1e-12);
    }

    #[test]
    fn test_fill_with_dominated() {
        let objs = vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]];
        let (selected, _) = environmental_select(&objs, 2);
        assert_eq!(selected, vec![0, 1]);
    }

    #[test]
    fn test_truncate_removes_most_crowded() {
        // Four non-dominated points; 1 and 2 are close together.
        let objs = vec![
            vec![0.0, 10.0],
            vec![4.9, 5.1],
            vec![5.0, 5.0],
            vec![10.0, 0.0],
        ];
        let (selected, _) = environmental_select(&objs, 3);
        assert_eq!(selected.len(), 3);
        assert!(selected.contains(&0));
        assert!(selected.contains(&3));
        assert!(selected.contains(&1) ^ selected.contains(&2));
    }

    #[test]
    fn test_identical_profiles_remove_first() {
        let objs = vec![vec![1.0, 2.0], vec![1.0, 2.0], vec![5.0, 0.0]];
        let (selected, _) = environmental_select(&objs, 2);
        assert_eq!(selected, vec![1, 2]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn selection_size_and_elitism(
                rows in prop::collection::vec(prop::collection::vec(0u8..8, 2), 1..20),
                target in 1usize..24,
            ) {
                let objs: Vec<Vec<f64>> = rows
                    .into_iter()
                    .map(|r| r.into_iter().map(f64::from).collect())
                    .collect();
                let (selected, scores) = environmental_select(&objs, target);
                prop_assert_eq!(selected.len(), target.min(objs.len()));

                let mut dedup = selected.clone();
                dedup.sort_unstable();
                dedup.dedup();
                prop_assert_eq!(dedup.len(), selected.len());

                let non_dominated = scores.fitness.iter().filter(|&&f| f < 1.0).count();
                if non_dominated >= target {
                    prop_assert!(selected.iter().all(|&i| scores.fitness[i] < 1.0));
                } else {
                    for i in 0..objs.len() {
                        if scores.fitness[i] < 1.0 {
                            prop_assert!(selected.contains(&i));
                        }
                    }
                }
            }
        }
    }
}
