//! NSGA-II ranking: fast non-dominated sort, crowding distance and
//! front-wise truncation.
//!
//! All functions take objective vectors where every objective is
//! **minimized**; orient raw values with
//! [`DominanceComparator::orient`](super::DominanceComparator::orient) first.
//!
//! # References
//!
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective Genetic Algorithm: NSGA-II"

use super::dominance::{dominance, Dominance};

/// Result of non-dominated sorting.
#[derive(Debug, Clone)]
pub struct NondominatedSortResult {
    /// Pareto rank for each solution (0 = best front).
    pub ranks: Vec<usize>,

    /// Indices grouped by front: `fronts[0]` holds the rank-0 indices.
    pub fronts: Vec<Vec<usize>>,
}

/// Fast non-dominated sort (domination counts plus dominated lists, fronts
/// peeled one at a time).
///
/// # Complexity
/// O(m * n²)
///
/// # Example
///
/// ```
/// use u_evosearch::ranking::non_dominated_sort;
///
/// let objectives = vec![
///     vec![1.0, 5.0],
///     vec![2.0, 3.0],
///     vec![3.0, 3.0], // dominated by the second
///     vec![4.0, 1.0],
/// ];
/// let result = non_dominated_sort(&objectives);
/// assert_eq!(result.fronts, vec![vec![0, 1, 3], vec![2]]);
/// ```
pub fn non_dominated_sort(objectives: &[Vec<f64>]) -> NondominatedSortResult {
    let n = objectives.len();
    if n == 0 {
        return NondominatedSortResult {
            ranks: Vec::new(),
            fronts: Vec::new(),
        };
    }

    let mut domination_count = vec![0usize; n];
    let mut dominated: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut ranks = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            match dominance(&objectives[i], &objectives[j]) {
                Dominance::ADominates => {
                    dominated[i].push(j);
                    domination_count[j] += 1;
                }
                Dominance::BDominates => {
                    dominated[j].push(i);
                    domination_count[i] += 1;
                }
                Dominance::Incomparable => {}
            }
        }
    }

    let first: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    let mut fronts = vec![first];
    loop {
        let mut next = Vec::new();
        if let Some(current) = fronts.last() {
            for &i in current {
                for &j in &dominated[i] {
                    domination_count[j] -= 1;
                    if domination_count[j] == 0 {
                        ranks[j] = fronts.len();
                        next.push(j);
                    }
                }
            }
        }
        if next.is_empty() {
            break;
        }
        next.sort_unstable();
        fronts.push(next);
    }

    NondominatedSortResult { ranks, fronts }
}

/// Crowding distance of each solution within one front.
///
/// Boundary solutions of every objective get `f64::INFINITY`; interior ones
/// accumulate the neighbour gap normalized by the objective's range. Fronts
/// of size two or less are all infinite.
///
/// # Example
///
/// ```
/// use u_evosearch::ranking::crowding_distance;
///
/// let front = vec![vec![1.0, 5.0], vec![2.0, 3.0], vec![4.0, 1.0]];
/// let d = crowding_distance(&front);
/// assert!(d[0].is_infinite() && d[2].is_infinite());
/// assert!((d[1] - 2.0).abs() < 1e-12);
/// ```
pub fn crowding_distance(objectives: &[Vec<f64>]) -> Vec<f64> {
    let n = objectives.len();
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }

    let m = objectives[0].len();
    let mut distances = vec![0.0f64; n];
    let mut order: Vec<usize> = (0..n).collect();

    for obj in 0..m {
        order.sort_by(|&a, &b| objectives[a][obj].total_cmp(&objectives[b][obj]));

        distances[order[0]] = f64::INFINITY;
        distances[order[n - 1]] = f64::INFINITY;

        let range = objectives[order[n - 1]][obj] - objectives[order[0]][obj];
        if range > 0.0 && range.is_finite() {
            for w in 1..(n - 1) {
                let gap = objectives[order[w + 1]][obj] - objectives[order[w - 1]][obj];
                distances[order[w]] += gap / range;
            }
        }
    }

    distances
}

/// Outcome of NSGA-II environmental selection.
#[derive(Debug, Clone)]
pub struct FrontSelection {
    /// Indices of the survivors, best front first.
    pub selected: Vec<usize>,
    /// Pareto rank of every input solution.
    pub ranks: Vec<usize>,
    /// Crowding distance of every input solution within its own front.
    pub crowding: Vec<f64>,
}

/// Picks `target` survivors: whole fronts while they fit, then the
/// overflowing front by descending crowding distance.
///
/// Ties in crowding distance keep the lower index. Returns every index if
/// `target >= objectives.len()`.
pub fn select_by_fronts(objectives: &[Vec<f64>], target: usize) -> FrontSelection {
    let sort = non_dominated_sort(objectives);
    let mut crowding = vec![0.0f64; objectives.len()];
    for front in &sort.fronts {
        let front_objs: Vec<Vec<f64>> = front.iter().map(|&i| objectives[i].clone()).collect();
        for (&i, d) in front.iter().zip(crowding_distance(&front_objs)) {
            crowding[i] = d;
        }
    }

    let mut selected = Vec::with_capacity(target.min(objectives.len()));
    for front in &sort.fronts {
        let room = target - selected.len();
        if room == 0 {
            break;
        }
        if front.len() <= room {
            selected.extend_from_slice(front);
        } else {
            let mut by_distance = front.clone();
            by_distance.sort_by(|&a, &b| crowding[b].total_cmp(&crowding[a]).then(a.cmp(&b)));
            selected.extend_from_slice(&by_distance[..room]);
        }
    }

    FrontSelection {
        selected,
        ranks: sort.ranks,
        crowding,
    }
}

// ============================================================================
// Tests
// ============================================================================
