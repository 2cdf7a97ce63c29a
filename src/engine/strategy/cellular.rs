//! Cellular GA: each cell breeds only with its grid neighbourhood.
//!
//! Cells are laid out row-major on a torus of width `ceil(sqrt(n))`; grid
//! positions past the last individual are skipped. The update is
//! synchronous: every cell breeds from the previous generation and keeps
//! its best offspring only if it is not worse than the current occupant.

use crate::candidate::{Candidate, CandidateFactory, Individual};
use crate::engine::config::CellularModel;
use crate::engine::context::SearchContext;
use crate::fitness::FitnessProvider;

pub(super) fn step<C, P, F>(
    ctx: &mut SearchContext<C, P, F>,
    population: &mut Vec<Individual<C>>,
    model: CellularModel,
) where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let n = population.len();
    let keys = ctx.keys(population);
    let selection = ctx.config.selection;
    let direction = ctx.direction;
    let mut next = population.clone();

    for (cell, slot) in next.iter_mut().enumerate() {
        let neighbours = neighbourhood(model, cell, n);
        let local_keys: Vec<f64> = neighbours.iter().map(|&i| keys[i]).collect();
        let offspring = ctx.breed(population, |rng| neighbours[selection.select(&local_keys, rng)]);

        let (mut o1, mut o2) = (offspring.first, offspring.second);
        ctx.evaluate(&mut o1);
        ctx.evaluate(&mut o2);
        let best = if o2.compare_by_fitness(&o1, direction).is_lt() { o2 } else { o1 };

        if !direction.is_better(population[cell].aggregate_fitness(), best.aggregate_fitness()) {
            *slot = best;
        }
    }

    ctx.sort_population(&mut next);
    *population = next;
}

/// Grid width for `n` cells.
fn grid_width(n: usize) -> usize {
    let mut w = (n as f64).sqrt().ceil() as usize;
    // Guard against floating-point error on perfect squares.
    while w * w < n {
        w += 1;
    }
    w.max(1)
}

/// Indices of the cell and its neighbours, in a fixed order, without
/// duplicates.
pub(super) fn neighbourhood(model: CellularModel, cell: usize, n: usize) -> Vec<usize> {
    let mut out = vec![cell];
    let mut push = |i: usize| {
        if i < n && !out.contains(&i) {
            out.push(i);
        }
    };

    if model == CellularModel::OneDimension {
        push((cell + n - 1) % n);
        push((cell + 1) % n);
        return out;
    }

    let width = grid_width(n);
    let rows = n.div_ceil(width);
    let (row, col) = ((cell / width) as isize, (cell % width) as isize);
    let at = |dr: isize, dc: isize| {
        let r = (row + dr).rem_euclid(rows as isize) as usize;
        let c = (col + dc).rem_euclid(width as isize) as usize;
        r * width + c
    };

    let offsets: &[(isize, isize)] = match model {
        CellularModel::OneDimension | CellularModel::LinearFive => &[(-1, 0), (1, 0), (0, -1), (0, 1)],
        CellularModel::CompactNine => &[
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ],
        CellularModel::CompactThirteen => &[
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
            (-2, 0),
            (2, 0),
            (0, -2),
            (0, 2),
        ],
    };
    for &(dr, dc) in offsets {
        push(at(dr, dc));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::strategy::test_engines::onemax;
    use crate::engine::Strategy;

    #[test]
    fn test_grid_width() {
        assert_eq!(grid_width(1), 1);
        assert_eq!(grid_width(9), 3);
        assert_eq!(grid_width(10), 4);
    }

    #[test]
    fn test_linear_five_on_full_grid() {
        // 3x3 grid, centre cell 4.
        let mut n = neighbourhood(CellularModel::LinearFive, 4, 9);
        n.sort_unstable();
        assert_eq!(n, vec![1, 3, 4, 5, 7]);
    }

    #[test]
    fn test_linear_five_wraps() {
        // Corner cell 0 of a 3x3 torus: north wraps to 6, west wraps to 2.
        let mut n = neighbourhood(CellularModel::LinearFive, 0, 9);
        n.sort_unstable();
        assert_eq!(n, vec![0, 1, 2, 3, 6]);
    }

    #[test]
    fn test_compact_models_sizes() {
        assert_eq!(neighbourhood(CellularModel::CompactNine, 12, 25).len(), 9);
        assert_eq!(neighbourhood(CellularModel::CompactThirteen, 12, 25).len(), 13);
    }

    #[test]
    fn test_skips_missing_cells() {
        // 7 cells on a 3-wide grid: positions 7 and 8 do not exist.
        for cell in 0..7 {
            let n = neighbourhood(CellularModel::CompactNine, cell, 7);
            assert!(n.iter().all(|&i| i < 7));
            assert_eq!(n[0], cell);
        }
    }

    #[test]
    fn test_one_dimension_ring() {
        let mut n = neighbourhood(CellularModel::OneDimension, 0, 5);
        n.sort_unstable();
        assert_eq!(n, vec![0, 1, 4]);
    }

    #[test]
    fn test_cellular_run_monotone() {
        let mut engine = onemax(Strategy::Cellular(CellularModel::CompactNine), 16);
        let result = engine.run().unwrap();
        assert_eq!(engine.population_snapshot().len(), 16);
        for pair in result.fitness_history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12);
        }
    }
}
