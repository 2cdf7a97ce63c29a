//! NSGA-II generation step.
//!
//! Parents are picked by crowded binary tournament (lower rank wins, then
//! larger crowding distance); the union of parents and offspring is cut
//! back to the population size front by front.

use rand::Rng;

use crate::candidate::{Candidate, CandidateFactory, Individual};
use crate::engine::context::SearchContext;
use crate::fitness::FitnessProvider;
use crate::ranking::{select_by_fronts, DominanceComparator};

pub(super) fn step<C, P, F>(ctx: &mut SearchContext<C, P, F>, population: &mut Vec<Individual<C>>)
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let n = population.len();
    let standing: Vec<(usize, f64)> = population
        .iter()
        .map(|ind| (ind.rank(), ind.crowding_distance()))
        .collect();

    let mut union = population.clone();
    while union.len() < 2 * n {
        let offspring = ctx.breed(population, |rng| crowded_tournament(&standing, rng));
        for mut child in [offspring.first, offspring.second] {
            if union.len() < 2 * n {
                ctx.evaluate(&mut child);
                union.push(child);
            }
        }
    }

    let objectives = oriented_objectives(ctx, &union);
    let selection = select_by_fronts(&objectives, n);
    *population = selection
        .selected
        .iter()
        .map(|&i| {
            let mut ind = union[i].clone();
            ind.rank = selection.ranks[i];
            ind.crowding_distance = selection.crowding[i];
            ind
        })
        .collect();
}

/// Sets rank and crowding distance on every individual.
pub(super) fn assign_ranks<C, P, F>(ctx: &SearchContext<C, P, F>, population: &mut [Individual<C>])
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let objectives = oriented_objectives(ctx, population);
    let selection = select_by_fronts(&objectives, population.len());
    for (i, ind) in population.iter_mut().enumerate() {
        ind.rank = selection.ranks[i];
        ind.crowding_distance = selection.crowding[i];
    }
}

pub(super) fn oriented_objectives<C, P, F>(ctx: &SearchContext<C, P, F>, population: &[Individual<C>]) -> Vec<Vec<f64>>
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let comparator = DominanceComparator::new(ctx.direction);
    population
        .iter()
        .map(|ind| comparator.orient(ind.fitness_values()))
        .collect()
}

/// Binary tournament on `(rank, crowding)`.
fn crowded_tournament<R: Rng>(standing: &[(usize, f64)], rng: &mut R) -> usize {
    let a = rng.random_range(0..standing.len());
    let b = rng.random_range(0..standing.len());
    let (ra, ca) = standing[a];
    let (rb, cb) = standing[b];
    if ra < rb || (ra == rb && ca > cb) {
        a
    } else {
        b
    }
}
