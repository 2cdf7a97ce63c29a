//! Elitist generational GA.

use crate::candidate::{Candidate, CandidateFactory, Individual};
use crate::engine::context::SearchContext;
use crate::fitness::FitnessProvider;

/// Replaces the population with `elite_count` elites plus offspring.
///
/// Expects the population sorted best-first and leaves it sorted.
pub(super) fn step<C, P, F>(ctx: &mut SearchContext<C, P, F>, population: &mut Vec<Individual<C>>)
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let n = population.len();
    let keys = ctx.keys(population);
    let selection = ctx.config.selection;

    let elite = ctx.config.elite_count.min(n);
    let mut next: Vec<Individual<C>> = population[..elite].to_vec();

    while next.len() < n {
        let offspring = ctx.breed(population, |rng| selection.select(&keys, rng));
        for mut child in [offspring.first, offspring.second] {
            if next.len() < n {
                ctx.evaluate(&mut child);
                next.push(child);
            }
        }
    }

    ctx.sort_population(&mut next);
    *population = next;
}
