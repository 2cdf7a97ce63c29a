//! Differential evolution with greedy one-to-one replacement.
//!
//! # Reference
//! Storn & Price (1997), "Differential Evolution – A Simple and Efficient
//! Heuristic for global Optimization over Continuous Spaces"

use rand::Rng;

use crate::candidate::{Candidate, CandidateFactory, Individual};
use crate::engine::config::DifferentialConfig;
use crate::engine::context::SearchContext;
use crate::fitness::FitnessProvider;

/// For every target: build a donor from three distinct other individuals,
/// recombine it with the target at the configured rate and keep it if it is
/// not worse than the target.
pub(super) fn step<C, P, F>(
    ctx: &mut SearchContext<C, P, F>,
    population: &mut Vec<Individual<C>>,
    config: &DifferentialConfig,
) where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let n = population.len();
    let direction = ctx.direction;
    let mut next = population.clone();

    for (target, slot) in next.iter_mut().enumerate() {
        let Some(mut trial) = donor(ctx, population, target, config) else {
            continue;
        };
        if ctx.rng.random_range(0.0..1.0) < config.crossover_rate {
            let mut partner = ctx.offspring_of(&population[target]);
            if let Err(e) = ctx.crossover(&mut trial, &mut partner) {
                log::debug!("{e}: keeping the donor unrecombined");
            }
        }
        if ctx.is_too_large(trial.candidate()) {
            continue;
        }
        ctx.evaluate(&mut trial);
        if !direction.is_better(population[target].aggregate_fitness(), trial.aggregate_fitness()) {
            *slot = trial;
        }
    }
    debug_assert_eq!(next.len(), n);

    ctx.sort_population(&mut next);
    *population = next;
}

/// Builds the donor for `target`, retrying with other base vectors when
/// the operator fails.
fn donor<C, P, F>(
    ctx: &mut SearchContext<C, P, F>,
    population: &[Individual<C>],
    target: usize,
    config: &DifferentialConfig,
) -> Option<Individual<C>>
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let attempts = ctx.config.max_construction_attempts;
    for attempt in 1..=attempts {
        let [r1, r2, r3] = distinct_others(&mut ctx.rng, population.len(), target);
        let mut trial = ctx.offspring_of(&population[target]);
        let outcome = trial.candidate_raw_mut().differential(
            population[r1].candidate(),
            population[r2].candidate(),
            population[r3].candidate(),
            config.weight,
            &mut ctx.rng,
        );
        match outcome {
            Ok(()) => {
                trial.mark_changed();
                trial.set_age(ctx.state.generation);
                return Some(trial);
            }
            Err(e) => log::debug!("{e} (attempt {attempt}/{attempts})"),
        }
    }
    None
}

/// Three distinct indices in `0..n`, all different from `exclude`.
///
/// # Panics
/// Panics if `n < 4`.
fn distinct_others<R: Rng>(rng: &mut R, n: usize, exclude: usize) -> [usize; 3] {
    assert!(n >= 4, "differential evolution needs at least 4 individuals");
    let mut picked = [usize::MAX; 3];
    let mut count = 0;
    while count < 3 {
        let i = rng.random_range(0..n);
        if i != exclude && !picked[..count].contains(&i) {
            picked[count] = i;
            count += 1;
        }
    }
    picked
}
