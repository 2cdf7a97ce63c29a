//! SPEA2 generation step: binary tournament on total fitness, then
//! environmental selection over parents and offspring.

use rand::Rng;

use crate::candidate::{Candidate, CandidateFactory, Individual};
use crate::engine::context::SearchContext;
use crate::fitness::FitnessProvider;
use crate::ranking::{compute_strength, environmental_select};

use super::nsga2::oriented_objectives;

pub(super) fn step<C, P, F>(ctx: &mut SearchContext<C, P, F>, population: &mut Vec<Individual<C>>)
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let n = population.len();
    let scores: Vec<f64> = population.iter().map(|ind| ind.spea_fitness()).collect();

    let mut union = population.clone();
    while union.len() < 2 * n {
        let offspring = ctx.breed(population, |rng| binary_tournament(&scores, rng));
        for mut child in [offspring.first, offspring.second] {
            if union.len() < 2 * n {
                ctx.evaluate(&mut child);
                union.push(child);
            }
        }
    }

    let objectives = oriented_objectives(ctx, &union);
    let (selected, strength) = environmental_select(&objectives, n);
    *population = selected
        .iter()
        .map(|&i| {
            let mut ind = union[i].clone();
            ind.spea_fitness = strength.fitness[i];
            ind
        })
        .collect();
}

/// Sets the SPEA2 total fitness on every individual.
pub(super) fn assign_fitness<C, P, F>(ctx: &SearchContext<C, P, F>, population: &mut [Individual<C>])
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let strength = compute_strength(&oriented_objectives(ctx, population));
    for (ind, fitness) in population.iter_mut().zip(strength.fitness) {
        ind.spea_fitness = fitness;
    }
}

fn binary_tournament<R: Rng>(scores: &[f64], rng: &mut R) -> usize {
    let a = rng.random_range(0..scores.len());
    let b = rng.random_range(0..scores.len());
    if scores[b] < scores[a] {
        b
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineConfig, PopulationEngine, Strategy};
    use crate::test_support::{create_rng, BitFactory, OneMax, OnesAndZeros};

    #[test]
    fn test_binary_tournament_prefers_lower() {
        let mut rng = create_rng(4);
        let wins = (0..1000)
            .filter(|_| binary_tournament(&[3.0, 0.2], &mut rng) == 1)
            .count();
        assert!(wins > 650);
    }

    #[test]
    fn test_spea2_run_keeps_size() {
        let config = EngineConfig::default()
            .with_strategy(Strategy::Spea2)
            .with_population_size(10)
            .with_max_generations(10)
            .with_seed(8);
        let mut engine = PopulationEngine::new(BitFactory::new(8), OnesAndZeros, config).unwrap();
        engine.run().unwrap();
        let population = engine.population_snapshot();
        assert_eq!(population.len(), 10);
        // The whole space is one trade-off front: every survivor is
        // non-dominated.
        assert!(population.iter().all(|ind| ind.spea_fitness() < 1.0));
    }

    #[test]
    fn test_spea2_single_objective_converges() {
        let config = EngineConfig::default()
            .with_strategy(Strategy::Spea2)
            .with_population_size(16)
            .with_max_generations(40)
            .with_seed(3);
        let mut engine = PopulationEngine::new(BitFactory::new(12), OneMax, config).unwrap();
        let result = engine.run().unwrap();
        assert!(result.best_fitness <= result.fitness_history[0]);
    }
}
