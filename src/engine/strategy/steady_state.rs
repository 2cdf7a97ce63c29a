//! Steady-state GA: offspring replace their parents when the best
//! offspring is not worse than the best parent.

use crate::candidate::{Candidate, CandidateFactory, Individual};
use crate::engine::context::SearchContext;
use crate::fitness::FitnessProvider;

/// Performs `n / 2` breeding steps in place, then re-sorts.
pub(super) fn step<C, P, F>(ctx: &mut SearchContext<C, P, F>, population: &mut Vec<Individual<C>>)
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let selection = ctx.config.selection;
    let direction = ctx.direction;

    for _ in 0..(population.len() / 2).max(1) {
        let keys = ctx.keys(population);
        let offspring = ctx.breed(population, |rng| selection.select(&keys, rng));
        let (i, j) = offspring.parents;
        let (mut o1, mut o2) = (offspring.first, offspring.second);
        ctx.evaluate(&mut o1);
        ctx.evaluate(&mut o2);

        let best_parent = if population[j].compare_by_fitness(&population[i], direction).is_lt() {
            &population[j]
        } else {
            &population[i]
        };
        let (best_child, other_child) = if o2.compare_by_fitness(&o1, direction).is_lt() {
            (o2, o1)
        } else {
            (o1, o2)
        };

        if direction.is_better(best_parent.aggregate_fitness(), best_child.aggregate_fitness()) {
            continue;
        }
        if i == j {
            population[i] = best_child;
        } else {
            population[i] = best_child;
            population[j] = other_child;
        }
    }

    ctx.sort_population(population);
}

#[cfg(test)]
mod tests {
    use crate::engine::strategy::test_engines::onemax;
    use crate::engine::Strategy;

    #[test]
    fn test_steady_state_conserves_and_improves() {
        let mut engine = onemax(Strategy::SteadyState, 12);
        engine.initialize(12).unwrap();
        let initial = engine.best_individual().unwrap().aggregate_fitness();
        for _ in 0..30 {
            engine.evolve_one_generation().unwrap();
            assert_eq!(engine.population_snapshot().len(), 12);
        }
        let last = engine.best_individual().unwrap().aggregate_fitness();
        assert!(last <= initial);
    }

    #[test]
    fn test_history_monotone() {
        let mut engine = onemax(Strategy::SteadyState, 10);
        let result = engine.run().unwrap();
        for pair in result.fitness_history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12);
        }
    }
}
