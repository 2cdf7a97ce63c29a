//! Chemical reaction optimization.
//!
//! Every individual is a molecule with potential energy (its oriented
//! aggregate fitness, lower is better) and kinetic energy. One reaction runs
//! per generation:
//!
//! | Reaction | Molecules | Effect on population |
//! |----------|-----------|----------------------|
//! | On-wall ineffective collision | 1 | replaced |
//! | Decomposition | 1 | grows by one |
//! | Inter-molecular ineffective collision | 2 | both replaced |
//! | Synthesis | 2 | shrinks by one |
//!
//! Energy is conserved: the sum of potential and kinetic energy over all
//! molecules plus the central buffer stays equal to the initial amount.
//!
//! # Reference
//! Lam & Li (2010), "Chemical-Reaction-Inspired Metaheuristic for
//! Optimization", IEEE Transactions on Evolutionary Computation 14(3)

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::candidate::{Candidate, CandidateFactory, Individual};
use crate::engine::config::ChemicalReactionConfig;
use crate::engine::context::SearchContext;
use crate::fitness::FitnessProvider;

/// Energy bookkeeping of a chemical reaction run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChemicalState {
    /// Energy released by molecules and not yet reabsorbed.
    pub buffer: f64,
    /// Total energy of the system at initialization.
    pub initial_energy: f64,
}

impl ChemicalState {
    /// Gives every molecule the initial kinetic energy and records the
    /// total energy of the system.
    pub(crate) fn initialize<C, P, F>(
        ctx: &SearchContext<C, P, F>,
        population: &mut [Individual<C>],
        config: &ChemicalReactionConfig,
    ) -> Self
    where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        for molecule in population.iter_mut() {
            molecule.kinetic_energy = config.initial_kinetic_energy;
            molecule.collisions = 0;
        }
        let initial_energy = total_energy(ctx, population, 0.0);
        log::debug!("chemical reaction: initial energy {initial_energy:.6}");
        Self {
            buffer: 0.0,
            initial_energy,
        }
    }

    pub(crate) fn step<C, P, F>(
        &mut self,
        ctx: &mut SearchContext<C, P, F>,
        population: &mut Vec<Individual<C>>,
        config: &ChemicalReactionConfig,
    ) where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let elite = (ctx.config.elite_count > 0)
            .then(|| best_index(ctx, population))
            .map(|i| population[i].clone());

        let n = population.len();
        if n == 1 || ctx.rng.random_range(0.0..1.0) > config.molecular_collision_rate {
            let i = ctx.rng.random_range(0..n);
            if population[i].collisions > config.decomposition_threshold {
                self.decomposition(ctx, population, i);
            } else {
                self.on_wall(ctx, population, i, config);
            }
        } else {
            let i = ctx.rng.random_range(0..n);
            let mut j = ctx.rng.random_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            let (a, b) = (&population[i], &population[j]);
            if a.kinetic_energy <= config.synthesis_threshold && b.kinetic_energy <= config.synthesis_threshold {
                self.synthesis(ctx, population, i, j);
            } else {
                self.inter_molecular(ctx, population, i, j);
            }
        }

        if let Some(elite) = elite {
            self.reinsert_elite(ctx, population, elite);
        }
        ctx.sort_population(population);
        self.check_energy(ctx, population);
    }

    /// A molecule hits the wall: a mutated copy replaces it if its potential
    /// energy can be paid from the molecule's energy. Part of the remaining
    /// kinetic energy goes to the buffer.
    fn on_wall<C, P, F>(
        &mut self,
        ctx: &mut SearchContext<C, P, F>,
        population: &mut [Individual<C>],
        i: usize,
        config: &ChemicalReactionConfig,
    ) where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        population[i].collisions += 1;
        let Some(mut product) = mutated_copy(ctx, &population[i]) else {
            return;
        };
        ctx.evaluate(&mut product);

        let (pe, ke) = (ctx.key(&population[i]), population[i].kinetic_energy);
        let pe_new = ctx.key(&product);
        if pe + ke < pe_new {
            return;
        }
        let released = pe - pe_new + ke;
        let kept = if config.kinetic_energy_loss_rate >= 1.0 {
            1.0
        } else {
            ctx.rng.random_range(config.kinetic_energy_loss_rate..1.0)
        };
        product.kinetic_energy = released * kept;
        product.collisions = population[i].collisions;
        self.buffer += released * (1.0 - kept);
        log::trace!("on-wall collision accepted (buffer {:.6})", self.buffer);
        population[i] = product;
    }

    /// A molecule that collided too often splits into two mutated copies,
    /// borrowing energy from the buffer when its own does not suffice.
    fn decomposition<C, P, F>(
        &mut self,
        ctx: &mut SearchContext<C, P, F>,
        population: &mut Vec<Individual<C>>,
        i: usize,
    ) where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let (Some(mut first), Some(mut second)) = (
            mutated_copy(ctx, &population[i]),
            mutated_copy(ctx, &population[i]),
        ) else {
            population[i].collisions += 1;
            return;
        };
        ctx.evaluate(&mut first);
        ctx.evaluate(&mut second);

        let (pe, ke) = (ctx.key(&population[i]), population[i].kinetic_energy);
        let mut surplus = pe + ke - (ctx.key(&first) + ctx.key(&second));
        if surplus < 0.0 {
            let d1: f64 = ctx.rng.random_range(0.0..1.0);
            let d2: f64 = ctx.rng.random_range(0.0..1.0);
            let borrowed = self.buffer * d1 * d2;
            if surplus + borrowed < 0.0 {
                population[i].collisions += 1;
                return;
            }
            surplus += borrowed;
            self.buffer -= borrowed;
        }

        let d3: f64 = ctx.rng.random_range(0.0..1.0);
        first.kinetic_energy = surplus * d3;
        second.kinetic_energy = surplus * (1.0 - d3);
        first.collisions = 0;
        second.collisions = 0;
        log::debug!("decomposition of molecule {}", population[i].id());
        population[i] = first;
        population.push(second);
    }

    /// Two molecules collide: both are mutated, and the products replace
    /// them if the pair's total energy pays for the new potential energy.
    fn inter_molecular<C, P, F>(
        &mut self,
        ctx: &mut SearchContext<C, P, F>,
        population: &mut [Individual<C>],
        i: usize,
        j: usize,
    ) where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        population[i].collisions += 1;
        population[j].collisions += 1;
        let (Some(mut a), Some(mut b)) = (
            mutated_copy(ctx, &population[i]),
            mutated_copy(ctx, &population[j]),
        ) else {
            return;
        };
        ctx.evaluate(&mut a);
        ctx.evaluate(&mut b);

        let before = ctx.key(&population[i])
            + ctx.key(&population[j])
            + population[i].kinetic_energy
            + population[j].kinetic_energy;
        let surplus = before - (ctx.key(&a) + ctx.key(&b));
        if surplus < 0.0 {
            return;
        }
        let d4: f64 = ctx.rng.random_range(0.0..1.0);
        a.kinetic_energy = surplus * d4;
        b.kinetic_energy = surplus * (1.0 - d4);
        a.collisions = population[i].collisions;
        b.collisions = population[j].collisions;
        population[i] = a;
        population[j] = b;
    }

    /// Two slow molecules merge into the better of their crossover
    /// offspring.
    fn synthesis<C, P, F>(
        &mut self,
        ctx: &mut SearchContext<C, P, F>,
        population: &mut Vec<Individual<C>>,
        i: usize,
        j: usize,
    ) where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let mut a = ctx.offspring_of(&population[i]);
        let mut b = ctx.offspring_of(&population[j]);
        if let Err(e) = ctx.crossover(&mut a, &mut b) {
            log::debug!("synthesis aborted: {e}");
            population[i].collisions += 1;
            population[j].collisions += 1;
            return;
        }

        let mut products = Vec::with_capacity(2);
        for mut product in [a, b] {
            if !ctx.is_too_large(product.candidate()) {
                ctx.evaluate(&mut product);
                products.push(product);
            }
        }
        let direction = ctx.direction;
        let Some(mut product) = products
            .into_iter()
            .min_by(|x, y| x.compare_by_fitness(y, direction))
        else {
            population[i].collisions += 1;
            population[j].collisions += 1;
            return;
        };

        let before = ctx.key(&population[i])
            + ctx.key(&population[j])
            + population[i].kinetic_energy
            + population[j].kinetic_energy;
        let surplus = before - ctx.key(&product);
        if surplus < 0.0 {
            population[i].collisions += 1;
            population[j].collisions += 1;
            return;
        }
        product.kinetic_energy = surplus;
        product.collisions = 0;
        log::debug!(
            "synthesis of molecules {} and {}",
            population[i].id(),
            population[j].id()
        );
        let (keep, drop) = if i < j { (i, j) } else { (j, i) };
        population[keep] = product;
        population.remove(drop);
    }

    /// Puts the pre-reaction best back if the reaction lost it.
    ///
    /// The copy replaces a random molecule and takes over its total energy,
    /// so the system energy is unchanged. The kinetic energy of the copy
    /// cannot become negative because the elite is at least as good as
    /// every remaining molecule.
    fn reinsert_elite<C, P, F>(
        &mut self,
        ctx: &mut SearchContext<C, P, F>,
        population: &mut [Individual<C>],
        mut elite: Individual<C>,
    ) where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let best = best_index(ctx, population);
        if !ctx.direction.is_better(elite.aggregate_fitness(), population[best].aggregate_fitness()) {
            return;
        }
        let victim = ctx.rng.random_range(0..population.len());
        let molecule = &population[victim];
        elite.kinetic_energy = molecule.kinetic_energy + ctx.key(molecule) - ctx.key(&elite);
        elite.collisions = molecule.collisions;
        log::trace!("elite {} reinserted in place of {}", elite.id(), molecule.id());
        population[victim] = elite;
    }

    /// Moves any energy difference introduced outside the reactions (local
    /// search) into the buffer.
    pub(crate) fn compensate<C, P, F>(&mut self, ctx: &SearchContext<C, P, F>, population: &[Individual<C>])
    where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let current = total_energy(ctx, population, self.buffer);
        self.buffer += self.initial_energy - current;
        self.check_energy(ctx, population);
    }

    /// # Panics
    /// Panics if the buffer went negative or the total energy drifted from
    /// its initial value.
    fn check_energy<C, P, F>(&self, ctx: &SearchContext<C, P, F>, population: &[Individual<C>])
    where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let tolerance = 1e-9 * self.initial_energy.abs().max(1.0);
        assert!(
            self.buffer >= -tolerance,
            "negative energy buffer: {}",
            self.buffer
        );
        if !self.initial_energy.is_finite() {
            return;
        }
        let current = total_energy(ctx, population, self.buffer);
        assert!(
            (current - self.initial_energy).abs() <= tolerance,
            "energy not conserved: initial {}, current {current}",
            self.initial_energy
        );
    }
}

/// Buffer plus potential and kinetic energy of every molecule.
pub(crate) fn total_energy<C, P, F>(ctx: &SearchContext<C, P, F>, population: &[Individual<C>], buffer: f64) -> f64
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    buffer
        + population
            .iter()
            .map(|m| ctx.key(m) + m.kinetic_energy)
            .sum::<f64>()
}

fn best_index<C, P, F>(ctx: &SearchContext<C, P, F>, population: &[Individual<C>]) -> usize
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let direction = ctx.direction;
    population
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.compare_by_fitness(b, direction))
        .map_or(0, |(i, _)| i)
}

/// Unevaluated mutated copy, or `None` if the mutation changed nothing or
/// produced an oversized candidate.
fn mutated_copy<C, P, F>(ctx: &mut SearchContext<C, P, F>, molecule: &Individual<C>) -> Option<Individual<C>>
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let mut copy = ctx.offspring_of(molecule);
    if !ctx.mutate(&mut copy) || ctx.is_too_large(copy.candidate()) {
        return None;
    }
    Some(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::strategy::test_engines::onemax;
    use crate::engine::{EngineConfig, PopulationEngine, Strategy};
    use crate::local_search::LocalSearchConfig;
    use crate::test_support::{BitFactory, OneMax};

    fn energy_of<C: Candidate>(population: &[Individual<C>], buffer: f64) -> f64 {
        buffer
            + population
                .iter()
                .map(|m| m.aggregate_fitness() + m.kinetic_energy())
                .sum::<f64>()
    }

    #[test]
    fn test_energy_conserved_every_generation() {
        let config = ChemicalReactionConfig {
            initial_kinetic_energy: 5.0,
            decomposition_threshold: 3,
            synthesis_threshold: 4.0,
            molecular_collision_rate: 0.5,
            ..ChemicalReactionConfig::default()
        };
        let mut engine = onemax(Strategy::ChemicalReaction(config), 8);
        engine.initialize(8).unwrap();
        let initial = engine.chemical_energy().unwrap().initial_energy;

        let mut sizes = Vec::new();
        for _ in 0..40 {
            engine.evolve_one_generation().unwrap();
            let state = engine.chemical_energy().unwrap();
            assert!(state.buffer >= 0.0);
            let energy = energy_of(&engine.population_snapshot(), state.buffer);
            assert!((energy - initial).abs() < 1e-6, "{energy} vs {initial}");
            sizes.push(engine.population_snapshot().len());
        }
        assert!(sizes.iter().all(|&s| s >= 1));
    }

    #[test]
    fn test_best_monotone() {
        let mut engine = onemax(Strategy::ChemicalReaction(ChemicalReactionConfig::default()), 10);
        let result = engine.run().unwrap();
        for pair in result.fitness_history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12);
        }
    }

    #[test]
    fn test_local_search_compensates_buffer() {
        let config = EngineConfig::default()
            .with_strategy(Strategy::ChemicalReaction(ChemicalReactionConfig::default()))
            .with_population_size(6)
            .with_max_generations(20)
            .with_local_search(LocalSearchConfig::default().with_rate(2).with_budget(30))
            .with_seed(5);
        let mut engine = PopulationEngine::new(BitFactory::new(16), OneMax, config).unwrap();
        engine.initialize(6).unwrap();
        let initial = engine.chemical_energy().unwrap().initial_energy;
        while !engine.is_finished() {
            engine.evolve_one_generation().unwrap();
            let state = engine.chemical_energy().unwrap();
            let energy = energy_of(&engine.population_snapshot(), state.buffer);
            assert!((energy - initial).abs() < 1e-6);
        }
    }
}
