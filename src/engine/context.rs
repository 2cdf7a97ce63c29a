//! Everything a strategy needs besides the population: operators, fitness,
//! randomness, archive, budget, listeners and counters.
//!
//! Strategies receive the context and the population as separate borrows,
//! so they can evaluate and breed population members without cloning the
//! whole engine state.

use rand::rngs::StdRng;
use rand::Rng;

use crate::archive::GoalArchive;
use crate::budget::{BudgetController, BudgetUnit, SearchCounters, StoppingConditions, StoppingKind};
use crate::candidate::{BloatControl, Candidate, CandidateFactory, ConstructionFailed, Individual, ObjectiveId};
use crate::clock::Clock;
use crate::fitness::{Direction, FitnessProvider};
use crate::listener::ListenerBus;

use super::config::EngineConfig;
use super::state::SearchState;

/// Two fresh offspring and the population indices of their parents.
pub(crate) struct Offspring<C> {
    pub(crate) first: Individual<C>,
    pub(crate) second: Individual<C>,
    pub(crate) parents: (usize, usize),
}

pub(crate) struct SearchContext<C, P, F> {
    pub(crate) factory: P,
    pub(crate) fitness: F,
    pub(crate) config: EngineConfig,
    pub(crate) direction: Direction,
    pub(crate) num_objectives: usize,
    pub(crate) rng: StdRng,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) listeners: ListenerBus<C>,
    pub(crate) bloat: Vec<Box<dyn BloatControl<C>>>,
    pub(crate) stopping: StoppingConditions,
    pub(crate) budget: Option<BudgetController>,
    pub(crate) archive: GoalArchive<C>,
    pub(crate) state: SearchState,
    pub(crate) started_at_ms: u64,
}

impl<C, P, F> SearchContext<C, P, F>
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    // ---- Time, budget, stopping ----

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.now_ms().saturating_sub(self.started_at_ms)
    }

    /// Current reading in the budget's unit.
    pub(crate) fn budget_now(&self, unit: BudgetUnit) -> u64 {
        match unit {
            BudgetUnit::TimeMs => self.now_ms(),
            BudgetUnit::Evaluations => self.state.evaluations,
        }
    }

    pub(crate) fn counters(&self) -> SearchCounters {
        SearchCounters {
            generation: self.state.generation as u64,
            evaluations: self.state.evaluations,
            elapsed_ms: self.elapsed_ms(),
            covered: self.archive.covered_count() as u64,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        if self.stopping.is_finished(&self.counters()) {
            return true;
        }
        self.budget
            .as_ref()
            .is_some_and(|b| b.is_exhausted(self.budget_now(b.unit())))
    }

    /// Progress in `[0, 1]`: the most advanced of the global budget and the
    /// resource-based stopping conditions. Coverage is not progress.
    pub(crate) fn progress(&self) -> f64 {
        let counters = self.counters();
        let stopping = self
            .stopping
            .iter()
            .filter(|c| c.kind != StoppingKind::FullCoverage)
            .map(|c| c.fraction(&counters))
            .fold(0.0, f64::max);
        let budget = self
            .budget
            .as_ref()
            .map_or(0.0, |b| b.progress(self.budget_now(b.unit())));
        stopping.max(budget)
    }

    /// Starts the global budget, if any, at the current reading.
    pub(crate) fn start_budget(&mut self) {
        if let Some(unit) = self.budget.as_ref().map(|b| b.unit()) {
            let now = self.budget_now(unit);
            if let Some(budget) = self.budget.as_mut() {
                budget.start(now);
            }
        }
    }

    /// Whether the current target used up its allotment. Always `false`
    /// without a global budget.
    pub(crate) fn target_budget_exhausted(&self) -> bool {
        self.budget
            .as_ref()
            .is_some_and(|b| b.target_exhausted(self.budget_now(b.unit())))
    }

    /// Recomputes the per-target allotment for a target switch.
    pub(crate) fn reallocate_target(&mut self, exhausted: usize) {
        let Some(unit) = self.budget.as_ref().map(|b| b.unit()) else {
            return;
        };
        let now = self.budget_now(unit);
        let covered = self.archive.covered_count();
        let total = self.num_objectives;
        if let Some(budget) = self.budget.as_mut() {
            budget.reallocate(now, total, covered, exhausted);
        }
    }

    // ---- Individuals ----

    /// Minimizing selection key of an individual.
    pub(crate) fn key(&self, individual: &Individual<C>) -> f64 {
        self.direction.orient(individual.aggregate_fitness())
    }

    pub(crate) fn keys(&self, population: &[Individual<C>]) -> Vec<f64> {
        population.iter().map(|ind| self.key(ind)).collect()
    }

    /// Minimizing key of one objective.
    pub(crate) fn objective_key(&self, individual: &Individual<C>, objective: ObjectiveId) -> f64 {
        self.direction.orient(individual.fitness(objective))
    }

    /// Sorts best-first by aggregate fitness.
    pub(crate) fn sort_population(&self, population: &mut [Individual<C>]) {
        let direction = self.direction;
        population.sort_by(|a, b| a.compare_by_fitness(b, direction));
    }

    pub(crate) fn is_too_large(&self, candidate: &C) -> bool {
        self.config
            .max_candidate_size
            .is_some_and(|max| candidate.size() > max)
            || self.bloat.iter().any(|b| b.is_too_large(candidate))
    }

    /// Creates a fresh random individual (unevaluated). Candidates rejected
    /// by bloat control are regenerated up to the construction limit.
    pub(crate) fn new_individual(&mut self) -> Option<Individual<C>> {
        for _ in 0..self.config.max_construction_attempts {
            let candidate = self.factory.new_candidate(&mut self.rng);
            if self.is_too_large(&candidate) {
                log::debug!("discarding oversized random candidate (size {})", candidate.size());
                continue;
            }
            let mut ind = Individual::new(self.state.fresh_id(), candidate, self.num_objectives);
            ind.set_age(self.state.generation);
            return Some(ind);
        }
        None
    }

    /// Clone of `parent` with a fresh identity.
    pub(crate) fn offspring_of(&mut self, parent: &Individual<C>) -> Individual<C> {
        let mut child = parent.clone();
        child.set_id(self.state.fresh_id());
        child.kinetic_energy = 0.0;
        child.collisions = 0;
        child
    }

    /// Evaluates every objective if the individual changed, records the
    /// values in the goal archive and notifies listeners.
    pub(crate) fn evaluate(&mut self, individual: &mut Individual<C>) {
        if !individual.is_changed() {
            return;
        }
        let values: Vec<f64> = (0..self.num_objectives)
            .map(|o| self.fitness.evaluate(individual.candidate(), ObjectiveId(o)))
            .collect();
        individual.set_fitness_values(values);
        self.state.evaluations += 1;

        for o in 0..self.num_objectives {
            let objective = ObjectiveId(o);
            let value = individual.fitness(objective);
            let covered = self.fitness.covers(objective, value);
            self.archive.record_if_improved(objective, individual, value, covered);
        }
        log::trace!(
            "evaluated individual {} (aggregate {})",
            individual.id(),
            individual.aggregate_fitness()
        );
        self.listeners.evaluation(individual);
    }

    pub(crate) fn evaluate_all(&mut self, population: &mut [Individual<C>]) {
        for ind in population.iter_mut() {
            self.evaluate(ind);
        }
    }

    /// Mutates in place. Returns whether the candidate changed.
    pub(crate) fn mutate(&mut self, individual: &mut Individual<C>) -> bool {
        self.listeners.mutation(individual);
        let changed = individual.candidate_raw_mut().mutate(&mut self.rng);
        if changed {
            individual.mark_changed();
            individual.set_age(self.state.generation);
        }
        changed
    }

    /// Mutates with probability `mutation_rate`.
    pub(crate) fn maybe_mutate(&mut self, individual: &mut Individual<C>) -> bool {
        if self.rng.random_range(0.0..1.0) < self.config.mutation_rate {
            self.mutate(individual)
        } else {
            false
        }
    }

    /// Recombines two individuals. Both stay untouched on failure.
    pub(crate) fn crossover(
        &mut self,
        a: &mut Individual<C>,
        b: &mut Individual<C>,
    ) -> Result<(), ConstructionFailed> {
        let mut ca = a.candidate().clone();
        let mut cb = b.candidate().clone();
        ca.crossover(&mut cb, &mut self.rng)?;
        *a.candidate_raw_mut() = ca;
        *b.candidate_raw_mut() = cb;
        for ind in [a, b] {
            ind.mark_changed();
            ind.set_age(self.state.generation);
        }
        Ok(())
    }

    /// Keeps `child` unless bloat control rejects it, in which case a copy
    /// of `parent` takes its place.
    pub(crate) fn accept_or_parent(&mut self, child: Individual<C>, parent: &Individual<C>) -> Individual<C> {
        if self.is_too_large(child.candidate()) {
            log::debug!("offspring {} rejected by bloat control", child.id());
            self.offspring_of(parent)
        } else {
            child
        }
    }

    /// Produces two unevaluated offspring: select parents, recombine with
    /// probability `crossover_rate`, mutate with probability `mutation_rate`.
    ///
    /// A failed crossover retries with newly selected parents; after
    /// `max_construction_attempts` failures the offspring are plain copies
    /// of the last parents.
    pub(crate) fn breed<S>(
        &mut self,
        population: &[Individual<C>],
        mut select: S,
    ) -> Offspring<C>
    where
        S: FnMut(&mut StdRng) -> usize,
    {
        let attempts = self.config.max_construction_attempts;
        let mut parents = (0, 0);
        for attempt in 1..=attempts {
            parents = (select(&mut self.rng), select(&mut self.rng));
            let (p1, p2) = (&population[parents.0], &population[parents.1]);
            let mut o1 = self.offspring_of(p1);
            let mut o2 = self.offspring_of(p2);

            if self.rng.random_range(0.0..1.0) < self.config.crossover_rate {
                if let Err(e) = self.crossover(&mut o1, &mut o2) {
                    log::debug!("{e} (attempt {attempt}/{attempts})");
                    continue;
                }
            }
            self.maybe_mutate(&mut o1);
            self.maybe_mutate(&mut o2);

            return Offspring {
                first: self.accept_or_parent(o1, p1),
                second: self.accept_or_parent(o2, p2),
                parents,
            };
        }

        log::debug!("offspring construction failed {attempts} times; copying parents");
        Offspring {
            first: self.offspring_of(&population[parents.0]),
            second: self.offspring_of(&population[parents.1]),
            parents,
        }
    }

    // ---- Local search ----

    /// Mutation hill climbing on one individual, charged against `used`.
    ///
    /// Returns `None` when the budget or the run is exhausted before the
    /// first probe, otherwise whether the individual improved.
    pub(crate) fn hill_climb(&mut self, individual: &mut Individual<C>, used: &mut u64) -> Option<bool> {
        let budget = self.config.local_search.budget;
        let probes = self.config.local_search.probes;
        let mut improved = false;

        for probe in 0..probes {
            if *used >= budget || self.is_finished() {
                if probe == 0 {
                    return None;
                }
                break;
            }
            let mut candidate = self.offspring_of(individual);
            if !self.mutate(&mut candidate) || self.is_too_large(candidate.candidate()) {
                continue;
            }
            self.evaluate(&mut candidate);
            *used += 1;
            if self
                .direction
                .is_better(candidate.aggregate_fitness(), individual.aggregate_fitness())
            {
                candidate.kinetic_energy = individual.kinetic_energy;
                candidate.collisions = individual.collisions;
                *individual = candidate;
                improved = true;
            }
        }
        Some(improved)
    }
}
