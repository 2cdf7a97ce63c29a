//! The population engine: one orchestrator for every strategy.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::archive::GoalArchive;
use crate::budget::{BudgetController, StoppingCondition, StoppingConditions, StoppingKind};
use crate::candidate::{BloatControl, Candidate, CandidateFactory, Individual, ObjectiveId};
use crate::clock::{Clock, SystemClock};
use crate::error::SearchError;
use crate::fitness::{resolve_direction, FitnessProvider};
use crate::listener::{ListenerBus, SearchListener, SearchView};
use crate::snapshot::{ArchiveEntrySnapshot, IndividualSnapshot, Snapshot, SNAPSHOT_VERSION};

use super::config::{EngineConfig, Strategy};
use super::context::SearchContext;
use super::state::{Phase, SearchState};
use super::strategy::{ChemicalState, FlatTargets, StrategyState, TargetGraph};

/// Outcome of [`PopulationEngine::run`].
#[derive(Debug, Clone)]
pub struct SearchResult<C> {
    /// Best individual by aggregate fitness.
    pub best: Individual<C>,

    /// Aggregate fitness of `best`.
    pub best_fitness: f64,

    /// Non-dominated front (NSGA-II, SPEA2), covering solutions (LIPS,
    /// MIO) or just the best individual.
    pub best_individuals: Vec<Individual<C>>,

    /// Distinct individuals held by the goal archive.
    pub archive_solutions: Vec<Individual<C>>,

    /// Completed generations.
    pub generations: usize,

    /// Fitness evaluations performed.
    pub evaluations: u64,

    pub covered_targets: usize,

    pub total_targets: usize,

    /// Wall-clock time of the run in milliseconds.
    pub elapsed_ms: u64,

    /// Best aggregate fitness after initialization and after every
    /// generation.
    pub fitness_history: Vec<f64>,
}

/// Drives a search: owns the population, archive, budget and adaptive
/// state, and delegates the generation step to the configured [`Strategy`].
///
/// # Lifecycle
///
/// [`new`](Self::new) → [`initialize`](Self::initialize) →
/// [`evolve_one_generation`](Self::evolve_one_generation) until
/// [`phase`](Self::phase) is [`Phase::Finished`]. [`run`](Self::run) does
/// all of it.
///
/// # Examples
///
/// ```
/// use rand::Rng;
/// use u_evosearch::candidate::{Candidate, CandidateFactory, ObjectiveId};
/// use u_evosearch::engine::{EngineConfig, PopulationEngine};
/// use u_evosearch::fitness::FitnessProvider;
///
/// #[derive(Clone)]
/// struct Point(f64);
///
/// impl Candidate for Point {
///     fn mutate<R: Rng>(&mut self, rng: &mut R) -> bool {
///         self.0 += rng.random_range(-1.0..1.0);
///         true
///     }
/// }
///
/// struct Uniform;
///
/// impl CandidateFactory<Point> for Uniform {
///     fn new_candidate<R: Rng>(&self, rng: &mut R) -> Point {
///         Point(rng.random_range(-10.0..10.0))
///     }
/// }
///
/// /// Distance to 3.0.
/// struct Target;
///
/// impl FitnessProvider<Point> for Target {
///     fn num_objectives(&self) -> usize {
///         1
///     }
///     fn evaluate(&self, p: &Point, _objective: ObjectiveId) -> f64 {
///         (p.0 - 3.0).abs()
///     }
/// }
///
/// let config = EngineConfig::default()
///     .with_population_size(20)
///     .with_max_generations(50)
///     .with_seed(42);
/// let mut engine = PopulationEngine::new(Uniform, Target, config).unwrap();
/// let result = engine.run().unwrap();
/// assert!(result.best_fitness < 1.0);
/// ```
pub struct PopulationEngine<C, P, F> {
    ctx: SearchContext<C, P, F>,
    population: Vec<Individual<C>>,
    strategy: Option<StrategyState<C>>,
    targets: Box<dyn TargetGraph>,
    population_size: usize,
    history: Vec<f64>,
}

impl<C, P, F> PopulationEngine<C, P, F>
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    /// Creates an engine after validating `config` and the objectives of
    /// `fitness`.
    pub fn new(factory: P, fitness: F, config: EngineConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let direction = resolve_direction(&fitness)?;
        let num_objectives = fitness.num_objectives();

        let rng = StdRng::seed_from_u64(config.seed.unwrap_or_else(rand::random));

        let mut stopping = StoppingConditions::new();
        if let Some(n) = config.max_generations {
            stopping.add(StoppingCondition::max_generations(n));
        }
        if let Some(n) = config.max_evaluations {
            stopping.add(StoppingCondition::max_evaluations(n));
        }

        let budget = config
            .search_budget
            .map(|(unit, total)| BudgetController::new(unit, total));
        let archive = GoalArchive::new(direction).with_prefer_smaller(config.archive_prefers_smaller);
        let state = SearchState::new(config.local_search.clone());
        let population_size = config.population_size;

        Ok(Self {
            ctx: SearchContext {
                factory,
                fitness,
                config,
                direction,
                num_objectives,
                rng,
                clock: Box::new(SystemClock::new()),
                listeners: ListenerBus::new(),
                bloat: Vec::new(),
                stopping,
                budget,
                archive,
                state,
                started_at_ms: 0,
            },
            population: Vec::new(),
            strategy: None,
            targets: Box::new(FlatTargets),
            population_size,
            history: Vec::new(),
        })
    }

    /// Replaces the wall clock (time budgets, time stopping condition).
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.ctx.clock = Box::new(clock);
        self
    }

    /// Sets the target structure used by LIPS. Defaults to [`FlatTargets`].
    pub fn with_target_graph(mut self, targets: impl TargetGraph + 'static) -> Self {
        self.targets = Box::new(targets);
        self
    }

    /// Adds a bloat control. Controls combine with OR: a candidate is
    /// rejected if any of them rejects it.
    pub fn add_bloat_control(&mut self, control: impl BloatControl<C> + 'static) {
        self.ctx.bloat.push(Box::new(control));
    }

    /// Registers a listener under `id`. Returns `false` (and drops the
    /// listener) if the id is taken.
    pub fn add_listener(&mut self, id: impl Into<String>, listener: Box<dyn SearchListener<C>>) -> bool {
        self.ctx.listeners.register(id, listener)
    }

    pub fn remove_listener(&mut self, id: &str) -> Option<Box<dyn SearchListener<C>>> {
        self.ctx.listeners.remove(id)
    }

    /// Adds a stopping condition. Returns `false` if one of the same kind is
    /// already active.
    pub fn add_stopping_condition(&mut self, condition: StoppingCondition) -> bool {
        self.ctx.stopping.add(condition)
    }

    pub fn remove_stopping_condition(&mut self, kind: StoppingKind) -> bool {
        self.ctx.stopping.remove(kind)
    }

    pub fn stopping_conditions(&self) -> &StoppingConditions {
        &self.ctx.stopping
    }

    // ---- Lifecycle ----

    /// Creates and evaluates the initial population.
    ///
    /// # Errors
    /// - [`SearchError::InvalidPhase`] unless the engine is uninitialized
    /// - [`SearchError::InvalidConfig`] if `population_size` is below the
    ///   strategy's minimum, or the factory produced fewer acceptable
    ///   candidates than that minimum
    /// - [`SearchError::EmptyPopulation`] if the factory produced nothing
    pub fn initialize(&mut self, population_size: usize) -> Result<(), SearchError> {
        self.expect_phase(Phase::Uninitialized, "Uninitialized")?;
        let strategy = self.ctx.config.strategy;
        let min = strategy.min_population_size();
        if population_size < min {
            return Err(SearchError::InvalidConfig(format!(
                "{} needs a population of at least {min}, got {population_size}",
                strategy.name()
            )));
        }
        self.ctx.state.transition(Phase::Initializing);
        log::info!(
            "initializing {} search: population {population_size}, {} objective(s)",
            self.ctx.config.strategy.name(),
            self.ctx.num_objectives
        );

        self.ctx.started_at_ms = self.ctx.now_ms();
        self.ctx.start_budget();
        self.add_coverage_stop();

        let (strategy, population) = StrategyState::initialize(&mut self.ctx, population_size, &*self.targets)?;
        self.strategy = Some(strategy);
        self.population = population;
        self.population_size = self.population.len();

        self.ctx.state.transition(Phase::Evolving);
        self.record_history();
        let view = SearchView {
            generation: self.ctx.state.generation,
            evaluations: self.ctx.state.evaluations,
            phase: self.ctx.state.phase,
            population: &self.population,
            archive: &self.ctx.archive,
        };
        self.ctx.listeners.search_started(&view);

        if self.ctx.is_finished() {
            self.finish();
        }
        Ok(())
    }

    /// Runs one generation: strategy step, optional local search, stopping
    /// check and listener notification.
    ///
    /// # Errors
    /// [`SearchError::InvalidPhase`] unless the engine is evolving.
    ///
    /// # Panics
    /// Panics if the population size drifted (fixed-size strategies) or, in
    /// debug builds, if the best fitness of an elitist strategy regressed.
    pub fn evolve_one_generation(&mut self) -> Result<(), SearchError> {
        self.expect_phase(Phase::Evolving, "Evolving")?;
        let best_before = self.population_best_key();
        let Some(strategy) = self.strategy.as_mut() else {
            return Err(SearchError::InvalidPhase {
                expected: "Evolving",
                found: self.ctx.state.phase,
            });
        };

        strategy.step(&mut self.ctx, &mut self.population, &*self.targets);
        self.ctx.state.generation += 1;
        self.apply_local_search();
        self.check_invariants(best_before);

        self.record_history();
        log::debug!(
            "generation {}: best {:.6}, population {}, evaluations {}, covered {}/{}",
            self.ctx.state.generation,
            self.history.last().copied().unwrap_or(f64::NAN),
            self.population.len(),
            self.ctx.state.evaluations,
            self.ctx.archive.covered_count(),
            self.ctx.num_objectives
        );

        let view = SearchView {
            generation: self.ctx.state.generation,
            evaluations: self.ctx.state.evaluations,
            phase: self.ctx.state.phase,
            population: &self.population,
            archive: &self.ctx.archive,
        };
        self.ctx.listeners.generation(&view);

        if self.ctx.is_finished() {
            self.finish();
        }
        Ok(())
    }

    /// Initializes (if needed) and evolves until a stopping condition or the
    /// budget ends the search.
    ///
    /// # Errors
    /// [`SearchError::InvalidConfig`] if nothing could ever stop the search,
    /// plus the errors of [`initialize`](Self::initialize).
    pub fn run(&mut self) -> Result<SearchResult<C>, SearchError> {
        if self.ctx.state.phase == Phase::Uninitialized {
            if self.ctx.stopping.is_empty() && self.ctx.budget.is_none() {
                return Err(SearchError::InvalidConfig(
                    "no stopping condition or search budget configured".into(),
                ));
            }
            self.initialize(self.ctx.config.population_size)?;
        }
        while self.ctx.state.phase == Phase::Evolving {
            self.evolve_one_generation()?;
        }
        self.result()
    }

    /// Collects the outcome of the search so far.
    pub fn result(&self) -> Result<SearchResult<C>, SearchError> {
        let best = self.best_individual().cloned().ok_or(SearchError::EmptyPopulation)?;
        Ok(SearchResult {
            best_fitness: best.aggregate_fitness(),
            best,
            best_individuals: self.best_individuals().into_iter().cloned().collect(),
            archive_solutions: self.ctx.archive.solutions().into_iter().cloned().collect(),
            generations: self.ctx.state.generation,
            evaluations: self.ctx.state.evaluations,
            covered_targets: self.ctx.archive.covered_count(),
            total_targets: self.ctx.num_objectives,
            elapsed_ms: self.ctx.elapsed_ms(),
            fitness_history: self.history.clone(),
        })
    }

    // ---- Queries ----

    /// Best individual by aggregate fitness over the population and the
    /// goal archive. `None` before initialization.
    pub fn best_individual(&self) -> Option<&Individual<C>> {
        let direction = self.ctx.direction;
        self.population
            .iter()
            .chain(self.ctx.archive.solutions())
            .filter(|ind| !ind.is_changed())
            .min_by(|a, b| a.compare_by_fitness(b, direction))
    }

    /// The first Pareto front for NSGA-II and SPEA2, the covering solutions
    /// for LIPS and MIO, otherwise the best individual alone.
    pub fn best_individuals(&self) -> Vec<&Individual<C>> {
        match self.ctx.config.strategy {
            Strategy::Nsga2 => self.population.iter().filter(|ind| ind.rank() == 0).collect(),
            Strategy::Spea2 => self
                .population
                .iter()
                .filter(|ind| ind.spea_fitness() < 1.0)
                .collect(),
            Strategy::Lips | Strategy::Mio(_) => {
                let covering = self.ctx.archive.covering_solutions();
                if covering.is_empty() {
                    self.best_individual().into_iter().collect()
                } else {
                    covering
                }
            }
            _ => self.best_individual().into_iter().collect(),
        }
    }

    /// Completed generations.
    pub fn current_generation(&self) -> usize {
        self.ctx.state.generation
    }

    /// Copy of the current population.
    pub fn population_snapshot(&self) -> Vec<Individual<C>> {
        self.population.clone()
    }

    pub fn archive(&self) -> &GoalArchive<C> {
        &self.ctx.archive
    }

    pub fn phase(&self) -> Phase {
        self.ctx.state.phase
    }

    /// Counters and adaptive state.
    pub fn state(&self) -> &SearchState {
        &self.ctx.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    /// Whether a stopping condition or the budget ends the search.
    pub fn is_finished(&self) -> bool {
        self.ctx.state.phase == Phase::Finished || self.ctx.is_finished()
    }

    /// Search progress in `[0, 1]` from the budget and the resource-based
    /// stopping conditions.
    pub fn progress(&self) -> f64 {
        self.ctx.progress()
    }

    /// Energy bookkeeping (chemical reaction strategy only).
    pub fn chemical_energy(&self) -> Option<ChemicalState> {
        self.strategy.as_ref().and_then(|s| s.chemical_state()).copied()
    }

    /// Target LIPS currently evolves towards.
    pub fn current_target(&self) -> Option<ObjectiveId> {
        self.strategy.as_ref().and_then(|s| s.lips_target())
    }

    /// Number of targets covered in MIO's per-target populations.
    pub fn mio_covered_count(&self) -> Option<usize> {
        self.strategy.as_ref().and_then(|s| s.mio_archive()).map(|a| a.covered_count())
    }

    // ---- Internals ----

    fn expect_phase(&self, phase: Phase, expected: &'static str) -> Result<(), SearchError> {
        if self.ctx.state.phase == phase {
            Ok(())
        } else {
            Err(SearchError::InvalidPhase {
                expected,
                found: self.ctx.state.phase,
            })
        }
    }

    fn stops_on_coverage(&self) -> bool {
        matches!(self.ctx.config.strategy, Strategy::Lips | Strategy::Mio(_))
    }

    /// Target-focused strategies stop once every target is covered.
    fn add_coverage_stop(&mut self) {
        if self.stops_on_coverage() {
            self.ctx
                .stopping
                .add(StoppingCondition::full_coverage(self.ctx.num_objectives as u64));
        }
    }

    fn population_best_key(&self) -> f64 {
        self.population
            .iter()
            .map(|ind| self.ctx.key(ind))
            .fold(f64::INFINITY, f64::min)
    }

    fn record_history(&mut self) {
        if let Some(best) = self.best_individual() {
            let value = best.aggregate_fitness();
            self.history.push(value);
        }
    }

    fn apply_local_search(&mut self) {
        let ctx = &mut self.ctx;
        if !ctx.config.strategy.supports_local_search()
            || !ctx.state.local_search.should_apply(ctx.state.generation, &mut ctx.rng)
        {
            return;
        }
        ctx.state.transition(Phase::LocalSearching);
        log::debug!(
            "local search after generation {} (probability {:.3e})",
            ctx.state.generation,
            ctx.state.local_search.probability()
        );

        let mut controller = ctx.state.local_search.clone();
        let mut used = 0;
        let improved = controller.apply_and_adapt(&mut self.population, |ind| ctx.hill_climb(ind, &mut used));
        ctx.state.local_search = controller;

        if let Some(strategy) = self.strategy.as_mut() {
            strategy.after_local_search(ctx, &mut self.population);
        }
        log::debug!("local search used {used} evaluations (improved: {improved})");
        ctx.state.transition(Phase::Evolving);
    }

    fn check_invariants(&self, best_before: f64) {
        if !self.ctx.config.strategy.has_variable_population() {
            assert_eq!(
                self.population.len(),
                self.population_size,
                "population size drifted from {} to {}",
                self.population_size,
                self.population.len()
            );
        }
        let elitist = self.ctx.config.strategy.is_elitist()
            && !(matches!(
                self.ctx.config.strategy,
                Strategy::Generational | Strategy::ChemicalReaction(_)
            ) && self.ctx.config.elite_count == 0);
        if elitist {
            let best_after = self.population_best_key();
            debug_assert!(
                best_after <= best_before + 1e-9 * best_before.abs().max(1.0) || !best_before.is_finite(),
                "best fitness regressed from {best_before} to {best_after}"
            );
        }
    }

    fn finish(&mut self) {
        self.ctx.state.transition(Phase::Finished);
        log::info!(
            "search finished after {} generations, {} evaluations, {}/{} targets covered",
            self.ctx.state.generation,
            self.ctx.state.evaluations,
            self.ctx.archive.covered_count(),
            self.ctx.num_objectives
        );
        let view = SearchView {
            generation: self.ctx.state.generation,
            evaluations: self.ctx.state.evaluations,
            phase: self.ctx.state.phase,
            population: &self.population,
            archive: &self.ctx.archive,
        };
        self.ctx.listeners.search_finished(&view);
    }
}

// ---- Snapshots ----

impl<C, P, F> PopulationEngine<C, P, F>
where
    C: Candidate + Serialize + DeserializeOwned,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    /// Captures the running search.
    ///
    /// # Errors
    /// [`SearchError::InvalidPhase`] before initialization completed.
    pub fn snapshot(&self) -> Result<Snapshot<C>, SearchError> {
        if !matches!(self.ctx.state.phase, Phase::Evolving | Phase::Finished) {
            return Err(SearchError::InvalidPhase {
                expected: "Evolving or Finished",
                found: self.ctx.state.phase,
            });
        }
        let budget = self.ctx.budget.as_ref().map(|b| b.snapshot(self.ctx.budget_now(b.unit())));
        Ok(Snapshot {
            version: SNAPSHOT_VERSION,
            strategy: self.ctx.config.strategy.name().to_string(),
            generation: self.ctx.state.generation,
            evaluations: self.ctx.state.evaluations,
            next_id: self.ctx.state.next_id,
            elapsed_ms: self.ctx.elapsed_ms(),
            population: self.population.iter().map(IndividualSnapshot::capture).collect(),
            archive: self
                .ctx
                .archive
                .entries()
                .filter_map(|(target, entry)| ArchiveEntrySnapshot::capture(target, entry))
                .collect(),
            budget,
            local_search_probability: self.ctx.state.local_search.probability(),
            chemical: self.chemical_energy(),
        })
    }

    /// Rebuilds an engine from a snapshot and resumes in [`Phase::Evolving`]
    /// (or [`Phase::Finished`] if a stopping condition already holds).
    ///
    /// Listeners, bloat controls, the clock and the target graph are not
    /// part of a snapshot; use [`restore_with`](Self::restore_with) to set
    /// them before the search resumes.
    ///
    /// # Errors
    /// - [`SearchError::InvalidConfig`] if `config` names another strategy
    /// - [`SearchError::EmptyPopulation`] if the snapshot has no individuals
    pub fn restore(factory: P, fitness: F, config: EngineConfig, snapshot: Snapshot<C>) -> Result<Self, SearchError> {
        Self::restore_with(factory, fitness, config, snapshot, |engine| engine)
    }

    /// Like [`restore`](Self::restore), with a hook to configure the engine
    /// (clock, listeners, target graph, bloat controls) before resuming.
    pub fn restore_with<S>(
        factory: P,
        fitness: F,
        config: EngineConfig,
        snapshot: Snapshot<C>,
        setup: S,
    ) -> Result<Self, SearchError>
    where
        S: FnOnce(Self) -> Self,
    {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SearchError::UnsupportedSnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        if snapshot.strategy != config.strategy.name() {
            return Err(SearchError::InvalidConfig(format!(
                "snapshot was taken with strategy {}, config uses {}",
                snapshot.strategy,
                config.strategy.name()
            )));
        }
        if snapshot.population.is_empty() {
            return Err(SearchError::EmptyPopulation);
        }

        let mut engine = setup(Self::new(factory, fitness, config)?);
        let ctx = &mut engine.ctx;
        let n = ctx.num_objectives;

        ctx.state.generation = snapshot.generation;
        ctx.state.evaluations = snapshot.evaluations;
        ctx.state.next_id = snapshot.next_id;
        ctx.state.local_search.set_probability(snapshot.local_search_probability);
        ctx.started_at_ms = ctx.now_ms().saturating_sub(snapshot.elapsed_ms);
        if let Some(saved) = snapshot.budget.as_ref() {
            let now = ctx.budget_now(saved.unit);
            ctx.budget = Some(BudgetController::restore(saved, now));
        }
        for entry in snapshot.archive {
            ctx.archive.restore_entry(entry.target, entry.into_entry(n));
        }

        let mut population: Vec<Individual<C>> = snapshot
            .population
            .into_iter()
            .map(|ind| ind.into_individual(n))
            .collect();
        ctx.evaluate_all(&mut population);

        engine.add_coverage_stop();
        let strategy = StrategyState::resume(
            engine.ctx.config.strategy,
            &mut engine.ctx,
            &mut population,
            &*engine.targets,
            snapshot.chemical,
        );
        engine.population_size = population.len();
        engine.population = population;
        engine.strategy = Some(strategy);

        engine.ctx.state.transition(Phase::Evolving);
        engine.record_history();
        log::info!(
            "restored {} search at generation {}",
            engine.ctx.config.strategy.name(),
            engine.ctx.state.generation
        );
        if engine.ctx.is_finished() {
            engine.finish();
        }
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::budget::BudgetUnit;
    use crate::candidate::{ConstructionFailed, MaxSizeBloatControl};
    use crate::clock::ManualClock;
    use crate::engine::strategy::test_engines::onemax;
    use crate::engine::Selection;
    use crate::local_search::LocalSearchConfig;
    use crate::test_support::{BitFactory, BitString, BitTargets, OneMax, OnesMax};

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl SearchListener<BitString> for Recorder {
        fn on_search_started(&mut self, view: &SearchView<'_, BitString>) {
            self.0.borrow_mut().push(format!("started:{}", view.population.len()));
        }
        fn on_generation(&mut self, view: &SearchView<'_, BitString>) {
            self.0.borrow_mut().push(format!("generation:{}", view.generation));
        }
        fn on_search_finished(&mut self, view: &SearchView<'_, BitString>) {
            self.0.borrow_mut().push(format!("finished:{:?}", view.phase));
        }
    }

    #[derive(Default)]
    struct Counter {
        evaluations: Rc<RefCell<u64>>,
        mutations: Rc<RefCell<u64>>,
    }

    impl SearchListener<BitString> for Counter {
        fn on_evaluation(&mut self, _individual: &Individual<BitString>) {
            *self.evaluations.borrow_mut() += 1;
        }
        fn on_mutation(&mut self, _individual: &Individual<BitString>) {
            *self.mutations.borrow_mut() += 1;
        }
    }

    /// No candidates at all: every one is rejected by bloat control.
    struct Empty;

    impl CandidateFactory<BitString> for Empty {
        fn new_candidate<R: rand::Rng>(&self, _rng: &mut R) -> BitString {
            BitString::zeros(100)
        }
    }

    /// Crossover always fails.
    #[derive(Clone, Debug)]
    struct Brittle(BitString);

    impl Candidate for Brittle {
        fn mutate<R: rand::Rng>(&mut self, rng: &mut R) -> bool {
            self.0.mutate(rng)
        }
        fn crossover<R: rand::Rng>(&mut self, _other: &mut Self, _rng: &mut R) -> Result<(), ConstructionFailed> {
            Err(ConstructionFailed::new("incompatible parents"))
        }
        fn size(&self) -> usize {
            self.0.size()
        }
    }

    struct BrittleFactory;

    impl CandidateFactory<Brittle> for BrittleFactory {
        fn new_candidate<R: rand::Rng>(&self, rng: &mut R) -> Brittle {
            Brittle(BitFactory::new(12).new_candidate(rng))
        }
    }

    struct BrittleOneMax;

    impl FitnessProvider<Brittle> for BrittleOneMax {
        fn num_objectives(&self) -> usize {
            1
        }
        fn evaluate(&self, candidate: &Brittle, objective: ObjectiveId) -> f64 {
            OneMax.evaluate(&candidate.0, objective)
        }
    }

    #[test]
    fn test_lifecycle_phases() {
        let mut engine = onemax(Strategy::Generational, 10);
        assert_eq!(engine.phase(), Phase::Uninitialized);
        assert!(matches!(
            engine.evolve_one_generation(),
            Err(SearchError::InvalidPhase {
                found: Phase::Uninitialized,
                ..
            })
        ));

        engine.initialize(10).unwrap();
        assert_eq!(engine.phase(), Phase::Evolving);
        assert!(matches!(
            engine.initialize(10),
            Err(SearchError::InvalidPhase { .. })
        ));

        engine.run().unwrap();
        assert_eq!(engine.phase(), Phase::Finished);
        assert_eq!(engine.current_generation(), 40);
        assert!(matches!(
            engine.evolve_one_generation(),
            Err(SearchError::InvalidPhase {
                found: Phase::Finished,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig::default().with_population_size(0);
        assert!(matches!(
            PopulationEngine::new(BitFactory::new(4), OneMax, config),
            Err(SearchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_run_without_stopping_condition_is_rejected() {
        let config = EngineConfig::default().without_max_generations().with_seed(1);
        let mut engine = PopulationEngine::new(BitFactory::new(4), OneMax, config).unwrap();
        assert!(matches!(engine.run(), Err(SearchError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_population_is_fatal() {
        let config = EngineConfig::default().with_population_size(5).with_seed(1);
        let mut engine = PopulationEngine::new(Empty, OneMax, config).unwrap();
        engine.add_bloat_control(MaxSizeBloatControl { max_size: 10 });
        assert!(matches!(engine.initialize(5), Err(SearchError::EmptyPopulation)));
    }

    #[test]
    fn test_listener_events_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let config = EngineConfig::default()
            .with_population_size(6)
            .with_max_generations(2)
            .with_seed(3);
        let mut engine = PopulationEngine::new(BitFactory::new(8), OneMax, config).unwrap();
        assert!(engine.add_listener("recorder", Box::new(Recorder(log.clone()))));
        assert!(!engine.add_listener("recorder", Box::new(Recorder(log.clone()))));
        engine.run().unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["started:6", "generation:1", "generation:2", "finished:Finished"]
        );
    }

    #[test]
    fn test_evaluation_events_match_counter() {
        let counter = Counter::default();
        let evaluations = counter.evaluations.clone();
        let mutations = counter.mutations.clone();
        let mut engine = onemax(Strategy::Generational, 10);
        engine.add_listener("counter", Box::new(counter));
        let result = engine.run().unwrap();
        assert_eq!(*evaluations.borrow(), result.evaluations);
        assert!(*mutations.borrow() > 0);
    }

    #[test]
    fn test_removed_listener_is_silent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = onemax(Strategy::Generational, 6);
        engine.add_listener("recorder", Box::new(Recorder(log.clone())));
        assert!(engine.remove_listener("recorder").is_some());
        engine.run().unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_max_evaluations_stops() {
        let config = EngineConfig::default()
            .with_population_size(10)
            .without_max_generations()
            .with_max_evaluations(100)
            .with_seed(4);
        let mut engine = PopulationEngine::new(BitFactory::new(16), OneMax, config).unwrap();
        let result = engine.run().unwrap();
        assert!(result.evaluations >= 100);
        // A generation evaluates at most population - elites individuals.
        assert!(result.evaluations < 100 + 10);
    }

    #[test]
    fn test_time_budget_with_manual_clock() {
        let clock = ManualClock::new();
        let config = EngineConfig::default()
            .with_population_size(6)
            .without_max_generations()
            .with_search_budget(BudgetUnit::TimeMs, 50)
            .with_seed(4);
        let mut engine = PopulationEngine::new(BitFactory::new(16), OneMax, config)
            .unwrap()
            .with_clock(clock.clone());
        engine.initialize(6).unwrap();
        for _ in 0..4 {
            clock.advance(10);
            engine.evolve_one_generation().unwrap();
        }
        assert_eq!(engine.phase(), Phase::Evolving);
        assert!((engine.progress() - 0.8).abs() < 1e-12);
        clock.advance(10);
        engine.evolve_one_generation().unwrap();
        assert_eq!(engine.phase(), Phase::Finished);
    }

    #[test]
    fn test_stopping_condition_dedup() {
        let mut engine = onemax(Strategy::Generational, 6);
        assert!(!engine.add_stopping_condition(StoppingCondition::max_generations(5)));
        assert!(engine.add_stopping_condition(StoppingCondition::max_time_ms(60_000)));
        assert!(engine.remove_stopping_condition(StoppingKind::MaxGenerations));
        assert!(engine.add_stopping_condition(StoppingCondition::max_generations(5)));
        let result = engine.run().unwrap();
        assert_eq!(result.generations, 5);
    }

    #[test]
    fn test_maximizing_objective() {
        let config = EngineConfig::default()
            .with_population_size(20)
            .with_max_generations(30)
            .with_seed(6);
        let mut engine = PopulationEngine::new(BitFactory::new(12), OnesMax, config).unwrap();
        let result = engine.run().unwrap();
        for pair in result.fitness_history.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-12);
        }
        assert!(result.best_fitness >= 10.0);
    }

    #[test]
    fn test_bloat_control_rejects_offspring() {
        let config = EngineConfig::default()
            .with_population_size(10)
            .with_max_generations(10)
            .with_seed(7);
        let mut engine = PopulationEngine::new(BitFactory::new(8), OneMax, config).unwrap();
        // Reject any candidate with all bits set.
        engine.add_bloat_control(|c: &BitString| c.bits.iter().all(|&b| b));
        let result = engine.run().unwrap();
        assert!(engine
            .population_snapshot()
            .iter()
            .all(|ind| !ind.candidate().bits.iter().all(|&b| b)));
        assert!(result.best_fitness >= 1.0);
    }

    #[test]
    fn test_failing_crossover_falls_back() {
        let config = EngineConfig::default()
            .with_population_size(8)
            .with_crossover_rate(1.0)
            .with_max_generations(10)
            .with_seed(9);
        let mut engine = PopulationEngine::new(BrittleFactory, BrittleOneMax, config).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.generations, 10);
        assert_eq!(engine.population_snapshot().len(), 8);
    }

    #[test]
    fn test_local_search_runs_and_adapts() {
        let config = EngineConfig::default()
            .with_population_size(8)
            .with_max_generations(6)
            .with_selection(Selection::Tournament(2))
            .with_local_search(LocalSearchConfig::default().with_rate(1).with_budget(20))
            .with_seed(12);
        let mut engine = PopulationEngine::new(BitFactory::new(24), OneMax, config).unwrap();
        engine.run().unwrap();
        let probability = engine.state().local_search().probability();
        assert!(probability > 0.0 && probability <= 1.0);
        assert_eq!(engine.phase(), Phase::Finished);
    }

    #[test]
    fn test_best_individuals_for_coverage_strategies() {
        let config = EngineConfig::default()
            .with_strategy(Strategy::Lips)
            .with_population_size(8)
            .with_max_generations(200)
            .with_seed(13);
        let mut engine = PopulationEngine::new(BitFactory::new(6), BitTargets::new(6), config).unwrap();
        engine.run().unwrap();
        let best = engine.best_individuals();
        assert!(!best.is_empty());
        for target in 0..6 {
            assert!(best
                .iter()
                .any(|ind| ind.fitness(ObjectiveId(target)) <= 0.0));
        }
    }

    #[test]
    fn test_snapshot_restore_continues() {
        let mut engine = onemax(Strategy::Generational, 10);
        engine.initialize(10).unwrap();
        for _ in 0..5 {
            engine.evolve_one_generation().unwrap();
        }
        let snapshot = engine.snapshot().unwrap();
        let bytes = snapshot.encode().unwrap();
        let decoded = Snapshot::decode(&bytes).unwrap();

        let config = engine.config().clone();
        let mut resumed = PopulationEngine::restore(BitFactory::new(16), OneMax, config, decoded).unwrap();
        assert_eq!(resumed.phase(), Phase::Evolving);
        assert_eq!(resumed.current_generation(), 5);
        assert_eq!(resumed.state().evaluations(), engine.state().evaluations());
        assert_eq!(resumed.population_snapshot().len(), 10);
        assert_eq!(resumed.archive().covered_count(), engine.archive().covered_count());
        let best_before = engine.best_individual().unwrap().aggregate_fitness();
        assert!((resumed.best_individual().unwrap().aggregate_fitness() - best_before).abs() < 1e-12);

        let result = resumed.run().unwrap();
        assert_eq!(result.generations, 40);
        assert!(result.best_fitness <= best_before);
    }

    #[test]
    fn test_restore_rejects_other_strategy() {
        let mut engine = onemax(Strategy::Generational, 6);
        engine.initialize(6).unwrap();
        let snapshot = engine.snapshot().unwrap();
        let config = engine.config().clone().with_strategy(Strategy::SteadyState);
        assert!(matches!(
            PopulationEngine::restore(BitFactory::new(16), OneMax, config, snapshot),
            Err(SearchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_snapshot_requires_initialization() {
        let engine = onemax(Strategy::Generational, 6);
        assert!(matches!(
            engine.snapshot(),
            Err(SearchError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_chemical_snapshot_keeps_energy() {
        let mut engine = onemax(
            Strategy::ChemicalReaction(crate::engine::ChemicalReactionConfig::default()),
            6,
        );
        engine.initialize(6).unwrap();
        for _ in 0..10 {
            engine.evolve_one_generation().unwrap();
        }
        let energy = engine.chemical_energy().unwrap();
        let snapshot = engine.snapshot().unwrap();
        let config = engine.config().clone();
        let resumed = PopulationEngine::restore(BitFactory::new(16), OneMax, config, snapshot).unwrap();
        assert_eq!(resumed.chemical_energy(), Some(energy));
    }

    #[test]
    fn test_strategy_specific_queries() {
        let config = EngineConfig::default()
            .with_strategy(Strategy::Lips)
            .with_population_size(4)
            .with_seed(14);
        let mut lips = PopulationEngine::new(BitFactory::new(64), BitTargets::new(64), config).unwrap();
        assert_eq!(lips.current_target(), None);
        lips.initialize(4).unwrap();
        assert!(lips.current_target().is_some());
        assert_eq!(lips.mio_covered_count(), None);
        assert_eq!(lips.chemical_energy(), None);

        let config = EngineConfig::default()
            .with_strategy(Strategy::Mio(crate::engine::MioConfig::default()))
            .with_population_size(1)
            .with_seed(14);
        let mut mio = PopulationEngine::new(BitFactory::new(8), BitTargets::new(8), config).unwrap();
        mio.initialize(1).unwrap();
        assert!(mio.mio_covered_count().is_some());
        assert_eq!(mio.current_target(), None);
    }

    #[test]
    fn test_restore_with_installs_clock_and_listeners() {
        let mut engine = onemax(Strategy::SteadyState, 8);
        engine.initialize(8).unwrap();
        engine.evolve_one_generation().unwrap();
        let snapshot = engine.snapshot().unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let recorder = Recorder(log.clone());
        let clock = ManualClock::new();
        clock.set(1_000);
        let config = engine.config().clone();
        let mut resumed = PopulationEngine::restore_with(BitFactory::new(16), OneMax, config, snapshot, |mut e| {
            e.add_listener("recorder", Box::new(recorder));
            e.with_clock(clock.clone())
        })
        .unwrap();
        resumed.evolve_one_generation().unwrap();
        assert_eq!(*log.borrow(), vec!["generation:2"]);
    }
}
