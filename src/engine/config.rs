//! Engine configuration.
//!
//! [`EngineConfig`] holds every parameter of a run: population size,
//! strategy and its sub-configuration, operator rates, limits and the
//! local-search schedule.

use crate::budget::BudgetUnit;
use crate::error::SearchError;
use crate::local_search::LocalSearchConfig;

use super::selection::Selection;

/// Neighbourhood shape of the cellular strategy.
///
/// Cells live on a toroidal grid of width `ceil(sqrt(n))`, except
/// [`OneDimension`](Self::OneDimension) which uses a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellularModel {
    /// The cell and its two ring neighbours.
    OneDimension,
    /// The cell and its north, south, east and west neighbours.
    #[default]
    LinearFive,
    /// The cell and its eight surrounding neighbours.
    CompactNine,
    /// [`CompactNine`](Self::CompactNine) plus the four cells two steps
    /// away along the axes.
    CompactThirteen,
}

/// Differential evolution parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferentialConfig {
    /// Differential weight `F`, in `[0, 2]`.
    pub weight: f64,
    /// Probability of recombining the donor with the target, in `[0, 1]`.
    pub crossover_rate: f64,
}

impl Default for DifferentialConfig {
    fn default() -> Self {
        Self {
            weight: 0.8,
            crossover_rate: 0.9,
        }
    }
}

/// Chemical reaction optimization parameters.
///
/// # References
///
/// Lam & Li (2010), "Chemical-Reaction-Inspired Metaheuristic for
/// Optimization"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChemicalReactionConfig {
    /// Kinetic energy given to every new molecule.
    pub initial_kinetic_energy: f64,
    /// Lower bound of the fraction of energy kept after an on-wall
    /// collision, in `[0, 1]`.
    pub kinetic_energy_loss_rate: f64,
    /// Probability of an inter-molecular (two-molecule) reaction.
    pub molecular_collision_rate: f64,
    /// Collisions after which a molecule decomposes.
    pub decomposition_threshold: usize,
    /// Kinetic energy at or below which two molecules synthesize.
    pub synthesis_threshold: f64,
}

impl Default for ChemicalReactionConfig {
    fn default() -> Self {
        Self {
            initial_kinetic_energy: 1000.0,
            kinetic_energy_loss_rate: 0.2,
            molecular_collision_rate: 0.2,
            decomposition_threshold: 500,
            synthesis_threshold: 10.0,
        }
    }
}

/// MIO parameters.
///
/// While search progress is below `exploitation_starts_at`, the random
/// sampling probability and per-target capacity move linearly from their
/// initial values toward their floors and the mutations per sample grow
/// toward the maximum. From the threshold on (the focused phase) the
/// floors and the maximum apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MioConfig {
    /// Initial per-target population capacity.
    pub tests_per_target: usize,
    /// Per-target capacity in the focused phase.
    pub focused_tests_per_target: usize,
    /// Initial probability of sampling a fresh random candidate.
    pub random_probability: f64,
    /// Random sampling probability in the focused phase.
    pub focused_random_probability: f64,
    /// Mutations applied to one sampled candidate in the focused phase.
    pub max_mutations_per_sample: usize,
    /// Progress fraction at which the focused phase starts, in `[0, 1]`.
    pub exploitation_starts_at: f64,
}

impl Default for MioConfig {
    fn default() -> Self {
        Self {
            tests_per_target: 10,
            focused_tests_per_target: 1,
            random_probability: 0.5,
            focused_random_probability: 0.0,
            max_mutations_per_sample: 10,
            exploitation_starts_at: 0.5,
        }
    }
}

/// Evolution strategy driven by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Strategy {
    /// Elitist generational GA: elites plus a full set of offspring.
    #[default]
    Generational,
    /// Parents are replaced by their offspring when the best offspring is
    /// not worse than the best parent.
    SteadyState,
    /// Breeding restricted to grid neighbourhoods, replace if not worse.
    Cellular(CellularModel),
    /// Differential evolution with greedy one-to-one replacement.
    Differential(DifferentialConfig),
    /// Chemical reaction optimization (one reaction per generation).
    ChemicalReaction(ChemicalReactionConfig),
    /// NSGA-II: non-dominated sort and crowding distance.
    Nsga2,
    /// SPEA2: strength, density and archive truncation.
    Spea2,
    /// LIPS: one target at a time, worklist-driven.
    Lips,
    /// MIO: archive-driven sampling with an exploitation shift.
    Mio(MioConfig),
}

impl Strategy {
    /// Short identifier used in logs and snapshots.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Generational => "generational",
            Strategy::SteadyState => "steady-state",
            Strategy::Cellular(_) => "cellular",
            Strategy::Differential(_) => "differential",
            Strategy::ChemicalReaction(_) => "chemical-reaction",
            Strategy::Nsga2 => "nsga2",
            Strategy::Spea2 => "spea2",
            Strategy::Lips => "lips",
            Strategy::Mio(_) => "mio",
        }
    }

    /// Whether the best aggregate fitness can never get worse between
    /// generations.
    pub fn is_elitist(&self) -> bool {
        matches!(
            self,
            Strategy::Generational
                | Strategy::SteadyState
                | Strategy::Cellular(_)
                | Strategy::Differential(_)
                | Strategy::ChemicalReaction(_)
        )
    }

    /// Whether the population size may change inside a run.
    pub fn has_variable_population(&self) -> bool {
        matches!(self, Strategy::ChemicalReaction(_) | Strategy::Mio(_))
    }

    /// Smallest population the generation step can work with.
    pub fn min_population_size(&self) -> usize {
        match self {
            Strategy::Differential(_) => 4,
            Strategy::Generational
            | Strategy::SteadyState
            | Strategy::Cellular(_)
            | Strategy::Nsga2
            | Strategy::Spea2
            | Strategy::Lips => 2,
            Strategy::ChemicalReaction(_) | Strategy::Mio(_) => 1,
        }
    }

    /// Whether local search applies to this strategy's population.
    pub fn supports_local_search(&self) -> bool {
        self.is_elitist()
    }
}

/// Configuration of a search run.
///
/// # Examples
///
/// ```
/// use u_evosearch::engine::{EngineConfig, Selection, Strategy};
///
/// let config = EngineConfig::default()
///     .with_population_size(30)
///     .with_strategy(Strategy::SteadyState)
///     .with_selection(Selection::Rank)
///     .with_max_generations(200)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of individuals in the population.
    pub population_size: usize,

    /// Evolution strategy.
    pub strategy: Strategy,

    /// Parent selection for single-objective strategies.
    pub selection: Selection,

    /// Individuals copied unchanged into the next generation
    /// (generational GA and chemical reaction).
    pub elite_count: usize,

    /// Probability of recombining a pair of parents.
    pub crossover_rate: f64,

    /// Probability of mutating an offspring.
    pub mutation_rate: f64,

    /// Attempts at producing an offspring before falling back to copies
    /// of the parents.
    pub max_construction_attempts: usize,

    /// Largest accepted [`Candidate::size`](crate::candidate::Candidate::size).
    pub max_candidate_size: Option<usize>,

    /// Random seed. `None` draws one from the OS.
    pub seed: Option<u64>,

    /// Global search budget. Also drives per-target allotments (LIPS) and
    /// search progress (MIO).
    pub search_budget: Option<(BudgetUnit, u64)>,

    /// Stop after this many generations.
    pub max_generations: Option<u64>,

    /// Stop after this many fitness evaluations.
    pub max_evaluations: Option<u64>,

    /// Local-search schedule.
    pub local_search: LocalSearchConfig,

    /// Tie-break archive entries of equal fitness by smaller size.
    pub archive_prefers_smaller: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            strategy: Strategy::default(),
            selection: Selection::default(),
            elite_count: 1,
            crossover_rate: 0.75,
            mutation_rate: 1.0,
            max_construction_attempts: 3,
            max_candidate_size: None,
            seed: None,
            search_budget: None,
            max_generations: Some(100),
            max_evaluations: None,
            local_search: LocalSearchConfig::default(),
            archive_prefers_smaller: false,
        }
    }
}

impl EngineConfig {
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_elite_count(mut self, n: usize) -> Self {
        self.elite_count = n;
        self
    }

    /// Sets the crossover rate, clamped to `[0, 1]`.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation rate, clamped to `[0, 1]`.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_construction_attempts(mut self, n: usize) -> Self {
        self.max_construction_attempts = n.max(1);
        self
    }

    pub fn with_max_candidate_size(mut self, size: usize) -> Self {
        self.max_candidate_size = Some(size);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the global search budget.
    pub fn with_search_budget(mut self, unit: BudgetUnit, total: u64) -> Self {
        self.search_budget = Some((unit, total));
        self
    }

    pub fn with_max_generations(mut self, n: u64) -> Self {
        self.max_generations = Some(n);
        self
    }

    /// Removes the generation limit.
    pub fn without_max_generations(mut self) -> Self {
        self.max_generations = None;
        self
    }

    pub fn with_max_evaluations(mut self, n: u64) -> Self {
        self.max_evaluations = Some(n);
        self
    }

    pub fn with_local_search(mut self, local_search: LocalSearchConfig) -> Self {
        self.local_search = local_search;
        self
    }

    pub fn with_archive_prefers_smaller(mut self, prefer: bool) -> Self {
        self.archive_prefers_smaller = prefer;
        self
    }

    /// Preset for quick runs: small population, few generations.
    ///
    /// - Population: 20, Generations: 50, Time budget: 10s
    pub fn fast() -> Self {
        Self {
            population_size: 20,
            max_generations: Some(50),
            search_budget: Some((BudgetUnit::TimeMs, 10_000)),
            ..Self::default()
        }
    }

    /// Preset balancing quality and time.
    ///
    /// - Population: 50, Generations: 200, Time budget: 60s
    /// - Local search every 10 generations
    pub fn balanced() -> Self {
        Self {
            population_size: 50,
            max_generations: Some(200),
            search_budget: Some((BudgetUnit::TimeMs, 60_000)),
            local_search: LocalSearchConfig::default().with_rate(10),
            ..Self::default()
        }
    }

    /// Preset for long runs.
    ///
    /// - Population: 100, Generations: 1000, Time budget: 5min
    /// - Local search every 5 generations with a larger budget
    pub fn thorough() -> Self {
        Self {
            population_size: 100,
            max_generations: Some(1000),
            search_budget: Some((BudgetUnit::TimeMs, 300_000)),
            local_search: LocalSearchConfig::default().with_rate(5).with_budget(500),
            ..Self::default()
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), SearchError> {
        let invalid = |msg: &str| Err(SearchError::InvalidConfig(msg.into()));

        if self.population_size == 0 {
            return invalid("population_size must be at least 1");
        }
        let min = self.strategy.min_population_size();
        if self.population_size < min {
            return Err(SearchError::InvalidConfig(format!(
                "{} needs a population of at least {min}",
                self.strategy.name()
            )));
        }
        match self.strategy {
            Strategy::Generational
            | Strategy::SteadyState
            | Strategy::Cellular(_)
            | Strategy::Nsga2
            | Strategy::Spea2
            | Strategy::Lips => {}
            Strategy::Differential(de) => {
                if !(0.0..=2.0).contains(&de.weight) {
                    return invalid("differential weight must be in [0, 2]");
                }
                if !(0.0..=1.0).contains(&de.crossover_rate) {
                    return invalid("differential crossover_rate must be in [0, 1]");
                }
            }
            Strategy::ChemicalReaction(cro) => {
                if !(0.0..=1.0).contains(&cro.kinetic_energy_loss_rate) {
                    return invalid("kinetic_energy_loss_rate must be in [0, 1]");
                }
                if !(0.0..=1.0).contains(&cro.molecular_collision_rate) {
                    return invalid("molecular_collision_rate must be in [0, 1]");
                }
                if !(cro.initial_kinetic_energy >= 0.0) {
                    return invalid("initial_kinetic_energy must be non-negative");
                }
            }
            Strategy::Mio(mio) => {
                if mio.tests_per_target == 0 || mio.focused_tests_per_target == 0 {
                    return invalid("MIO tests per target must be positive");
                }
                if mio.focused_tests_per_target > mio.tests_per_target {
                    return invalid("focused_tests_per_target must not exceed tests_per_target");
                }
                if !(0.0..=1.0).contains(&mio.random_probability)
                    || !(0.0..=1.0).contains(&mio.focused_random_probability)
                {
                    return invalid("MIO random probabilities must be in [0, 1]");
                }
                if mio.max_mutations_per_sample == 0 {
                    return invalid("max_mutations_per_sample must be positive");
                }
                if !(0.0..=1.0).contains(&mio.exploitation_starts_at) {
                    return invalid("exploitation_starts_at must be in [0, 1]");
                }
            }
        }
        if self.elite_count >= self.population_size && self.strategy == Strategy::Generational {
            return invalid("elite_count must be smaller than population_size");
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) || !(0.0..=1.0).contains(&self.mutation_rate) {
            return invalid("crossover_rate and mutation_rate must be in [0, 1]");
        }
        if self.max_construction_attempts == 0 {
            return invalid("max_construction_attempts must be at least 1");
        }
        if self.max_candidate_size == Some(0) {
            return invalid("max_candidate_size must be positive or None");
        }
        if matches!(self.search_budget, Some((_, 0))) {
            return invalid("search budget must be positive or None");
        }
        if self.max_generations == Some(0) || self.max_evaluations == Some(0) {
            return invalid("generation and evaluation limits must be positive or None");
        }
        self.local_search.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================
