//! Adaptive local-search scheduling.
//!
//! Local search runs every `rate` generations, and then only with the
//! current probability `p`. After each application `p` adapts: an
//! improvement multiplies it by `adaptation_rate` (capped at `1.0`),
//! no improvement divides it (floored at `min_probability`, which is
//! strictly positive so local search is never switched off for good).
//!
//! The engine's own local-search step is a mutation hill climber: each
//! individual gets up to `probes` mutated copies evaluated, and a copy
//! replaces the individual when strictly better. Each probe costs one
//! evaluation of the phase budget.

use rand::Rng;

use crate::error::SearchError;

/// Local-search schedule and budget.
///
/// # Examples
///
/// ```
/// use u_evosearch::local_search::LocalSearchConfig;
///
/// let config = LocalSearchConfig::default()
///     .with_rate(5)
///     .with_budget(200)
///     .with_adaptation_rate(1.5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSearchConfig {
    /// Apply every `rate` generations. `0` disables local search.
    pub rate: usize,

    /// Starting application probability, in `(0, 1]`.
    pub initial_probability: f64,

    /// Factor applied to the probability after each application (`> 1`).
    pub adaptation_rate: f64,

    /// Lower bound of the probability. Must be positive.
    pub min_probability: f64,

    /// Evaluations available to one local-search phase.
    pub budget: u64,

    /// Mutation probes per individual.
    pub probes: usize,
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        Self {
            rate: 0,
            initial_probability: 1.0,
            adaptation_rate: 2.0,
            min_probability: f64::MIN_POSITIVE,
            budget: 100,
            probes: 5,
        }
    }
}

impl LocalSearchConfig {
    pub fn with_rate(mut self, rate: usize) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_initial_probability(mut self, p: f64) -> Self {
        self.initial_probability = p.clamp(f64::MIN_POSITIVE, 1.0);
        self
    }

    pub fn with_adaptation_rate(mut self, rate: f64) -> Self {
        self.adaptation_rate = rate;
        self
    }

    pub fn with_budget(mut self, evaluations: u64) -> Self {
        self.budget = evaluations;
        self
    }

    pub fn with_probes(mut self, probes: usize) -> Self {
        self.probes = probes.max(1);
        self
    }

    /// Whether local search is enabled at all.
    pub fn is_enabled(&self) -> bool {
        self.rate > 0
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(self.min_probability > 0.0 && self.min_probability <= 1.0) {
            return Err(SearchError::InvalidConfig(
                "local search min_probability must be in (0, 1]".into(),
            ));
        }
        if !(self.initial_probability >= self.min_probability && self.initial_probability <= 1.0) {
            return Err(SearchError::InvalidConfig(
                "local search initial_probability must be in [min_probability, 1]".into(),
            ));
        }
        if !(self.adaptation_rate > 1.0) {
            return Err(SearchError::InvalidConfig(
                "local search adaptation_rate must be greater than 1".into(),
            ));
        }
        if self.probes == 0 {
            return Err(SearchError::InvalidConfig(
                "local search probes must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Decides when local search runs and adapts its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSearchController {
    config: LocalSearchConfig,
    probability: f64,
}

impl LocalSearchController {
    pub fn new(config: LocalSearchConfig) -> Self {
        let probability = config.initial_probability;
        Self {
            config,
            probability,
        }
    }

    pub fn config(&self) -> &LocalSearchConfig {
        &self.config
    }

    /// Current application probability.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub(crate) fn set_probability(&mut self, p: f64) {
        self.probability = p.clamp(self.config.min_probability, 1.0);
    }

    /// Whether local search should run after `generation`.
    pub fn should_apply<R: Rng>(&self, generation: usize, rng: &mut R) -> bool {
        if !self.config.is_enabled() || generation % self.config.rate != 0 {
            return false;
        }
        rng.random_bool(self.probability.clamp(0.0, 1.0))
    }

    /// Runs `step` on each population member until it returns `None`
    /// (budget spent or search finished), then adapts the probability.
    ///
    /// `step` returns `Some(true)` when it improved the member. Returns
    /// whether any member improved.
    pub fn apply_and_adapt<T, F>(&mut self, population: &mut [T], mut step: F) -> bool
    where
        F: FnMut(&mut T) -> Option<bool>,
    {
        let mut improved = false;
        for member in population.iter_mut() {
            match step(member) {
                Some(true) => improved = true,
                Some(false) => {}
                None => break,
            }
        }
        self.adapt(improved);
        improved
    }

    /// Moves the probability up on improvement, down otherwise.
    pub fn adapt(&mut self, improved: bool) {
        let old = self.probability;
        self.probability = if improved {
            (self.probability * self.config.adaptation_rate).min(1.0)
        } else {
            (self.probability / self.config.adaptation_rate).max(self.config.min_probability)
        };
        log::debug!(
            "local search probability {old:.3e} -> {:.3e} (improved: {improved})",
            self.probability
        );
    }
}
