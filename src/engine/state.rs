//! Lifecycle phase and the adaptive state of one engine instance.

use serde::{Deserialize, Serialize};

use crate::local_search::{LocalSearchConfig, LocalSearchController};

use super::config::MioConfig;

/// Lifecycle of a [`PopulationEngine`](super::PopulationEngine).
///
/// `Uninitialized → Initializing → Evolving ⇄ LocalSearching`, and
/// `Evolving → Finished` once a stopping condition is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Evolving,
    LocalSearching,
    Finished,
}

impl Phase {
    /// Whether `self → to` is a legal transition.
    pub fn can_transition_to(self, to: Phase) -> bool {
        matches!(
            (self, to),
            (Phase::Uninitialized, Phase::Initializing)
                | (Phase::Uninitialized, Phase::Evolving)
                | (Phase::Initializing, Phase::Evolving)
                | (Phase::Evolving, Phase::LocalSearching)
                | (Phase::LocalSearching, Phase::Evolving)
                | (Phase::Evolving, Phase::Finished)
        )
    }
}

/// MIO exploitation parameters at the current search progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExploitationParams {
    /// Probability of sampling a fresh random candidate.
    pub random_probability: f64,
    /// Per-target archive capacity.
    pub tests_per_target: usize,
    /// Mutations applied to one sampled candidate.
    pub mutations_per_sample: usize,
    /// Whether the focused phase has started.
    pub focused: bool,
}

impl ExploitationParams {
    /// Linear interpolation between the initial values and the focused-phase
    /// values over progress `[0, exploitation_starts_at]`.
    pub fn at_progress(config: &MioConfig, progress: f64) -> Self {
        let threshold = config.exploitation_starts_at;
        let fraction = if threshold <= 0.0 {
            1.0
        } else {
            (progress / threshold).clamp(0.0, 1.0)
        };
        let lerp = |from: f64, to: f64| from + (to - from) * fraction;

        Self {
            random_probability: lerp(config.random_probability, config.focused_random_probability),
            tests_per_target: lerp(
                config.tests_per_target as f64,
                config.focused_tests_per_target as f64,
            )
            .round()
            .max(1.0) as usize,
            mutations_per_sample: lerp(1.0, config.max_mutations_per_sample as f64)
                .round()
                .max(1.0) as usize,
            focused: fraction >= 1.0,
        }
    }
}

/// Mutable state owned by one engine: phase, counters and the adaptive
/// knobs (local-search probability, MIO exploitation parameters).
#[derive(Debug, Clone)]
pub struct SearchState {
    pub(crate) phase: Phase,
    pub(crate) generation: usize,
    pub(crate) evaluations: u64,
    pub(crate) next_id: u64,
    pub(crate) local_search: LocalSearchController,
    pub(crate) exploitation: Option<ExploitationParams>,
}

impl SearchState {
    pub(crate) fn new(local_search: LocalSearchConfig) -> Self {
        Self {
            phase: Phase::Uninitialized,
            generation: 0,
            evaluations: 0,
            next_id: 0,
            local_search: LocalSearchController::new(local_search),
            exploitation: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Completed generations.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Fitness evaluations so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn local_search(&self) -> &LocalSearchController {
        &self.local_search
    }

    /// Current MIO parameters (MIO strategy only).
    pub fn exploitation(&self) -> Option<&ExploitationParams> {
        self.exploitation.as_ref()
    }

    pub(crate) fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Moves to `to`.
    ///
    /// # Panics
    /// Panics on an illegal transition.
    pub(crate) fn transition(&mut self, to: Phase) {
        assert!(
            self.phase.can_transition_to(to),
            "illegal phase transition {:?} -> {to:?}",
            self.phase
        );
        log::trace!("phase {:?} -> {to:?}", self.phase);
        self.phase = to;
    }
}
