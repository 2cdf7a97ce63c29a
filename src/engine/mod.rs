//! Population engine and evolution strategies.
//!
//! One orchestrator, [`PopulationEngine`], drives every strategy. The host
//! supplies a [`CandidateFactory`](crate::candidate::CandidateFactory) and a
//! [`FitnessProvider`](crate::fitness::FitnessProvider); the engine owns the
//! population, the goal archive, the budget and the adaptive state.
//!
//! # Key Types
//!
//! - [`EngineConfig`]: population size, operators, limits, seed
//! - [`Strategy`]: which generation step to run
//! - [`Selection`]: parent selection for single-objective strategies
//! - [`PopulationEngine`]: lifecycle, queries, snapshots
//! - [`SearchResult`]: outcome of a run
//!
//! # Strategies
//!
//! | Strategy | Replacement |
//! |----------|-------------|
//! | Generational | elites plus offspring |
//! | Steady-state | parents replaced by not-worse offspring |
//! | Cellular | grid neighbourhoods, synchronous |
//! | Differential | greedy one-to-one trial replacement |
//! | Chemical reaction | one energy-conserving reaction per generation |
//! | NSGA-II | fronts and crowding distance |
//! | SPEA2 | strength, density, truncation |
//! | LIPS | one target at a time from a worklist |
//! | MIO | per-target populations, exploitation shift |
//!
//! # References
//!
//! - Goldberg (1989), *Genetic Algorithms in Search, Optimization, and Machine Learning*
//! - Deb et al. (2002), *A Fast and Elitist Multiobjective GA: NSGA-II*
//! - Zitzler, Laumanns, Thiele (2001), *SPEA2*
//! - Lam, Li (2010), *Chemical-Reaction-Inspired Metaheuristic for Optimization*

mod config;
mod context;
mod runner;
mod selection;
mod state;
mod strategy;

pub use config::{CellularModel, ChemicalReactionConfig, DifferentialConfig, EngineConfig, MioConfig, Strategy};
pub use runner::{PopulationEngine, SearchResult};
pub use selection::Selection;
pub use state::{ExploitationParams, Phase, SearchState};
pub use strategy::{ChemicalState, FlatTargets, TargetGraph};
