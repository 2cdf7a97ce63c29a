//! Strategy implementations sharing one orchestrator.
//!
//! [`StrategyState`] is the tagged union the engine drives: one variant per
//! [`Strategy`], carrying that strategy's configuration and whatever state
//! it keeps between generations. Each variant's generation step lives in its
//! own module and works on the shared [`SearchContext`] plus the population.

mod cellular;
mod chemical;
mod differential;
mod generational;
mod lips;
mod mio;
mod nsga2;
mod spea2;
mod steady_state;

pub use lips::{FlatTargets, TargetGraph};

pub use chemical::ChemicalState;

use crate::archive::MioArchive;
use crate::candidate::{Candidate, CandidateFactory, Individual, ObjectiveId};
use crate::error::SearchError;
use crate::fitness::FitnessProvider;

use super::config::{CellularModel, ChemicalReactionConfig, DifferentialConfig, MioConfig, Strategy};
use super::context::SearchContext;
use lips::LipsState;
use mio::MioState;

pub(crate) enum StrategyState<C> {
    Generational,
    SteadyState,
    Cellular(CellularModel),
    Differential(DifferentialConfig),
    Chemical(ChemicalReactionConfig, ChemicalState),
    Nsga2,
    Spea2,
    Lips(LipsState),
    Mio(MioConfig, MioState<C>),
}

impl<C: Candidate> StrategyState<C> {
    /// Builds the initial population and the strategy state.
    ///
    /// Returns [`SearchError::EmptyPopulation`] if the factory could not
    /// produce a single acceptable candidate, and
    /// [`SearchError::InvalidConfig`] if it produced fewer than the
    /// strategy's minimum.
    pub(crate) fn initialize<P, F>(
        ctx: &mut SearchContext<C, P, F>,
        size: usize,
        targets: &dyn TargetGraph,
    ) -> Result<(Self, Vec<Individual<C>>), SearchError>
    where
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let strategy = ctx.config.strategy;
        let (state, population) = match strategy {
            Strategy::Lips => {
                let (state, population) = LipsState::initialize(ctx, size, targets)?;
                (StrategyState::Lips(state), population)
            }
            Strategy::Mio(config) => {
                let (state, population) = MioState::initialize(ctx, &config)?;
                (StrategyState::Mio(config, state), population)
            }
            strategy => {
                let mut population = random_population(ctx, size);
                if population.is_empty() {
                    return Err(SearchError::EmptyPopulation);
                }
                let state = Self::resume(strategy, ctx, &mut population, targets, None);
                (state, population)
            }
        };

        let min = strategy.min_population_size();
        if population.len() < min {
            return Err(SearchError::InvalidConfig(format!(
                "{} needs a population of at least {min}, the factory produced {} acceptable candidates",
                strategy.name(),
                population.len()
            )));
        }
        Ok((state, population))
    }

    /// Rebuilds the strategy state around an existing, evaluated population
    /// (after initialization or a restore).
    pub(crate) fn resume<P, F>(
        strategy: Strategy,
        ctx: &mut SearchContext<C, P, F>,
        population: &mut Vec<Individual<C>>,
        targets: &dyn TargetGraph,
        chemical: Option<ChemicalState>,
    ) -> Self
    where
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let state = match strategy {
            Strategy::Generational => StrategyState::Generational,
            Strategy::SteadyState => StrategyState::SteadyState,
            Strategy::Cellular(model) => StrategyState::Cellular(model),
            Strategy::Differential(config) => StrategyState::Differential(config),
            Strategy::ChemicalReaction(config) => {
                let state = match chemical {
                    Some(state) => state,
                    None => ChemicalState::initialize(ctx, population, &config),
                };
                StrategyState::Chemical(config, state)
            }
            Strategy::Nsga2 => {
                nsga2::assign_ranks(ctx, population);
                StrategyState::Nsga2
            }
            Strategy::Spea2 => {
                spea2::assign_fitness(ctx, population);
                StrategyState::Spea2
            }
            Strategy::Lips => StrategyState::Lips(LipsState::resume(ctx, population, targets)),
            Strategy::Mio(config) => StrategyState::Mio(config, MioState::resume(ctx, population, &config)),
        };
        if strategy.is_elitist() {
            ctx.sort_population(population);
        }
        state
    }

    /// Runs one generation of the strategy.
    pub(crate) fn step<P, F>(
        &mut self,
        ctx: &mut SearchContext<C, P, F>,
        population: &mut Vec<Individual<C>>,
        targets: &dyn TargetGraph,
    ) where
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        match self {
            StrategyState::Generational => generational::step(ctx, population),
            StrategyState::SteadyState => steady_state::step(ctx, population),
            StrategyState::Cellular(model) => cellular::step(ctx, population, *model),
            StrategyState::Differential(config) => differential::step(ctx, population, config),
            StrategyState::Chemical(config, state) => state.step(ctx, population, config),
            StrategyState::Nsga2 => nsga2::step(ctx, population),
            StrategyState::Spea2 => spea2::step(ctx, population),
            StrategyState::Lips(state) => state.step(ctx, population, targets),
            StrategyState::Mio(config, state) => state.step(ctx, population, config),
        }
    }

    /// Hook run after a local-search phase changed the population.
    pub(crate) fn after_local_search<P, F>(
        &mut self,
        ctx: &mut SearchContext<C, P, F>,
        population: &mut [Individual<C>],
    ) where
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        if let StrategyState::Chemical(_, state) = self {
            state.compensate(ctx, population);
        }
        ctx.sort_population(population);
    }

    /// Energy bookkeeping of the chemical reaction strategy.
    pub(crate) fn chemical_state(&self) -> Option<&ChemicalState> {
        match self {
            StrategyState::Chemical(_, state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn lips_target(&self) -> Option<ObjectiveId> {
        match self {
            StrategyState::Lips(state) => state.current(),
            _ => None,
        }
    }

    pub(crate) fn mio_archive(&self) -> Option<&MioArchive<C>> {
        match self {
            StrategyState::Mio(_, state) => Some(state.archive()),
            _ => None,
        }
    }
}

/// Up to `size` fresh, evaluated random individuals.
pub(crate) fn random_population<C, P, F>(ctx: &mut SearchContext<C, P, F>, size: usize) -> Vec<Individual<C>>
where
    C: Candidate,
    P: CandidateFactory<C>,
    F: FitnessProvider<C>,
{
    let mut population = Vec::with_capacity(size);
    for _ in 0..size {
        match ctx.new_individual() {
            Some(ind) => population.push(ind),
            None => log::debug!("factory failed to produce an acceptable candidate"),
        }
    }
    ctx.evaluate_all(&mut population);
    population
}
