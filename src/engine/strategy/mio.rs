//! MIO: many independent objectives, archive-driven sampling.
//!
//! One sampling step per generation. With the current random probability a
//! fresh candidate is created; otherwise an individual is taken from the
//! [`MioArchive`] (lowest sample counter first) and mutated several times,
//! each mutant being evaluated and offered to the archive. As progress
//! approaches the exploitation threshold the random probability and the
//! per-target capacity shrink and the mutations per sample grow.
//!
//! The population visible to listeners is the last individual produced.
//!
//! # Reference
//! Arcuri (2017), "Many Independent Objective (MIO) Algorithm for Test
//! Suite Generation"

use rand::Rng;

use crate::archive::MioArchive;
use crate::candidate::{Candidate, CandidateFactory, Individual, ObjectiveId};
use crate::engine::config::MioConfig;
use crate::engine::context::SearchContext;
use crate::engine::state::ExploitationParams;
use crate::error::SearchError;
use crate::fitness::{normalized_heuristic, FitnessProvider};

pub(crate) struct MioState<C> {
    archive: MioArchive<C>,
}

impl<C: Candidate> MioState<C> {
    pub(super) fn initialize<P, F>(
        ctx: &mut SearchContext<C, P, F>,
        config: &MioConfig,
    ) -> Result<(Self, Vec<Individual<C>>), SearchError>
    where
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let mut first = ctx.new_individual().ok_or(SearchError::EmptyPopulation)?;
        ctx.evaluate(&mut first);
        let mut population = vec![first];
        let state = Self::resume(ctx, &mut population, config);
        Ok((state, population))
    }

    /// Rebuilds the per-target populations from `population` and the goal
    /// archive, at the current progress.
    pub(super) fn resume<P, F>(
        ctx: &mut SearchContext<C, P, F>,
        population: &mut Vec<Individual<C>>,
        config: &MioConfig,
    ) -> Self
    where
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let params = ExploitationParams::at_progress(config, ctx.progress());
        ctx.state.exploitation = Some(params);
        let mut state = Self {
            archive: MioArchive::new(params.tests_per_target),
        };

        let archived: Vec<Individual<C>> = ctx.archive.solutions().into_iter().cloned().collect();
        for ind in archived.iter().chain(population.iter()) {
            state.offer(ctx, ind);
        }
        if population.len() > 1 {
            population.truncate(1);
        }
        state
    }

    pub(super) fn step<P, F>(
        &mut self,
        ctx: &mut SearchContext<C, P, F>,
        population: &mut Vec<Individual<C>>,
        config: &MioConfig,
    ) where
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let params = ctx
            .state
            .exploitation
            .unwrap_or_else(|| ExploitationParams::at_progress(config, ctx.progress()));

        let explore = ctx.rng.random_range(0.0..1.0) < params.random_probability;
        let sampled = if explore { None } else { self.archive.sample(&mut ctx.rng) };

        let last = match sampled {
            Some(parent) => self.exploit(ctx, parent, params.mutations_per_sample),
            None => ctx.new_individual().map(|mut ind| {
                ctx.evaluate(&mut ind);
                self.offer(ctx, &ind);
                ind
            }),
        };
        if let Some(last) = last {
            *population = vec![last];
        }

        self.update_parameters(ctx, config, params);
    }

    /// Mutates a sampled individual `mutations` times, evaluating and
    /// archiving every mutant. Returns the last mutant.
    fn exploit<P, F>(
        &mut self,
        ctx: &mut SearchContext<C, P, F>,
        parent: Individual<C>,
        mutations: usize,
    ) -> Option<Individual<C>>
    where
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let mut current = parent;
        let mut last = None;
        for _ in 0..mutations {
            if ctx.is_finished() {
                break;
            }
            let mut mutant = ctx.offspring_of(&current);
            if !ctx.mutate(&mut mutant) || ctx.is_too_large(mutant.candidate()) {
                continue;
            }
            ctx.evaluate(&mut mutant);
            self.offer(ctx, &mutant);
            current = mutant.clone();
            last = Some(mutant);
        }
        last
    }

    /// Offers `individual` to every target's population.
    fn offer<P, F>(&mut self, ctx: &SearchContext<C, P, F>, individual: &Individual<C>)
    where
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        if individual.is_changed() {
            return;
        }
        for o in 0..ctx.num_objectives {
            let objective = ObjectiveId(o);
            let value = individual.fitness(objective);
            let covered = ctx.fitness.covers(objective, value);
            let h = normalized_heuristic(ctx.direction, value, covered);
            self.archive.add(objective, h, individual);
        }
    }

    fn update_parameters<P, F>(&mut self, ctx: &mut SearchContext<C, P, F>, config: &MioConfig, old: ExploitationParams)
    where
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let params = ExploitationParams::at_progress(config, ctx.progress());
        if params.tests_per_target < self.archive.capacity() {
            self.archive.shrink(params.tests_per_target);
        }
        if params.focused && !old.focused {
            log::info!("MIO focused phase started");
        }
        ctx.state.exploitation = Some(params);
    }

    /// Per-target populations.
    pub(crate) fn archive(&self) -> &MioArchive<C> {
        &self.archive
    }
}
