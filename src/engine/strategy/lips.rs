//! LIPS: evolve towards one target at a time.
//!
//! The search starts from a single random individual `t0`. Targets wait in a
//! worklist seeded with the roots of the [`TargetGraph`], and the next target
//! is always taken from the back. Whenever an individual covers a target,
//! that target's uncovered children are pushed to the front, so they are
//! attempted after every target already queued (the worklist order of the
//! LIPS paper). The current target is abandoned when it is covered, or when
//! its share of the global budget runs out, in which case it is parked and
//! only reattempted once the worklist is empty.
//!
//! Without a global budget the current target only changes on coverage.
//!
//! # Reference
//! Scalabrino et al. (2016), "Search-Based Testing of Procedural Programs:
//! Iterative Single-Target or Multi-Target Approach?"

use std::collections::VecDeque;

use crate::candidate::{Candidate, CandidateFactory, Individual, ObjectiveId};
use crate::engine::context::SearchContext;
use crate::error::SearchError;
use crate::fitness::FitnessProvider;

use super::random_population;

/// Structural relation between targets (for example, branches nested in
/// other branches). LIPS starts from the roots and moves to a target's
/// children once the target is covered.
pub trait TargetGraph {
    /// Targets available before anything is covered.
    fn roots(&self, num_targets: usize) -> Vec<ObjectiveId>;

    /// Targets that become reachable once `target` is covered.
    fn children(&self, target: ObjectiveId) -> Vec<ObjectiveId>;
}

/// Every target is a root; no target has children.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTargets;

impl TargetGraph for FlatTargets {
    fn roots(&self, num_targets: usize) -> Vec<ObjectiveId> {
        (0..num_targets).map(ObjectiveId).collect()
    }

    fn children(&self, _target: ObjectiveId) -> Vec<ObjectiveId> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LipsState {
    current: Option<ObjectiveId>,
    worklist: VecDeque<ObjectiveId>,
    attempted: Vec<ObjectiveId>,
}

impl LipsState {
    /// Evaluates `t0`, seeds the worklist and fills the population with
    /// `t0` plus `size - 1` random individuals.
    pub(super) fn initialize<C, P, F>(
        ctx: &mut SearchContext<C, P, F>,
        size: usize,
        targets: &dyn TargetGraph,
    ) -> Result<(Self, Vec<Individual<C>>), SearchError>
    where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let mut t0 = ctx.new_individual().ok_or(SearchError::EmptyPopulation)?;
        ctx.evaluate(&mut t0);

        let mut population = vec![t0];
        population.extend(random_population(ctx, size.saturating_sub(1)));

        let state = Self::resume(ctx, &mut population, targets);
        Ok((state, population))
    }

    /// Seeds the worklist from the graph roots and the coverage already in
    /// the archive, then selects the first target.
    pub(super) fn resume<C, P, F>(
        ctx: &mut SearchContext<C, P, F>,
        population: &mut [Individual<C>],
        targets: &dyn TargetGraph,
    ) -> Self
    where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let mut state = Self::default();
        for root in targets.roots(ctx.num_objectives) {
            state.enqueue_back(ctx, root);
        }
        let covered: Vec<ObjectiveId> = (0..ctx.num_objectives)
            .map(ObjectiveId)
            .filter(|&o| ctx.archive.is_covered(o))
            .collect();
        for target in covered {
            for child in targets.children(target) {
                state.enqueue_front(ctx, child);
            }
        }
        state.next_target(ctx);
        state.sort_for_target(ctx, population);
        state
    }

    /// Target currently evolved towards.
    pub(crate) fn current(&self) -> Option<ObjectiveId> {
        self.current
    }

    pub(super) fn step<C, P, F>(
        &mut self,
        ctx: &mut SearchContext<C, P, F>,
        population: &mut Vec<Individual<C>>,
        targets: &dyn TargetGraph,
    ) where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let Some(target) = self.current else {
            return;
        };

        let n = population.len();
        let keys: Vec<f64> = population.iter().map(|ind| ctx.objective_key(ind, target)).collect();
        let selection = ctx.config.selection;

        // Population is sorted for the current target: keep the two best.
        let mut next: Vec<Individual<C>> = population[..n.min(2)].to_vec();
        let mut fresh = Vec::new();
        while next.len() < n {
            let offspring = ctx.breed(population, |rng| selection.select(&keys, rng));
            for mut child in [offspring.first, offspring.second] {
                if next.len() < n {
                    ctx.evaluate(&mut child);
                    fresh.push(next.len());
                    next.push(child);
                }
            }
        }
        *population = next;

        for &i in &fresh {
            self.absorb_coverage(ctx, &population[i], targets);
        }
        self.drop_covered(ctx);

        if ctx.archive.is_covered(target) {
            log::info!("LIPS target {target} covered");
            self.next_target(ctx);
        } else if ctx.target_budget_exhausted() {
            log::debug!("LIPS target {target} exhausted its budget");
            self.attempted.push(target);
            self.next_target(ctx);
        }
        self.sort_for_target(ctx, population);
    }

    /// Pushes the uncovered children of every target `individual` covers to
    /// the front of the worklist.
    fn absorb_coverage<C, P, F>(
        &mut self,
        ctx: &SearchContext<C, P, F>,
        individual: &Individual<C>,
        targets: &dyn TargetGraph,
    ) where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        for o in 0..ctx.num_objectives {
            let objective = ObjectiveId(o);
            if ctx.fitness.covers(objective, individual.fitness(objective)) {
                for child in targets.children(objective) {
                    self.enqueue_front(ctx, child);
                }
            }
        }
    }

    /// Removes collaterally covered targets from the worklist and the
    /// parked list.
    fn drop_covered<C, P, F>(&mut self, ctx: &SearchContext<C, P, F>)
    where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        self.worklist.retain(|&t| !ctx.archive.is_covered(t));
        self.attempted.retain(|&t| !ctx.archive.is_covered(t));
    }

    fn is_known(&self, target: ObjectiveId) -> bool {
        self.current == Some(target) || self.worklist.contains(&target) || self.attempted.contains(&target)
    }

    fn enqueue_back<C, P, F>(&mut self, ctx: &SearchContext<C, P, F>, target: ObjectiveId)
    where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        if target.index() < ctx.num_objectives && !ctx.archive.is_covered(target) && !self.is_known(target) {
            self.worklist.push_back(target);
        }
    }

    fn enqueue_front<C, P, F>(&mut self, ctx: &SearchContext<C, P, F>, target: ObjectiveId)
    where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        if target.index() < ctx.num_objectives && !ctx.archive.is_covered(target) && !self.is_known(target) {
            self.worklist.push_front(target);
        }
    }

    /// Takes the target at the back of the worklist: the last root enqueued,
    /// ahead of any children pushed to the front. Refills the worklist from
    /// the parked targets when it runs dry.
    fn next_target<C, P, F>(&mut self, ctx: &mut SearchContext<C, P, F>)
    where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        self.current = None;
        if self.worklist.is_empty() {
            self.worklist.extend(self.attempted.drain(..));
        }
        self.current = self.worklist.pop_back();
        match self.current {
            Some(target) => {
                ctx.reallocate_target(self.attempted.len());
                log::debug!("LIPS switching to target {target} ({} queued)", self.worklist.len());
            }
            None => log::info!("LIPS worklist empty"),
        }
    }

    fn sort_for_target<C, P, F>(&self, ctx: &SearchContext<C, P, F>, population: &mut [Individual<C>])
    where
        C: Candidate,
        P: CandidateFactory<C>,
        F: FitnessProvider<C>,
    {
        let Some(target) = self.current else {
            ctx.sort_population(population);
            return;
        };
        let direction = ctx.direction;
        population.sort_by(|a, b| {
            direction
                .compare(a.fitness(target), b.fitness(target))
                .then_with(|| a.size().cmp(&b.size()))
        });
    }
}
