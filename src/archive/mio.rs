//! MIO archive: a small bounded population per target.
//!
//! Each target keeps up to `capacity` individuals scored by a heuristic
//! `h ∈ [0, 1]` (see [`normalized_heuristic`](crate::fitness::normalized_heuristic)).
//! A score of `0` is never stored. A score of `1` covers the target, after
//! which its population collapses to the single best covering individual.
//! Sampling picks the target with the lowest sample counter, preferring
//! uncovered targets, and the counter resets whenever the target's
//! population improves.
//!
//! # References
//!
//! - Arcuri (2017), "Many Independent Objective (MIO) Algorithm for Test
//!   Suite Generation"

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::candidate::{Candidate, Individual, ObjectiveId};

#[derive(Debug, Clone)]
struct TargetPopulation<C> {
    capacity: usize,
    counter: usize,
    /// Sorted by `h` descending.
    members: Vec<(f64, Individual<C>)>,
}

impl<C: Candidate> TargetPopulation<C> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            counter: 0,
            members: Vec::with_capacity(capacity),
        }
    }

    fn is_covered(&self) -> bool {
        self.capacity == 1 && self.members.len() == 1 && self.members[0].0 >= 1.0
    }

    /// `true` if `(h, candidate)` should replace `(h_cur, current)`.
    fn beats(h: f64, candidate: &Individual<C>, h_cur: f64, current: &Individual<C>) -> bool {
        if h != h_cur {
            return h > h_cur;
        }
        candidate.size() < current.size()
    }

    fn add(&mut self, h: f64, individual: &Individual<C>) -> bool {
        debug_assert!((0.0..=1.0).contains(&h), "heuristic out of range: {h}");
        if h <= 0.0 {
            return false;
        }
        if h < 1.0 && self.is_covered() {
            return false;
        }

        let added = if h >= 1.0 {
            if self.is_covered() {
                let (h_cur, current) = &self.members[0];
                if Self::beats(h, individual, *h_cur, current) {
                    self.members[0] = (h, individual.clone());
                    true
                } else {
                    false
                }
            } else {
                self.capacity = 1;
                self.members.clear();
                self.members.push((h, individual.clone()));
                true
            }
        } else if self.members.len() < self.capacity {
            self.members.push((h, individual.clone()));
            self.sort();
            true
        } else {
            self.sort();
            let last = self.members.len() - 1;
            let (h_worst, worst) = &self.members[last];
            if Self::beats(h, individual, *h_worst, worst) {
                self.members[last] = (h, individual.clone());
                self.sort();
                true
            } else {
                false
            }
        };

        debug_assert!(self.members.len() <= self.capacity);
        if added {
            self.counter = 0;
        }
        added
    }

    fn sort(&mut self) {
        self.members.sort_by(|a, b| b.0.total_cmp(&a.0));
    }

    fn shrink(&mut self, capacity: usize) {
        if self.is_covered() {
            return;
        }
        self.capacity = capacity;
        self.members.truncate(capacity);
    }
}

/// Per-target bounded populations for the MIO strategy.
#[derive(Debug, Clone)]
pub struct MioArchive<C> {
    populations: BTreeMap<ObjectiveId, TargetPopulation<C>>,
    capacity: usize,
}

impl<C: Candidate> MioArchive<C> {
    /// Creates an archive whose target populations hold up to `capacity`
    /// individuals.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "MIO target capacity must be positive");
        Self {
            populations: BTreeMap::new(),
            capacity,
        }
    }

    /// Current per-target capacity for uncovered targets.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Offers `individual` with heuristic score `h` for `target`.
    ///
    /// Returns `true` if the target's population changed.
    pub fn add(&mut self, target: ObjectiveId, h: f64, individual: &Individual<C>) -> bool {
        let capacity = self.capacity;
        let population = self
            .populations
            .entry(target)
            .or_insert_with(|| TargetPopulation::new(capacity));
        let was_covered = population.is_covered();
        let added = population.add(h, individual);
        if added && !was_covered && population.is_covered() {
            log::debug!("MIO target {target} covered");
        }
        added
    }

    /// Whether `target` is fully covered.
    pub fn is_covered(&self, target: ObjectiveId) -> bool {
        self.populations.get(&target).is_some_and(|p| p.is_covered())
    }

    /// Number of covered targets.
    pub fn covered_count(&self) -> usize {
        self.populations.values().filter(|p| p.is_covered()).count()
    }

    /// Number of individuals stored for `target`.
    pub fn population_len(&self, target: ObjectiveId) -> usize {
        self.populations.get(&target).map_or(0, |p| p.members.len())
    }

    /// Sample counter of `target`.
    pub fn counter(&self, target: ObjectiveId) -> usize {
        self.populations.get(&target).map_or(0, |p| p.counter)
    }

    /// Samples an individual for mutation.
    ///
    /// Chooses among targets holding at least one individual, preferring
    /// uncovered ones, the target with the lowest counter (first in target
    /// order on ties), increments its counter and returns a clone of a
    /// random member.
    pub fn sample<R: Rng>(&mut self, rng: &mut R) -> Option<Individual<C>> {
        let non_empty = || self.populations.iter().filter(|(_, p)| !p.members.is_empty());
        let pick = non_empty()
            .filter(|(_, p)| !p.is_covered())
            .min_by_key(|(_, p)| p.counter)
            .or_else(|| non_empty().min_by_key(|(_, p)| p.counter))
            .map(|(&t, _)| t)?;

        let population = self.populations.get_mut(&pick)?;
        population.counter += 1;
        let i = rng.random_range(0..population.members.len());
        Some(population.members[i].1.clone())
    }

    /// Shrinks every uncovered target population to `capacity`, keeping the
    /// best-scored members.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn shrink(&mut self, capacity: usize) {
        assert!(capacity > 0, "MIO target capacity must be positive");
        self.capacity = capacity;
        for population in self.populations.values_mut() {
            population.shrink(capacity);
        }
    }

    /// Distinct covering individuals in target order.
    pub fn solutions(&self) -> Vec<&Individual<C>> {
        let mut seen = BTreeSet::new();
        self.populations
            .values()
            .filter(|p| p.is_covered())
            .map(|p| &p.members[0].1)
            .filter(|ind| seen.insert(ind.id()))
            .collect()
    }
}
