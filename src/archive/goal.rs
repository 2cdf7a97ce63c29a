//! Goal archive: at most one best solution per target.

use std::collections::{BTreeMap, BTreeSet};

use crate::candidate::{Candidate, Individual, ObjectiveId};
use crate::fitness::Direction;

/// One archived target.
#[derive(Debug, Clone)]
pub struct ArchiveEntry<C> {
    /// Best individual seen for this target.
    pub individual: Individual<C>,
    /// Its fitness for this target at recording time.
    pub fitness: f64,
    /// Whether the target counts as covered.
    pub covered: bool,
}

/// Maps each target to the best individual seen for it.
///
/// An entry is replaced only by a strictly better value; equal fitness keeps
/// the incumbent unless [`prefer_smaller`](Self::with_prefer_smaller) is set
/// and the challenger is strictly smaller. A covered target is never
/// replaced by an uncovered one, so the covered count never decreases.
#[derive(Debug, Clone)]
pub struct GoalArchive<C> {
    entries: BTreeMap<ObjectiveId, ArchiveEntry<C>>,
    direction: Direction,
    prefer_smaller: bool,
    covered: usize,
}

impl<C: Candidate> GoalArchive<C> {
    /// Creates an empty archive.
    pub fn new(direction: Direction) -> Self {
        Self {
            entries: BTreeMap::new(),
            direction,
            prefer_smaller: false,
            covered: 0,
        }
    }

    /// Breaks fitness ties in favour of the smaller candidate.
    pub fn with_prefer_smaller(mut self, prefer_smaller: bool) -> Self {
        self.prefer_smaller = prefer_smaller;
        self
    }

    /// Records `individual` for `target` if it improves on the incumbent.
    ///
    /// Returns `true` if the archive changed.
    pub fn record_if_improved(
        &mut self,
        target: ObjectiveId,
        individual: &Individual<C>,
        fitness: f64,
        covered: bool,
    ) -> bool {
        let before = self.covered;
        let replaced = match self.entries.get(&target) {
            None => true,
            Some(entry) => {
                if entry.covered && !covered {
                    false
                } else if self.direction.is_better(fitness, entry.fitness) {
                    true
                } else {
                    self.prefer_smaller
                        && self.direction.compare(fitness, entry.fitness).is_eq()
                        && individual.size() < entry.individual.size()
                }
            }
        };
        if !replaced {
            return false;
        }

        let was_covered = self.entries.get(&target).is_some_and(|e| e.covered);
        if covered && !was_covered {
            self.covered += 1;
            log::debug!("target {target} covered (fitness {fitness})");
        }
        self.entries.insert(
            target,
            ArchiveEntry {
                individual: individual.clone(),
                fitness,
                covered,
            },
        );
        assert!(
            self.covered >= before,
            "archive lost a covered target ({before} -> {})",
            self.covered
        );
        true
    }

    /// Whether `target` has a covering solution.
    pub fn is_covered(&self, target: ObjectiveId) -> bool {
        self.entries.get(&target).is_some_and(|e| e.covered)
    }

    /// Number of covered targets.
    pub fn covered_count(&self) -> usize {
        self.covered
    }

    /// Number of targets with any entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for one target.
    pub fn get(&self, target: ObjectiveId) -> Option<&ArchiveEntry<C>> {
        self.entries.get(&target)
    }

    /// Best fitness recorded for `target`.
    pub fn fitness(&self, target: ObjectiveId) -> Option<f64> {
        self.entries.get(&target).map(|e| e.fitness)
    }

    /// All entries in target order.
    pub fn entries(&self) -> impl Iterator<Item = (ObjectiveId, &ArchiveEntry<C>)> {
        self.entries.iter().map(|(&t, e)| (t, e))
    }

    /// Distinct archived individuals (one individual may cover several
    /// targets), in target order of first appearance.
    pub fn solutions(&self) -> Vec<&Individual<C>> {
        let mut seen = BTreeSet::new();
        self.entries
            .values()
            .filter(|e| seen.insert(e.individual.id()))
            .map(|e| &e.individual)
            .collect()
    }

    /// Distinct individuals that cover at least one target.
    pub fn covering_solutions(&self) -> Vec<&Individual<C>> {
        let mut seen = BTreeSet::new();
        self.entries
            .values()
            .filter(|e| e.covered && seen.insert(e.individual.id()))
            .map(|e| &e.individual)
            .collect()
    }

    /// Re-inserts an entry from a snapshot.
    pub(crate) fn restore_entry(&mut self, target: ObjectiveId, entry: ArchiveEntry<C>) {
        if entry.covered && !self.is_covered(target) {
            self.covered += 1;
        } else if !entry.covered && self.is_covered(target) {
            self.covered -= 1;
        }
        self.entries.insert(target, entry);
    }
}
