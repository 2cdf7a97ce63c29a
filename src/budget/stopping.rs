//! Stopping conditions.

use serde::{Deserialize, Serialize};

/// Kind of a stopping condition. At most one condition per kind is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoppingKind {
    /// Number of completed generations.
    MaxGenerations,
    /// Number of fitness evaluations.
    MaxEvaluations,
    /// Elapsed milliseconds since the search started.
    MaxTimeMs,
    /// Number of covered targets.
    FullCoverage,
}

/// Counters the stopping conditions are checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchCounters {
    /// Completed generations.
    pub generation: u64,
    /// Fitness evaluations so far.
    pub evaluations: u64,
    /// Milliseconds since the search started.
    pub elapsed_ms: u64,
    /// Covered targets.
    pub covered: u64,
}

/// A `(current value, limit)` pair; the search ends once the current value
/// reaches the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoppingCondition {
    /// What is measured.
    pub kind: StoppingKind,
    /// Value at which the search stops.
    pub limit: u64,
}

impl StoppingCondition {
    /// Stop after `n` generations.
    pub fn max_generations(n: u64) -> Self {
        Self {
            kind: StoppingKind::MaxGenerations,
            limit: n,
        }
    }

    /// Stop after `n` fitness evaluations.
    pub fn max_evaluations(n: u64) -> Self {
        Self {
            kind: StoppingKind::MaxEvaluations,
            limit: n,
        }
    }

    /// Stop after `ms` milliseconds.
    pub fn max_time_ms(ms: u64) -> Self {
        Self {
            kind: StoppingKind::MaxTimeMs,
            limit: ms,
        }
    }

    /// Stop once `targets` targets are covered.
    pub fn full_coverage(targets: u64) -> Self {
        Self {
            kind: StoppingKind::FullCoverage,
            limit: targets,
        }
    }

    /// Current value of the measured quantity.
    pub fn current(&self, counters: &SearchCounters) -> u64 {
        match self.kind {
            StoppingKind::MaxGenerations => counters.generation,
            StoppingKind::MaxEvaluations => counters.evaluations,
            StoppingKind::MaxTimeMs => counters.elapsed_ms,
            StoppingKind::FullCoverage => counters.covered,
        }
    }

    /// Whether the limit is reached.
    pub fn is_reached(&self, counters: &SearchCounters) -> bool {
        self.current(counters) >= self.limit
    }

    /// Fraction of the limit reached, in `[0, 1]`.
    pub fn fraction(&self, counters: &SearchCounters) -> f64 {
        if self.limit == 0 {
            return 1.0;
        }
        (self.current(counters) as f64 / self.limit as f64).min(1.0)
    }
}

/// Active stopping conditions, one per kind, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoppingConditions {
    conditions: Vec<StoppingCondition>,
}

impl StoppingConditions {
    /// Creates an empty set (never finishes on its own).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition. Returns `false` and keeps the existing one if a
    /// condition of the same kind is already active.
    pub fn add(&mut self, condition: StoppingCondition) -> bool {
        if self.contains(condition.kind) {
            return false;
        }
        self.conditions.push(condition);
        true
    }

    /// Removes the condition of `kind`. Returns `true` if one was active.
    pub fn remove(&mut self, kind: StoppingKind) -> bool {
        let before = self.conditions.len();
        self.conditions.retain(|c| c.kind != kind);
        self.conditions.len() != before
    }

    /// Whether a condition of `kind` is active.
    pub fn contains(&self, kind: StoppingKind) -> bool {
        self.conditions.iter().any(|c| c.kind == kind)
    }

    /// The active condition of `kind`.
    pub fn get(&self, kind: StoppingKind) -> Option<&StoppingCondition> {
        self.conditions.iter().find(|c| c.kind == kind)
    }

    /// Active conditions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StoppingCondition> {
        self.conditions.iter()
    }

    /// Number of active conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether no condition is active.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether any condition is reached.
    pub fn is_finished(&self, counters: &SearchCounters) -> bool {
        self.conditions.iter().any(|c| c.is_reached(counters))
    }

    /// Progress of the most advanced condition, in `[0, 1]`. `0.0` if none
    /// is active.
    pub fn progress(&self, counters: &SearchCounters) -> f64 {
        self.conditions
            .iter()
            .map(|c| c.fraction(counters))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(generation: u64, evaluations: u64) -> SearchCounters {
        SearchCounters {
            generation,
            evaluations,
            ..SearchCounters::default()
        }
    }

    #[test]
    fn test_dedup_by_kind() {
        let mut set = StoppingConditions::new();
        assert!(set.add(StoppingCondition::max_generations(10)));
        assert!(!set.add(StoppingCondition::max_generations(99)));
        assert!(set.add(StoppingCondition::max_evaluations(100)));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(StoppingKind::MaxGenerations).map(|c| c.limit), Some(10));
    }

    #[test]
    fn test_insertion_order_and_remove() {
        let mut set = StoppingConditions::new();
        set.add(StoppingCondition::max_time_ms(5));
        set.add(StoppingCondition::max_generations(5));
        let kinds: Vec<_> = set.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![StoppingKind::MaxTimeMs, StoppingKind::MaxGenerations]);
        assert!(set.remove(StoppingKind::MaxTimeMs));
        assert!(!set.remove(StoppingKind::MaxTimeMs));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_finished_when_any_reached() {
        let mut set = StoppingConditions::new();
        set.add(StoppingCondition::max_generations(10));
        set.add(StoppingCondition::max_evaluations(100));
        assert!(!set.is_finished(&counters(9, 99)));
        assert!(set.is_finished(&counters(3, 100)));
        assert!(set.is_finished(&counters(10, 0)));
    }

    #[test]
    fn test_progress_is_most_advanced() {
        let mut set = StoppingConditions::new();
        assert!(set.progress(&counters(5, 5)).abs() < 1e-12);
        set.add(StoppingCondition::max_generations(10));
        set.add(StoppingCondition::max_evaluations(100));
        assert!((set.progress(&counters(2, 60)) - 0.6).abs() < 1e-12);
        assert!((set.progress(&counters(20, 60)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_full_coverage() {
        let cond = StoppingCondition::full_coverage(3);
        let mut c = SearchCounters::default();
        c.covered = 2;
        assert!(!cond.is_reached(&c));
        c.covered = 3;
        assert!(cond.is_reached(&c));
    }
}
