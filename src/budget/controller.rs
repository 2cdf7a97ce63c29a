//! Global search budget and per-target allotments.

use serde::{Deserialize, Serialize};

/// What a budget is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetUnit {
    /// Wall-clock milliseconds from the engine's [`Clock`](crate::clock::Clock).
    TimeMs,
    /// Fitness evaluations.
    Evaluations,
}

/// Tracks the global budget and the share allotted to the current target.
///
/// All `now` arguments are readings in the controller's unit (clock
/// milliseconds or the evaluation counter). The per-target allotment is
/// `remaining / max(1, total − covered − exhausted)`, recomputed at every
/// target switch, so live allotments never exceed what is left.
///
/// # Examples
///
/// ```
/// use u_evosearch::budget::{BudgetController, BudgetUnit};
///
/// let mut budget = BudgetController::new(BudgetUnit::TimeMs, 1000);
/// budget.start(0);
/// assert_eq!(budget.reallocate(0, 4, 0, 0), 250);
/// assert_eq!(budget.reallocate(0, 4, 1, 0), 333);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetController {
    unit: BudgetUnit,
    total: u64,
    started_at: u64,
    target_started_at: u64,
    target_allotment: u64,
}

/// Serializable budget position, relative to the start of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    /// Unit of all amounts.
    pub unit: BudgetUnit,
    /// Global budget.
    pub total: u64,
    /// Amount consumed so far.
    pub used: u64,
    /// Amount consumed on the current target.
    pub target_used: u64,
    /// Allotment of the current target.
    pub target_allotment: u64,
}

impl BudgetController {
    /// Creates a controller for a global budget of `total` units.
    pub fn new(unit: BudgetUnit, total: u64) -> Self {
        Self {
            unit,
            total,
            started_at: 0,
            target_started_at: 0,
            target_allotment: total,
        }
    }

    /// Unit of this budget.
    pub fn unit(&self) -> BudgetUnit {
        self.unit
    }

    /// Global budget.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Marks the start of the run.
    pub fn start(&mut self, now: u64) {
        self.started_at = now;
        self.target_started_at = now;
        self.target_allotment = self.total;
    }

    /// Amount consumed since [`start`](Self::start).
    pub fn used(&self, now: u64) -> u64 {
        now.saturating_sub(self.started_at)
    }

    /// Amount left of the global budget.
    pub fn remaining(&self, now: u64) -> u64 {
        self.total.saturating_sub(self.used(now))
    }

    /// Whether the global budget is spent.
    pub fn is_exhausted(&self, now: u64) -> bool {
        self.remaining(now) == 0
    }

    /// Fraction of the global budget consumed, in `[0, 1]`.
    pub fn progress(&self, now: u64) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.used(now) as f64 / self.total as f64).min(1.0)
    }

    /// Switches to a new target and computes its allotment.
    pub fn reallocate(&mut self, now: u64, total_targets: usize, covered: usize, exhausted: usize) -> u64 {
        let live = total_targets.saturating_sub(covered + exhausted).max(1) as u64;
        self.target_started_at = now;
        self.target_allotment = self.remaining(now) / live;
        log::debug!(
            "target budget: {} of {} remaining over {live} live targets",
            self.target_allotment,
            self.remaining(now)
        );
        self.target_allotment
    }

    /// Allotment of the current target.
    pub fn target_allotment(&self) -> u64 {
        self.target_allotment
    }

    /// Amount spent on the current target.
    pub fn target_used(&self, now: u64) -> u64 {
        now.saturating_sub(self.target_started_at)
    }

    /// Whether the current target used up its allotment.
    pub fn target_exhausted(&self, now: u64) -> bool {
        self.target_used(now) >= self.target_allotment
    }

    /// Captures the budget position at `now`.
    pub fn snapshot(&self, now: u64) -> BudgetSnapshot {
        BudgetSnapshot {
            unit: self.unit,
            total: self.total,
            used: self.used(now),
            target_used: self.target_used(now),
            target_allotment: self.target_allotment,
        }
    }

    /// Rebuilds a controller from a snapshot, continuing from `now`.
    pub fn restore(snapshot: &BudgetSnapshot, now: u64) -> Self {
        Self {
            unit: snapshot.unit,
            total: snapshot.total,
            started_at: now.saturating_sub(snapshot.used),
            target_started_at: now.saturating_sub(snapshot.target_used),
            target_allotment: snapshot.target_allotment,
        }
    }
}
