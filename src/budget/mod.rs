//! Search budget and stopping conditions.
//!
//! - [`BudgetController`]: global budget plus the per-target allotment used
//!   by target-focused strategies
//! - [`StoppingConditions`]: generation, evaluation, time and coverage
//!   limits, one per kind

mod controller;
mod stopping;

pub use controller::{BudgetController, BudgetSnapshot, BudgetUnit};
pub use stopping::{SearchCounters, StoppingCondition, StoppingConditions, StoppingKind};
