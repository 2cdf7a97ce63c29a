//! Multi-objective ranking.
//!
//! - [`DominanceComparator`]: Pareto dominance under the run's direction
//! - [`non_dominated_sort`], [`crowding_distance`], [`select_by_fronts`]:
//!   NSGA-II ranking and environmental selection
//! - [`compute_strength`], [`environmental_select`]: SPEA2 strength,
//!   density and archive truncation
//!
//! The sorting and selection functions work on **minimizing** objective
//! vectors. Orient raw fitness values with
//! [`DominanceComparator::orient`] before passing them in.

mod dominance;
mod nsga;
mod spea;

pub use dominance::{dominance, Dominance, DominanceComparator};
pub use nsga::{
    crowding_distance, non_dominated_sort, select_by_fronts, FrontSelection,
    NondominatedSortResult,
};
pub use spea::{compute_strength, environmental_select, euclidean_distance, StrengthResult};
