//! Target archives.
//!
//! - [`GoalArchive`]: one best individual per target, replaced only on
//!   strict improvement. Every strategy records into it at evaluation time.
//! - [`MioArchive`]: bounded per-target populations used by the MIO
//!   strategy to pick parents.

mod goal;
mod mio;

pub use goal::{ArchiveEntry, GoalArchive};
pub use mio::MioArchive;
