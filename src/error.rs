//! Error types for the search engine.
//!
//! Only conditions the host can act on are represented here. Logic bugs
//! (population-size drift, regressing best fitness, a covered target being
//! lost, a negative energy buffer) are not errors: they panic.

use crate::engine::Phase;

/// Errors surfaced by the public API.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A configuration parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The candidate factory produced no individuals during initialization.
    #[error("initial population is empty: the factory could not create any candidate")]
    EmptyPopulation,

    /// The fitness provider declares zero objectives.
    #[error("fitness provider declares no objectives")]
    NoObjectives,

    /// Some objectives maximize while others minimize.
    #[error("all objectives must share one optimisation direction")]
    MixedObjectiveDirections,

    /// An operation was called in the wrong lifecycle phase.
    #[error("engine is in phase {found:?}, expected {expected}")]
    InvalidPhase {
        /// Human-readable description of the accepted phase(s).
        expected: &'static str,
        /// The phase the engine was in.
        found: Phase,
    },

    /// A snapshot was written by an incompatible version.
    #[error("snapshot version {found} is not supported (expected {expected})")]
    UnsupportedSnapshotVersion {
        /// Version found in the encoded snapshot.
        found: u32,
        /// Version this build reads and writes.
        expected: u32,
    },

    /// Snapshot encoding or decoding failed.
    #[error("snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}
