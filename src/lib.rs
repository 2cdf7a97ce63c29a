//! Domain-agnostic evolutionary search core.
//!
//! Provides one population engine driving a family of evolutionary
//! strategies over opaque, user-defined candidates:
//!
//! - **Single objective**: generational GA, steady-state GA, cellular GA,
//!   differential evolution and chemical reaction optimization.
//! - **Multi objective**: NSGA-II (non-dominated sorting, crowding distance)
//!   and SPEA2 (strength, density, archive truncation).
//! - **Many targets**: LIPS (one target at a time from a worklist) and MIO
//!   (per-target populations with an exploitation shift).
//!
//! Around the strategies sit the pieces a search-based tool needs: a goal
//! archive keeping the best individual per target, a global budget with
//! per-target allotments, stopping conditions, adaptive local search,
//! listeners and versioned snapshots.
//!
//! # Architecture
//!
//! The crate contains no domain concepts. The host implements
//! [`candidate::Candidate`] (mutation, crossover, size),
//! [`candidate::CandidateFactory`] and [`fitness::FitnessProvider`]; the
//! [`engine::PopulationEngine`] owns everything else.

pub mod archive;
pub mod budget;
pub mod candidate;
pub mod clock;
pub mod engine;
pub mod error;
pub mod fitness;
pub mod listener;
pub mod local_search;
pub mod ranking;
pub mod snapshot;

pub use candidate::{Candidate, CandidateFactory, Individual, ObjectiveId};
pub use engine::{EngineConfig, PopulationEngine, SearchResult, Strategy};
pub use error::SearchError;
pub use fitness::FitnessProvider;

#[cfg(test)]
pub(crate) mod test_support {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde::{Deserialize, Serialize};

    use crate::candidate::{Candidate, CandidateFactory, ConstructionFailed, ObjectiveId};
    use crate::fitness::FitnessProvider;

    pub(crate) fn create_rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    /// Fixed-length bit string: single-bit flip, one-point crossover.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub(crate) struct BitString {
        pub bits: Vec<bool>,
    }

    impl BitString {
        pub(crate) fn zeros(len: usize) -> Self {
            Self {
                bits: vec![false; len],
            }
        }

        fn ones(&self) -> usize {
            self.bits.iter().filter(|&&b| b).count()
        }
    }

    impl Candidate for BitString {
        fn mutate<R: Rng>(&mut self, rng: &mut R) -> bool {
            if self.bits.is_empty() {
                return false;
            }
            let i = rng.random_range(0..self.bits.len());
            self.bits[i] = !self.bits[i];
            true
        }

        fn crossover<R: Rng>(&mut self, other: &mut Self, rng: &mut R) -> Result<(), ConstructionFailed> {
            if self.bits.len() != other.bits.len() {
                return Err(ConstructionFailed::new("bit strings differ in length"));
            }
            if self.bits.len() < 2 {
                return Ok(());
            }
            let cut = rng.random_range(1..self.bits.len());
            for i in cut..self.bits.len() {
                std::mem::swap(&mut self.bits[i], &mut other.bits[i]);
            }
            Ok(())
        }

        fn size(&self) -> usize {
            self.bits.len()
        }
    }

    pub(crate) struct BitFactory {
        len: usize,
    }

    impl BitFactory {
        pub(crate) fn new(len: usize) -> Self {
            Self { len }
        }
    }

    impl CandidateFactory<BitString> for BitFactory {
        fn new_candidate<R: Rng>(&self, rng: &mut R) -> BitString {
            BitString {
                bits: (0..self.len).map(|_| rng.random_bool(0.5)).collect(),
            }
        }
    }

    /// Number of zero bits, minimized.
    pub(crate) struct OneMax;

    impl FitnessProvider<BitString> for OneMax {
        fn num_objectives(&self) -> usize {
            1
        }

        fn evaluate(&self, candidate: &BitString, _objective: ObjectiveId) -> f64 {
            (candidate.bits.len() - candidate.ones()) as f64
        }
    }

    /// Number of one bits, maximized.
    pub(crate) struct OnesMax;

    impl FitnessProvider<BitString> for OnesMax {
        fn num_objectives(&self) -> usize {
            1
        }

        fn evaluate(&self, candidate: &BitString, _objective: ObjectiveId) -> f64 {
            candidate.ones() as f64
        }

        fn is_maximizing(&self, _objective: ObjectiveId) -> bool {
            true
        }
    }

    /// One target per bit: covered when the bit is set.
    pub(crate) struct BitTargets {
        len: usize,
    }

    impl BitTargets {
        pub(crate) fn new(len: usize) -> Self {
            Self { len }
        }
    }

    impl FitnessProvider<BitString> for BitTargets {
        fn num_objectives(&self) -> usize {
            self.len
        }

        fn evaluate(&self, candidate: &BitString, objective: ObjectiveId) -> f64 {
            match candidate.bits.get(objective.index()) {
                Some(true) => 0.0,
                _ => 1.0,
            }
        }
    }

    /// Two conflicting objectives: the number of ones and the number of
    /// zeros. Every bit string lies on the Pareto front.
    pub(crate) struct OnesAndZeros;

    impl FitnessProvider<BitString> for OnesAndZeros {
        fn num_objectives(&self) -> usize {
            2
        }

        fn evaluate(&self, candidate: &BitString, objective: ObjectiveId) -> f64 {
            let ones = candidate.ones();
            match objective.index() {
                0 => ones as f64,
                _ => (candidate.bits.len() - ones) as f64,
            }
        }
    }
}
