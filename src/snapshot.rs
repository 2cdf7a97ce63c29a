//! Versioned checkpoints of a running search.
//!
//! A [`Snapshot`] captures what is needed to continue a search later: the
//! population, the goal archive, the counters, the budget position and the
//! adaptive knobs. Encoding is JSON; [`Snapshot::decode`] rejects any
//! version other than [`SNAPSHOT_VERSION`].
//!
//! Strategy internals that can be derived from the population and the
//! archive (Pareto ranks, SPEA2 fitness, the LIPS worklist, MIO per-target
//! populations, MIO parameters) are not stored; they are rebuilt on
//! restore. Non-finite fitness values cannot be represented in JSON: such
//! individuals are stored unevaluated and re-evaluated on restore, and
//! archive entries with a non-finite value are dropped.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveEntry;
use crate::budget::BudgetSnapshot;
use crate::candidate::{Individual, ObjectiveId};
use crate::engine::ChemicalState;
use crate::error::SearchError;

/// Format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualSnapshot<C> {
    pub id: u64,
    pub candidate: C,
    /// `None` if the individual was unevaluated or had non-finite values.
    pub fitness: Option<Vec<f64>>,
    pub age: usize,
    pub kinetic_energy: f64,
    pub collisions: usize,
}

impl<C: Clone> IndividualSnapshot<C> {
    pub(crate) fn capture(individual: &Individual<C>) -> Self {
        let values = individual.fitness_values();
        let fitness = (!individual.is_changed() && values.iter().all(|v| v.is_finite()))
            .then(|| values.to_vec());
        Self {
            id: individual.id(),
            candidate: individual.candidate().clone(),
            fitness,
            age: individual.age(),
            kinetic_energy: individual.kinetic_energy(),
            collisions: individual.collisions(),
        }
    }

    pub(crate) fn into_individual(self, num_objectives: usize) -> Individual<C> {
        let mut individual = Individual::new(self.id, self.candidate, num_objectives);
        let fitness = self.fitness.filter(|values| values.len() == num_objectives);
        individual.restore_state(fitness, self.age, self.kinetic_energy, self.collisions);
        individual
    }
}

/// One goal-archive entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntrySnapshot<C> {
    pub target: ObjectiveId,
    pub individual: IndividualSnapshot<C>,
    pub fitness: f64,
    pub covered: bool,
}

impl<C: Clone> ArchiveEntrySnapshot<C> {
    pub(crate) fn capture(target: ObjectiveId, entry: &ArchiveEntry<C>) -> Option<Self> {
        entry.fitness.is_finite().then(|| Self {
            target,
            individual: IndividualSnapshot::capture(&entry.individual),
            fitness: entry.fitness,
            covered: entry.covered,
        })
    }

    pub(crate) fn into_entry(self, num_objectives: usize) -> ArchiveEntry<C> {
        ArchiveEntry {
            individual: self.individual.into_individual(num_objectives),
            fitness: self.fitness,
            covered: self.covered,
        }
    }
}

/// Checkpoint of a search.
///
/// # Examples
///
/// ```ignore
/// let bytes = engine.snapshot()?.encode()?;
/// let snapshot = Snapshot::decode(&bytes)?;
/// let resumed = PopulationEngine::restore(factory, fitness, config, snapshot)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<C> {
    /// Format version; always [`SNAPSHOT_VERSION`] when written.
    pub version: u32,
    /// [`Strategy::name`](crate::engine::Strategy::name) of the run.
    pub strategy: String,
    pub generation: usize,
    pub evaluations: u64,
    /// Next individual id to hand out.
    pub next_id: u64,
    /// Milliseconds elapsed in the run at capture time.
    pub elapsed_ms: u64,
    pub population: Vec<IndividualSnapshot<C>>,
    pub archive: Vec<ArchiveEntrySnapshot<C>>,
    pub budget: Option<BudgetSnapshot>,
    /// Local-search application probability.
    pub local_search_probability: f64,
    /// Energy bookkeeping of a chemical reaction run.
    pub chemical: Option<ChemicalState>,
}

impl<C: Serialize> Snapshot<C> {
    /// Encodes the snapshot as JSON.
    pub fn encode(&self) -> Result<Vec<u8>, SearchError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl<C: DeserializeOwned> Snapshot<C> {
    /// Decodes a snapshot, checking the format version first.
    pub fn decode(bytes: &[u8]) -> Result<Self, SearchError> {
        #[derive(Deserialize)]
        struct Header {
            version: u32,
        }

        let header: Header = serde_json::from_slice(bytes)?;
        if header.version != SNAPSHOT_VERSION {
            return Err(SearchError::UnsupportedSnapshotVersion {
                found: header.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BitString;

    fn sample() -> Snapshot<BitString> {
        let mut ind = Individual::new(4, BitString { bits: vec![true, false] }, 2);
        ind.set_fitness_values(vec![0.0, 1.0]);
        Snapshot {
            version: SNAPSHOT_VERSION,
            strategy: "generational".into(),
            generation: 3,
            evaluations: 40,
            next_id: 41,
            elapsed_ms: 120,
            population: vec![IndividualSnapshot::capture(&ind)],
            archive: vec![ArchiveEntrySnapshot {
                target: ObjectiveId(0),
                individual: IndividualSnapshot::capture(&ind),
                fitness: 0.0,
                covered: true,
            }],
            budget: None,
            local_search_probability: 0.5,
            chemical: None,
        }
    }

    #[test]
    fn test_encode_decode() {
        let snapshot = sample();
        let bytes = snapshot.encode().unwrap();
        let decoded: Snapshot<BitString> = Snapshot::decode(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_rejects_other_version() {
        let mut snapshot = sample();
        snapshot.version = 99;
        let bytes = snapshot.encode().unwrap();
        let err = Snapshot::<BitString>::decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            SearchError::UnsupportedSnapshotVersion {
                found: 99,
                expected: SNAPSHOT_VERSION
            }
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = Snapshot::<BitString>::decode(b"{not json").unwrap_err();
        assert!(matches!(err, SearchError::Snapshot(_)));
    }

    #[test]
    fn test_unevaluated_individual_has_no_fitness() {
        let ind = Individual::new(0, BitString::zeros(3), 1);
        let snap = IndividualSnapshot::capture(&ind);
        assert!(snap.fitness.is_none());
        let restored = snap.into_individual(1);
        assert!(restored.is_changed());
    }

    #[test]
    fn test_non_finite_fitness_is_dropped() {
        let mut ind = Individual::new(0, BitString::zeros(3), 1);
        ind.set_fitness_values(vec![f64::INFINITY]);
        assert!(IndividualSnapshot::capture(&ind).fitness.is_none());
    }
}
