//! Candidate contracts and the engine-side individual wrapper.
//!
//! The engine never looks inside a candidate. It only needs to clone,
//! mutate, recombine and measure it, which is what [`Candidate`] describes.
//! Everything the engine itself tracks about a candidate (fitness per
//! objective, age, the "changed since last evaluation" flag, rank, crowding
//! distance, SPEA2 fitness, kinetic energy, collisions) lives in
//! [`Individual`], which owns the candidate.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::fitness::Direction;

/// Identity of one objective (coverage target, goal, fitness function).
///
/// Objectives are numbered densely from `0` to
/// [`FitnessProvider::num_objectives`](crate::fitness::FitnessProvider::num_objectives)` - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectiveId(pub usize);

impl ObjectiveId {
    /// Returns the dense index of this objective.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A crossover or composite operator could not produce a valid offspring.
///
/// Recoverable: the engine retries with other parents or falls back to
/// copying the parents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("offspring construction failed: {reason}")]
pub struct ConstructionFailed {
    /// Operator-specific description.
    pub reason: String,
}

impl ConstructionFailed {
    /// Creates a failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A unit of search: test case, program variant, input.
///
/// # Implementing
///
/// ```ignore
/// #[derive(Clone)]
/// struct BitString(Vec<bool>);
///
/// impl Candidate for BitString {
///     fn mutate<R: Rng>(&mut self, rng: &mut R) -> bool {
///         let i = rng.random_range(0..self.0.len());
///         self.0[i] = !self.0[i];
///         true
///     }
///     fn size(&self) -> usize { self.0.len() }
/// }
/// ```
pub trait Candidate: Clone {
    /// Perturbs the candidate in place. Returns `true` if anything changed.
    fn mutate<R: Rng>(&mut self, rng: &mut R) -> bool;

    /// Recombines `self` with `other`, modifying both in place.
    ///
    /// The default implementation leaves both parents untouched.
    fn crossover<R: Rng>(
        &mut self,
        _other: &mut Self,
        _rng: &mut R,
    ) -> Result<(), ConstructionFailed> {
        Ok(())
    }

    /// Size of the representation, used by bloat control and as the
    /// secondary tie-break when fitness is equal (smaller is better).
    fn size(&self) -> usize {
        1
    }

    /// Builds a differential-evolution donor into `self` from a base
    /// candidate and two difference candidates, scaled by `weight`.
    ///
    /// Vector-encoded candidates should override this with the classic
    /// `base + weight * (a - b)`. The default works on opaque candidates: it
    /// copies `base`, recombines it with `a`, recombines with `b` with
    /// probability `weight`, then mutates.
    fn differential<R: Rng>(
        &mut self,
        base: &Self,
        a: &Self,
        b: &Self,
        weight: f64,
        rng: &mut R,
    ) -> Result<(), ConstructionFailed> {
        *self = base.clone();
        let mut donor_a = a.clone();
        self.crossover(&mut donor_a, rng)?;
        if rng.random_range(0.0..1.0) < weight {
            let mut donor_b = b.clone();
            self.crossover(&mut donor_b, rng)?;
        }
        self.mutate(rng);
        Ok(())
    }
}

/// Creates fresh random candidates.
pub trait CandidateFactory<C> {
    /// Returns a new random candidate.
    fn new_candidate<R: Rng>(&self, rng: &mut R) -> C;
}

/// Rejects candidates whose representation grew too large.
pub trait BloatControl<C> {
    /// Returns `true` if the candidate must not enter the population.
    fn is_too_large(&self, candidate: &C) -> bool;
}

impl<C, F> BloatControl<C> for F
where
    F: Fn(&C) -> bool,
{
    fn is_too_large(&self, candidate: &C) -> bool {
        self(candidate)
    }
}

/// Bloat control on [`Candidate::size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxSizeBloatControl {
    /// Largest accepted size (inclusive).
    pub max_size: usize,
}

impl<C: Candidate> BloatControl<C> for MaxSizeBloatControl {
    fn is_too_large(&self, candidate: &C) -> bool {
        candidate.size() > self.max_size
    }
}

/// A candidate plus everything the engine tracks about it.
///
/// Fitness values are only meaningful while [`is_changed`](Self::is_changed)
/// is `false`; any mutable access to the candidate sets the flag.
#[derive(Debug, Clone)]
pub struct Individual<C> {
    id: u64,
    candidate: C,
    fitness: Vec<f64>,
    aggregate: f64,
    changed: bool,
    age: usize,
    pub(crate) rank: usize,
    pub(crate) crowding_distance: f64,
    pub(crate) spea_fitness: f64,
    pub(crate) kinetic_energy: f64,
    pub(crate) collisions: usize,
}

impl<C> Individual<C> {
    /// Wraps a freshly created candidate. It is marked as changed
    /// (not yet evaluated).
    pub fn new(id: u64, candidate: C, num_objectives: usize) -> Self {
        Self {
            id,
            candidate,
            fitness: vec![f64::NAN; num_objectives],
            aggregate: f64::NAN,
            changed: true,
            age: 0,
            rank: 0,
            crowding_distance: 0.0,
            spea_fitness: 0.0,
            kinetic_energy: 0.0,
            collisions: 0,
        }
    }

    /// Engine-assigned identity. Clones made by the engine for offspring get
    /// fresh ids; the archive uses ids to deduplicate solutions.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    /// Read-only access to the wrapped candidate.
    pub fn candidate(&self) -> &C {
        &self.candidate
    }

    /// Mutable access to the wrapped candidate. Invalidates fitness.
    pub fn candidate_mut(&mut self) -> &mut C {
        self.changed = true;
        &mut self.candidate
    }

    /// Mutable access that leaves the changed flag to the caller.
    pub(crate) fn candidate_raw_mut(&mut self) -> &mut C {
        &mut self.candidate
    }

    /// Consumes the wrapper and returns the candidate.
    pub fn into_candidate(self) -> C {
        self.candidate
    }

    /// Fitness for one objective.
    ///
    /// # Panics
    /// Panics if `objective` is out of range.
    pub fn fitness(&self, objective: ObjectiveId) -> f64 {
        self.fitness[objective.index()]
    }

    /// All fitness values, indexed by objective.
    pub fn fitness_values(&self) -> &[f64] {
        &self.fitness
    }

    /// Sum of all objective values; the scalar used by single-objective
    /// strategies.
    pub fn aggregate_fitness(&self) -> f64 {
        self.aggregate
    }

    /// Whether the candidate changed since it was last evaluated.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Generation in which the candidate last changed.
    pub fn age(&self) -> usize {
        self.age
    }

    pub(crate) fn set_age(&mut self, generation: usize) {
        self.age = generation;
    }

    /// Pareto rank assigned by the last non-dominated sort (0 = best front).
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Crowding distance within its front.
    pub fn crowding_distance(&self) -> f64 {
        self.crowding_distance
    }

    /// SPEA2 total fitness (raw fitness + density). Below `1.0` means
    /// non-dominated.
    pub fn spea_fitness(&self) -> f64 {
        self.spea_fitness
    }

    /// Kinetic energy (chemical reaction optimization only).
    pub fn kinetic_energy(&self) -> f64 {
        self.kinetic_energy
    }

    /// Number of ineffective collisions since the last decomposition or
    /// synthesis (chemical reaction optimization only).
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Stores freshly computed fitness values and clears the changed flag.
    pub(crate) fn set_fitness_values(&mut self, values: Vec<f64>) {
        self.aggregate = values.iter().sum();
        self.fitness = values;
        self.changed = false;
    }

    /// Restores evaluated state from a snapshot.
    pub(crate) fn restore_state(
        &mut self,
        fitness: Option<Vec<f64>>,
        age: usize,
        kinetic_energy: f64,
        collisions: usize,
    ) {
        if let Some(values) = fitness {
            self.set_fitness_values(values);
        }
        self.age = age;
        self.kinetic_energy = kinetic_energy;
        self.collisions = collisions;
    }
}

impl<C: Candidate> Individual<C> {
    /// Orders two evaluated individuals so that the better one comes first.
    ///
    /// Aggregate fitness decides; equal fitness falls back to the smaller
    /// [`Candidate::size`].
    pub fn compare_by_fitness(&self, other: &Self, direction: Direction) -> Ordering {
        direction
            .compare(self.aggregate, other.aggregate)
            .then_with(|| self.candidate.size().cmp(&other.candidate.size()))
    }

    /// Size of the wrapped candidate.
    pub fn size(&self) -> usize {
        self.candidate.size()
    }
}

// ============================================================================
// Tests
// ============================================================================
