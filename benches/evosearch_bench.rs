//! Criterion benchmarks for u-evosearch.
//!
//! Uses synthetic problems (Sphere function, random objective vectors) to
//! measure engine and ranking overhead independent of any domain.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use u_evosearch::candidate::{Candidate, CandidateFactory, ConstructionFailed, ObjectiveId};
use u_evosearch::engine::{EngineConfig, PopulationEngine, Strategy};
use u_evosearch::fitness::FitnessProvider;
use u_evosearch::ranking::{environmental_select, non_dominated_sort};

// ===========================================================================
// Sphere function: minimize sum(x_i^2)
// ===========================================================================

#[derive(Clone)]
struct Genes(Vec<f64>);

impl Candidate for Genes {
    fn mutate<R: Rng>(&mut self, rng: &mut R) -> bool {
        let i = rng.random_range(0..self.0.len());
        self.0[i] += rng.random_range(-0.5..0.5);
        true
    }

    fn crossover<R: Rng>(&mut self, other: &mut Self, rng: &mut R) -> Result<(), ConstructionFailed> {
        let point = rng.random_range(0..self.0.len());
        for i in point..self.0.len() {
            std::mem::swap(&mut self.0[i], &mut other.0[i]);
        }
        Ok(())
    }

    fn size(&self) -> usize {
        self.0.len()
    }
}

struct SphereFactory {
    dim: usize,
}

impl CandidateFactory<Genes> for SphereFactory {
    fn new_candidate<R: Rng>(&self, rng: &mut R) -> Genes {
        Genes((0..self.dim).map(|_| rng.random_range(-5.0..5.0)).collect())
    }
}

struct Sphere;

impl FitnessProvider<Genes> for Sphere {
    fn num_objectives(&self) -> usize {
        1
    }

    fn evaluate(&self, candidate: &Genes, _objective: ObjectiveId) -> f64 {
        candidate.0.iter().map(|x| x * x).sum()
    }
}

fn random_objectives(n: usize, m: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..m).map(|_| rng.random_range(0.0..1.0)).collect())
        .collect()
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_strategies_sphere(c: &mut Criterion) {
    let mut group = c.benchmark_group("sphere");
    group.sample_size(10);

    let strategies = [
        Strategy::Generational,
        Strategy::SteadyState,
        Strategy::Differential(Default::default()),
    ];
    for strategy in strategies {
        for (dim, pop, gen) in [(10usize, 50usize, 50u64), (50, 100, 20)] {
            let config = EngineConfig::default()
                .with_strategy(strategy)
                .with_population_size(pop)
                .with_max_generations(gen)
                .with_seed(42);
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), format!("d{dim}_p{pop}_g{gen}")),
                &config,
                |b, config| {
                    b.iter(|| {
                        let mut engine =
                            PopulationEngine::new(SphereFactory { dim }, Sphere, black_box(config.clone()))
                                .expect("valid config");
                        black_box(engine.run().expect("run completes"))
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_non_dominated_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("non_dominated_sort");
    group.sample_size(20);

    for &n in &[100usize, 400] {
        let objectives = random_objectives(n, 3, 7);
        group.bench_with_input(BenchmarkId::from_parameter(n), &objectives, |b, objs| {
            b.iter(|| black_box(non_dominated_sort(black_box(objs))))
        });
    }
    group.finish();
}

fn bench_environmental_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("spea2_environmental_select");
    group.sample_size(20);

    for &n in &[100usize, 200] {
        let objectives = random_objectives(2 * n, 2, 11);
        group.bench_with_input(BenchmarkId::from_parameter(n), &objectives, |b, objs| {
            b.iter(|| black_box(environmental_select(black_box(objs), n)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_strategies_sphere,
    bench_non_dominated_sort,
    bench_environmental_select
);
criterion_main!(benches);
