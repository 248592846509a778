//! Benchmarks for the genetic architecture searcher.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use gnas::{
    compute::{
        GeneticAlgorithmSearcher, SearchSpace, SyntheticEvaluator,
        evolution::{evaluate_generation, evaluate_generation_parallel},
    },
    schema::{CrossoverType, DropPathControl, GeneticConfig, SearchSpaceType},
};

fn searcher(population_size: usize, generation_size: usize) -> GeneticAlgorithmSearcher {
    let space = SearchSpace::enas_cnn(5, DropPathControl::default(), SearchSpaceType::DualCell)
        .expect("valid space");
    let config = GeneticConfig {
        population_size,
        generation_size,
        keep_size: generation_size / 4,
        random_seed: Some(42),
        ..Default::default()
    };
    GeneticAlgorithmSearcher::new(space, config).expect("valid config")
}

fn bench_update_population(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_population");
    let evaluator = SyntheticEvaluator::new(0, 0.01);

    for population_size in [60, 200, 1000, 5000] {
        let mut ga = searcher(population_size, 20);

        group.bench_with_input(
            BenchmarkId::from_parameter(population_size),
            &population_size,
            |b, _| {
                b.iter(|| {
                    evaluate_generation(&mut ga, &evaluator);
                    black_box(ga.update_population());
                });
            },
        );
    }

    group.finish();
}

fn bench_parallel_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_generation");
    let evaluator = SyntheticEvaluator::new(0, 0.01);

    for generation_size in [20, 100, 500] {
        let mut ga = searcher(generation_size * 4, generation_size);

        group.bench_with_input(
            BenchmarkId::new("sequential", generation_size),
            &generation_size,
            |b, _| {
                b.iter(|| black_box(evaluate_generation(&mut ga, &evaluator)));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("parallel", generation_size),
            &generation_size,
            |b, _| {
                b.iter(|| black_box(evaluate_generation_parallel(&mut ga, &evaluator)));
            },
        );
    }

    group.finish();
}

fn bench_operators(c: &mut Criterion) {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    let space = SearchSpace::enas_cnn(5, DropPathControl::default(), SearchSpaceType::TripleCell)
        .expect("valid space");
    let mut rng = StdRng::seed_from_u64(7);
    let a = space.sample_architecture(&mut rng);
    let b = space.sample_architecture(&mut rng);
    let rate = space.default_mutation_p();

    c.bench_function("sample_architecture", |bench| {
        bench.iter(|| black_box(space.sample_architecture(&mut rng)));
    });
    c.bench_function("mutate", |bench| {
        bench.iter(|| black_box(space.mutate(&a, rate, &mut rng)));
    });
    c.bench_function("crossover", |bench| {
        bench.iter(|| black_box(space.crossover(&a, &b, CrossoverType::Uniform, &mut rng)));
    });
}

criterion_group!(
    benches,
    bench_update_population,
    bench_parallel_evaluation,
    bench_operators
);
criterion_main!(benches);
