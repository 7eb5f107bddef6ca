use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use markov_value::mdp::{
    exact_evaluate, iterative_evaluate, simulate, EvaluationConfig, MarkovRewardProcess,
    RewardWalk, SimulationConfig,
};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn random_mrp(n: usize, seed: u64) -> MarkovRewardProcess {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut p = Array2::from_shape_fn((n, n), |_| rng.gen::<f64>());
    for mut row in p.rows_mut() {
        let sum = row.sum();
        row /= sum;
    }
    let r = Array1::from_shape_fn(n, |_| rng.gen_range(-1.0..1.0));
    MarkovRewardProcess::new((0..n).map(|i| format!("s{}", i)), p, r, 0.9).unwrap()
}

fn bench_evaluators(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    for n in [4, 32, 128] {
        let mrp = random_mrp(n, n as u64);
        group.bench_with_input(BenchmarkId::new("exact", n), &mrp, |b, mrp| {
            b.iter(|| exact_evaluate(black_box(mrp)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("iterative", n), &mrp, |b, mrp| {
            b.iter(|| iterative_evaluate(black_box(mrp), &EvaluationConfig::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_simulation(c: &mut Criterion) {
    let mrp = random_mrp(32, 7);
    let walk = RewardWalk::new(&mrp).unwrap();
    let config = SimulationConfig {
        start_state: 0,
        steps: 1000,
        seed: 7,
    };
    c.bench_function("simulate 1000 steps", |b| {
        b.iter(|| simulate(black_box(&walk), &config).unwrap())
    });
}

criterion_group!(benches, bench_evaluators, bench_simulation);
criterion_main!(benches);
