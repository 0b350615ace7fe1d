use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use pricing_bandits::{BernoulliEnvironment, PhasedContextualEnvironment, TrialRunner};
use std::hint::black_box;

fn bench_plain_trial(c: &mut Criterion) {
    let probs = vec![0.9, 0.75, 0.6, 0.45, 0.3, 0.2, 0.1, 0.05];
    let prices: Vec<f64> = (1..=8).map(f64::from).collect();

    let mut group = c.benchmark_group("plain_trial");
    for id in ["greedy", "ucb", "ths", "ns_ucb", "ns_ths"] {
        group.bench_with_input(BenchmarkId::new(id, 1_000), &id, |b, &id| {
            b.iter_batched(
                || {
                    let env = BernoulliEnvironment::new(probs.clone()).unwrap();
                    TrialRunner::new(id.parse().unwrap(), Box::new(env), prices.clone(), 1_000)
                        .unwrap()
                        .with_window_size(Some(250))
                },
                |mut runner| {
                    let r = runner.run_trial().unwrap();
                    black_box(r.rewards.len());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_contextual_trial(c: &mut Criterion) {
    // Three contexts, four phases; contexts differ in which price converts best.
    let table: Vec<Vec<Vec<f64>>> = (0..3)
        .map(|ctx| {
            (0..4)
                .map(|phase| {
                    (0..8)
                        .map(|arm| {
                            let peak = (ctx + phase) % 8;
                            if arm == peak {
                                0.8
                            } else {
                                0.2
                            }
                        })
                        .collect()
                })
                .collect()
        })
        .collect();
    let prices: Vec<f64> = (1..=8).map(f64::from).collect();

    let mut group = c.benchmark_group("contextual_trial");
    for id in ["ctx_ucb", "ctx_ths", "ctx_ns_ucb", "ctx_ns_ths"] {
        group.bench_with_input(BenchmarkId::new(id, 1_000), &id, |b, &id| {
            b.iter_batched(
                || {
                    let env = PhasedContextualEnvironment::new(table.clone(), 250).unwrap();
                    TrialRunner::new(id.parse().unwrap(), Box::new(env), prices.clone(), 1_000)
                        .unwrap()
                        .with_window_size(Some(250))
                },
                |mut runner| {
                    let r = runner.run_trial().unwrap();
                    black_box(r.rewards.len());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_plain_trial, bench_contextual_trial);
criterion_main!(benches);
