use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thunderbolt_core::criticality::{compute_plv, lyapunov_estimate, permutation_entropy};
use thunderbolt_core::history::MetricsHistory;
use thunderbolt_core::lattice::Lattice;
use thunderbolt_core::sidequest::SideQuestAnalyzer;
use thunderbolt_core::stepper::step_thunderbit_grid;
use thunderbolt_core::CriticalityAnalyzer;
use thunderbolt_data::{Coord, RuleId, Ruleset};

fn random_series(len: usize) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    (0..len).map(|_| rng.gen()).collect()
}

/// Benchmark sampled PLV on a large phase set.
fn bench_plv_sampled(c: &mut Criterion) {
    let phases: Vec<f64> = random_series(4096).iter().map(|v| v * 6.0).collect();
    c.bench_function("plv_sampled_4096", |b| {
        b.iter(|| black_box(compute_plv(black_box(&phases), 1)))
    });
}

/// Benchmark permutation entropy and Lyapunov over a 10-frame history.
fn bench_series_metrics(c: &mut Criterion) {
    let series = random_series(10 * 4096);
    c.bench_function("permutation_entropy_40k", |b| {
        b.iter(|| black_box(permutation_entropy(black_box(&series), 3)))
    });
    c.bench_function("lyapunov_40k", |b| {
        b.iter(|| black_box(lyapunov_estimate(black_box(&series), 50, 5)))
    });
}

/// Benchmark both analyzers on one stepped 16³ lattice with full history.
fn bench_full_analysis(c: &mut Criterion) {
    let ruleset = Ruleset::new(RuleId::Demo);
    let mut lattice = Lattice::random(Coord::new(16, 16, 16), 42, 0.3).unwrap();
    let mut history = MetricsHistory::default();
    for _ in 0..10 {
        let (next, deltas, _) = step_thunderbit_grid(&lattice, &ruleset, 42).unwrap();
        history.push_deltas(next.tick, &deltas);
        lattice = next;
    }
    let (next, deltas, local) = step_thunderbit_grid(&lattice, &ruleset, 42).unwrap();
    let criticality = CriticalityAnalyzer::default();
    let sidequest = SideQuestAnalyzer::default();

    c.bench_function("analyze_16_cube", |b| {
        b.iter(|| {
            let m = criticality.analyze(black_box(&deltas), &history, next.tick).unwrap();
            let s = sidequest
                .analyze(&deltas, &local, &history, None, next.tick)
                .unwrap();
            black_box((m, s))
        })
    });
}

criterion_group!(
    benches,
    bench_plv_sampled,
    bench_series_metrics,
    bench_full_analysis
);
criterion_main!(benches);
