mod common;

use common::{ruleset, LatticeBuilder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::f64::consts::PI;
use thunderbolt_lib::data::{CellState, Coord, Doctrine, RuleId, Zone};
use thunderbolt_lib::engine::criticality::{
    compute_langton_lambda, compute_plv, permutation_entropy, CRITICAL_LAMBDA,
};
use thunderbolt_lib::engine::history::MetricsHistory;
use thunderbolt_lib::engine::sidequest::{algotype_overlay, sortedness};
use thunderbolt_lib::engine::stepper::step;
use thunderbolt_lib::engine::{CriticalityAnalyzer, SideQuestAnalyzer};

#[test]
fn test_plv_extremes() {
    assert!((compute_plv(&[2.5; 30], 0) - 1.0).abs() < 1e-9);
    assert!(compute_plv(&[0.0, PI], 0) < 1e-9);
}

#[test]
fn test_langton_lambda_extremes() {
    assert_eq!(compute_langton_lambda(&[CellState::Inactive; 8]), 0.0);
    assert_eq!(compute_langton_lambda(&[CellState::Active; 8]), 1.0);
    assert_eq!(compute_langton_lambda(&[]), 0.5);
}

#[test]
fn test_permutation_entropy_separates_order_from_noise() {
    let monotonic: Vec<f64> = (0..50).map(f64::from).collect();
    assert!(permutation_entropy(&monotonic, 3) < 1e-9);

    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let noise: Vec<f64> = (0..5000).map(|_| rng.gen()).collect();
    assert!(permutation_entropy(&noise, 3) > 0.95);
}

#[test]
fn test_spread_phases_have_no_locking() {
    let lattice = LatticeBuilder::new(4, 4, 2).with_spread_phases().build();
    let phases: Vec<f64> = lattice.deltas().iter().map(|d| d.phi_phase).collect();
    assert!(compute_plv(&phases, 0) < 1e-9);
}

#[test]
fn test_analyzers_over_a_run() {
    let criticality = CriticalityAnalyzer::default();
    let sidequest = SideQuestAnalyzer::default();
    let mut history = MetricsHistory::default();
    let mut grid = LatticeBuilder::new(6, 6, 6)
        .with_seed(21)
        .with_doctrines(&["order", "chaos"])
        .build_grid();
    let rules = ruleset(RuleId::Demo);

    for _ in 0..15 {
        let outcome = step(&grid, &rules, 21).unwrap();
        let tick = outcome.grid.tick();
        let local = outcome.local.unwrap();

        let c = criticality.analyze(&outcome.deltas, &history, tick).unwrap();
        for value in [c.plv, c.entropy, c.lambda_hat, c.edge_score] {
            assert!((0.0..=1.0).contains(&value));
        }
        assert!((-2.0..=2.0).contains(&c.lyapunov));
        assert_eq!(c.tick, tick);

        let s = sidequest
            .analyze(&outcome.deltas, &local, &history, None, tick)
            .unwrap();
        assert!((0.0..=1.0).contains(&s.sortedness));
        assert!((0.0..=1.0).contains(&s.healing_rate));
        assert!(s.pattern_stability >= 0.0 && s.pattern_stability <= 1.0 + 1e-9);
        let shares: f64 = s.doctrine_distribution.values().sum();
        assert!((shares - 1.0).abs() < 1e-9);

        history.push_deltas(tick, &outcome.deltas);
        grid = outcome.grid;
    }
    assert_eq!(history.len(), 10);
}

#[test]
fn test_quiet_lattice_is_ordered() {
    let lattice = LatticeBuilder::new(4, 4, 4).with_flow(0.0).build();
    let metrics = CriticalityAnalyzer::default()
        .analyze(&lattice.deltas(), &MetricsHistory::default(), 1)
        .unwrap();
    assert_eq!(metrics.lambda_hat, 0.0);
    assert_eq!(metrics.zone, Zone::Ordered);
    assert!(metrics.lambda_hat < CRITICAL_LAMBDA);
}

#[test]
fn test_sortedness_bounds() {
    let ascending: Vec<f64> = (0..100).map(f64::from).collect();
    let descending: Vec<f64> = ascending.iter().rev().copied().collect();
    assert_eq!(sortedness(&ascending), 1.0);
    assert_eq!(sortedness(&descending), 0.0);
}

#[test]
fn test_single_doctrine_overlay() {
    let lattice = LatticeBuilder::new(3, 3, 3).build();
    let tags: HashMap<Coord, Doctrine> = lattice
        .sorted_coords()
        .into_iter()
        .map(|c| (c, Doctrine::new("order")))
        .collect();
    let overlay = algotype_overlay(&tags, 1.0, -1.0);
    assert_eq!(overlay.clustering, 1.0);
    assert!(overlay.ising_energy < 0.0);
    assert_eq!(overlay.distribution.len(), 1);
    assert!(tags.contains_key(&Coord::new(0, 0, 0)));
}
