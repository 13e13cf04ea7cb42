use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use thunderbolt_lib::data::{CriticalityMetrics, Zone};
use thunderbolt_lib::engine::config::PerturbationConfig;
use thunderbolt_lib::engine::perturbation::{
    correlation, decorrelation_score, CriticalityFeedback, LayerScaling, NoiseStrategy, Perturber,
};
use thunderbolt_lib::engine::PerturbationError;

fn snapshot(lambda_hat: f64, edge_score: f64) -> CriticalityMetrics {
    CriticalityMetrics {
        plv: 0.4,
        entropy: 0.5,
        lambda_hat,
        lyapunov: 0.0,
        edge_score,
        zone: Zone::Critical,
        tick: 1,
        timestamp: String::new(),
    }
}

fn series(n: usize) -> Vec<f64> {
    (0..n).map(|i| (i as f64 * 0.37).sin()).collect()
}

#[test]
fn test_decorrelation_identity_and_constants() {
    let x = series(64);
    assert_eq!(decorrelation_score(&x, &x), 0.0);
    assert_eq!(correlation(&[1.0; 10], &x), 0.0);
    assert_eq!(decorrelation_score(&[2.0; 10], &[2.0; 10]), 0.0);
}

#[test]
fn test_deeper_layers_get_more_noise() {
    let perturber = Perturber::new(PerturbationConfig {
        strategy: NoiseStrategy::Gaussian,
        sigma: 0.1,
        ..Default::default()
    });
    let clean = series(2000);
    let spread = |layer: usize| {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let noisy = perturber
            .perturb_layer(&clean, layer, 4, LayerScaling::Linear, &mut rng)
            .unwrap();
        let var = noisy
            .iter()
            .zip(&clean)
            .map(|(n, c)| (n - c).powi(2))
            .sum::<f64>()
            / clean.len() as f64;
        var.sqrt()
    };
    let shallow = spread(0);
    let deep = spread(3);
    assert!(deep > 2.0 * shallow, "shallow {shallow}, deep {deep}");
}

#[test]
fn test_layer_index_is_checked() {
    let perturber = Perturber::new(PerturbationConfig::default());
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    assert!(matches!(
        perturber.perturb_layer(&[1.0], 0, 0, LayerScaling::Sqrt, &mut rng),
        Err(PerturbationError::InvalidLayers(_))
    ));
    assert!(matches!(
        perturber.perturb_layer(&[1.0], 4, 4, LayerScaling::Sqrt, &mut rng),
        Err(PerturbationError::InvalidLayers(_))
    ));
}

#[test]
fn test_noise_decorrelates_layers() {
    let perturber = Perturber::new(PerturbationConfig {
        strategy: NoiseStrategy::Uniform,
        sigma: 2.0,
        ..Default::default()
    });
    let clean = series(500);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let a = perturber.perturb(&clean, &mut rng);
    let b = perturber.perturb(&clean, &mut rng);
    assert!(decorrelation_score(&a, &b) > decorrelation_score(&clean, &clean));
}

#[test]
fn test_adaptive_sigma_follows_criticality() {
    let feedback = Arc::new(CriticalityFeedback::default());
    let perturber = Perturber::new(PerturbationConfig {
        sigma: 0.1,
        adaptive: true,
        min_sigma: 0.001,
        max_sigma: 0.5,
        ..Default::default()
    })
    .with_feedback(feedback.clone());

    // No snapshot yet: the base σ applies.
    assert!((perturber.effective_sigma() - 0.1).abs() < 1e-12);

    feedback.observe(&snapshot(0.0, 0.0));
    let ordered = perturber.effective_sigma();
    feedback.observe(&snapshot(0.9, 0.0));
    let chaotic = perturber.effective_sigma();
    assert!(ordered > 0.1);
    assert!(chaotic < 0.1);
    assert!((0.001..=0.5).contains(&chaotic));
}
