//! Edge-of-chaos metrics for one tick.
//!
//! Degenerate inputs resolve to documented neutral values (0.5 for PLV,
//! entropy and λ̂, 0.0 for Lyapunov). A non-finite result anywhere else is an
//! [`AnalysisError`] so the caller can skip the tick instead of emitting NaN.

use crate::config::CriticalityConfig;
use crate::error::AnalysisError;
use crate::history::MetricsHistory;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use thunderbolt_data::{CellDelta, CellState, CriticalityMetrics, Zone};

pub const CRITICAL_LAMBDA: f64 = 0.273;
const NEUTRAL: f64 = 0.5;
const LYAPUNOV_CLAMP: f64 = 2.0;
/// Largest index gap searched for a near-neighbour pair.
pub const LYAPUNOV_SEARCH_LAG: usize = 64;

/// Phase-locking value with the default limits (50 exact, 500 sampled).
#[must_use]
pub fn compute_plv(phases: &[f64], seed: u64) -> f64 {
    compute_plv_with(phases, seed, 50, 500)
}

/// `|mean(e^{i(φ_i − φ_j)})|` over phase pairs.
///
/// Up to `exact_limit` phases the mean runs over every ordered pair, which
/// collapses to `|Σ e^{iφ}|² / n²`. Above it `sample_pairs` pairs are drawn
/// with replacement, rejecting self-pairs.
#[must_use]
pub fn compute_plv_with(phases: &[f64], seed: u64, exact_limit: usize, sample_pairs: usize) -> f64 {
    let n = phases.len();
    if n < 2 {
        return NEUTRAL;
    }
    if n <= exact_limit {
        let (s, c) = phases
            .iter()
            .fold((0.0, 0.0), |(s, c), p| (s + p.sin(), c + p.cos()));
        let r2 = (s * s + c * c) / (n * n) as f64;
        return r2.clamp(0.0, 1.0);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (mut s, mut c) = (0.0, 0.0);
    let samples = sample_pairs.max(1);
    for _ in 0..samples {
        let i = rng.gen_range(0..n);
        let mut j = rng.gen_range(0..n);
        while j == i {
            j = rng.gen_range(0..n);
        }
        let d = phases[i] - phases[j];
        s += d.sin();
        c += d.cos();
    }
    let k = samples as f64;
    ((s / k).powi(2) + (c / k).powi(2)).sqrt().clamp(0.0, 1.0)
}

/// Ordinal pattern of one window; ties keep index order.
fn ordinal_pattern(window: &[f64]) -> Vec<u8> {
    let mut idx: Vec<u8> = (0..window.len() as u8).collect();
    idx.sort_by(|&a, &b| window[a as usize].total_cmp(&window[b as usize]));
    idx
}

/// Normalised permutation entropy with embedding dimension `m`.
#[must_use]
pub fn permutation_entropy(series: &[f64], m: usize) -> f64 {
    if series.len() < 4 || m < 2 || series.len() < m {
        return NEUTRAL;
    }
    let mut counts: HashMap<Vec<u8>, usize> = HashMap::new();
    for window in series.windows(m) {
        *counts.entry(ordinal_pattern(window)).or_default() += 1;
    }
    let total = (series.len() - m + 1) as f64;
    let entropy: f64 = counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    let max = (2..=m).map(|k| k as f64).product::<f64>().log2();
    (entropy / max).clamp(0.0, 1.0)
}

/// Fraction of non-quiescent states; empty input is neutral.
#[must_use]
pub fn compute_langton_lambda(states: &[CellState]) -> f64 {
    if states.is_empty() {
        return NEUTRAL;
    }
    let live = states.iter().filter(|s| !s.is_quiescent()).count();
    live as f64 / states.len() as f64
}

/// Simplified Rosenstein estimate of the largest Lyapunov exponent.
///
/// Pairs are searched within [`LYAPUNOV_SEARCH_LAG`] samples of each other,
/// so the scan stays linear in the series length even when no pair qualifies.
#[must_use]
pub fn lyapunov_estimate(series: &[f64], max_pairs: usize, horizon: usize) -> f64 {
    let n = series.len();
    if n < 10 {
        return 0.0;
    }
    let mean = series.iter().sum::<f64>() / n as f64;
    let stddev = (series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64).sqrt();
    if stddev <= f64::EPSILON {
        return 0.0;
    }
    let threshold = 0.1 * stddev;

    let mut pairs = Vec::with_capacity(max_pairs);
    'search: for i in 0..n {
        for j in (i + 1)..n.min(i + 1 + LYAPUNOV_SEARCH_LAG) {
            let gap = (series[i] - series[j]).abs();
            if gap > 0.0 && gap < threshold {
                pairs.push((i, j, gap));
                if pairs.len() >= max_pairs {
                    break 'search;
                }
            }
        }
    }

    let rates: Vec<f64> = pairs
        .into_iter()
        .filter_map(|(i, j, initial)| {
            let steps = horizon.min(n - 1 - j);
            if steps == 0 {
                return None;
            }
            let last = (series[i + steps] - series[j + steps]).abs();
            (last > 0.0).then(|| (last / initial).ln() / steps as f64)
        })
        .collect();
    if rates.is_empty() {
        return 0.0;
    }
    (rates.iter().sum::<f64>() / rates.len() as f64).clamp(-LYAPUNOV_CLAMP, LYAPUNOV_CLAMP)
}

/// `exp(-((value - target) / width)² / 2)`, in `[0, 1]`.
#[must_use]
pub fn gaussian_score(value: f64, target: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return if (value - target).abs() <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    let z = (value - target) / width;
    (-0.5 * z * z).exp().clamp(0.0, 1.0)
}

/// Weighted closeness of the four metrics to their critical targets.
#[must_use]
pub fn edge_score(
    lambda_hat: f64,
    entropy: f64,
    plv: f64,
    lyapunov: f64,
    config: &CriticalityConfig,
) -> f64 {
    let w = &config.weights;
    let score = w.lambda * gaussian_score(lambda_hat, config.lambda_target, config.lambda_width)
        + w.entropy * gaussian_score(entropy, config.entropy_target, config.entropy_width)
        + w.plv * gaussian_score(plv, config.plv_target, config.plv_width)
        + w.lyapunov * gaussian_score(lyapunov, config.lyapunov_target, config.lyapunov_width);
    score.clamp(0.0, 1.0)
}

#[must_use]
pub fn classify_zone(lambda_hat: f64, entropy: f64, config: &CriticalityConfig) -> Zone {
    if lambda_hat < 0.2 && entropy < 0.3 {
        Zone::Ordered
    } else if lambda_hat > 0.4 && entropy > 0.7 {
        Zone::Chaotic
    } else if (lambda_hat - config.lambda_target).abs() <= config.lambda_width {
        Zone::Critical
    } else if lambda_hat < config.lambda_target {
        Zone::Ordered
    } else {
        Zone::Chaotic
    }
}

/// Computes [`CriticalityMetrics`] from a tick's deltas and the history ring.
#[derive(Debug, Clone, Default)]
pub struct CriticalityAnalyzer {
    config: CriticalityConfig,
}

impl CriticalityAnalyzer {
    #[must_use]
    pub fn new(config: CriticalityConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &CriticalityConfig {
        &self.config
    }

    /// Analyses `deltas` against `history`, which must not yet contain this tick.
    pub fn analyze(
        &self,
        deltas: &[CellDelta],
        history: &MetricsHistory,
        tick: u64,
    ) -> Result<CriticalityMetrics, AnalysisError> {
        let c = &self.config;
        let phases: Vec<f64> = deltas.iter().map(|d| d.phi_phase).collect();
        let states: Vec<CellState> = deltas.iter().map(|d| d.state).collect();
        let mut series = history.flow_series();
        series.extend(deltas.iter().map(|d| d.sigma_flow));

        let plv = AnalysisError::check(
            "plv",
            compute_plv_with(&phases, tick, c.plv_exact_limit, c.plv_sample_pairs),
        )?;
        let entropy = AnalysisError::check(
            "entropy",
            permutation_entropy(&series, c.embedding_dimension),
        )?;
        let lambda_hat = AnalysisError::check("lambda_hat", compute_langton_lambda(&states))?;
        let lyapunov = AnalysisError::check(
            "lyapunov",
            lyapunov_estimate(&series, c.lyapunov_max_pairs, c.lyapunov_horizon),
        )?;
        let edge = AnalysisError::check(
            "edge_score",
            edge_score(lambda_hat, entropy, plv, lyapunov, c),
        )?;

        Ok(CriticalityMetrics {
            plv,
            entropy,
            lambda_hat,
            lyapunov,
            edge_score: edge,
            zone: classify_zone(lambda_hat, entropy, c),
            tick,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}
