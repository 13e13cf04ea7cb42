//! Noise injection for decorrelating error propagation across layers.
//!
//! A [`Perturber`] adds one of four noise shapes to a value slice. Its σ is
//! either fixed or, in adaptive mode, recommended by a [`SigmaFeedback`]
//! source and clamped into the configured band.

use crate::config::PerturbationConfig;
use crate::criticality::CRITICAL_LAMBDA;
use crate::error::{AnalysisError, PerturbationError};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thunderbolt_data::CriticalityMetrics;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoiseStrategy {
    /// Add `U[-σ, σ]`.
    Uniform,
    /// Add `N(0, σ)`.
    #[default]
    Gaussian,
    /// Zero each value with probability `rate`.
    Dropout,
    /// With probability `rate`, add `+σ` or `-σ`.
    SaltPepper,
}

/// How σ grows with depth `t = (layer + 1) / total` in `(0, 1]`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayerScaling {
    Linear,
    #[default]
    Sqrt,
    Log,
}

impl LayerScaling {
    #[must_use]
    pub fn factor(self, t: f64) -> f64 {
        match self {
            LayerScaling::Linear => t,
            LayerScaling::Sqrt => t.sqrt(),
            LayerScaling::Log => (1.0 + t).log2(),
        }
    }
}

/// Source of a recommended noise level.
pub trait SigmaFeedback: Send + Sync {
    fn recommended_sigma(&self, base_sigma: f64) -> Result<f64, AnalysisError>;
}

#[derive(Clone)]
pub struct Perturber {
    config: PerturbationConfig,
    feedback: Option<Arc<dyn SigmaFeedback>>,
}

impl std::fmt::Debug for Perturber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Perturber")
            .field("config", &self.config)
            .field("feedback", &self.feedback.is_some())
            .finish()
    }
}

impl Perturber {
    #[must_use]
    pub fn new(config: PerturbationConfig) -> Self {
        Self {
            config,
            feedback: None,
        }
    }

    #[must_use]
    pub fn with_feedback(mut self, feedback: Arc<dyn SigmaFeedback>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    #[must_use]
    pub fn config(&self) -> &PerturbationConfig {
        &self.config
    }

    /// σ actually used for the next application.
    #[must_use]
    pub fn effective_sigma(&self) -> f64 {
        let base = self.config.sigma;
        if !self.config.adaptive {
            return base;
        }
        let Some(feedback) = &self.feedback else {
            return base;
        };
        match feedback.recommended_sigma(base) {
            Ok(sigma) if sigma.is_finite() => {
                sigma.clamp(self.config.min_sigma, self.config.max_sigma)
            }
            Ok(_) => base,
            Err(e) => {
                tracing::debug!(error = %e, "Sigma feedback unavailable");
                base
            }
        }
    }

    pub fn perturb<R: Rng + ?Sized>(&self, values: &[f64], rng: &mut R) -> Vec<f64> {
        self.apply(values, self.effective_sigma(), rng)
    }

    /// Perturbs one layer of a stack, scaling σ with depth.
    pub fn perturb_layer<R: Rng + ?Sized>(
        &self,
        values: &[f64],
        layer_index: usize,
        total_layers: usize,
        scaling: LayerScaling,
        rng: &mut R,
    ) -> Result<Vec<f64>, PerturbationError> {
        if total_layers == 0 {
            return Err(PerturbationError::InvalidLayers("total_layers must be positive".into()));
        }
        if layer_index >= total_layers {
            return Err(PerturbationError::InvalidLayers(format!(
                "layer {layer_index} outside a stack of {total_layers}"
            )));
        }
        let t = (layer_index + 1) as f64 / total_layers as f64;
        let sigma = self.effective_sigma() * scaling.factor(t);
        Ok(self.apply(values, sigma, rng))
    }

    fn apply<R: Rng + ?Sized>(&self, values: &[f64], sigma: f64, rng: &mut R) -> Vec<f64> {
        let rate = self.config.rate.clamp(0.0, 1.0);
        values
            .iter()
            .map(|&v| match self.config.strategy {
                NoiseStrategy::Uniform if sigma > 0.0 => v + rng.gen_range(-sigma..=sigma),
                NoiseStrategy::Uniform => v,
                NoiseStrategy::Gaussian => {
                    let z: f64 = StandardNormal.sample(rng);
                    v + sigma * z
                }
                NoiseStrategy::Dropout => {
                    if rng.gen_bool(rate) {
                        0.0
                    } else {
                        v
                    }
                }
                NoiseStrategy::SaltPepper => {
                    if rng.gen_bool(rate) {
                        if rng.gen_bool(0.5) {
                            v + sigma
                        } else {
                            v - sigma
                        }
                    } else {
                        v
                    }
                }
            })
            .collect()
    }
}

/// Pearson correlation over the common prefix; degenerate input gives 0.0.
#[must_use]
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let nf = n as f64;
    let mean_a = a.iter().sum::<f64>() / nf;
    let mean_b = b.iter().sum::<f64>() / nf;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= f64::EPSILON || var_b <= f64::EPSILON {
        return 0.0;
    }
    let r = cov / (var_a.sqrt() * var_b.sqrt());
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// `1 - |correlation|`.
///
/// Two constant series have no measurable correlation and score 0.0.
#[must_use]
pub fn decorrelation_score(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let constant = |s: &[f64]| s.iter().all(|&v| (v - s[0]).abs() <= f64::EPSILON);
    if n < 2 || (constant(&a[..n]) && constant(&b[..n])) {
        return 0.0;
    }
    1.0 - correlation(a, b).abs()
}

/// Recommends σ from the latest criticality snapshot.
///
/// Ordered lattices (λ̂ below the critical value) get more noise, chaotic ones
/// less, and the closer the edge score is to 1 the smaller the push.
#[derive(Debug)]
pub struct CriticalityFeedback {
    lambda_target: f64,
    latest: Mutex<Option<CriticalityMetrics>>,
}

impl Default for CriticalityFeedback {
    fn default() -> Self {
        Self::new(CRITICAL_LAMBDA)
    }
}

impl CriticalityFeedback {
    #[must_use]
    pub fn new(lambda_target: f64) -> Self {
        Self {
            lambda_target,
            latest: Mutex::new(None),
        }
    }

    pub fn observe(&self, metrics: &CriticalityMetrics) {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        *latest = Some(metrics.clone());
    }
}

impl SigmaFeedback for CriticalityFeedback {
    fn recommended_sigma(&self, base_sigma: f64) -> Result<f64, AnalysisError> {
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        let metrics = latest
            .as_ref()
            .ok_or_else(|| AnalysisError::Failed("no criticality metrics observed".into()))?;
        let push = (1.0 + (self.lambda_target - metrics.lambda_hat)).max(0.0);
        let settle = 1.0 - 0.5 * metrics.edge_score.clamp(0.0, 1.0);
        AnalysisError::check("sigma", base_sigma * push * settle)
    }
}
