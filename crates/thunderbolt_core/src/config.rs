//! Configuration management for simulation parameters.
//!
//! Strongly-typed structures mapping to `thunderbolt.toml`. Every section has a
//! `Default` that reproduces the built-in constants, so a partial file only
//! overrides what it names.
//!
//! ## Example `thunderbolt.toml`
//!
//! ```toml
//! [lattice]
//! bounds = { x = 16, y = 16, z = 16 }
//! rule = "diffusion"
//! boundary = "periodic"
//! seed = 42
//! deterministic = true
//!
//! [runner]
//! mode = "clock_driven"
//! history_depth = 20
//!
//! [criticality]
//! plv_target = 0.5
//! ```

use crate::criticality::CRITICAL_LAMBDA;
use crate::history::DEFAULT_HISTORY_DEPTH;
use crate::neighborhood::MAX_RADIUS;
use crate::perturbation::{LayerScaling, NoiseStrategy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thunderbolt_data::{
    BoundaryCondition, Coord, Doctrine, NeighborhoodType, RuleId, Ruleset, TuningParams,
};

/// Lattice shape, topology and initial conditions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LatticeConfig {
    pub bounds: Coord,
    /// When set, run the legacy 2D stub of this side length instead.
    pub legacy_size: Option<u32>,
    pub rule: RuleId,
    pub neighborhood: NeighborhoodType,
    pub boundary: BoundaryCondition,
    pub tuning: TuningParams,
    pub seed: Option<u64>,
    pub deterministic: bool,
    /// Fraction of cells that start with high flow.
    pub initial_density: f64,
    pub doctrines: Vec<Doctrine>,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            bounds: Coord::new(16, 16, 16),
            legacy_size: None,
            rule: RuleId::Demo,
            neighborhood: NeighborhoodType::VON_NEUMANN,
            boundary: BoundaryCondition::Clip,
            tuning: TuningParams::default(),
            seed: None,
            deterministic: false,
            initial_density: 0.3,
            doctrines: Vec::new(),
        }
    }
}

impl LatticeConfig {
    #[must_use]
    pub fn ruleset(&self) -> Ruleset {
        Ruleset {
            rule_id: self.rule,
            neighborhood_type: self.neighborhood,
            boundary_condition: self.boundary,
            tuning: self.tuning,
        }
    }
}

/// How a run advances its ticks.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    #[default]
    SelfTimed,
    ClockDriven,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    pub mode: ScheduleKind,
    pub tick_interval_ms: u64,
    /// Duration of one clock phase when the built-in clock drives the run.
    pub clock_phase_ms: u64,
    pub history_depth: usize,
    pub emit_criticality: bool,
    pub emit_sidequest: bool,
    pub max_ticks: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleKind::SelfTimed,
            tick_interval_ms: 50,
            clock_phase_ms: 10,
            history_depth: DEFAULT_HISTORY_DEPTH,
            emit_criticality: true,
            emit_sidequest: true,
            max_ticks: None,
        }
    }
}

/// Relative weight of each sub-score in the edge score.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct EdgeWeights {
    pub lambda: f64,
    pub entropy: f64,
    pub plv: f64,
    pub lyapunov: f64,
}

impl Default for EdgeWeights {
    fn default() -> Self {
        Self {
            lambda: 0.35,
            entropy: 0.25,
            plv: 0.25,
            lyapunov: 0.15,
        }
    }
}

impl EdgeWeights {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.lambda + self.entropy + self.plv + self.lyapunov
    }
}

/// Critical targets, Gaussian widths and sampling limits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CriticalityConfig {
    pub lambda_target: f64,
    pub lambda_width: f64,
    pub plv_target: f64,
    pub plv_width: f64,
    pub entropy_target: f64,
    pub entropy_width: f64,
    pub lyapunov_target: f64,
    pub lyapunov_width: f64,
    pub weights: EdgeWeights,
    /// Up to this many phases, PLV uses every pair.
    pub plv_exact_limit: usize,
    pub plv_sample_pairs: usize,
    pub embedding_dimension: usize,
    pub lyapunov_max_pairs: usize,
    pub lyapunov_horizon: usize,
}

impl Default for CriticalityConfig {
    fn default() -> Self {
        Self {
            lambda_target: CRITICAL_LAMBDA,
            lambda_width: 0.15,
            plv_target: 0.4,
            plv_width: 0.2,
            entropy_target: 0.5,
            entropy_width: 0.25,
            lyapunov_target: 0.0,
            lyapunov_width: 0.5,
            weights: EdgeWeights::default(),
            plv_exact_limit: 50,
            plv_sample_pairs: 500,
            embedding_dimension: 3,
            lyapunov_max_pairs: 50,
            lyapunov_horizon: 5,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SideQuestConfig {
    /// Flow values considered by the sortedness measure.
    pub sortedness_window: usize,
    /// Prior frames compared by pattern stability.
    pub stability_frames: usize,
    /// Ising coupling between equal doctrines.
    pub same_doctrine_coupling: f64,
    /// Ising coupling between different doctrines.
    pub cross_doctrine_coupling: f64,
}

impl Default for SideQuestConfig {
    fn default() -> Self {
        Self {
            sortedness_window: 100,
            stability_frames: 5,
            same_doctrine_coupling: 1.0,
            cross_doctrine_coupling: -1.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PerturbationConfig {
    pub strategy: NoiseStrategy,
    pub sigma: f64,
    /// Per-value probability for dropout and salt-and-pepper noise.
    pub rate: f64,
    pub adaptive: bool,
    pub min_sigma: f64,
    pub max_sigma: f64,
    pub scaling: LayerScaling,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            strategy: NoiseStrategy::Gaussian,
            sigma: 0.05,
            rate: 0.1,
            adaptive: false,
            min_sigma: 0.001,
            max_sigma: 0.5,
            scaling: LayerScaling::Sqrt,
        }
    }
}

/// Complete run configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SimConfig {
    pub lattice: LatticeConfig,
    pub runner: RunnerConfig,
    pub criticality: CriticalityConfig,
    pub sidequest: SideQuestConfig,
    pub perturbation: PerturbationConfig,
}

fn unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

impl SimConfig {
    /// Validates all configuration parameters, reporting the first failure.
    ///
    /// Target ranges follow the space an external tuner explores: PLV in
    /// `[0.3, 0.7]`, entropy in `[0.4, 0.9]`, Lyapunov in `[-0.1, 0.1]`.
    pub fn validate(&self) -> anyhow::Result<()> {
        let l = &self.lattice;
        if l.legacy_size.is_none() {
            anyhow::ensure!(
                l.bounds.x > 0 && l.bounds.y > 0 && l.bounds.z > 0,
                "Lattice bounds must be positive on every axis"
            );
            anyhow::ensure!(
                l.bounds.volume() <= 1 << 24,
                "Lattice too large (max 16777216 cells)"
            );
        }
        anyhow::ensure!(
            (1..=MAX_RADIUS).contains(&l.neighborhood.radius()),
            "Neighborhood radius must be in [1, {MAX_RADIUS}]"
        );
        anyhow::ensure!(unit(l.initial_density), "Initial density must be in [0.0, 1.0]");
        if let Some(coupling) = l.tuning.coupling {
            anyhow::ensure!(unit(coupling), "Coupling must be in [0.0, 1.0]");
        }
        if let Some(temperature) = l.tuning.temperature {
            anyhow::ensure!(temperature >= 0.0, "Temperature must be non-negative");
        }
        if let Some(lambda) = l.tuning.lambda {
            anyhow::ensure!(unit(lambda), "Lambda must be in [0.0, 1.0]");
        }

        let r = &self.runner;
        anyhow::ensure!(r.tick_interval_ms > 0, "Tick interval must be positive");
        anyhow::ensure!(r.clock_phase_ms > 0, "Clock phase duration must be positive");
        anyhow::ensure!(r.history_depth <= 1000, "History depth too large (max 1000)");

        let c = &self.criticality;
        anyhow::ensure!(unit(c.lambda_target), "Lambda target must be in [0.0, 1.0]");
        anyhow::ensure!(
            (0.3..=0.7).contains(&c.plv_target),
            "PLV target must be in [0.3, 0.7]"
        );
        anyhow::ensure!(
            (0.4..=0.9).contains(&c.entropy_target),
            "Entropy target must be in [0.4, 0.9]"
        );
        anyhow::ensure!(
            (-0.1..=0.1).contains(&c.lyapunov_target),
            "Lyapunov target must be in [-0.1, 0.1]"
        );
        anyhow::ensure!(
            c.lambda_width > 0.0 && c.plv_width > 0.0 && c.entropy_width > 0.0 && c.lyapunov_width > 0.0,
            "Criticality widths must be positive"
        );
        let w = &c.weights;
        anyhow::ensure!(
            w.lambda >= 0.0 && w.entropy >= 0.0 && w.plv >= 0.0 && w.lyapunov >= 0.0,
            "Edge weights must be non-negative"
        );
        anyhow::ensure!(
            (w.total() - 1.0).abs() < 1e-6,
            "Edge weights must sum to 1.0"
        );
        anyhow::ensure!(c.plv_sample_pairs > 0, "PLV sample pairs must be positive");
        anyhow::ensure!(
            (2..=7).contains(&c.embedding_dimension),
            "Embedding dimension must be in [2, 7]"
        );
        anyhow::ensure!(c.lyapunov_horizon > 0, "Lyapunov horizon must be positive");

        let s = &self.sidequest;
        anyhow::ensure!(s.sortedness_window >= 3, "Sortedness window must be at least 3");

        let p = &self.perturbation;
        anyhow::ensure!(p.sigma >= 0.0, "Sigma must be non-negative");
        anyhow::ensure!(unit(p.rate), "Perturbation rate must be in [0.0, 1.0]");
        anyhow::ensure!(
            p.min_sigma >= 0.0 && p.min_sigma <= p.max_sigma,
            "Sigma bounds must satisfy 0 <= min_sigma <= max_sigma"
        );

        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Seed for a run: the configured one, or a fresh one unless deterministic.
    #[must_use]
    pub fn seed(&self) -> u64 {
        match self.lattice.seed {
            Some(seed) => seed,
            None if self.lattice.deterministic => 0,
            None => rand::random(),
        }
    }

    /// Digest of the sections that change simulation output.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.lattice).as_bytes());
        hasher.update(format!("{:?}", self.criticality).as_bytes());
        hasher.update(format!("{:?}", self.sidequest).as_bytes());
        hasher.update(format!("{:?}", self.perturbation).as_bytes());
        hex::encode(hasher.finalize())
    }
}
