use super::cell::Doctrine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Dynamical regime the lattice currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Ordered,
    Critical,
    Chaotic,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Zone::Ordered => "ordered",
            Zone::Critical => "critical",
            Zone::Chaotic => "chaotic",
        };
        f.write_str(name)
    }
}

/// Edge-of-chaos snapshot for a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalityMetrics {
    /// Phase-locking value in `[0, 1]`.
    pub plv: f64,
    /// Normalised permutation entropy in `[0, 1]`.
    pub entropy: f64,
    /// Fraction of non-quiescent cells.
    pub lambda_hat: f64,
    /// Largest-Lyapunov estimate, clamped to `[-2, 2]`.
    pub lyapunov: f64,
    /// Weighted closeness to the critical targets in `[0, 1]`.
    pub edge_score: f64,
    pub zone: Zone,
    pub tick: u64,
    pub timestamp: String,
}

/// Rule-local signals produced alongside a lattice step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalMetrics {
    /// Mean fraction of neighbours with similar flow.
    pub clustering: f64,
    /// Normalised Shannon entropy of the state distribution.
    pub entropy: f64,
    /// Mean absolute flow change over the step.
    pub divergence: f64,
}

/// Secondary order and structure signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideQuestMetrics {
    pub clustering: f64,
    pub local_clustering: f64,
    pub sortedness: f64,
    pub healing_rate: f64,
    pub pattern_stability: f64,
    pub emergence_score: f64,
    pub entropy: f64,
    pub divergence: f64,
    pub algotype_clustering: f64,
    pub algotype_ising_energy: f64,
    pub doctrine_distribution: BTreeMap<Doctrine, f64>,
    pub tick: u64,
}

/// What a run hands to its sink for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub criticality: CriticalityMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidequest: Option<SideQuestMetrics>,
}
