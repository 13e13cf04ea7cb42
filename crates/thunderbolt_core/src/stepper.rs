//! One tick of lattice evolution.
//!
//! A lattice step reads only the previous map and builds a fresh one, so every
//! cell update is independent and runs on the rayon pool. Per-cell randomness
//! comes from a ChaCha stream keyed by `(seed, tick, cell)`, which makes the
//! output independent of thread scheduling.

use crate::dynamics::{classify_state, evolve_cell, wrap_phase};
use crate::error::LatticeError;
use crate::lattice::{Grid, Lattice, LegacyGrid};
use crate::neighborhood::{check_bounds, Stencil};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::TAU;
use thunderbolt_data::{CellDelta, CellState, Coord, LocalMetrics, Ruleset, Thunderbit};

/// Upper bound on synthetic deltas per legacy tick.
pub const LEGACY_SAMPLE: usize = 32;
/// Flow distance under which two neighbours count as "similar".
const SIMILARITY: f64 = 0.1;

/// Result of advancing a grid by one tick.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub grid: Grid,
    /// One delta per processed cell, sorted by coordinate.
    pub deltas: Vec<CellDelta>,
    /// Present for lattice steps only.
    pub local: Option<LocalMetrics>,
}

/// Advances `grid` by exactly one tick.
pub fn step(grid: &Grid, ruleset: &Ruleset, seed: u64) -> Result<StepOutcome, LatticeError> {
    match grid {
        Grid::Legacy(legacy) => {
            let (next, deltas) = step_legacy_grid(legacy, seed);
            Ok(StepOutcome {
                grid: Grid::Legacy(next),
                deltas,
                local: None,
            })
        }
        Grid::Lattice(lattice) => {
            let (next, deltas, local) = step_thunderbit_grid(lattice, ruleset, seed)?;
            Ok(StepOutcome {
                grid: Grid::Lattice(next),
                deltas,
                local: Some(local),
            })
        }
    }
}

/// Synthesises a small random batch of changed cells on a `size × size` plane.
#[must_use]
pub fn step_legacy_grid(grid: &LegacyGrid, seed: u64) -> (LegacyGrid, Vec<CellDelta>) {
    let next = LegacyGrid {
        size: grid.size,
        tick: grid.tick + 1,
    };
    if grid.size == 0 {
        return (next, Vec::new());
    }

    let side = i32::try_from(grid.size).unwrap_or(i32::MAX);
    let bounds = Coord::new(side, side, 1);
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(next.tick));
    let samples = LEGACY_SAMPLE.min(grid.size as usize * grid.size as usize);

    let mut picked: BTreeMap<Coord, Thunderbit> = BTreeMap::new();
    for _ in 0..samples {
        let coord = Coord::new(rng.gen_range(0..side), rng.gen_range(0..side), 0);
        let sigma_flow: f64 = rng.gen();
        let lambda_sensitivity: f64 = rng.gen_range(0.0..0.5);
        picked.insert(
            coord,
            Thunderbit {
                state: classify_state(sigma_flow, lambda_sensitivity),
                sigma_flow,
                phi_phase: rng.gen_range(0.0..TAU),
                lambda_sensitivity,
                tick: next.tick,
                doctrine: None,
            },
        );
    }
    let deltas = picked
        .iter()
        .map(|(&coord, cell)| CellDelta::from_cell(coord, bounds, cell))
        .collect();
    (next, deltas)
}

/// Seed of the noise stream for one cell at one tick.
#[inline]
#[must_use]
pub fn cell_seed(seed: u64, tick: u64, cell_id: u64) -> u64 {
    let mut h = seed ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= cell_id.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 31;
    h.wrapping_mul(0x94D0_49BB_1331_11EB)
}

struct CellStep {
    coord: Coord,
    cell: Thunderbit,
    similar_fraction: Option<f64>,
    flow_change: f64,
}

/// Full Thunderbit update: new lattice, sorted deltas and rule-local metrics.
pub fn step_thunderbit_grid(
    lattice: &Lattice,
    ruleset: &Ruleset,
    seed: u64,
) -> Result<(Lattice, Vec<CellDelta>, LocalMetrics), LatticeError> {
    check_bounds(lattice.bounds)?;
    let tick = lattice.tick + 1;
    let bounds = lattice.bounds;
    let stencil = Stencil::new(ruleset.neighborhood_type, ruleset.boundary_condition)?;
    let coords = lattice.sorted_coords();

    let updates: Vec<CellStep> = coords
        .par_iter()
        .filter_map(|&coord| {
            let current = lattice.cells.get(&coord)?;
            let neighbors: Vec<&Thunderbit> = stencil
                .neighbors(coord, bounds)
                .into_iter()
                .filter_map(|n| lattice.cells.get(&n))
                .collect();

            let mut rng = ChaCha8Rng::seed_from_u64(cell_seed(
                seed,
                tick,
                coord.linear_index(bounds),
            ));
            let update = evolve_cell(ruleset, current, &neighbors, &mut rng);

            let similar_fraction = (!neighbors.is_empty()).then(|| {
                let similar = neighbors
                    .iter()
                    .filter(|n| (n.sigma_flow - current.sigma_flow).abs() <= SIMILARITY)
                    .count();
                similar as f64 / neighbors.len() as f64
            });

            Some(CellStep {
                coord,
                cell: Thunderbit {
                    state: update.state,
                    sigma_flow: update.sigma_flow,
                    phi_phase: wrap_phase(update.phi_phase),
                    lambda_sensitivity: update.lambda_sensitivity,
                    tick,
                    doctrine: current.doctrine.clone(),
                },
                similar_fraction,
                flow_change: (update.sigma_flow - current.sigma_flow).abs(),
            })
        })
        .collect();

    let local = local_metrics(&updates);
    let mut cells = HashMap::with_capacity(updates.len());
    let mut deltas = Vec::with_capacity(updates.len());
    for step in updates {
        deltas.push(CellDelta::from_cell(step.coord, bounds, &step.cell));
        cells.insert(step.coord, step.cell);
    }

    tracing::debug!(tick, cells = deltas.len(), rule = %ruleset.rule_id, "Lattice step");
    Ok((Lattice { bounds, cells, tick }, deltas, local))
}

fn local_metrics(updates: &[CellStep]) -> LocalMetrics {
    if updates.is_empty() {
        return LocalMetrics::default();
    }
    let n = updates.len() as f64;

    let fractions: Vec<f64> = updates.iter().filter_map(|u| u.similar_fraction).collect();
    let clustering = if fractions.is_empty() {
        0.0
    } else {
        fractions.iter().sum::<f64>() / fractions.len() as f64
    };

    let mut counts = [0usize; CellState::ALL.len()];
    for u in updates {
        counts[u.cell.state.index()] += 1;
    }
    let entropy = shannon_entropy(&counts) / (CellState::ALL.len() as f64).log2();
    let divergence = updates.iter().map(|u| u.flow_change).sum::<f64>() / n;

    LocalMetrics {
        clustering,
        entropy,
        divergence,
    }
}

/// Base-2 Shannon entropy of a histogram.
#[must_use]
pub fn shannon_entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Aggregate descriptors of one tick's deltas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub count: usize,
    pub energy_mean: f64,
    pub energy_variance: f64,
    pub flow_mean: f64,
    pub flow_variance: f64,
    pub chaos_mean: f64,
    pub chaos_variance: f64,
    /// Mean resultant length of the phases, in `[0, 1]`.
    pub phase_coherence: f64,
    /// Circular mean phase in `[0, 2π)`.
    pub mean_phase: f64,
    pub centroid: (f64, f64, f64),
}

fn mean_variance(values: impl Iterator<Item = f64> + Clone, n: f64) -> (f64, f64) {
    let mean = values.clone().sum::<f64>() / n;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

#[must_use]
pub fn extract_features(deltas: &[CellDelta]) -> FeatureVector {
    if deltas.is_empty() {
        return FeatureVector::default();
    }
    let n = deltas.len() as f64;
    let (energy_mean, energy_variance) = mean_variance(deltas.iter().map(|d| d.energy), n);
    let (flow_mean, flow_variance) = mean_variance(deltas.iter().map(|d| d.sigma_flow), n);
    let (chaos_mean, chaos_variance) =
        mean_variance(deltas.iter().map(|d| d.lambda_sensitivity), n);

    let (sin, cos) = deltas.iter().fold((0.0, 0.0), |(s, c), d| {
        (s + d.phi_phase.sin(), c + d.phi_phase.cos())
    });
    let (sin, cos) = (sin / n, cos / n);
    let phase_coherence = (sin * sin + cos * cos).sqrt().min(1.0);
    let mean_phase = if phase_coherence > f64::EPSILON {
        wrap_phase(sin.atan2(cos))
    } else {
        0.0
    };

    let centroid = deltas.iter().fold((0.0, 0.0, 0.0), |acc, d| {
        (
            acc.0 + f64::from(d.coord.x) / n,
            acc.1 + f64::from(d.coord.y) / n,
            acc.2 + f64::from(d.coord.z) / n,
        )
    });

    FeatureVector {
        count: deltas.len(),
        energy_mean,
        energy_variance,
        flow_mean,
        flow_variance,
        chaos_mean,
        chaos_variance,
        phase_coherence,
        mean_phase,
        centroid,
    }
}
