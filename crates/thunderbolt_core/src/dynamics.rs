//! Continuous per-cell dynamics selected by [`RuleId`].

use rand::Rng;
use std::f64::consts::TAU;
use thunderbolt_data::{CellState, RuleId, Ruleset, Thunderbit};

pub const DEMO_COUPLING: f64 = 0.3;
pub const DEMO_NOISE: f64 = 0.02;
pub const DIFFUSION_COUPLING: f64 = 0.5;
/// Flow multiplier for a cell with no occupied neighbours.
pub const ISOLATED_DECAY: f64 = 0.95;
const LIFE_THRESHOLD: f64 = 0.5;

/// New values for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellUpdate {
    pub state: CellState,
    pub sigma_flow: f64,
    pub phi_phase: f64,
    pub lambda_sensitivity: f64,
}

impl CellUpdate {
    fn settle(sigma_flow: f64, phi_phase: f64, lambda_sensitivity: f64) -> Self {
        let sigma_flow = sigma_flow.clamp(0.0, 1.0);
        let lambda_sensitivity = lambda_sensitivity.clamp(0.0, 1.0);
        Self {
            state: classify_state(sigma_flow, lambda_sensitivity),
            sigma_flow,
            phi_phase: wrap_phase(phi_phase),
            lambda_sensitivity,
        }
    }
}

/// Discrete state from flow and sensitivity.
#[must_use]
pub fn classify_state(sigma_flow: f64, lambda_sensitivity: f64) -> CellState {
    if lambda_sensitivity > 0.8 {
        CellState::Chaotic
    } else if sigma_flow > 0.8 {
        CellState::Active
    } else if sigma_flow > 0.5 {
        CellState::Stable
    } else if sigma_flow > 0.2 {
        CellState::Dormant
    } else {
        CellState::Inactive
    }
}

/// Maps a phase into `[0, 2π)`.
#[inline]
#[must_use]
pub fn wrap_phase(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Computes the next value of `cell` from the prior values of its neighbours.
pub fn evolve_cell<R: Rng + ?Sized>(
    ruleset: &Ruleset,
    cell: &Thunderbit,
    neighbors: &[&Thunderbit],
    rng: &mut R,
) -> CellUpdate {
    if neighbors.is_empty() {
        return CellUpdate::settle(
            cell.sigma_flow * ISOLATED_DECAY,
            cell.phi_phase,
            cell.lambda_sensitivity,
        );
    }
    match ruleset.rule_id {
        RuleId::Demo => demo(ruleset, cell, neighbors, rng),
        RuleId::Diffusion => diffusion(ruleset, cell, neighbors),
        RuleId::GameOfLife3d => game_of_life_3d(cell, neighbors),
    }
}

fn flow_moments(neighbors: &[&Thunderbit]) -> (f64, f64) {
    let n = neighbors.len() as f64;
    let mean = neighbors.iter().map(|c| c.sigma_flow).sum::<f64>() / n;
    let variance = neighbors
        .iter()
        .map(|c| (c.sigma_flow - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, variance)
}

fn demo<R: Rng + ?Sized>(
    ruleset: &Ruleset,
    cell: &Thunderbit,
    neighbors: &[&Thunderbit],
    rng: &mut R,
) -> CellUpdate {
    let (mean, variance) = flow_moments(neighbors);
    let coupling = ruleset.tuning.coupling.unwrap_or(DEMO_COUPLING).clamp(0.0, 1.0);
    let amplitude = ruleset.tuning.temperature.unwrap_or(DEMO_NOISE).max(0.0);
    let noise = if amplitude > 0.0 {
        rng.gen_range(-amplitude..=amplitude)
    } else {
        0.0
    };

    let flow = ((1.0 - coupling) * cell.sigma_flow + coupling * mean + noise).clamp(0.0, 1.0);
    let attractor = ruleset.tuning.lambda.unwrap_or(variance);
    CellUpdate::settle(
        flow,
        cell.phi_phase + flow * 0.1,
        0.9 * cell.lambda_sensitivity + 0.1 * attractor,
    )
}

fn diffusion(ruleset: &Ruleset, cell: &Thunderbit, neighbors: &[&Thunderbit]) -> CellUpdate {
    let (mean, _) = flow_moments(neighbors);
    let coupling = ruleset
        .tuning
        .coupling
        .unwrap_or(DIFFUSION_COUPLING)
        .clamp(0.0, 1.0);
    CellUpdate::settle(
        (1.0 - coupling) * cell.sigma_flow + coupling * mean,
        cell.phi_phase + 0.05,
        cell.lambda_sensitivity * 0.95,
    )
}

fn game_of_life_3d(cell: &Thunderbit, neighbors: &[&Thunderbit]) -> CellUpdate {
    let alive = cell.sigma_flow > LIFE_THRESHOLD;
    let live = neighbors
        .iter()
        .filter(|c| c.sigma_flow > LIFE_THRESHOLD)
        .count();
    let next_alive = if alive {
        (2..=4).contains(&live)
    } else {
        live == 3
    };
    let (flow, phase) = if next_alive {
        (1.0, cell.phi_phase + 0.1)
    } else {
        (0.0, cell.phi_phase)
    };
    CellUpdate::settle(flow, phase, live as f64 / neighbors.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use thunderbolt_data::TuningParams;

    fn cell(flow: f64) -> Thunderbit {
        Thunderbit {
            sigma_flow: flow,
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify_state(0.9, 0.0), CellState::Active);
        assert_eq!(classify_state(0.6, 0.0), CellState::Stable);
        assert_eq!(classify_state(0.3, 0.0), CellState::Dormant);
        assert_eq!(classify_state(0.2, 0.0), CellState::Inactive);
        assert_eq!(classify_state(0.0, 0.81), CellState::Chaotic);
    }

    #[test]
    fn test_isolated_cell_decays() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for rule in [RuleId::Demo, RuleId::Diffusion, RuleId::GameOfLife3d] {
            let out = evolve_cell(&Ruleset::new(rule), &cell(1.0), &[], &mut rng);
            assert!((out.sigma_flow - 0.95).abs() < 1e-12);
        }
    }

    #[test]
    fn test_diffusion_blend() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let n = cell(1.0);
        let out = evolve_cell(&Ruleset::new(RuleId::Diffusion), &cell(0.0), &[&n, &n], &mut rng);
        assert!((out.sigma_flow - 0.5).abs() < 1e-12);
        assert!((out.phi_phase - 0.05).abs() < 1e-12);

        let tuned = Ruleset::new(RuleId::Diffusion).tuned(&TuningParams {
            coupling: Some(0.25),
            ..Default::default()
        });
        let out = evolve_cell(&tuned, &cell(0.0), &[&n], &mut rng);
        assert!((out.sigma_flow - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_demo_without_noise_is_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let ruleset = Ruleset::new(RuleId::Demo).tuned(&TuningParams {
            temperature: Some(0.0),
            lambda: Some(1.0),
            ..Default::default()
        });
        let n = cell(1.0);
        let out = evolve_cell(&ruleset, &cell(0.0), &[&n], &mut rng);
        assert!((out.sigma_flow - 0.3).abs() < 1e-12);
        assert!((out.lambda_sensitivity - 0.1).abs() < 1e-12);
        assert!((out.phi_phase - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_life_birth_and_survival() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let ruleset = Ruleset::new(RuleId::GameOfLife3d);
        let live = cell(1.0);
        let dead = cell(0.0);

        let born = evolve_cell(&ruleset, &dead, &[&live, &live, &live, &dead], &mut rng);
        assert_eq!(born.sigma_flow, 1.0);
        assert!((born.lambda_sensitivity - 0.75).abs() < 1e-12);

        let lonely = evolve_cell(&ruleset, &live, &[&live, &dead], &mut rng);
        assert_eq!(lonely.sigma_flow, 0.0);
        assert_eq!(lonely.state, CellState::Inactive);

        let crowded = evolve_cell(&ruleset, &live, &[&live; 5], &mut rng);
        assert_eq!(crowded.sigma_flow, 0.0);
    }

    #[test]
    fn test_wrap_phase() {
        assert!((wrap_phase(TAU + 0.5) - 0.5).abs() < 1e-12);
        assert!(wrap_phase(-0.1) > 6.0);
        assert!(wrap_phase(TAU) < TAU);
    }
}
