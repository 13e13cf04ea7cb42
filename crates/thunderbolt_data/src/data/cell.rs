use super::coord::Coord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete activity class of a cell, derived from its flow and sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    Inactive,
    Dormant,
    Stable,
    Active,
    Chaotic,
}

impl CellState {
    /// All states in ascending activity order.
    pub const ALL: [CellState; 5] = [
        CellState::Inactive,
        CellState::Dormant,
        CellState::Stable,
        CellState::Active,
        CellState::Chaotic,
    ];

    /// Quiescent states do not count towards Langton's λ̂.
    #[must_use]
    pub fn is_quiescent(self) -> bool {
        matches!(self, CellState::Inactive | CellState::Dormant)
    }

    /// Position of the state inside [`CellState::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellState::Inactive => "inactive",
            CellState::Dormant => "dormant",
            CellState::Stable => "stable",
            CellState::Active => "active",
            CellState::Chaotic => "chaotic",
        };
        f.write_str(name)
    }
}

/// Categorical per-cell tag used by the algotype overlay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Doctrine(pub String);

impl Doctrine {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Doctrine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single lattice cell.
///
/// Cells are values: a step never edits one in place, it produces a new
/// `Thunderbit` for the next tick's map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thunderbit {
    pub state: CellState,
    /// Normalised activity in `[0, 1]`.
    pub sigma_flow: f64,
    /// Oscillator phase in `[0, 2π)`.
    pub phi_phase: f64,
    /// Sensitivity to neighbour perturbations in `[0, 1]`.
    pub lambda_sensitivity: f64,
    pub tick: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctrine: Option<Doctrine>,
}

impl Default for Thunderbit {
    fn default() -> Self {
        Self {
            state: CellState::Inactive,
            sigma_flow: 0.0,
            phi_phase: 0.0,
            lambda_sensitivity: 0.0,
            tick: 0,
            doctrine: None,
        }
    }
}

/// Per-cell emission for one tick.
///
/// Carries everything needed to rebuild the cell plus its location, and is the
/// sole input of the analytics layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDelta {
    pub id: u64,
    pub coord: Coord,
    pub state: CellState,
    pub sigma_flow: f64,
    pub phi_phase: f64,
    pub lambda_sensitivity: f64,
    pub energy: f64,
    pub tick: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctrine: Option<Doctrine>,
}

impl CellDelta {
    /// Builds the delta describing `cell` at `coord` inside `bounds`.
    #[must_use]
    pub fn from_cell(coord: Coord, bounds: Coord, cell: &Thunderbit) -> Self {
        Self {
            id: coord.linear_index(bounds),
            coord,
            state: cell.state,
            sigma_flow: cell.sigma_flow,
            phi_phase: cell.phi_phase,
            lambda_sensitivity: cell.lambda_sensitivity,
            energy: cell.sigma_flow * cell.sigma_flow,
            tick: cell.tick,
            doctrine: cell.doctrine.clone(),
        }
    }

    /// Rebuilds the cell this delta describes.
    #[must_use]
    pub fn to_cell(&self) -> Thunderbit {
        Thunderbit {
            state: self.state,
            sigma_flow: self.sigma_flow,
            phi_phase: self.phi_phase,
            lambda_sensitivity: self.lambda_sensitivity,
            tick: self.tick,
            doctrine: self.doctrine.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiescent_set() {
        let quiescent: Vec<_> = CellState::ALL
            .iter()
            .filter(|s| s.is_quiescent())
            .collect();
        assert_eq!(quiescent, vec![&CellState::Inactive, &CellState::Dormant]);
    }

    #[test]
    fn test_delta_round_trips_cell() {
        let cell = Thunderbit {
            state: CellState::Active,
            sigma_flow: 0.9,
            phi_phase: 1.0,
            lambda_sensitivity: 0.2,
            tick: 7,
            doctrine: Some(Doctrine::new("order")),
        };
        let bounds = Coord::new(3, 3, 1);
        let delta = CellDelta::from_cell(Coord::new(2, 1, 0), bounds, &cell);
        assert_eq!(delta.id, 5);
        assert!((delta.energy - 0.81).abs() < 1e-12);
        assert_eq!(delta.to_cell(), cell);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&CellState::Chaotic).unwrap();
        assert_eq!(json, "\"chaotic\"");
    }
}
