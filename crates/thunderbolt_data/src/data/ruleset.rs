use serde::{Deserialize, Serialize};
use std::fmt;

/// Local dynamics applied by the stepper.
///
/// Parsed leniently: any identifier the engine does not know falls back to
/// [`RuleId::Demo`], so an operator typo never stops a live run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleId {
    #[default]
    Demo,
    Diffusion,
    GameOfLife3d,
}

impl RuleId {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "demo" => RuleId::Demo,
            "diffusion" => RuleId::Diffusion,
            "game_of_life_3d" | "gol3d" | "life3d" => RuleId::GameOfLife3d,
            _ => RuleId::Demo,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RuleId::Demo => "demo",
            RuleId::Diffusion => "diffusion",
            RuleId::GameOfLife3d => "game_of_life_3d",
        }
    }
}

impl From<String> for RuleId {
    fn from(name: String) -> Self {
        RuleId::from_name(&name)
    }
}

impl From<RuleId> for String {
    fn from(rule: RuleId) -> Self {
        rule.name().to_string()
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Neighbour topology with an explicit radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NeighborhoodType {
    /// Offsets within Manhattan distance `radius`.
    VonNeumann { radius: u32 },
    /// Offsets within Chebyshev distance `radius`.
    Moore { radius: u32 },
}

impl NeighborhoodType {
    /// The 6 face neighbours.
    pub const VON_NEUMANN: NeighborhoodType = NeighborhoodType::VonNeumann { radius: 1 };
    /// The 26 surrounding cells.
    pub const MOORE: NeighborhoodType = NeighborhoodType::Moore { radius: 1 };

    #[must_use]
    pub fn radius(self) -> u32 {
        match self {
            NeighborhoodType::VonNeumann { radius } | NeighborhoodType::Moore { radius } => radius,
        }
    }
}

impl Default for NeighborhoodType {
    fn default() -> Self {
        NeighborhoodType::VON_NEUMANN
    }
}

/// How coordinates falling outside the lattice box are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCondition {
    #[default]
    Clip,
    Periodic,
    Reflect,
}

/// Operator-adjustable knobs merged into the ruleset between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TuningParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupling: Option<f64>,
}

impl TuningParams {
    /// Overwrites every field that `update` sets; fields it leaves unset are kept.
    pub fn merge(&mut self, update: &TuningParams) {
        if update.lambda.is_some() {
            self.lambda = update.lambda;
        }
        if update.temperature.is_some() {
            self.temperature = update.temperature;
        }
        if update.coupling.is_some() {
            self.coupling = update.coupling;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lambda.is_none() && self.temperature.is_none() && self.coupling.is_none()
    }
}

/// Everything the stepper needs to know about how cells evolve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ruleset {
    pub rule_id: RuleId,
    #[serde(default)]
    pub neighborhood_type: NeighborhoodType,
    #[serde(default)]
    pub boundary_condition: BoundaryCondition,
    #[serde(default)]
    pub tuning: TuningParams,
}

impl Ruleset {
    #[must_use]
    pub fn new(rule_id: RuleId) -> Self {
        Self {
            rule_id,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_neighborhood(mut self, neighborhood_type: NeighborhoodType) -> Self {
        self.neighborhood_type = neighborhood_type;
        self
    }

    #[must_use]
    pub fn with_boundary(mut self, boundary_condition: BoundaryCondition) -> Self {
        self.boundary_condition = boundary_condition;
        self
    }

    /// Returns a copy with `update` merged into the tuning parameters.
    #[must_use]
    pub fn tuned(mut self, update: &TuningParams) -> Self {
        self.tuning.merge(update);
        self
    }
}
