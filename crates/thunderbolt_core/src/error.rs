//! Error types for thunderbolt_core.
//!
//! Input errors (unknown rules, malformed rulesets, bad geometry) are returned
//! as values so a live simulation survives one bad configuration. Numeric
//! degeneracies never show up here: they resolve to neutral metric values.

use thiserror::Error;

/// Errors raised by the rule engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// No catalog entry carries this name
    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    /// No catalog entry carries this rule number
    #[error("Unknown rule number: {0}")]
    UnknownRuleNumber(u128),

    /// Rule number has more digits than the lookup table has entries
    #[error("Rule number {rule_number} out of range for a table of {table_size} entries")]
    RuleNumberOutOfRange { rule_number: u128, table_size: usize },

    /// State count or neighbour count the encoding cannot express
    #[error("Invalid rule parameters: {0}")]
    InvalidParameters(String),

    /// Cell values outside `0..k`, mismatched frames and similar
    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

impl RuleError {
    #[must_use]
    pub fn unknown_rule<S: Into<String>>(name: S) -> Self {
        Self::UnknownRule(name.into())
    }

    #[must_use]
    pub fn invalid_parameters<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameters(msg.into())
    }

    #[must_use]
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedInput(msg.into())
    }
}

/// Errors raised while building or stepping a lattice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LatticeError {
    #[error("Lattice bounds must be positive on every axis, got {0}")]
    InvalidBounds(thunderbolt_data::Coord),

    #[error("Coordinate {coord} lies outside bounds {bounds}")]
    OutOfBounds {
        coord: thunderbolt_data::Coord,
        bounds: thunderbolt_data::Coord,
    },

    /// Neighbourhood radius larger than the lattice can use
    #[error("Neighbourhood radius {radius} exceeds the limit of {limit} for these bounds")]
    RadiusTooLarge { radius: u32, limit: u32 },
}

/// Errors raised by the perturbation layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PerturbationError {
    #[error("Invalid layer configuration: {0}")]
    InvalidLayers(String),
}

/// Errors raised by the analytics layer.
///
/// The runner treats any of these as "skip emission this tick".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Metric {metric} is not finite ({value})")]
    NonFinite { metric: &'static str, value: f64 },

    #[error("Analysis failed: {0}")]
    Failed(String),
}

impl AnalysisError {
    /// Passes `value` through when it is finite.
    pub fn check(metric: &'static str, value: f64) -> Result<f64, AnalysisError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::NonFinite { metric, value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuleError::unknown_rule("glider_gun");
        assert_eq!(err.to_string(), "Unknown rule: glider_gun");
    }

    #[test]
    fn test_check_rejects_nan() {
        assert!(AnalysisError::check("plv", 0.4).is_ok());
        let err = AnalysisError::check("plv", f64::NAN).unwrap_err();
        assert!(err.to_string().contains("plv"));
        assert!(AnalysisError::check("entropy", f64::INFINITY).is_err());
    }
}
