//! Named outer-totalistic rules with known dynamical behaviour.
//!
//! All entries are binary (`k = 2`) over an 8-neighbour (2D Moore) sum, so each
//! rule number indexes a 34-entry table.

use crate::error::RuleError;
use serde::Serialize;
use std::fmt;

/// Qualitative tags attached to catalog rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleProperty {
    Reversible,
    Chaotic,
    Periodic,
    Linear,
    Additive,
}

impl fmt::Display for RuleProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleProperty::Reversible => "reversible",
            RuleProperty::Chaotic => "chaotic",
            RuleProperty::Periodic => "periodic",
            RuleProperty::Linear => "linear",
            RuleProperty::Additive => "additive",
        };
        f.write_str(name)
    }
}

/// A vetted catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VettedRule {
    pub name: &'static str,
    pub rule_number: u64,
    /// Number of cell states.
    pub k: u32,
    /// Number of neighbours summed.
    pub r: u32,
    pub description: &'static str,
    pub properties: &'static [RuleProperty],
}

impl VettedRule {
    #[must_use]
    pub fn has(&self, property: RuleProperty) -> bool {
        self.properties.contains(&property)
    }
}

pub const VETTED_RULES: [VettedRule; 4] = [
    VettedRule {
        name: "reversible_chaotic",
        rule_number: 17_157_193_900,
        k: 2,
        r: 8,
        description: "center XOR [sum in {2,3,5,7}]; invertible per sum bucket, \
                      mixes quickly from sparse seeds",
        properties: &[RuleProperty::Reversible, RuleProperty::Chaotic],
    },
    VettedRule {
        name: "period_doubling",
        rule_number: 17_177_772_047,
        k: 2,
        r: 8,
        description: "flips the center while fewer than 4 neighbours are set, \
                      otherwise holds; sparse regions blink with period 2",
        properties: &[RuleProperty::Reversible, RuleProperty::Periodic],
    },
    VettedRule {
        name: "xor_linear",
        rule_number: 5_726_579_370,
        k: 2,
        r: 8,
        description: "parity of the neighbour sum, ignoring the center; \
                      linear over GF(2)",
        properties: &[RuleProperty::Linear, RuleProperty::Additive],
    },
    VettedRule {
        name: "rule_150_analog",
        rule_number: 11_453_246_122,
        k: 2,
        r: 8,
        description: "parity of center plus neighbour sum, the 2D analogue of \
                      elementary rule 150",
        properties: &[
            RuleProperty::Linear,
            RuleProperty::Additive,
            RuleProperty::Reversible,
        ],
    },
];

/// Every vetted rule, in catalog order.
#[must_use]
pub fn all() -> &'static [VettedRule] {
    &VETTED_RULES
}

/// Looks a rule up by name.
pub fn lookup(name: &str) -> Result<&'static VettedRule, RuleError> {
    VETTED_RULES
        .iter()
        .find(|rule| rule.name == name)
        .ok_or_else(|| RuleError::unknown_rule(name))
}

/// Looks a rule up by number.
pub fn by_number(rule_number: u64) -> Result<&'static VettedRule, RuleError> {
    VETTED_RULES
        .iter()
        .find(|rule| rule.rule_number == rule_number)
        .ok_or(RuleError::UnknownRuleNumber(u128::from(rule_number)))
}
