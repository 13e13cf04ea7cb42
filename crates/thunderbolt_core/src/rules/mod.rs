//! Rule engine: elementary and outer-totalistic automata plus a vetted catalog.
//!
//! The two rule families are independent; callers pick one. Neither touches the
//! Thunderbit lattice, which has its own continuous dynamics in
//! [`crate::dynamics`].

pub mod catalog;
pub mod derived;
pub mod elementary;
pub mod state_grid;
pub mod totalistic;

pub use catalog::{RuleProperty, VettedRule};
pub use derived::{analyze_rule, reversible_step, run_reversible, xor_rule, RuleAnalysis};
pub use elementary::{apply_rule, evolve, wrap_index};
pub use state_grid::StateGrid;
pub use totalistic::{apply_rule_number, encode_table, rule_table};
