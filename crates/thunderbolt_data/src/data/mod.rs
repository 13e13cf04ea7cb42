//! Core data structures for the Thunderbolt lattice.

pub mod cell;
pub mod coord;
pub mod metrics;
pub mod ruleset;
