//! Thunderbolt: a 3D cellular-automaton lattice with edge-of-chaos metrics.
//!
//! The engine lives in `thunderbolt_core`, the async tick loop in
//! `thunderbolt_runner`. This crate re-exports both and adds the sinks used by
//! the command-line binary.

pub mod sink;

pub use thunderbolt_core as engine;
pub use thunderbolt_data as data;
pub use thunderbolt_runner as runner;

pub use sink::{JsonLinesSink, TracingSink};
pub use thunderbolt_core::{Grid, Lattice, SimConfig};
pub use thunderbolt_runner::{RunRegistry, RunnerState, Sink};
