//! # Thunderbolt Data
//!
//! Plain value types shared by the lattice engine, the analyzers and the runner.
//! Nothing in here knows how to step a lattice; it only describes what a lattice,
//! a ruleset and a metrics snapshot look like on the wire.

pub mod data;

pub use data::cell::{CellDelta, CellState, Doctrine, Thunderbit};
pub use data::coord::Coord;
pub use data::metrics::{
    CriticalityMetrics, LocalMetrics, MetricsSnapshot, SideQuestMetrics, Zone,
};
pub use data::ruleset::{BoundaryCondition, NeighborhoodType, RuleId, Ruleset, TuningParams};
