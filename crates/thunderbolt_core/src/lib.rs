//! # Thunderbolt Core
//!
//! Simulation and analysis engine for a 3D cellular-automaton lattice.
//!
//! This crate contains:
//! - Neighbourhood topologies and boundary handling
//! - Elementary and outer-totalistic rule engines with a vetted rule catalog
//! - The Thunderbit lattice and its parallel stepper
//! - Criticality (edge-of-chaos) and side-quest analyzers
//! - Noise injection with adaptive σ
//! - Configuration, tick metrics and structured logging
//!
//! ## Determinism
//!
//! Every random draw goes through a `ChaCha8Rng` seeded from the run seed, the
//! tick and (for per-cell noise) the cell index, so a run replays exactly for a
//! fixed seed regardless of how rayon schedules the cells.
//!
//! ## Example
//!
//! ```
//! use thunderbolt_core::lattice::{Grid, Lattice};
//! use thunderbolt_core::stepper::step;
//! use thunderbolt_data::{Coord, RuleId, Ruleset};
//!
//! let lattice = Lattice::random(Coord::new(8, 8, 8), 42, 0.3).unwrap();
//! let outcome = step(&Grid::Lattice(lattice), &Ruleset::new(RuleId::Diffusion), 42).unwrap();
//! assert_eq!(outcome.grid.tick(), 1);
//! assert_eq!(outcome.deltas.len(), 512);
//! ```

/// Configuration management for simulation parameters
pub mod config;
/// Edge-of-chaos metrics: PLV, permutation entropy, λ̂, Lyapunov
pub mod criticality;
/// Per-cell continuous dynamics
pub mod dynamics;
/// Error types
pub mod error;
/// Bounded history ring of tick frames
pub mod history;
/// Sparse Thunderbit lattice and legacy grid
pub mod lattice;
/// Tick metrics collection and logging
pub mod metrics;
/// Neighbour topologies, boundaries and distances
pub mod neighborhood;
/// Noise injection
pub mod perturbation;
/// Elementary and outer-totalistic rule engines
pub mod rules;
/// Clustering, sortedness, healing and doctrine overlay
pub mod sidequest;
/// One-tick lattice evolution
pub mod stepper;

pub use config::SimConfig;
pub use criticality::CriticalityAnalyzer;
pub use error::{AnalysisError, LatticeError, PerturbationError, RuleError};
pub use history::{HistoryFrame, MetricsHistory};
pub use lattice::{Grid, Lattice, LegacyGrid};
pub use metrics::TickMetrics;
pub use perturbation::{CriticalityFeedback, Perturber, SigmaFeedback};
pub use sidequest::SideQuestAnalyzer;
pub use stepper::{extract_features, step, FeatureVector, StepOutcome};
