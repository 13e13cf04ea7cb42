//! # Thunderbolt Runner
//!
//! Async tick loops for the lattice engine. Each run lives in its own tokio
//! task, emits through a [`Sink`], and ticks either on its own timer or on the
//! `Hold` phase of a shared [`PhaseClock`].

pub mod clock;
pub mod error;
pub mod registry;
pub mod runner;
pub mod sink;

pub use clock::{ClockEvent, ClockPhase, PhaseClock};
pub use error::{Result, RunnerError};
pub use registry::RunRegistry;
pub use runner::{
    spawn, RunSummary, RunnerCommand, RunnerHandle, RunnerState, SchedulingMode, StopReason,
    TickReport,
};
pub use sink::{spawn_sink_task, CollectingSink, Emission, NullSink, Sink, SINK_QUEUE_DEPTH};
