//! Error types for thunderbolt_runner.

use thiserror::Error;
use thunderbolt_core::LatticeError;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RunnerError {
    /// No live run carries this id
    #[error("Unknown run: {0}")]
    UnknownRun(Uuid),

    /// The run task has already exited
    #[error("Run {0} is no longer accepting commands")]
    ChannelClosed(Uuid),

    /// Building the initial grid failed
    #[error("Lattice error: {0}")]
    Lattice(#[from] LatticeError),

    /// The run task panicked or was aborted
    #[error("Run task failed: {0}")]
    Task(String),
}

/// Result type alias for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use thunderbolt_data::Coord;

    #[test]
    fn test_error_display() {
        let id = Uuid::nil();
        assert_eq!(
            RunnerError::UnknownRun(id).to_string(),
            format!("Unknown run: {id}")
        );
        let err: RunnerError = LatticeError::InvalidBounds(Coord::new(0, 1, 1)).into();
        assert!(err.to_string().starts_with("Lattice error"));
    }
}
