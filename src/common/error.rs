//! Error types for lattice_planner

use thiserror::Error;

/// Main error type for the lattice planner.
///
/// Only configuration and input-shape problems are errors. A candidate edge
/// that turns out infeasible is ordinary data and never surfaces here.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Bin breakpoints are not strictly increasing
    #[error("Malformed breakpoints: {0}")]
    MalformedBreakpoints(String),
    /// A path would need more samples than the fixed sample buffer holds
    #[error("Path of length {arc_length} needs {samples} samples, buffer holds {capacity}")]
    SampleBufferOverflow {
        arc_length: f64,
        samples: usize,
        capacity: usize,
    },
    /// Input table does not match the lattice dimensions
    #[error("Table shape mismatch: {0}")]
    TableShape(String),
    /// A converged path record has an unusable arc length
    #[error("Invalid path record: {0}")]
    InvalidPathRecord(String),
    /// Every cell of the final station is infeasible
    #[error("No feasible trajectory: station {station} is fully infeasible")]
    NoFeasibleTrajectory { station: usize },
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
