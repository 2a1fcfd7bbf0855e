//! lattice_planner - dynamic-programming sweep over an on-road state lattice
//!
//! This crate evaluates spiral edges between lattice nodes against obstacle,
//! lane and vehicle-dynamics costs and keeps, for every node and
//! (acceleration, velocity, time) bin, the cheapest incoming edge.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod path_planning;

// Re-export common types for convenience
pub use common::{FrenetPoint, LatticePose, Point2D, VehicleState};
pub use common::{LaneFrameLookup, ObstacleField, SampleCostHook};
pub use common::{PlannerError, PlannerResult};
pub use path_planning::state_lattice::{CostTable, PlannerConfig, StateLatticePlanner};
