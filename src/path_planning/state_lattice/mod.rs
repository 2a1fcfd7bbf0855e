//! State Lattice Planner Module
//!
//! Dynamic-programming sweep over a road-aligned state lattice. Each
//! lattice node carries 64 DP cells indexed by (acceleration, velocity,
//! time) bin; the sweep picks the cheapest incoming edge for every cell,
//! station by station, and records it in a [`CostTable`].
//!
//! # Components
//!
//! - `config`: lattice dimensions, cost weights and dynamics discretization
//! - `spiral`: curvature polynomials and fixed-capacity path sampling
//! - `tables`: precomputed lattice poses and edge parameters
//! - `static_cost`: obstacle and lane cost of a sampled path
//! - `dynamics`: acceleration bins, speed propagation and dynamic cost
//! - `selector`: best incoming edge of a single DP cell
//! - `cost_table`: per-station DP results and parent encoding
//! - `state_lattice_planner`: the sweep itself
//!
//! # Example
//!
//! ```no_run
//! use lattice_planner::path_planning::state_lattice::{
//!     CubicPathTable, LatticeInputs, LatticePoseTable, PlannerConfig, StateLatticePlanner,
//!     VehicleEdgeTable,
//! };
//! use lattice_planner::common::{LatticePose, VehicleState};
//! use lattice_planner::utils::{ObstacleGrid, StraightLaneFrame};
//!
//! let config = PlannerConfig::default();
//! let lattice = &config.lattice;
//! let poses = LatticePoseTable::from_fn(lattice.num_stations, lattice.num_latitudes, |s, l| {
//!     LatticePose::new(10.0 * (s + 1) as f64, l as f64 - 5.0, 0.0, 0.0)
//! });
//! let cubic_paths = CubicPathTable::new(lattice);
//! let vehicle_cubic = VehicleEdgeTable::new(lattice.num_stations, lattice.num_latitudes);
//! let vehicle_quintic = VehicleEdgeTable::new(lattice.num_stations, lattice.num_latitudes);
//! let inputs = LatticeInputs {
//!     poses: &poses,
//!     cubic_paths: &cubic_paths,
//!     vehicle_cubic: &vehicle_cubic,
//!     vehicle_quintic: &vehicle_quintic,
//!     vehicle: VehicleState::new(LatticePose::default(), 10.0),
//! };
//!
//! let obstacles = ObstacleGrid::empty(120.0, 12.0, 0.5, 0.0, -6.0).unwrap();
//! let planner = StateLatticePlanner::new(config.clone(), StraightLaneFrame::default(), obstacles);
//! match planner.plan(&inputs) {
//!     Ok(table) => println!("best: {:?}", table.best_cell(lattice.num_stations - 1)),
//!     Err(e) => println!("planning failed: {}", e),
//! }
//! ```

pub mod config;
pub mod cost_table;
pub mod dynamics;
pub mod selector;
pub mod spiral;
pub mod state_lattice_planner;
pub mod static_cost;
pub mod tables;

// Re-exports
pub use config::{
    CostConfig, DynamicsConfig, LatticeConfig, PlannerConfig, MAX_PATH_SAMPLES,
    NUM_ACCELERATION_BINS, NUM_BINS, NUM_TIME_BINS, NUM_VELOCITY_BINS,
};
pub use cost_table::{
    bin_index, split_bin_index, CellState, CostTable, DpCell, ParentRef, INFEASIBLE,
};
pub use dynamics::{acceleration_for_bin, propagate, DynamicCostEvaluator, FinalState};
pub use selector::{LatticeInputs, SweepContext};
pub use spiral::{sample_path, CurvaturePolynomial, PathSample, PathSamples};
pub use state_lattice_planner::StateLatticePlanner;
pub use static_cost::StaticCostEvaluator;
pub use tables::{
    CubicPathParams, CubicPathTable, LatticePoseTable, PathRecord, QuinticPathParams,
    VehicleEdgeTable,
};
