//! Configuration for the lattice dynamic-programming sweep
//!
//! All parameters carry defaults tuned for on-road driving at urban speeds.
//! The whole bundle can be loaded from JSON; missing fields fall back to
//! their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{PlannerError, PlannerResult};

/// Number of acceleration bins per lattice node
pub const NUM_ACCELERATION_BINS: usize = 8;
/// Number of velocity bins per lattice node
pub const NUM_VELOCITY_BINS: usize = 4;
/// Number of time bins per lattice node
pub const NUM_TIME_BINS: usize = 2;
/// DP cells per lattice node
pub const NUM_BINS: usize = NUM_ACCELERATION_BINS * NUM_VELOCITY_BINS * NUM_TIME_BINS;
/// Capacity of the fixed path sample buffer
pub const MAX_PATH_SAMPLES: usize = 128;

/// Lattice dimensions and connectivity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Number of stations along the corridor
    pub num_stations: usize,
    /// Number of latitudes per station
    pub num_latitudes: usize,
    /// How many stations back a node may connect
    pub station_connectivity: usize,
    /// Width of the symmetric latitude window (odd)
    pub latitude_connectivity: usize,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            num_stations: 10,
            num_latitudes: 11,
            station_connectivity: 3,
            latitude_connectivity: 5,
        }
    }
}

impl LatticeConfig {
    /// Half width of the latitude window
    pub fn latitude_half_window(&self) -> usize {
        self.latitude_connectivity / 2
    }
}

/// Static and dynamic cost weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Arc-length step between path samples [m]
    pub sampling_step: f64,
    /// Occupancy above which the hazard cost applies
    pub obstacle_hazard_threshold: f64,
    pub obstacle_hazard_cost: f64,
    /// Occupancy value meaning "fully occupied"
    pub obstacle_lethal_value: f64,
    /// Lane cost per meter of lateral offset
    pub lane_cost_slope: f64,
    /// Lateral offset from which the shoulder cost applies [m]
    pub lane_shoulder_latitude: f64,
    pub lane_shoulder_cost: f64,
    /// Cost weight of the cubic edge from the vehicle pose, scaled by v^2
    pub base_cubic_cost: f64,
    /// [m/s]
    pub speed_limit: f64,
    pub speed_limit_penalty: f64,
    pub hard_acceleration_penalty: f64,
    pub hard_deceleration_penalty: f64,
    /// [m/s^2]
    pub lateral_acceleration_limit: f64,
    pub soft_lateral_acceleration_penalty: f64,
    pub linear_lateral_acceleration_penalty: f64,
    /// Maximum rate of change of curvature over time [1/(m*s)]
    pub d_curvature_max: f64,
    /// Speed floor used for propagation [m/s]
    pub min_speed: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            sampling_step: 0.5,
            obstacle_hazard_threshold: 0.5,
            obstacle_hazard_cost: 200.0,
            obstacle_lethal_value: 1.0,
            lane_cost_slope: 5.0,
            lane_shoulder_latitude: 3.7 / 2.0 - 0.5,
            lane_shoulder_cost: 5.0,
            base_cubic_cost: 1.0,
            speed_limit: 20.0,
            speed_limit_penalty: 200.0,
            hard_acceleration_penalty: 100.0,
            hard_deceleration_penalty: 100.0,
            lateral_acceleration_limit: 3.0,
            soft_lateral_acceleration_penalty: 100.0,
            linear_lateral_acceleration_penalty: 10.0,
            d_curvature_max: 0.5,
            min_speed: 0.05,
        }
    }
}

/// Acceleration profiles and the velocity/time discretization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    /// `[hard max, hard min, soft max, soft min, zero]` [m/s^2]
    pub acceleration_profiles: [f64; 5],
    /// Target final speeds for the last three acceleration bins [m/s]
    pub final_velocity_profiles: [f64; 3],
    /// Velocity bin breakpoints [m/s]
    pub velocity_ranges: [f64; NUM_VELOCITY_BINS + 1],
    /// Time bin breakpoints [s]
    pub time_ranges: [f64; NUM_TIME_BINS + 1],
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        let speed_limit = CostConfig::default().speed_limit;
        Self {
            acceleration_profiles: [3.5, -6.5, 2.0, -3.0, 0.0],
            final_velocity_profiles: [0.999 * speed_limit, 1.0, 0.01],
            velocity_ranges: [
                0.0,
                speed_limit / 3.0,
                speed_limit * 2.0 / 3.0,
                speed_limit,
                1_000_000.0,
            ],
            time_ranges: [0.0, 10.0, 1_000_000.0],
        }
    }
}

impl DynamicsConfig {
    pub fn hard_max_acceleration(&self) -> f64 {
        self.acceleration_profiles[0]
    }

    pub fn hard_min_acceleration(&self) -> f64 {
        self.acceleration_profiles[1]
    }

    pub fn soft_max_acceleration(&self) -> f64 {
        self.acceleration_profiles[2]
    }

    pub fn soft_min_acceleration(&self) -> f64 {
        self.acceleration_profiles[3]
    }

    /// Half-open velocity range `[lo, hi)` of a velocity bin
    pub fn velocity_range(&self, bin: usize) -> (f64, f64) {
        (self.velocity_ranges[bin], self.velocity_ranges[bin + 1])
    }

    /// Half-open time range `[lo, hi)` of a time bin
    pub fn time_range(&self, bin: usize) -> (f64, f64) {
        (self.time_ranges[bin], self.time_ranges[bin + 1])
    }
}

/// Full configuration bundle for a planning cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub lattice: LatticeConfig,
    pub cost: CostConfig,
    pub dynamics: DynamicsConfig,
}

impl PlannerConfig {
    pub fn from_json_str(json: &str) -> PlannerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Number of samples a path of the given length is sampled into.
    ///
    /// Saturates at `usize::MAX` for unbounded lengths.
    pub fn sample_count(&self, arc_length: f64) -> usize {
        ((arc_length / self.cost.sampling_step).ceil() as usize).saturating_add(1)
    }

    /// Non-negative weights of the cost terms
    fn cost_weights(&self) -> [(&'static str, f64); 9] {
        let cost = &self.cost;
        [
            ("obstacle_hazard_cost", cost.obstacle_hazard_cost),
            ("lane_cost_slope", cost.lane_cost_slope),
            ("lane_shoulder_cost", cost.lane_shoulder_cost),
            ("base_cubic_cost", cost.base_cubic_cost),
            ("speed_limit_penalty", cost.speed_limit_penalty),
            ("hard_acceleration_penalty", cost.hard_acceleration_penalty),
            ("hard_deceleration_penalty", cost.hard_deceleration_penalty),
            (
                "soft_lateral_acceleration_penalty",
                cost.soft_lateral_acceleration_penalty,
            ),
            (
                "linear_lateral_acceleration_penalty",
                cost.linear_lateral_acceleration_penalty,
            ),
        ]
    }

    /// Check the configuration before a sweep.
    ///
    /// `max_arc_length` is the longest converged edge in the input tables;
    /// it must fit into the fixed sample buffer.
    pub fn validate(&self, max_arc_length: f64) -> PlannerResult<()> {
        let lattice = &self.lattice;
        if lattice.num_stations == 0 || lattice.num_latitudes == 0 {
            return Err(PlannerError::InvalidConfig(
                "lattice must have at least one station and one latitude".to_string(),
            ));
        }
        // Parent references are stored as i32 cell indices
        let cells = lattice
            .num_stations
            .checked_mul(lattice.num_latitudes)
            .and_then(|n| n.checked_mul(NUM_BINS));
        if !matches!(cells, Some(n) if n <= i32::MAX as usize) {
            return Err(PlannerError::InvalidConfig(format!(
                "{}x{} lattice exceeds the addressable cell count",
                lattice.num_stations, lattice.num_latitudes
            )));
        }
        if lattice.station_connectivity == 0 {
            return Err(PlannerError::InvalidConfig(
                "station_connectivity must be >= 1".to_string(),
            ));
        }
        if lattice.latitude_connectivity % 2 == 0 {
            return Err(PlannerError::InvalidConfig(format!(
                "latitude_connectivity must be odd, got {}",
                lattice.latitude_connectivity
            )));
        }
        if !(self.cost.sampling_step > 0.0) {
            return Err(PlannerError::InvalidConfig(
                "sampling_step must be positive".to_string(),
            ));
        }
        if !(self.cost.min_speed > 0.0) {
            return Err(PlannerError::InvalidConfig(
                "min_speed must be positive".to_string(),
            ));
        }

        if let Some((name, value)) = self
            .cost_weights()
            .into_iter()
            .find(|(_, value)| !(value.is_finite() && *value >= 0.0))
        {
            return Err(PlannerError::InvalidConfig(format!(
                "{} must be finite and non-negative, got {}",
                name, value
            )));
        }

        let dynamics = &self.dynamics;
        if !(dynamics.hard_min_acceleration() <= dynamics.soft_min_acceleration()
            && dynamics.soft_min_acceleration() <= 0.0
            && 0.0 <= dynamics.soft_max_acceleration()
            && dynamics.soft_max_acceleration() <= dynamics.hard_max_acceleration())
        {
            return Err(PlannerError::InvalidConfig(format!(
                "acceleration profiles must satisfy hard min <= soft min <= 0 <= soft max <= hard max: {:?}",
                dynamics.acceleration_profiles
            )));
        }

        check_breakpoints("velocity_ranges", &self.dynamics.velocity_ranges)?;
        check_breakpoints("time_ranges", &self.dynamics.time_ranges)?;

        if !(max_arc_length.is_finite() && max_arc_length >= 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "longest converged edge must have a finite length, got {}",
                max_arc_length
            )));
        }
        let samples = self.sample_count(max_arc_length);
        if samples > MAX_PATH_SAMPLES {
            return Err(PlannerError::SampleBufferOverflow {
                arc_length: max_arc_length,
                samples,
                capacity: MAX_PATH_SAMPLES,
            });
        }

        Ok(())
    }
}

fn check_breakpoints(name: &str, breakpoints: &[f64]) -> PlannerResult<()> {
    if breakpoints[0] < 0.0 {
        return Err(PlannerError::MalformedBreakpoints(format!(
            "{} must start at a non-negative value",
            name
        )));
    }
    if breakpoints.windows(2).any(|w| !(w[0] < w[1])) {
        return Err(PlannerError::MalformedBreakpoints(format!(
            "{} must be strictly increasing: {:?}",
            name, breakpoints
        )));
    }
    Ok(())
}
