//! Common traits defining the collaborators of the lattice search

use crate::common::types::*;

/// Maps world positions into the lane frame
pub trait LaneFrameLookup {
    /// Convert a world position to (station, latitude) along the lane
    fn to_lane_frame(&self, position: Point2D) -> FrenetPoint;
}

/// Dilated obstacle occupancy over lane-frame coordinates
pub trait ObstacleField {
    /// Occupancy in `[0, 1]`; values at or above the configured lethal value block the cell
    fn occupancy(&self, point: FrenetPoint) -> f64;
}

/// Per-sample dynamic cost term.
///
/// Receives the sample's curvature and the instantaneous speed there.
/// A negative return value marks the whole candidate infeasible.
pub trait SampleCostHook {
    fn sample_cost(&self, curvature: f64, speed: f64) -> f64;
}

/// Hook contributing the same cost at every sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantSampleCost(pub f64);

impl Default for ConstantSampleCost {
    fn default() -> Self {
        Self(1.0)
    }
}

impl SampleCostHook for ConstantSampleCost {
    fn sample_cost(&self, _curvature: f64, _speed: f64) -> f64 {
        self.0
    }
}

impl<F> SampleCostHook for F
where
    F: Fn(f64, f64) -> f64,
{
    fn sample_cost(&self, curvature: f64, speed: f64) -> f64 {
        self(curvature, speed)
    }
}
