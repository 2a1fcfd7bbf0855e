//! Common types used throughout lattice_planner

use nalgebra::Vector2;

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

/// Point expressed in the lane frame: distance along the centerline
/// and signed lateral offset from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrenetPoint {
    pub station: f64,
    pub latitude: f64,
}

impl FrenetPoint {
    pub fn new(station: f64, latitude: f64) -> Self {
        Self { station, latitude }
    }
}

/// Pose of a lattice node: position, heading and curvature
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatticePose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub curvature: f64,
}

impl LatticePose {
    pub fn new(x: f64, y: f64, heading: f64, curvature: f64) -> Self {
        Self {
            x,
            y,
            heading,
            curvature,
        }
    }
}

/// Current kinematic state of the ego vehicle.
///
/// `pose.curvature` is the current curvature; the quintic start edge also
/// matches `curvature_rate` and `curvature_acceleration` (per meter).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleState {
    pub pose: LatticePose,
    pub speed: f64,
    pub curvature_rate: f64,
    pub curvature_acceleration: f64,
}

impl VehicleState {
    pub fn new(pose: LatticePose, speed: f64) -> Self {
        Self {
            pose,
            speed,
            curvature_rate: 0.0,
            curvature_acceleration: 0.0,
        }
    }

    pub fn with_curvature_derivatives(mut self, rate: f64, acceleration: f64) -> Self {
        self.curvature_rate = rate;
        self.curvature_acceleration = acceleration;
        self
    }
}
