//! Environment cost along lattice edges
//!
//! Obstacle and lane-keeping cost depend only on sample positions, so the
//! sum over an edge is shared by every bin combination evaluated on it.

use crate::common::{LaneFrameLookup, ObstacleField, Point2D};

use super::config::CostConfig;
use super::cost_table::INFEASIBLE;
use super::spiral::PathSamples;

pub struct StaticCostEvaluator<'a, L, O> {
    lane_frame: &'a L,
    obstacles: &'a O,
    config: &'a CostConfig,
}

impl<'a, L, O> StaticCostEvaluator<'a, L, O>
where
    L: LaneFrameLookup,
    O: ObstacleField,
{
    pub fn new(lane_frame: &'a L, obstacles: &'a O, config: &'a CostConfig) -> Self {
        Self {
            lane_frame,
            obstacles,
            config,
        }
    }

    /// Cost of a single position, or `INFEASIBLE` on a lethal cell
    pub fn sample_cost(&self, x: f64, y: f64) -> f64 {
        let config = self.config;
        let point = self.lane_frame.to_lane_frame(Point2D::new(x, y));

        let occupancy = self.obstacles.occupancy(point);
        if occupancy >= config.obstacle_lethal_value {
            return INFEASIBLE;
        }

        let mut cost = 0.0;
        if occupancy > config.obstacle_hazard_threshold {
            cost += config.obstacle_hazard_cost;
        }

        let offset = point.latitude.abs();
        let shoulder = if offset >= config.lane_shoulder_latitude {
            config.lane_shoulder_cost
        } else {
            0.0
        };
        cost + (offset * config.lane_cost_slope).max(shoulder)
    }

    /// Summed cost over all samples; `None` as soon as one is infeasible
    pub fn path_cost(&self, samples: &PathSamples) -> Option<f64> {
        let mut total = 0.0;
        for sample in samples.iter() {
            let cost = self.sample_cost(sample.x, sample.y);
            if cost < 0.0 {
                return None;
            }
            total += cost;
        }
        Some(total)
    }
}
