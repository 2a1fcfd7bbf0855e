//! Kinematic feasibility and comfort cost of a lattice edge
//!
//! Speed is propagated along the sampled path under a constant
//! acceleration. Final speed and elapsed time are computed in closed form
//! so a candidate can be matched to its velocity/time bin before any
//! sampling work is spent on it.

use crate::common::SampleCostHook;

use super::config::{CostConfig, DynamicsConfig};
use super::spiral::PathSamples;

/// Acceleration applied on an edge for a destination acceleration bin.
///
/// Bins 0..=4 use the fixed profiles. Bins 5..=7 aim for a target final
/// speed over the edge, clamped to the hard acceleration limits.
pub fn acceleration_for_bin(
    accel_bin: usize,
    initial_speed: f64,
    arc_length: f64,
    dynamics: &DynamicsConfig,
) -> f64 {
    let profiles = &dynamics.acceleration_profiles;
    if accel_bin < profiles.len() {
        return profiles[accel_bin];
    }

    let target = dynamics.final_velocity_profiles[accel_bin - profiles.len()];
    let acceleration = (target * target - initial_speed * initial_speed) / (2.0 * arc_length);
    acceleration
        .max(dynamics.hard_min_acceleration())
        .min(dynamics.hard_max_acceleration())
}

/// Speed and time at the end of an edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalState {
    pub speed: f64,
    pub elapsed: f64,
}

/// Closed-form end state after `length` meters at constant `acceleration`.
///
/// Speeds are floored at `min_speed`. When the vehicle would slow below the
/// floor before the end, the edge is split into a braking segment down to
/// the floor and a crawl at the floor for the remaining distance.
pub fn propagate(initial_speed: f64, acceleration: f64, length: f64, min_speed: f64) -> FinalState {
    if acceleration == 0.0 {
        let speed = initial_speed.max(min_speed);
        return FinalState {
            speed,
            elapsed: length / speed,
        };
    }

    let final_speed_sq = 2.0 * acceleration * length + initial_speed * initial_speed;
    let speed = final_speed_sq.max(0.0).sqrt().max(min_speed);

    let elapsed = if final_speed_sq <= min_speed * min_speed {
        if acceleration < 0.0 {
            let start = initial_speed.max(min_speed);
            let braking_time = (min_speed - start) / acceleration;
            let braking_distance = (min_speed * min_speed - start * start) / (2.0 * acceleration);
            braking_time + (length - braking_distance).max(0.0) / min_speed
        } else {
            length / min_speed
        }
    } else {
        2.0 * length / (initial_speed + speed)
    };

    FinalState { speed, elapsed }
}

/// Accumulates the speed-dependent part of an edge's cost
pub struct DynamicCostEvaluator<'a, H> {
    cost: &'a CostConfig,
    dynamics: &'a DynamicsConfig,
    hook: &'a H,
}

impl<'a, H: SampleCostHook> DynamicCostEvaluator<'a, H> {
    pub fn new(cost: &'a CostConfig, dynamics: &'a DynamicsConfig, hook: &'a H) -> Self {
        Self {
            cost,
            dynamics,
            hook,
        }
    }

    /// Summed per-sample cost plus once-per-edge penalties.
    ///
    /// `None` if the curvature can't be tracked at the propagated speed or
    /// the sample hook reports a negative cost.
    pub fn evaluate(
        &self,
        samples: &PathSamples,
        initial_speed: f64,
        acceleration: f64,
    ) -> Option<f64> {
        let config = self.cost;
        let n = samples.len();
        if n == 0 {
            return Some(0.0);
        }
        let ds = if n > 1 {
            samples.arc_length() / (n - 1) as f64
        } else {
            0.0
        };
        let initial_speed_sq = initial_speed * initial_speed;

        let mut total = 0.0;
        let mut max_speed: f64 = 0.0;
        let mut max_lateral_acceleration: f64 = 0.0;

        for (i, sample) in samples.iter().enumerate() {
            let s = if i + 1 == n {
                samples.arc_length()
            } else {
                i as f64 * ds
            };
            let speed = (initial_speed_sq + 2.0 * acceleration * s)
                .max(0.0)
                .sqrt()
                .max(config.min_speed);

            if (sample.curvature_rate * speed).abs() > config.d_curvature_max {
                return None;
            }

            let cost = self.hook.sample_cost(sample.curvature, speed);
            if cost < 0.0 {
                return None;
            }
            total += cost;

            max_speed = max_speed.max(speed);
            max_lateral_acceleration =
                max_lateral_acceleration.max((sample.curvature * speed * speed).abs());
        }

        if max_speed > config.speed_limit {
            total += config.speed_limit_penalty;
        }
        if acceleration > self.dynamics.soft_max_acceleration() {
            total += config.hard_acceleration_penalty;
        }
        if acceleration < self.dynamics.soft_min_acceleration() {
            total += config.hard_deceleration_penalty;
        }
        if max_lateral_acceleration > config.lateral_acceleration_limit {
            total += config.soft_lateral_acceleration_penalty;
        }
        total += config.linear_lateral_acceleration_penalty * max_lateral_acceleration;

        Some(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ConstantSampleCost, LatticePose};
    use crate::path_planning::state_lattice::spiral::{sample_path, CurvaturePolynomial};
    use approx::assert_relative_eq;

    fn samples_with_curvature(k: f64, length: f64) -> PathSamples {
        let mut samples = PathSamples::new();
        let poly = CurvaturePolynomial::cubic(k, k, k, k, length);
        sample_path(&LatticePose::new(0.0, 0.0, 0.0, k), &poly, length, 0.5, &mut samples);
        samples
    }

    fn ramp_samples(k_end: f64, length: f64) -> PathSamples {
        let mut samples = PathSamples::new();
        let poly = CurvaturePolynomial::cubic(0.0, k_end / 3.0, 2.0 * k_end / 3.0, k_end, length);
        sample_path(&LatticePose::default(), &poly, length, 0.5, &mut samples);
        samples
    }

    #[test]
    fn test_fixed_acceleration_bins() {
        let dynamics = DynamicsConfig::default();
        let expected = [3.5, -6.5, 2.0, -3.0, 0.0];
        for (bin, &a) in expected.iter().enumerate() {
            assert_eq!(acceleration_for_bin(bin, 10.0, 20.0, &dynamics), a);
        }
    }

    #[test]
    fn test_target_speed_bins() {
        let dynamics = DynamicsConfig::default();
        // Stop-ish target from 5 m/s over 20 m
        let a = acceleration_for_bin(7, 5.0, 20.0, &dynamics);
        assert_relative_eq!(a, (0.01f64.powi(2) - 25.0) / 40.0, epsilon = 1e-12);
        // 1 m/s target from 1 m/s needs no acceleration
        assert_relative_eq!(acceleration_for_bin(6, 1.0, 10.0, &dynamics), 0.0);
        // Reaching the speed limit from standstill over 5 m is clamped
        assert_eq!(acceleration_for_bin(5, 0.0, 5.0, &dynamics), 3.5);
        // Stopping from 20 m/s over 5 m is clamped
        assert_eq!(acceleration_for_bin(7, 20.0, 5.0, &dynamics), -6.5);
    }

    #[test]
    fn test_propagate_constant_speed() {
        let state = propagate(12.5, 0.0, 25.0, 0.05);
        assert_eq!(state.speed, 12.5);
        assert_eq!(state.elapsed, 2.0);
    }

    #[test]
    fn test_propagate_mean_speed() {
        let state = propagate(10.0, 2.0, 11.0, 0.05);
        assert_relative_eq!(state.speed, 12.0, epsilon = 1e-12);
        assert_relative_eq!(state.elapsed, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_propagate_stops_before_end() {
        let min_speed = 0.05;
        let v0 = 10.0;
        let length = 60.0;
        let a = (0.01f64 * 0.01 - v0 * v0) / (2.0 * length);
        let state = propagate(v0, a, length, min_speed);

        let braking_time = (min_speed - v0) / a;
        let braking_distance = (min_speed * min_speed - v0 * v0) / (2.0 * a);
        let crawl_time = (length - braking_distance) / min_speed;

        assert_eq!(state.speed, min_speed);
        assert_relative_eq!(state.elapsed, braking_time + crawl_time, epsilon = 1e-9);
    }

    #[test]
    fn test_propagate_hard_stop_crawls_at_floor() {
        // Decelerating hard enough to stop well before the end
        let state = propagate(2.0, -6.5, 30.0, 0.05);
        assert_eq!(state.speed, 0.05);
        assert!(state.elapsed > 30.0 / 0.05 * 0.9);
    }

    #[test]
    fn test_constant_hook_sums_per_sample() {
        let cost = CostConfig::default();
        let dynamics = DynamicsConfig::default();
        let hook = ConstantSampleCost(1.0);
        let evaluator = DynamicCostEvaluator::new(&cost, &dynamics, &hook);

        let samples = samples_with_curvature(0.0, 10.0);
        let total = evaluator.evaluate(&samples, 10.0, 0.0).unwrap();
        assert_relative_eq!(total, samples.len() as f64);
    }

    #[test]
    fn test_speed_limit_penalty() {
        let cost = CostConfig::default();
        let dynamics = DynamicsConfig::default();
        let hook = ConstantSampleCost(0.0);
        let evaluator = DynamicCostEvaluator::new(&cost, &dynamics, &hook);

        let samples = samples_with_curvature(0.0, 10.0);
        assert_relative_eq!(evaluator.evaluate(&samples, 19.0, 0.0).unwrap(), 0.0);
        assert_relative_eq!(
            evaluator.evaluate(&samples, 21.0, 0.0).unwrap(),
            cost.speed_limit_penalty
        );
    }

    #[test]
    fn test_hard_acceleration_penalties() {
        let cost = CostConfig::default();
        let dynamics = DynamicsConfig::default();
        let hook = ConstantSampleCost(0.0);
        let evaluator = DynamicCostEvaluator::new(&cost, &dynamics, &hook);
        let samples = samples_with_curvature(0.0, 10.0);

        assert_relative_eq!(
            evaluator.evaluate(&samples, 5.0, 3.5).unwrap(),
            cost.hard_acceleration_penalty
        );
        assert_relative_eq!(evaluator.evaluate(&samples, 5.0, 2.0).unwrap(), 0.0);
        assert_relative_eq!(
            evaluator.evaluate(&samples, 15.0, -6.5).unwrap(),
            cost.hard_deceleration_penalty
        );
        assert_relative_eq!(evaluator.evaluate(&samples, 15.0, -3.0).unwrap(), 0.0);
    }

    #[test]
    fn test_lateral_acceleration_penalties() {
        let cost = CostConfig::default();
        let dynamics = DynamicsConfig::default();
        let hook = ConstantSampleCost(0.0);
        let evaluator = DynamicCostEvaluator::new(&cost, &dynamics, &hook);

        // k = 0.02 at 10 m/s: 2 m/s^2 lateral, below the limit
        let gentle = samples_with_curvature(0.02, 10.0);
        assert_relative_eq!(
            evaluator.evaluate(&gentle, 10.0, 0.0).unwrap(),
            cost.linear_lateral_acceleration_penalty * 2.0,
            epsilon = 1e-9
        );

        // k = 0.05 at 10 m/s: 5 m/s^2 lateral, above the limit
        let sharp = samples_with_curvature(0.05, 10.0);
        assert_relative_eq!(
            evaluator.evaluate(&sharp, 10.0, 0.0).unwrap(),
            cost.soft_lateral_acceleration_penalty + cost.linear_lateral_acceleration_penalty * 5.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_curvature_rate_limit_is_infeasible() {
        let cost = CostConfig::default();
        let dynamics = DynamicsConfig::default();
        let hook = ConstantSampleCost(1.0);
        let evaluator = DynamicCostEvaluator::new(&cost, &dynamics, &hook);

        // Linear ramp to k = 0.2 over 10 m: dk/ds = 0.02
        let samples = ramp_samples(0.2, 10.0);
        // 0.02 * 10 m/s = 0.2 < 0.5
        assert!(evaluator.evaluate(&samples, 10.0, 0.0).is_some());
        // 0.02 * 30 m/s = 0.6 > 0.5
        assert!(evaluator.evaluate(&samples, 30.0, 0.0).is_none());
    }

    #[test]
    fn test_negative_hook_is_infeasible() {
        let cost = CostConfig::default();
        let dynamics = DynamicsConfig::default();
        let hook = |_k: f64, speed: f64| if speed > 12.0 { -1.0 } else { 0.0 };
        let evaluator = DynamicCostEvaluator::new(&cost, &dynamics, &hook);

        let samples = samples_with_curvature(0.0, 10.0);
        assert!(evaluator.evaluate(&samples, 10.0, 0.0).is_some());
        // Accelerating past 12 m/s part-way along the edge
        assert!(evaluator.evaluate(&samples, 10.0, 3.5).is_none());
    }
}
