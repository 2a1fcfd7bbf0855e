//! Best incoming edge of a single DP cell
//!
//! Each destination cell `(station, latitude, bin)` scans every admissible
//! predecessor independently and keeps the cheapest candidate. Only
//! committed (earlier) stations of the cost table are read, so all cells of
//! a station can be evaluated in any order or in parallel.
//!
//! Enumeration order fixes tie-breaks: predecessor stations ascending from
//! `station - station_connectivity` (the virtual start, station -1, comes
//! first when in reach), then predecessor latitude ascending, then
//! predecessor bin in (time, velocity, acceleration) nested order. A
//! candidate replaces the current best only if strictly cheaper.

use itertools::iproduct;

use crate::common::{
    LaneFrameLookup, ObstacleField, PlannerError, PlannerResult, SampleCostHook, VehicleState,
};

use super::config::{PlannerConfig, NUM_ACCELERATION_BINS, NUM_TIME_BINS, NUM_VELOCITY_BINS};
use super::cost_table::{bin_index, split_bin_index, CostTable, DpCell, ParentRef};
use super::dynamics::{acceleration_for_bin, propagate, DynamicCostEvaluator};
use super::spiral::{sample_path, PathSamples};
use super::static_cost::StaticCostEvaluator;
use super::tables::{
    CubicPathParams, CubicPathTable, LatticePoseTable, QuinticPathParams, VehicleEdgeTable,
};

/// Immutable per-cycle inputs produced upstream of the sweep
#[derive(Debug, Clone, Copy)]
pub struct LatticeInputs<'a> {
    pub poses: &'a LatticePoseTable,
    pub cubic_paths: &'a CubicPathTable,
    pub vehicle_cubic: &'a VehicleEdgeTable<CubicPathParams>,
    pub vehicle_quintic: &'a VehicleEdgeTable<QuinticPathParams>,
    pub vehicle: VehicleState,
}

impl<'a> LatticeInputs<'a> {
    /// Longest converged edge across all path tables
    pub fn max_arc_length(&self) -> f64 {
        self.cubic_paths
            .max_arc_length()
            .max(self.vehicle_cubic.max_arc_length())
            .max(self.vehicle_quintic.max_arc_length())
    }

    pub fn check_shape(&self, config: &PlannerConfig) -> PlannerResult<()> {
        let lattice = &config.lattice;
        if self.poses.num_stations() != lattice.num_stations
            || self.poses.num_latitudes() != lattice.num_latitudes
        {
            return Err(PlannerError::TableShape(format!(
                "pose table is {}x{}, lattice is {}x{}",
                self.poses.num_stations(),
                self.poses.num_latitudes(),
                lattice.num_stations,
                lattice.num_latitudes
            )));
        }
        self.cubic_paths.check_shape(lattice)?;
        self.vehicle_cubic.check_shape(lattice)?;
        self.vehicle_quintic.check_shape(lattice)?;
        Ok(())
    }
}

/// Best candidate found so far for one destination cell
struct Candidate {
    cell: DpCell,
}

impl Candidate {
    fn new() -> Self {
        Self {
            cell: DpCell::INFEASIBLE,
        }
    }

    fn offer(&mut self, cost: f64, end_velocity: f64, end_time: f64, parent_index: i32) {
        if !self.cell.is_feasible() || cost < self.cell.cost {
            self.cell = DpCell {
                cost,
                end_velocity,
                end_time,
                parent_index,
            };
        }
    }
}

/// Destination cell being solved
#[derive(Debug, Clone, Copy)]
struct Destination {
    accel_bin: usize,
    velocity_range: (f64, f64),
    time_range: (f64, f64),
}

/// Everything a cell evaluation reads, shared by all cells of a sweep
pub struct SweepContext<'a, L, O, H> {
    config: &'a PlannerConfig,
    inputs: LatticeInputs<'a>,
    static_cost: StaticCostEvaluator<'a, L, O>,
    dynamic_cost: DynamicCostEvaluator<'a, H>,
}

impl<'a, L, O, H> SweepContext<'a, L, O, H>
where
    L: LaneFrameLookup,
    O: ObstacleField,
    H: SampleCostHook,
{
    pub fn new(
        config: &'a PlannerConfig,
        inputs: LatticeInputs<'a>,
        lane_frame: &'a L,
        obstacles: &'a O,
        hook: &'a H,
    ) -> Self {
        Self {
            config,
            inputs,
            static_cost: StaticCostEvaluator::new(lane_frame, obstacles, &config.cost),
            dynamic_cost: DynamicCostEvaluator::new(&config.cost, &config.dynamics, hook),
        }
    }

    /// Cheapest admissible incoming edge of `(station, latitude, bin)`,
    /// or an infeasible cell when there is none.
    ///
    /// `table` must have every station before `station` committed.
    pub fn best_edge(
        &self,
        table: &CostTable,
        station: usize,
        latitude: usize,
        bin: usize,
    ) -> DpCell {
        debug_assert!(table.committed_stations() >= station);

        let dynamics = &self.config.dynamics;
        let (accel_bin, velocity_bin, time_bin) = split_bin_index(bin);
        let destination = Destination {
            accel_bin,
            velocity_range: dynamics.velocity_range(velocity_bin),
            time_range: dynamics.time_range(time_bin),
        };

        let mut best = Candidate::new();
        let mut samples = PathSamples::new();

        let first = station as isize - self.config.lattice.station_connectivity as isize;
        for prev_station in first.max(-1)..station as isize {
            if prev_station < 0 {
                self.scan_virtual_start(station, latitude, &destination, &mut samples, &mut best);
            } else {
                self.scan_station(
                    table,
                    prev_station as usize,
                    station,
                    latitude,
                    &destination,
                    &mut samples,
                    &mut best,
                );
            }
        }

        best.cell
    }

    fn scan_virtual_start(
        &self,
        station: usize,
        latitude: usize,
        destination: &Destination,
        samples: &mut PathSamples,
        best: &mut Candidate,
    ) {
        let vehicle = &self.inputs.vehicle;
        let end_curvature = self.inputs.poses.get(station, latitude).curvature;
        let step = self.config.cost.sampling_step;

        for virtual_latitude in 0..2 {
            if virtual_latitude == 0 {
                let params = self.inputs.vehicle_cubic.get(station, latitude);
                if !params.converged {
                    continue;
                }
                let polynomial = params.polynomial(vehicle.pose.curvature, end_curvature);
                sample_path(&vehicle.pose, &polynomial, params.arc_length, step, samples);
            } else {
                let params = self.inputs.vehicle_quintic.get(station, latitude);
                if !params.converged {
                    continue;
                }
                let polynomial = params.polynomial(vehicle, end_curvature);
                sample_path(&vehicle.pose, &polynomial, params.arc_length, step, samples);
            }

            let static_cost = match self.static_cost.path_cost(samples) {
                Some(cost) => cost,
                None => continue,
            };

            let start_cost = self.config.cost.base_cubic_cost
                * vehicle.speed
                * vehicle.speed
                * (1 - virtual_latitude) as f64;
            let parent = ParentRef::virtual_start(virtual_latitude);

            self.consider(
                samples,
                static_cost,
                start_cost,
                vehicle.speed,
                0.0,
                destination,
                parent.encode(self.config.lattice.num_latitudes),
                best,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_station(
        &self,
        table: &CostTable,
        prev_station: usize,
        station: usize,
        latitude: usize,
        destination: &Destination,
        samples: &mut PathSamples,
        best: &mut Candidate,
    ) {
        let lattice = &self.config.lattice;
        let half = lattice.latitude_half_window();
        let lo = latitude.saturating_sub(half);
        let hi = (latitude + half).min(lattice.num_latitudes - 1);
        let end_curvature = self.inputs.poses.get(station, latitude).curvature;

        for prev_latitude in lo..=hi {
            let params = self
                .inputs
                .cubic_paths
                .get(station, latitude, prev_station, prev_latitude);
            if !params.converged {
                continue;
            }

            let start = self.inputs.poses.get(prev_station, prev_latitude);
            let polynomial = params.polynomial(start.curvature, end_curvature);
            sample_path(
                start,
                &polynomial,
                params.arc_length,
                self.config.cost.sampling_step,
                samples,
            );

            // Depends only on geometry, shared by every predecessor bin
            let static_cost = match self.static_cost.path_cost(samples) {
                Some(cost) => cost,
                None => continue,
            };

            for (time_bin, velocity_bin, accel_bin) in
                iproduct!(0..NUM_TIME_BINS, 0..NUM_VELOCITY_BINS, 0..NUM_ACCELERATION_BINS)
            {
                let prev_bin = bin_index(accel_bin, velocity_bin, time_bin);
                let prev = match table.cell(prev_station, prev_latitude, prev_bin) {
                    Some(cell) if cell.is_feasible() => *cell,
                    _ => continue,
                };

                let parent = ParentRef::Node {
                    station: prev_station,
                    latitude: prev_latitude,
                    bin: prev_bin,
                };

                self.consider(
                    samples,
                    static_cost,
                    prev.cost,
                    prev.end_velocity,
                    prev.end_time,
                    destination,
                    parent.encode(lattice.num_latitudes),
                    best,
                );
            }
        }
    }

    /// Evaluate one predecessor state over an already sampled edge
    #[allow(clippy::too_many_arguments)]
    fn consider(
        &self,
        samples: &PathSamples,
        static_cost: f64,
        prev_cost: f64,
        initial_speed: f64,
        initial_time: f64,
        destination: &Destination,
        parent_index: i32,
        best: &mut Candidate,
    ) {
        let length = samples.arc_length();
        let acceleration = acceleration_for_bin(
            destination.accel_bin,
            initial_speed,
            length,
            &self.config.dynamics,
        );
        let end = propagate(initial_speed, acceleration, length, self.config.cost.min_speed);
        let end_time = initial_time + end.elapsed;

        let (v_lo, v_hi) = destination.velocity_range;
        let (t_lo, t_hi) = destination.time_range;
        if end.speed < v_lo || end.speed >= v_hi || end_time < t_lo || end_time >= t_hi {
            return;
        }

        let dynamic_cost = match self.dynamic_cost.evaluate(samples, initial_speed, acceleration) {
            Some(cost) => cost,
            None => return,
        };

        let average = (dynamic_cost + static_cost) / samples.len() as f64;
        best.offer(average * length + prev_cost, end.speed, end_time, parent_index);
    }
}
