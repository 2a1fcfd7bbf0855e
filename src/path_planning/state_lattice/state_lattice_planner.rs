//! State Lattice Planner
//!
//! Runs the station-by-station dynamic-programming sweep over the lattice.
//! Every cell of a station is solved independently against the already
//! committed stations; the station's results are committed as a whole
//! before the next station starts.

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::common::{
    ConstantSampleCost, LaneFrameLookup, ObstacleField, PlannerError, PlannerResult,
    SampleCostHook,
};

use super::config::{PlannerConfig, NUM_BINS};
use super::cost_table::{CostTable, DpCell};
use super::selector::{LatticeInputs, SweepContext};

/// State Lattice Planner
pub struct StateLatticePlanner<L, O, H = ConstantSampleCost> {
    config: PlannerConfig,
    lane_frame: L,
    obstacles: O,
    sample_cost: H,
}

impl<L, O> StateLatticePlanner<L, O, ConstantSampleCost>
where
    L: LaneFrameLookup,
    O: ObstacleField,
{
    pub fn new(config: PlannerConfig, lane_frame: L, obstacles: O) -> Self {
        Self::with_sample_cost(config, lane_frame, obstacles, ConstantSampleCost::default())
    }
}

impl<L, O, H> StateLatticePlanner<L, O, H>
where
    L: LaneFrameLookup,
    O: ObstacleField,
    H: SampleCostHook,
{
    pub fn with_sample_cost(
        config: PlannerConfig,
        lane_frame: L,
        obstacles: O,
        sample_cost: H,
    ) -> Self {
        Self {
            config,
            lane_frame,
            obstacles,
            sample_cost,
        }
    }

    /// Get configuration
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Single-threaded sweep. Produces the same table as [`plan`](Self::plan).
    pub fn plan_sequential(&self, inputs: &LatticeInputs) -> PlannerResult<CostTable> {
        self.sweep(inputs, |context, table, station| {
            (0..table.station_len())
                .map(|i| context.best_edge(table, station, i / NUM_BINS, i % NUM_BINS))
                .collect()
        })
    }

    fn prepare(&self, inputs: &LatticeInputs) -> PlannerResult<()> {
        inputs.check_shape(&self.config)?;
        self.config.validate(inputs.max_arc_length())
    }

    fn sweep<F>(&self, inputs: &LatticeInputs, solve_station: F) -> PlannerResult<CostTable>
    where
        F: Fn(&SweepContext<'_, L, O, H>, &CostTable, usize) -> Vec<DpCell>,
    {
        self.prepare(inputs)?;

        let lattice = &self.config.lattice;
        let context = SweepContext::new(
            &self.config,
            *inputs,
            &self.lane_frame,
            &self.obstacles,
            &self.sample_cost,
        );
        let mut table = CostTable::new(lattice.num_stations, lattice.num_latitudes);

        info!(
            "Lattice sweep: {} stations x {} latitudes x {} bins, vehicle speed {:.2} m/s",
            lattice.num_stations, lattice.num_latitudes, NUM_BINS, inputs.vehicle.speed
        );

        for station in 0..lattice.num_stations {
            let cells = solve_station(&context, &table, station);
            table.commit_station(station, cells)?;

            let feasible = table.feasible_count(station);
            if feasible == 0 {
                warn!("Station {} has no feasible cell", station);
            } else {
                debug!(
                    "Station {}: {}/{} feasible cells",
                    station,
                    feasible,
                    table.station_len()
                );
            }
        }

        let last = lattice.num_stations - 1;
        match table.best_cell(last) {
            Some((latitude, bin, cell)) => {
                info!(
                    "Lattice sweep done: best final cell latitude {} bin {} cost {:.3}",
                    latitude, bin, cell.cost
                );
                Ok(table)
            }
            None => Err(PlannerError::NoFeasibleTrajectory { station: last }),
        }
    }
}

impl<L, O, H> StateLatticePlanner<L, O, H>
where
    L: LaneFrameLookup + Sync,
    O: ObstacleField + Sync,
    H: SampleCostHook + Sync,
{
    /// Data-parallel sweep: all cells of a station are solved concurrently,
    /// stations run strictly in order.
    pub fn plan(&self, inputs: &LatticeInputs) -> PlannerResult<CostTable> {
        self.sweep(inputs, |context, table, station| {
            (0..table.station_len())
                .into_par_iter()
                .map(|i| context.best_edge(table, station, i / NUM_BINS, i % NUM_BINS))
                .collect()
        })
    }
}
