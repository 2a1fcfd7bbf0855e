//! State Lattice Sweep Example
//!
//! Plans over a straight three-lane road with a stalled car in the center
//! lane and a few random hazard patches, then plots the cheapest
//! trajectory reaching the last station.
//!
//! Run with `RUST_LOG=debug` to see per-station progress.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lattice_planner::common::{LatticePose, VehicleState};
use lattice_planner::path_planning::state_lattice::{
    sample_path, split_bin_index, CostTable, CubicPathParams, CubicPathTable, LatticeInputs,
    LatticePoseTable, ParentRef, PathSamples, PlannerConfig, QuinticPathParams,
    StateLatticePlanner, VehicleEdgeTable,
};
use lattice_planner::utils::{colors, ObstacleGrid, PathStyle, StraightLaneFrame, Visualizer};

const STATION_SPACING: f64 = 12.0;
const LATITUDE_SPACING: f64 = 0.8;

fn main() {
    env_logger::init();

    println!("State lattice sweep start!!");

    let config = PlannerConfig::default();
    let lattice = config.lattice.clone();
    let center = lattice.num_latitudes / 2;
    let reach = lattice.latitude_half_window();

    let poses = LatticePoseTable::from_fn(lattice.num_stations, lattice.num_latitudes, |s, l| {
        LatticePose::new(
            STATION_SPACING * (s + 1) as f64,
            (l as f64 - center as f64) * LATITUDE_SPACING,
            0.0,
            0.0,
        )
    });
    let cubic_paths = CubicPathTable::from_fn(&lattice, |s, l, ps, pl| {
        CubicPathParams::lateral_shift(
            STATION_SPACING * (s - ps) as f64,
            (l as f64 - pl as f64) * LATITUDE_SPACING,
        )
    });
    let vehicle_cubic =
        VehicleEdgeTable::from_fn(lattice.num_stations, lattice.num_latitudes, |s, l| {
            if s < lattice.station_connectivity && l.abs_diff(center) <= reach {
                CubicPathParams::lateral_shift(
                    STATION_SPACING * (s + 1) as f64,
                    (l as f64 - center as f64) * LATITUDE_SPACING,
                )
            } else {
                CubicPathParams::not_converged()
            }
        });
    let vehicle_quintic =
        VehicleEdgeTable::from_fn(lattice.num_stations, lattice.num_latitudes, |s, l| {
            if s == 0 && l == center {
                QuinticPathParams::new(0.0, 0.0, STATION_SPACING)
            } else {
                QuinticPathParams::not_converged()
            }
        });

    let vehicle = VehicleState::new(LatticePose::default(), 8.0);
    let inputs = LatticeInputs {
        poses: &poses,
        cubic_paths: &cubic_paths,
        vehicle_cubic: &vehicle_cubic,
        vehicle_quintic: &vehicle_quintic,
        vehicle,
    };

    println!("Setting up environment...");
    let road_length = STATION_SPACING * (lattice.num_stations + 1) as f64;
    let mut grid = match ObstacleGrid::empty(road_length, 10.0, 0.25, 0.0, -5.0) {
        Ok(grid) => grid,
        Err(e) => {
            println!("Invalid obstacle grid: {}", e);
            return;
        }
    };
    // Stalled car in the center lane
    grid.fill_rect((42.0, 46.5), (-0.9, 0.9), 1.0);
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..4 {
        let station = rng.gen_range(60.0..road_length - 5.0);
        let latitude = rng.gen_range(-4.0..3.0);
        grid.fill_rect((station, station + 2.0), (latitude, latitude + 1.0), 0.8);
    }

    let planner =
        StateLatticePlanner::new(config.clone(), StraightLaneFrame::default(), grid.clone());
    let table = match planner.plan(&inputs) {
        Ok(table) => table,
        Err(e) => {
            println!("Planning failed: {}", e);
            return;
        }
    };

    let last = lattice.num_stations - 1;
    let (latitude, bin, cell) = match table.best_cell(last) {
        Some(best) => best,
        None => {
            println!("No feasible cell at the last station");
            return;
        }
    };
    let (accel_bin, velocity_bin, time_bin) = split_bin_index(bin);
    println!(
        "Best final cell: latitude {} (accel bin {}, velocity bin {}, time bin {})",
        latitude, accel_bin, velocity_bin, time_bin
    );
    println!(
        "  cost {:.2}, end speed {:.2} m/s, arrival after {:.2} s",
        cell.cost, cell.end_velocity, cell.end_time
    );
    for station in 0..lattice.num_stations {
        println!(
            "  station {}: {} feasible cells",
            station,
            table.feasible_count(station)
        );
    }

    let mut vis = Visualizer::new();
    vis.set_title("State Lattice Sweep")
        .set_y_range(-5.0, 5.0)
        .plot_occupancy(
            &grid,
            config.cost.obstacle_hazard_threshold,
            config.cost.obstacle_lethal_value,
        )
        .plot_lattice(&poses)
        .plot_vehicle(&vehicle.pose, 1.5);

    match best_trajectory(&table, &inputs, &config, last, latitude, bin) {
        Some(edges) => {
            for (i, samples) in edges.iter().enumerate() {
                let style = if i == 0 {
                    PathStyle::default()
                } else {
                    PathStyle::new(colors::BEST_PATH, "")
                };
                vis.plot_samples(samples, &style);
            }
        }
        None => println!("Could not trace the best trajectory"),
    }

    let _ = vis.save_png("img/path_planning/state_lattice_sweep.png", 1000, 400);
    println!("Plot saved to: img/path_planning/state_lattice_sweep.png");

    println!("State lattice sweep finish!!");
}

/// Re-sample every edge on the parent chain of a cell
fn best_trajectory(
    table: &CostTable,
    inputs: &LatticeInputs,
    config: &PlannerConfig,
    station: usize,
    latitude: usize,
    bin: usize,
) -> Option<Vec<PathSamples>> {
    let chain = table.trace_back(station, latitude, bin)?;
    let step = config.cost.sampling_step;
    let vehicle = &inputs.vehicle;

    let mut edges = Vec::new();
    let mut from: Option<(usize, usize)> = None;
    let mut virtual_start = ParentRef::VirtualCubic;
    for node in chain {
        let (s, l) = match node {
            ParentRef::Node {
                station: s,
                latitude: l,
                ..
            } => (s, l),
            start => {
                virtual_start = start;
                continue;
            }
        };
        let end_curvature = inputs.poses.get(s, l).curvature;
        let mut samples = PathSamples::new();
        match from {
            None if virtual_start == ParentRef::VirtualCubic => {
                let params = inputs.vehicle_cubic.get(s, l);
                let polynomial = params.polynomial(vehicle.pose.curvature, end_curvature);
                sample_path(&vehicle.pose, &polynomial, params.arc_length, step, &mut samples);
            }
            None => {
                let params = inputs.vehicle_quintic.get(s, l);
                let polynomial = params.polynomial(vehicle, end_curvature);
                sample_path(&vehicle.pose, &polynomial, params.arc_length, step, &mut samples);
            }
            Some((ps, pl)) => {
                let params = inputs.cubic_paths.get(s, l, ps, pl);
                let start = inputs.poses.get(ps, pl);
                let polynomial = params.polynomial(start.curvature, end_curvature);
                sample_path(start, &polynomial, params.arc_length, step, &mut samples);
            }
        }
        edges.push(samples);
        from = Some((s, l));
    }
    Some(edges)
}
