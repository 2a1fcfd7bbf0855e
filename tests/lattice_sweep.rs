//! Scenario tests for the full lattice sweep

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lattice_planner::common::{
    FrenetPoint, LatticePose, ObstacleField, PlannerError, Point2D, VehicleState,
};
use lattice_planner::path_planning::state_lattice::{
    bin_index, CellState, CostTable, CubicPathParams, CubicPathTable, LatticeConfig,
    LatticeInputs, LatticePoseTable, ParentRef, PlannerConfig, QuinticPathParams,
    StateLatticePlanner, VehicleEdgeTable, NUM_BINS,
};
use lattice_planner::utils::{ObstacleGrid, StraightLaneFrame};

const SPACING: f64 = 10.0;

struct Free;

impl ObstacleField for Free {
    fn occupancy(&self, _point: FrenetPoint) -> f64 {
        0.0
    }
}

/// Straight road along +x with latitudes one meter apart, centered on y = 0
struct Road {
    config: PlannerConfig,
    poses: LatticePoseTable,
    cubic: CubicPathTable,
    vehicle_cubic: VehicleEdgeTable<CubicPathParams>,
    vehicle_quintic: VehicleEdgeTable<QuinticPathParams>,
}

impl Road {
    fn new(num_stations: usize, num_latitudes: usize, station_connectivity: usize) -> Self {
        let mut config = PlannerConfig::default();
        config.lattice = LatticeConfig {
            num_stations,
            num_latitudes,
            station_connectivity,
            latitude_connectivity: 3,
        };
        let center = num_latitudes / 2;
        let poses = LatticePoseTable::from_fn(num_stations, num_latitudes, |s, l| {
            LatticePose::new(SPACING * (s + 1) as f64, l as f64 - center as f64, 0.0, 0.0)
        });
        let cubic = CubicPathTable::from_fn(&config.lattice, |s, l, ps, pl| {
            CubicPathParams::lateral_shift(SPACING * (s - ps) as f64, l as f64 - pl as f64)
        });
        let vehicle_cubic = VehicleEdgeTable::from_fn(num_stations, num_latitudes, |s, l| {
            if l == center && s < station_connectivity {
                CubicPathParams::new(0.0, 0.0, SPACING * (s + 1) as f64)
            } else {
                CubicPathParams::not_converged()
            }
        });
        Self {
            config,
            poses,
            cubic,
            vehicle_cubic,
            vehicle_quintic: VehicleEdgeTable::new(num_stations, num_latitudes),
        }
    }

    fn inputs(&self, speed: f64) -> LatticeInputs<'_> {
        LatticeInputs {
            poses: &self.poses,
            cubic_paths: &self.cubic,
            vehicle_cubic: &self.vehicle_cubic,
            vehicle_quintic: &self.vehicle_quintic,
            vehicle: VehicleState::new(LatticePose::default(), speed),
        }
    }
}

fn assert_same_tables(a: &CostTable, b: &CostTable, stations: usize) {
    for station in 0..stations {
        assert_eq!(a.station_cells(station), b.station_cells(station));
    }
}

#[test]
fn test_constant_speed_edge_from_vehicle() {
    // One station, quintic edge straight ahead, lane center one meter to the right
    let mut road = Road::new(1, 1, 1);
    road.vehicle_cubic = VehicleEdgeTable::new(1, 1);
    road.vehicle_quintic = VehicleEdgeTable::from_fn(1, 1, |_, _| {
        QuinticPathParams::new(0.0, 0.0, SPACING)
    });
    let lane_frame = StraightLaneFrame::new(Point2D::new(0.0, -1.0), 0.0);
    let planner = StateLatticePlanner::with_sample_cost(
        road.config.clone(),
        lane_frame,
        Free,
        |_curvature: f64, _speed: f64| 0.0,
    );

    let table = planner.plan(&road.inputs(10.0)).unwrap();

    // Zero acceleration, 10 m/s is velocity bin 1, 1 s is time bin 0
    let bin = bin_index(4, 1, 0);
    let cell = table.cell(0, 0, bin).unwrap();
    assert!(cell.is_feasible());
    assert_relative_eq!(cell.end_velocity, 10.0, epsilon = 1e-12);
    assert_relative_eq!(cell.end_time, 1.0, epsilon = 1e-12);
    // 21 samples at 5 per sample, averaged and scaled by the 10 m edge
    assert_relative_eq!(cell.cost, 50.0, epsilon = 1e-9);
    assert_eq!(cell.parent_index, -1);
    assert!(matches!(
        table.state(0, 0, bin),
        CellState::Feasible {
            parent: ParentRef::VirtualQuintic,
            ..
        }
    ));

    // Holding 10 m/s can't end in velocity bin 0
    assert!(!table.cell(0, 0, bin_index(4, 0, 0)).unwrap().is_feasible());
}

#[test]
fn test_cubic_start_cost_scales_with_speed_squared() {
    let road = Road::new(1, 1, 1);
    let planner = StateLatticePlanner::with_sample_cost(
        road.config.clone(),
        StraightLaneFrame::default(),
        Free,
        |_curvature: f64, _speed: f64| 0.0,
    );

    let table = planner.plan(&road.inputs(4.0)).unwrap();
    let cell = table.cell(0, 0, bin_index(4, 0, 0)).unwrap();
    assert_eq!(cell.parent_index, -2);
    assert_relative_eq!(cell.cost, 16.0, epsilon = 1e-9);
    assert_relative_eq!(cell.end_time, 2.5, epsilon = 1e-12);
}

#[test]
fn test_stopping_edge_crawls_at_speed_floor() {
    let road = Road::new(1, 1, 1);
    let planner = StateLatticePlanner::new(road.config.clone(), StraightLaneFrame::default(), Free);
    let table = planner.plan(&road.inputs(1.0)).unwrap();

    // Target 0.01 m/s over 10 m from 1 m/s
    let acceleration = (0.01_f64 * 0.01 - 1.0) / (2.0 * SPACING);
    let min_speed = road.config.cost.min_speed;
    let braking_time = (min_speed - 1.0) / acceleration;
    let braking_distance = (min_speed * min_speed - 1.0) / (2.0 * acceleration);
    let expected_time = braking_time + (SPACING - braking_distance) / min_speed;
    assert!(expected_time > 10.0);

    let cell = table.cell(0, 0, bin_index(7, 0, 1)).unwrap();
    assert!(cell.is_feasible());
    assert_relative_eq!(cell.end_velocity, min_speed, epsilon = 1e-12);
    assert_relative_eq!(cell.end_time, expected_time, epsilon = 1e-9);
}

#[test]
fn test_lethal_obstacle_forces_lane_change() {
    let road = Road::new(3, 3, 2);
    let mut grid = ObstacleGrid::empty(40.0, 6.0, 0.25, 0.0, -3.0).unwrap();
    // Blocks the center lane between station 0 and station 1
    grid.fill_rect((14.75, 15.25), (-0.25, 0.25), 1.0);
    let planner = StateLatticePlanner::new(road.config.clone(), StraightLaneFrame::default(), grid);

    let table = planner.plan(&road.inputs(6.0)).unwrap();

    let center_blocked = (0..NUM_BINS).all(|bin| !table.cell(1, 1, bin).unwrap().is_feasible());
    assert!(center_blocked);
    assert!(table.feasible_count(1) > 0);

    let (latitude, bin, _) = table.best_cell(2).unwrap();
    let chain = table.trace_back(2, latitude, bin).unwrap();
    assert_eq!(chain.first(), Some(&ParentRef::VirtualCubic));
    let via_blocked_node = chain.iter().any(|node| {
        matches!(
            node,
            ParentRef::Node {
                station: 1,
                latitude: 1,
                ..
            }
        )
    });
    assert!(!via_blocked_node);
}

#[test]
fn test_blocked_road_has_no_trajectory() {
    let road = Road::new(3, 3, 2);
    let mut grid = ObstacleGrid::empty(40.0, 6.0, 0.25, 0.0, -3.0).unwrap();
    grid.fill_rect((14.75, 15.25), (-3.0, 3.0), 1.0);
    let planner = StateLatticePlanner::new(road.config.clone(), StraightLaneFrame::default(), grid);

    let err = planner.plan(&road.inputs(6.0)).unwrap_err();
    assert!(matches!(err, PlannerError::NoFeasibleTrajectory { station: 2 }));
}

#[test]
fn test_rejecting_hook_makes_every_cell_infeasible() {
    let road = Road::new(2, 3, 1);
    let planner = StateLatticePlanner::with_sample_cost(
        road.config.clone(),
        StraightLaneFrame::default(),
        Free,
        |_curvature: f64, _speed: f64| -1.0,
    );
    let err = planner.plan_sequential(&road.inputs(6.0)).unwrap_err();
    assert!(matches!(err, PlannerError::NoFeasibleTrajectory { .. }));
}

#[test]
fn test_later_stations_do_not_affect_earlier_ones() {
    let road = Road::new(4, 3, 2);
    let planner = StateLatticePlanner::new(road.config.clone(), StraightLaneFrame::default(), Free);
    let before = planner.plan(&road.inputs(6.0)).unwrap();

    // Move and curve the last station's nodes
    let mut changed = Road::new(4, 3, 2);
    changed.poses = LatticePoseTable::from_fn(4, 3, |s, l| {
        let y = if s == 3 { l as f64 * 2.0 } else { l as f64 - 1.0 };
        LatticePose::new(SPACING * (s + 1) as f64, y, 0.0, if s == 3 { 0.01 } else { 0.0 })
    });
    let after = planner.plan(&changed.inputs(6.0)).unwrap();

    assert_same_tables(&before, &after, 3);
    assert_ne!(before.station_cells(3), after.station_cells(3));
}

#[test]
fn test_parallel_sweep_matches_sequential_on_random_obstacles() {
    let mut rng = StdRng::seed_from_u64(7);
    let road = Road::new(5, 5, 3);

    for _ in 0..3 {
        let mut grid = ObstacleGrid::empty(60.0, 8.0, 0.5, 0.0, -4.0).unwrap();
        for _ in 0..6 {
            let station = rng.gen_range(12.0..55.0);
            let latitude = rng.gen_range(-3.0..3.0);
            let occupancy = if rng.gen_bool(0.3) { 1.0 } else { 0.7 };
            grid.fill_rect(
                (station, station + 1.0),
                (latitude, latitude + 0.5),
                occupancy,
            );
        }
        let speed = rng.gen_range(2.0..8.0);
        let planner =
            StateLatticePlanner::new(road.config.clone(), StraightLaneFrame::default(), grid);
        let inputs = road.inputs(speed);

        match (planner.plan(&inputs), planner.plan_sequential(&inputs)) {
            (Ok(parallel), Ok(sequential)) => assert_same_tables(&parallel, &sequential, 5),
            (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
            (a, b) => panic!("sweeps disagree: {:?} vs {:?}", a.is_ok(), b.is_ok()),
        }
    }
}

#[test]
fn test_config_loaded_from_file() {
    let path = std::env::temp_dir().join("lattice_planner_sweep_config.json");
    std::fs::write(
        &path,
        r#"{ "lattice": { "num_stations": 2, "num_latitudes": 3, "station_connectivity": 1,
                           "latitude_connectivity": 3 },
             "cost": { "sampling_step": 0.25 } }"#,
    )
    .unwrap();
    let config = PlannerConfig::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.lattice.num_stations, 2);
    assert_eq!(config.cost.sampling_step, 0.25);

    let mut road = Road::new(2, 3, 1);
    road.config = config;
    let planner = StateLatticePlanner::new(road.config.clone(), StraightLaneFrame::default(), Free);
    assert!(planner.plan(&road.inputs(5.0)).is_ok());
}

#[test]
fn test_missing_config_file() {
    let err = PlannerConfig::from_json_file("/nonexistent/lattice.json").unwrap_err();
    assert!(matches!(err, PlannerError::Io(_)));
}

#[test]
fn test_unbounded_edge_length_is_rejected_before_sweep() {
    for length in [f64::INFINITY, f64::NAN, 0.0] {
        let mut road = Road::new(2, 3, 1);
        road.vehicle_quintic.set(
            0,
            1,
            QuinticPathParams {
                p3: 0.0,
                p4: 0.0,
                arc_length: length,
                converged: true,
            },
        );
        let planner =
            StateLatticePlanner::new(road.config.clone(), StraightLaneFrame::default(), Free);
        let err = planner.plan(&road.inputs(5.0)).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidPathRecord(_)));
    }
}

#[test]
fn test_negative_penalty_is_rejected_before_sweep() {
    let mut road = Road::new(2, 3, 1);
    road.config.cost.linear_lateral_acceleration_penalty = -1000.0;
    let planner = StateLatticePlanner::new(road.config.clone(), StraightLaneFrame::default(), Free);
    let err = planner.plan(&road.inputs(5.0)).unwrap_err();
    assert!(matches!(err, PlannerError::InvalidConfig(_)));
}
