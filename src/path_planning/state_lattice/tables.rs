//! Read-only inputs of the lattice sweep
//!
//! Node poses and fitted path parameters are produced once per planning
//! cycle by upstream components and stay immutable during the sweep.

use crate::common::{LatticePose, PlannerError, PlannerResult, VehicleState};

use super::config::LatticeConfig;
use super::spiral::CurvaturePolynomial;

/// Common view of fitted path parameter records
pub trait PathRecord {
    fn arc_length(&self) -> f64;
    fn converged(&self) -> bool;
}

/// Fitted cubic spiral parameters.
///
/// `p1` and `p2` are the curvatures at one and two thirds of the arc length;
/// the boundary curvatures come from the connected poses.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CubicPathParams {
    pub p1: f64,
    pub p2: f64,
    pub arc_length: f64,
    pub converged: bool,
}

impl CubicPathParams {
    pub fn new(p1: f64, p2: f64, arc_length: f64) -> Self {
        Self {
            p1,
            p2,
            arc_length,
            converged: arc_length > 0.0,
        }
    }

    /// Record for an edge the fitter could not solve
    pub fn not_converged() -> Self {
        Self::default()
    }

    /// Closed-form S-curve between two parallel, straight headings.
    ///
    /// Small-angle approximation of a lateral shift of `lateral_offset` over
    /// `station_distance`; the end point misses an exact fit by a few
    /// centimeters for shifts of a lane width over ten meters or more.
    pub fn lateral_shift(station_distance: f64, lateral_offset: f64) -> Self {
        let arc_length = station_distance.hypot(lateral_offset);
        if lateral_offset == 0.0 {
            return Self::new(0.0, 0.0, arc_length);
        }
        let p1 = 40.0 * lateral_offset / (9.0 * arc_length * arc_length);
        Self::new(p1, -p1, arc_length)
    }

    pub fn polynomial(&self, start_curvature: f64, end_curvature: f64) -> CurvaturePolynomial {
        CurvaturePolynomial::cubic(
            start_curvature,
            self.p1,
            self.p2,
            end_curvature,
            self.arc_length,
        )
    }
}

impl PathRecord for CubicPathParams {
    fn arc_length(&self) -> f64 {
        self.arc_length
    }

    fn converged(&self) -> bool {
        self.converged
    }
}

/// Fitted quintic spiral parameters for the vehicle-to-lattice edge.
///
/// `p3` and `p4` are the curvatures at one and two thirds of the arc length.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuinticPathParams {
    pub p3: f64,
    pub p4: f64,
    pub arc_length: f64,
    pub converged: bool,
}

impl QuinticPathParams {
    pub fn new(p3: f64, p4: f64, arc_length: f64) -> Self {
        Self {
            p3,
            p4,
            arc_length,
            converged: arc_length > 0.0,
        }
    }

    pub fn not_converged() -> Self {
        Self::default()
    }

    pub fn polynomial(&self, vehicle: &VehicleState, end_curvature: f64) -> CurvaturePolynomial {
        CurvaturePolynomial::quintic(
            vehicle.pose.curvature,
            vehicle.curvature_rate,
            vehicle.curvature_acceleration,
            self.p3,
            self.p4,
            end_curvature,
            self.arc_length,
        )
    }
}

impl PathRecord for QuinticPathParams {
    fn arc_length(&self) -> f64 {
        self.arc_length
    }

    fn converged(&self) -> bool {
        self.converged
    }
}

fn max_converged_arc_length<'a, R>(records: impl Iterator<Item = &'a R>) -> f64
where
    R: PathRecord + 'a,
{
    records
        .filter(|r| r.converged())
        .map(|r| r.arc_length())
        .fold(0.0, f64::max)
}

/// Converged records must carry a finite, positive arc length
fn check_converged_lengths<'a, R>(
    table: &str,
    records: impl Iterator<Item = &'a R>,
) -> PlannerResult<()>
where
    R: PathRecord + 'a,
{
    match records
        .filter(|r| r.converged())
        .map(|r| r.arc_length())
        .find(|length| !(length.is_finite() && *length > 0.0))
    {
        Some(length) => Err(PlannerError::InvalidPathRecord(format!(
            "{} has a converged edge with arc length {}",
            table, length
        ))),
        None => Ok(()),
    }
}

/// Poses of all lattice nodes, indexed by `(station, latitude)`
#[derive(Debug, Clone)]
pub struct LatticePoseTable {
    num_stations: usize,
    num_latitudes: usize,
    poses: Vec<LatticePose>,
}

impl LatticePoseTable {
    /// Build from a station-major list of poses
    pub fn new(
        num_stations: usize,
        num_latitudes: usize,
        poses: Vec<LatticePose>,
    ) -> PlannerResult<Self> {
        if poses.len() != num_stations * num_latitudes {
            return Err(PlannerError::TableShape(format!(
                "expected {} poses for {}x{} lattice, got {}",
                num_stations * num_latitudes,
                num_stations,
                num_latitudes,
                poses.len()
            )));
        }
        Ok(Self {
            num_stations,
            num_latitudes,
            poses,
        })
    }

    pub fn from_fn<F>(num_stations: usize, num_latitudes: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> LatticePose,
    {
        let mut poses = Vec::with_capacity(num_stations * num_latitudes);
        for station in 0..num_stations {
            for latitude in 0..num_latitudes {
                poses.push(f(station, latitude));
            }
        }
        Self {
            num_stations,
            num_latitudes,
            poses,
        }
    }

    pub fn num_stations(&self) -> usize {
        self.num_stations
    }

    pub fn num_latitudes(&self) -> usize {
        self.num_latitudes
    }

    pub fn get(&self, station: usize, latitude: usize) -> &LatticePose {
        &self.poses[station * self.num_latitudes + latitude]
    }

    pub fn iter(&self) -> impl Iterator<Item = &LatticePose> {
        self.poses.iter()
    }
}

/// Cubic parameters of station-to-station edges.
///
/// Indexed by the destination node and the connectivity offset:
/// `((station * num_latitudes + latitude) * station_connectivity + (station_back - 1))
///  * latitude_connectivity + window_index`, where `window_index` is
/// `prev_latitude - latitude + latitude_connectivity / 2`.
#[derive(Debug, Clone)]
pub struct CubicPathTable {
    num_stations: usize,
    num_latitudes: usize,
    station_connectivity: usize,
    latitude_connectivity: usize,
    params: Vec<CubicPathParams>,
}

impl CubicPathTable {
    /// Table with every edge marked not converged
    pub fn new(lattice: &LatticeConfig) -> Self {
        let len = lattice.num_stations
            * lattice.num_latitudes
            * lattice.station_connectivity
            * lattice.latitude_connectivity;
        Self {
            num_stations: lattice.num_stations,
            num_latitudes: lattice.num_latitudes,
            station_connectivity: lattice.station_connectivity,
            latitude_connectivity: lattice.latitude_connectivity,
            params: vec![CubicPathParams::not_converged(); len],
        }
    }

    /// Fill every in-window edge with `f(station, latitude, prev_station, prev_latitude)`
    pub fn from_fn<F>(lattice: &LatticeConfig, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize, usize) -> CubicPathParams,
    {
        let mut table = Self::new(lattice);
        let half = lattice.latitude_half_window();
        for station in 0..lattice.num_stations {
            for latitude in 0..lattice.num_latitudes {
                for back in 1..=lattice.station_connectivity.min(station) {
                    let prev_station = station - back;
                    let lo = latitude.saturating_sub(half);
                    let hi = (latitude + half).min(lattice.num_latitudes - 1);
                    for prev_latitude in lo..=hi {
                        let params = f(station, latitude, prev_station, prev_latitude);
                        table.set(station, latitude, prev_station, prev_latitude, params);
                    }
                }
            }
        }
        table
    }

    fn index(
        &self,
        station: usize,
        latitude: usize,
        prev_station: usize,
        prev_latitude: usize,
    ) -> Option<usize> {
        if station >= self.num_stations || latitude >= self.num_latitudes {
            return None;
        }
        let back = station.checked_sub(prev_station)?;
        if back == 0 || back > self.station_connectivity {
            return None;
        }
        let window = (prev_latitude + self.latitude_connectivity / 2).checked_sub(latitude)?;
        if window >= self.latitude_connectivity {
            return None;
        }
        Some(
            ((station * self.num_latitudes + latitude) * self.station_connectivity + (back - 1))
                * self.latitude_connectivity
                + window,
        )
    }

    /// Parameters of the edge `(prev_station, prev_latitude) -> (station, latitude)`.
    ///
    /// Edges outside the connectivity window read as not converged.
    pub fn get(
        &self,
        station: usize,
        latitude: usize,
        prev_station: usize,
        prev_latitude: usize,
    ) -> CubicPathParams {
        self.index(station, latitude, prev_station, prev_latitude)
            .map(|i| self.params[i])
            .unwrap_or_default()
    }

    pub fn set(
        &mut self,
        station: usize,
        latitude: usize,
        prev_station: usize,
        prev_latitude: usize,
        params: CubicPathParams,
    ) {
        if let Some(i) = self.index(station, latitude, prev_station, prev_latitude) {
            self.params[i] = params;
        }
    }

    pub fn max_arc_length(&self) -> f64 {
        max_converged_arc_length(self.params.iter())
    }

    /// Check the table was built for the given lattice
    pub fn check_shape(&self, lattice: &LatticeConfig) -> PlannerResult<()> {
        if self.num_stations != lattice.num_stations
            || self.num_latitudes != lattice.num_latitudes
            || self.station_connectivity != lattice.station_connectivity
            || self.latitude_connectivity != lattice.latitude_connectivity
        {
            return Err(PlannerError::TableShape(format!(
                "cubic path table built for {}x{} (connectivity {}x{}), lattice is {}x{} ({}x{})",
                self.num_stations,
                self.num_latitudes,
                self.station_connectivity,
                self.latitude_connectivity,
                lattice.num_stations,
                lattice.num_latitudes,
                lattice.station_connectivity,
                lattice.latitude_connectivity
            )));
        }
        check_converged_lengths("cubic path table", self.params.iter())
    }
}

/// Vehicle-to-lattice edge parameters, indexed by destination node
#[derive(Debug, Clone)]
pub struct VehicleEdgeTable<R> {
    num_stations: usize,
    num_latitudes: usize,
    params: Vec<R>,
}

impl<R: PathRecord + Copy + Default> VehicleEdgeTable<R> {
    pub fn new(num_stations: usize, num_latitudes: usize) -> Self {
        Self {
            num_stations,
            num_latitudes,
            params: vec![R::default(); num_stations * num_latitudes],
        }
    }

    pub fn from_fn<F>(num_stations: usize, num_latitudes: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> R,
    {
        let mut table = Self::new(num_stations, num_latitudes);
        for station in 0..num_stations {
            for latitude in 0..num_latitudes {
                table.set(station, latitude, f(station, latitude));
            }
        }
        table
    }

    pub fn get(&self, station: usize, latitude: usize) -> R {
        if station >= self.num_stations || latitude >= self.num_latitudes {
            return R::default();
        }
        self.params[station * self.num_latitudes + latitude]
    }

    pub fn set(&mut self, station: usize, latitude: usize, params: R) {
        if station < self.num_stations && latitude < self.num_latitudes {
            self.params[station * self.num_latitudes + latitude] = params;
        }
    }

    pub fn max_arc_length(&self) -> f64 {
        max_converged_arc_length(self.params.iter())
    }

    pub fn check_shape(&self, lattice: &LatticeConfig) -> PlannerResult<()> {
        if self.num_stations != lattice.num_stations || self.num_latitudes != lattice.num_latitudes
        {
            return Err(PlannerError::TableShape(format!(
                "vehicle edge table built for {}x{}, lattice is {}x{}",
                self.num_stations, self.num_latitudes, lattice.num_stations, lattice.num_latitudes
            )));
        }
        check_converged_lengths("vehicle edge table", self.params.iter())
    }
}
