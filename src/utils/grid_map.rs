// Lane-frame fields consumed by the static cost evaluator

extern crate nalgebra as na;

use crate::common::{
    FrenetPoint, LaneFrameLookup, ObstacleField, PlannerError, PlannerResult, Point2D,
};

/// Lane frame of a straight centerline starting at `origin` with `heading`.
/// Latitude is positive to the left of the driving direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightLaneFrame {
    pub origin: Point2D,
    pub heading: f64,
}

impl StraightLaneFrame {
    pub fn new(origin: Point2D, heading: f64) -> Self {
        Self { origin, heading }
    }
}

impl Default for StraightLaneFrame {
    fn default() -> Self {
        Self::new(Point2D::origin(), 0.0)
    }
}

impl LaneFrameLookup for StraightLaneFrame {
    fn to_lane_frame(&self, position: Point2D) -> FrenetPoint {
        let offset = position.to_vector() - self.origin.to_vector();
        let local = na::Rotation2::new(-self.heading) * offset;
        FrenetPoint::new(local.x, local.y)
    }
}

/// Occupancy grid over lane-frame coordinates.
///
/// Rows run along the station axis, columns along latitude. Cell `(0, 0)`
/// covers `[station_origin, station_origin + cell_size)` x
/// `[latitude_origin, latitude_origin + cell_size)`. Points off the grid are free.
#[derive(Debug, Clone)]
pub struct ObstacleGrid {
    grid: na::DMatrix<f64>,
    cell_size: f64,
    station_origin: f64,
    latitude_origin: f64,
}

impl ObstacleGrid {
    pub fn new(
        grid: na::DMatrix<f64>,
        cell_size: f64,
        station_origin: f64,
        latitude_origin: f64,
    ) -> PlannerResult<Self> {
        if !(cell_size > 0.0) {
            return Err(PlannerError::InvalidConfig(
                "obstacle grid cell size must be positive".to_string(),
            ));
        }
        Ok(Self {
            grid,
            cell_size,
            station_origin,
            latitude_origin,
        })
    }

    /// Grid with every cell free
    pub fn empty(
        station_extent: f64,
        latitude_extent: f64,
        cell_size: f64,
        station_origin: f64,
        latitude_origin: f64,
    ) -> PlannerResult<Self> {
        if !(cell_size > 0.0) {
            return Err(PlannerError::InvalidConfig(
                "obstacle grid cell size must be positive".to_string(),
            ));
        }
        let rows = (station_extent / cell_size).ceil().max(1.0) as usize;
        let cols = (latitude_extent / cell_size).ceil().max(1.0) as usize;
        Self::new(
            na::DMatrix::zeros(rows, cols),
            cell_size,
            station_origin,
            latitude_origin,
        )
    }

    fn cell_of(&self, point: FrenetPoint) -> Option<(usize, usize)> {
        let row = ((point.station - self.station_origin) / self.cell_size).floor();
        let col = ((point.latitude - self.latitude_origin) / self.cell_size).floor();
        if row < 0.0 || col < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.grid.nrows() || col >= self.grid.ncols() {
            return None;
        }
        Some((row, col))
    }

    /// Set occupancy of every cell overlapping the lane-frame rectangle
    pub fn fill_rect(
        &mut self,
        station_range: (f64, f64),
        latitude_range: (f64, f64),
        occupancy: f64,
    ) {
        let cell_size = self.cell_size;
        let span = |range: (f64, f64), origin: f64, limit: usize| {
            let lo = ((range.0 - origin) / cell_size).floor().max(0.0) as usize;
            let hi = ((range.1 - origin) / cell_size).ceil().max(0.0) as usize;
            lo.min(limit)..hi.min(limit)
        };
        let rows = span(station_range, self.station_origin, self.grid.nrows());
        let cols = span(latitude_range, self.latitude_origin, self.grid.ncols());
        for row in rows {
            for col in cols.clone() {
                self.grid[(row, col)] = occupancy;
            }
        }
    }

    /// Lane-frame center of a cell
    pub fn cell_center(&self, row: usize, col: usize) -> FrenetPoint {
        FrenetPoint::new(
            self.station_origin + (row as f64 + 0.5) * self.cell_size,
            self.latitude_origin + (col as f64 + 0.5) * self.cell_size,
        )
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn grid(&self) -> &na::DMatrix<f64> {
        &self.grid
    }
}

impl ObstacleField for ObstacleGrid {
    fn occupancy(&self, point: FrenetPoint) -> f64 {
        self.cell_of(point)
            .map(|cell| self.grid[cell])
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_lane_frame() {
        let frame = StraightLaneFrame::new(Point2D::new(1.0, 1.0), std::f64::consts::FRAC_PI_2);
        let p = frame.to_lane_frame(Point2D::new(0.0, 4.0));
        assert!((p.station - 3.0).abs() < 1e-12);
        assert!((p.latitude - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_obstacle_grid_lookup() {
        let mut grid = ObstacleGrid::empty(20.0, 8.0, 0.5, 0.0, -4.0).unwrap();
        grid.fill_rect((10.0, 11.0), (-0.5, 0.5), 1.0);

        assert_eq!(grid.occupancy(FrenetPoint::new(10.2, 0.0)), 1.0);
        assert_eq!(grid.occupancy(FrenetPoint::new(9.9, 0.0)), 0.0);
        assert_eq!(grid.occupancy(FrenetPoint::new(10.2, 1.2)), 0.0);
        // Off the grid
        assert_eq!(grid.occupancy(FrenetPoint::new(-3.0, 0.0)), 0.0);
        assert_eq!(grid.occupancy(FrenetPoint::new(10.2, 50.0)), 0.0);
    }

    #[test]
    fn test_invalid_cell_size() {
        assert!(ObstacleGrid::empty(10.0, 10.0, 0.0, 0.0, 0.0).is_err());
    }
}
