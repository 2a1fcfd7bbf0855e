//! Per-station table of DP results
//!
//! Cells are addressed by `(station, latitude, bin)` and flattened as
//! `(station * num_latitudes + latitude) * NUM_BINS + bin`, with
//! `bin = (time_bin * NUM_VELOCITY_BINS + velocity_bin) * NUM_ACCELERATION_BINS + accel_bin`.
//! A cell's `parent_index` uses the same flattening, so it doubles as the
//! cost-table index of the predecessor cell. The virtual start node is
//! encoded as `-2` (cubic edge) and `-1` (quintic edge).
//!
//! Internally an infeasible cell carries the numeric sentinel `INFEASIBLE`
//! in its cost; `CellState` is the tagged view handed to consumers.

use ordered_float::OrderedFloat;

use crate::common::{PlannerError, PlannerResult};

use super::config::{NUM_ACCELERATION_BINS, NUM_BINS, NUM_VELOCITY_BINS};

/// Cost sentinel for "no valid cost"
pub const INFEASIBLE: f64 = -1.0;

/// Flattened bin index of an (acceleration, velocity, time) triple
pub fn bin_index(accel_bin: usize, velocity_bin: usize, time_bin: usize) -> usize {
    (time_bin * NUM_VELOCITY_BINS + velocity_bin) * NUM_ACCELERATION_BINS + accel_bin
}

/// Inverse of [`bin_index`]: `(accel_bin, velocity_bin, time_bin)`
pub fn split_bin_index(bin: usize) -> (usize, usize, usize) {
    let accel_bin = bin % NUM_ACCELERATION_BINS;
    let velocity_bin = (bin / NUM_ACCELERATION_BINS) % NUM_VELOCITY_BINS;
    let time_bin = bin / (NUM_ACCELERATION_BINS * NUM_VELOCITY_BINS);
    (accel_bin, velocity_bin, time_bin)
}

/// Predecessor of an accepted DP cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    /// Cubic edge from the vehicle pose
    VirtualCubic,
    /// Quintic edge from the vehicle pose
    VirtualQuintic,
    /// Cell of an earlier station
    Node {
        station: usize,
        latitude: usize,
        bin: usize,
    },
}

impl ParentRef {
    /// Virtual start latitude 0 is the cubic edge, latitude 1 the quintic one
    pub fn virtual_start(latitude: usize) -> Self {
        if latitude == 0 {
            ParentRef::VirtualCubic
        } else {
            ParentRef::VirtualQuintic
        }
    }

    pub fn encode(&self, num_latitudes: usize) -> i32 {
        match *self {
            ParentRef::VirtualCubic => -2,
            ParentRef::VirtualQuintic => -1,
            ParentRef::Node {
                station,
                latitude,
                bin,
            } => ((station * num_latitudes + latitude) * NUM_BINS + bin) as i32,
        }
    }

    pub fn decode(index: i32, num_latitudes: usize) -> Option<Self> {
        match index {
            -2 => Some(ParentRef::VirtualCubic),
            -1 => Some(ParentRef::VirtualQuintic),
            i if i >= 0 => {
                let i = i as usize;
                let bin = i % NUM_BINS;
                let node = i / NUM_BINS;
                Some(ParentRef::Node {
                    station: node / num_latitudes,
                    latitude: node % num_latitudes,
                    bin,
                })
            }
            _ => None,
        }
    }
}

/// Stored DP result of one cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DpCell {
    pub cost: f64,
    pub end_velocity: f64,
    pub end_time: f64,
    /// Meaningless when `cost` is `INFEASIBLE`
    pub parent_index: i32,
}

impl DpCell {
    pub const INFEASIBLE: DpCell = DpCell {
        cost: INFEASIBLE,
        end_velocity: 0.0,
        end_time: 0.0,
        parent_index: 0,
    };

    pub fn is_feasible(&self) -> bool {
        self.cost >= 0.0
    }
}

impl Default for DpCell {
    fn default() -> Self {
        DpCell::INFEASIBLE
    }
}

/// Tagged view of a cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellState {
    Feasible {
        cost: f64,
        end_velocity: f64,
        end_time: f64,
        parent: ParentRef,
    },
    Infeasible,
}

/// Cost table of one planning cycle.
///
/// Stations are committed strictly in order and are immutable once
/// committed; only committed stations can be read.
#[derive(Debug, Clone)]
pub struct CostTable {
    num_stations: usize,
    num_latitudes: usize,
    cells: Vec<DpCell>,
    committed: usize,
}

impl CostTable {
    pub fn new(num_stations: usize, num_latitudes: usize) -> Self {
        Self {
            num_stations,
            num_latitudes,
            cells: vec![DpCell::INFEASIBLE; num_stations * num_latitudes * NUM_BINS],
            committed: 0,
        }
    }

    pub fn num_stations(&self) -> usize {
        self.num_stations
    }

    pub fn num_latitudes(&self) -> usize {
        self.num_latitudes
    }

    /// Cells per station
    pub fn station_len(&self) -> usize {
        self.num_latitudes * NUM_BINS
    }

    /// Number of stations committed so far
    pub fn committed_stations(&self) -> usize {
        self.committed
    }

    pub fn is_complete(&self) -> bool {
        self.committed == self.num_stations
    }

    pub fn cell_index(&self, station: usize, latitude: usize, bin: usize) -> usize {
        (station * self.num_latitudes + latitude) * NUM_BINS + bin
    }

    /// Read a committed cell; `None` for stations not yet committed
    pub fn cell(&self, station: usize, latitude: usize, bin: usize) -> Option<&DpCell> {
        if station >= self.committed || latitude >= self.num_latitudes || bin >= NUM_BINS {
            return None;
        }
        self.cells.get(self.cell_index(station, latitude, bin))
    }

    pub fn state(&self, station: usize, latitude: usize, bin: usize) -> CellState {
        match self.cell(station, latitude, bin) {
            Some(cell) if cell.is_feasible() => {
                match ParentRef::decode(cell.parent_index, self.num_latitudes) {
                    Some(parent) => CellState::Feasible {
                        cost: cell.cost,
                        end_velocity: cell.end_velocity,
                        end_time: cell.end_time,
                        parent,
                    },
                    None => CellState::Infeasible,
                }
            }
            _ => CellState::Infeasible,
        }
    }

    /// All cells of a committed station, latitude-major
    pub fn station_cells(&self, station: usize) -> Option<&[DpCell]> {
        if station >= self.committed {
            return None;
        }
        let len = self.station_len();
        Some(&self.cells[station * len..(station + 1) * len])
    }

    /// Commit the results of the next station.
    ///
    /// Stations must be committed in order, each exactly once.
    pub fn commit_station(&mut self, station: usize, cells: Vec<DpCell>) -> PlannerResult<()> {
        if station != self.committed || station >= self.num_stations {
            return Err(PlannerError::TableShape(format!(
                "station {} committed out of order (next is {})",
                station, self.committed
            )));
        }
        let len = self.station_len();
        if cells.len() != len {
            return Err(PlannerError::TableShape(format!(
                "station {} has {} cells, expected {}",
                station,
                cells.len(),
                len
            )));
        }
        self.cells[station * len..(station + 1) * len].copy_from_slice(&cells);
        self.committed += 1;
        Ok(())
    }

    pub fn feasible_count(&self, station: usize) -> usize {
        self.station_cells(station)
            .map(|cells| cells.iter().filter(|c| c.is_feasible()).count())
            .unwrap_or(0)
    }

    /// Cheapest feasible cell of a station as `(latitude, bin, cell)`.
    /// Ties keep the lowest index.
    pub fn best_cell(&self, station: usize) -> Option<(usize, usize, DpCell)> {
        let cells = self.station_cells(station)?;
        cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_feasible())
            .min_by_key(|(_, cell)| OrderedFloat(cell.cost))
            .map(|(i, cell)| (i / NUM_BINS, i % NUM_BINS, *cell))
    }

    /// Follow parent links from a feasible cell back to the vehicle.
    ///
    /// The chain is ordered from the virtual start to the given cell.
    /// `None` if the cell is infeasible or a link points at an infeasible cell.
    pub fn trace_back(
        &self,
        station: usize,
        latitude: usize,
        bin: usize,
    ) -> Option<Vec<ParentRef>> {
        let mut chain = vec![ParentRef::Node {
            station,
            latitude,
            bin,
        }];
        let (mut station, mut latitude, mut bin) = (station, latitude, bin);
        loop {
            let parent = match self.state(station, latitude, bin) {
                CellState::Feasible { parent, .. } => parent,
                CellState::Infeasible => return None,
            };
            chain.push(parent);
            match parent {
                ParentRef::Node {
                    station: s,
                    latitude: l,
                    bin: b,
                } if s < station => {
                    station = s;
                    latitude = l;
                    bin = b;
                }
                ParentRef::Node { .. } => return None,
                ParentRef::VirtualCubic | ParentRef::VirtualQuintic => break,
            }
        }
        chain.reverse();
        Some(chain)
    }
}
