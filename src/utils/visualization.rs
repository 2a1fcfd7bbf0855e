//! Visualization utilities for lattice_planner
//!
//! Plots lattice nodes, sampled edges and the occupancy grid with gnuplot.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{LatticePose, Point2D};
use crate::path_planning::state_lattice::{LatticePoseTable, PathSamples};

use super::grid_map::ObstacleGrid;

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const OBSTACLE: &str = BLACK;
    pub const LATTICE_NODE: &str = GRAY;
    pub const EDGE: &str = "#9FB7D6";
    pub const BEST_PATH: &str = RED;
    pub const VEHICLE: &str = GREEN;
    pub const HAZARD: &str = "#DD3355";
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: colors::BEST_PATH.to_string(),
            line_width: 2.0,
            caption: "Best trajectory".to_string(),
        }
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

/// Main visualizer struct
pub struct Visualizer {
    figure: Figure,
    title: String,
    x_label: String,
    y_label: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            x_range: None,
            y_range: None,
            aspect_ratio: None,
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    /// Set aspect ratio (None for auto)
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Plot every lattice node
    pub fn plot_lattice(&mut self, poses: &LatticePoseTable) -> &mut Self {
        let (x, y): (Vec<f64>, Vec<f64>) = poses.iter().map(|p| (p.x, p.y)).unzip();
        let style = PointStyle::new(colors::LATTICE_NODE, "Lattice").with_symbol('o');
        self.plot_points_xy(&x, &y, &style)
    }

    /// Plot a sampled edge
    pub fn plot_samples(&mut self, samples: &PathSamples, style: &PathStyle) -> &mut Self {
        let (x, y): (Vec<f64>, Vec<f64>) = samples.iter().map(|s| (s.x, s.y)).unzip();
        self.plot_path_xy(&x, &y, style)
    }

    /// Plot occupied cells of the grid, split at the hazard threshold
    pub fn plot_occupancy(
        &mut self,
        grid: &ObstacleGrid,
        hazard_threshold: f64,
        lethal_value: f64,
    ) -> &mut Self {
        let (lethal, hazard) = occupied_cells(grid, hazard_threshold, lethal_value);
        if !hazard.is_empty() {
            let style = PointStyle::new(colors::HAZARD, "Hazard")
                .with_symbol('S')
                .with_size(0.5);
            self.plot_points(&hazard, &style);
        }
        if !lethal.is_empty() {
            let style = PointStyle::new(colors::OBSTACLE, "Obstacles")
                .with_symbol('S')
                .with_size(0.5);
            self.plot_points(&lethal, &style);
        }
        self
    }

    /// Plot the vehicle pose with a heading indicator
    pub fn plot_vehicle(&mut self, pose: &LatticePose, size: f64) -> &mut Self {
        self.figure.axes2d().points(
            &[pose.x],
            &[pose.y],
            &[
                Caption("Vehicle"),
                Color(colors::VEHICLE),
                PointSymbol('O'),
                PointSize(size),
            ],
        );

        let arrow_len = size * 0.5;
        let end_x = pose.x + arrow_len * pose.heading.cos();
        let end_y = pose.y + arrow_len * pose.heading.sin();
        self.figure.axes2d().lines(
            &[pose.x, end_x],
            &[pose.y, end_y],
            &[Color(colors::VEHICLE), LineWidth(2.0)],
        );
        self
    }

    pub fn plot_path_xy(&mut self, x: &[f64], y: &[f64], style: &PathStyle) -> &mut Self {
        self.figure.axes2d().lines(
            x,
            y,
            &[
                Caption(&style.caption),
                Color(&style.color),
                LineWidth(style.line_width),
            ],
        );
        self
    }

    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        let (x, y): (Vec<f64>, Vec<f64>) = points.iter().map(|p| (p.x, p.y)).unzip();
        self.plot_points_xy(&x, &y, style)
    }

    pub fn plot_points_xy(&mut self, x: &[f64], y: &[f64], style: &PointStyle) -> &mut Self {
        self.figure.axes2d().points(
            x,
            y,
            &[
                Caption(&style.caption),
                Color(&style.color),
                PointSymbol(style.symbol),
                PointSize(style.size),
            ],
        );
        self
    }

    /// Finalize and show the plot
    pub fn show(&mut self) -> Result<(), String> {
        self.apply_settings();
        self.figure.show().map_err(|e| e.to_string()).map(|_| ())
    }

    /// Save plot to PNG file
    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> Result<(), String> {
        self.apply_settings();
        self.figure
            .save_to_png(path, width, height)
            .map_err(|e| e.to_string())
    }

    fn apply_settings(&mut self) {
        let axes = self.figure.axes2d();

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);

        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Cell centers of the grid in the lane frame as `(lethal, hazard)`
fn occupied_cells(
    grid: &ObstacleGrid,
    hazard_threshold: f64,
    lethal_value: f64,
) -> (Vec<Point2D>, Vec<Point2D>) {
    let mut lethal = Vec::new();
    let mut hazard = Vec::new();
    let cells = grid.grid();
    for i in 0..cells.nrows() {
        for j in 0..cells.ncols() {
            let value = cells[(i, j)];
            let center = grid.cell_center(i, j);
            let point = Point2D::new(center.station, center.latitude);
            if value >= lethal_value {
                lethal.push(point);
            } else if value > hazard_threshold {
                hazard.push(point);
            }
        }
    }
    (lethal, hazard)
}
