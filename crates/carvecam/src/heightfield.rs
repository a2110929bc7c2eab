//! Height-field material-removal simulation.
//!
//! The stock is a `rows x cols` grid of remaining-height values, each cell
//! starting at the material thickness. Every operation's polylines are
//! resampled and the tool footprint removes material at each sample.
//! Removal is monotonic: a cell only ever gets deeper, floored at
//! `min_height_mm`, and material is never added back.

use crate::types::{Material, Operation, Polyline, Tool};
use serde::Serialize;
use tracing::debug;

/// Minimum resampling step along a polyline, in mm.
const MIN_SAMPLE_STEP_MM: f64 = 0.2;

/// Fraction of the tool diameter used as the preferred sampling step.
const TOOL_STEP_FRACTION: f64 = 0.35;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeightField {
    pub rows: usize,
    pub cols: usize,
    pub cell_width_mm: f64,
    pub cell_height_mm: f64,
    pub min_height_mm: f64,
    pub thickness_mm: f64,
    /// Remaining height per cell, row-major.
    pub cells: Vec<f64>,
}

impl HeightField {
    /// Build a grid for the material. `resolution` fixes the column count;
    /// the row count follows the source image aspect when pixel dimensions
    /// are known, else the material aspect.
    pub fn new(material: &Material, resolution: usize, image_px: Option<(u32, u32)>) -> Self {
        let cols = resolution.max(2);
        let aspect = match image_px {
            Some((w, h)) if w > 0 => h as f64 / w as f64,
            _ => material.height_mm / material.width_mm,
        };
        let rows = ((cols as f64 * aspect).round() as usize).max(2);

        Self {
            rows,
            cols,
            cell_width_mm: material.width_mm / cols as f64,
            cell_height_mm: material.height_mm / rows as f64,
            min_height_mm: material.min_height_mm,
            thickness_mm: material.thickness_mm,
            cells: vec![material.thickness_mm; rows * cols],
        }
    }

    /// Simulate one operation at `target_depth_mm`. 2D polylines cut at the
    /// target depth; z-bearing points cut at their own depth.
    pub fn carve_operation(&mut self, operation: &Operation, target_depth_mm: f64) {
        debug!(
            operation = operation.id,
            tool = %operation.tool.id,
            depth_mm = target_depth_mm,
            "simulating operation"
        );
        for polyline in &operation.polylines {
            self.carve_polyline(&operation.tool, polyline, target_depth_mm);
        }
    }

    fn carve_polyline(&mut self, tool: &Tool, polyline: &Polyline, target_depth_mm: f64) {
        if polyline.len() < 2 {
            return;
        }

        let grid_step = self.cell_width_mm.min(self.cell_height_mm);
        let tool_step = tool.diameter_mm * TOOL_STEP_FRACTION;
        let step = tool_step.min(grid_step).max(MIN_SAMPLE_STEP_MM);

        for pair in polyline.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let length = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
            let samples = ((length / step).ceil() as usize).max(1);
            for i in 0..=samples {
                let t = i as f64 / samples as f64;
                let x = a.x + (b.x - a.x) * t;
                let y = a.y + (b.y - a.y) * t;
                let depth = match (a.z, b.z) {
                    (Some(za), Some(zb)) => -(za + (zb - za) * t),
                    _ => target_depth_mm,
                };
                if depth > 0.0 {
                    self.apply_footprint(tool, x, y, depth);
                }
            }
        }
    }

    /// Remove material under the tool footprint centered at (x, y).
    fn apply_footprint(&mut self, tool: &Tool, x: f64, y: f64, depth: f64) {
        let radius = tool.radius_mm();
        let col_min = (((x - radius) / self.cell_width_mm).floor() as isize).max(0);
        let col_max =
            (((x + radius) / self.cell_width_mm).ceil() as isize).min(self.cols as isize - 1);
        let row_min = (((y - radius) / self.cell_height_mm).floor() as isize).max(0);
        let row_max =
            (((y + radius) / self.cell_height_mm).ceil() as isize).min(self.rows as isize - 1);

        for row in row_min..=row_max {
            for col in col_min..=col_max {
                let cx = (col as f64 + 0.5) * self.cell_width_mm;
                let cy = (row as f64 + 0.5) * self.cell_height_mm;
                let dist = ((cx - x).powi(2) + (cy - y).powi(2)).sqrt();
                let removal = tool.shape.removal_at(dist, depth, radius);
                if removal > 0.0 {
                    let cell = &mut self.cells[row as usize * self.cols + col as usize];
                    *cell = (*cell - removal).max(self.min_height_mm);
                }
            }
        }
    }

    /// Box-blur smoothing pass over the grid.
    pub fn smooth(&mut self, radius: usize) {
        if radius == 0 {
            return;
        }
        let r = radius as isize;
        let mut smoothed = vec![0.0; self.cells.len()];
        for row in 0..self.rows as isize {
            for col in 0..self.cols as isize {
                let mut sum = 0.0;
                let mut count = 0usize;
                for dr in -r..=r {
                    for dc in -r..=r {
                        let rr = row + dr;
                        let cc = col + dc;
                        if rr >= 0 && rr < self.rows as isize && cc >= 0 && cc < self.cols as isize
                        {
                            sum += self.cells[rr as usize * self.cols + cc as usize];
                            count += 1;
                        }
                    }
                }
                smoothed[row as usize * self.cols + col as usize] = sum / count as f64;
            }
        }
        self.cells = smoothed;
    }

    /// Clamp every cell into `[min_height_mm, thickness_mm]`.
    pub fn clamp(&mut self) {
        for cell in &mut self.cells {
            *cell = cell.clamp(self.min_height_mm, self.thickness_mm);
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.cols + col]
    }

    pub fn min_cell(&self) -> f64 {
        self.cells.iter().copied().fold(f64::INFINITY, f64::min)
    }
}
