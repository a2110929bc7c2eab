//! G-code generation.
//!
//! Output is metric (G21), absolute (G90), one tool block per operation.
//! 2D geometry is cut in multiple Z passes down to the target depth; mesh
//! slices carry their own z per point and run in a single continuous pass.

use crate::types::{Material, Operation, Point};
use std::fmt::Write as _;

/// Smallest allowed per-pass step down, in mm.
const MIN_STEP_DOWN_MM: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct GcodeParams {
    pub safe_height_mm: f64,
    pub cut_depth_mm: f64,
    pub max_step_down_mm: f64,
}

#[derive(Debug, Clone, Default)]
pub struct GCode {
    pub lines: Vec<String>,
}

impl GCode {
    pub fn to_text(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

/// Generate a full program for the given operations.
pub fn generate_gcode(
    operations: &[Operation],
    material: &Material,
    params: &GcodeParams,
) -> GCode {
    let mut gcode = GCode::default();

    gcode.push("G21");
    gcode.push("G90");
    gcode.push(format!("G0 Z{:.4}", params.safe_height_mm));

    for operation in operations {
        emit_operation(&mut gcode, operation, material, params);
    }

    gcode.push("M5");
    gcode.push(format!("G0 Z{:.4}", params.safe_height_mm));
    gcode.push("G0 X0 Y0");
    gcode
}

fn emit_operation(
    gcode: &mut GCode,
    operation: &Operation,
    material: &Material,
    params: &GcodeParams,
) {
    let tool = &operation.tool;
    gcode.push(format!(
        "({} #{} - {} - {})",
        operation.strategy, operation.id, tool.name, tool.id
    ));
    if tool.tool_number > 0 {
        gcode.push(format!("T{} M6", tool.tool_number));
    }
    gcode.push(format!("M3 S{:.0}", tool.default_spindle_speed));

    let target_depth = target_depth_mm(operation, material, params);

    let has_z = operation
        .polylines
        .iter()
        .any(|polyline| polyline.iter().any(|p| p.z.is_some()));

    if has_z {
        emit_surface_pass(gcode, operation, material, params);
    } else {
        emit_depth_passes(gcode, operation, material, params, target_depth);
    }

    gcode.push(format!("G0 Z{:.4}", params.safe_height_mm));
}

/// Effective cut depth for an operation: the requested depth, never deeper
/// than the stock or the tool's rated depth.
pub fn target_depth_mm(operation: &Operation, material: &Material, params: &GcodeParams) -> f64 {
    params
        .cut_depth_mm
        .abs()
        .min(material.thickness_mm)
        .min(operation.tool.max_depth_mm)
}

/// Z levels for the multi-pass descent to `target_depth`. Evenly spaced so
/// the last level lands exactly on the target.
pub fn pass_levels(target_depth: f64, max_step_down: f64) -> Vec<f64> {
    if target_depth <= 0.0 {
        return Vec::new();
    }
    let step = max_step_down.max(MIN_STEP_DOWN_MM);
    let passes = (target_depth / step).ceil().max(1.0) as usize;
    (1..=passes)
        .map(|i| -(target_depth * i as f64 / passes as f64))
        .collect()
}

fn emit_depth_passes(
    gcode: &mut GCode,
    operation: &Operation,
    material: &Material,
    params: &GcodeParams,
    target_depth: f64,
) {
    let tool = &operation.tool;
    for z in pass_levels(target_depth, params.max_step_down_mm) {
        for polyline in &operation.polylines {
            if polyline.len() < 2 {
                continue;
            }
            let start = clamped(&polyline[0], material);
            gcode.push(format!("G0 Z{:.4}", params.safe_height_mm));
            gcode.push(format!("G0 X{:.4} Y{:.4}", start.0, start.1));
            gcode.push(format!("G1 Z{:.4} F{:.1}", z, tool.default_feed_rate_z));
            for point in &polyline[1..] {
                let (x, y) = clamped(point, material);
                gcode.push(format!(
                    "G1 X{:.4} Y{:.4} F{:.1}",
                    x, y, tool.default_feed_rate_xy
                ));
            }
        }
    }
}

/// Single pass following per-point z, used for mesh slice toolpaths.
fn emit_surface_pass(
    gcode: &mut GCode,
    operation: &Operation,
    material: &Material,
    params: &GcodeParams,
) {
    let tool = &operation.tool;
    for polyline in &operation.polylines {
        if polyline.len() < 2 {
            continue;
        }
        let start = clamped(&polyline[0], material);
        let start_z = polyline[0].z.unwrap_or(0.0);
        gcode.push(format!("G0 Z{:.4}", params.safe_height_mm));
        gcode.push(format!("G0 X{:.4} Y{:.4}", start.0, start.1));
        gcode.push(format!(
            "G1 Z{:.4} F{:.1}",
            start_z, tool.default_feed_rate_z
        ));
        for point in &polyline[1..] {
            let (x, y) = clamped(point, material);
            let mut line = String::new();
            let _ = write!(line, "G1 X{:.4} Y{:.4}", x, y);
            if let Some(z) = point.z {
                let _ = write!(line, " Z{:.4}", z);
            }
            let _ = write!(line, " F{:.1}", tool.default_feed_rate_xy);
            gcode.push(line);
        }
    }
}

fn clamped(point: &Point, material: &Material) -> (f64, f64) {
    (
        point.x.clamp(0.0, material.width_mm),
        point.y.clamp(0.0, material.height_mm),
    )
}
