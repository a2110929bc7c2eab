//! Minimal DXF support.
//!
//! Output is a geometry-only ENTITIES section of LWPOLYLINEs on layer 0,
//! a deliberately lossy subset of the format. Input reading is equally
//! minimal: LWPOLYLINE and POLYLINE/VERTEX vertices only, used for the
//! preview; a DXF-to-DXF conversion passes the original bytes through
//! untouched.

use crate::types::{Point, Polyline};

/// Emit one LWPOLYLINE entity per polyline, closed, on layer 0.
pub fn generate_dxf(polylines: &[Polyline]) -> String {
    let mut out = String::new();
    push_pair(&mut out, 0, "SECTION");
    push_pair(&mut out, 2, "ENTITIES");

    for polyline in polylines {
        if polyline.len() < 2 {
            continue;
        }
        push_pair(&mut out, 0, "LWPOLYLINE");
        push_pair(&mut out, 8, "0");
        push_pair(&mut out, 90, &polyline.len().to_string());
        push_pair(&mut out, 70, "1");
        for point in polyline {
            push_pair(&mut out, 10, &format!("{:.4}", point.x));
            push_pair(&mut out, 20, &format!("{:.4}", point.y));
        }
    }

    push_pair(&mut out, 0, "ENDSEC");
    push_pair(&mut out, 0, "EOF");
    out
}

fn push_pair(out: &mut String, code: i32, value: &str) {
    out.push_str(&code.to_string());
    out.push('\n');
    out.push_str(value);
    out.push('\n');
}

/// Extract polyline vertices from DXF text, best effort.
///
/// Handles LWPOLYLINE (code 10/20 pairs inline) and the legacy
/// POLYLINE/VERTEX/SEQEND form. Anything else is ignored.
pub fn extract_polylines(text: &str) -> Vec<Polyline> {
    let mut polylines = Vec::new();
    let mut current: Option<Polyline> = None;
    let mut pending_x: Option<f64> = None;

    let mut lines = text.lines().map(str::trim);
    while let Some(code_line) = lines.next() {
        let Some(value_line) = lines.next() else {
            break;
        };
        let Ok(code) = code_line.parse::<i32>() else {
            continue;
        };

        match code {
            0 => {
                match value_line {
                    "LWPOLYLINE" | "POLYLINE" => {
                        flush(&mut current, &mut polylines);
                        current = Some(Vec::new());
                    }
                    // VERTEX entities feed the open POLYLINE; anything
                    // else terminates the current collection.
                    "VERTEX" => {}
                    _ => flush(&mut current, &mut polylines),
                }
                pending_x = None;
            }
            10 => pending_x = value_line.parse().ok(),
            20 => {
                if let (Some(points), Some(x), Ok(y)) =
                    (current.as_mut(), pending_x.take(), value_line.parse::<f64>())
                {
                    points.push(Point::new(x, y));
                }
            }
            _ => {}
        }
    }
    flush(&mut current, &mut polylines);
    polylines
}

fn flush(current: &mut Option<Polyline>, polylines: &mut Vec<Polyline>) {
    if let Some(points) = current.take() {
        if points.len() >= 2 {
            polylines.push(points);
        }
    }
}
