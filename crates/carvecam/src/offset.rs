//! Toolpath offsetting by tool radius.
//!
//! Each point moves along the bisector of its two adjacent edge normals.
//! This is a local offset: it is cheap and stable, and it does not detect
//! self-intersections, so sharp concave corners may self-overlap. That is
//! the accepted approximation for this pipeline, not something to repair
//! with a polygon-clipping offset.

use crate::types::{Point, Polyline};

/// Offset a polyline by `delta` mm along local normals. Positive delta
/// pushes toward the left of the travel direction. Polylines with fewer
/// than two points pass through unchanged.
pub fn offset_polyline(points: &Polyline, delta: f64) -> Polyline {
    let n = points.len();
    if n < 2 || delta == 0.0 {
        return points.clone();
    }

    let mut result = Vec::with_capacity(n);
    for i in 0..n {
        let incoming = if i > 0 {
            edge_normal(&points[i - 1], &points[i])
        } else {
            (0.0, 0.0)
        };
        let outgoing = if i + 1 < n {
            edge_normal(&points[i], &points[i + 1])
        } else {
            (0.0, 0.0)
        };

        let (bx, by) = renormalize(incoming.0 + outgoing.0, incoming.1 + outgoing.1);
        result.push(Point {
            x: points[i].x + bx * delta,
            y: points[i].y + by * delta,
            z: points[i].z,
        });
    }
    result
}

/// Offset every polyline of an operation's geometry by the tool radius.
/// Mesh-sliced (z-bearing) polylines already describe tool-center motion
/// and pass through untouched.
pub fn offset_operation_polylines(polylines: &[Polyline], tool_radius_mm: f64) -> Vec<Polyline> {
    polylines
        .iter()
        .map(|polyline| {
            if polyline.iter().any(|p| p.z.is_some()) {
                polyline.clone()
            } else {
                offset_polyline(polyline, tool_radius_mm)
            }
        })
        .collect()
}

/// Unit normal of the segment a->b; a zero-length edge contributes a zero
/// normal.
fn edge_normal(a: &Point, b: &Point) -> (f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-12 {
        (0.0, 0.0)
    } else {
        (dy / len, -dx / len)
    }
}

fn renormalize(x: f64, y: f64) -> (f64, f64) {
    let len = (x * x + y * y).sqrt();
    if len < 1e-12 {
        (0.0, 0.0)
    } else {
        (x / len, y / len)
    }
}
