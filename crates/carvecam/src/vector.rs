//! Vector extraction: SVG text to sampled polylines.
//!
//! Only `<path d="...">` elements are honored; the `d` attributes are pulled
//! out textually rather than through a full SVG DOM, which keeps traced and
//! hand-authored documents on the same code path. Each path is walked along
//! its arclength and sampled every `step` mm.

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Point, Polyline};
use kurbo::{BezPath, ParamCurve, ParamCurveArclen, PathSeg};
use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_STEP_MM: f64 = 5.0;

const ARCLEN_ACCURACY: f64 = 1e-4;

fn path_d_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<path[^>]*?\sd\s*=\s*["']([^"']+)["']"#).expect("invalid path regex")
    })
}

/// Extract every samplable path in an SVG document as a polyline.
///
/// Paths whose `d` attribute fails to parse are skipped; paths yielding
/// fewer than two samples are dropped. Zero surviving paths is an error.
pub fn extract_polylines(svg_text: &str, step_mm: f64) -> ConvertResult<Vec<Polyline>> {
    let step = if step_mm > 0.0 { step_mm } else { DEFAULT_STEP_MM };

    let mut polylines = Vec::new();
    for capture in path_d_regex().captures_iter(svg_text) {
        let Ok(path) = BezPath::from_svg(&capture[1]) else {
            continue;
        };
        let samples = sample_path(&path, step);
        if samples.len() >= 2 {
            polylines.push(samples);
        }
    }

    if polylines.is_empty() {
        return Err(ConvertError::NoVectorPaths);
    }
    Ok(polylines)
}

/// Walk a path's length and sample a point every `step` mm, always
/// including both endpoints.
fn sample_path(path: &BezPath, step: f64) -> Polyline {
    let segments: Vec<PathSeg> = path.segments().collect();
    if segments.is_empty() {
        return Vec::new();
    }
    let lengths: Vec<f64> = segments
        .iter()
        .map(|seg| seg.arclen(ARCLEN_ACCURACY))
        .collect();
    let total: f64 = lengths.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Vec::new();
    }

    let whole_steps = (total / step).floor() as usize;
    let mut points = Vec::with_capacity(whole_steps + 2);
    for i in 0..=whole_steps {
        points.push(point_at(&segments, &lengths, i as f64 * step));
    }
    // The endpoint, unless the length is an exact multiple of the step.
    if total - whole_steps as f64 * step > 1e-9 {
        points.push(point_at(&segments, &lengths, total));
    }
    points
}

fn point_at(segments: &[PathSeg], lengths: &[f64], distance: f64) -> Point {
    let mut remaining = distance;
    for (i, (seg, &len)) in segments.iter().zip(lengths).enumerate() {
        if remaining <= len || i + 1 == segments.len() {
            let t = if len > 0.0 {
                seg.inv_arclen(remaining.min(len), ARCLEN_ACCURACY)
            } else {
                0.0
            };
            let p = seg.eval(t);
            return Point::new(p.x, p.y);
        }
        remaining -= len;
    }
    // Unreachable for non-empty segments; degenerate fallback.
    Point::new(0.0, 0.0)
}
