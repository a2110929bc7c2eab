//! STL parsing and plane-sweep slicing.
//!
//! The slicer is an axis-sweep contour approximation: one cutting plane
//! `x = const` per stepover, one chord per crossing triangle, chords sorted
//! by y into a single polyline per slice. It assumes reasonably
//! convex-per-slice geometry and does not merge multi-component cross
//! sections; that limitation is part of the contract, not a bug.

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Point, Polyline};
use glam::DVec3;
use regex::Regex;
use std::sync::OnceLock;

/// A triangle soup parsed from an STL upload. Read-only after parsing.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<DVec3>,
    pub faces: Vec<[DVec3; 3]>,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Axis-aligned bounds over all vertices, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
        let first = *self.vertices.first()?;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices {
            min = min.min(*v);
            max = max.max(*v);
        }
        Some((min, max))
    }
}

fn vertex_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)vertex\s+([-+0-9.eE]+)\s+([-+0-9.eE]+)\s+([-+0-9.eE]+)")
            .expect("invalid vertex regex")
    })
}

/// Parse an ASCII or binary STL buffer.
///
/// The first 80 bytes decide the dialect: a trimmed `solid` prefix means
/// ASCII. Buffers shorter than the 84-byte binary header are rejected
/// outright.
pub fn parse_stl(bytes: &[u8]) -> ConvertResult<Mesh> {
    if bytes.len() < 84 {
        return Err(ConvertError::MalformedMesh(format!(
            "buffer is {} bytes, below the 84-byte minimum",
            bytes.len()
        )));
    }

    let header = String::from_utf8_lossy(&bytes[..80]);
    if header.trim_start().starts_with("solid") {
        parse_ascii(bytes)
    } else {
        parse_binary(bytes)
    }
}

fn parse_ascii(bytes: &[u8]) -> ConvertResult<Mesh> {
    let text = String::from_utf8_lossy(bytes);
    let mut vertices = Vec::new();
    for capture in vertex_regex().captures_iter(&text) {
        let x: f64 = capture[1].parse().unwrap_or(0.0);
        let y: f64 = capture[2].parse().unwrap_or(0.0);
        let z: f64 = capture[3].parse().unwrap_or(0.0);
        vertices.push(DVec3::new(x, y, z));
    }

    let faces = vertices
        .chunks_exact(3)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect();
    Ok(Mesh { vertices, faces })
}

fn parse_binary(bytes: &[u8]) -> ConvertResult<Mesh> {
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;

    // 50 bytes per triangle: 12-byte normal, 3x 12-byte vertices, 2-byte attribute.
    let expected = 84 + count * 50;
    if bytes.len() < expected {
        return Err(ConvertError::MalformedMesh(format!(
            "truncated binary STL: {} triangles need {} bytes, got {}",
            count,
            expected,
            bytes.len()
        )));
    }

    let mut vertices = Vec::with_capacity(count * 3);
    let mut faces = Vec::with_capacity(count);
    let mut offset = 84;
    for _ in 0..count {
        offset += 12; // skip normal
        let mut face = [DVec3::ZERO; 3];
        for slot in &mut face {
            *slot = read_vec3(bytes, offset);
            offset += 12;
            vertices.push(*slot);
        }
        offset += 2; // skip attribute byte count
        faces.push(face);
    }

    Ok(Mesh { vertices, faces })
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn read_vec3(bytes: &[u8], offset: usize) -> DVec3 {
    DVec3::new(
        read_f32(bytes, offset) as f64,
        read_f32(bytes, offset + 4) as f64,
        read_f32(bytes, offset + 8) as f64,
    )
}

/// Sweep cutting planes `x = const` across the mesh, one slice polyline per
/// plane. Slice spacing is the tool stepover, floored at 1mm.
pub fn slice_mesh(
    mesh: &Mesh,
    tool_diameter_mm: f64,
    step_over_percent: f64,
) -> ConvertResult<Vec<Polyline>> {
    let (min, max) = mesh
        .bounds()
        .ok_or_else(|| ConvertError::DegenerateGeometry("empty mesh".to_string()))?;

    let step = (tool_diameter_mm * step_over_percent / 100.0).max(1.0);
    let mut polylines = Vec::new();

    let mut x = min.x;
    while x <= max.x + 1e-9 {
        let mut chords: Vec<[(f64, f64); 2]> = Vec::new();
        for face in &mesh.faces {
            let mut crossings: Vec<(f64, f64)> = Vec::new();
            for (a, b) in [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])] {
                if let Some(yz) = edge_crossing(a, b, x) {
                    crossings.push(yz);
                }
            }
            if crossings.len() >= 2 {
                let mut chord = [crossings[0], crossings[1]];
                if chord[1].0 < chord[0].0 {
                    chord.swap(0, 1);
                }
                chords.push(chord);
            }
        }

        chords.sort_by(|a, b| a[0].0.total_cmp(&b[0].0));
        let points: Polyline = chords
            .iter()
            .flat_map(|chord| chord.iter().map(|&(y, z)| Point::with_z(x, y, z)))
            .collect();
        if points.len() >= 2 {
            polylines.push(points);
        }

        x += step;
    }

    if polylines.is_empty() {
        return Err(ConvertError::NoToolpathsGenerated);
    }
    Ok(polylines)
}

/// Interpolated (y, z) where edge a-b crosses the plane `x = plane_x`,
/// if it does.
fn edge_crossing(a: DVec3, b: DVec3, plane_x: f64) -> Option<(f64, f64)> {
    let crosses = (a.x <= plane_x && plane_x <= b.x) || (b.x <= plane_x && plane_x <= a.x);
    if !crosses {
        return None;
    }
    let span = b.x - a.x;
    let t = if span.abs() < 1e-12 {
        0.0
    } else {
        (plane_x - a.x) / span
    };
    Some((a.y + (b.y - a.y) * t, a.z + (b.z - a.z) * t))
}
