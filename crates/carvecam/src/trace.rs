//! Raster to SVG tracing.
//!
//! Thresholds the image to black/white, follows the boundary cracks between
//! dark and light pixels into closed contours, drops contours below a noise
//! area, and emits the result as an SVG document of `<path>` elements. The
//! vector extractor then treats that document like any uploaded SVG.

use crate::error::{ConvertError, ConvertResult};
use image::GenericImageView;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::collections::HashMap;
use std::io::Cursor;

#[derive(Debug, Clone, Copy)]
pub struct TraceOptions {
    /// Luma values below this are "dark" (part of the shape).
    pub threshold: u8,
    /// Contours enclosing fewer square pixels than this are noise.
    pub min_area_px: usize,
    /// Treat light pixels as the shape instead.
    pub invert: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            threshold: 128,
            min_area_px: 2,
            invert: false,
        }
    }
}

/// Trace an encoded raster image into an SVG document string.
///
/// Returns the traced SVG together with the source pixel dimensions, which
/// feed the height-field grid aspect downstream.
pub fn trace_image_to_svg(bytes: &[u8], opts: &TraceOptions) -> ConvertResult<(String, u32, u32)> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = img.dimensions();
    let gray = img.to_luma8();

    let mut dark = vec![false; (width as usize) * (height as usize)];
    for (x, y, pixel) in gray.enumerate_pixels() {
        let is_dark = pixel.0[0] < opts.threshold;
        dark[(y as usize) * (width as usize) + (x as usize)] = is_dark != opts.invert;
    }

    let contours = extract_contours(&dark, width as usize, height as usize, opts.min_area_px);
    let svg = write_svg(&contours, width, height)?;
    Ok((svg, width, height))
}

type Corner = (u32, u32);

/// Follow boundary cracks into closed contours (corner coordinates).
///
/// Every edge between a dark pixel and a light pixel (or the image border)
/// becomes a directed unit segment with the dark side on the left; chaining
/// segments end-to-start yields closed loops.
fn extract_contours(
    dark: &[bool],
    width: usize,
    height: usize,
    min_area_px: usize,
) -> Vec<Vec<(f64, f64)>> {
    let at = |x: isize, y: isize| -> bool {
        if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
            false
        } else {
            dark[y as usize * width + x as usize]
        }
    };

    // Directed segments keyed by start corner.
    let mut outgoing: HashMap<Corner, Vec<Corner>> = HashMap::new();
    let mut segment_count = 0usize;
    for y in 0..height as isize {
        for x in 0..width as isize {
            if !at(x, y) {
                continue;
            }
            let (xu, yu) = (x as u32, y as u32);
            if !at(x, y - 1) {
                outgoing.entry((xu + 1, yu)).or_default().push((xu, yu));
                segment_count += 1;
            }
            if !at(x, y + 1) {
                outgoing.entry((xu, yu + 1)).or_default().push((xu + 1, yu + 1));
                segment_count += 1;
            }
            if !at(x - 1, y) {
                outgoing.entry((xu, yu)).or_default().push((xu, yu + 1));
                segment_count += 1;
            }
            if !at(x + 1, y) {
                outgoing.entry((xu + 1, yu + 1)).or_default().push((xu + 1, yu));
                segment_count += 1;
            }
        }
    }

    let mut contours = Vec::new();
    let mut starts: Vec<Corner> = outgoing.keys().copied().collect();
    starts.sort_unstable();

    let mut consumed = 0usize;
    for start in starts {
        while consumed < segment_count {
            let first = match outgoing.get_mut(&start).and_then(|v| v.pop()) {
                Some(next) => next,
                None => break,
            };
            consumed += 1;

            let mut loop_points = vec![start, first];
            let mut current = first;
            while current != start {
                // Every in-segment has a matching out-segment, so a chain
                // can only terminate back at its start corner.
                let Some(next) = outgoing.get_mut(&current).and_then(|v| v.pop()) else {
                    break;
                };
                consumed += 1;
                loop_points.push(next);
                current = next;
            }
            if loop_points.last() == Some(&start) {
                loop_points.pop(); // closing corner duplicates the start
            }

            let simplified = merge_collinear(&loop_points);
            if contour_area(&simplified) >= min_area_px as f64 {
                contours.push(
                    simplified
                        .iter()
                        .map(|&(x, y)| (x as f64, y as f64))
                        .collect(),
                );
            }
        }
    }

    contours
}

/// Drop intermediate corners on straight runs of unit segments.
fn merge_collinear(points: &[Corner]) -> Vec<Corner> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let here = points[i];
        let next = points[(i + 1) % n];
        let d0 = (here.0 as i64 - prev.0 as i64, here.1 as i64 - prev.1 as i64);
        let d1 = (next.0 as i64 - here.0 as i64, next.1 as i64 - here.1 as i64);
        if d0.0 * d1.1 != d0.1 * d1.0 {
            out.push(here);
        }
    }
    out
}

/// Unsigned shoelace area in square pixels.
fn contour_area(points: &[Corner]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0i64;
    for i in 0..n {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % n];
        sum += x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64;
    }
    (sum.abs() as f64) / 2.0
}

fn path_data(contour: &[(f64, f64)]) -> String {
    let mut d = String::new();
    for (i, (x, y)) in contour.iter().enumerate() {
        if i == 0 {
            d.push_str(&format!("M{x} {y}"));
        } else {
            d.push_str(&format!(" L{x} {y}"));
        }
    }
    d.push_str(" Z");
    d
}

fn write_svg(contours: &[Vec<(f64, f64)>], width: u32, height: u32) -> ConvertResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut svg = BytesStart::new("svg");
    svg.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
    svg.push_attribute(("width", width.to_string().as_str()));
    svg.push_attribute(("height", height.to_string().as_str()));
    svg.push_attribute(("viewBox", format!("0 0 {width} {height}").as_str()));
    writer
        .write_event(Event::Start(svg))
        .map_err(|e| ConvertError::Internal(format!("svg write: {e}")))?;

    for contour in contours {
        let mut path = BytesStart::new("path");
        path.push_attribute(("d", path_data(contour).as_str()));
        path.push_attribute(("fill", "black"));
        writer
            .write_event(Event::Empty(path))
            .map_err(|e| ConvertError::Internal(format!("svg write: {e}")))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("svg")))
        .map_err(|e| ConvertError::Internal(format!("svg write: {e}")))?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| ConvertError::Internal(format!("svg encoding: {e}")))
}
