//! Geometry normalization: bounding box, output scaling, material clamp.

use crate::error::{ConvertError, ConvertResult};
use crate::types::{Material, Polyline};

/// Axis-aligned 2D bounding box in source units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Compute the bounding box over all polyline points.
pub fn bounds_of(polylines: &[Polyline]) -> ConvertResult<Bounds> {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for polyline in polylines {
        for point in polyline {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
    }

    let bounds = Bounds {
        min_x,
        min_y,
        max_x,
        max_y,
    };
    let degenerate = !bounds.width().is_finite()
        || !bounds.height().is_finite()
        || bounds.width() <= 0.0
        || bounds.height() <= 0.0;
    if degenerate {
        return Err(ConvertError::DegenerateGeometry(format!(
            "bounding box {:.3} x {:.3}",
            bounds.width(),
            bounds.height()
        )));
    }
    Ok(bounds)
}

/// Per-axis scale factors from source units to output millimeters.
#[derive(Debug, Clone, Copy)]
pub struct ScalePlan {
    pub scale_x: f64,
    pub scale_y: f64,
    /// The footprint actually occupied after scaling; with aspect kept it
    /// may be smaller than requested on one axis.
    pub footprint_w_mm: f64,
    pub footprint_h_mm: f64,
}

/// Validate the requested output footprint against the material. Cheap,
/// so it runs before any extraction work as well as inside [`plan_scale`].
pub fn check_output_fits(
    output_w_mm: f64,
    output_h_mm: f64,
    material: &Material,
) -> ConvertResult<()> {
    if output_w_mm <= 0.0 || output_h_mm <= 0.0 {
        return Err(ConvertError::InvalidDimensions(format!(
            "output {output_w_mm} x {output_h_mm} mm"
        )));
    }
    if output_w_mm > material.width_mm {
        return Err(ConvertError::OutputExceedsMaterial {
            axis: 'x',
            output_mm: output_w_mm,
            material_mm: material.width_mm,
        });
    }
    if output_h_mm > material.height_mm {
        return Err(ConvertError::OutputExceedsMaterial {
            axis: 'y',
            output_mm: output_h_mm,
            material_mm: material.height_mm,
        });
    }
    Ok(())
}

/// Plan the scaling from a source bounding box to the requested output
/// size. The output must fit the material; checked before any scaling.
pub fn plan_scale(
    bounds: &Bounds,
    output_w_mm: f64,
    output_h_mm: f64,
    keep_aspect_ratio: bool,
    material: &Material,
) -> ConvertResult<ScalePlan> {
    check_output_fits(output_w_mm, output_h_mm, material)?;

    let plan = if keep_aspect_ratio {
        let scale = (output_w_mm / bounds.width()).min(output_h_mm / bounds.height());
        ScalePlan {
            scale_x: scale,
            scale_y: scale,
            footprint_w_mm: bounds.width() * scale,
            footprint_h_mm: bounds.height() * scale,
        }
    } else {
        ScalePlan {
            scale_x: output_w_mm / bounds.width(),
            scale_y: output_h_mm / bounds.height(),
            footprint_w_mm: output_w_mm,
            footprint_h_mm: output_h_mm,
        }
    };
    Ok(plan)
}

/// Map every point into material space: translate to the origin, scale to
/// the output footprint, and clamp into the material (defensive; holds by
/// construction for finite inputs).
///
/// `flip_y` mirrors the y axis, for geometry in image coordinates where y
/// grows downward.
pub fn apply(
    polylines: &mut [Polyline],
    bounds: &Bounds,
    plan: &ScalePlan,
    material: &Material,
    flip_y: bool,
) {
    for polyline in polylines.iter_mut() {
        for point in polyline.iter_mut() {
            let x = (point.x - bounds.min_x) * plan.scale_x;
            let y = if flip_y {
                (bounds.max_y - point.y) * plan.scale_y
            } else {
                (point.y - bounds.min_y) * plan.scale_y
            };
            point.x = x.clamp(0.0, material.width_mm);
            point.y = y.clamp(0.0, material.height_mm);
        }
    }
}

/// Remap mesh-space z values into cut depths: the highest point of the
/// model sits at the material surface (z = 0) and the lowest at
/// `-target_depth_mm`.
pub fn map_depths(polylines: &mut [Polyline], target_depth_mm: f64) {
    let mut min_z = f64::INFINITY;
    let mut max_z = f64::NEG_INFINITY;
    for polyline in polylines.iter() {
        for point in polyline {
            if let Some(z) = point.z {
                min_z = min_z.min(z);
                max_z = max_z.max(z);
            }
        }
    }
    let span = max_z - min_z;
    if !span.is_finite() {
        return;
    }

    for polyline in polylines.iter_mut() {
        for point in polyline.iter_mut() {
            if let Some(z) = point.z {
                let depth = if span > 0.0 {
                    (max_z - z) / span * target_depth_mm
                } else {
                    0.0
                };
                point.z = Some(-depth);
            }
        }
    }
}
