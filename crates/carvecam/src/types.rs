use serde::{Deserialize, Serialize};

/// A point in material space, in millimeters. `z` is present only for
/// mesh-derived geometry; 2D paths carry `None` and cut at the pass depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }
}

/// An ordered, open sequence of points. A usable polyline has at least
/// two points; shorter ones are dropped or passed through untouched.
pub type Polyline = Vec<Point>;

/// The geometric type of a cutter, carrying only the parameters that
/// shape needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolShape {
    /// Flat-bottomed cylindrical cutter. Square footprint on the grid.
    Flat,
    /// Hemispherical tip. Spherical-cap removal profile.
    Ball,
    /// V-shaped engraving cutter defined by its included angle.
    VBit { angle_deg: f64 },
}

impl ToolShape {
    /// Depth of material removed at `dist` mm from the tool center when the
    /// tool is commanded to `depth` mm. `radius` is the tool radius.
    ///
    /// Flat removes the full depth across its whole footprint; ball follows
    /// a spherical cap; v-bit follows a cone. Never returns a negative
    /// value, so applying the result can only deepen a cell.
    pub fn removal_at(&self, dist: f64, depth: f64, radius: f64) -> f64 {
        match self {
            ToolShape::Flat => depth.max(0.0),
            ToolShape::Ball => {
                if dist > radius {
                    0.0
                } else {
                    let cap = radius - (radius * radius - dist * dist).sqrt();
                    (depth - cap).max(0.0)
                }
            }
            ToolShape::VBit { angle_deg } => {
                let half_angle = (angle_deg / 2.0).to_radians();
                let tan_a = half_angle.tan();
                if tan_a <= 0.0 {
                    return 0.0;
                }
                (depth - dist / tan_a).max(0.0)
            }
        }
    }
}

/// A cutting tool, resolved from the library or synthesized from request
/// overrides. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub shape: ToolShape,
    pub diameter_mm: f64,
    pub max_depth_mm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flute_length_mm: Option<f64>,
    pub default_feed_rate_xy: f64,
    pub default_feed_rate_z: f64,
    pub default_spindle_speed: f64,
    pub tool_number: u32,
}

impl Tool {
    pub fn radius_mm(&self) -> f64 {
        self.diameter_mm / 2.0
    }
}

/// Stock material dimensions. All generated coordinates are clamped to the
/// material footprint; depths are bounded by `thickness_mm`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub width_mm: f64,
    pub height_mm: f64,
    pub thickness_mm: f64,
    #[serde(default)]
    pub min_height_mm: f64,
}

impl Material {
    pub fn new(width_mm: f64, height_mm: f64, thickness_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
            thickness_mm,
            min_height_mm: 0.0,
        }
    }

    /// Deepest cut the material allows.
    pub fn max_depth_mm(&self) -> f64 {
        self.thickness_mm
    }

    pub fn is_valid(&self) -> bool {
        self.width_mm > 0.0
            && self.height_mm > 0.0
            && self.thickness_mm > 0.0
            && self.min_height_mm >= 0.0
            && self.min_height_mm < self.thickness_mm
    }
}

/// A group of polylines cut with one tool under one strategy label.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: usize,
    pub tool: Tool,
    pub strategy: String,
    pub polylines: Vec<Polyline>,
}

/// Requested output flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Gcode,
    Dxf,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Gcode => "gcode",
            OutputFormat::Dxf => "dxf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Gcode => "text/plain",
            OutputFormat::Dxf => "image/vnd.dxf",
        }
    }
}

/// Height-field preview tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeightFieldOptions {
    /// Grid columns; rows follow the source aspect ratio.
    pub resolution: usize,
    /// Optional cap on simulated depth, on top of material/tool limits.
    pub max_depth_mm: Option<f64>,
    pub smoothing_enabled: bool,
    pub smoothing_radius: usize,
}

impl Default for HeightFieldOptions {
    fn default() -> Self {
        Self {
            resolution: 200,
            max_depth_mm: None,
            smoothing_enabled: false,
            smoothing_radius: 1,
        }
    }
}

/// The options bag accompanying an upload. Every field has a lenient
/// default so a sparse request still parses; validation happens in the
/// pipeline, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionOptions {
    pub output_format: OutputFormat,
    pub conversion_type: String,
    pub tool_id: Option<String>,
    pub tool_diameter_override_mm: Option<f64>,
    pub material_width_mm: f64,
    pub material_height_mm: f64,
    pub material_thickness_mm: f64,
    pub output_width_mm: f64,
    pub output_height_mm: f64,
    pub keep_aspect_ratio: bool,
    /// Path sampling step in mm.
    pub step_mm: f64,
    /// Client-supplied operations payload: a JSON array, or a string
    /// containing one. Best-effort parsed; see `operations` module.
    pub operations: Option<serde_json::Value>,
    pub safe_height_mm: f64,
    pub cut_depth_mm: f64,
    pub max_step_down_mm: f64,
    pub feed_rate_xy: Option<f64>,
    pub feed_rate_z: Option<f64>,
    pub spindle_speed: Option<f64>,
    /// Slice spacing for STL input, as a percentage of tool diameter.
    pub step_over_percent: f64,
    /// Black/white threshold for raster tracing.
    pub trace_threshold: u8,
    /// Contours below this pixel area are treated as noise and dropped.
    pub trace_min_area_px: usize,
    pub height_field: HeightFieldOptions,
    pub image_width_px: Option<u32>,
    pub image_height_px: Option<u32>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Gcode,
            conversion_type: "outline".to_string(),
            tool_id: None,
            tool_diameter_override_mm: None,
            material_width_mm: 100.0,
            material_height_mm: 100.0,
            material_thickness_mm: 10.0,
            output_width_mm: 100.0,
            output_height_mm: 100.0,
            keep_aspect_ratio: true,
            step_mm: 5.0,
            operations: None,
            safe_height_mm: 5.0,
            cut_depth_mm: -3.0,
            max_step_down_mm: 2.0,
            feed_rate_xy: None,
            feed_rate_z: None,
            spindle_speed: None,
            step_over_percent: 40.0,
            trace_threshold: 128,
            trace_min_area_px: 2,
            height_field: HeightFieldOptions::default(),
            image_width_px: None,
            image_height_px: None,
        }
    }
}

impl ConversionOptions {
    pub fn material(&self) -> Material {
        Material::new(
            self.material_width_mm,
            self.material_height_mm,
            self.material_thickness_mm,
        )
    }
}
