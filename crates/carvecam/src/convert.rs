//! The conversion pipeline.
//!
//! One entry point turns an upload plus options into an output file and a
//! preview: classify, validate, extract geometry, normalize into material
//! space, assemble operations, offset by tool radius, simulate removal,
//! emit G-code or DXF, and register the result.

use crate::dxf;
use crate::error::{ConvertError, ConvertResult};
use crate::format::{self, InputKind};
use crate::gcode::{self, GcodeParams};
use crate::heightfield::HeightField;
use crate::mesh;
use crate::normalize;
use crate::offset;
use crate::operations;
use crate::registry::OutputRegistry;
use crate::tool_library::ToolLibrary;
use crate::trace::{self, TraceOptions};
use crate::types::{ConversionOptions, Material, Operation, OutputFormat, Polyline, Tool};
use crate::vector;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use ulid::Ulid;

/// Preview path colors, cycled per operation.
pub const OPERATION_COLORS: &[&str] = &[
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#469990",
];

/// An upload together with its conversion options.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub options: ConversionOptions,
}

/// One operation's toolpaths as drawn in the preview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPreview {
    pub id: usize,
    pub tool_id: String,
    pub tool_name: String,
    pub strategy: String,
    pub color: String,
    pub polylines: Vec<Polyline>,
}

/// Everything a client needs to render the result before downloading it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub material: Material,
    pub operations: Vec<OperationPreview>,
    pub height_field: HeightField,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub output_id: Ulid,
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub format: OutputFormat,
    pub mime_type: &'static str,
    pub conversion_type: String,
    pub created_at: DateTime<Utc>,
    pub preview: Preview,
}

/// The pipeline itself: a tool library, an output directory, and the
/// bounded registry of files written so far.
#[derive(Debug)]
pub struct Converter {
    library: ToolLibrary,
    output_dir: PathBuf,
    registry: OutputRegistry,
}

impl Converter {
    pub fn new(library: ToolLibrary, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            library,
            output_dir: output_dir.into(),
            registry: OutputRegistry::default(),
        }
    }

    pub fn registry(&self) -> &OutputRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut OutputRegistry {
        &mut self.registry
    }

    /// Run the full pipeline for one request.
    pub fn convert(&mut self, request: &ConversionRequest) -> ConvertResult<ConversionResult> {
        let options = &request.options;

        // Cheap request validation happens before any heavy parsing.
        let kind = format::classify(&request.file_name, &request.mime_type)?;
        format::check_output_compat(kind, options.output_format)?;
        let material = options.material();
        if !material.is_valid() {
            return Err(ConvertError::InvalidDimensions(format!(
                "material {} x {} x {} mm",
                material.width_mm, material.height_mm, material.thickness_mm
            )));
        }
        normalize::check_output_fits(options.output_width_mm, options.output_height_mm, &material)?;
        let tool = self.resolve_request_tool(options)?;
        let specs = operations::parse_operation_specs(options.operations.as_ref())?;

        info!(
            file = %request.file_name,
            input = kind.label(),
            output = ?options.output_format,
            tool = %tool.id,
            "starting conversion"
        );

        let (polylines, image_px) = self.extract_geometry(kind, request, &tool)?;
        debug!(polylines = polylines.len(), "geometry extracted");

        let operations = operations::assemble(polylines, specs, &self.library, &tool);
        if operations.is_empty() {
            return Err(ConvertError::NoToolpathsGenerated);
        }

        let params = GcodeParams {
            safe_height_mm: options.safe_height_mm,
            cut_depth_mm: options.cut_depth_mm,
            max_step_down_mm: options.max_step_down_mm,
        };

        let operations: Vec<Operation> = operations
            .into_iter()
            .map(|mut op| {
                op.polylines =
                    offset::offset_operation_polylines(&op.polylines, op.tool.radius_mm());
                // Offsetting can push past the stock edge; pull it back in.
                for polyline in &mut op.polylines {
                    for point in polyline.iter_mut() {
                        point.x = point.x.clamp(0.0, material.width_mm);
                        point.y = point.y.clamp(0.0, material.height_mm);
                    }
                }
                op
            })
            .collect();

        let height_field = self.simulate(&operations, &material, &params, options, image_px);

        let output = self.render_output(kind, request, &operations, &material, &params);
        let (path, file_name) = self.write_output(&request.file_name, options.output_format, &output)?;
        let output_id =
            self.registry
                .insert(path.clone(), options.output_format, output.len() as u64);
        let created_at = self
            .registry
            .get(output_id)
            .map(|record| record.created_at)
            .unwrap_or_else(Utc::now);

        info!(%output_id, file = %file_name, bytes = output.len(), "conversion finished");

        Ok(ConversionResult {
            output_id,
            file_name,
            path,
            format: options.output_format,
            mime_type: options.output_format.mime_type(),
            conversion_type: options.conversion_type.clone(),
            created_at,
            preview: Preview {
                material,
                operations: operations
                    .iter()
                    .map(|op| OperationPreview {
                        id: op.id,
                        tool_id: op.tool.id.clone(),
                        tool_name: op.tool.name.clone(),
                        strategy: op.strategy.clone(),
                        color: OPERATION_COLORS[op.id % OPERATION_COLORS.len()].to_string(),
                        polylines: op.polylines.clone(),
                    })
                    .collect(),
                height_field,
            },
        })
    }

    /// Resolve the request's default tool and fold in feed/speed overrides.
    fn resolve_request_tool(&self, options: &ConversionOptions) -> ConvertResult<Tool> {
        let mut tool = self.library.resolve(
            options.tool_id.as_deref(),
            options.tool_diameter_override_mm,
        )?;
        if let Some(feed) = options.feed_rate_xy {
            if feed > 0.0 {
                tool.default_feed_rate_xy = feed;
            }
        }
        if let Some(feed) = options.feed_rate_z {
            if feed > 0.0 {
                tool.default_feed_rate_z = feed;
            }
        }
        if let Some(speed) = options.spindle_speed {
            if speed > 0.0 {
                tool.default_spindle_speed = speed;
            }
        }
        Ok(tool)
    }

    /// Pull polylines out of the upload and map them into material space.
    ///
    /// Raster and SVG inputs are in image coordinates (y grows downward)
    /// and get mirrored; DXF and STL are already y-up.
    fn extract_geometry(
        &self,
        kind: InputKind,
        request: &ConversionRequest,
        tool: &Tool,
    ) -> ConvertResult<(Vec<Polyline>, Option<(u32, u32)>)> {
        let options = &request.options;
        let material = options.material();

        let (mut polylines, flip_y, image_px) = match kind {
            InputKind::Raster => {
                let trace_opts = TraceOptions {
                    threshold: options.trace_threshold,
                    min_area_px: options.trace_min_area_px,
                    invert: false,
                };
                let (svg, width, height) = trace::trace_image_to_svg(&request.bytes, &trace_opts)?;
                let polylines = vector::extract_polylines(&svg, options.step_mm)?;
                (polylines, true, Some((width, height)))
            }
            InputKind::Svg => {
                let text = String::from_utf8_lossy(&request.bytes);
                let polylines = vector::extract_polylines(&text, options.step_mm)?;
                (polylines, true, None)
            }
            InputKind::Dxf => {
                let text = String::from_utf8_lossy(&request.bytes);
                let polylines = dxf::extract_polylines(&text);
                if polylines.is_empty() {
                    return Err(ConvertError::NoVectorPaths);
                }
                (polylines, false, None)
            }
            InputKind::Stl => {
                let mesh = mesh::parse_stl(&request.bytes)?;
                let polylines =
                    mesh::slice_mesh(&mesh, tool.diameter_mm, options.step_over_percent)?;
                (polylines, false, None)
            }
        };

        let bounds = normalize::bounds_of(&polylines)?;
        let plan = normalize::plan_scale(
            &bounds,
            options.output_width_mm,
            options.output_height_mm,
            options.keep_aspect_ratio,
            &material,
        )?;
        normalize::apply(&mut polylines, &bounds, &plan, &material, flip_y);

        if kind == InputKind::Stl {
            let target = options
                .cut_depth_mm
                .abs()
                .min(material.thickness_mm)
                .min(tool.max_depth_mm);
            normalize::map_depths(&mut polylines, target);
        }

        Ok((polylines, image_px))
    }

    fn simulate(
        &self,
        operations: &[Operation],
        material: &Material,
        params: &GcodeParams,
        options: &ConversionOptions,
        image_px: Option<(u32, u32)>,
    ) -> HeightField {
        let hf_opts = &options.height_field;
        let mut field = HeightField::new(material, hf_opts.resolution, image_px);
        for operation in operations {
            let mut depth = gcode::target_depth_mm(operation, material, params);
            if let Some(cap) = hf_opts.max_depth_mm {
                depth = depth.min(cap);
            }
            field.carve_operation(operation, depth);
        }
        if hf_opts.smoothing_enabled {
            field.smooth(hf_opts.smoothing_radius);
        }
        field.clamp();
        field
    }

    /// Produce the output bytes. A DXF-to-DXF conversion is a passthrough:
    /// the preview still runs the full pipeline, but the file keeps every
    /// entity of the original.
    fn render_output(
        &self,
        kind: InputKind,
        request: &ConversionRequest,
        operations: &[Operation],
        material: &Material,
        params: &GcodeParams,
    ) -> Vec<u8> {
        match request.options.output_format {
            OutputFormat::Gcode => gcode::generate_gcode(operations, material, params)
                .to_text()
                .into_bytes(),
            OutputFormat::Dxf if kind == InputKind::Dxf => request.bytes.clone(),
            OutputFormat::Dxf => {
                let polylines: Vec<Polyline> = operations
                    .iter()
                    .flat_map(|op| op.polylines.iter().cloned())
                    .collect();
                dxf::generate_dxf(&polylines).into_bytes()
            }
        }
    }

    fn write_output(
        &self,
        input_name: &str,
        format: OutputFormat,
        bytes: &[u8],
    ) -> ConvertResult<(PathBuf, String)> {
        fs::create_dir_all(&self.output_dir)?;
        let stem = Path::new(input_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        let file_name = format!("{}-{}.{}", stem, Ulid::new(), format.extension());
        let path = self.output_dir.join(&file_name);
        fs::write(&path, bytes)?;
        Ok((path, file_name))
    }
}
