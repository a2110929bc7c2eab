mod convert;
mod dxf;
mod error;
mod format;
mod gcode;
mod heightfield;
mod mesh;
mod normalize;
mod offset;
mod operations;
mod registry;
mod tool_library;
mod trace;
mod types;
mod vector;

pub use convert::{
    ConversionRequest, ConversionResult, Converter, OperationPreview, Preview, OPERATION_COLORS,
};
pub use dxf::{extract_polylines as extract_dxf_polylines, generate_dxf};
pub use error::{ConvertError, ConvertResult, ErrorClass};
pub use format::{check_output_compat, classify, InputKind};
pub use gcode::{generate_gcode, pass_levels, GCode, GcodeParams};
pub use heightfield::HeightField;
pub use mesh::{parse_stl, slice_mesh, Mesh};
pub use normalize::{bounds_of, check_output_fits, map_depths, plan_scale, Bounds, ScalePlan};
pub use offset::{offset_operation_polylines, offset_polyline};
pub use operations::{assemble, parse_operation_specs, OperationSpec, OUTLINE_STRATEGY};
pub use registry::{OutputRecord, OutputRegistry, DEFAULT_MAX_ENTRIES};
pub use tool_library::ToolLibrary;
pub use trace::{trace_image_to_svg, TraceOptions};
pub use types::*;
pub use vector::{extract_polylines, DEFAULT_STEP_MM};
