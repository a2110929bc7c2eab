//! Input format classification.
//!
//! Accepts an upload when EITHER its extension OR its declared MIME type
//! matches a supported category. Browsers and desktop tools routinely
//! mislabel MIME types, so this is a deliberate union check, not an
//! intersection.

use crate::error::{ConvertError, ConvertResult};
use crate::types::OutputFormat;

/// Supported input categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Raster,
    Svg,
    Dxf,
    Stl,
}

impl InputKind {
    pub fn label(&self) -> &'static str {
        match self {
            InputKind::Raster => "raster",
            InputKind::Svg => "svg",
            InputKind::Dxf => "dxf",
            InputKind::Stl => "stl",
        }
    }
}

const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tif", "tiff"];
const RASTER_MIMES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/bmp",
    "image/gif",
    "image/webp",
    "image/tiff",
];

const SVG_EXTENSIONS: &[&str] = &["svg"];
const SVG_MIMES: &[&str] = &["image/svg+xml"];

const DXF_EXTENSIONS: &[&str] = &["dxf"];
const DXF_MIMES: &[&str] = &[
    "image/vnd.dxf",
    "image/x-dxf",
    "application/dxf",
    "application/x-dxf",
];

const STL_EXTENSIONS: &[&str] = &["stl"];
const STL_MIMES: &[&str] = &[
    "model/stl",
    "model/x.stl-ascii",
    "model/x.stl-binary",
    "application/sla",
];

fn extension_of(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

/// Classify an upload by filename extension and declared MIME type.
pub fn classify(file_name: &str, mime_type: &str) -> ConvertResult<InputKind> {
    let ext = extension_of(file_name);
    let mime = mime_type.trim().to_lowercase();

    let categories: [(InputKind, &[&str], &[&str]); 4] = [
        (InputKind::Raster, RASTER_EXTENSIONS, RASTER_MIMES),
        (InputKind::Svg, SVG_EXTENSIONS, SVG_MIMES),
        (InputKind::Dxf, DXF_EXTENSIONS, DXF_MIMES),
        (InputKind::Stl, STL_EXTENSIONS, STL_MIMES),
    ];

    for (kind, exts, mimes) in categories {
        let ext_match = ext.as_deref().is_some_and(|e| exts.contains(&e));
        let mime_match = mimes.contains(&mime.as_str());
        if ext_match || mime_match {
            return Ok(kind);
        }
    }

    Err(ConvertError::UnsupportedFileType(format!(
        "{file_name} ({mime_type})"
    )))
}

/// Cross-format constraints: DXF input can only round-trip to DXF, STL
/// input can only become G-code. Everything else may target either output.
pub fn check_output_compat(kind: InputKind, format: OutputFormat) -> ConvertResult<()> {
    let required = match kind {
        InputKind::Dxf => Some(OutputFormat::Dxf),
        InputKind::Stl => Some(OutputFormat::Gcode),
        InputKind::Raster | InputKind::Svg => None,
    };
    match required {
        Some(req) if req != format => Err(ConvertError::IncompatibleOutput {
            input: kind.label(),
            required: req,
        }),
        _ => Ok(()),
    }
}
