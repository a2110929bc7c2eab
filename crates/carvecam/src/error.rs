//! Error types for the conversion pipeline.
//!
//! All errors are request-scoped and non-fatal to the process. Each variant
//! maps to an HTTP-equivalent class so the transport layer can pick a
//! status code without inspecting messages.

use crate::types::OutputFormat;
use std::io;
use thiserror::Error;

/// Errors produced while turning an upload into machine output.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Neither the file extension nor the declared MIME type matched any
    /// supported input category.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The input format cannot be emitted as the requested output format.
    #[error("{input} input can only be converted to {required:?} output")]
    IncompatibleOutput {
        input: &'static str,
        required: OutputFormat,
    },

    /// Material or output dimensions are missing or non-positive.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// The requested output footprint does not fit the material.
    #[error("requested output {output_mm}mm exceeds material {material_mm}mm on {axis}")]
    OutputExceedsMaterial {
        axis: char,
        output_mm: f64,
        material_mm: f64,
    },

    /// The requested tool id is not in the library.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The operations payload was present but not a JSON array.
    #[error("invalid operations payload: {0}")]
    InvalidOperationsPayload(String),

    /// No samplable vector paths were found in the input.
    #[error("no vector paths found in input")]
    NoVectorPaths,

    /// The STL buffer could not be parsed.
    #[error("malformed STL mesh: {0}")]
    MalformedMesh(String),

    /// The geometry bounding box is empty or non-finite.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Sweeping the mesh produced no usable slice contours.
    #[error("no toolpaths generated from mesh")]
    NoToolpathsGenerated,

    /// Raster decode failed.
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error writing the output file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Anything unexpected; surfaced with a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}

/// HTTP-equivalent classes for [`ConvertError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 400: the request itself is wrong.
    InvalidInput,
    /// 415: the upload is not a supported format for this conversion.
    UnsupportedFormat,
    /// 422: the upload was accepted but could not be processed.
    Unprocessable,
    /// 500: unexpected failure.
    Internal,
}

impl ErrorClass {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorClass::InvalidInput => 400,
            ErrorClass::UnsupportedFormat => 415,
            ErrorClass::Unprocessable => 422,
            ErrorClass::Internal => 500,
        }
    }
}

impl ConvertError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ConvertError::InvalidDimensions(_)
            | ConvertError::OutputExceedsMaterial { .. }
            | ConvertError::UnknownTool(_)
            | ConvertError::InvalidOperationsPayload(_) => ErrorClass::InvalidInput,
            ConvertError::UnsupportedFileType(_) | ConvertError::IncompatibleOutput { .. } => {
                ErrorClass::UnsupportedFormat
            }
            ConvertError::NoVectorPaths
            | ConvertError::MalformedMesh(_)
            | ConvertError::DegenerateGeometry(_)
            | ConvertError::NoToolpathsGenerated => ErrorClass::Unprocessable,
            ConvertError::Image(_) | ConvertError::Io(_) | ConvertError::Internal(_) => {
                ErrorClass::Internal
            }
        }
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;
