use crate::scan::view::View;
use std::path::PathBuf;
use thiserror::Error;

/// Raised when an annotation is constructed with impossible geometry.
#[derive(Debug, Error, PartialEq)]
pub enum AnnotationError {
    #[error("Failed to create BoundingBox, value for left > value for right ({left} > {right}).")]
    LeftExceedsRight { left: f32, right: f32 },

    #[error("Failed to create BoundingBox, value for top > value for bottom ({top} > {bottom}).")]
    TopExceedsBottom { top: f32, bottom: f32 },
}

/// Caller mistakes in the parameters handed to the core.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{name} must be between 0.0 and 1.0, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },
}

/// Failures from the object detection model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model file does not exist, or cannot be read: {0:?}")]
    MissingModel(PathBuf),

    #[error(transparent)]
    Runtime(#[from] ort::Error),

    #[error("unexpected model output shape {shape:?}, expected [1, 4 + classes, proposals]")]
    UnexpectedOutputShape { shape: Vec<i64> },

    #[error("model input size must be > 0, got {width}x{height}")]
    InvalidInputSize { width: u32, height: u32 },

    #[error("cannot run inference on an empty image")]
    EmptyImage,
}

/// Failures while turning uploaded bytes into a normalized RGB image.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image dimensions are zero")]
    ZeroDimensions,
}

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("cannot draw on an empty image ({width}x{height})")]
    EmptyCanvas { width: u32, height: u32 },
}

/// Everything that can stop a single image from going through the pipeline.
///
/// All variants are transparent so collaborator failures reach the caller
/// with their original message.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{view} view: {source}")]
    Normalize {
        view: View,
        #[source]
        source: NormalizeError,
    },

    #[error("{view} view: {source}")]
    Pipeline {
        view: View,
        #[source]
        source: PipelineError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("class file {0:?} does not contain any class names")]
    NoClasses(PathBuf),

    #[error("invalid color entry {key:?}: {reason}")]
    InvalidColor { key: String, reason: String },

    #[error("input size must be > 0, got {0}")]
    InvalidInputSize(u32),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("{view} view: class id {class_id} is not in the class table ({known} classes)")]
    UnknownClass {
        view: View,
        class_id: usize,
        known: usize,
    },
}
