//! Skin lesion detection over front, left and right photographs of a body region.
//!
//! Each photograph is normalized, run through an object detector, and the detector's
//! overlapping boxes on the same lesion are merged into one before an annotated copy of the
//! image is drawn. See [`consolidation::box_merger`] for the merge rules.

pub mod annotations;
pub mod config;
pub mod consolidation;
pub mod error;
pub mod image_utils;
pub mod object_detection;
pub mod pipeline;
pub mod rendering;
pub mod scan;

pub use annotations::bounding_box::{BoundingBox, BoundingBoxGeometry};
pub use annotations::detection::{Detection, DetectionSet};
pub use config::class_catalog::{ClassCatalog, ClassColorMap};
pub use config::scanner_config::ScannerConfig;
pub use consolidation::box_merger::{BoxMerger, MergeMode, consolidate};
pub use pipeline::detection_pipeline::{DetectionPipeline, DetectorThresholds, PipelineOutput};
pub use scan::view::{View, ViewImages};
