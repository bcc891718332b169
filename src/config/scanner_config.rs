use crate::consolidation::box_merger::{BoxMerger, DEFAULT_MERGE_IOU_THRESHOLD, MergeMode};
use crate::error::{ConfigError, ValidationError};
use crate::pipeline::detection_pipeline::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DETECTOR_IOU_THRESHOLD, DetectorThresholds,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Everything a scan needs, built once at startup.
///
/// Loaded from a json file where every field is optional, then overridden from the command
/// line.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScannerConfig {
    pub model_path: PathBuf,
    pub classes_path: PathBuf,
    pub colors_path: Option<PathBuf>,
    /// Where annotated images are written.
    pub output_dir: PathBuf,
    /// Square model input size in pixels.
    pub input_size: u32,
    pub confidence_threshold: f32,
    /// IoU for the detector's own NMS.
    pub detector_iou_threshold: f32,
    /// IoU for the post-hoc merge.
    pub merge_iou_threshold: f32,
    pub merge_mode: MergeMode,
    /// Flatten transparent backgrounds onto white before detection.
    pub remove_background: bool,
    pub box_thickness: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            model_path: PathBuf::from("best.onnx"),
            classes_path: PathBuf::from("classes.txt"),
            colors_path: None,
            output_dir: PathBuf::from("static"),
            input_size: 640,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            detector_iou_threshold: DEFAULT_DETECTOR_IOU_THRESHOLD,
            merge_iou_threshold: DEFAULT_MERGE_IOU_THRESHOLD,
            merge_mode: MergeMode::SeedOnly,
            remove_background: true,
            box_thickness: 2,
        }
    }
}

impl ScannerConfig {
    pub fn from_json_file(filepath: &Path) -> Result<Self, ConfigError> {
        let file = File::open(filepath).map_err(|source| ConfigError::Io {
            path: filepath.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Json {
            path: filepath.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_size == 0 {
            return Err(ConfigError::InvalidInputSize(self.input_size));
        }
        self.detector_thresholds()?;
        self.box_merger()?;
        Ok(())
    }

    pub fn detector_thresholds(&self) -> Result<DetectorThresholds, ValidationError> {
        DetectorThresholds::new(self.confidence_threshold, self.detector_iou_threshold)
    }

    pub fn box_merger(&self) -> Result<BoxMerger, ValidationError> {
        BoxMerger::new(self.merge_iou_threshold, self.merge_mode)
    }
}
