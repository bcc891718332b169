use crate::annotations::bounding_box::BoundingBoxGeometry;
use crate::annotations::detection::Detection;
use crate::error::ConfigError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads a file with the class names into a vector so that the number ids
/// which come directly from the ORT inference session can be given meaning.
///
/// Blank lines are skipped and surrounding whitespace is trimmed.
pub fn read_classes_txt_file(filepath: &Path) -> Result<Vec<String>, ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: filepath.to_path_buf(),
        source,
    };
    let file = File::open(filepath).map_err(io_error)?;
    let mut class_names: Vec<String> = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(io_error)?;
        let name = line.trim();
        if !name.is_empty() {
            class_names.push(name.to_string());
        }
    }
    if class_names.is_empty() {
        return Err(ConfigError::NoClasses(filepath.to_path_buf()));
    }
    Ok(class_names)
}

/// Non maxmimum suppression is a way of removing duplicate detections.
///
/// Unlike the post-hoc merge, suppressed boxes are dropped outright rather than folded into the
/// box that suppressed them.
pub fn non_maximum_suppression<T: BoundingBoxGeometry>(
    mut detections: Vec<Detection<T>>,
    iou_threshold: f32,
) -> Vec<Detection<T>> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut detections_to_remove: Vec<bool> = vec![false; detections.len()];
    for (current_index, current_det) in detections.iter().enumerate() {
        if detections_to_remove[current_index] {
            continue;
        }
        for (other_index, other_det) in detections[current_index + 1..].iter().enumerate() {
            if detections_to_remove[current_index + other_index + 1] {
                continue;
            }
            if current_det.annotation.class_id() != other_det.annotation.class_id() {
                continue;
            }
            let iou = current_det
                .annotation
                .intersection_over_union(&other_det.annotation);
            if iou > iou_threshold {
                detections_to_remove[current_index + other_index + 1] = true;
            }
        }
    }
    let mut drop_iter = detections_to_remove.into_iter();
    detections.retain(|_| !drop_iter.next().unwrap_or(false));
    detections
}
