use crate::annotations::bounding_box::BoundingBoxGeometry;
use crate::annotations::detection::Detection;
use crate::error::ModelError;
use image::RgbImage;

/// Defines a trait that all object detection models must follow.
///
/// `run_inference` takes `&mut self`: a model session is not assumed to be safe for overlapping
/// calls, so callers hand out one mutable borrow per image.
///
/// `confidence` drops proposals below that score and `iou_threshold` drives the model's own
/// non-maximum suppression. Both are passed through untouched by the pipeline.
pub trait ObjectDetectionModel<T: BoundingBoxGeometry> {
    fn run_inference(
        &mut self,
        image: &RgbImage,
        confidence: f32,
        iou_threshold: f32,
    ) -> Result<Vec<Detection<T>>, ModelError>;
}
