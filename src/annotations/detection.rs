use crate::annotations::bounding_box::{BoundingBox, BoundingBoxGeometry};
use serde::Serialize;

/// A detection is what is produced as output from an object detection model.
///
/// A detection is any annotation combined with a confidence score: a probability value that
/// encodes the model's belief that the detection is true.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection<T: BoundingBoxGeometry> {
    pub annotation: T,
    pub confidence: f32,
}

/// All detections for one image. Order carries no meaning.
pub type DetectionSet = Vec<Detection<BoundingBox>>;
