use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::Detection;
use crate::annotations::point::Point;
use crate::error::ModelError;
use crate::image_utils::image_conversion::convert_rgb_image_to_owned_array;
use crate::image_utils::letterbox::letterbox;
use crate::object_detection::object_detection_model::ObjectDetectionModel;
use crate::object_detection::object_detection_utils::non_maximum_suppression;
use crate::object_detection::ort_inference_session::OrtInferenceSession;
use image::RgbImage;
use ndarray::{Array2, ArrayView2, Axis, Ix2};
use ort::inputs;
use ort::value::TensorRef;
use std::path::Path;
use tracing::debug;

/// Number of leading rows in the YOLO output holding the box (cx, cy, w, h).
const BOX_ROWS: usize = 4;

/// A YOLO detection model exported to ONNX (ultralytics v8/v11 layout).
///
/// The model takes a `(1, 3, height, width)` tensor named `images` and returns `output0` shaped
/// `(1, 4 + num_classes, num_proposals)`.
pub struct YoloDetector {
    ort_session: OrtInferenceSession,
    input_width: u32,
    input_height: u32,
    model_name: String,
}

impl YoloDetector {
    pub fn new(
        model_path: &Path,
        input_width: u32,
        input_height: u32,
        model_name: String,
    ) -> Result<Self, ModelError> {
        if input_width == 0 || input_height == 0 {
            return Err(ModelError::InvalidInputSize {
                width: input_width,
                height: input_height,
            });
        }
        let ort_session = OrtInferenceSession::new(model_path)?;
        Ok(YoloDetector {
            ort_session,
            input_width,
            input_height,
            model_name,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn forward(&mut self, input: &RgbImage) -> Result<Array2<f32>, ModelError> {
        let input_array = convert_rgb_image_to_owned_array(input);
        let outputs = self
            .ort_session
            .session
            .run(inputs!["images" => TensorRef::from_array_view(&input_array)?])?;
        let output = outputs["output0"].try_extract_array::<f32>()?;
        let shape: Vec<i64> = output.shape().iter().map(|&d| d as i64).collect();
        if output.ndim() != 3 || output.shape()[0] != 1 || output.shape()[1] <= BOX_ROWS {
            return Err(ModelError::UnexpectedOutputShape { shape });
        }
        output
            .index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map(|predictions| predictions.to_owned())
            .map_err(|_| ModelError::UnexpectedOutputShape { shape })
    }
}

impl ObjectDetectionModel<BoundingBox> for YoloDetector {
    fn run_inference(
        &mut self,
        image: &RgbImage,
        confidence: f32,
        iou_threshold: f32,
    ) -> Result<Vec<Detection<BoundingBox>>, ModelError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ModelError::EmptyImage);
        }
        let boxed = letterbox(image, self.input_width, self.input_height);
        let predictions = self.forward(&boxed.image)?;
        let candidates = decode_predictions(
            predictions.view(),
            confidence,
            boxed.scale,
            image.width(),
            image.height(),
        );
        let proposals = candidates.len();
        let detections = non_maximum_suppression(candidates, iou_threshold);
        debug!(
            model = %self.model_name,
            proposals,
            kept = detections.len(),
            "yolo inference finished"
        );
        Ok(detections)
    }
}

/// Turns raw YOLO predictions into detections in source image pixels.
///
/// `predictions` is `(4 + num_classes, num_proposals)`: each column holds `cx, cy, w, h`
/// followed by one score per class. Each proposal keeps only its best class, and proposals
/// scoring below `confidence` are dropped. Coordinates are divided by the letterbox `scale` and
/// clamped to the source image.
pub fn decode_predictions(
    predictions: ArrayView2<f32>,
    confidence: f32,
    scale: f32,
    image_width: u32,
    image_height: u32,
) -> Vec<Detection<BoundingBox>> {
    let max_x = image_width as f32;
    let max_y = image_height as f32;
    let mut detections: Vec<Detection<BoundingBox>> = Vec::new();
    for column in predictions.axis_iter(Axis(1)) {
        let best = column
            .iter()
            .skip(BOX_ROWS)
            .copied()
            .enumerate()
            .reduce(|accum, row| if row.1 > accum.1 { row } else { accum });
        let Some((class_id, prob)) = best else {
            continue;
        };
        if prob < confidence {
            continue;
        }
        let (cx, cy, w, h) = (column[0], column[1], column[2], column[3]);
        let top_left = Point {
            x: ((cx - w / 2.0) / scale).clamp(0.0, max_x),
            y: ((cy - h / 2.0) / scale).clamp(0.0, max_y),
        };
        let bottom_right = Point {
            x: ((cx + w / 2.0) / scale).clamp(0.0, max_x),
            y: ((cy + h / 2.0) / scale).clamp(0.0, max_y),
        };
        detections.push(Detection {
            annotation: BoundingBox::from_corners(top_left, bottom_right, class_id),
            confidence: prob,
        });
    }
    detections
}
