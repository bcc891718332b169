use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::DetectionSet;
use crate::config::class_catalog::ClassColorMap;
use crate::consolidation::box_merger::{BoxMerger, validate_unit_interval};
use crate::error::{PipelineError, ValidationError};
use crate::object_detection::object_detection_model::ObjectDetectionModel;
use crate::rendering::renderer::Renderer;
use image::RgbImage;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_DETECTOR_IOU_THRESHOLD: f32 = 0.3;

/// Settings forwarded to the detector: the score cutoff and the IoU for its internal NMS.
///
/// The detector's NMS is a separate, tighter pass than the post-hoc merge, so its threshold is
/// kept apart from [`BoxMerger`]'s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorThresholds {
    confidence: f32,
    iou: f32,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        DetectorThresholds {
            confidence: DEFAULT_CONFIDENCE_THRESHOLD,
            iou: DEFAULT_DETECTOR_IOU_THRESHOLD,
        }
    }
}

impl DetectorThresholds {
    pub fn new(confidence: f32, iou: f32) -> Result<Self, ValidationError> {
        validate_unit_interval("confidence threshold", confidence)?;
        validate_unit_interval("detector IoU threshold", iou)?;
        Ok(DetectorThresholds { confidence, iou })
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn iou(&self) -> f32 {
        self.iou
    }
}

/// What one image produces: the drawn overlay and the boxes it shows.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutput {
    pub annotated: RgbImage,
    pub detections: DetectionSet,
}

/// Runs one image through detection, consolidation and rendering.
///
/// Holds no per-call state. Errors from the detector and the renderer are returned as they are;
/// nothing is retried and no fallback result is substituted.
pub struct DetectionPipeline<R: Renderer> {
    renderer: R,
    merger: BoxMerger,
}

impl<R: Renderer> DetectionPipeline<R> {
    pub fn new(renderer: R, merger: BoxMerger) -> Self {
        DetectionPipeline { renderer, merger }
    }

    pub fn merger(&self) -> &BoxMerger {
        &self.merger
    }

    pub fn process<D: ObjectDetectionModel<BoundingBox>>(
        &self,
        image: &RgbImage,
        detector: &mut D,
        colors: &ClassColorMap,
        thresholds: DetectorThresholds,
    ) -> Result<PipelineOutput, PipelineError> {
        let raw = detector.run_inference(image, thresholds.confidence(), thresholds.iou())?;
        let detections = self.merger.consolidate(raw);
        let annotated = self.renderer.draw_boxes(image, &detections, colors)?;
        Ok(PipelineOutput {
            annotated,
            detections,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::annotations::detection::Detection;
    use crate::consolidation::box_merger::MergeMode;
    use crate::error::{ModelError, RenderError};
    use crate::rendering::renderer::BoxRenderer;
    use image::Rgb;

    /// Returns canned detections and records the settings it was called with.
    pub(crate) struct FakeDetector {
        pub detections: DetectionSet,
        pub calls: Vec<(f32, f32)>,
    }

    impl ObjectDetectionModel<BoundingBox> for FakeDetector {
        fn run_inference(
            &mut self,
            _image: &RgbImage,
            confidence: f32,
            iou_threshold: f32,
        ) -> Result<DetectionSet, ModelError> {
            self.calls.push((confidence, iou_threshold));
            Ok(self.detections.clone())
        }
    }

    struct BrokenDetector;

    impl ObjectDetectionModel<BoundingBox> for BrokenDetector {
        fn run_inference(
            &mut self,
            _image: &RgbImage,
            _confidence: f32,
            _iou_threshold: f32,
        ) -> Result<DetectionSet, ModelError> {
            Err(ModelError::UnexpectedOutputShape { shape: vec![1, 2] })
        }
    }

    struct BrokenRenderer;

    impl Renderer for BrokenRenderer {
        fn draw_boxes(
            &self,
            _image: &RgbImage,
            _detections: &[Detection<BoundingBox>],
            _colors: &ClassColorMap,
        ) -> Result<RgbImage, RenderError> {
            Err(RenderError::EmptyCanvas { width: 0, height: 0 })
        }
    }

    pub(crate) fn det(
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        confidence: f32,
        class_id: usize,
    ) -> Detection<BoundingBox> {
        Detection {
            annotation: BoundingBox::new(x1, y1, x2, y2, class_id).unwrap(),
            confidence,
        }
    }

    #[test]
    fn process_merges_and_renders() {
        let mut detector = FakeDetector {
            detections: vec![
                det(1.0, 1.0, 9.0, 9.0, 0.8, 0),
                det(0.0, 0.0, 10.0, 10.0, 0.9, 0),
                det(20.0, 20.0, 30.0, 30.0, 0.5, 1),
            ],
            calls: Vec::new(),
        };
        let pipeline = DetectionPipeline::new(BoxRenderer::default(), BoxMerger::default());
        let image = RgbImage::new(40, 40);
        let colors = ClassColorMap::for_classes(2);
        let thresholds = DetectorThresholds::new(0.4, 0.45).unwrap();

        let output = pipeline.process(&image, &mut detector, &colors, thresholds).unwrap();

        assert_eq!(detector.calls, vec![(0.4, 0.45)]);
        assert_eq!(
            output.detections,
            vec![det(0.0, 0.0, 10.0, 10.0, 0.9, 0), det(20.0, 20.0, 30.0, 30.0, 0.5, 1)]
        );
        assert_eq!(output.annotated.dimensions(), (40, 40));
        assert_eq!(output.annotated.get_pixel(0, 5), &Rgb([255, 0, 0]));
        assert_eq!(output.annotated.get_pixel(20, 25), &Rgb([0, 255, 0]));
    }

    #[test]
    fn process_with_no_detections_returns_a_clean_copy() {
        let mut detector = FakeDetector {
            detections: Vec::new(),
            calls: Vec::new(),
        };
        let pipeline = DetectionPipeline::new(BoxRenderer::default(), BoxMerger::default());
        let image = RgbImage::from_pixel(8, 8, Rgb([5, 5, 5]));
        let output = pipeline
            .process(&image, &mut detector, &ClassColorMap::default(), DetectorThresholds::default())
            .unwrap();
        assert!(output.detections.is_empty());
        assert_eq!(output.annotated, image);
    }

    #[test]
    fn process_uses_the_configured_merge_mode() {
        let chain = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.9, 0),
            det(6.0, 0.0, 16.0, 10.0, 0.8, 0),
            det(12.0, 0.0, 22.0, 10.0, 0.7, 0),
        ];
        let image = RgbImage::new(30, 30);
        let colors = ClassColorMap::for_classes(1);
        let transitive = DetectionPipeline::new(
            BoxRenderer::default(),
            BoxMerger::new(0.1, MergeMode::Transitive).unwrap(),
        );
        let mut detector = FakeDetector {
            detections: chain,
            calls: Vec::new(),
        };
        let output = transitive
            .process(&image, &mut detector, &colors, DetectorThresholds::default())
            .unwrap();
        assert_eq!(output.detections, vec![det(0.0, 0.0, 22.0, 10.0, 0.9, 0)]);
    }

    #[test]
    fn detector_errors_propagate_unchanged() {
        let pipeline = DetectionPipeline::new(BoxRenderer::default(), BoxMerger::default());
        let result = pipeline.process(
            &RgbImage::new(4, 4),
            &mut BrokenDetector,
            &ClassColorMap::default(),
            DetectorThresholds::default(),
        );
        match result {
            Err(PipelineError::Model(ModelError::UnexpectedOutputShape { shape })) => {
                assert_eq!(shape, vec![1, 2]);
            }
            other => panic!("expected the detector's error, got {:?}", other),
        }
    }

    fn failing_stage(error: &PipelineError) -> &'static str {
        match error {
            PipelineError::Model(_) => "model",
            PipelineError::Render(_) => "render",
        }
    }

    #[test]
    fn process_fails_only_in_the_model_or_renderer() {
        let pipeline = DetectionPipeline::new(BoxRenderer::default(), BoxMerger::default());
        let error = pipeline
            .process(
                &RgbImage::new(4, 4),
                &mut BrokenDetector,
                &ClassColorMap::default(),
                DetectorThresholds::default(),
            )
            .unwrap_err();
        assert_eq!(failing_stage(&error), "model");

        let pipeline = DetectionPipeline::new(BrokenRenderer, BoxMerger::default());
        let mut detector = FakeDetector {
            detections: Vec::new(),
            calls: Vec::new(),
        };
        let error = pipeline
            .process(
                &RgbImage::new(4, 4),
                &mut detector,
                &ClassColorMap::default(),
                DetectorThresholds::default(),
            )
            .unwrap_err();
        assert_eq!(failing_stage(&error), "render");
    }

    #[test]
    fn renderer_errors_propagate_unchanged() {
        let pipeline = DetectionPipeline::new(BrokenRenderer, BoxMerger::default());
        let mut detector = FakeDetector {
            detections: Vec::new(),
            calls: Vec::new(),
        };
        let result = pipeline.process(
            &RgbImage::new(4, 4),
            &mut detector,
            &ClassColorMap::default(),
            DetectorThresholds::default(),
        );
        assert!(matches!(
            result,
            Err(PipelineError::Render(RenderError::EmptyCanvas { .. }))
        ));
    }

    #[test]
    fn thresholds_outside_unit_interval_are_rejected() {
        assert_eq!(
            DetectorThresholds::new(1.2, 0.3),
            Err(ValidationError::ThresholdOutOfRange {
                name: "confidence threshold",
                value: 1.2
            })
        );
        assert_eq!(
            DetectorThresholds::new(0.25, -0.5),
            Err(ValidationError::ThresholdOutOfRange {
                name: "detector IoU threshold",
                value: -0.5
            })
        );
        assert!(DetectorThresholds::new(0.0, 1.0).is_ok());
    }
}
