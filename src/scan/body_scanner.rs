use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::DetectionSet;
use crate::config::class_catalog::ClassColorMap;
use crate::error::ScanError;
use crate::image_utils::background::BackgroundNormalizer;
use crate::object_detection::object_detection_model::ObjectDetectionModel;
use crate::pipeline::detection_pipeline::{DetectionPipeline, DetectorThresholds};
use crate::rendering::renderer::Renderer;
use crate::scan::view::{View, ViewImages};
use image::RgbImage;
use tracing::{debug, info};

/// The result for one photographed view.
#[derive(Clone, Debug)]
pub struct ViewOutcome {
    pub view: View,
    pub annotated: RgbImage,
    pub detections: DetectionSet,
}

/// Runs the front, left and right photographs through normalization and the pipeline.
pub struct BodyScanner<R: Renderer> {
    normalizer: Box<dyn BackgroundNormalizer>,
    pipeline: DetectionPipeline<R>,
    thresholds: DetectorThresholds,
}

impl<R: Renderer> BodyScanner<R> {
    pub fn new(
        normalizer: Box<dyn BackgroundNormalizer>,
        pipeline: DetectionPipeline<R>,
        thresholds: DetectorThresholds,
    ) -> Self {
        BodyScanner {
            normalizer,
            pipeline,
            thresholds,
        }
    }

    /// Scans one view.
    pub fn scan_view<D: ObjectDetectionModel<BoundingBox>>(
        &self,
        view: View,
        image_bytes: &[u8],
        detector: &mut D,
        colors: &ClassColorMap,
    ) -> Result<ViewOutcome, ScanError> {
        let image = self
            .normalizer
            .normalize(image_bytes)
            .map_err(|source| ScanError::Normalize { view, source })?;
        debug!(%view, width = image.width(), height = image.height(), "normalized upload");
        let output = self
            .pipeline
            .process(&image, detector, colors, self.thresholds)
            .map_err(|source| ScanError::Pipeline { view, source })?;
        info!(%view, boxes = output.detections.len(), "view scanned");
        Ok(ViewOutcome {
            view,
            annotated: output.annotated,
            detections: output.detections,
        })
    }

    /// Scans every view in [`View::ALL`] order, stopping at the first failure.
    pub fn scan<D: ObjectDetectionModel<BoundingBox>>(
        &self,
        views: &ViewImages,
        detector: &mut D,
        colors: &ClassColorMap,
    ) -> Result<Vec<ViewOutcome>, ScanError> {
        View::ALL
            .into_iter()
            .map(|view| self.scan_view(view, views.get(view), detector, colors))
            .collect()
    }
}
