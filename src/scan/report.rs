use crate::annotations::bounding_box::BoundingBoxGeometry;
use crate::config::class_catalog::ClassCatalog;
use crate::error::ReportError;
use crate::scan::body_scanner::ViewOutcome;
use crate::scan::view::View;
use serde::Serialize;
use std::collections::BTreeMap;

/// One box as reported to clients. Coordinates are truncated to whole pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoxRecord {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    pub confidence: f32,
    pub class_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewReport {
    pub annotated_image_url: String,
    pub bboxes: Vec<BoxRecord>,
}

/// Per-view results, serialized as `{"front": {...}, "left": {...}, "right": {...}}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScanReport {
    pub views: BTreeMap<View, ViewReport>,
}

impl ScanReport {
    /// Builds the report, resolving class names through the catalog.
    ///
    /// `image_url` maps a view to wherever the caller stored its annotated image. A class id
    /// missing from the catalog fails the whole report.
    pub fn build<F>(
        outcomes: &[ViewOutcome],
        catalog: &ClassCatalog,
        image_url: F,
    ) -> Result<Self, ReportError>
    where
        F: Fn(View) -> String,
    {
        let mut views = BTreeMap::new();
        for outcome in outcomes {
            let bboxes = outcome
                .detections
                .iter()
                .map(|detection| {
                    let class_id = detection.annotation.class_id();
                    let class_name = catalog.name(class_id).ok_or(ReportError::UnknownClass {
                        view: outcome.view,
                        class_id,
                        known: catalog.len(),
                    })?;
                    let (x1, y1, x2, y2) = detection.annotation.as_xyxy();
                    Ok(BoxRecord {
                        x1: x1 as i64,
                        y1: y1 as i64,
                        x2: x2 as i64,
                        y2: y2 as i64,
                        confidence: detection.confidence,
                        class_name: class_name.to_string(),
                    })
                })
                .collect::<Result<Vec<BoxRecord>, ReportError>>()?;
            views.insert(
                outcome.view,
                ViewReport {
                    annotated_image_url: image_url(outcome.view),
                    bboxes,
                },
            );
        }
        Ok(ScanReport { views })
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
