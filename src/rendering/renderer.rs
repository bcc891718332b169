use crate::annotations::bounding_box::{BoundingBox, BoundingBoxGeometry};
use crate::annotations::detection::Detection;
use crate::config::class_catalog::ClassColorMap;
use crate::error::RenderError;
use image::RgbImage;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

/// Draws detections over an image. Implementations leave the input untouched.
pub trait Renderer {
    fn draw_boxes(
        &self,
        image: &RgbImage,
        detections: &[Detection<BoundingBox>],
        colors: &ClassColorMap,
    ) -> Result<RgbImage, RenderError>;
}

/// Outlines each detection with a hollow rectangle in its class color.
#[derive(Clone, Copy, Debug)]
pub struct BoxRenderer {
    /// Line width in pixels, growing inward from the box edge.
    pub thickness: u32,
}

impl Default for BoxRenderer {
    fn default() -> Self {
        BoxRenderer { thickness: 2 }
    }
}

impl Renderer for BoxRenderer {
    fn draw_boxes(
        &self,
        image: &RgbImage,
        detections: &[Detection<BoundingBox>],
        colors: &ClassColorMap,
    ) -> Result<RgbImage, RenderError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RenderError::EmptyCanvas {
                width: image.width(),
                height: image.height(),
            });
        }
        let mut canvas = image.clone();
        let thickness = self.thickness.max(1) as i64;
        // Corners are kept within one line width of the canvas.
        let max_x = image.width() as f32 + thickness as f32;
        let max_y = image.height() as f32 + thickness as f32;
        let min_xy = -(thickness as f32);
        for detection in detections {
            let annotation = &detection.annotation;
            if annotation.right() < 0.0
                || annotation.bottom() < 0.0
                || annotation.left() >= image.width() as f32
                || annotation.top() >= image.height() as f32
            {
                continue;
            }
            let color = colors.color_for(annotation.class_id());
            // Corners are inclusive pixel positions, truncated like an int() cast.
            let x1 = annotation.left().clamp(min_xy, max_x) as i64;
            let y1 = annotation.top().clamp(min_xy, max_y) as i64;
            let x2 = annotation.right().clamp(min_xy, max_x) as i64;
            let y2 = annotation.bottom().clamp(min_xy, max_y) as i64;
            for inset in 0..thickness {
                let width = x2 - x1 + 1 - 2 * inset;
                let height = y2 - y1 + 1 - 2 * inset;
                if width < 1 || height < 1 {
                    break;
                }
                let rect = Rect::at((x1 + inset) as i32, (y1 + inset) as i32)
                    .of_size(width as u32, height as u32);
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }
        }
        Ok(canvas)
    }
}
