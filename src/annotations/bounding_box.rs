use crate::annotations::point::Point;
use crate::error::AnnotationError;
use serde::Serialize;
use std::fmt;

/// A struct representing a bounding box.
///
/// A bounding box is the smallest axis-aligned rectangle that totally contains a lesion within
/// the image, together with the class id the detector assigned to it. The class id is an index
/// into an externally supplied class-name table and is never validated here.
///
/// This project uses the standard convention of the left side of the image being x=0 and the top
/// of the image being y=0.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    class_id: usize,
}

impl BoundingBox {
    /// Checks if a box has valid parameters before constructing.
    ///
    /// Zero-width and zero-height boxes are legal.
    pub fn new(
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        class_id: usize,
    ) -> Result<Self, AnnotationError> {
        if left > right {
            Err(AnnotationError::LeftExceedsRight { left, right })
        } else if top > bottom {
            Err(AnnotationError::TopExceedsBottom { top, bottom })
        } else {
            Ok(BoundingBox {
                left,
                top,
                right,
                bottom,
                class_id,
            })
        }
    }

    /// Builds a box from two arbitrary corners, ordering the coordinates.
    pub fn from_corners(a: Point, b: Point, class_id: usize) -> Self {
        BoundingBox {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
            class_id,
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BoundingBox {{ xyxy: [{}, {}, {}, {}], class_id: {} }}",
            self.left, self.top, self.right, self.bottom, self.class_id
        )
    }
}

/// Geometry shared by every box-shaped annotation.
///
/// Only the accessors need implementing; the derived quantities clamp negative extents to zero,
/// so a malformed box yields an area of zero instead of a negative number.
pub trait BoundingBoxGeometry {
    fn left(&self) -> f32;
    fn top(&self) -> f32;
    fn right(&self) -> f32;
    fn bottom(&self) -> f32;
    fn class_id(&self) -> usize;

    /// The smallest box of the same class containing both `self` and `other`.
    fn enclosing(&self, other: &Self) -> Self
    where
        Self: Sized;

    fn width(&self) -> f32 {
        (self.right() - self.left()).max(0.0)
    }

    fn height(&self) -> f32 {
        (self.bottom() - self.top()).max(0.0)
    }

    fn area(&self) -> f32 {
        self.width() * self.height()
    }

    fn center(&self) -> Point {
        Point {
            x: (self.left() + self.right()) / 2.0,
            y: (self.top() + self.bottom()) / 2.0,
        }
    }

    fn as_xyxy(&self) -> (f32, f32, f32, f32) {
        (self.left(), self.top(), self.right(), self.bottom())
    }

    fn intersection_area<U: BoundingBoxGeometry>(&self, other: &U) -> f32 {
        let overlap_width = (self.right().min(other.right()) - self.left().max(other.left())).max(0.0);
        let overlap_height =
            (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0);
        overlap_width * overlap_height
    }

    /// Intersection over union. Zero when the union is empty, e.g. for two degenerate boxes.
    fn intersection_over_union<U: BoundingBoxGeometry>(&self, other: &U) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union > 0.0 { intersection / union } else { 0.0 }
    }
}

impl BoundingBoxGeometry for BoundingBox {
    fn left(&self) -> f32 {
        self.left
    }

    fn top(&self) -> f32 {
        self.top
    }

    fn right(&self) -> f32 {
        self.right
    }

    fn bottom(&self) -> f32 {
        self.bottom
    }

    fn class_id(&self) -> usize {
        self.class_id
    }

    fn enclosing(&self, other: &Self) -> Self {
        BoundingBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
            class_id: self.class_id,
        }
    }
}
