//! Axis-aligned bounding-box geometry for conversation areas.
//!
//! Boxes are described by their center point and full extents, matching the
//! wire representation clients send. Both predicates use closed intervals:
//! a point on an edge is inside, and boxes that merely touch overlap.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle centered at `(x, y)` with full `width`/`height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns true iff `(x, y)` lies inside this box, edges included.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        x >= self.x - half_w && x <= self.x + half_w && y >= self.y - half_h && y <= self.y + half_h
    }

    /// Returns true iff the two boxes' closed intervals intersect on both
    /// axes. Touching edges count as overlap, so equal or degenerate boxes
    /// always overlap themselves.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        (self.x - other.x).abs() <= (self.width + other.width) / 2.0
            && (self.y - other.y).abs() <= (self.height + other.height) / 2.0
    }
}
