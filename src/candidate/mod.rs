//! Candidate boxes and their suppression.
//!
//! A candidate is an unfiltered match: a template-sized box anchored at a
//! correlation surface position, scored with the surface value there.

pub mod nms;

pub use nms::{suppress, suppress_group, NmsConfig};

use std::sync::Arc;

/// Template-sized box at a match position, in frame pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Label of the template that produced the box.
    pub label: Arc<str>,
    /// Left edge (column) of the box.
    pub x: usize,
    /// Top edge (row) of the box.
    pub y: usize,
    pub width: usize,
    pub height: usize,
    /// Correlation score at `(x, y)`.
    pub score: f32,
}

impl Candidate {
    /// Creates a candidate box.
    pub fn new(
        label: impl Into<Arc<str>>,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        score: f32,
    ) -> Self {
        Self {
            label: label.into(),
            x,
            y,
            width,
            height,
            score,
        }
    }

    /// Returns the box area in pixels.
    pub fn area(&self) -> f64 {
        (self.width * self.height) as f64
    }

    /// Returns the box center in pixel coordinates.
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &Candidate) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);
        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = ((x2 - x1) * (y2 - y1)) as f64;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

#[cfg(test)]
mod tests {
    use super::Candidate;

    #[test]
    fn iou_of_half_overlapping_boxes() {
        let a = Candidate::new("m", 0, 0, 30, 10, 0.9);
        let b = Candidate::new("m", 10, 0, 30, 10, 0.85);
        assert!((a.iou(&b) - 0.5).abs() < 1e-12);
        assert!((b.iou(&a) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = Candidate::new("m", 0, 0, 10, 10, 0.9);
        let b = Candidate::new("m", 10, 0, 10, 10, 0.9);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.iou(&a), 1.0);
    }
}
