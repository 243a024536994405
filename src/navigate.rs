//! Heading readout for detections.

use crate::geometry::{CaptureRegion, SourceDims};
use crate::image::ColorImage;
use crate::ocr::{DistanceReader, TextRecognizer, NOT_AVAILABLE};
use crate::pipeline::Detection;
use std::fmt;
use std::sync::Arc;

/// Side of the screen center a marker lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Straight,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Straight => "Straight",
            Direction::Left => "Left",
            Direction::Right => "Right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds on the horizontal offset from the screen center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavigationConfig {
    /// `|offset|` below this reads as straight ahead.
    pub straight_ahead_threshold: f64,
    /// Distance labels are only read for `|offset|` below this.
    pub ocr_center_window: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            straight_ahead_threshold: 0.02,
            ocr_center_window: 0.1,
        }
    }
}

/// Per-detection navigation output.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationRecord {
    pub id: usize,
    pub label: Arc<str>,
    /// `x_ratio - 0.5`: -0.5 is the far left edge, +0.5 the far right.
    pub rel_offset: f64,
    pub direction: Direction,
    /// Recognized distance text, or `"N/A"`.
    pub distance: String,
}

/// Horizontal offset of a detection from the source center.
pub fn relative_offset(detection: &Detection) -> f64 {
    detection.x_ratio - 0.5
}

/// Direction for an offset.
pub fn direction_for(rel_offset: f64, cfg: &NavigationConfig) -> Direction {
    if rel_offset.abs() < cfg.straight_ahead_threshold {
        Direction::Straight
    } else if rel_offset < 0.0 {
        Direction::Left
    } else {
        Direction::Right
    }
}

/// Builds navigation records, reading distances only for detections near the
/// center. Without a reader every distance is `"N/A"`.
pub fn navigate<R: TextRecognizer>(
    detections: &[Detection],
    frame: &ColorImage,
    region: CaptureRegion,
    source: SourceDims,
    reader: Option<&DistanceReader<R>>,
    cfg: &NavigationConfig,
) -> Vec<NavigationRecord> {
    detections
        .iter()
        .map(|detection| {
            let rel_offset = relative_offset(detection);
            let distance = match reader {
                Some(reader) if rel_offset.abs() < cfg.ocr_center_window => {
                    reader.read(frame, region, source, detection)
                }
                _ => NOT_AVAILABLE.to_string(),
            };
            NavigationRecord {
                id: detection.id,
                label: Arc::clone(&detection.label),
                rel_offset,
                direction: direction_for(rel_offset, cfg),
                distance,
            }
        })
        .collect()
}
