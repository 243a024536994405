//! Distance-label extraction above a detection.
//!
//! The region sits directly above the marker, is a fixed fraction of the
//! source tall and at least twice the marker wide. The crop is binarized
//! (dark text on white) and handed to a [`TextRecognizer`].

use crate::geometry::{CaptureRegion, PixelRect, SourceDims};
use crate::image::{ColorImage, ImageView, OwnedImage};
use crate::pipeline::Detection;

/// Text returned whenever no distance could be read.
pub const NOT_AVAILABLE: &str = "N/A";

/// Text recognition engine consumed by [`DistanceReader`].
pub trait TextRecognizer {
    /// Recognizes a single line of text in a binarized grayscale patch.
    ///
    /// `None` or an empty string means nothing was read.
    fn recognize(&self, patch: ImageView<'_, u8>) -> Option<String>;
}

impl<F> TextRecognizer for F
where
    F: Fn(ImageView<'_, u8>) -> Option<String>,
{
    fn recognize(&self, patch: ImageView<'_, u8>) -> Option<String> {
        self(patch)
    }
}

/// Recognizer that never reads anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRecognizer;

impl TextRecognizer for NoRecognizer {
    fn recognize(&self, _patch: ImageView<'_, u8>) -> Option<String> {
        None
    }
}

/// Geometry and binarization parameters of the distance region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceRegionConfig {
    /// Region height as a fraction of the source height.
    pub height_ratio: f64,
    /// Minimum region width as a fraction of the source width.
    pub min_width_ratio: f64,
    /// Region width as a multiple of the marker width.
    pub width_scale: f64,
    /// Gray values above this become background (0), the rest text (255).
    pub binarize_threshold: u8,
}

impl Default for DistanceRegionConfig {
    fn default() -> Self {
        Self {
            height_ratio: 0.03,
            min_width_ratio: 0.05,
            width_scale: 2.0,
            binarize_threshold: 150,
        }
    }
}

/// Region above `detection`, in source pixels. `None` when it is empty.
pub fn distance_region(
    detection: &Detection,
    source: SourceDims,
    cfg: &DistanceRegionConfig,
) -> Option<PixelRect> {
    let (sw, sh) = (source.width as f64, source.height as f64);
    let (cx, cy, icon_w, icon_h) = source.to_pixel(detection.ratio_box()).truncated();
    let top = cy - icon_h / 2;

    let roi_h = (cfg.height_ratio * sh) as i64;
    let roi_w = ((icon_w as f64 * cfg.width_scale) as i64).max((cfg.min_width_ratio * sw) as i64);

    let y2 = top.max(0);
    PixelRect::clipped(cx - roi_w / 2, y2 - roi_h, cx + roi_w / 2, y2, source)
}

/// Binary-inverted threshold: `> threshold` maps to 0, everything else to 255.
pub fn binarize_inverted(gray: &OwnedImage, threshold: u8) -> OwnedImage {
    let mut out = gray.clone();
    for value in out.data_mut() {
        *value = if *value > threshold { 0 } else { 255 };
    }
    out
}

/// Reads distance labels from captured frames.
pub struct DistanceReader<R> {
    recognizer: R,
    cfg: DistanceRegionConfig,
}

impl<R: TextRecognizer> DistanceReader<R> {
    pub fn new(recognizer: R, cfg: DistanceRegionConfig) -> Self {
        Self { recognizer, cfg }
    }

    pub fn config(&self) -> &DistanceRegionConfig {
        &self.cfg
    }

    /// Reads the label above `detection`, or [`NOT_AVAILABLE`].
    ///
    /// `frame` is the captured `region` of `source`. The part of the distance
    /// region outside the frame is dropped; nothing left means no text.
    pub fn read(
        &self,
        frame: &ColorImage,
        region: CaptureRegion,
        source: SourceDims,
        detection: &Detection,
    ) -> String {
        let Some(rect) = distance_region(detection, source, &self.cfg) else {
            return NOT_AVAILABLE.to_string();
        };
        let Some((x, y, width, height)) = frame_window(rect, region, frame) else {
            return NOT_AVAILABLE.to_string();
        };
        let crop = match frame.crop(x, y, width, height) {
            Ok(crop) => crop,
            Err(err) => {
                tracing::debug!(error = %err, "distance region not cropped");
                return NOT_AVAILABLE.to_string();
            }
        };

        let binary = binarize_inverted(&crop.to_gray(), self.cfg.binarize_threshold);
        match self.recognizer.recognize(binary.view()) {
            Some(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => NOT_AVAILABLE.to_string(),
        }
    }
}

/// Intersects a source-space rectangle with the captured frame and returns it
/// in frame coordinates.
fn frame_window(
    rect: PixelRect,
    region: CaptureRegion,
    frame: &ColorImage,
) -> Option<(usize, usize, usize, usize)> {
    let x1 = rect.x.max(region.x);
    let y1 = rect.y.max(region.y);
    let x2 = (rect.x + rect.width).min(region.x + frame.width());
    let y2 = (rect.y + rect.height).min(region.y + frame.height());
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some((x1 - region.x, y1 - region.y, x2 - x1, y2 - y1))
}
