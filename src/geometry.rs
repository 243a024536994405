//! Resolution-independent coordinates.
//!
//! Detections are expressed as fractions of the full capture source, even
//! when only a sub-region of it was scanned. [`SourceDims`] carries the two
//! source dimensions by value and converts between pixel boxes and ratio
//! boxes; [`CaptureRegion`] locates the scanned sub-region inside the source.

use crate::util::{MarkerScanError, MarkerScanResult};

/// Full capture-source resolution in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceDims {
    pub width: usize,
    pub height: usize,
}

/// Box center and size as fractions of the source dimensions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RatioBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Box center and size in source pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelBox {
    pub cx: f64,
    pub cy: f64,
    pub width: f64,
    pub height: f64,
}

impl SourceDims {
    pub fn new(width: usize, height: usize) -> MarkerScanResult<Self> {
        if width == 0 || height == 0 {
            return Err(MarkerScanError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Divides a pixel box by the source dimensions.
    ///
    /// A box that extends past the source is a defect upstream and is
    /// reported as [`MarkerScanError::BoxOutsideSource`] rather than clamped.
    pub fn to_ratio(&self, pixel: PixelBox) -> MarkerScanResult<RatioBox> {
        let (w, h) = (self.width as f64, self.height as f64);
        let half_w = pixel.width / 2.0;
        let half_h = pixel.height / 2.0;
        let inside = [pixel.cx, pixel.cy, pixel.width, pixel.height]
            .iter()
            .all(|v| v.is_finite())
            && pixel.width >= 0.0
            && pixel.height >= 0.0
            && pixel.cx - half_w >= 0.0
            && pixel.cy - half_h >= 0.0
            && pixel.cx + half_w <= w
            && pixel.cy + half_h <= h;
        if !inside {
            return Err(MarkerScanError::BoxOutsideSource {
                cx: pixel.cx,
                cy: pixel.cy,
                width: pixel.width,
                height: pixel.height,
                source_width: self.width,
                source_height: self.height,
            });
        }
        Ok(RatioBox {
            x: pixel.cx / w,
            y: pixel.cy / h,
            width: pixel.width / w,
            height: pixel.height / h,
        })
    }

    /// Inverse of [`SourceDims::to_ratio`].
    pub fn to_pixel(&self, ratio: RatioBox) -> PixelBox {
        let (w, h) = (self.width as f64, self.height as f64);
        PixelBox {
            cx: ratio.x * w,
            cy: ratio.y * h,
            width: ratio.width * w,
            height: ratio.height * h,
        }
    }
}

/// Converts a pixel box to ratios of a `source_width x source_height` source.
pub fn to_ratio(
    cx: f64,
    cy: f64,
    width: f64,
    height: f64,
    source_width: usize,
    source_height: usize,
) -> MarkerScanResult<RatioBox> {
    SourceDims::new(source_width, source_height)?.to_ratio(PixelBox {
        cx,
        cy,
        width,
        height,
    })
}

/// Converts a ratio box back to pixels of a `source_width x source_height`
/// source.
pub fn to_pixel(ratio: RatioBox, source_width: usize, source_height: usize) -> PixelBox {
    SourceDims {
        width: source_width,
        height: source_height,
    }
    .to_pixel(ratio)
}

/// Integer pixel rectangle, top-left anchored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelRect {
    /// Clips the half-open span `[x1, x2) x [y1, y2)` to `source`. `None` if
    /// nothing remains.
    pub fn clipped(x1: i64, y1: i64, x2: i64, y2: i64, source: SourceDims) -> Option<Self> {
        let x1 = x1.max(0);
        let y1 = y1.max(0);
        let x2 = x2.min(source.width as i64);
        let y2 = y2.min(source.height as i64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self {
            x: x1 as usize,
            y: y1 as usize,
            width: (x2 - x1) as usize,
            height: (y2 - y1) as usize,
        })
    }
}

impl PixelBox {
    /// Truncates the box to whole pixels: `(cx, cy, w, h)` each rounded
    /// toward zero.
    pub fn truncated(&self) -> (i64, i64, i64, i64) {
        (
            self.cx as i64,
            self.cy as i64,
            self.width as i64,
            self.height as i64,
        )
    }

    /// Corner coordinates `(x1, y1, x2, y2)` of the truncated box, each half
    /// extent rounded down. Not clipped; may lie outside the source.
    pub fn corners(&self) -> (i64, i64, i64, i64) {
        let (cx, cy, w, h) = self.truncated();
        (cx - w / 2, cy - h / 2, cx + w / 2, cy + h / 2)
    }
}

/// Sub-region of the source that is actually captured and scanned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureRegion {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl CaptureRegion {
    /// Creates a region, checking that it is non-empty and inside `source`.
    pub fn new(
        source: SourceDims,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> MarkerScanResult<Self> {
        if width == 0 || height == 0 {
            return Err(MarkerScanError::InvalidDimensions { width, height });
        }
        let fits = x
            .checked_add(width)
            .is_some_and(|right| right <= source.width)
            && y.checked_add(height).is_some_and(|bottom| bottom <= source.height);
        if !fits {
            return Err(MarkerScanError::RegionOutsideSource {
                x,
                y,
                width,
                height,
                source_width: source.width,
                source_height: source.height,
            });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// The whole source.
    pub fn full(source: SourceDims) -> Self {
        Self {
            x: 0,
            y: 0,
            width: source.width,
            height: source.height,
        }
    }

    /// Full-width strip at the top of the source, `floor(height * ratio)` rows
    /// tall.
    pub fn top_strip(source: SourceDims, height_ratio: f64) -> MarkerScanResult<Self> {
        if !(height_ratio > 0.0 && height_ratio <= 1.0) {
            return Err(MarkerScanError::InvalidConfig(
                "strip height ratio must be in (0, 1]",
            ));
        }
        let height = (source.height as f64 * height_ratio).floor() as usize;
        Self::new(source, 0, 0, source.width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn ratio_of_known_box() {
        let ratio = to_ratio(120.0, 70.0, 40.0, 40.0, 1920, 1080).unwrap();
        assert!((ratio.x - 0.0625).abs() < 1e-12);
        assert!((ratio.y - 70.0 / 1080.0).abs() < 1e-12);
        assert!((ratio.width - 40.0 / 1920.0).abs() < 1e-12);
    }

    #[test]
    fn round_trip_restores_pixels() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let source =
                SourceDims::new(rng.random_range(1..4000), rng.random_range(1..3000)).unwrap();
            let width = rng.random_range(0..=source.width) as f64;
            let height = rng.random_range(0..=source.height) as f64;
            let cx = width / 2.0 + rng.random_range(0..=source.width - width as usize) as f64;
            let cy = height / 2.0 + rng.random_range(0..=source.height - height as usize) as f64;
            let pixel = PixelBox { cx, cy, width, height };
            let back = source.to_pixel(source.to_ratio(pixel).unwrap());
            assert!((back.cx - cx).abs() < 1e-9);
            assert!((back.cy - cy).abs() < 1e-9);
            assert!((back.width - width).abs() < 1e-9);
            assert!((back.height - height).abs() < 1e-9);
        }
    }

    #[test]
    fn box_past_source_edge_is_rejected() {
        let err = to_ratio(1910.0, 20.0, 40.0, 10.0, 1920, 1080).unwrap_err();
        assert!(matches!(err, MarkerScanError::BoxOutsideSource { .. }));
        assert!(to_ratio(10.0, 10.0, 4.0, 4.0, 0, 1080).is_err());
    }

    #[test]
    fn top_strip_uses_floor() {
        let source = SourceDims::new(1920, 1081).unwrap();
        let strip = CaptureRegion::top_strip(source, 0.25).unwrap();
        assert_eq!(
            strip,
            CaptureRegion {
                x: 0,
                y: 0,
                width: 1920,
                height: 270
            }
        );
        assert!(CaptureRegion::top_strip(source, 0.0).is_err());
    }

    #[test]
    fn region_must_fit_source() {
        let source = SourceDims::new(100, 50).unwrap();
        assert!(CaptureRegion::new(source, 60, 0, 40, 50).is_ok());
        assert_eq!(
            CaptureRegion::new(source, 61, 0, 40, 50).unwrap_err(),
            MarkerScanError::RegionOutsideSource {
                x: 61,
                y: 0,
                width: 40,
                height: 50,
                source_width: 100,
                source_height: 50,
            }
        );
    }

    #[test]
    fn corners_truncate_before_halving() {
        let pixel = PixelBox {
            cx: 10.9,
            cy: 20.2,
            width: 7.8,
            height: 5.0,
        };
        assert_eq!(pixel.corners(), (7, 18, 13, 22));
    }

    #[test]
    fn rect_is_clipped_to_source() {
        let source = SourceDims::new(100, 100).unwrap();
        let rect = PixelRect::clipped(-5, 45, 15, 55, source).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 0,
                y: 45,
                width: 15,
                height: 10
            }
        );
        assert_eq!(
            PixelRect::clipped(90, 90, 140, 120, source),
            Some(PixelRect {
                x: 90,
                y: 90,
                width: 10,
                height: 10
            })
        );
        assert!(PixelRect::clipped(5, 3, 5, 7, source).is_none());
        assert!(PixelRect::clipped(100, 0, 120, 10, source).is_none());
    }
}
