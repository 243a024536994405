//! Detection box and label rendering.
//!
//! Boxes are drawn as hollow rectangles whose outline thickness and label
//! size scale with the source width. Labels read
//! `"{label} | {distance} | {offset:+.2}"` and need a [`LabelFont`]; without
//! one only the boxes are drawn.

use crate::geometry::{CaptureRegion, SourceDims};
use crate::navigate::{relative_offset, NavigationRecord};
use crate::ocr::NOT_AVAILABLE;
use crate::pipeline::Detection;
use crate::util::{MarkerScanError, MarkerScanResult};
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

/// Glyph height in pixels at label scale 1.0.
const LABEL_PX_PER_SCALE: f32 = 30.0;

/// Color used for labels missing from a [`Palette`].
pub const DEFAULT_COLOR: [u8; 3] = [0, 255, 0];

/// Label to RGB color table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<(String, [u8; 3])>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the color of `label`, replacing any previous one.
    pub fn insert(&mut self, label: impl Into<String>, color: [u8; 3]) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = color,
            None => self.entries.push((label, color)),
        }
    }

    /// Color for `label`, falling back to [`DEFAULT_COLOR`].
    pub fn color(&self, label: &str) -> [u8; 3] {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map_or(DEFAULT_COLOR, |(_, c)| *c)
    }
}

impl<L: Into<String>> FromIterator<(L, [u8; 3])> for Palette {
    fn from_iter<I: IntoIterator<Item = (L, [u8; 3])>>(iter: I) -> Self {
        let mut palette = Palette::new();
        for (label, color) in iter {
            palette.insert(label, color);
        }
        palette
    }
}

/// Outline thickness for a source `width` pixels wide.
pub fn line_thickness(source: SourceDims) -> u32 {
    (source.width as u32 / 1000).max(1)
}

/// Label scale for a source `width` pixels wide, never below 0.4.
pub fn label_scale(source: SourceDims) -> f32 {
    (source.width as f32 / 3000.0).max(0.4)
}

/// TrueType/OpenType font used for box labels.
pub struct LabelFont {
    font: FontVec,
}

impl LabelFont {
    /// Parses font data.
    pub fn from_bytes(data: Vec<u8>) -> MarkerScanResult<Self> {
        let font = FontVec::try_from_vec(data).map_err(|err| MarkerScanError::ImageIo {
            reason: format!("invalid font: {err}"),
        })?;
        Ok(Self { font })
    }

    /// Reads and parses a font file.
    pub fn load(path: impl AsRef<Path>) -> MarkerScanResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|err| MarkerScanError::ImageIo {
            reason: format!("{}: {err}", path.display()),
        })?;
        Self::from_bytes(data)
    }
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFont").finish_non_exhaustive()
    }
}

/// Colors and optional label font for [`draw_detections`].
#[derive(Debug, Default)]
pub struct OverlayStyle {
    pub palette: Palette,
    pub font: Option<LabelFont>,
}

impl OverlayStyle {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            font: None,
        }
    }

    pub fn with_font(mut self, font: LabelFont) -> Self {
        self.font = Some(font);
        self
    }
}

/// Label text for `detection`.
///
/// Without a navigation record the offset is derived from the detection and
/// the distance reads `"N/A"`.
pub fn label_text(detection: &Detection, record: Option<&NavigationRecord>) -> String {
    let (distance, offset) = match record {
        Some(record) => (record.distance.as_str(), record.rel_offset),
        None => (NOT_AVAILABLE, relative_offset(detection)),
    };
    format!("{} | {} | {:+.2}", detection.label, distance, offset)
}

/// Draws an outline, and a label when `style` has a font, for every
/// detection onto `canvas`.
///
/// `canvas` shows `region` of `source`; boxes are re-derived from the ratio
/// coordinates and shifted into canvas space. Parts falling outside the
/// canvas are clipped. Labels take their distance and offset from the
/// `navigation` record with the same id.
pub fn draw_detections(
    canvas: &mut RgbImage,
    region: CaptureRegion,
    source: SourceDims,
    detections: &[Detection],
    navigation: &[NavigationRecord],
    style: &OverlayStyle,
) {
    let thickness = line_thickness(source) as i64;
    let scale = label_scale(source);
    let glyph_px = LABEL_PX_PER_SCALE * scale;
    let (dx, dy) = (region.x as i64, region.y as i64);

    for detection in detections {
        let (x1, y1, x2, y2) = source.to_pixel(detection.ratio_box()).corners();
        let color = Rgb(style.palette.color(&detection.label));
        for t in 0..thickness {
            let width = x2 - x1 - 2 * t + 1;
            let height = y2 - y1 - 2 * t + 1;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = Rect::at((x1 + t - dx) as i32, (y1 + t - dy) as i32)
                .of_size(width as u32, height as u32);
            draw_hollow_rect_mut(canvas, rect, color);
        }

        let Some(font) = &style.font else {
            continue;
        };
        let record = navigation.iter().find(|r| r.id == detection.id);
        let text = label_text(detection, record);
        // Baseline sits 10px above the box, but never so high the text leaves
        // the source.
        let baseline = (y1 - 10).max((20.0 * scale) as i64);
        let top = baseline - glyph_px.round() as i64;
        draw_text_mut(
            canvas,
            color,
            (x1 - dx) as i32,
            (top - dy).max(0) as i32,
            PxScale::from(glyph_px),
            &font.font,
            &text,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigate::Direction;
    use std::sync::Arc;

    fn detection(label: &str) -> Detection {
        // 8x8 box centered at (10, 30) of a 64x64 source.
        Detection {
            id: 0,
            label: Arc::from(label),
            x_ratio: 10.0 / 64.0,
            y_ratio: 30.0 / 64.0,
            width_ratio: 8.0 / 64.0,
            height_ratio: 8.0 / 64.0,
        }
    }

    fn system_font() -> Option<LabelFont> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/Library/Fonts/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
        .iter()
        .find_map(|path| LabelFont::load(path).ok())
    }

    fn lit_pixels(canvas: &RgbImage, rows: std::ops::Range<u32>) -> usize {
        rows.flat_map(|y| (0..canvas.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| canvas.get_pixel(x, y).0 != [0, 0, 0])
            .count()
    }

    #[test]
    fn outline_is_drawn_in_canvas_space() {
        let source = SourceDims::new(64, 64).unwrap();
        let region = CaptureRegion::new(source, 0, 20, 64, 20).unwrap();
        let mut canvas = RgbImage::new(64, 20);
        let palette: Palette = [("waypoint", [255, 255, 255])].into_iter().collect();

        draw_detections(
            &mut canvas,
            region,
            source,
            &[detection("waypoint")],
            &[],
            &OverlayStyle::new(palette),
        );
        // Box spans x 6..=14 and source y 26..=34, i.e. canvas y 6..=14.
        assert_eq!(canvas.get_pixel(6, 6), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(14, 14), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(10, 6), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(10, 10), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(15, 10), &Rgb([0, 0, 0]));
    }

    #[test]
    fn unknown_label_uses_default_color() {
        let source = SourceDims::new(64, 64).unwrap();
        let mut canvas = RgbImage::new(64, 64);
        draw_detections(
            &mut canvas,
            CaptureRegion::full(source),
            source,
            &[detection("unlisted")],
            &[],
            &OverlayStyle::default(),
        );
        assert_eq!(canvas.get_pixel(6, 26), &Rgb(DEFAULT_COLOR));
    }

    #[test]
    fn thick_outline_grows_inward() {
        let source = SourceDims::new(2000, 100).unwrap();
        let mut canvas = RgbImage::new(2000, 100);
        let det = Detection {
            id: 0,
            label: Arc::from("m"),
            x_ratio: 50.0 / 2000.0,
            y_ratio: 0.5,
            width_ratio: 20.0 / 2000.0,
            height_ratio: 0.2,
        };
        draw_detections(
            &mut canvas,
            CaptureRegion::full(source),
            source,
            &[det],
            &[],
            &OverlayStyle::default(),
        );
        // Box spans x 40..=60, y 40..=60 with a two pixel outline.
        assert_eq!(canvas.get_pixel(40, 50), &Rgb(DEFAULT_COLOR));
        assert_eq!(canvas.get_pixel(41, 50), &Rgb(DEFAULT_COLOR));
        assert_eq!(canvas.get_pixel(42, 50), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(59, 59), &Rgb(DEFAULT_COLOR));
    }

    #[test]
    fn thickness_and_label_scale_follow_source_width() {
        assert_eq!(line_thickness(SourceDims::new(640, 480).unwrap()), 1);
        assert_eq!(line_thickness(SourceDims::new(3840, 2160).unwrap()), 3);
        assert_eq!(label_scale(SourceDims::new(640, 480).unwrap()), 0.4);
        assert!((label_scale(SourceDims::new(3840, 2160).unwrap()) - 1.28).abs() < 1e-6);
    }

    #[test]
    fn label_prefers_navigation_record() {
        let det = detection("waypoint");
        let record = NavigationRecord {
            id: 0,
            label: Arc::from("waypoint"),
            rel_offset: 0.0421,
            direction: Direction::Right,
            distance: "87m".to_string(),
        };
        assert_eq!(label_text(&det, Some(&record)), "waypoint | 87m | +0.04");
        // 10/64 - 0.5 = -0.34375
        assert_eq!(label_text(&det, None), "waypoint | N/A | -0.34");
    }

    #[test]
    fn invalid_font_data_is_rejected() {
        let err = LabelFont::from_bytes(vec![0u8; 64]).unwrap_err();
        assert!(matches!(err, MarkerScanError::ImageIo { .. }));
        assert!(LabelFont::load("/nonexistent/markerscan-font.ttf").is_err());
    }

    #[test]
    fn label_is_drawn_above_the_box_only_with_a_font() {
        // 16x16 box centered at (64, 64): outline rows 56..=72.
        let source = SourceDims::new(256, 128).unwrap();
        let det = Detection {
            id: 3,
            label: Arc::from("main_quest"),
            x_ratio: 0.25,
            y_ratio: 0.5,
            width_ratio: 0.0625,
            height_ratio: 0.125,
        };
        let record = NavigationRecord {
            id: 3,
            label: Arc::from("main_quest"),
            rel_offset: -0.3,
            direction: Direction::Left,
            distance: "120m".to_string(),
        };

        let mut plain = RgbImage::new(256, 128);
        let region = CaptureRegion::full(source);
        let style = OverlayStyle::default();
        draw_detections(&mut plain, region, source, &[det.clone()], &[record.clone()], &style);
        assert_eq!(lit_pixels(&plain, 0..56), 0);

        let Some(font) = system_font() else {
            eprintln!("no system font found; skipping glyph rendering check");
            return;
        };
        let mut labeled = RgbImage::new(256, 128);
        let style = OverlayStyle::default().with_font(font);
        draw_detections(&mut labeled, region, source, &[det], &[record], &style);
        assert!(lit_pixels(&labeled, 0..56) > 0);
        assert_eq!(labeled.get_pixel(56, 64), &Rgb(DEFAULT_COLOR));
    }
}
