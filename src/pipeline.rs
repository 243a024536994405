//! Per-frame detection: match, suppress, map to ratios, number.

use crate::candidate::{suppress_group, Candidate, NmsConfig};
use crate::geometry::{CaptureRegion, PixelBox, RatioBox, SourceDims};
use crate::image::ColorImage;
use crate::search::{MatchConfig, MatchEngine, PreparedFrame};
use crate::template::{Template, TemplateStore};
use crate::util::{MarkerScanError, MarkerScanResult};
use std::sync::Arc;

/// One marker found in a frame.
///
/// Ratios are relative to the full source, never to the scanned region.
/// `id` is unique within one pipeline invocation and carries no meaning
/// across frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub id: usize,
    pub label: Arc<str>,
    /// Box center, horizontal.
    pub x_ratio: f64,
    /// Box center, vertical.
    pub y_ratio: f64,
    pub width_ratio: f64,
    pub height_ratio: f64,
}

impl Detection {
    /// Ratio box of this detection.
    pub fn ratio_box(&self) -> RatioBox {
        RatioBox {
            x: self.x_ratio,
            y: self.y_ratio,
            width: self.width_ratio,
            height: self.height_ratio,
        }
    }
}

/// Pipeline parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineConfig {
    pub matching: MatchConfig,
    /// Same-label boxes overlapping more than this IoU are suppressed.
    pub iou_threshold: f32,
    /// Match templates concurrently (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            matching: MatchConfig::default(),
            iou_threshold: 0.3,
            parallel: false,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> MarkerScanResult<()> {
        self.matching.validate()?;
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(MarkerScanError::InvalidConfig(
                "iou_threshold must be in [0, 1]",
            ));
        }
        Ok(())
    }

    fn nms(&self) -> NmsConfig {
        NmsConfig {
            score_threshold: self.matching.match_threshold,
            iou_threshold: self.iou_threshold,
        }
    }
}

/// Runs every stored template over a frame and returns its detections.
pub struct DetectionPipeline {
    store: TemplateStore,
    cfg: PipelineConfig,
    engine: MatchEngine,
}

impl DetectionPipeline {
    pub fn new(store: TemplateStore, cfg: PipelineConfig) -> MarkerScanResult<Self> {
        cfg.validate()?;
        if store.is_empty() {
            tracing::warn!("no templates loaded; every frame yields zero detections");
        }
        let engine = MatchEngine::new(cfg.matching).with_parallel(cfg.parallel);
        Ok(Self { store, cfg, engine })
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Detects markers in a frame covering the whole source, which must be
    /// `source_width x source_height`.
    pub fn run(
        &self,
        frame: &ColorImage,
        source_width: usize,
        source_height: usize,
    ) -> MarkerScanResult<Vec<Detection>> {
        let source = SourceDims::new(source_width, source_height)?;
        self.run_region(frame, CaptureRegion::full(source), source)
    }

    /// Detects markers in a frame captured from `region` of `source`.
    ///
    /// The frame must have exactly the region's dimensions and the region must
    /// lie inside the source; otherwise ratio coordinates would be meaningless
    /// and the call fails.
    pub fn run_region(
        &self,
        frame: &ColorImage,
        region: CaptureRegion,
        source: SourceDims,
    ) -> MarkerScanResult<Vec<Detection>> {
        if frame.width() != region.width || frame.height() != region.height {
            return Err(MarkerScanError::FrameMismatch {
                frame_width: frame.width(),
                frame_height: frame.height(),
                region_width: region.width,
                region_height: region.height,
            });
        }
        CaptureRegion::new(source, region.x, region.y, region.width, region.height)?;

        let span = tracing::info_span!(
            "detect",
            frame_width = frame.width(),
            frame_height = frame.height(),
            templates = self.store.len()
        );
        let _guard = span.enter();

        let prepared = PreparedFrame::new(frame);
        let kept = self.match_all(&prepared);

        let mut detections = Vec::with_capacity(kept.len());
        for candidate in kept {
            let pixel = PixelBox {
                cx: region.x as f64 + candidate.x as f64 + candidate.width as f64 / 2.0,
                cy: region.y as f64 + candidate.y as f64 + candidate.height as f64 / 2.0,
                width: candidate.width as f64,
                height: candidate.height as f64,
            };
            let ratio = source.to_ratio(pixel)?;
            detections.push(Detection {
                id: detections.len(),
                label: candidate.label,
                x_ratio: ratio.x,
                y_ratio: ratio.y,
                width_ratio: ratio.width,
                height_ratio: ratio.height,
            });
        }
        tracing::debug!(detections = detections.len(), "frame processed");
        Ok(detections)
    }

    /// Matches and suppresses each template, in store order.
    fn match_all(&self, frame: &PreparedFrame<'_>) -> Vec<Candidate> {
        let nms = self.cfg.nms();
        let per_template = |template: &Template| {
            suppress_group(self.engine.match_template(frame, template), nms)
        };

        #[cfg(feature = "rayon")]
        if self.cfg.parallel {
            use rayon::prelude::*;
            // Force the shared edge texture before fanning out.
            if self.cfg.matching.use_edge_filter {
                frame.edges();
            }
            let groups: Vec<Vec<Candidate>> =
                self.store.as_slice().par_iter().map(per_template).collect();
            return groups.into_iter().flatten().collect();
        }

        self.store.iter().flat_map(per_template).collect()
    }
}
