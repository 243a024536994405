//! Template matching over a single frame.
//!
//! The engine picks a correlation measure per template, evaluates the dense
//! surface and turns every position at or above the match threshold into a
//! [`Candidate`]. Edge-filtered matching uses a grayscale Laplacian texture
//! of the frame, computed at most once per [`PreparedFrame`].

use crate::candidate::Candidate;
use crate::image::edge::edge_texture;
use crate::image::{ColorImage, OwnedImage};
use crate::kernel::scalar::{CoeffNormedScalar, MaskedCcorrScalar};
use crate::kernel::{CorrelationSurface, Kernel, INVALID_SCORE};
use crate::template::{ColorPlan, Template};
use crate::ImageView;
use std::sync::OnceLock;

/// Matching parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchConfig {
    /// Minimum surface score for a position to become a candidate.
    pub match_threshold: f32,
    /// Correlate edge textures instead of colors for templates without a
    /// transparency plane.
    pub use_edge_filter: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.8,
            use_edge_filter: true,
        }
    }
}

impl MatchConfig {
    /// Validates the configuration.
    ///
    /// The threshold must lie in `(INVALID_SCORE, 1]` so undefined masked
    /// positions can never pass it.
    pub fn validate(&self) -> crate::MarkerScanResult<()> {
        if !self.match_threshold.is_finite()
            || self.match_threshold > 1.0
            || self.match_threshold <= INVALID_SCORE
        {
            return Err(crate::MarkerScanError::InvalidConfig(
                "match_threshold must be finite, above -1 and <= 1",
            ));
        }
        Ok(())
    }
}

/// Correlation measure applied to one template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchMode {
    /// Coefficient-normalized correlation over the color planes.
    Coeff,
    /// Coefficient-normalized correlation over edge textures.
    EdgeCoeff,
    /// Masked normalized correlation over the color planes.
    Masked,
}

/// A frame borrowed for matching, with its edge texture built on demand.
pub struct PreparedFrame<'a> {
    frame: &'a ColorImage,
    edges: OnceLock<OwnedImage>,
}

impl<'a> PreparedFrame<'a> {
    pub fn new(frame: &'a ColorImage) -> Self {
        Self {
            frame,
            edges: OnceLock::new(),
        }
    }

    /// Returns the underlying color frame.
    pub fn frame(&self) -> &'a ColorImage {
        self.frame
    }

    /// Returns the frame's edge texture, computing it on first use.
    pub fn edges(&self) -> &OwnedImage {
        self.edges.get_or_init(|| edge_texture(self.frame))
    }
}

/// Per-template matcher.
#[derive(Clone, Copy, Debug)]
pub struct MatchEngine {
    cfg: MatchConfig,
    parallel: bool,
}

impl MatchEngine {
    pub fn new(cfg: MatchConfig) -> Self {
        Self {
            cfg,
            parallel: false,
        }
    }

    /// Evaluates surfaces row-parallel when the `rayon` feature is enabled.
    /// Without the feature the flag has no effect.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Returns the measure used for `template`.
    ///
    /// A transparency plane always selects masked correlation; the edge
    /// filter only applies to templates without one.
    pub fn mode_for(&self, template: &Template) -> MatchMode {
        match template.plan() {
            ColorPlan::Masked(_) => MatchMode::Masked,
            ColorPlan::Coeff(_) if self.cfg.use_edge_filter => MatchMode::EdgeCoeff,
            ColorPlan::Coeff(_) => MatchMode::Coeff,
        }
    }

    /// Computes the dense correlation surface of `template` over `frame`.
    ///
    /// Returns `None` when the template is larger than the frame.
    pub fn surface(
        &self,
        frame: &PreparedFrame<'_>,
        template: &Template,
    ) -> Option<CorrelationSurface> {
        match template.plan() {
            ColorPlan::Masked(plan) => {
                self.run::<MaskedCcorrScalar>(&frame.frame().views(), plan)
            }
            ColorPlan::Coeff(_) if self.cfg.use_edge_filter => {
                let plan = template.edge_plan()?;
                self.run::<CoeffNormedScalar>(&[frame.edges().view()], plan)
            }
            ColorPlan::Coeff(plan) => {
                self.run::<CoeffNormedScalar>(&frame.frame().views(), plan)
            }
        }
    }

    /// Returns every placement scoring at least the match threshold.
    ///
    /// Candidates are in row-major discovery order, sized like the template.
    /// Masked positions holding [`INVALID_SCORE`] are never returned, whatever
    /// the threshold.
    pub fn match_template(
        &self,
        frame: &PreparedFrame<'_>,
        template: &Template,
    ) -> Vec<Candidate> {
        let mode = self.mode_for(template);
        let span = tracing::info_span!("match_template", label = template.label(), mode = ?mode);
        let _guard = span.enter();

        let Some(surface) = self.surface(frame, template) else {
            tracing::debug!(
                template_width = template.width(),
                template_height = template.height(),
                frame_width = frame.frame().width(),
                frame_height = frame.frame().height(),
                "template larger than frame"
            );
            return Vec::new();
        };

        let label = template.shared_label();
        let candidates: Vec<Candidate> = surface
            .positions_at_least(self.cfg.match_threshold)
            .filter(|&(_, _, score)| mode != MatchMode::Masked || score > INVALID_SCORE)
            .map(|(x, y, score)| {
                Candidate::new(
                    label.clone(),
                    x,
                    y,
                    template.width(),
                    template.height(),
                    score,
                )
            })
            .collect();
        tracing::debug!(candidates = candidates.len(), "template scanned");
        candidates
    }

    #[cfg(feature = "rayon")]
    fn run<K: Kernel>(
        &self,
        planes: &[ImageView<'_, u8>],
        plan: &K::Plan,
    ) -> Option<CorrelationSurface> {
        if self.parallel {
            crate::kernel::rayon::surface_par::<K>(planes, plan)
        } else {
            K::surface(planes, plan)
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn run<K: Kernel>(
        &self,
        planes: &[ImageView<'_, u8>],
        plan: &K::Plan,
    ) -> Option<CorrelationSurface> {
        K::surface(planes, plan)
    }
}

/// Matches one template against `frame` with the given parameters.
pub fn match_template(
    frame: &ColorImage,
    template: &Template,
    match_threshold: f32,
    use_edge_filter: bool,
) -> Vec<Candidate> {
    let engine = MatchEngine::new(MatchConfig {
        match_threshold,
        use_edge_filter,
    });
    engine.match_template(&PreparedFrame::new(frame), template)
}
