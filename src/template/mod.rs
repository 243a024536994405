//! Labeled marker templates and their precomputed matching plans.
//!
//! A template owns a color image and an optional transparency plane. The plan
//! for its primary correlation measure is built eagerly; the edge-texture plan
//! is only needed when edge filtering is enabled, so it is built on first use
//! and cached in a `OnceLock` for the lifetime of the template.

use crate::image::edge::edge_texture;
use crate::image::{ColorImage, OwnedImage};
use crate::util::{MarkerScanError, MarkerScanResult};
use std::sync::{Arc, OnceLock};

mod plan;
pub mod store;

pub use plan::{CoeffPlan, MaskedPlan};
pub use store::TemplateStore;

/// Plan for the correlation measure a template is matched with by default.
#[derive(Clone, Debug)]
pub enum ColorPlan {
    /// No transparency plane: coefficient-normalized correlation.
    Coeff(CoeffPlan),
    /// Transparency plane present: masked normalized correlation.
    Masked(MaskedPlan),
}

/// Immutable reference image for one marker label.
#[derive(Debug)]
pub struct Template {
    label: Arc<str>,
    color: ColorImage,
    transparency: Option<OwnedImage>,
    plan: ColorPlan,
    edge_plan: OnceLock<Option<CoeffPlan>>,
}

impl Template {
    /// Creates a template from a color image and an optional transparency
    /// plane of identical size.
    pub fn new(
        label: impl Into<Arc<str>>,
        color: ColorImage,
        transparency: Option<OwnedImage>,
    ) -> MarkerScanResult<Self> {
        let planes = color.views();
        let plan = match &transparency {
            Some(alpha) => {
                if alpha.width() != color.width() || alpha.height() != color.height() {
                    return Err(MarkerScanError::MaskMismatch {
                        width: color.width(),
                        height: color.height(),
                        mask_width: alpha.width(),
                        mask_height: alpha.height(),
                    });
                }
                ColorPlan::Masked(MaskedPlan::from_planes(&planes, alpha.view())?)
            }
            None => ColorPlan::Coeff(CoeffPlan::from_planes(&planes)?),
        };

        Ok(Self {
            label: label.into(),
            color,
            transparency,
            plan,
            edge_plan: OnceLock::new(),
        })
    }

    /// Creates a template from an RGBA buffer, using alpha as transparency.
    pub fn from_rgba(label: impl Into<Arc<str>>, img: &image::RgbaImage) -> MarkerScanResult<Self> {
        let (color, alpha) =
            crate::image::io::split_transparency(&image::DynamicImage::ImageRgba8(img.clone()))?;
        Self::new(label, color, alpha)
    }

    /// Returns the label this template detects.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn shared_label(&self) -> Arc<str> {
        Arc::clone(&self.label)
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.color.width()
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.color.height()
    }

    /// Returns the color plane.
    pub fn color(&self) -> &ColorImage {
        &self.color
    }

    /// Returns the transparency plane, if any.
    pub fn transparency(&self) -> Option<&OwnedImage> {
        self.transparency.as_ref()
    }

    /// Returns true when the template carries a transparency plane.
    pub fn has_transparency(&self) -> bool {
        self.transparency.is_some()
    }

    /// Returns the plan for the template's default measure.
    pub fn plan(&self) -> &ColorPlan {
        &self.plan
    }

    /// Returns the edge-texture plan, building it on first use.
    ///
    /// The outcome is cached either way; `None` means the edge texture could
    /// not be planned and the template is never edge-matched.
    pub fn edge_plan(&self) -> Option<&CoeffPlan> {
        self.edge_plan
            .get_or_init(|| {
                let edges = edge_texture(&self.color);
                match CoeffPlan::from_planes(&[edges.view()]) {
                    Ok(plan) => Some(plan),
                    Err(err) => {
                        tracing::warn!(label = %self.label, error = %err, "edge plan unavailable");
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Returns true when no pixel can contribute to a positive score.
    pub(crate) fn is_degenerate(&self) -> bool {
        match &self.plan {
            ColorPlan::Coeff(plan) => plan.var_t() <= f64::EPSILON,
            ColorPlan::Masked(plan) => plan.active() == 0 || plan.energy_t() <= f64::EPSILON,
        }
    }
}
