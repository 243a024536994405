//! Correlation kernel implementations.
//!
//! A kernel scores one template placement (top-left coordinates) against a
//! set of frame planes; filling every valid placement yields a dense
//! [`CorrelationSurface`] of size `(W - w + 1) x (H - h + 1)`.

use crate::ImageView;

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;

/// Score written where masked correlation is undefined.
///
/// Sits below every usable match threshold, so such positions never become
/// candidates.
pub const INVALID_SCORE: f32 = -1.0;

/// Kernel trait for scoring template placements.
pub trait Kernel {
    type Plan: Sync;

    /// Returns the template size `(width, height)` described by `plan`.
    fn plan_size(plan: &Self::Plan) -> (usize, usize);

    /// Returns the number of planes `plan` expects.
    fn plan_channels(plan: &Self::Plan) -> usize;

    /// Computes the score at a single placement.
    ///
    /// The caller guarantees that the template fits at `(x, y)`.
    fn score_at(planes: &[ImageView<'_, u8>], plan: &Self::Plan, x: usize, y: usize) -> f32;

    /// Scores every valid placement, row by row.
    ///
    /// Returns `None` when the template does not fit inside the frame.
    fn surface(planes: &[ImageView<'_, u8>], plan: &Self::Plan) -> Option<CorrelationSurface> {
        let (width, height) = surface_size::<Self>(planes, plan)?;
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(Self::score_at(planes, plan, x, y));
            }
        }
        Some(CorrelationSurface::from_vec(width, height, data))
    }
}

/// Returns the surface size for `plan` over `planes`, or `None` when the
/// template is larger than the frame or the channel counts disagree.
pub(crate) fn surface_size<K: Kernel + ?Sized>(
    planes: &[ImageView<'_, u8>],
    plan: &K::Plan,
) -> Option<(usize, usize)> {
    let first = planes.first()?;
    if planes.len() != K::plan_channels(plan) {
        return None;
    }
    let (tpl_width, tpl_height) = K::plan_size(plan);
    if first.width() < tpl_width || first.height() < tpl_height {
        return None;
    }
    Some((first.width() - tpl_width + 1, first.height() - tpl_height + 1))
}

/// Dense grid of correlation scores, one per template placement.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationSurface {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl CorrelationSurface {
    pub(crate) fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    /// Number of placement columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of placement rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Score at placement `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// All scores in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Positions with score `>= threshold`, in row-major discovery order.
    pub fn positions_at_least(
        &self,
        threshold: f32,
    ) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(move |&(_, &score)| score >= threshold)
            .map(move |(idx, &score)| (idx % self.width, idx / self.width, score))
    }

    /// Highest score and its position, ties going to the first in row-major
    /// order.
    pub fn max(&self) -> Option<(usize, usize, f32)> {
        let mut best: Option<(usize, usize, f32)> = None;
        for (idx, &score) in self.data.iter().enumerate() {
            if best.map_or(true, |(_, _, s)| score > s) {
                best = Some((idx % self.width, idx / self.width, score));
            }
        }
        best
    }
}
