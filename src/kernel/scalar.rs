//! Scalar reference kernels for score evaluation.
//!
//! Both kernels sum over all planes and accumulate in `f64`, so an exact copy
//! of the template scores 1.0 up to `f32` rounding.

use crate::kernel::{Kernel, INVALID_SCORE};
use crate::template::{CoeffPlan, MaskedPlan};
use crate::ImageView;

/// Window variance at or below this value is treated as flat.
const MIN_VARIANCE: f64 = 1e-8;

/// Coefficient-normalized correlation (zero-mean NCC) over all planes.
///
/// `score = sum(t' * I) / sqrt(var_t * var_i)` where `t'` is the per-plane
/// centered template and `var_i` the summed per-plane window variance. A flat
/// window or flat template has no defined correlation and scores 0.0.
pub(crate) struct CoeffNormedScalar;

/// Masked normalized cross-correlation over all planes.
///
/// `score = sum(m * T * I) / sqrt(sum(m * T^2) * sum(m * I^2))` for binary
/// mask `m`. When either energy is zero the ratio is undefined and the
/// position scores [`INVALID_SCORE`].
pub(crate) struct MaskedCcorrScalar;

impl Kernel for CoeffNormedScalar {
    type Plan = CoeffPlan;

    fn plan_size(plan: &CoeffPlan) -> (usize, usize) {
        (plan.width(), plan.height())
    }

    fn plan_channels(plan: &CoeffPlan) -> usize {
        plan.channels()
    }

    fn score_at(planes: &[ImageView<'_, u8>], tpl: &CoeffPlan, x: usize, y: usize) -> f32 {
        let tpl_width = tpl.width();
        let tpl_height = tpl.height();
        let n = (tpl_width * tpl_height) as f64;

        let mut dot = 0.0f64;
        let mut var_i = 0.0f64;
        for (c, image) in planes.iter().enumerate() {
            let t_prime = tpl.t_prime(c);
            let mut sum_i = 0.0f64;
            let mut sum_i2 = 0.0f64;
            for ty in 0..tpl_height {
                let img_row = image.row(y + ty).expect("row within bounds for score");
                let base = ty * tpl_width;
                for tx in 0..tpl_width {
                    let value = img_row[x + tx] as f64;
                    dot += t_prime[base + tx] as f64 * value;
                    sum_i += value;
                    sum_i2 += value * value;
                }
            }
            var_i += sum_i2 - (sum_i * sum_i) / n;
        }

        let var_t = tpl.var_t();
        if var_t <= MIN_VARIANCE || var_i <= MIN_VARIANCE {
            return 0.0;
        }
        let score = dot / (var_t * var_i).sqrt();
        if score.is_finite() {
            score.clamp(-1.0, 1.0) as f32
        } else {
            0.0
        }
    }
}

impl Kernel for MaskedCcorrScalar {
    type Plan = MaskedPlan;

    fn plan_size(plan: &MaskedPlan) -> (usize, usize) {
        (plan.width(), plan.height())
    }

    fn plan_channels(plan: &MaskedPlan) -> usize {
        plan.channels()
    }

    fn score_at(planes: &[ImageView<'_, u8>], tpl: &MaskedPlan, x: usize, y: usize) -> f32 {
        let tpl_width = tpl.width();
        let tpl_height = tpl.height();
        let mask = tpl.mask();

        let mut dot = 0.0f64;
        let mut energy_i = 0.0f64;
        for (c, image) in planes.iter().enumerate() {
            let t_masked = tpl.t_masked(c);
            for ty in 0..tpl_height {
                let img_row = image.row(y + ty).expect("row within bounds for score");
                let base = ty * tpl_width;
                for tx in 0..tpl_width {
                    let idx = base + tx;
                    if mask[idx] == 0 {
                        continue;
                    }
                    let value = img_row[x + tx] as f64;
                    dot += t_masked[idx] as f64 * value;
                    energy_i += value * value;
                }
            }
        }

        // Zero energy on either side gives 0/0 here.
        let score = dot / (tpl.energy_t() * energy_i).sqrt();
        if score.is_finite() {
            score.min(1.0) as f32
        } else {
            INVALID_SCORE
        }
    }
}
