//! Rayon-parallel surface evaluation (feature-gated).
//!
//! Rows of the correlation surface are independent, so each worker fills its
//! own output row. Results are identical to [`Kernel::surface`].

use crate::kernel::{surface_size, CorrelationSurface, Kernel};
use crate::ImageView;
use rayon::prelude::*;

/// Row-parallel counterpart of [`Kernel::surface`].
pub fn surface_par<K: Kernel>(
    planes: &[ImageView<'_, u8>],
    plan: &K::Plan,
) -> Option<CorrelationSurface> {
    let (width, height) = surface_size::<K>(planes, plan)?;
    let mut data = vec![0.0f32; width * height];
    data.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, slot) in row.iter_mut().enumerate() {
                *slot = K::score_at(planes, plan, x, y);
            }
        });
    Some(CorrelationSurface::from_vec(width, height, data))
}
