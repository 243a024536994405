//! Template plan precomputation for the correlation measures.

use crate::image::ImageView;
use crate::util::{MarkerScanError, MarkerScanResult};

/// Precomputed zero-mean planes for coefficient-normalized correlation.
///
/// Each plane is centered on its own mean; `var_t` is the sum of squared
/// centered values over all planes.
#[derive(Clone, Debug)]
pub struct CoeffPlan {
    width: usize,
    height: usize,
    t_prime: Vec<Vec<f32>>,
    var_t: f64,
}

impl CoeffPlan {
    /// Builds a plan from one or more equally sized planes.
    pub fn from_planes(planes: &[ImageView<'_, u8>]) -> MarkerScanResult<Self> {
        let (width, height) = common_size(planes)?;
        let count = (width * height) as f64;

        let mut t_prime = Vec::with_capacity(planes.len());
        let mut var_t = 0.0f64;
        for plane in planes {
            let mut sum = 0.0f64;
            for y in 0..height {
                sum += row_of(plane, y)?.iter().map(|&v| v as f64).sum::<f64>();
            }
            let mean = sum / count;

            let mut centered = Vec::with_capacity(width * height);
            for y in 0..height {
                for &value in row_of(plane, y)? {
                    let d = value as f64 - mean;
                    var_t += d * d;
                    centered.push(d as f32);
                }
            }
            t_prime.push(centered);
        }

        Ok(Self {
            width,
            height,
            t_prime,
            var_t,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of planes.
    pub fn channels(&self) -> usize {
        self.t_prime.len()
    }

    /// Returns the centered values of plane `c` in row-major order.
    pub fn t_prime(&self, c: usize) -> &[f32] {
        &self.t_prime[c]
    }

    /// Returns the summed squared deviation over all planes.
    pub fn var_t(&self) -> f64 {
        self.var_t
    }
}

/// Precomputed masked planes for masked normalized cross-correlation.
///
/// The mask is binarized: any non-zero transparency value selects the pixel.
#[derive(Clone, Debug)]
pub struct MaskedPlan {
    width: usize,
    height: usize,
    mask: Vec<u8>,
    t_masked: Vec<Vec<f32>>,
    energy_t: f64,
    active: usize,
}

impl MaskedPlan {
    /// Builds a plan from color planes and a transparency plane.
    pub fn from_planes(
        planes: &[ImageView<'_, u8>],
        transparency: ImageView<'_, u8>,
    ) -> MarkerScanResult<Self> {
        let (width, height) = common_size(planes)?;
        if transparency.width() != width || transparency.height() != height {
            return Err(MarkerScanError::MaskMismatch {
                width,
                height,
                mask_width: transparency.width(),
                mask_height: transparency.height(),
            });
        }

        let mut mask = Vec::with_capacity(width * height);
        for y in 0..height {
            mask.extend(row_of(&transparency, y)?.iter().map(|&a| u8::from(a != 0)));
        }
        let active = mask.iter().filter(|&&m| m == 1).count();

        let mut t_masked = Vec::with_capacity(planes.len());
        let mut energy_t = 0.0f64;
        for plane in planes {
            let mut values = Vec::with_capacity(width * height);
            for y in 0..height {
                let base = y * width;
                for (x, &value) in row_of(plane, y)?.iter().enumerate() {
                    let v = if mask[base + x] == 1 { value as f32 } else { 0.0 };
                    energy_t += v as f64 * v as f64;
                    values.push(v);
                }
            }
            t_masked.push(values);
        }

        Ok(Self {
            width,
            height,
            mask,
            t_masked,
            energy_t,
            active,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of color planes.
    pub fn channels(&self) -> usize {
        self.t_masked.len()
    }

    /// Returns the binarized mask (0 or 1) in row-major order.
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    /// Returns plane `c` with unmasked pixels zeroed.
    pub fn t_masked(&self, c: usize) -> &[f32] {
        &self.t_masked[c]
    }

    /// Returns the template energy under the mask over all planes.
    pub fn energy_t(&self) -> f64 {
        self.energy_t
    }

    /// Returns the number of pixels selected by the mask.
    pub fn active(&self) -> usize {
        self.active
    }
}

fn common_size(planes: &[ImageView<'_, u8>]) -> MarkerScanResult<(usize, usize)> {
    let first = planes
        .first()
        .ok_or(MarkerScanError::InvalidConfig("template needs at least one plane"))?;
    let (width, height) = (first.width(), first.height());
    if let Some(bad) = planes
        .iter()
        .find(|p| p.width() != width || p.height() != height)
    {
        return Err(MarkerScanError::InvalidDimensions {
            width: bad.width(),
            height: bad.height(),
        });
    }
    Ok((width, height))
}

fn row_of<'a>(plane: &ImageView<'a, u8>, y: usize) -> MarkerScanResult<&'a [u8]> {
    plane.row(y).ok_or(MarkerScanError::BufferTooSmall {
        needed: (y + 1) * plane.stride(),
        got: plane.stride() * plane.height(),
    })
}
