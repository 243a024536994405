//! Three-plane color images.

use crate::image::{ImageView, OwnedImage};
use crate::util::{MarkerScanError, MarkerScanResult};

/// Channel order of an interleaved color buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Planar color image, planes stored in R, G, B order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorImage {
    planes: [OwnedImage; 3],
}

impl ColorImage {
    /// Builds a color image from three planes of identical size.
    pub fn from_planes(r: OwnedImage, g: OwnedImage, b: OwnedImage) -> MarkerScanResult<Self> {
        for plane in [&g, &b] {
            if plane.width() != r.width() || plane.height() != r.height() {
                return Err(MarkerScanError::InvalidDimensions {
                    width: plane.width(),
                    height: plane.height(),
                });
            }
        }
        Ok(Self { planes: [r, g, b] })
    }

    /// De-interleaves a packed buffer with `channels` bytes per pixel.
    ///
    /// Only the first three channels of each pixel are read, so BGRA/RGBA
    /// capture buffers can be passed directly with `channels == 4`.
    pub fn from_interleaved(
        data: &[u8],
        width: usize,
        height: usize,
        channels: usize,
        order: ChannelOrder,
    ) -> MarkerScanResult<Self> {
        if channels < 3 {
            return Err(MarkerScanError::InvalidConfig(
                "interleaved color needs at least 3 channels",
            ));
        }
        let count = width
            .checked_mul(height)
            .filter(|&n| n > 0)
            .ok_or(MarkerScanError::InvalidDimensions { width, height })?;
        let needed = count * channels;
        if data.len() < needed {
            return Err(MarkerScanError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }

        let mut r = Vec::with_capacity(count);
        let mut g = Vec::with_capacity(count);
        let mut b = Vec::with_capacity(count);
        for px in data[..needed].chunks_exact(channels) {
            let (red, blue) = match order {
                ChannelOrder::Rgb => (px[0], px[2]),
                ChannelOrder::Bgr => (px[2], px[0]),
            };
            r.push(red);
            g.push(px[1]);
            b.push(blue);
        }
        Self::from_planes(
            OwnedImage::new(r, width, height)?,
            OwnedImage::new(g, width, height)?,
            OwnedImage::new(b, width, height)?,
        )
    }

    /// Converts an `image` crate RGB buffer.
    pub fn from_rgb_image(img: &image::RgbImage) -> MarkerScanResult<Self> {
        Self::from_interleaved(
            img.as_raw(),
            img.width() as usize,
            img.height() as usize,
            3,
            ChannelOrder::Rgb,
        )
    }

    /// Re-interleaves into an `image` crate RGB buffer.
    pub fn to_rgb_image(&self) -> image::RgbImage {
        let (r, g, b) = (self.planes[0].data(), self.planes[1].data(), self.planes[2].data());
        let mut raw = Vec::with_capacity(r.len() * 3);
        for i in 0..r.len() {
            raw.extend_from_slice(&[r[i], g[i], b[i]]);
        }
        // Dimensions come from a validated buffer of exactly w*h*3 bytes.
        image::RgbImage::from_raw(self.width() as u32, self.height() as u32, raw)
            .unwrap_or_else(|| image::RgbImage::new(self.width() as u32, self.height() as u32))
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.planes[0].width()
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.planes[0].height()
    }

    /// Returns all planes in R, G, B order.
    pub fn planes(&self) -> &[OwnedImage; 3] {
        &self.planes
    }

    /// Returns borrowed views of all planes in R, G, B order.
    pub fn views(&self) -> [ImageView<'_, u8>; 3] {
        [
            self.planes[0].view(),
            self.planes[1].view(),
            self.planes[2].view(),
        ]
    }

    /// Copies out a rectangular sub-image.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> MarkerScanResult<Self> {
        let [r, g, b] = self.views();
        Self::from_planes(
            OwnedImage::from_view(r.roi(x, y, width, height)?),
            OwnedImage::from_view(g.roi(x, y, width, height)?),
            OwnedImage::from_view(b.roi(x, y, width, height)?),
        )
    }

    /// Luma (ITU-R 601) conversion with rounding.
    pub fn to_gray(&self) -> OwnedImage {
        let (r, g, b) = (self.planes[0].data(), self.planes[1].data(), self.planes[2].data());
        let mut out = self.planes[0].clone();
        for (i, dst) in out.data_mut().iter_mut().enumerate() {
            let y = 0.299 * r[i] as f32 + 0.587 * g[i] as f32 + 0.114 * b[i] as f32;
            *dst = y.round().clamp(0.0, 255.0) as u8;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgra_buffers_drop_alpha_and_swap_order() {
        let data = [10u8, 20, 30, 255, 40, 50, 60, 0];
        let img = ColorImage::from_interleaved(&data, 2, 1, 4, ChannelOrder::Bgr).unwrap();
        assert_eq!(img.planes()[0].data(), &[30, 60]);
        assert_eq!(img.planes()[1].data(), &[20, 50]);
        assert_eq!(img.planes()[2].data(), &[10, 40]);
    }

    #[test]
    fn gray_of_pure_channels_matches_weights() {
        let data = [255u8, 0, 0, 0, 255, 0, 0, 0, 255];
        let img = ColorImage::from_interleaved(&data, 3, 1, 3, ChannelOrder::Rgb).unwrap();
        assert_eq!(img.to_gray().data(), &[76, 150, 29]);
    }

    #[test]
    fn crop_extracts_expected_pixels() {
        let data: Vec<u8> = (0..4 * 3 * 3).map(|v| v as u8).collect();
        let img = ColorImage::from_interleaved(&data, 4, 3, 3, ChannelOrder::Rgb).unwrap();
        let sub = img.crop(1, 1, 2, 2).unwrap();
        assert_eq!(sub.width(), 2);
        assert_eq!(sub.planes()[0].data(), &[15, 18, 27, 30]);
        assert!(img.crop(3, 0, 2, 1).is_err());
    }
}
