//! Helpers for decoding images via the `image` crate.

use crate::image::{ColorImage, OwnedImage};
use crate::util::{MarkerScanError, MarkerScanResult};
use std::path::Path;

/// Splits a decoded image into a color image and, for 4-channel inputs, its
/// transparency plane.
pub fn split_transparency(
    img: &image::DynamicImage,
) -> MarkerScanResult<(ColorImage, Option<OwnedImage>)> {
    if img.color().channel_count() != 4 {
        return Ok((ColorImage::from_rgb_image(&img.to_rgb8())?, None));
    }

    let rgba = img.to_rgba8();
    let width = rgba.width() as usize;
    let height = rgba.height() as usize;
    let color = ColorImage::from_interleaved(
        rgba.as_raw(),
        width,
        height,
        4,
        crate::image::ChannelOrder::Rgb,
    )?;
    let alpha: Vec<u8> = rgba.pixels().map(|px| px.0[3]).collect();
    Ok((color, Some(OwnedImage::new(alpha, width, height)?)))
}

/// Loads an image from disk, keeping a transparency plane when present.
pub fn load_with_transparency<P: AsRef<Path>>(
    path: P,
) -> MarkerScanResult<(ColorImage, Option<OwnedImage>)> {
    let img = image::open(path).map_err(|err| MarkerScanError::ImageIo {
        reason: err.to_string(),
    })?;
    split_transparency(&img)
}

/// Loads an image from disk as three-channel color, discarding any alpha.
pub fn load_color_image<P: AsRef<Path>>(path: P) -> MarkerScanResult<ColorImage> {
    let img = image::open(path).map_err(|err| MarkerScanError::ImageIo {
        reason: err.to_string(),
    })?;
    ColorImage::from_rgb_image(&img.to_rgb8())
}
