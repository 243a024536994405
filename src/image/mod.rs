//! Planar image buffers used by the matching kernels.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride
//! (elements between the starts of consecutive rows). `OwnedImage` is a
//! contiguous single-plane `u8` buffer and `ColorImage` groups three equally
//! sized planes. Frames and templates are stored planar so every kernel works
//! on plain rows regardless of the channel count.

use crate::util::{MarkerScanError, MarkerScanResult};

mod color;
pub mod edge;
pub mod io;

pub use color::{ChannelOrder, ColorImage};

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> MarkerScanResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        stride: usize,
    ) -> MarkerScanResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(MarkerScanError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.stride + x)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.stride;
        self.data.get(start..start + self.width)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> MarkerScanResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(MarkerScanError::InvalidDimensions { width, height });
        }
        let out_of_bounds = MarkerScanError::RegionOutsideSource {
            x,
            y,
            width,
            height,
            source_width: self.width,
            source_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = y * self.stride + x;
        let data = self.data.get(start..).ok_or(MarkerScanError::BufferTooSmall {
            needed: start + 1,
            got: self.data.len(),
        })?;
        ImageView::new(data, width, height, self.stride)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> MarkerScanResult<usize> {
    if width == 0 || height == 0 {
        return Err(MarkerScanError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(MarkerScanError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(MarkerScanError::InvalidDimensions { width, height })
}

/// Owned contiguous single-plane `u8` image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Wraps a row-major buffer whose length is exactly `width * height`.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> MarkerScanResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() < needed {
            return Err(MarkerScanError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(MarkerScanError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates an image filled with `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> MarkerScanResult<Self> {
        let len = required_len(width, height, width)?;
        Self::new(vec![value; len], width, height)
    }

    /// Copies a (possibly strided) view into a contiguous buffer.
    pub fn from_view(view: ImageView<'_, u8>) -> Self {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for y in 0..view.height() {
            if let Some(row) = view.row(y) {
                data.extend_from_slice(row);
            }
        }
        Self {
            data,
            width: view.width(),
            height: view.height(),
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the pixel at `(x, y)`; panics when out of bounds.
    pub(crate) fn at(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}
