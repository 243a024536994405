//! Error types for markerscan.

use thiserror::Error;

/// Result alias for markerscan operations.
pub type MarkerScanResult<T> = std::result::Result<T, MarkerScanError>;

/// Errors that can occur while loading templates, matching, or mapping
/// coordinates.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarkerScanError {
    /// Width or height is zero or overflows the address space.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("stride {stride} is smaller than width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer cannot hold the described image.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A transparency plane does not match its color plane.
    #[error(
        "transparency plane {mask_width}x{mask_height} does not match color plane {width}x{height}"
    )]
    MaskMismatch {
        width: usize,
        height: usize,
        mask_width: usize,
        mask_height: usize,
    },
    /// A capture region does not lie inside the source.
    #[error(
        "region {width}x{height} at ({x}, {y}) exceeds source {source_width}x{source_height}"
    )]
    RegionOutsideSource {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        source_width: usize,
        source_height: usize,
    },
    /// Frame dimensions differ from the capture region they claim to cover.
    #[error(
        "frame is {frame_width}x{frame_height} but the capture region is {region_width}x{region_height}"
    )]
    FrameMismatch {
        frame_width: usize,
        frame_height: usize,
        region_width: usize,
        region_height: usize,
    },
    /// A box extends past the source bounds.
    #[error(
        "box centered at ({cx}, {cy}) sized {width}x{height} exceeds source {source_width}x{source_height}"
    )]
    BoxOutsideSource {
        cx: f64,
        cy: f64,
        width: f64,
        height: f64,
        source_width: usize,
        source_height: usize,
    },
    /// Image decoding or encoding failed.
    #[error("image i/o failed: {reason}")]
    ImageIo { reason: String },
    /// The frame source could not deliver a frame.
    #[error("capture failed: {reason}")]
    Capture { reason: String },
    /// A frame report could not be serialized or written.
    #[error("output failed: {reason}")]
    Output { reason: String },
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}
