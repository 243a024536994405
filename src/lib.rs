//! MarkerScan locates known marker icons in screen captures.
//!
//! Templates are matched with coefficient-normalized correlation (on colors
//! or on a Laplacian edge texture) or, when they carry a transparency plane,
//! with masked normalized correlation. Overlapping matches are suppressed per
//! label and the survivors are reported in ratio coordinates of the full
//! capture source. Per-template matching can run in parallel via the `rayon`
//! feature.

mod candidate;
pub mod geometry;
pub mod image;
pub mod kernel;
pub mod navigate;
pub mod ocr;
pub mod overlay;
pub mod pipeline;
pub mod search;
pub mod session;
pub mod template;
pub mod util;

pub use candidate::{suppress, suppress_group, Candidate, NmsConfig};
pub use geometry::{to_pixel, to_ratio, CaptureRegion, PixelBox, PixelRect, RatioBox, SourceDims};
pub use crate::image::{ChannelOrder, ColorImage, ImageView, OwnedImage};
pub use kernel::{CorrelationSurface, Kernel, INVALID_SCORE};
pub use navigate::{Direction, NavigationConfig, NavigationRecord};
pub use ocr::{DistanceReader, DistanceRegionConfig, NoRecognizer, TextRecognizer};
pub use pipeline::{Detection, DetectionPipeline, PipelineConfig};
pub use search::{match_template, MatchConfig, MatchEngine, MatchMode, PreparedFrame};
pub use session::{
    CapturedFrame, FrameReport, FrameSink, FrameSource, Session, SessionOutcome, SessionSummary,
};
pub use template::{Template, TemplateStore};
pub use util::{MarkerScanError, MarkerScanResult};
