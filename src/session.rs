//! Frame loop over a capture source.
//!
//! Each iteration captures one frame, detects markers, derives navigation
//! records and hands the result to a [`FrameSink`]. The stop flag is checked
//! between frames only. The first error ends the session; the source is
//! always released before [`Session::run`] returns.

use crate::geometry::{CaptureRegion, SourceDims};
use crate::image::ColorImage;
use crate::navigate::{navigate, NavigationConfig, NavigationRecord};
use crate::ocr::{DistanceReader, NoRecognizer, TextRecognizer};
use crate::pipeline::{Detection, DetectionPipeline};
use crate::util::{MarkerScanError, MarkerScanResult};
use std::sync::atomic::{AtomicBool, Ordering};

/// One captured frame and where it came from.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub image: ColorImage,
    /// Part of the source the image covers.
    pub region: CaptureRegion,
}

/// Delivers frames from a display or a recording.
pub trait FrameSource {
    /// Full source resolution.
    fn dims(&self) -> SourceDims;

    /// Captures the next frame; `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> MarkerScanResult<Option<CapturedFrame>>;

    /// Releases capture resources. Called once when the session ends.
    fn release(&mut self) {}
}

/// Everything produced for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub frame_index: usize,
    pub detections: Vec<Detection>,
    pub navigation: Vec<NavigationRecord>,
}

/// Consumer of per-frame results.
pub trait FrameSink {
    fn on_frame(&mut self, frame: &CapturedFrame, report: &FrameReport) -> MarkerScanResult<()>;
}

impl FrameSink for Vec<FrameReport> {
    fn on_frame(&mut self, _frame: &CapturedFrame, report: &FrameReport) -> MarkerScanResult<()> {
        self.push(report.clone());
        Ok(())
    }
}

/// Why a session ended.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    /// The source ran out of frames.
    Exhausted,
    /// The stop flag was raised.
    Stopped,
    /// A frame failed; the session was not resumed.
    Failed(MarkerScanError),
}

/// Frames processed and the reason the loop ended.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub frames: usize,
    pub outcome: SessionOutcome,
}

/// Couples a pipeline with navigation and optional distance reading.
pub struct Session<R = NoRecognizer> {
    pipeline: DetectionPipeline,
    navigation: NavigationConfig,
    reader: Option<DistanceReader<R>>,
}

impl Session<NoRecognizer> {
    pub fn new(pipeline: DetectionPipeline, navigation: NavigationConfig) -> Self {
        Self {
            pipeline,
            navigation,
            reader: None,
        }
    }
}

impl<R: TextRecognizer> Session<R> {
    /// Reads distance labels with `reader` for centered detections.
    pub fn with_reader<R2: TextRecognizer>(self, reader: DistanceReader<R2>) -> Session<R2> {
        Session {
            pipeline: self.pipeline,
            navigation: self.navigation,
            reader: Some(reader),
        }
    }

    pub fn pipeline(&self) -> &DetectionPipeline {
        &self.pipeline
    }

    /// Processes one captured frame.
    pub fn process(
        &self,
        frame: &CapturedFrame,
        source: SourceDims,
        frame_index: usize,
    ) -> MarkerScanResult<FrameReport> {
        let detections = self
            .pipeline
            .run_region(&frame.image, frame.region, source)?;
        let navigation = navigate(
            &detections,
            &frame.image,
            frame.region,
            source,
            self.reader.as_ref(),
            &self.navigation,
        );
        Ok(FrameReport {
            frame_index,
            detections,
            navigation,
        })
    }

    /// Runs until the source is exhausted, `stop` is raised, or a frame fails.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K, stop: &AtomicBool) -> SessionSummary
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let dims = source.dims();
        let mut frames = 0usize;
        let outcome = loop {
            if stop.load(Ordering::Relaxed) {
                tracing::info!(frames, "stop requested");
                break SessionOutcome::Stopped;
            }
            let step = source.next_frame().and_then(|captured| match captured {
                Some(frame) => {
                    let report = self.process(&frame, dims, frames)?;
                    sink.on_frame(&frame, &report)?;
                    Ok(true)
                }
                None => Ok(false),
            });
            match step {
                Ok(true) => frames += 1,
                Ok(false) => break SessionOutcome::Exhausted,
                Err(err) => {
                    tracing::error!(
                        frame = frames,
                        error = %err,
                        "frame processing failed; ending session"
                    );
                    break SessionOutcome::Failed(err);
                }
            }
        };
        source.release();
        SessionSummary { frames, outcome }
    }
}
