use clap::Parser;
use markerscan::image::io::load_color_image;
use markerscan::overlay::{draw_detections, LabelFont, OverlayStyle};
use markerscan::session::{CapturedFrame, FrameReport, FrameSink, FrameSource};
use markerscan::{
    CaptureRegion, Detection, DetectionPipeline, DistanceReader, DistanceRegionConfig, ImageView,
    MarkerScanError, MarkerScanResult, MatchConfig, NavigationConfig, NavigationRecord,
    PipelineConfig, Session, SessionOutcome, SourceDims, TemplateStore, TextRecognizer,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::AtomicBool;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "MarkerScan CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
struct TemplateEntry {
    label: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct ColorEntry {
    label: String,
    rgb: [u8; 3],
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatchConfigJson {
    match_threshold: f32,
    use_edge_filter: bool,
}

impl Default for MatchConfigJson {
    fn default() -> Self {
        let cfg = MatchConfig::default();
        Self {
            match_threshold: cfg.match_threshold,
            use_edge_filter: cfg.use_edge_filter,
        }
    }
}

impl From<&MatchConfigJson> for MatchConfig {
    fn from(value: &MatchConfigJson) -> Self {
        Self {
            match_threshold: value.match_threshold,
            use_edge_filter: value.use_edge_filter,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NavigationConfigJson {
    straight_ahead_threshold: f64,
    ocr_center_window: f64,
}

impl Default for NavigationConfigJson {
    fn default() -> Self {
        let cfg = NavigationConfig::default();
        Self {
            straight_ahead_threshold: cfg.straight_ahead_threshold,
            ocr_center_window: cfg.ocr_center_window,
        }
    }
}

impl From<&NavigationConfigJson> for NavigationConfig {
    fn from(value: &NavigationConfigJson) -> Self {
        Self {
            straight_ahead_threshold: value.straight_ahead_threshold,
            ocr_center_window: value.ocr_center_window,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DistanceRegionJson {
    height_ratio: f64,
    min_width_ratio: f64,
    width_scale: f64,
    binarize_threshold: u8,
}

impl Default for DistanceRegionJson {
    fn default() -> Self {
        let cfg = DistanceRegionConfig::default();
        Self {
            height_ratio: cfg.height_ratio,
            min_width_ratio: cfg.min_width_ratio,
            width_scale: cfg.width_scale,
            binarize_threshold: cfg.binarize_threshold,
        }
    }
}

impl From<&DistanceRegionJson> for DistanceRegionConfig {
    fn from(value: &DistanceRegionJson) -> Self {
        Self {
            height_ratio: value.height_ratio,
            min_width_ratio: value.min_width_ratio,
            width_scale: value.width_scale,
            binarize_threshold: value.binarize_threshold,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    templates: Vec<TemplateEntry>,
    colors: Vec<ColorEntry>,
    frames: Vec<String>,
    roi_height_ratio: f64,
    #[serde(rename = "match")]
    match_cfg: MatchConfigJson,
    iou_threshold: f32,
    parallel: bool,
    navigation: NavigationConfigJson,
    distance_region: DistanceRegionJson,
    ocr_command: Option<Vec<String>>,
    overlay_dir: Option<String>,
    font_path: Option<String>,
    output_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            templates: Vec::new(),
            colors: Vec::new(),
            frames: Vec::new(),
            roi_height_ratio: 0.25,
            match_cfg: MatchConfigJson::default(),
            iou_threshold: pipeline.iou_threshold,
            parallel: pipeline.parallel,
            navigation: NavigationConfigJson::default(),
            distance_region: DistanceRegionJson::default(),
            ocr_command: None,
            overlay_dir: None,
            font_path: None,
            output_path: None,
        }
    }
}

/// Replays saved full-resolution screenshots as a capture source, cropping
/// each to the configured top strip.
struct ScreenshotSource {
    dims: SourceDims,
    region: CaptureRegion,
    pending: VecDeque<String>,
}

impl ScreenshotSource {
    fn open(paths: &[String], roi_height_ratio: f64) -> MarkerScanResult<Self> {
        let first = paths
            .first()
            .ok_or(MarkerScanError::InvalidConfig("frames must not be empty"))?;
        let first_frame = load_color_image(first)?;
        let dims = SourceDims::new(first_frame.width(), first_frame.height())?;
        let region = CaptureRegion::top_strip(dims, roi_height_ratio)?;
        Ok(Self {
            dims,
            region,
            pending: paths.iter().cloned().collect(),
        })
    }
}

impl FrameSource for ScreenshotSource {
    fn dims(&self) -> SourceDims {
        self.dims
    }

    fn next_frame(&mut self) -> MarkerScanResult<Option<CapturedFrame>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let full = load_color_image(&path).map_err(|err| MarkerScanError::Capture {
            reason: format!("{path}: {err}"),
        })?;
        if full.width() != self.dims.width || full.height() != self.dims.height {
            return Err(MarkerScanError::Capture {
                reason: format!(
                    "{path}: screenshot is {}x{}, expected {}x{}",
                    full.width(),
                    full.height(),
                    self.dims.width,
                    self.dims.height
                ),
            });
        }
        let image = full.crop(
            self.region.x,
            self.region.y,
            self.region.width,
            self.region.height,
        )?;
        Ok(Some(CapturedFrame {
            image,
            region: self.region,
        }))
    }

    fn release(&mut self) {
        self.pending.clear();
    }
}

/// Runs an external program per patch: PNG on stdin, text on stdout.
struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn run(&self, patch: ImageView<'_, u8>) -> Result<String, Box<dyn std::error::Error>> {
        let mut gray = image::GrayImage::new(patch.width() as u32, patch.height() as u32);
        for (y, row) in (0..patch.height()).filter_map(|y| patch.row(y)).enumerate() {
            for (x, &value) in row[..patch.width()].iter().enumerate() {
                gray.put_pixel(x as u32, y as u32, image::Luma([value]));
            }
        }
        let mut png = Vec::new();
        gray.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png)?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(format!("{} exited with {}", self.program, output.status).into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TextRecognizer for CommandRecognizer {
    fn recognize(&self, patch: ImageView<'_, u8>) -> Option<String> {
        match self.run(patch) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::warn!(program = %self.program, error = %err, "text recognition failed");
                None
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct DetectionRecord<'a> {
    id: usize,
    label: &'a str,
    x_ratio: f64,
    y_ratio: f64,
    width_ratio: f64,
    height_ratio: f64,
}

impl<'a> From<&'a Detection> for DetectionRecord<'a> {
    fn from(value: &'a Detection) -> Self {
        Self {
            id: value.id,
            label: &value.label,
            x_ratio: value.x_ratio,
            y_ratio: value.y_ratio,
            width_ratio: value.width_ratio,
            height_ratio: value.height_ratio,
        }
    }
}

#[derive(Debug, Serialize)]
struct NavigationOutput<'a> {
    id: usize,
    label: &'a str,
    rel_offset: f64,
    direction: &'static str,
    distance: &'a str,
}

impl<'a> From<&'a NavigationRecord> for NavigationOutput<'a> {
    fn from(value: &'a NavigationRecord) -> Self {
        Self {
            id: value.id,
            label: &value.label,
            rel_offset: (value.rel_offset * 1000.0).round() / 1000.0,
            direction: value.direction.as_str(),
            distance: &value.distance,
        }
    }
}

#[derive(Debug, Serialize)]
struct FrameOutput<'a> {
    frame: usize,
    detections: Vec<DetectionRecord<'a>>,
    navigation: Vec<NavigationOutput<'a>>,
}

/// Writes one JSON line per frame and optionally saves annotated frames.
struct ReportSink {
    out: Box<dyn Write>,
    overlay_dir: Option<PathBuf>,
    style: OverlayStyle,
    source: SourceDims,
}

impl FrameSink for ReportSink {
    fn on_frame(&mut self, frame: &CapturedFrame, report: &FrameReport) -> MarkerScanResult<()> {
        let output = FrameOutput {
            frame: report.frame_index,
            detections: report.detections.iter().map(DetectionRecord::from).collect(),
            navigation: report.navigation.iter().map(NavigationOutput::from).collect(),
        };
        let line = serde_json::to_string(&output).map_err(|err| MarkerScanError::Output {
            reason: err.to_string(),
        })?;
        writeln!(self.out, "{line}").map_err(|err| MarkerScanError::Output {
            reason: err.to_string(),
        })?;

        if let Some(dir) = &self.overlay_dir {
            let mut canvas = frame.image.to_rgb_image();
            draw_detections(
                &mut canvas,
                frame.region,
                self.source,
                &report.detections,
                &report.navigation,
                &self.style,
            );
            let path = dir.join(format!("frame_{:05}.png", report.frame_index));
            canvas.save(&path).map_err(|err| MarkerScanError::ImageIo {
                reason: format!("{}: {err}", path.display()),
            })?;
        }
        Ok(())
    }
}

fn run_session<R: TextRecognizer>(
    session: Session<R>,
    source: &mut ScreenshotSource,
    sink: &mut ReportSink,
) -> Result<(), Box<dyn std::error::Error>> {
    let stop = AtomicBool::new(false);
    let summary = session.run(source, sink, &stop);
    tracing::info!(frames = summary.frames, outcome = ?summary.outcome, "session finished");
    sink.out.flush()?;
    match summary.outcome {
        SessionOutcome::Failed(err) => Err(err.into()),
        SessionOutcome::Exhausted | SessionOutcome::Stopped => Ok(()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("markerscan=info".parse()?),
            )
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn"))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.frames.is_empty() {
        return Err("frames must list at least one screenshot".into());
    }

    let store = TemplateStore::load(
        config
            .templates
            .iter()
            .map(|entry| (entry.label.as_str(), entry.path.as_str())),
    );
    let pipeline = DetectionPipeline::new(
        store,
        PipelineConfig {
            matching: MatchConfig::from(&config.match_cfg),
            iou_threshold: config.iou_threshold,
            parallel: config.parallel,
        },
    )?;

    let mut source = ScreenshotSource::open(&config.frames, config.roi_height_ratio)?;
    let overlay_dir = config.overlay_dir.as_ref().map(PathBuf::from);
    if let Some(dir) = &overlay_dir {
        fs::create_dir_all(dir)?;
    }
    let out: Box<dyn Write> = match &config.output_path {
        Some(path) => Box::new(io::BufWriter::new(fs::File::create(path)?)),
        None => Box::new(io::stdout()),
    };
    let mut style = OverlayStyle::new(
        config
            .colors
            .iter()
            .map(|entry| (entry.label.as_str(), entry.rgb))
            .collect(),
    );
    if let Some(path) = &config.font_path {
        style = style.with_font(LabelFont::load(path)?);
    }
    let mut sink = ReportSink {
        out,
        overlay_dir,
        style,
        source: source.dims(),
    };

    let session = Session::new(pipeline, NavigationConfig::from(&config.navigation));
    let region_cfg = DistanceRegionConfig::from(&config.distance_region);
    match config
        .ocr_command
        .as_deref()
        .and_then(CommandRecognizer::from_command)
    {
        Some(recognizer) => run_session(
            session.with_reader(DistanceReader::new(recognizer, region_cfg)),
            &mut source,
            &mut sink,
        ),
        None => run_session(session, &mut source, &mut sink),
    }
}
