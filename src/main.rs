use anyhow::{Context, Result};
use clap::Parser;
use lesion_scanner::config::class_catalog::ClassCatalog;
use lesion_scanner::config::scanner_config::ScannerConfig;
use lesion_scanner::consolidation::box_merger::MergeMode;
use lesion_scanner::image_utils::background::{
    BackgroundNormalizer, PassthroughNormalizer, WhiteBackgroundCompositor,
};
use lesion_scanner::image_utils::image_io::save_rgb8_as_png;
use lesion_scanner::object_detection::yolo_detector::YoloDetector;
use lesion_scanner::pipeline::detection_pipeline::DetectionPipeline;
use lesion_scanner::rendering::renderer::BoxRenderer;
use lesion_scanner::scan::body_scanner::BodyScanner;
use lesion_scanner::scan::report::ScanReport;
use lesion_scanner::scan::view::{View, ViewImages};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lesion-scanner")]
#[command(about = "Detect skin lesions on front, left and right photographs of a body region")]
struct Cli {
    /// Front view photograph
    #[arg(long, value_name = "IMAGE")]
    front: PathBuf,

    /// Left view photograph
    #[arg(long, value_name = "IMAGE")]
    left: PathBuf,

    /// Right view photograph
    #[arg(long, value_name = "IMAGE")]
    right: PathBuf,

    /// JSON config file; flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// YOLO model exported to ONNX
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Class names, one per line
    #[arg(long, value_name = "FILE")]
    classes: Option<PathBuf>,

    /// JSON color overrides, e.g. {"0": [255, 0, 0]}
    #[arg(long, value_name = "FILE")]
    colors: Option<PathBuf>,

    /// Directory for annotated images
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Minimum detection confidence
    #[arg(long)]
    confidence: Option<f32>,

    /// IoU for the detector's own non-maximum suppression
    #[arg(long)]
    detector_iou: Option<f32>,

    /// IoU above which same-class boxes are merged
    #[arg(long)]
    merge_iou: Option<f32>,

    /// How merge clusters grow
    #[arg(long, value_enum)]
    merge_mode: Option<MergeModeArg>,

    /// Skip flattening transparent backgrounds onto white
    #[arg(long)]
    keep_background: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum MergeModeArg {
    SeedOnly,
    Transitive,
}

impl From<MergeModeArg> for MergeMode {
    fn from(arg: MergeModeArg) -> Self {
        match arg {
            MergeModeArg::SeedOnly => MergeMode::SeedOnly,
            MergeModeArg::Transitive => MergeMode::Transitive,
        }
    }
}

impl Cli {
    fn into_config(self) -> Result<(ScannerConfig, ViewPaths)> {
        let mut config = match &self.config {
            Some(path) => ScannerConfig::from_json_file(path)?,
            None => ScannerConfig::default(),
        };
        if let Some(model) = self.model {
            config.model_path = model;
        }
        if let Some(classes) = self.classes {
            config.classes_path = classes;
        }
        if self.colors.is_some() {
            config.colors_path = self.colors;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(confidence) = self.confidence {
            config.confidence_threshold = confidence;
        }
        if let Some(detector_iou) = self.detector_iou {
            config.detector_iou_threshold = detector_iou;
        }
        if let Some(merge_iou) = self.merge_iou {
            config.merge_iou_threshold = merge_iou;
        }
        if let Some(merge_mode) = self.merge_mode {
            config.merge_mode = merge_mode.into();
        }
        if self.keep_background {
            config.remove_background = false;
        }
        config.validate()?;
        let views = ViewPaths {
            front: self.front,
            left: self.left,
            right: self.right,
        };
        Ok((config, views))
    }
}

struct ViewPaths {
    front: PathBuf,
    left: PathBuf,
    right: PathBuf,
}

impl ViewPaths {
    fn read(&self) -> Result<ViewImages> {
        let read = |path: &Path| {
            fs::read(path).with_context(|| format!("failed to read image {:?}", path))
        };
        Ok(ViewImages {
            front: read(&self.front)?,
            left: read(&self.left)?,
            right: read(&self.right)?,
        })
    }
}

fn annotated_file_name(view: View) -> String {
    format!("{}_annotated.png", view)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let (config, view_paths) = Cli::parse().into_config()?;

    let catalog = ClassCatalog::load(&config.classes_path, config.colors_path.as_deref())
        .context("failed to load class configuration")?;
    info!(classes = catalog.len(), "class table loaded");

    let mut detector = YoloDetector::new(
        &config.model_path,
        config.input_size,
        config.input_size,
        config.model_path.display().to_string(),
    )
    .context("failed to load detection model")?;
    info!(model = detector.model_name(), "model loaded");

    let normalizer: Box<dyn BackgroundNormalizer> = if config.remove_background {
        Box::new(WhiteBackgroundCompositor::default())
    } else {
        Box::new(PassthroughNormalizer)
    };
    let pipeline = DetectionPipeline::new(
        BoxRenderer {
            thickness: config.box_thickness,
        },
        config.box_merger()?,
    );
    let scanner = BodyScanner::new(normalizer, pipeline, config.detector_thresholds()?);

    let views = view_paths.read()?;
    let outcomes = scanner.scan(&views, &mut detector, catalog.colors())?;

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("failed to create {:?}", config.output_dir))?;
    for outcome in &outcomes {
        let path = config.output_dir.join(annotated_file_name(outcome.view));
        save_rgb8_as_png(&outcome.annotated, &path)
            .with_context(|| format!("failed to save {:?}", path))?;
        info!(view = %outcome.view, path = %path.display(), "annotated image saved");
    }

    let url_prefix = config
        .output_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "static".to_string());
    let report = ScanReport::build(&outcomes, &catalog, |view| {
        format!("/{}/{}", url_prefix, annotated_file_name(view))
    })?;
    println!("{}", report.to_json_pretty()?);
    Ok(())
}
