//! helmet_watch - flag riders without a helmet in one image
//!
//! This tool:
//! 1. Loads the source image and keeps a copy as `img.png`
//! 2. Runs the configured detector backend
//! 3. Stores rider and plate crops for every rider without a helmet
//! 4. Writes the annotated overlay and `report.json`
//! 5. Prints the violation table

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use image::ImageFormat;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use helmet_watch::detect::SidecarBackend;
use helmet_watch::evidence::encode;
use helmet_watch::store::{REPORT_NAME, SOURCE_IMAGE_NAME};
use helmet_watch::{
    load_source, recognizer_from_settings, ArtifactKind, BackendRegistry, DetectorBackend,
    FilesystemImageStore, HelmetWatchConfig, ImageStore, Pipeline, ViolationReport,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Image to inspect.
    image: PathBuf,
    /// Detections sidecar JSON (sidecar backend). Defaults to the image path with a `.json` extension.
    #[arg(long, value_name = "PATH")]
    detections: Option<PathBuf>,
    /// Output directory for evidence artifacts.
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
    /// Detector backend (sidecar|tract).
    #[arg(long)]
    backend: Option<String>,
    /// ONNX model path (tract backend).
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,
    /// Print the report as JSON instead of a table.
    #[arg(long)]
    json: bool,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::new(
        ui::UiMode::parse(&args.ui),
        std::io::stderr().is_terminal(),
        std::io::stdout().is_terminal(),
    );

    let mut cfg = HelmetWatchConfig::load()?;
    if let Some(out) = &args.out {
        cfg.output_dir = out.clone();
    }
    if let Some(backend) = &args.backend {
        cfg.detector.backend = backend.clone();
    }
    if let Some(model) = &args.model {
        cfg.detector.model_path = model.clone();
    }
    cfg.validate()?;

    let image = {
        let mut stage = ui.stage("Load image");
        let image = load_source(&args.image)?;
        stage.note(format!("{}x{}", image.width(), image.height()));
        stage.finish();
        image
    };

    let mut store = FilesystemImageStore::new(&cfg.output_dir)?;
    let source_bytes = encode(&image, ImageFormat::Png, SOURCE_IMAGE_NAME)?;
    store.put(ArtifactKind::Source, SOURCE_IMAGE_NAME, &source_bytes)?;

    let mut registry = {
        let stage = ui.stage("Prepare detector");
        let registry = build_registry(&cfg, &args)?;
        stage.finish();
        registry
    };
    let recognizer = recognizer_from_settings(&cfg.recognizer)?;
    let pipeline = Pipeline::with_style(recognizer.as_ref(), cfg.overlay.clone());

    let output = {
        let mut stage = ui.stage("Run pipeline");
        let output = pipeline.run(&mut registry, &image, &mut store)?;
        stage.note(format!("{} violation(s)", output.report.len()));
        stage.finish();
        output
    };

    let json = output.report.to_json().context("failed to serialize report")?;
    store.put(ArtifactKind::Report, REPORT_NAME, json.as_bytes())?;
    log::info!("artifacts written to {}", store.root().display());

    if args.json {
        println!("{}", json);
    } else {
        print_table(&output.report);
    }
    Ok(())
}

fn build_registry(cfg: &HelmetWatchConfig, args: &Args) -> Result<BackendRegistry> {
    let detector = &cfg.detector;
    let mut registry = BackendRegistry::new();
    match detector.backend.as_str() {
        "sidecar" => {
            let path = args
                .detections
                .clone()
                .unwrap_or_else(|| default_sidecar_path(&args.image));
            registry.register(
                SidecarBackend::new(path)
                    .with_class_labels(detector.class_labels.clone())
                    .with_threshold(detector.confidence),
            );
        }
        #[cfg(feature = "backend-tract")]
        "tract" => {
            use helmet_watch::detect::TractBackend;
            let backend = TractBackend::new(&detector.model_path, detector.input_size)?
                .with_threshold(detector.confidence)
                .with_iou_threshold(detector.iou)
                .with_class_labels(detector.class_labels.clone());
            registry.register(backend);
        }
        #[cfg(not(feature = "backend-tract"))]
        "tract" => {
            return Err(anyhow!(
                "backend 'tract' requires building with --features backend-tract"
            ))
        }
        other => return Err(anyhow!("unknown detector backend '{}'", other)),
    }
    registry
        .set_default(&detector.backend)
        .with_context(|| format!("detector backend '{}'", detector.backend))?;
    registry.warm_up()?;
    Ok(registry)
}

fn default_sidecar_path(image: &Path) -> PathBuf {
    image.with_extension("json")
}

fn print_table(report: &ViolationReport) {
    if report.is_empty() {
        println!("No riders without a helmet.");
        return;
    }
    println!("{:<4} {:<28} {:<22} {}", "#", "RIDER", "PLATE", "PLATE TEXT");
    for (idx, record) in report.iter().enumerate() {
        println!(
            "{:<4} {:<28} {:<22} {}",
            idx, record.rider, record.plate, record.plate_text
        );
    }
}
