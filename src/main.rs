use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use maskslice::{
    ConfigOverrides, ContourDetector, ContrastSegmenter, Pipeline, SliceConfig, codec, handle_request,
};

#[derive(Parser)]
#[command(name = "maskslice")]
#[command(about = "Cut detected objects out of images onto uniform canvases")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Settings {
    /// JSON configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR", global = true)]
    debug_out: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Minimum detection confidence
    #[arg(long, global = true)]
    box_threshold: Option<f32>,

    /// Minimum label-match score
    #[arg(long, global = true)]
    text_threshold: Option<f32>,

    /// Object label to detect (repeatable)
    #[arg(long = "class", value_name = "LABEL", global = true)]
    classes: Vec<String>,

    /// Square output canvas size in pixels
    #[arg(long, value_name = "N", global = true)]
    target_size: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Process a batch request: {"images": [<base64>, ...]}
    Batch {
        /// Request JSON file (stdin if omitted)
        #[arg(value_name = "REQUEST")]
        request: Option<PathBuf>,

        /// Response JSON file (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Slice a single image file into per-object PNGs
    Slice {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Directory for the extracted objects
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,
    },
}

impl Settings {
    fn load_config(&self) -> anyhow::Result<SliceConfig> {
        let config = match &self.config {
            Some(path) => SliceConfig::from_file(path)?,
            None => SliceConfig::default(),
        };
        let overrides = ConfigOverrides {
            box_threshold: self.box_threshold,
            text_threshold: self.text_threshold,
            classes: self.classes.clone(),
            target_size: self.target_size,
            log_file: self.log_file.clone(),
        };
        Ok(config.apply_overrides(&overrides)?)
    }
}

fn build_pipeline(config: SliceConfig, debug_out: Option<PathBuf>) -> anyhow::Result<Pipeline> {
    info!("Loading detection and segmentation backends (device: {:?})", config.device);
    let detector = ContourDetector::new(config.device);
    let segmenter = ContrastSegmenter::new(config.device);

    let mut pipeline = Pipeline::new(Box::new(detector), Box::new(segmenter)).with_config(config)?;
    if let Some(dir) = debug_out {
        pipeline = pipeline.with_debug(dir)?;
    }
    info!("Backends loaded");
    Ok(pipeline)
}

fn read_request(path: Option<&Path>) -> anyhow::Result<serde_json::Value> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    serde_json::from_str(&text).context("Request is not valid JSON")
}

fn run_batch(mut pipeline: Pipeline, request: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let request = read_request(request.as_deref())?;
    let response = handle_request(&mut pipeline, &request);
    let body = serde_json::to_string_pretty(&response)?;

    match output {
        Some(path) => std::fs::write(&path, body)
            .with_context(|| format!("Failed to write response {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(body.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn run_slice(mut pipeline: Pipeline, image_path: PathBuf, out_dir: PathBuf) -> anyhow::Result<()> {
    let bytes = std::fs::read(&image_path)
        .with_context(|| format!("Failed to read image {}", image_path.display()))?;
    let image = codec::decode_image(&bytes)?;
    info!("Image loaded: {}x{}", image.width(), image.height());

    let objects = pipeline.extract_objects(&image)?;
    std::fs::create_dir_all(&out_dir)?;

    for object in &objects {
        let png = codec::encode_png(&object.image)?;
        pipeline.save_debug(0, object, &codec::encode_base64(&png));

        let path = out_dir.join(format!("slice_{:02}.png", object.index));
        std::fs::write(&path, png).with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "  {} ({:.0}, {:.0})-({:.0}, {:.0}) confidence {:.2}",
            path.display(),
            object.detection.bbox.x_min,
            object.detection.bbox.y_min,
            object.detection.bbox.x_max,
            object.detection.bbox.y_max,
            object.detection.confidence
        );
    }
    println!("Total objects extracted: {}", objects.len());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = args.settings.load_config()?;
    maskslice::logging::init(&config.log_level, args.settings.verbose, config.log_file.as_deref())?;

    let pipeline = build_pipeline(config, args.settings.debug_out.clone()).inspect_err(|e| {
        error!("Model loading failed: {:#}", e);
    })?;

    match args.command {
        Command::Batch { request, output } => run_batch(pipeline, request, output),
        Command::Slice { image_path, out_dir } => run_slice(pipeline, image_path, out_dir),
    }
}
