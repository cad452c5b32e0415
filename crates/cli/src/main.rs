use std::path::PathBuf;
use std::process;

use clap::Parser;

use haunted_mirror_core::archive::domain::snapshot_archive::SnapshotArchive;
use haunted_mirror_core::archive::infrastructure::image_file_writer::ImageFileWriter;
use haunted_mirror_core::capture::domain::frame_source::DeviceId;
use haunted_mirror_core::capture::infrastructure::nokhwa_source::NokhwaFrameSource;
use haunted_mirror_core::detection::domain::presence_detector::PresenceDetector;
use haunted_mirror_core::detection::infrastructure::rustface_detector::RustfaceDetector;
use haunted_mirror_core::display::infrastructure::window_surface::WindowSurface;
use haunted_mirror_core::lighting::infrastructure::lighting_factory::create_lighting;
use haunted_mirror_core::mirror::mirror_config::MirrorConfig;
use haunted_mirror_core::mirror::mirror_loop::MirrorLoop;
use haunted_mirror_core::mirror::session_logger::LogSessionLogger;
use haunted_mirror_core::shared::constants::{SEETA_MODEL_NAME, SEETA_MODEL_URL};
use haunted_mirror_core::shared::model_resolver;
use haunted_mirror_core::transform::domain::image_transformer::ResizeMode;
use haunted_mirror_core::transform::infrastructure::img2img_client::Img2ImgClient;

const PREVIEW_TITLE: &str = "Haunted Mirror - camera";
const OUTPUT_TITLE: &str = "Haunted Mirror";
const PREVIEW_SIZE: (usize, usize) = (640, 480);
const LOG_THROTTLE_FRAMES: usize = 100;

/// Haunted mirror: watches for faces and shows them transformed.
///
/// Press q or Esc in either window to quit.
#[derive(Parser)]
#[command(name = "haunted-mirror")]
struct Cli {
    /// JSON config file (defaults to the platform config dir if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Camera index or device path.
    #[arg(long)]
    device: Option<DeviceId>,

    /// Root URL of the img2img backend.
    #[arg(long)]
    backend_url: Option<String>,

    /// Keep before/after images of every cycle in this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Serial port of the lighting accessory.
    #[arg(long)]
    lighting_port: Option<String>,

    #[arg(long)]
    lighting_baud: Option<u32>,

    /// Send frames as captured instead of mirror-flipped.
    #[arg(long)]
    no_flip: bool,

    /// Normalized crop edges (0.0-1.0).
    #[arg(long)]
    crop_left: Option<f64>,
    #[arg(long)]
    crop_right: Option<f64>,
    #[arg(long)]
    crop_top: Option<f64>,
    #[arg(long)]
    crop_bottom: Option<f64>,

    #[arg(long)]
    prompt: Option<String>,

    #[arg(long)]
    negative_prompt: Option<String>,

    /// How far the result may drift from the camera image (0.0-1.0).
    #[arg(long)]
    denoising_strength: Option<f64>,

    #[arg(long)]
    steps: Option<u32>,

    /// stretch, crop, pad or latent-upscale.
    #[arg(long)]
    resize_mode: Option<ResizeMode>,

    /// Backend timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// How long each result is shown, in milliseconds.
    #[arg(long)]
    display_ms: Option<u64>,

    /// Pause between detection and capture, in milliseconds.
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Face model file (downloaded to the cache when omitted).
    #[arg(long)]
    model: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    config.validate()?;

    let detector = build_detector(&config)?;
    let transformer = Img2ImgClient::new(
        &config.backend_url,
        config.generation.clone(),
        config.timeout(),
    )?;
    log::info!("Image backend: {}", transformer.endpoint());

    let source = NokhwaFrameSource::open(&config.device)?;
    let preview = WindowSurface::open_preview(PREVIEW_TITLE, PREVIEW_SIZE.0, PREVIEW_SIZE.1)?;
    let output = WindowSurface::open_output(
        OUTPUT_TITLE,
        config.output_size.width as usize,
        config.output_size.height as usize,
    )?;
    let lighting = create_lighting(config.lighting_port.as_deref(), config.lighting_baud);

    let mut mirror = MirrorLoop::new(
        &config,
        Box::new(source),
        detector,
        Box::new(transformer),
        Box::new(preview),
        Box::new(output),
    )
    .with_lighting(lighting)
    .with_logger(Box::new(LogSessionLogger::new(LOG_THROTTLE_FRAMES)));

    if let Some(dir) = &config.output_dir {
        log::info!("Saving snapshots to {}", dir.display());
        mirror = mirror.with_archive(SnapshotArchive::new(
            dir.clone(),
            Box::new(ImageFileWriter::new()),
        ));
    }

    let report = mirror.run()?;
    log::info!(
        "Showed {} of {} cycles ({} failed transforms, {} unsaved snapshots)",
        report.successes,
        report.episodes,
        report.failed_transforms,
        report.persistence_failures
    );
    Ok(())
}

fn load_config(cli: &Cli) -> Result<MirrorConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => MirrorConfig::load(path)?,
        None => MirrorConfig::load_default()?,
    };
    apply_overrides(cli, &mut config);
    Ok(config)
}

fn apply_overrides(cli: &Cli, config: &mut MirrorConfig) {
    if let Some(device) = &cli.device {
        config.device = device.clone();
    }
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(port) = &cli.lighting_port {
        config.lighting_port = Some(port.clone());
    }
    if let Some(baud) = cli.lighting_baud {
        config.lighting_baud = baud;
    }
    if cli.no_flip {
        config.mirror_flip = false;
    }
    if let Some(v) = cli.crop_left {
        config.crop.left = v;
    }
    if let Some(v) = cli.crop_right {
        config.crop.right = v;
    }
    if let Some(v) = cli.crop_top {
        config.crop.top = v;
    }
    if let Some(v) = cli.crop_bottom {
        config.crop.bottom = v;
    }
    if let Some(prompt) = &cli.prompt {
        config.generation.prompt = prompt.clone();
    }
    if let Some(negative) = &cli.negative_prompt {
        config.generation.negative_prompt = negative.clone();
    }
    if let Some(v) = cli.denoising_strength {
        config.generation.denoising_strength = v;
    }
    if let Some(v) = cli.steps {
        config.generation.steps = v;
    }
    if let Some(mode) = cli.resize_mode {
        config.generation.resize_mode = mode;
    }
    if let Some(v) = cli.timeout_ms {
        config.timeout_ms = v;
    }
    if let Some(v) = cli.display_ms {
        config.display_ms = v;
    }
    if let Some(v) = cli.settle_ms {
        config.settle_ms = v;
    }
    if let Some(path) = &cli.model {
        config.classifier_model = Some(path.clone());
    }
}

fn build_detector(
    config: &MirrorConfig,
) -> Result<Box<dyn PresenceDetector>, Box<dyn std::error::Error>> {
    let model_path = match &config.classifier_model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {SEETA_MODEL_NAME}");
            let path = model_resolver::resolve(
                SEETA_MODEL_NAME,
                SEETA_MODEL_URL,
                None,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };
    Ok(Box::new(RustfaceDetector::from_model_file(
        &model_path,
        config.classifier,
    )?))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
