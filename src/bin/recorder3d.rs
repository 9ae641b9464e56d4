use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context};
use clap::Parser;
use kdam::{tqdm, BarExt};
use recorder3d::{
    dispatcher::{find_sensors, ConversionParams, Recording},
    io::{hand_eye::HandEyeStream, pv::PvMetadata},
    overlay::project_hand_eye_to_pv,
    range_image::DepthClamp,
    timestamp::FrameRate,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Converts an extracted head-mounted recording into colored point clouds and a
/// resampled RGB-D trajectory.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the recording folder, with the sensor frames already extracted
    #[arg(long)]
    recording_path: PathBuf,
    /// Saves the point clouds in the depth camera's frame
    #[arg(long, action)]
    cam_space: bool,
    /// Doesn't resample the frames into the virtual pinhole camera
    #[arg(long, action)]
    disable_project_pinhole: bool,
    /// Removes the points without color
    #[arg(long, action)]
    discard_no_rgb: bool,
    /// Minimum depth in meters, used with --clamp-max
    #[arg(long)]
    clamp_min: Option<f32>,
    /// Maximum depth in meters, used with --clamp-min
    #[arg(long)]
    clamp_max: Option<f32>,
    /// Only converts the depth images whose name ends with this suffix
    #[arg(long)]
    depth_path_suffix: Option<String>,
    /// Draws the hand joints and eye gaze over the color frames
    #[arg(long, action)]
    project_hand_eye: bool,
    /// Number of worker threads
    #[arg(long)]
    threads: Option<usize>,
    /// JSON file with the conversion parameters, flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn conversion_params(&self) -> anyhow::Result<ConversionParams> {
        let mut params = match &self.config {
            Some(path) => ConversionParams::from_json_file(path)
                .with_context(|| format!("Can't load config {}", path.display()))?,
            None => ConversionParams::default(),
        };

        if self.cam_space {
            params.save_in_cam_space = true;
        }
        if self.disable_project_pinhole {
            params.project_pinhole = false;
        }
        if self.discard_no_rgb {
            params.discard_no_rgb = true;
        }
        match (self.clamp_min, self.clamp_max) {
            (Some(min), Some(max)) => params.clamp = Some(DepthClamp::new(min, max)),
            (None, None) => (),
            _ => warn!("--clamp-min and --clamp-max must be given together, ignoring clamp"),
        }
        if let Some(suffix) = &self.depth_path_suffix {
            params.depth_path_suffix = suffix.clone();
        }
        if self.threads.is_some() {
            params.num_threads = self.threads;
        }
        Ok(params)
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_env("RECORDER3D_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn report_frame_rate(stream: &str, timestamps: &[u64]) {
    match FrameRate::from_timestamps(timestamps) {
        Some(rate) => info!("{stream}: {rate}"),
        None => info!("{stream}: not enough frames to estimate the frame rate"),
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    let params = args.conversion_params()?;
    let folder = &args.recording_path;

    let sensors = find_sensors(folder);
    if sensors.is_empty() {
        bail!("No extracted depth sensor in {}", folder.display());
    }

    for sensor in sensors {
        let recording = Recording::open(folder, sensor, &params)
            .with_context(|| format!("Can't open the {sensor} stream"))?;
        let progress = Mutex::new(tqdm!(total = recording.len(), desc = sensor.to_string()));
        let summary = recording.convert(&params, || {
            if let Ok(mut bar) = progress.lock() {
                if let Err(err) = bar.update(1) {
                    warn!("Can't update the progress bar: {err}");
                }
            }
        })?;
        eprintln!();
        if summary.failed > 0 {
            warn!("{sensor}: {} frames failed", summary.failed);
        }
        report_frame_rate(sensor, &recording.depth_timestamps());
    }

    if let Some(metadata) = PvMetadata::from_recording(folder)? {
        report_frame_rate("PV", &metadata.timestamps());
    }
    if let Some(stream_path) = HandEyeStream::find_in_recording(folder)? {
        report_frame_rate("Hand/eye", &HandEyeStream::load(stream_path)?.timestamps());
    }

    if args.project_hand_eye {
        let written = project_hand_eye_to_pv(folder).context("Can't project hands and gaze")?;
        info!("Wrote {written} hand/eye overlays");
    }

    Ok(())
}
