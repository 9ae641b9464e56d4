use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::calibration::Calibration;
use crate::colorize::{colorize, discard_no_rgb, ColorFrame};
use crate::error::{Error, Result, SkipReason};
use crate::image::load_depth;
use crate::io::pose_stream::PoseStream;
use crate::io::pv::PvMetadata;
use crate::io::trajectory_log::{write_intrinsics, write_trajectory_outputs};
use crate::io::{glob_sorted, parse_timestamp, write_ply, Geometry};
use crate::pinhole::{projection_paths, VirtualPinhole, PINHOLE_FOLDER};
use crate::pointcloud::PointCloud;
use crate::range_image::{DepthClamp, RangeImage};
use crate::registration::{cam2world, orient_normals_towards_camera};
use crate::timestamp::match_timestamp;
use crate::trajectory::{Trajectory, TrajectoryRecord};

/// Depth sensors a recording may have, each one in its own folder.
pub const SENSOR_NAMES: [&str; 2] = ["Depth Long Throw", "Depth AHaT"];

/// Lists the depth sensors whose frames were extracted into the recording.
pub fn find_sensors<P: AsRef<Path>>(folder: P) -> Vec<&'static str> {
    SENSOR_NAMES
        .into_iter()
        .filter(|sensor| folder.as_ref().join(sensor).is_dir())
        .collect()
}

/// Options of a recording conversion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionParams {
    /// Writes the point clouds in the depth camera's frame, without colors or poses.
    pub save_in_cam_space: bool,
    /// Removes the points that the color camera doesn't see.
    pub discard_no_rgb: bool,
    pub clamp: Option<DepthClamp>,
    /// Suffix of the depth image names to convert, e.g. `_masked`.
    pub depth_path_suffix: String,
    /// Resamples the colored frames into the virtual pinhole camera.
    pub project_pinhole: bool,
    pub pinhole: VirtualPinhole,
    /// Worker threads, defaults to the available parallelism.
    pub num_threads: Option<usize>,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            save_in_cam_space: false,
            discard_no_rgb: false,
            clamp: None,
            depth_path_suffix: String::new(),
            project_pinhole: true,
            pinhole: VirtualPinhole::default(),
            num_threads: None,
        }
    }
}

impl ConversionParams {
    /// Loads the parameters from a JSON file. Missing fields take their default value.
    pub fn from_json_file<P: AsRef<Path>>(filepath: P) -> Result<Self> {
        let file = std::fs::File::open(filepath)?;
        let buffer = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(buffer)?)
    }

    pub fn save_in_cam_space(mut self, value: bool) -> Self {
        self.save_in_cam_space = value;
        self
    }

    pub fn discard_no_rgb(mut self, value: bool) -> Self {
        self.discard_no_rgb = value;
        self
    }

    pub fn clamp(mut self, clamp: Option<DepthClamp>) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn depth_path_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.depth_path_suffix = suffix.into();
        self
    }

    pub fn project_pinhole(mut self, value: bool) -> Self {
        self.project_pinhole = value;
        self
    }

    pub fn pinhole(mut self, pinhole: VirtualPinhole) -> Self {
        self.pinhole = pinhole;
        self
    }

    pub fn num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }
}

/// A depth image file of a sensor.
#[derive(Clone, Debug)]
pub struct DepthFrameFile {
    /// The frame's timestamp, taken from the file name.
    pub frame_id: u64,
    pub path: PathBuf,
}

/// Result of the pipeline for one depth frame.
#[derive(Clone, Debug)]
pub enum FrameOutcome {
    /// The point cloud was written. The record is there if the frame was resampled.
    Processed(Option<TrajectoryRecord>),
    Skipped(SkipReason),
}

/// Counts of a conversion and the trajectory of the resampled frames.
#[derive(Clone, Debug, Default)]
pub struct ConversionSummary {
    pub processed: usize,
    pub skipped_no_pose: usize,
    pub skipped_singular: usize,
    pub skipped_no_color: usize,
    /// Frames that failed with an error.
    pub failed: usize,
    pub trajectory: Trajectory,
}

impl ConversionSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_no_pose + self.skipped_singular + self.skipped_no_color
    }

    fn add(&mut self, outcome: FrameOutcome) {
        match outcome {
            FrameOutcome::Processed(record) => {
                self.processed += 1;
                if let Some(record) = record {
                    self.trajectory.insert(record);
                }
            }
            FrameOutcome::Skipped(SkipReason::NoPose) => self.skipped_no_pose += 1,
            FrameOutcome::Skipped(SkipReason::SingularTransform) => self.skipped_singular += 1,
            FrameOutcome::Skipped(SkipReason::NoColorFrame) => self.skipped_no_color += 1,
        }
    }
}

impl std::fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} processed, {} without pose, {} with singular transform, {} without color frame, {} failed",
            self.processed,
            self.skipped_no_pose,
            self.skipped_singular,
            self.skipped_no_color,
            self.failed
        )
    }
}

/// The inputs of one depth sensor of a recording, loaded before any frame is processed.
pub struct Recording {
    folder: PathBuf,
    sensor_name: String,
    calibration: Calibration,
    poses: Option<PoseStream>,
    pv: Option<PvMetadata>,
    depth_frames: Vec<DepthFrameFile>,
}

impl Recording {
    /// Loads the calibration, the poses, the color metadata and the depth file list of a sensor.
    ///
    /// # Arguments
    ///
    /// * `folder` - The recording folder, with the sensor's frames already extracted.
    /// * `sensor_name` - One of [`SENSOR_NAMES`].
    /// * `params` - Conversion options, they select which inputs are needed.
    pub fn open<P: AsRef<Path>>(
        folder: P,
        sensor_name: &str,
        params: &ConversionParams,
    ) -> Result<Self> {
        let folder = folder.as_ref().to_path_buf();
        let calibration = Calibration::from_recording(&folder, sensor_name)?;
        let poses = if params.save_in_cam_space {
            None
        } else {
            PoseStream::from_recording(&folder, sensor_name)?
        };
        if poses.is_none() && !params.save_in_cam_space {
            warn!("{sensor_name}: no rig to world poses, all frames will be skipped");
        }
        let pv = PvMetadata::from_recording(&folder)?;

        let suffix = &params.depth_path_suffix;
        let depth_frames = glob_sorted(
            folder.join(sensor_name),
            &format!("*[0-9]{}.pgm", glob::Pattern::escape(suffix)),
        )?
        .into_iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default();
            let frame_id = parse_timestamp(stem.strip_suffix(suffix.as_str()).unwrap_or(&stem))?;
            Ok(DepthFrameFile { frame_id, path })
        })
        .collect::<Result<Vec<_>>>()?;

        if depth_frames.is_empty() {
            return Err(Error::configuration(format!(
                "No depth images in {}",
                folder.join(sensor_name).display()
            )));
        }

        Ok(Self {
            folder,
            sensor_name: sensor_name.to_string(),
            calibration,
            poses,
            pv,
            depth_frames,
        })
    }

    pub fn sensor_name(&self) -> &str {
        &self.sensor_name
    }

    pub fn len(&self) -> usize {
        self.depth_frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth_frames.is_empty()
    }

    pub fn has_pv(&self) -> bool {
        self.pv.is_some()
    }

    pub fn depth_timestamps(&self) -> Vec<u64> {
        self.depth_frames.iter().map(|frame| frame.frame_id).collect()
    }

    pub fn pv_timestamps(&self) -> Vec<u64> {
        self.pv
            .as_ref()
            .map(PvMetadata::timestamps)
            .unwrap_or_default()
    }

    pub fn pinhole_folder(&self) -> PathBuf {
        self.folder.join(PINHOLE_FOLDER)
    }

    fn projects_pinhole(&self, params: &ConversionParams) -> bool {
        params.project_pinhole && !params.save_in_cam_space && self.has_pv()
    }

    /// Converts every depth frame. Frames run in parallel and don't depend on each other,
    /// a skipped or failed frame doesn't stop the others.
    ///
    /// # Arguments
    ///
    /// * `params` - Conversion options.
    /// * `progress` - Called once per finished frame, from the worker threads.
    ///
    /// # Returns
    ///
    /// * The counts of each outcome and the trajectory, ordered by frame id. The trajectory
    ///   files are written in the pinhole folder when the frames are resampled.
    pub fn convert<F>(&self, params: &ConversionParams, progress: F) -> Result<ConversionSummary>
    where
        F: Fn() + Sync,
    {
        let projects_pinhole = self.projects_pinhole(params);
        if projects_pinhole {
            let pinhole_folder = self.pinhole_folder();
            std::fs::create_dir_all(pinhole_folder.join("rgb"))?;
            std::fs::create_dir_all(pinhole_folder.join("depth"))?;
            write_intrinsics(&pinhole_folder, &params.pinhole.intrinsics_record())?;
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.num_threads.unwrap_or(0))
            .build()?;
        info!(
            "{}: converting {} frames with {} threads",
            self.sensor_name,
            self.depth_frames.len(),
            pool.current_num_threads()
        );

        let pv_timestamps = self.pv_timestamps();
        let outcomes: Vec<(u64, Result<FrameOutcome>)> = pool.install(|| {
            self.depth_frames
                .par_iter()
                .map(|frame| {
                    let outcome = self.process_frame(frame, params, &pv_timestamps);
                    progress();
                    (frame.frame_id, outcome)
                })
                .collect()
        });

        let mut summary = ConversionSummary::default();
        for (frame_id, outcome) in outcomes {
            match outcome {
                Ok(outcome) => summary.add(outcome),
                Err(err) => {
                    error!("Frame {frame_id} failed: {err}");
                    summary.failed += 1;
                }
            }
        }

        if projects_pinhole {
            write_trajectory_outputs(self.pinhole_folder(), &summary.trajectory)?;
        }
        info!("{}: {summary}", self.sensor_name);
        Ok(summary)
    }

    fn process_frame(
        &self,
        frame: &DepthFrameFile,
        params: &ConversionParams,
        pv_timestamps: &[u64],
    ) -> Result<FrameOutcome> {
        debug!("Processing {}", frame.path.display());
        let depth = load_depth(&frame.path)?;
        let mut range_image =
            RangeImage::from_depth(&depth, &self.calibration, params.clamp.as_ref())?;
        range_image.compute_normals();
        let cam_points = PointCloud::from(&range_image);

        if params.save_in_cam_space {
            write_ply(point_cloud_path(&frame.path, "_cam"), &Geometry::from(cam_points))?;
            return Ok(FrameOutcome::Processed(None));
        }

        let Some(rig_to_world) = self.poses.as_ref().and_then(|poses| poses.get(frame.frame_id))
        else {
            warn!("Transform not found for timestamp {}", frame.frame_id);
            return Ok(FrameOutcome::Skipped(SkipReason::NoPose));
        };
        let (mut world_points, cam_to_world) =
            match cam2world(&cam_points, &self.calibration.rig_to_cam, rig_to_world) {
                Ok(result) => result,
                Err(reason) => {
                    warn!("Frame {} skipped: {reason}", frame.frame_id);
                    return Ok(FrameOutcome::Skipped(reason));
                }
            };

        let mut record = None;
        if let Some(pv) = self.pv.as_ref() {
            let color_frame = match self.color_frame(frame.frame_id, pv, pv_timestamps)? {
                Some(color_frame) => color_frame,
                None => {
                    warn!("Frame {} skipped: no color frame", frame.frame_id);
                    return Ok(FrameOutcome::Skipped(SkipReason::NoColorFrame));
                }
            };
            let colorization = match colorize(&world_points.points, &color_frame) {
                Ok(colorization) => colorization,
                Err(reason) => {
                    warn!("Frame {} skipped: {reason}", frame.frame_id);
                    return Ok(FrameOutcome::Skipped(reason));
                }
            };
            debug!(
                "Frame {}: {} of {} points seen by color frame {}",
                frame.frame_id,
                colorization.visible,
                world_points.len(),
                color_frame.timestamp
            );

            if self.projects_pinhole(params) {
                let image = params
                    .pinhole
                    .resample(&cam_points.points, &colorization.colors);
                let (depth_path, rgb_path) =
                    projection_paths(frame.frame_id, &params.depth_path_suffix);
                let pinhole_folder = self.pinhole_folder();
                image.save(pinhole_folder.join(&depth_path), pinhole_folder.join(&rgb_path))?;
                record = Some(TrajectoryRecord {
                    frame_id: frame.frame_id,
                    depth_path,
                    rgb_path,
                    camera_center: cam_to_world.camera_center(),
                    extrinsic: cam_to_world.clone(),
                });
            }
            world_points.colors = Some(colorization.colors);
        }

        if params.discard_no_rgb {
            world_points = discard_no_rgb(&world_points);
        }
        orient_normals_towards_camera(&mut world_points, &cam_to_world);
        write_ply(point_cloud_path(&frame.path, ""), &Geometry::from(world_points))?;

        Ok(FrameOutcome::Processed(record))
    }

    /// The color frame closest in time to a depth frame, `None` if there's none or its
    /// image wasn't extracted.
    fn color_frame(
        &self,
        frame_id: u64,
        pv: &PvMetadata,
        pv_timestamps: &[u64],
    ) -> Result<Option<ColorFrame>> {
        let Some(index) = match_timestamp(frame_id, pv_timestamps) else {
            return Ok(None);
        };
        let rgb_path = self
            .folder
            .join("PV")
            .join(format!("{}.png", pv_timestamps[index]));
        if !rgb_path.exists() {
            return Ok(None);
        }
        ColorFrame::load(rgb_path, pv, index).map(Some)
    }
}

/// Point cloud path of a depth image: same folder and name, `.ply` extension.
fn point_cloud_path(depth_path: &Path, suffix: &str) -> PathBuf {
    let stem = depth_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    depth_path.with_file_name(format!("{stem}{suffix}.ply"))
}
