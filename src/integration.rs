use std::path::{Path, PathBuf};

use tracing::info;

use crate::camera::CameraIntrinsics;
use crate::error::{Error, Result};
use crate::image::{load_depth, load_rgb, RgbdFrame, RgbdImage};
use crate::io::trajectory_log::{
    read_file_list, read_intrinsics, read_odometry_log, CALIBRATION_FILE, DEPTH_LIST_FILE,
    ODOMETRY_FILE, RGB_LIST_FILE,
};
use crate::pinhole::DEPTH_SCALING_FACTOR;
use crate::transform::Transform;

/// Fuses posed RGB-D frames into a volume.
pub trait VolumeIntegrator {
    fn integrate(&mut self, frame: &RgbdFrame, camera_to_world: &Transform) -> Result<()>;
}

struct PinholeEntry {
    frame_id: u64,
    depth_path: String,
    rgb_path: String,
    camera_to_world: Transform,
}

/// The resampled frames of a recording, read back from its pinhole projection folder.
pub struct PinholeDataset {
    base_dir: PathBuf,
    intrinsics: [f64; 4],
    entries: Vec<PinholeEntry>,
}

impl PinholeDataset {
    pub fn load<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let intrinsics = read_intrinsics(base_dir.join(CALIBRATION_FILE))?;
        let depth_list = read_file_list(base_dir.join(DEPTH_LIST_FILE))?;
        let rgb_list = read_file_list(base_dir.join(RGB_LIST_FILE))?;
        let poses = read_odometry_log(base_dir.join(ODOMETRY_FILE))?;

        if depth_list.len() != rgb_list.len() || depth_list.len() != poses.len() {
            return Err(Error::format(format!(
                "{}: {} depth images, {} rgb images and {} poses",
                base_dir.display(),
                depth_list.len(),
                rgb_list.len(),
                poses.len()
            )));
        }

        let entries = depth_list
            .into_iter()
            .zip(rgb_list)
            .zip(poses)
            .map(|(((frame_id, depth_path), (rgb_id, rgb_path)), camera_to_world)| {
                if frame_id != rgb_id {
                    return Err(Error::format(format!(
                        "Depth frame {frame_id} is listed with rgb frame {rgb_id}"
                    )));
                }
                Ok(PinholeEntry {
                    frame_id,
                    depth_path,
                    rgb_path,
                    camera_to_world,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            base_dir,
            intrinsics,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn frame_ids(&self) -> Vec<u64> {
        self.entries.iter().map(|entry| entry.frame_id).collect()
    }

    /// Loads the frame at `index` and its camera to world pose.
    pub fn get(&self, index: usize) -> Result<(RgbdFrame, Transform)> {
        let entry = self.entries.get(index).ok_or_else(|| {
            Error::invalid_parameter(format!(
                "Frame index {index} out of range, dataset has {} frames",
                self.entries.len()
            ))
        })?;

        let depth = load_depth(self.base_dir.join(&entry.depth_path))?;
        let color = load_rgb(self.base_dir.join(&entry.rgb_path))?;
        let (height, width) = depth.dim();
        let [fx, fy, cx, cy] = self.intrinsics;
        let intrinsics = CameraIntrinsics::new(fx, fy, cx, cy, width, height);

        let image = RgbdImage::with_depth_scale(color, depth, 1.0 / DEPTH_SCALING_FACTOR as f64);
        Ok((
            RgbdFrame::new(entry.frame_id, intrinsics, image),
            entry.camera_to_world.clone(),
        ))
    }
}

/// Feeds every frame of the dataset to the integrator, in frame id order.
pub fn integrate_all<I: VolumeIntegrator>(dataset: &PinholeDataset, integrator: &mut I) -> Result<()> {
    for index in 0..dataset.len() {
        let (frame, camera_to_world) = dataset.get(index)?;
        integrator.integrate(&frame, &camera_to_world)?;
    }
    info!("Integrated {} frames", dataset.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::trajectory_log::{write_intrinsics, write_trajectory_outputs};
    use crate::pinhole::{projection_paths, VirtualPinhole};
    use crate::trajectory::{Trajectory, TrajectoryRecord};
    use nalgebra::{UnitQuaternion, Vector3};
    use ndarray::Array1;

    #[derive(Default)]
    struct RecordingIntegrator {
        frame_ids: Vec<u64>,
        centers: Vec<Vector3<f64>>,
    }

    impl VolumeIntegrator for RecordingIntegrator {
        fn integrate(&mut self, frame: &RgbdFrame, camera_to_world: &Transform) -> Result<()> {
            self.frame_ids.push(frame.frame_id);
            self.centers.push(camera_to_world.camera_center());
            Ok(())
        }
    }

    fn write_pinhole_folder(dir: &Path, frame_ids: &[u64]) {
        std::fs::create_dir(dir.join("depth")).unwrap();
        std::fs::create_dir(dir.join("rgb")).unwrap();
        let pinhole = VirtualPinhole {
            width: 4,
            height: 2,
            focal_length: 2.0,
        };
        write_intrinsics(dir, &pinhole.intrinsics_record()).unwrap();

        let trajectory: Trajectory = frame_ids
            .iter()
            .map(|frame_id| {
                let image = pinhole.resample(
                    &Array1::from_elem(1, Vector3::new(0.0, 0.0, 0.5)),
                    &Array1::from_elem(1, Vector3::new(1.0, 0.0, 0.0)),
                );
                let (depth_path, rgb_path) = projection_paths(*frame_id, "");
                image
                    .save(dir.join(&depth_path), dir.join(&rgb_path))
                    .unwrap();
                let extrinsic = Transform::from_parts(
                    &Vector3::new(*frame_id as f64, 0.0, 0.0),
                    &UnitQuaternion::identity(),
                );
                TrajectoryRecord {
                    frame_id: *frame_id,
                    depth_path,
                    rgb_path,
                    camera_center: extrinsic.camera_center(),
                    extrinsic,
                }
            })
            .collect();
        write_trajectory_outputs(dir, &trajectory).unwrap();
    }

    #[test]
    fn should_read_back_resampled_frames() {
        let dir = tempfile::tempdir().unwrap();
        write_pinhole_folder(dir.path(), &[30, 10]);

        let dataset = PinholeDataset::load(dir.path()).unwrap();
        assert_eq!(dataset.frame_ids(), vec![10, 30]);

        let (frame, camera_to_world) = dataset.get(0).unwrap();
        assert_eq!(frame.frame_id, 10);
        assert_eq!(frame.intrinsics.to_array(), [2.0, 2.0, 2.0, 1.0]);
        assert_eq!((frame.image.width(), frame.image.height()), (4, 2));
        approx::assert_abs_diff_eq!(frame.image.depth_meters(1, 2).unwrap(), 0.5, epsilon = 1e-9);
        assert_eq!(frame.image.depth_meters(0, 0), None);
        assert_eq!(frame.image.color[(1, 2, 0)], 255);
        assert_eq!(camera_to_world.camera_center(), Vector3::new(10.0, 0.0, 0.0));

        assert!(matches!(dataset.get(2), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn should_drive_integrator_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_pinhole_folder(dir.path(), &[20, 5, 7]);

        let dataset = PinholeDataset::load(dir.path()).unwrap();
        let mut integrator = RecordingIntegrator::default();
        integrate_all(&dataset, &mut integrator).unwrap();
        assert_eq!(integrator.frame_ids, vec![5, 7, 20]);
        assert_eq!(integrator.centers[2], Vector3::new(20.0, 0.0, 0.0));
    }

    #[test]
    fn should_reject_mismatched_lists() {
        let dir = tempfile::tempdir().unwrap();
        write_pinhole_folder(dir.path(), &[1, 2]);
        std::fs::write(dir.path().join(RGB_LIST_FILE), "1 rgb/1_proj.png\n").unwrap();
        assert!(matches!(
            PinholeDataset::load(dir.path()),
            Err(Error::Format(_))
        ));
    }
}
