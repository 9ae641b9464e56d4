use std::path::Path;

use nalgebra::Vector3;
use ndarray::{Array1, Array2, Array3};
use serde_derive::{Deserialize, Serialize};

use crate::camera::CameraIntrinsics;
use crate::error::Result;
use crate::image::{save_depth, save_rgb};
use crate::pointcloud::color_to_u8;

/// Depth units per meter of the resampled depth images.
pub const DEPTH_SCALING_FACTOR: f32 = 5000.0;

/// Name of the resampled output folder inside a recording.
pub const PINHOLE_FOLDER: &str = "pinhole_projection";

/// A synthetic camera with fixed intrinsics and the principal point at the image center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualPinhole {
    pub width: usize,
    pub height: usize,
    pub focal_length: f64,
}

impl Default for VirtualPinhole {
    fn default() -> Self {
        Self {
            width: 320,
            height: 288,
            focal_length: 200.0,
        }
    }
}

/// Resampled color and depth images of one frame.
#[derive(Clone, Debug)]
pub struct PinholeImage {
    /// RGB image, shape `[height, width, 3]`.
    pub color: Array3<u8>,
    /// Depth in [`DEPTH_SCALING_FACTOR`] units per meter, shape `[height, width]`.
    pub depth: Array2<u16>,
}

impl VirtualPinhole {
    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics::new(
            self.focal_length,
            self.focal_length,
            self.width as f64 / 2.0,
            self.height as f64 / 2.0,
            self.width,
            self.height,
        )
    }

    /// The `[fx, fy, cx, cy]` record saved once per recording.
    pub fn intrinsics_record(&self) -> [f64; 4] {
        self.intrinsics().to_array()
    }

    /// Rasterizes colored points into the camera.
    ///
    /// # Arguments
    ///
    /// * `points` - Points in the camera's own frame.
    /// * `colors` - RGB colors in `[0, 1]`, one per point.
    ///
    /// # Returns
    ///
    /// * Dense images, pixels that no point hits are zero. The last point written to a pixel wins.
    pub fn resample(
        &self,
        points: &Array1<Vector3<f32>>,
        colors: &Array1<Vector3<f32>>,
    ) -> PinholeImage {
        let intrinsics = self.intrinsics();
        let mut color = Array3::<u8>::zeros((self.height, self.width, 3));
        let mut depth = Array2::<u16>::zeros((self.height, self.width));

        for (point, rgb) in points.iter().zip(colors.iter()) {
            let (x, y) = intrinsics.project(point);
            if let Some((col, row)) = intrinsics.to_pixel(x, y) {
                depth[(row, col)] = (point[2] * DEPTH_SCALING_FACTOR) as u16;
                for channel in 0..3 {
                    color[(row, col, channel)] = color_to_u8(rgb[channel]);
                }
            }
        }

        PinholeImage { color, depth }
    }
}

/// Relative paths `(depth, rgb)` of the resampled images of a depth frame.
pub fn projection_paths(frame_id: u64, suffix: &str) -> (String, String) {
    (
        format!("depth/{frame_id}{suffix}_proj.png"),
        format!("rgb/{frame_id}{suffix}_proj.png"),
    )
}

impl PinholeImage {
    /// Saves both images as PNG.
    pub fn save<P: AsRef<Path>, Q: AsRef<Path>>(&self, depth_path: P, rgb_path: Q) -> Result<()> {
        save_depth(depth_path, &self.depth)?;
        save_rgb(rgb_path, &self.color)?;
        Ok(())
    }
}
