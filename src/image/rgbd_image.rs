use ndarray::{Array2, Array3};

use crate::camera::CameraIntrinsics;

/// A convenience struct that holds a color image, a depth image and its depth scale.
#[derive(Clone, Debug)]
pub struct RgbdImage {
    pub color: Array3<u8>,
    pub depth: Array2<u16>,
    /// Meters per depth unit.
    pub depth_scale: f64,
}

impl RgbdImage {
    pub fn with_depth_scale(color: Array3<u8>, depth: Array2<u16>, depth_scale: f64) -> Self {
        Self {
            color,
            depth,
            depth_scale,
        }
    }

    pub fn width(&self) -> usize {
        self.depth.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.depth.shape()[0]
    }

    /// Depth in meters at `(row, col)`, `None` for empty pixels.
    pub fn depth_meters(&self, row: usize, col: usize) -> Option<f64> {
        let value = *self.depth.get((row, col))?;
        (value > 0).then(|| value as f64 * self.depth_scale)
    }
}

/// One frame of an RGB-D stream.
#[derive(Clone, Debug)]
pub struct RgbdFrame {
    pub frame_id: u64,
    pub intrinsics: CameraIntrinsics,
    pub image: RgbdImage,
}

impl RgbdFrame {
    pub fn new(frame_id: u64, intrinsics: CameraIntrinsics, image: RgbdImage) -> Self {
        Self {
            frame_id,
            intrinsics,
            image,
        }
    }
}
