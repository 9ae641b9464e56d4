use nalgebra::Vector3;

use super::transform::Transform;

/// Camera intrinsic parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length and pixel scale in the X-axis.
    pub fx: f64,
    /// Focal length and pixel scale in the Y-axis.
    pub fy: f64,
    /// Camera X-center.
    pub cx: f64,
    /// Camera Y-center.
    pub cy: f64,
    pub width: usize,
    pub height: usize,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: usize, height: usize) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }

    /// Project a 3D point into image space.
    ///
    /// # Arguments
    ///
    /// * point: The 3D point, in the camera's own frame.
    ///
    /// # Returns
    ///
    /// * (x and y) coordinates.
    pub fn project(&self, point: &Vector3<f32>) -> (f32, f32) {
        (
            point[0] * self.fx as f32 / point[2] + self.cx as f32,
            point[1] * self.fy as f32 / point[2] + self.cy as f32,
        )
    }

    /// Rounds image coordinates to the nearest pixel (ties to even) and returns
    /// `(col, row)` if it falls inside `[0, width) x [0, height)`.
    pub fn to_pixel(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let (x, y) = (x.round_ties_even(), y.round_ties_even());
        if x.is_finite()
            && y.is_finite()
            && x >= 0.0
            && y >= 0.0
            && x < self.width as f32
            && y < self.height as f32
        {
            Some((x as usize, y as usize))
        } else {
            None
        }
    }

    /// The parameters `[fx, fy, cx, cy]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.fx, self.fy, self.cx, self.cy]
    }
}

/// A calibrated camera with a known pose.
#[derive(Clone, Debug)]
pub struct PinholeCamera {
    pub intrinsics: CameraIntrinsics,
    pub camera_to_world: Transform,
    world_to_camera: Transform,
    /// Reflects the x image coordinate (`x' = width - x`). The head-mounted color camera
    /// reports its pose with the opposite handedness of its image.
    pub mirror_x: bool,
}

impl PinholeCamera {
    /// Creates the camera, returns `None` if `camera_to_world` isn't invertible.
    pub fn new(intrinsics: CameraIntrinsics, camera_to_world: Transform) -> Option<Self> {
        Some(Self {
            intrinsics,
            world_to_camera: camera_to_world.try_inverse()?,
            camera_to_world,
            mirror_x: false,
        })
    }

    pub fn with_mirror_x(mut self, mirror_x: bool) -> Self {
        self.mirror_x = mirror_x;
        self
    }

    pub fn world_to_camera(&self) -> &Transform {
        &self.world_to_camera
    }

    /// Project a 3D world point into image space.
    ///
    /// # Returns
    ///
    /// * (x and y) coordinates, mirrored if the camera is set to.
    pub fn project(&self, point: &Vector3<f32>) -> (f32, f32) {
        self.project_camera_point(&self.world_to_camera.transform_point(point))
    }

    /// Same as [`Self::project`], but for a point already in the camera's frame.
    pub fn project_camera_point(&self, point: &Vector3<f32>) -> (f32, f32) {
        let (x, y) = self.intrinsics.project(point);
        if self.mirror_x {
            (self.intrinsics.width as f32 - x, y)
        } else {
            (x, y)
        }
    }
}
