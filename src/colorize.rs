use std::path::Path;

use nalgebra::Vector3;
use ndarray::{Array1, Array2, Array3};

use crate::camera::{CameraIntrinsics, PinholeCamera};
use crate::error::{Result, SkipReason};
use crate::image::load_rgb;
use crate::io::pv::PvMetadata;
use crate::pointcloud::PointCloud;
use crate::transform::Transform;

/// Channel order of a color raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// A frame of the head-mounted color camera with its calibration and pose.
#[derive(Clone, Debug)]
pub struct ColorFrame {
    pub timestamp: u64,
    /// Color raster with shape `[height, width, 3]`.
    pub pixels: Array3<u8>,
    pub channel_order: ChannelOrder,
    /// Intrinsics of the frame, with the raster's width and height.
    pub intrinsics: CameraIntrinsics,
    pub pv_to_world: Transform,
}

impl ColorFrame {
    /// Loads the color image of the metadata frame at `index`.
    pub fn load<P: AsRef<Path>>(filepath: P, metadata: &PvMetadata, index: usize) -> Result<Self> {
        let pixels = load_rgb(filepath)?;
        let info = &metadata.frames[index];
        let (height, width, _) = pixels.dim();
        let intrinsics = CameraIntrinsics {
            width,
            height,
            ..metadata.intrinsics(index)
        };
        Ok(Self {
            timestamp: info.timestamp,
            pixels,
            channel_order: ChannelOrder::Rgb,
            intrinsics,
            pv_to_world: info.pv_to_world.clone(),
        })
    }

    pub fn width(&self) -> usize {
        self.pixels.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.pixels.shape()[0]
    }

    /// The color camera, `None` if its pose can't be inverted. Its image is mirrored
    /// in x with respect to its pose.
    pub fn camera(&self) -> Option<PinholeCamera> {
        PinholeCamera::new(self.intrinsics.clone(), self.pv_to_world.clone())
            .map(|camera| camera.with_mirror_x(true))
    }

    /// RGB color at a pixel, whatever the raster's channel order.
    pub fn rgb(&self, row: usize, col: usize) -> Vector3<u8> {
        let (c0, c1, c2) = (
            self.pixels[(row, col, 0)],
            self.pixels[(row, col, 1)],
            self.pixels[(row, col, 2)],
        );
        match self.channel_order {
            ChannelOrder::Rgb => Vector3::new(c0, c1, c2),
            ChannelOrder::Bgr => Vector3::new(c2, c1, c0),
        }
    }
}

/// Colors sampled for a set of world points.
#[derive(Clone, Debug)]
pub struct Colorization {
    /// One RGB color in `[0, 1]` per input point, zero for points out of view.
    pub colors: Array1<Vector3<f32>>,
    /// Sparse depth in the color camera's frame, `0` where no point landed.
    pub depth: Array2<f32>,
    /// Number of points inside the color image.
    pub visible: usize,
}

/// Colors world points by projecting them into a color frame.
///
/// Points are rounded to the nearest pixel. When several points fall on the same pixel, the
/// depth raster keeps the last one, not the closest.
pub fn colorize(
    points: &Array1<Vector3<f32>>,
    frame: &ColorFrame,
) -> std::result::Result<Colorization, SkipReason> {
    let camera = frame.camera().ok_or(SkipReason::SingularTransform)?;

    let mut colors = Array1::<Vector3<f32>>::zeros(points.len());
    let mut depth = Array2::<f32>::zeros((frame.height(), frame.width()));
    let mut visible = 0;

    for (point, color) in points.iter().zip(colors.iter_mut()) {
        let cam_point = camera.world_to_camera().transform_point(point);
        let (x, y) = camera.project_camera_point(&cam_point);
        if let Some((col, row)) = frame.intrinsics.to_pixel(x, y) {
            *color = frame.rgb(row, col).cast::<f32>() / 255.0;
            depth[(row, col)] = cam_point[2];
            visible += 1;
        }
    }

    Ok(Colorization {
        colors,
        depth,
        visible,
    })
}

/// Removes the points that got no color, i.e., their red channel is zero.
/// Point clouds without colors are returned unchanged.
pub fn discard_no_rgb(cloud: &PointCloud) -> PointCloud {
    match cloud.colors.as_ref() {
        Some(colors) => {
            let keep: Vec<bool> = colors.iter().map(|color| color[0] > 0.0).collect();
            cloud.select(&keep)
        }
        None => cloud.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit_test::{color_frame, write_file};
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rstest::*;

    #[rstest]
    fn should_project_optical_axis_to_principal_point(color_frame: ColorFrame) {
        let colorization = colorize(&array![Vector3::new(0.0, 0.0, 1.0)], &color_frame).unwrap();
        assert_eq!(colorization.visible, 1);
        assert_abs_diff_eq!(
            colorization.colors[0],
            Vector3::new(200.0 / 255.0, 100.0 / 255.0, 50.0 / 255.0)
        );
        assert_eq!(colorization.depth[(3, 4)], 1.0);
    }

    #[rstest]
    fn should_mirror_x(mut color_frame: ColorFrame) {
        color_frame.pixels[(3, 2, 0)] = 10;
        // x = 0.5 * 4 + 4 = 6, mirrored to 8 - 6 = 2.
        let colorization = colorize(&array![Vector3::new(0.5, 0.0, 1.0)], &color_frame).unwrap();
        assert_abs_diff_eq!(colorization.colors[0][0], 10.0 / 255.0);
        assert_eq!(colorization.depth[(3, 2)], 1.0);
    }

    #[rstest]
    fn should_zero_points_out_of_view(color_frame: ColorFrame) {
        let points = array![
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(5.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, 0.0)
        ];
        let colorization = colorize(&points, &color_frame).unwrap();
        assert_eq!(colorization.visible, 1);
        assert_eq!(colorization.colors[1], Vector3::zeros());
        assert_eq!(colorization.colors[2], Vector3::zeros());
        assert_eq!(
            colorization.depth.iter().filter(|d| **d != 0.0).count(),
            1
        );
    }

    #[rstest]
    fn should_reverse_bgr_sources(mut color_frame: ColorFrame) {
        color_frame.channel_order = ChannelOrder::Bgr;
        let colorization = colorize(&array![Vector3::new(0.0, 0.0, 1.0)], &color_frame).unwrap();
        assert_abs_diff_eq!(
            colorization.colors[0],
            Vector3::new(50.0 / 255.0, 100.0 / 255.0, 200.0 / 255.0)
        );
    }

    #[rstest]
    fn should_keep_last_written_depth(color_frame: ColorFrame) {
        // Both land on the principal point, the nearest one is written first.
        let points = array![Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, 3.0)];
        let colorization = colorize(&points, &color_frame).unwrap();
        assert_eq!(colorization.visible, 2);
        assert_eq!(colorization.depth[(3, 4)], 3.0);
    }

    #[rstest]
    fn should_use_color_camera_pose(mut color_frame: ColorFrame) {
        color_frame.pv_to_world = Transform::from_parts(
            &Vector3::new(0.0, 0.0, -1.0),
            &nalgebra::UnitQuaternion::identity(),
        );
        let colorization = colorize(&array![Vector3::new(0.0, 0.0, 1.0)], &color_frame).unwrap();
        assert_eq!(colorization.depth[(3, 4)], 2.0);
    }

    #[rstest]
    fn should_skip_singular_pose(mut color_frame: ColorFrame) {
        color_frame.pv_to_world = Transform::from_matrix4(&nalgebra::Matrix4::zeros());
        assert_eq!(
            colorize(&array![Vector3::new(0.0, 0.0, 1.0)], &color_frame).err(),
            Some(SkipReason::SingularTransform)
        );
    }

    #[test]
    fn should_discard_points_without_color() {
        let cloud = PointCloud::from_points(array![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(3.0, 0.0, 0.0)
        ])
        .with_colors(Some(array![
            Vector3::new(0.5, 0.5, 0.5),
            Vector3::new(0.0, 0.7, 0.7),
            Vector3::new(0.1, 0.0, 0.0)
        ]));
        let kept = discard_no_rgb(&cloud);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.points[1], Vector3::new(3.0, 0.0, 0.0));

        let uncolored = PointCloud::from_points(array![Vector3::new(1.0, 0.0, 0.0)]);
        assert_eq!(discard_no_rgb(&uncolored).len(), 1);
    }

    #[test]
    fn should_load_frame_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path().join("rec_pv.txt"),
            b"4,3,8,6\n500,4,4,1,0,0,0.5,0,1,0,0,0,0,1,0,0,0,0,1\n",
        );
        let metadata = PvMetadata::load(dir.path().join("rec_pv.txt")).unwrap();
        let png = dir.path().join("500.png");
        crate::image::save_rgb(&png, &Array3::from_elem((6, 8, 3), 9u8)).unwrap();

        let frame = ColorFrame::load(&png, &metadata, 0).unwrap();
        assert_eq!(frame.timestamp, 500);
        assert_eq!((frame.width(), frame.height()), (8, 6));
        assert_eq!(frame.intrinsics.fx, 4.0);
        assert_eq!(frame.pv_to_world.camera_center()[0], 0.5);
        assert_eq!(frame.rgb(0, 0), Vector3::new(9, 9, 9));
    }
}
