use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use ndarray::{Array1, Array2, Array3};
use rstest::fixture;
use tempfile::TempDir;

use crate::calibration::Calibration;
use crate::camera::CameraIntrinsics;
use crate::colorize::{ChannelOrder, ColorFrame};
use crate::image::save_rgb;
use crate::io::hand_eye::{HandJoint, HAND_EYE_COLUMNS};
use crate::transform::Transform;

const IDENTITY: &str = "1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1";

pub fn write_file<P: AsRef<Path>>(filepath: P, content: &[u8]) {
    std::fs::write(filepath, content).unwrap();
}

/// Encodes rays like a `*_lut.bin` file.
pub fn lut_bytes(rays: &[Vector3<f32>]) -> Vec<u8> {
    rays.iter()
        .flat_map(|ray| ray.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>())
        .collect()
}

/// Encodes a binary 16 bits PGM, the format of the extracted depth frames.
pub fn pgm16_bytes(depth: &Array2<u16>) -> Vec<u8> {
    let (height, width) = depth.dim();
    let mut bytes = format!("P5\n{width} {height}\n65535\n").into_bytes();
    bytes.extend(depth.iter().flat_map(|v| v.to_be_bytes()));
    bytes
}

/// Rays of an ideal pinhole sensor with focal length `f` and the principal point at the
/// image center.
pub fn pinhole_calibration(width: usize, height: usize, f: f32) -> Calibration {
    let rays: Array1<Vector3<f32>> = (0..height)
        .flat_map(|row| (0..width).map(move |col| (row, col)))
        .map(|(row, col)| {
            Vector3::new(
                (col as f32 + 0.5 - width as f32 / 2.0) / f,
                (row as f32 + 0.5 - height as f32 / 2.0) / f,
                1.0,
            )
            .normalize()
        })
        .collect();
    Calibration {
        rays,
        rig_to_cam: Transform::eye(),
    }
}

#[fixture]
pub fn calibration_2x2() -> Calibration {
    pinhole_calibration(2, 2, 2.0)
}

/// A black 8x6 frame with a single colored pixel at the principal point `(row 3, col 4)`.
#[fixture]
pub fn color_frame() -> ColorFrame {
    let mut pixels = Array3::<u8>::zeros((6, 8, 3));
    pixels[(3, 4, 0)] = 200;
    pixels[(3, 4, 1)] = 100;
    pixels[(3, 4, 2)] = 50;
    ColorFrame {
        timestamp: 0,
        pixels,
        channel_order: ChannelOrder::Rgb,
        intrinsics: CameraIntrinsics::new(4.0, 4.0, 4.0, 3.0, 8, 6),
        pv_to_world: Transform::eye(),
    }
}

/// A `*_eye.csv` row. Hands and gaze are flagged as available when they're given.
pub fn hand_eye_row(
    timestamp: u64,
    left: Option<&[Vector3<f32>; HandJoint::COUNT]>,
    right: Option<&[Vector3<f32>; HandJoint::COUNT]>,
    gaze: Option<(Vector3<f32>, Vector3<f32>, f32)>,
) -> String {
    let mut row = timestamp.to_string();
    row.push(',');
    row.push_str(IDENTITY);

    for hand in [left, right] {
        write!(row, ",{}", if hand.is_some() { 1 } else { 0 }).unwrap();
        let joints = hand.copied().unwrap_or([Vector3::zeros(); HandJoint::COUNT]);
        for joint in joints.iter() {
            write!(
                row,
                ",1,0,0,{},0,1,0,{},0,0,1,{},0,0,0,1",
                joint[0], joint[1], joint[2]
            )
            .unwrap();
        }
    }

    let (available, origin, direction, distance) = match gaze {
        Some((origin, direction, distance)) => (1, origin, direction, distance),
        None => (0, Vector3::zeros(), Vector3::zeros(), 0.0),
    };
    write!(
        row,
        ",{available},{},{},{},1,{},{},{},0,{distance}",
        origin[0], origin[1], origin[2], direction[0], direction[1], direction[2]
    )
    .unwrap();

    debug_assert_eq!(row.split(',').count(), HAND_EYE_COLUMNS);
    row
}

/// Writes a minimal extracted recording of the `Depth AHaT` sensor in a temporary folder.
pub struct RecordingBuilder {
    width: usize,
    height: usize,
    depth_files: Vec<(String, u16)>,
    poses: Vec<u64>,
    pv_frames: Vec<(u64, Option<[u8; 3]>)>,
}

impl RecordingBuilder {
    pub const SENSOR: &'static str = "Depth AHaT";

    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            depth_files: Vec::new(),
            poses: Vec::new(),
            pv_frames: Vec::new(),
        }
    }

    /// Adds a depth frame where every pixel is `depth_mm`.
    pub fn depth_frame(self, timestamp: u64, depth_mm: u16) -> Self {
        self.depth_file(&format!("{timestamp}.pgm"), depth_mm)
    }

    pub fn depth_file(mut self, name: &str, depth_mm: u16) -> Self {
        self.depth_files.push((name.to_string(), depth_mm));
        self
    }

    /// Adds an identity rig to world pose.
    pub fn pose(mut self, timestamp: u64) -> Self {
        self.poses.push(timestamp);
        self
    }

    /// Adds an identity posed 8x6 color frame of a single color.
    pub fn pv_frame(mut self, timestamp: u64, rgb: [u8; 3]) -> Self {
        self.pv_frames.push((timestamp, Some(rgb)));
        self
    }

    /// Adds the metadata of a color frame whose image wasn't extracted.
    pub fn pv_metadata_only(mut self, timestamp: u64) -> Self {
        self.pv_frames.push((timestamp, None));
        self
    }

    pub fn build(self) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path();
        let sensor_folder: PathBuf = folder.join(Self::SENSOR);
        std::fs::create_dir_all(&sensor_folder).unwrap();

        let calibration = pinhole_calibration(self.width, self.height, self.width as f32);
        write_file(
            folder.join(format!("{}_lut.bin", Self::SENSOR)),
            &lut_bytes(calibration.rays.as_slice().unwrap()),
        );
        write_file(
            folder.join(format!("{}_extrinsics.txt", Self::SENSOR)),
            IDENTITY.as_bytes(),
        );

        for (name, depth_mm) in self.depth_files.iter() {
            let depth = Array2::from_elem((self.height, self.width), *depth_mm);
            write_file(sensor_folder.join(name), &pgm16_bytes(&depth));
        }

        if !self.poses.is_empty() {
            let content: String = self
                .poses
                .iter()
                .map(|ts| format!("{ts},{IDENTITY}\n"))
                .collect();
            write_file(
                folder.join(format!("{}_rig2world.txt", Self::SENSOR)),
                content.as_bytes(),
            );
        }

        if !self.pv_frames.is_empty() {
            std::fs::create_dir_all(folder.join("PV")).unwrap();
            let mut content = String::from("4,3,8,6\n");
            for (ts, rgb) in self.pv_frames.iter() {
                writeln!(content, "{ts},4,4,{IDENTITY}").unwrap();
                if let Some(rgb) = rgb {
                    let pixels = Array3::from_shape_fn((6, 8, 3), |(_, _, c)| rgb[c]);
                    save_rgb(folder.join(format!("PV/{ts}.png")), &pixels).unwrap();
                }
            }
            write_file(folder.join("rec_pv.txt"), content.as_bytes());
        }

        dir
    }
}
