//! Text files shared with the volume integration stage, all inside the pinhole
//! projection folder:
//!
//! * `calibration.txt`: `fx fy cx cy` of the virtual camera.
//! * `depth.txt` and `rgb.txt`: `<frame id> <relative image path>` per frame.
//! * `trajectory.xyz`: the camera center per frame.
//! * `odometry.log`: per frame, a `i i i` line followed by the 4 rows of the extrinsic.
//!
//! Line `n` of every file describes the same frame.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::trajectory::Trajectory;
use crate::transform::Transform;

use super::{read_float_list, read_lines};

pub const CALIBRATION_FILE: &str = "calibration.txt";
pub const DEPTH_LIST_FILE: &str = "depth.txt";
pub const RGB_LIST_FILE: &str = "rgb.txt";
pub const TRAJECTORY_FILE: &str = "trajectory.xyz";
pub const ODOMETRY_FILE: &str = "odometry.log";

/// Writes the intrinsic record `fx fy cx cy`.
pub fn write_intrinsics<P: AsRef<Path>>(folder: P, intrinsics: &[f64; 4]) -> Result<()> {
    let mut file = File::create(folder.as_ref().join(CALIBRATION_FILE))?;
    writeln!(file, "{}", intrinsics.iter().join(" "))?;
    Ok(())
}

/// Reads back the `fx fy cx cy` intrinsic record.
pub fn read_intrinsics<P: AsRef<Path>>(filepath: P) -> Result<[f64; 4]> {
    let values = read_float_list(&std::fs::read_to_string(filepath)?)?;
    <[f64; 4]>::try_from(values.as_slice()).map_err(|_| {
        Error::format(format!(
            "Intrinsics record needs 4 values, got {}",
            values.len()
        ))
    })
}

/// Writes the four per-frame outputs of a trajectory in ascending frame id.
pub fn write_trajectory_outputs<P: AsRef<Path>>(folder: P, trajectory: &Trajectory) -> Result<()> {
    let folder = folder.as_ref();
    let create = |name: &str| -> Result<BufWriter<File>> {
        Ok(BufWriter::new(File::create(folder.join(name))?))
    };
    let mut depth_file = create(DEPTH_LIST_FILE)?;
    let mut rgb_file = create(RGB_LIST_FILE)?;
    let mut trajectory_file = create(TRAJECTORY_FILE)?;
    let mut odometry_file = create(ODOMETRY_FILE)?;

    for (i, record) in trajectory.iter().enumerate() {
        writeln!(depth_file, "{} {}", record.frame_id, record.depth_path)?;
        writeln!(rgb_file, "{} {}", record.frame_id, record.rgb_path)?;
        writeln!(trajectory_file, "{}", record.camera_center.iter().join(" "))?;

        writeln!(odometry_file, "{i} {i} {i}")?;
        let matrix = record.extrinsic.matrix();
        for row in matrix.row_iter() {
            writeln!(odometry_file, "{}", row.iter().join(" "))?;
        }
    }

    depth_file.flush()?;
    rgb_file.flush()?;
    trajectory_file.flush()?;
    odometry_file.flush()?;
    Ok(())
}

/// Reads a `<frame id> <relative path>` list. Lines starting with `#` are ignored.
pub fn read_file_list<P: AsRef<Path>>(filepath: P) -> Result<Vec<(u64, String)>> {
    read_lines(filepath)?
        .iter()
        .filter(|line| !line.starts_with('#'))
        .map(|line| {
            let (frame_id, path) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| Error::parser(format!("Expected '<id> <path>', got '{line}'")))?;
            Ok((super::parse_timestamp(frame_id)?, path.trim().to_string()))
        })
        .collect()
}

/// Reads the poses of an `odometry.log` file, blocks of 5 lines.
pub fn read_odometry_log<P: AsRef<Path>>(filepath: P) -> Result<Vec<Transform>> {
    let lines = read_lines(filepath)?;
    if lines.len() % 5 != 0 {
        return Err(Error::format(format!(
            "Odometry log has {} lines, expected blocks of 5",
            lines.len()
        )));
    }

    let poses = lines
        .iter()
        .chunks(5)
        .into_iter()
        .map(|block| {
            let mut values = Vec::with_capacity(16);
            for line in block.skip(1) {
                values.extend(read_float_list(line)?);
            }
            Transform::from_row_slice(&values)
        })
        .collect::<Result<Vec<Transform>>>()?;
    Ok(poses)
}
