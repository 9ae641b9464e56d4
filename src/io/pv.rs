use std::path::{Path, PathBuf};

use crate::camera::CameraIntrinsics;
use crate::error::{Error, Result};
use crate::transform::Transform;

use super::{parse_timestamp, read_float_list, read_lines};

/// Per-frame information of the head-mounted color (PV) camera.
#[derive(Clone, Debug)]
pub struct PvFrameInfo {
    pub timestamp: u64,
    /// Focal lengths `(fx, fy)`, they may change per frame due to autofocus.
    pub focal_length: (f64, f64),
    pub pv_to_world: Transform,
}

/// The `*pv.txt` metadata of a recording.
#[derive(Clone, Debug)]
pub struct PvMetadata {
    /// Principal point `(ox, oy)`.
    pub principal_point: (f64, f64),
    pub width: usize,
    pub height: usize,
    pub frames: Vec<PvFrameInfo>,
}

impl PvMetadata {
    /// Loads the metadata file. The first line holds `ox, oy, width, height`,
    /// the next ones `timestamp, fx, fy` and the 16 values of the row-major PV-to-world matrix.
    pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self> {
        let filepath = filepath.as_ref();
        let with_location =
            |n: usize, err: Error| Error::parser(format!("{}:{}: {err}", filepath.display(), n + 1));

        let lines = read_lines(filepath)?;
        let header = lines
            .first()
            .ok_or_else(|| Error::parser(format!("{} is empty", filepath.display())))?;
        let header = read_float_list(header.trim_matches(|c| c == '(' || c == ')'))
            .map_err(|err| with_location(0, err))?;
        if header.len() != 4 {
            return Err(with_location(
                0,
                Error::format("Expected ox, oy, width and height"),
            ));
        }

        let frames = lines
            .iter()
            .enumerate()
            .skip(1)
            .map(|(n, line)| parse_frame_line(line).map_err(|err| with_location(n, err)))
            .collect::<Result<Vec<PvFrameInfo>>>()?;

        Ok(Self {
            principal_point: (header[0], header[1]),
            width: header[2] as usize,
            height: header[3] as usize,
            frames,
        })
    }

    /// Finds the `*pv.txt` file of a recording, if any.
    pub fn find_in_recording<P: AsRef<Path>>(folder: P) -> Result<Option<PathBuf>> {
        Ok(super::glob_sorted(folder, "*pv.txt")?.into_iter().next())
    }

    /// Loads the PV metadata of a recording if it was recorded.
    pub fn from_recording<P: AsRef<Path>>(folder: P) -> Result<Option<Self>> {
        Self::find_in_recording(folder)?
            .map(Self::load)
            .transpose()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame timestamps, in file order.
    pub fn timestamps(&self) -> Vec<u64> {
        self.frames.iter().map(|frame| frame.timestamp).collect()
    }

    /// Camera intrinsics of the frame at `index`.
    pub fn intrinsics(&self, index: usize) -> CameraIntrinsics {
        let (fx, fy) = self.frames[index].focal_length;
        CameraIntrinsics::new(
            fx,
            fy,
            self.principal_point.0,
            self.principal_point.1,
            self.width,
            self.height,
        )
    }
}

fn parse_frame_line(line: &str) -> Result<PvFrameInfo> {
    let (timestamp, values) = line
        .split_once(',')
        .ok_or_else(|| Error::parser("Expected timestamp, fx, fy and 16 pose values"))?;
    let values = read_float_list(values)?;
    if values.len() != 18 {
        return Err(Error::format(format!(
            "Expected fx, fy and 16 pose values, got {} values",
            values.len()
        )));
    }
    Ok(PvFrameInfo {
        timestamp: parse_timestamp(timestamp)?,
        focal_length: (values[0], values[1]),
        pv_to_world: Transform::from_row_slice(&values[2..])?,
    })
}
