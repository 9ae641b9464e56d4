use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use ndarray::Array1;

use crate::error::{Error, Result};
use crate::io::read_float_list;
use crate::transform::Transform;

/// Calibration of a depth sensor: the per-pixel unit rays and the fixed rig-to-camera
/// extrinsic.
#[derive(Clone, Debug)]
pub struct Calibration {
    /// Unit direction per pixel in camera space (row-major scan order).
    pub rays: Array1<Vector3<f32>>,
    /// Transforms points from the rig frame into the sensor frame.
    pub rig_to_cam: Transform,
}

impl Calibration {
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(lut_path: P, extrinsics_path: Q) -> Result<Self> {
        Ok(Self {
            rays: load_lut(lut_path)?,
            rig_to_cam: load_extrinsics(extrinsics_path)?,
        })
    }

    /// Loads the `<sensor>_lut.bin` and `<sensor>_extrinsics.txt` files of a recording.
    pub fn from_recording<P: AsRef<Path>>(folder: P, sensor_name: &str) -> Result<Self> {
        let (lut_path, extrinsics_path) = calibration_paths(folder.as_ref(), sensor_name);
        Self::load(lut_path, extrinsics_path)
    }

    /// Returns the number of rays in the lookup table.
    pub fn len(&self) -> usize {
        self.rays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rays.is_empty()
    }

    /// Checks that the lookup table has one ray per pixel of a `width x height` depth image.
    pub fn check_resolution(&self, width: usize, height: usize) -> Result<()> {
        if self.rays.len() != width * height {
            return Err(Error::format(format!(
                "Lookup table has {} rays, but depth image has {}x{} pixels",
                self.rays.len(),
                width,
                height
            )));
        }
        Ok(())
    }
}

fn calibration_paths(folder: &Path, sensor_name: &str) -> (PathBuf, PathBuf) {
    (
        folder.join(format!("{sensor_name}_lut.bin")),
        folder.join(format!("{sensor_name}_extrinsics.txt")),
    )
}

/// Loads a ray lookup table stored as little-endian f32 triples.
pub fn load_lut<P: AsRef<Path>>(lut_path: P) -> Result<Array1<Vector3<f32>>> {
    let lut_path = lut_path.as_ref();
    let bytes = std::fs::read(lut_path).map_err(|err| {
        Error::configuration(format!("Can't read lookup table {}: {err}", lut_path.display()))
    })?;
    parse_lut(&bytes)
}

/// Decodes the bytes of a ray lookup table.
pub fn parse_lut(bytes: &[u8]) -> Result<Array1<Vector3<f32>>> {
    const TRIPLE_SIZE: usize = 3 * std::mem::size_of::<f32>();
    if bytes.len() % TRIPLE_SIZE != 0 {
        return Err(Error::format(format!(
            "Lookup table size ({} bytes) isn't a multiple of 3 floats",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(TRIPLE_SIZE)
        .map(|triple| {
            let value =
                |i: usize| f32::from_le_bytes([triple[i], triple[i + 1], triple[i + 2], triple[i + 3]]);
            Vector3::new(value(0), value(4), value(8))
        })
        .collect())
}

/// Loads the rig-to-camera extrinsic: 16 comma separated values, row-major.
pub fn load_extrinsics<P: AsRef<Path>>(extrinsics_path: P) -> Result<Transform> {
    let extrinsics_path = extrinsics_path.as_ref();
    if !extrinsics_path.exists() {
        return Err(Error::configuration(format!(
            "Extrinsics file {} not found",
            extrinsics_path.display()
        )));
    }
    let content = std::fs::read_to_string(extrinsics_path)?;
    Transform::from_row_slice(&read_float_list(&content)?)
}
