use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::transform::Transform;

use super::{parse_timestamp, read_float_list, read_lines};

/// Rig-to-world poses of a sensor, keyed by the sensor's frame timestamps.
#[derive(Clone, Debug, Default)]
pub struct PoseStream {
    rig_to_world: HashMap<u64, Transform>,
}

impl PoseStream {
    /// Loads a `<sensor>_rig2world.txt` file. Each line is the timestamp followed by
    /// the 16 values of a row-major 4x4 matrix, comma separated.
    pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self> {
        let filepath = filepath.as_ref();
        read_lines(filepath)?
            .iter()
            .enumerate()
            .map(|(n, line)| {
                parse_pose_line(line)
                    .map_err(|err| Error::parser(format!("{}:{}: {err}", filepath.display(), n + 1)))
            })
            .collect()
    }

    /// Loads the pose stream of a sensor in a recording if there's one.
    pub fn from_recording<P: AsRef<Path>>(folder: P, sensor_name: &str) -> Result<Option<Self>> {
        let filepath = folder.as_ref().join(format!("{sensor_name}_rig2world.txt"));
        if filepath.exists() {
            Self::load(filepath).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn insert(&mut self, timestamp: u64, rig_to_world: Transform) {
        self.rig_to_world.insert(timestamp, rig_to_world);
    }

    /// The pose at `timestamp`, `None` means that the pose is unknown for that frame.
    pub fn get(&self, timestamp: u64) -> Option<&Transform> {
        self.rig_to_world.get(&timestamp)
    }

    pub fn len(&self) -> usize {
        self.rig_to_world.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rig_to_world.is_empty()
    }

    /// Sorted timestamps of the stream.
    pub fn timestamps(&self) -> Vec<u64> {
        let mut timestamps: Vec<u64> = self.rig_to_world.keys().copied().collect();
        timestamps.sort_unstable();
        timestamps
    }
}

fn parse_pose_line(line: &str) -> Result<(u64, Transform)> {
    let (timestamp, matrix) = line
        .split_once(',')
        .ok_or_else(|| Error::parser("Expected a timestamp followed by 16 values"))?;
    Ok((
        parse_timestamp(timestamp)?,
        Transform::from_row_slice(&read_float_list(matrix)?)?,
    ))
}

impl FromIterator<(u64, Transform)> for PoseStream {
    fn from_iter<T: IntoIterator<Item = (u64, Transform)>>(iter: T) -> Self {
        Self {
            rig_to_world: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::io::Write;

    #[test]
    fn should_load_rig2world() {
        let dir = tempfile::tempdir().unwrap();
        let filepath = dir.path().join("Depth AHaT_rig2world.txt");
        let mut file = std::fs::File::create(&filepath).unwrap();
        writeln!(file, "1000,1,0,0,1,0,1,0,2,0,0,1,3,0,0,0,1").unwrap();
        writeln!(file, "2000,1,0,0,4,0,1,0,5,0,0,1,6,0,0,0,1").unwrap();
        writeln!(file).unwrap();

        let poses = PoseStream::from_recording(dir.path(), "Depth AHaT")
            .unwrap()
            .unwrap();
        assert_eq!(poses.len(), 2);
        assert_eq!(
            poses.get(2000).unwrap().camera_center(),
            Vector3::new(4.0, 5.0, 6.0)
        );
        assert!(poses.get(1500).is_none());
        assert_eq!(poses.timestamps(), vec![1000, 2000]);
    }

    #[test]
    fn should_be_absent_without_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PoseStream::from_recording(dir.path(), "Depth AHaT")
            .unwrap()
            .is_none());
    }

    #[test]
    fn should_report_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let filepath = dir.path().join("poses.txt");
        std::fs::write(&filepath, "1000,1,0,0\n").unwrap();
        assert!(matches!(PoseStream::load(&filepath), Err(Error::Parser(_))));
    }
}
