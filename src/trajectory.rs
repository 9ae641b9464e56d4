use std::collections::btree_map;
use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::transform::Transform;

/// Outputs of one processed depth frame that go into the trajectory files.
#[derive(Clone, Debug, PartialEq)]
pub struct TrajectoryRecord {
    /// Unique frame identifier, the depth frame's timestamp.
    pub frame_id: u64,
    /// Depth image path, relative to the pinhole projection folder.
    pub depth_path: String,
    /// Color image path, relative to the pinhole projection folder.
    pub rgb_path: String,
    pub camera_center: Vector3<f64>,
    /// Depth camera to world transform of the frame.
    pub extrinsic: Transform,
}

/// Trajectory of the processed frames, always iterated by ascending frame id
/// no matter in which order the records were inserted.
#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    records: BTreeMap<u64, TrajectoryRecord>,
}

impl Trajectory {
    /// Adds a record. Returns the previous record with the same frame id, if any.
    pub fn insert(&mut self, record: TrajectoryRecord) -> Option<TrajectoryRecord> {
        self.records.insert(record.frame_id, record)
    }

    /// Returns the number of frames in the trajectory.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the trajectory is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, frame_id: u64) -> Option<&TrajectoryRecord> {
        self.records.get(&frame_id)
    }

    /// Iterates over the records by ascending frame id.
    pub fn iter(&self) -> btree_map::Values<'_, u64, TrajectoryRecord> {
        self.records.values()
    }

    pub fn frame_ids(&self) -> Vec<u64> {
        self.records.keys().copied().collect()
    }

    /// Camera poses, transforms points from camera to world.
    pub fn camera_to_world(&self) -> Vec<Transform> {
        self.iter().map(|record| record.extrinsic.clone()).collect()
    }
}

impl FromIterator<TrajectoryRecord> for Trajectory {
    /// Creates a new trajectory from records in any order.
    /// Use with the `collect::<Trajectory>` method.
    fn from_iter<T: IntoIterator<Item = TrajectoryRecord>>(iter: T) -> Self {
        let mut trajectory = Trajectory::default();
        for record in iter {
            trajectory.insert(record);
        }
        trajectory
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a TrajectoryRecord;
    type IntoIter = btree_map::Values<'a, u64, TrajectoryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
