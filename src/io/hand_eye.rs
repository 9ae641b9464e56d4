use std::path::{Path, PathBuf};

use nalgebra::{Vector3, Vector4};

use crate::error::{Error, Result};

use super::{parse_timestamp, read_float_list, read_lines};

/// Hand joints in the order they're recorded. The order and count are part
/// of the hand/eye file layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandJoint {
    Palm = 0,
    Wrist,
    ThumbMetacarpal,
    ThumbProximal,
    ThumbDistal,
    ThumbTip,
    IndexMetacarpal,
    IndexProximal,
    IndexIntermediate,
    IndexDistal,
    IndexTip,
    MiddleMetacarpal,
    MiddleProximal,
    MiddleIntermediate,
    MiddleDistal,
    MiddleTip,
    RingMetacarpal,
    RingProximal,
    RingIntermediate,
    RingDistal,
    RingTip,
    PinkyMetacarpal,
    PinkyProximal,
    PinkyIntermediate,
    PinkyDistal,
    PinkyTip,
}

impl HandJoint {
    pub const COUNT: usize = 26;

    pub const ALL: [HandJoint; HandJoint::COUNT] = [
        HandJoint::Palm,
        HandJoint::Wrist,
        HandJoint::ThumbMetacarpal,
        HandJoint::ThumbProximal,
        HandJoint::ThumbDistal,
        HandJoint::ThumbTip,
        HandJoint::IndexMetacarpal,
        HandJoint::IndexProximal,
        HandJoint::IndexIntermediate,
        HandJoint::IndexDistal,
        HandJoint::IndexTip,
        HandJoint::MiddleMetacarpal,
        HandJoint::MiddleProximal,
        HandJoint::MiddleIntermediate,
        HandJoint::MiddleDistal,
        HandJoint::MiddleTip,
        HandJoint::RingMetacarpal,
        HandJoint::RingProximal,
        HandJoint::RingIntermediate,
        HandJoint::RingDistal,
        HandJoint::RingTip,
        HandJoint::PinkyMetacarpal,
        HandJoint::PinkyProximal,
        HandJoint::PinkyIntermediate,
        HandJoint::PinkyDistal,
        HandJoint::PinkyTip,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Pairs of joints connected by a bone, from the wrist to each finger tip.
    pub fn bones() -> Vec<(HandJoint, HandJoint)> {
        use HandJoint::*;
        let fingers = [
            [ThumbMetacarpal, ThumbProximal, ThumbDistal, ThumbTip],
            [IndexMetacarpal, IndexProximal, IndexIntermediate, IndexDistal],
            [MiddleMetacarpal, MiddleProximal, MiddleIntermediate, MiddleDistal],
            [RingMetacarpal, RingProximal, RingIntermediate, RingDistal],
            [PinkyMetacarpal, PinkyProximal, PinkyIntermediate, PinkyDistal],
        ];
        let tips = [None, Some(IndexTip), Some(MiddleTip), Some(RingTip), Some(PinkyTip)];

        let mut bones = Vec::with_capacity(24);
        for (finger, tip) in fingers.iter().zip(tips) {
            bones.push((Wrist, finger[0]));
            for pair in finger.windows(2) {
                bones.push((pair[0], pair[1]));
            }
            if let Some(tip) = tip {
                bones.push((finger[3], tip));
            }
        }
        bones
    }
}

/// Joint positions of one hand in world space.
#[derive(Clone, Debug, PartialEq)]
pub struct HandJoints {
    pub joints: [Vector3<f32>; HandJoint::COUNT],
    pub available: bool,
}

impl HandJoints {
    pub fn get(&self, joint: HandJoint) -> &Vector3<f32> {
        &self.joints[joint.index()]
    }
}

/// Eye gaze ray in world space, in homogeneous coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Gaze {
    pub origin: Vector4<f32>,
    pub direction: Vector4<f32>,
    pub distance: f32,
    pub available: bool,
}

impl Gaze {
    /// The 3D point the user looks at: `origin + normalize(direction) * distance`.
    /// If no distance was recorded (non-positive), it's 1 meter.
    pub fn point(&self) -> Vector3<f32> {
        let direction = self.direction.normalize();
        let distance = if self.distance > 0.0 {
            self.distance
        } else {
            1.0
        };
        let point = self.origin + direction * distance;
        Vector3::new(point[0], point[1], point[2])
    }
}

/// One row of the head/hand/eye stream.
#[derive(Clone, Debug, PartialEq)]
pub struct HandEyeSample {
    pub timestamp: u64,
    pub head_translation: Vector3<f32>,
    pub left: HandJoints,
    pub right: HandJoints,
    pub gaze: Gaze,
}

/// Column layout of a row: timestamp, head 4x4, left flag, left joints 4x4 each,
/// right flag, right joints, gaze flag, gaze origin (4), direction (4), distance.
const HEAD_START: usize = 1;
const LEFT_FLAG: usize = HEAD_START + 16;
const LEFT_START: usize = LEFT_FLAG + 1;
const RIGHT_FLAG: usize = LEFT_START + HandJoint::COUNT * 16;
const RIGHT_START: usize = RIGHT_FLAG + 1;
const GAZE_FLAG: usize = RIGHT_START + HandJoint::COUNT * 16;
const GAZE_ORIGIN: usize = GAZE_FLAG + 1;
const GAZE_DIRECTION: usize = GAZE_ORIGIN + 4;
const GAZE_DISTANCE: usize = GAZE_DIRECTION + 4;

/// Number of columns of a valid hand/eye row.
pub const HAND_EYE_COLUMNS: usize = GAZE_DISTANCE + 1;

/// Translation part of the row-major 4x4 block starting at `start`.
fn block_translation(row: &[f64], start: usize) -> Vector3<f32> {
    Vector3::new(
        row[start + 3] as f32,
        row[start + 7] as f32,
        row[start + 11] as f32,
    )
}

fn read_hand(row: &[f64], flag: usize, start: usize) -> HandJoints {
    let mut joints = [Vector3::zeros(); HandJoint::COUNT];
    for (i, joint) in joints.iter_mut().enumerate() {
        *joint = block_translation(row, start + 16 * i);
    }
    HandJoints {
        joints,
        available: row[flag] == 1.0,
    }
}

fn vector4(row: &[f64], start: usize) -> Vector4<f32> {
    Vector4::new(
        row[start] as f32,
        row[start + 1] as f32,
        row[start + 2] as f32,
        row[start + 3] as f32,
    )
}

impl HandEyeSample {
    /// Parses one comma separated row. Rows must have exactly [`HAND_EYE_COLUMNS`] columns.
    pub fn parse(line: &str) -> Result<Self> {
        let (timestamp, _) = line.split_once(',').unwrap_or((line, ""));
        let timestamp = parse_timestamp(timestamp)?;

        let row = read_float_list(line)?;
        if row.len() != HAND_EYE_COLUMNS {
            return Err(Error::configuration(format!(
                "Hand/eye row has {} columns, expected {}",
                row.len(),
                HAND_EYE_COLUMNS
            )));
        }

        Ok(Self {
            timestamp,
            head_translation: block_translation(&row, HEAD_START),
            left: read_hand(&row, LEFT_FLAG, LEFT_START),
            right: read_hand(&row, RIGHT_FLAG, RIGHT_START),
            gaze: Gaze {
                origin: vector4(&row, GAZE_ORIGIN),
                direction: vector4(&row, GAZE_DIRECTION),
                distance: row[GAZE_DISTANCE] as f32,
                available: row[GAZE_FLAG] == 1.0,
            },
        })
    }
}

/// The head/hand/eye stream of a recording (`*_eye.csv`).
#[derive(Clone, Debug, Default)]
pub struct HandEyeStream {
    pub samples: Vec<HandEyeSample>,
}

impl HandEyeStream {
    pub fn load<P: AsRef<Path>>(filepath: P) -> Result<Self> {
        let filepath = filepath.as_ref();
        let samples = read_lines(filepath)?
            .iter()
            .enumerate()
            .map(|(n, line)| {
                HandEyeSample::parse(line).map_err(|err| match err {
                    Error::Configuration(msg) => {
                        Error::configuration(format!("{}:{}: {msg}", filepath.display(), n + 1))
                    }
                    err => Error::parser(format!("{}:{}: {err}", filepath.display(), n + 1)),
                })
            })
            .collect::<Result<Vec<HandEyeSample>>>()?;
        Ok(Self { samples })
    }

    pub fn find_in_recording<P: AsRef<Path>>(folder: P) -> Result<Option<PathBuf>> {
        Ok(super::glob_sorted(folder, "*eye.csv")?.into_iter().next())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn timestamps(&self) -> Vec<u64> {
        self.samples.iter().map(|sample| sample.timestamp).collect()
    }

    /// Whether any sample has the eye gaze.
    pub fn has_gaze(&self) -> bool {
        self.samples.iter().any(|sample| sample.gaze.available)
    }
}
