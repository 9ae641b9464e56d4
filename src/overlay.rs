use std::path::Path;

use nalgebra::Vector3;
use ndarray::Array3;
use tracing::{debug, info, warn};

use crate::camera::PinholeCamera;
use crate::colorize::{ChannelOrder, ColorFrame};
use crate::error::{Error, Result, SkipReason};
use crate::image::save_rgb;
use crate::io::hand_eye::{HandEyeSample, HandEyeStream};
use crate::io::pv::PvMetadata;
use crate::io::{glob_sorted, parse_timestamp};
use crate::timestamp::match_timestamp;

/// Radius in pixels of the joint and gaze markers.
pub const MARKER_RADIUS: i64 = 3;
pub const LEFT_HAND_COLOR: [u8; 3] = [255, 0, 0];
pub const RIGHT_HAND_COLOR: [u8; 3] = [0, 255, 0];
pub const GAZE_COLOR: [u8; 3] = [0, 0, 255];

/// Projections farther than this from the image origin aren't drawn.
const MAX_MARKER_COORDINATE: f32 = 1e6;

/// Output folder of the overlays inside a recording.
pub const OVERLAY_FOLDER: &str = "eye_hands";

/// Pixel where a world point is drawn. Coordinates are truncated before mirroring.
fn marker_center(camera: &PinholeCamera, point: &Vector3<f32>) -> Option<(i64, i64)> {
    let (x, y) = camera
        .intrinsics
        .project(&camera.world_to_camera().transform_point(point));
    if !(x.abs() <= MAX_MARKER_COORDINATE && y.abs() <= MAX_MARKER_COORDINATE) {
        return None;
    }
    Some((camera.intrinsics.width as i64 - x.trunc() as i64, y.trunc() as i64))
}

/// Draws a one pixel wide circle, clipped to the image.
fn draw_circle(image: &mut Array3<u8>, center: (i64, i64), color: &[u8; 3]) {
    let (height, width, _) = image.dim();
    let (cx, cy) = center;
    for dy in -MARKER_RADIUS..=MARKER_RADIUS {
        for dx in -MARKER_RADIUS..=MARKER_RADIUS {
            let distance = ((dx * dx + dy * dy) as f32).sqrt();
            if (distance - MARKER_RADIUS as f32).abs() >= 0.5 {
                continue;
            }
            let (col, row) = (cx + dx, cy + dy);
            if col < 0 || row < 0 || col >= width as i64 || row >= height as i64 {
                continue;
            }
            for (channel, value) in color.iter().enumerate() {
                image[(row as usize, col as usize, channel)] = *value;
            }
        }
    }
}

/// Draws the available hand joints and the gaze point of a sample over a copy of the
/// frame's image. The left hand is red, the right green and the gaze blue.
pub fn project_hand_eye(
    frame: &ColorFrame,
    sample: &HandEyeSample,
) -> std::result::Result<Array3<u8>, SkipReason> {
    let camera = frame.camera().ok_or(SkipReason::SingularTransform)?;
    let in_order = |color: [u8; 3]| match frame.channel_order {
        ChannelOrder::Rgb => color,
        ChannelOrder::Bgr => [color[2], color[1], color[0]],
    };

    let mut image = frame.pixels.clone();
    for (hand, color) in [
        (&sample.left, LEFT_HAND_COLOR),
        (&sample.right, RIGHT_HAND_COLOR),
    ] {
        if !hand.available {
            continue;
        }
        let color = in_order(color);
        for joint in hand.joints.iter() {
            if let Some(center) = marker_center(&camera, joint) {
                draw_circle(&mut image, center, &color);
            }
        }
    }

    if sample.gaze.available {
        if let Some(center) = marker_center(&camera, &sample.gaze.point()) {
            draw_circle(&mut image, center, &in_order(GAZE_COLOR));
        }
    }

    Ok(image)
}

/// Draws the hand/eye stream over every color frame of a recording into
/// `eye_hands/handsproj<nnnn>.png`, numbered by the frame's position in the sorted image list.
///
/// # Returns
///
/// * The number of overlays written.
pub fn project_hand_eye_to_pv<P: AsRef<Path>>(folder: P) -> Result<usize> {
    let folder = folder.as_ref();
    let stream_path = HandEyeStream::find_in_recording(folder)?
        .ok_or_else(|| Error::configuration("Recording has no *_eye.csv stream"))?;
    let stream = HandEyeStream::load(stream_path)?;
    let metadata = PvMetadata::from_recording(folder)?
        .ok_or_else(|| Error::configuration("Recording has no *pv.txt metadata"))?;
    let pv_paths = glob_sorted(folder.join("PV"), "*png")?;
    if pv_paths.is_empty() {
        return Err(Error::configuration("Recording has no PV images"));
    }

    let gaze = if stream.has_gaze() { " and eye gaze" } else { "" };
    info!("Projecting hand joints{gaze} to {} PV frames", pv_paths.len());

    let output_folder = folder.join(OVERLAY_FOLDER);
    std::fs::create_dir_all(&output_folder)?;

    let sample_timestamps = stream.timestamps();
    let metadata_timestamps = metadata.timestamps();
    let mut written = 0;
    for (pv_id, pv_path) in pv_paths.iter().enumerate() {
        let stem = pv_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let timestamp = parse_timestamp(&stem)?;

        let Some(sample_id) = match_timestamp(timestamp, &sample_timestamps) else {
            return Err(Error::configuration("Hand/eye stream is empty"));
        };
        let Some(frame_id) = metadata_timestamps.iter().position(|ts| *ts == timestamp) else {
            warn!("No PV metadata for frame {timestamp}");
            continue;
        };
        debug!(
            "Frame-hand delta: {:.3}ms",
            timestamp.abs_diff(sample_timestamps[sample_id]) as f64 * 1e-4
        );

        let frame = ColorFrame::load(pv_path, &metadata, frame_id)?;
        match project_hand_eye(&frame, &stream.samples[sample_id]) {
            Ok(image) => {
                save_rgb(output_folder.join(format!("handsproj{pv_id:04}.png")), &image)?;
                written += 1;
            }
            Err(reason) => warn!("Frame {timestamp} skipped: {reason}"),
        }
    }

    Ok(written)
}
