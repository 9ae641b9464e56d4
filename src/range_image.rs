use nalgebra::Vector3;
use ndarray::Array2;
use rayon::prelude::{ParallelBridge, ParallelIterator};
use serde_derive::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::error::Result;
use crate::io::Geometry;
use crate::pointcloud::PointCloud;

/// Depth values are in millimeters.
const MILLIMETERS_TO_METERS: f32 = 1.0 / 1000.0;

/// Points whose coordinates' magnitudes add up to less than this are empty measurements.
const INVALID_POINT_EPSILON: f32 = 1e-6;

/// Band of accepted depths, in meters. Measurements outside it are removed before
/// unprojection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepthClamp {
    pub min: f32,
    pub max: f32,
}

impl DepthClamp {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// The clamp only applies when both bounds are positive.
    pub fn is_active(&self) -> bool {
        self.min > 0.0 && self.max > 0.0
    }

    /// Zeroes the millimeter depth value when it's outside of the band.
    pub fn apply(&self, depth_mm: u16) -> u16 {
        let value = depth_mm as f32;
        if value < self.min * 1000.0 || value > self.max * 1000.0 {
            0
        } else {
            depth_mm
        }
    }
}

/// A point cloud that comes from a depth sensor. It representation holds its grid structure.
#[derive(Debug, Clone)]
pub struct RangeImage {
    /// 3D points in the camera frame, in meters, as array with shape: (height, width)
    pub points: Array2<Vector3<f32>>,
    /// Mask of valid points, as array with shape: (height, width)
    pub mask: Array2<u8>,
    /// Normals of the points, as array with shape: (height, width)
    pub normals: Option<Array2<Vector3<f32>>>,
    valid_points: usize,
}

impl RangeImage {
    /// Unprojects a depth image with the sensor's ray lookup table.
    ///
    /// # Arguments
    ///
    /// * `depth` - Depth image in millimeters, shape (height, width).
    /// * `calibration` - Calibration with one ray per pixel, in scan order.
    /// * `clamp` - Optional band of accepted depths.
    ///
    /// # Returns
    ///
    /// * The range image, or a format error if the lookup table doesn't match
    ///   the image resolution.
    pub fn from_depth(
        depth: &Array2<u16>,
        calibration: &Calibration,
        clamp: Option<&DepthClamp>,
    ) -> Result<Self> {
        let (height, width) = depth.dim();
        calibration.check_resolution(width, height)?;
        let clamp = clamp.filter(|clamp| clamp.is_active());

        let mut points = Array2::<Vector3<f32>>::zeros((height, width));
        let mut mask = Array2::<u8>::zeros((height, width));
        let mut valid_points = 0;

        for row in 0..height {
            for col in 0..width {
                let mut z = depth[(row, col)];
                if let Some(clamp) = clamp {
                    z = clamp.apply(z);
                }

                let point = calibration.rays[row * width + col] * z as f32;
                if point.abs().sum() < INVALID_POINT_EPSILON {
                    continue;
                }
                points[(row, col)] = point * MILLIMETERS_TO_METERS;
                mask[(row, col)] = 1;
                valid_points += 1;
            }
        }

        Ok(Self {
            points,
            mask,
            normals: None,
            valid_points,
        })
    }

    /// Width of the image.
    pub fn width(&self) -> usize {
        self.points.shape()[1]
    }

    /// Height of the image.
    pub fn height(&self) -> usize {
        self.points.shape()[0]
    }

    /// Number of valid points in the image, this is not the same as
    /// width*height, since some points may be invalid (i.e, 0 valued depth).
    pub fn valid_points_count(&self) -> usize {
        self.valid_points
    }

    /// Returns the number of points in the image, which is width*height.
    pub fn len(&self) -> usize {
        let shape = self.points.shape();
        shape[0] * shape[1]
    }

    /// Returns true if the image is empty, i.e, it has no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the 3D point at the given row and column.
    /// If the point is invalid, returns None.
    pub fn get_point(&self, row: usize, col: usize) -> Option<Vector3<f32>> {
        if col < self.width() && row < self.height() && self.mask[(row, col)] == 1 {
            Some(self.points[(row, col)])
        } else {
            None
        }
    }

    /// Updates the image with normals computed from the neighbor points. Each axis uses the
    /// centered difference unless one neighbor is more than twice as far as the other, then the
    /// closest one.
    pub fn compute_normals(&mut self) -> &mut Self {
        let height = self.height();
        let width = self.width();

        let ratio_threshold = 2f32;
        let ratio_threshold_squared = ratio_threshold * ratio_threshold;

        let mut normals = Array2::<Vector3<f32>>::zeros((height, width));

        const CHUNK_SIZE: usize = 1024;
        normals
            .as_slice_mut()
            .into_iter()
            .flat_map(|slice| slice.chunks_mut(CHUNK_SIZE))
            .enumerate()
            .par_bridge()
            .for_each(|(i_chunk, normal_chunk)| {
                let offset_index = i_chunk * CHUNK_SIZE;
                normal_chunk.iter_mut().enumerate().for_each(|(i, val)| {
                    let normal_index = offset_index + i;
                    let (row, col) = (normal_index / width, normal_index % width);
                    if self.mask[(row, col)] == 0 {
                        return;
                    }

                    let center = self.points[(row, col)];
                    let neighbor = |row: Option<usize>, col: Option<usize>| {
                        row.zip(col)
                            .and_then(|(row, col)| self.get_point(row, col))
                            .unwrap_or_else(Vector3::zeros)
                    };
                    let left = neighbor(Some(row), col.checked_sub(1));
                    let right = neighbor(Some(row), Some(col + 1));

                    let left_dist_squared = (left - center).norm_squared();
                    let right_dist_squared = (right - center).norm_squared();
                    let left_right_ratio = left_dist_squared / right_dist_squared;

                    let left_to_right = if left_right_ratio < ratio_threshold_squared
                        && left_right_ratio > 1f32 / ratio_threshold_squared
                    {
                        right - left
                    } else if left_dist_squared < right_dist_squared {
                        center - left
                    } else {
                        right - center
                    };

                    let bottom = neighbor(Some(row + 1), Some(col));
                    let top = neighbor(row.checked_sub(1), Some(col));

                    let bottom_dist_squared = (bottom - center).norm_squared();
                    let top_dist_squared = (top - center).norm_squared();
                    let bottom_top_ratio = bottom_dist_squared / top_dist_squared;

                    let bottom_to_top = if bottom_top_ratio < ratio_threshold_squared
                        && bottom_top_ratio > 1f32 / ratio_threshold_squared
                    {
                        top - bottom
                    } else if bottom_dist_squared < top_dist_squared {
                        center - bottom
                    } else {
                        top - center
                    };

                    let normal = left_to_right.cross(&bottom_to_top);

                    let normal_magnitude = normal.magnitude();
                    if normal_magnitude > 1e-6_f32 {
                        *val = normal / normal_magnitude;
                    }
                });
            });

        self.normals = Some(normals);

        self
    }

    /// Iterates over the valid points in scan order, with their `(row, col)`.
    pub fn indexed_iter(&self) -> impl Iterator<Item = (usize, usize, Vector3<f32>)> + '_ {
        self.mask
            .indexed_iter()
            .filter(|(_, m)| **m > 0)
            .map(|((row, col), _)| (row, col, self.points[(row, col)]))
    }
}

impl From<&RangeImage> for PointCloud {
    fn from(image_pcl: &RangeImage) -> PointCloud {
        let points = image_pcl
            .points
            .iter()
            .zip(image_pcl.mask.iter())
            .filter_map(|(point, mask)| if *mask != 0 { Some(*point) } else { None })
            .collect();

        let normals = image_pcl.normals.as_ref().map(|normals| {
            normals
                .iter()
                .zip(image_pcl.mask.iter())
                .filter_map(|(normal, mask)| if *mask != 0 { Some(*normal) } else { None })
                .collect()
        });

        PointCloud {
            points,
            normals,
            colors: None,
        }
    }
}

impl From<&RangeImage> for Geometry {
    fn from(image_pcl: &RangeImage) -> Geometry {
        let pcl = PointCloud::from(image_pcl);
        pcl.into()
    }
}
