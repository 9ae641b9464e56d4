use nalgebra::Vector3;
use ndarray::Array1;

use crate::io::Geometry;
use crate::transform::Transform;

/// Unordered set of 3D points with optional per point attributes.
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
    pub points: Array1<Vector3<f32>>,
    pub normals: Option<Array1<Vector3<f32>>>,
    /// RGB colors in `[0, 1]`.
    pub colors: Option<Array1<Vector3<f32>>>,
}

impl PointCloud {
    pub fn from_points(points: Array1<Vector3<f32>>) -> Self {
        Self {
            points,
            normals: None,
            colors: None,
        }
    }

    pub fn with_colors(mut self, colors: Option<Array1<Vector3<f32>>>) -> Self {
        self.colors = colors;
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Keeps only the points for which `keep` is true, in their current order.
    pub fn select(&self, keep: &[bool]) -> PointCloud {
        let select = |array: &Array1<Vector3<f32>>| -> Array1<Vector3<f32>> {
            array
                .iter()
                .zip(keep)
                .filter_map(|(value, keep)| keep.then_some(*value))
                .collect()
        };
        PointCloud {
            points: select(&self.points),
            normals: self.normals.as_ref().map(select),
            colors: self.colors.as_ref().map(select),
        }
    }

    /// Flips the normals that point away from the `location`, so all of them face it.
    pub fn orient_normals_towards(&mut self, location: &Vector3<f32>) {
        if let Some(normals) = self.normals.as_mut() {
            normals
                .iter_mut()
                .zip(self.points.iter())
                .for_each(|(normal, point)| {
                    if normal.dot(&(location - point)) < 0.0 {
                        *normal = -*normal;
                    }
                });
        }
    }
}

impl std::ops::Mul<&PointCloud> for &Transform {
    type Output = PointCloud;
    fn mul(self, rhs: &PointCloud) -> PointCloud {
        PointCloud {
            points: self * &rhs.points,
            normals: rhs.normals.as_ref().map(|normals| {
                normals.map(|normal| {
                    let normal = self.transform_vector(normal);
                    let magnitude = normal.magnitude();
                    if magnitude > 1e-6 {
                        normal / magnitude
                    } else {
                        normal
                    }
                })
            }),
            colors: rhs.colors.clone(),
        }
    }
}

/// Converts a `[0, 1]` color channel to 8 bits, saturating.
pub fn color_to_u8(value: f32) -> u8 {
    (num::clamp(value, 0.0, 1.0) * 255.0).round() as u8
}

impl From<PointCloud> for Geometry {
    fn from(pcl: PointCloud) -> Geometry {
        Geometry {
            points: pcl.points,
            normals: pcl.normals,
            colors: pcl
                .colors
                .map(|colors| colors.map(|color| color.map(color_to_u8))),
        }
    }
}
