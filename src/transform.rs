use nalgebra::{Matrix4, Translation3, UnitQuaternion, Vector3, Vector4};
use ndarray::Array1;

use std::ops;

use crate::error::{Error, Result};

/// Smallest determinant accepted when inverting a transform.
const SINGULAR_EPSILON: f64 = 1e-12;

/// A 4x4 homogeneous transform (rig, camera or world frames).
///
/// Poses come from the device as plain row-major matrices, so this is kept as a general matrix
/// rather than an isometry. Inversion is fallible and reports singular inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform(Matrix4<f64>);

impl Transform {
    pub fn eye() -> Self {
        Self(Matrix4::identity())
    }

    pub fn from_matrix4(matrix: &Matrix4<f64>) -> Self {
        Self(*matrix)
    }

    pub fn from_parts(translation: &Vector3<f64>, rotation: &UnitQuaternion<f64>) -> Self {
        Self(
            Translation3::new(translation[0], translation[1], translation[2]).to_homogeneous()
                * rotation.to_homogeneous(),
        )
    }

    /// Creates a transform from 16 values in row-major order.
    pub fn from_row_slice(values: &[f64]) -> Result<Self> {
        if values.len() != 16 {
            return Err(Error::format(format!(
                "A 4x4 transform needs 16 values, got {}",
                values.len()
            )));
        }
        Ok(Self(Matrix4::from_row_slice(values)))
    }

    /// Inverse transform, `None` if the matrix is singular.
    pub fn try_inverse(&self) -> Option<Self> {
        if self.0.determinant().abs() < SINGULAR_EPSILON {
            return None;
        }
        self.0.try_inverse().map(Self)
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// Applies the transform to a point in homogeneous coordinates (w = 1) and drops the last
    /// coordinate.
    pub fn transform_point(&self, point: &Vector3<f32>) -> Vector3<f32> {
        let v = self.0 * Vector4::new(point[0] as f64, point[1] as f64, point[2] as f64, 1.0);
        Vector3::new(v[0] as f32, v[1] as f32, v[2] as f32)
    }

    /// Applies only the linear part of the transform. Use it on directions, e.g., normals.
    pub fn transform_vector(&self, vector: &Vector3<f32>) -> Vector3<f32> {
        let linear = self.0.fixed_slice::<3, 3>(0, 0);
        let v = linear * Vector3::new(vector[0] as f64, vector[1] as f64, vector[2] as f64);
        Vector3::new(v[0] as f32, v[1] as f32, v[2] as f32)
    }

    /// Position of the frame's origin, `T * [0, 0, 0, 1]`. For a camera-to-world
    /// transform this is the camera center.
    pub fn camera_center(&self) -> Vector3<f64> {
        let v = self.0 * Vector4::new(0.0, 0.0, 0.0, 1.0);
        Vector3::new(v[0], v[1], v[2])
    }
}

impl ops::Mul<&Vector3<f32>> for &Transform {
    type Output = Vector3<f32>;

    fn mul(self, rhs: &Vector3<f32>) -> Self::Output {
        self.transform_point(rhs)
    }
}

impl ops::Mul<&Array1<Vector3<f32>>> for &Transform {
    type Output = Array1<Vector3<f32>>;

    fn mul(self, rhs: &Array1<Vector3<f32>>) -> Self::Output {
        rhs.map(|point| self.transform_point(point))
    }
}

impl ops::Mul<&Transform> for &Transform {
    type Output = Transform;

    fn mul(self, rhs: &Transform) -> Self::Output {
        Transform(self.0 * rhs.0)
    }
}

impl From<Transform> for Matrix4<f64> {
    fn from(transform: Transform) -> Self {
        transform.0
    }
}
