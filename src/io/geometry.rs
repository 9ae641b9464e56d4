use nalgebra::Vector3;
use ndarray::Array1;

/// Generic representation of the attributes written to point cloud files.
#[derive(Clone, Debug, Default)]
pub struct Geometry {
    /// The 3D points.
    pub points: Array1<Vector3<f32>>,
    /// The RGB colors.
    pub colors: Option<Array1<Vector3<u8>>>,
    /// Per vertices normals.
    pub normals: Option<Array1<Vector3<f32>>>,
}

impl Geometry {
    pub fn len_vertices(&self) -> usize {
        self.points.len()
    }
}
