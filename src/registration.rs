use crate::error::SkipReason;
use crate::pointcloud::PointCloud;
use crate::transform::Transform;

/// Composes the depth camera to world transform of a frame: `rig_to_world * rig_to_cam⁻¹`.
pub fn camera_to_world(
    rig_to_cam: &Transform,
    rig_to_world: &Transform,
) -> Result<Transform, SkipReason> {
    let cam_to_rig = rig_to_cam
        .try_inverse()
        .ok_or(SkipReason::SingularTransform)?;
    Ok(rig_to_world * &cam_to_rig)
}

/// Maps camera space points into world space.
///
/// # Returns
///
/// * The world points and the composed camera to world transform, which later gives
///   the camera center and the extrinsic of the frame.
pub fn cam2world(
    points: &PointCloud,
    rig_to_cam: &Transform,
    rig_to_world: &Transform,
) -> Result<(PointCloud, Transform), SkipReason> {
    let transform = camera_to_world(rig_to_cam, rig_to_world)?;
    Ok((&transform * points, transform))
}

/// Maps world points back into the camera space of `cam_to_world`.
pub fn world2cam(points: &PointCloud, cam_to_world: &Transform) -> Result<PointCloud, SkipReason> {
    let world_to_cam = cam_to_world
        .try_inverse()
        .ok_or(SkipReason::SingularTransform)?;
    Ok(&world_to_cam * points)
}

/// Orients the normals of world points to face the camera with the `cam_to_world` pose.
pub fn orient_normals_towards_camera(points: &mut PointCloud, cam_to_world: &Transform) {
    points.orient_normals_towards(&cam_to_world.camera_center().cast::<f32>());
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix4, UnitQuaternion, Vector3};
    use ndarray::{array, Array1};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn random_transform(rng: &mut SmallRng) -> Transform {
        Transform::from_parts(
            &Vector3::new(
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
            ),
            &UnitQuaternion::from_euler_angles(
                rng.gen_range(-3.1..3.1),
                rng.gen_range(-1.5..1.5),
                rng.gen_range(-3.1..3.1),
            ),
        )
    }

    #[test]
    fn should_be_inverse_of_world2cam() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..20 {
            let rig_to_cam = random_transform(&mut rng);
            let rig_to_world = random_transform(&mut rng);
            let points: Array1<Vector3<f32>> = (0..16)
                .map(|_| {
                    Vector3::new(
                        rng.gen_range(-2.0..2.0),
                        rng.gen_range(-2.0..2.0),
                        rng.gen_range(0.2..4.0),
                    )
                })
                .collect();
            let pcl = PointCloud::from_points(points.clone());

            let (world, transform) = cam2world(&pcl, &rig_to_cam, &rig_to_world).unwrap();
            let back = world2cam(&world, &transform).unwrap();
            for (expected, actual) in points.iter().zip(back.points.iter()) {
                assert_abs_diff_eq!(*expected, *actual, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn should_compose_rig_pose_with_inverse_extrinsic() {
        let rig_to_cam = Transform::from_parts(
            &Vector3::new(0.0, 0.0, 0.5),
            &UnitQuaternion::identity(),
        );
        let rig_to_world = Transform::from_parts(
            &Vector3::new(1.0, 2.0, 3.0),
            &UnitQuaternion::identity(),
        );
        let (world, transform) = cam2world(
            &PointCloud::from_points(array![Vector3::new(0.0, 0.0, 1.0)]),
            &rig_to_cam,
            &rig_to_world,
        )
        .unwrap();

        assert_abs_diff_eq!(
            transform.camera_center(),
            Vector3::new(1.0, 2.0, 2.5),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(world.points[0], Vector3::new(1.0, 2.0, 3.5), epsilon = 1e-6);
    }

    #[test]
    fn should_skip_singular_extrinsic() {
        let singular = Transform::from_matrix4(&Matrix4::zeros());
        let pcl = PointCloud::from_points(array![Vector3::new(0.0, 0.0, 1.0)]);
        assert_eq!(
            cam2world(&pcl, &singular, &Transform::eye()).err(),
            Some(SkipReason::SingularTransform)
        );
        assert_eq!(
            world2cam(&pcl, &singular).err(),
            Some(SkipReason::SingularTransform)
        );
    }

    #[test]
    fn should_orient_normals_to_camera_center() {
        let cam_to_world = Transform::from_parts(
            &Vector3::new(0.0, 0.0, 5.0),
            &UnitQuaternion::identity(),
        );
        let mut pcl = PointCloud::from_points(array![Vector3::new(0.0, 0.0, 0.0)]);
        pcl.normals = Some(array![Vector3::new(0.0, 0.0, -1.0)]);
        orient_normals_towards_camera(&mut pcl, &cam_to_world);
        assert_eq!(pcl.normals.unwrap()[0], Vector3::new(0.0, 0.0, 1.0));
    }
}
