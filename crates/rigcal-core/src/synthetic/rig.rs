//! Synthetic multi-sensor rigs.
//!
//! A calibration target is moved through a set of positions expressed in the
//! reference frame; each sensor observes the same positions in its own frame.

use nalgebra::{Translation3, UnitQuaternion};

use crate::{
    models::{DistortionModel, IntrinsicsModel, ProjectionModel},
    Camera, Iso3, Pt2, Pt3, Real,
};

use super::noise::unit_triplet;

/// Build `ref_se3_sensor` from roll/pitch/yaw (radians) and a translation.
pub fn sensor_pose(rpy: [Real; 3], t: [Real; 3]) -> Iso3 {
    Iso3::from_parts(
        Translation3::new(t[0], t[1], t[2]),
        UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]),
    )
}

/// `n` target positions inside an axis-aligned box in front of the rig.
///
/// Positions are pseudo-random but deterministic in `seed` and spread in all
/// three axes, so they are neither collinear nor coplanar for `n >= 4`.
pub fn target_positions(n: usize, center: Pt3, half_extent: [Real; 3], seed: u64) -> Vec<Pt3> {
    (0..n)
        .map(|i| {
            let [x, y, z] = unit_triplet(seed, 0, i);
            Pt3::new(
                center.x + x * half_extent[0],
                center.y + y * half_extent[1],
                center.z + z * half_extent[2],
            )
        })
        .collect()
}

/// Express reference-frame points in the sensor frame (`p_s = T_S_R p_r`).
pub fn observe_points(ref_se3_sensor: &Iso3, points_ref: &[Pt3]) -> Vec<Pt3> {
    let sensor_se3_ref = ref_se3_sensor.inverse();
    points_ref
        .iter()
        .map(|p| sensor_se3_ref.transform_point(p))
        .collect()
}

/// Project reference-frame points into a camera mounted at `ref_se3_cam`.
///
/// Returns `None` if any point is behind the camera.
pub fn project_points<P, D, K>(
    camera: &Camera<Real, P, D, K>,
    ref_se3_cam: &Iso3,
    points_ref: &[Pt3],
) -> Option<Vec<Pt2>>
where
    P: ProjectionModel<Real>,
    D: DistortionModel<Real>,
    K: IntrinsicsModel<Real>,
{
    let cam_se3_ref = ref_se3_cam.inverse();
    points_ref
        .iter()
        .map(|p| {
            camera
                .project_point(&cam_se3_ref.transform_point(p))
                .map(Pt2::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FxFyCxCySkew, NoDistortion, Pinhole};

    #[test]
    fn positions_are_deterministic_and_inside_box() {
        let center = Pt3::new(3.0, 0.0, 0.5);
        let a = target_positions(15, center, [1.0, 2.0, 0.5], 7);
        let b = target_positions(15, center, [1.0, 2.0, 0.5], 7);
        assert_eq!(a, b);
        for p in &a {
            assert!((p.x - 3.0).abs() <= 1.0);
            assert!(p.y.abs() <= 2.0);
            assert!((p.z - 0.5).abs() <= 0.5);
        }
    }

    #[test]
    fn observed_points_map_back_to_reference() {
        let pose = sensor_pose([0.1, -0.2, 0.3], [0.4, 0.0, -0.1]);
        let pts = target_positions(5, Pt3::new(2.0, 0.0, 0.0), [0.5, 0.5, 0.5], 1);
        let obs = observe_points(&pose, &pts);
        for (p, o) in pts.iter().zip(&obs) {
            assert!((pose.transform_point(o) - p).norm() < 1e-12);
        }
    }

    #[test]
    fn projection_rejects_points_behind_camera() {
        let cam = Camera::new(
            Pinhole,
            NoDistortion,
            FxFyCxCySkew {
                fx: 500.0,
                fy: 500.0,
                cx: 320.0,
                cy: 240.0,
                skew: 0.0,
            },
        );
        let ahead = [Pt3::new(0.0, 0.0, 2.0)];
        let behind = [Pt3::new(0.0, 0.0, -2.0)];
        let px = project_points(&cam, &Iso3::identity(), &ahead).unwrap();
        assert!((px[0] - Pt2::new(320.0, 240.0)).norm() < 1e-12);
        assert!(project_points(&cam, &Iso3::identity(), &behind).is_none());
    }
}
