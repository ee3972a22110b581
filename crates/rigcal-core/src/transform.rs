//! Rigid-transform helpers.
//!
//! Conventions: `a_se3_b` (written `T_A_B`) maps points expressed in frame `B`
//! into frame `A`, so `p_a = T_A_B * p_b`. Composition follows 4×4 homogeneous
//! matrix multiplication: `T_A_C = T_A_B * T_B_C`.

use nalgebra::{Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::{CalibError, CalibResult, Iso3, Mat3, Mat4, Real, Vec3};

const ORTHONORMAL_TOL: Real = 1e-6;

/// Inverse transform: `T_B_A` from `T_A_B`.
///
/// Uses the closed form `(Rᵗ, -Rᵗ t)`.
pub fn invert(t: &Iso3) -> Iso3 {
    t.inverse()
}

/// Apply `first`, then `second`.
///
/// If `first = T_B_A` and `second = T_C_B`, the result is `T_C_A`.
pub fn compose(first: &Iso3, second: &Iso3) -> Iso3 {
    second * first
}

/// Build a transform from a rotation matrix and a translation, rejecting
/// matrices that are not proper rotations.
pub fn from_rotation_translation(r: &Mat3, t: &Vec3) -> CalibResult<Iso3> {
    check_rotation(r)?;
    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*r));
    Ok(Iso3::from_parts(Translation3::from(*t), rot))
}

/// Build a transform from a homogeneous 4×4 matrix.
pub fn from_matrix4(m: &Mat4) -> CalibResult<Iso3> {
    let bottom = m.fixed_view::<1, 4>(3, 0);
    let expected = nalgebra::RowVector4::new(0.0, 0.0, 0.0, 1.0);
    if (bottom - expected).abs().max() > ORTHONORMAL_TOL {
        return Err(CalibError::degenerate(
            "homogeneous matrix must end with row [0, 0, 0, 1]",
        ));
    }
    let r: Mat3 = m.fixed_view::<3, 3>(0, 0).into_owned();
    let t: Vec3 = m.fixed_view::<3, 1>(0, 3).into_owned();
    from_rotation_translation(&r, &t)
}

/// Homogeneous 4×4 matrix of a transform.
pub fn to_matrix4(t: &Iso3) -> Mat4 {
    t.to_homogeneous()
}

/// Check that `r` is orthonormal with determinant `+1`.
pub fn check_rotation(r: &Mat3) -> CalibResult<()> {
    let det = r.determinant();
    let ortho_err = (r.transpose() * r - Mat3::identity()).abs().max();
    if ortho_err > ORTHONORMAL_TOL || (det - 1.0).abs() > ORTHONORMAL_TOL {
        return Err(CalibError::ImproperRotation { det });
    }
    Ok(())
}

/// Translation distance and rotation angle (radians) between two transforms.
pub fn pose_error(a: &Iso3, b: &Iso3) -> (Real, Real) {
    let dt = (a.translation.vector - b.translation.vector).norm();
    let q = (a.rotation.inverse() * b.rotation).into_inner();
    (dt, 2.0 * q.imag().norm().atan2(q.w.abs()))
}

/// Fixed re-orientation applied to an estimated sensor pose.
///
/// Cameras report points with `+Z` along the optical axis while the rig uses
/// `+X` as its forward axis; the correction is right-multiplied onto the
/// estimated `T_R_S`, i.e. it re-expresses the sensor frame only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AxisCorrection {
    /// Rotation of −90° about the sensor `Y` axis.
    OpticalToForward,
    /// Arbitrary roll/pitch/yaw (radians), applied as `Rz(yaw) Ry(pitch) Rx(roll)`.
    Euler { roll: Real, pitch: Real, yaw: Real },
}

impl AxisCorrection {
    /// The correction as a pure rotation.
    pub fn rotation(&self) -> Iso3 {
        let rot = match *self {
            AxisCorrection::OpticalToForward => {
                UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -std::f64::consts::FRAC_PI_2)
            }
            AxisCorrection::Euler { roll, pitch, yaw } => {
                UnitQuaternion::from_euler_angles(roll, pitch, yaw)
            }
        };
        Iso3::from_parts(Translation3::identity(), rot)
    }

    /// Apply the correction to `ref_se3_sensor`.
    pub fn apply(&self, ref_se3_sensor: &Iso3) -> Iso3 {
        ref_se3_sensor * self.rotation()
    }
}
