//! Direct Linear Transform (DLT) PnP.
//!
//! Solves `[R | t]` linearly in normalized image coordinates from six or more
//! correspondences, then projects the rotation block onto SO(3).

use nalgebra::{DMatrix, Rotation3, Translation3, UnitQuaternion};
use rigcal_core::{pixel_to_normalized, CalibError, CalibResult, Iso3, Mat3, Pt2, Pt3, Real};

use super::check_pairs;
use crate::math::{mat34_from_svd_row, normalize_points_3d};

/// Minimum correspondences for the linear solve.
pub const DLT_MIN_POINTS: usize = 6;

/// Linear PnP over all points, returning `T_C_O` (object to camera).
pub fn dlt(object: &[Pt3], image: &[Pt2], k: &Mat3) -> CalibResult<Iso3> {
    check_pairs(object, image, DLT_MIN_POINTS)?;

    let (obj_n, t_obj) = normalize_points_3d(object)
        .ok_or_else(|| CalibError::degenerate("object points coincide"))?;

    let n = object.len();
    let mut a = DMatrix::<Real>::zeros(2 * n, 12);
    for (i, (p, px)) in obj_n.iter().zip(image).enumerate() {
        let m = pixel_to_normalized(px, k)
            .ok_or_else(|| CalibError::IntrinsicsUnavailable("K is not invertible".into()))?;
        let (u, v) = (m.x, m.y);
        let row = [p.x, p.y, p.z, 1.0];

        for j in 0..4 {
            a[(2 * i, j)] = row[j];
            a[(2 * i, 8 + j)] = -u * row[j];
            a[(2 * i + 1, 4 + j)] = row[j];
            a[(2 * i + 1, 8 + j)] = -v * row[j];
        }
    }

    let svd = a.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| CalibError::degenerate("svd failed in PnP DLT"))?;
    let p_mtx = mat34_from_svd_row(&v_t, v_t.nrows() - 1) * t_obj;

    let mut r_approx: Mat3 = p_mtx.fixed_view::<3, 3>(0, 0).into_owned();
    let mut s = (r_approx.row(0).norm() + r_approx.row(1).norm() + r_approx.row(2).norm()) / 3.0;
    if s <= Real::EPSILON {
        return Err(CalibError::degenerate("PnP DLT produced a null rotation block"));
    }
    if r_approx.determinant() < 0.0 {
        s = -s;
    }
    r_approx /= s;

    let svd = r_approx.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(CalibError::degenerate("svd failed in PnP DLT"));
    };
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u_fix = u;
        u_fix.column_mut(2).neg_mut();
        r = u_fix * v_t;
    }

    let t = p_mtx.column(3).into_owned() / s;
    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
    Ok(Iso3::from_parts(Translation3::from(t), rot))
}
