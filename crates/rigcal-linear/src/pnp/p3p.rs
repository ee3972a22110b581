//! P3P minimal solver.
//!
//! Grunert-style elimination: with bearings `b_i` and unknown depths
//! `x, y = u x, z = v x` of the three points, the law of cosines on the
//! triangle sides gives a quartic in `u`. Each real root yields camera-frame
//! points whose rigid alignment with the object points is a pose candidate.

use nalgebra::Vector3;
use rigcal_core::{CalibError, CalibResult, Iso3, Mat3, Pt2, Pt3, Real};

use super::check_pairs;
use crate::math::solve_quartic_real;
use crate::rigid::kabsch;

/// Product of two polynomials in ascending-power form, truncated to degree 4.
fn poly_mul(a: &[Real; 5], b: &[Real; 5]) -> [Real; 5] {
    let mut out = [0.0; 5];
    for i in 0..5 {
        for j in 0..(5 - i) {
            out[i + j] += a[i] * b[j];
        }
    }
    out
}

/// Up to four `T_C_O` candidates from exactly three correspondences, sorted
/// by the depth of the first point.
pub fn p3p(object: &[Pt3], image: &[Pt2], k: &Mat3) -> CalibResult<Vec<Iso3>> {
    check_pairs(object, image, 3)?;
    if object.len() != 3 {
        return Err(CalibError::degenerate(format!(
            "P3P takes exactly three points, got {}",
            object.len()
        )));
    }

    let k_inv = k
        .try_inverse()
        .ok_or_else(|| CalibError::IntrinsicsUnavailable("K is not invertible".into()))?;
    let bearings: Vec<Vector3<Real>> = image
        .iter()
        .map(|px| (k_inv * Vector3::new(px.x, px.y, 1.0)).normalize())
        .collect();

    let a = (object[1] - object[2]).norm();
    let b = (object[0] - object[2]).norm();
    let c = (object[0] - object[1]).norm();
    let area2 = (object[1] - object[0]).cross(&(object[2] - object[0])).norm();
    if a.min(b).min(c) <= Real::EPSILON || area2 <= 1e-12 * (a * b).max(Real::EPSILON) {
        return Err(CalibError::degenerate("P3P object points are collinear"));
    }

    let cos_alpha = bearings[1].dot(&bearings[2]);
    let cos_beta = bearings[0].dot(&bearings[2]);
    let cos_gamma = bearings[0].dot(&bearings[1]);

    let (a2, b2, c2) = (a * a, b * b, c * c);
    let d = (b2 - a2) / c2;
    let e = b2 / c2;

    // v(u) = N(u) / D(u), substituted into the remaining constraint.
    let n_poly = [1.0 - d, 2.0 * d * cos_gamma, -(1.0 + d), 0.0, 0.0];
    let d_poly = [2.0 * cos_beta, -2.0 * cos_alpha, 0.0, 0.0, 0.0];
    let e_poly = [1.0 - e, 2.0 * e * cos_gamma, -e, 0.0, 0.0];

    let nn = poly_mul(&n_poly, &n_poly);
    let nd = poly_mul(&n_poly, &d_poly);
    let edd = poly_mul(&e_poly, &poly_mul(&d_poly, &d_poly));
    let coeffs: [Real; 5] = std::array::from_fn(|i| nn[i] - 2.0 * cos_beta * nd[i] + edd[i]);

    let roots = solve_quartic_real(coeffs[4], coeffs[3], coeffs[2], coeffs[1], coeffs[0]);

    let mut solutions = Vec::with_capacity(roots.len());
    for u in roots {
        let den = 2.0 * (cos_beta - u * cos_alpha);
        let k_val = 1.0 + u * u - 2.0 * u * cos_gamma;
        if den.abs() < 1e-12 || k_val.abs() < 1e-12 {
            continue;
        }
        let v = (n_poly[0] + n_poly[1] * u + n_poly[2] * u * u) / den;

        let x2 = c2 / k_val;
        if x2 <= 0.0 || u <= 0.0 || v <= 0.0 {
            continue;
        }
        let x = x2.sqrt();
        let cam = [
            Pt3::from(bearings[0] * x),
            Pt3::from(bearings[1] * (u * x)),
            Pt3::from(bearings[2] * (v * x)),
        ];
        if let Ok((pose, _)) = kabsch(object, &cam) {
            solutions.push((x, pose));
        }
    }

    if solutions.is_empty() {
        return Err(CalibError::degenerate("P3P polynomial has no admissible root"));
    }
    solutions.sort_by(|l, r| l.0.total_cmp(&r.0));
    Ok(solutions.into_iter().map(|(_, pose)| pose).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pnp::test_support::{scene, K};
    use rigcal_core::transform::pose_error;

    #[test]
    fn p3p_recovers_pose_from_minimal_set() {
        let (gt, object, image) = scene(3);
        let sols = p3p(&object, &image, &K.k_matrix()).unwrap();
        assert!(!sols.is_empty() && sols.len() <= 4);

        let best = sols
            .iter()
            .map(|est| pose_error(est, &gt))
            .fold((f64::INFINITY, f64::INFINITY), |acc, e| {
                if e.0 < acc.0 {
                    e
                } else {
                    acc
                }
            });
        assert!(best.0 < 1e-5, "translation error too large: {}", best.0);
        assert!(best.1 < 1e-5, "rotation error too large: {}", best.1);
    }

    #[test]
    fn collinear_triplet_is_degenerate() {
        let object = [
            Pt3::new(0.0, 0.0, 3.0),
            Pt3::new(0.1, 0.0, 3.0),
            Pt3::new(0.2, 0.0, 3.0),
        ];
        let image = [
            Pt2::new(320.0, 240.0),
            Pt2::new(340.0, 240.0),
            Pt2::new(360.0, 240.0),
        ];
        assert!(p3p(&object, &image, &K.k_matrix()).is_err());
    }
}
