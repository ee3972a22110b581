//! Least-squares rigid alignment of two corresponding point sets.
//!
//! Absolute orientation via SVD (Kabsch / Arun): given `source[i] ↔ target[i]`
//! find `R ∈ SO(3)` and `t` minimizing `Σ |R source[i] + t - target[i]|²`.
//!
//! The rotation is recovered from the SVD of the cross-covariance
//! `H = Σ (s_i - s̄)(t_i - t̄)ᵗ = U Σ Vᵗ` as `R = V Uᵗ`. When that product is
//! a reflection, the singular vector of the smallest singular value is
//! negated, which yields the best proper rotation.

use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use rigcal_core::{centroid, CalibError, CalibResult, Iso3, Mat3, Pt3, Real};
use serde::{Deserialize, Serialize};

/// Minimum number of correspondences for a rigid alignment.
pub const MIN_RIGID_POINTS: usize = 3;

/// Relative singular-value floor below which the point sets are treated as
/// collinear or coincident.
const RANK_TOL: Real = 1e-9;

/// Result of [`RigidTransformEstimator::estimate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidAlignment {
    /// `T_target_source`: maps source-frame points into the target frame.
    pub target_se3_source: Iso3,
    /// RMS distance between the aligned source points and the target points.
    pub rms: Real,
    /// Largest single-point distance after alignment.
    pub max: Real,
    /// Whether the naive `V Uᵗ` was a reflection and had to be corrected.
    pub reflection_corrected: bool,
}

/// SVD-based point-set aligner.
#[derive(Debug, Clone, Copy, Default)]
pub struct RigidTransformEstimator;

impl RigidTransformEstimator {
    /// Estimate `T_target_source` from paired points.
    ///
    /// # Errors
    ///
    /// - [`CalibError::LengthMismatch`] if the slices differ in length,
    /// - [`CalibError::InsufficientCorrespondences`] for fewer than three pairs,
    /// - [`CalibError::DegenerateConfiguration`] for collinear or coincident sets.
    pub fn estimate(source: &[Pt3], target: &[Pt3]) -> CalibResult<RigidAlignment> {
        let (target_se3_source, reflection_corrected) = kabsch(source, target)?;

        let mut sum_sq = 0.0;
        let mut max: Real = 0.0;
        for (s, t) in source.iter().zip(target) {
            let d = (target_se3_source.transform_point(s) - t).norm();
            sum_sq += d * d;
            max = max.max(d);
        }
        let rms = (sum_sq / source.len() as Real).sqrt();

        log::debug!(
            "rigid alignment over {} pairs: rms {:.5}, max {:.5}, reflection corrected: {}",
            source.len(),
            rms,
            max,
            reflection_corrected
        );

        Ok(RigidAlignment {
            target_se3_source,
            rms,
            max,
            reflection_corrected,
        })
    }
}

/// Kabsch alignment returning `T_target_source` and whether the reflection
/// fix was applied.
pub(crate) fn kabsch(source: &[Pt3], target: &[Pt3]) -> CalibResult<(Iso3, bool)> {
    if source.len() != target.len() {
        return Err(CalibError::LengthMismatch {
            left: source.len(),
            right: target.len(),
        });
    }
    if source.len() < MIN_RIGID_POINTS {
        return Err(CalibError::InsufficientCorrespondences {
            required: MIN_RIGID_POINTS,
            actual: source.len(),
        });
    }

    let (Some(c_s), Some(c_t)) = (centroid(source), centroid(target)) else {
        return Err(CalibError::InsufficientCorrespondences {
            required: MIN_RIGID_POINTS,
            actual: 0,
        });
    };

    let mut h = Mat3::zeros();
    for (s, t) in source.iter().zip(target) {
        h += (s - c_s) * (t - c_t).transpose();
    }

    let svd = h.svd(true, true);
    let mut sv = [svd.singular_values[0], svd.singular_values[1], svd.singular_values[2]];
    sv.sort_by(|a, b| b.total_cmp(a));
    if sv[0] <= Real::EPSILON || sv[1] <= RANK_TOL * sv[0] {
        return Err(CalibError::degenerate(format!(
            "point sets are collinear or coincident (singular values {:.3e}, {:.3e}, {:.3e})",
            sv[0], sv[1], sv[2]
        )));
    }
    let weakest = svd.singular_values.imin();
    let u = svd
        .u
        .ok_or_else(|| CalibError::degenerate("svd did not produce U"))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| CalibError::degenerate("svd did not produce V"))?;

    let mut v = v_t.transpose();
    let mut r = v * u.transpose();
    let reflected = r.determinant() < 0.0;
    if reflected {
        v.column_mut(weakest).neg_mut();
        r = v * u.transpose();
    }

    let t = c_t.coords - r * c_s.coords;
    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
    Ok((Iso3::from_parts(Translation3::from(t), rot), reflected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigcal_core::transform::pose_error;
    use rigcal_core::Vec3;

    fn cube_points() -> Vec<Pt3> {
        vec![
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(1.0, 0.0, 0.0),
            Pt3::new(0.0, 1.0, 0.0),
            Pt3::new(0.0, 0.0, 1.0),
            Pt3::new(1.0, 1.0, 0.5),
            Pt3::new(-0.5, 0.3, 0.8),
        ]
    }

    #[test]
    fn recovers_known_transform() {
        let gt = Iso3::from_parts(
            Translation3::new(0.4, -1.2, 0.3),
            UnitQuaternion::from_euler_angles(0.3, -0.4, 1.2),
        );
        let src = cube_points();
        let dst: Vec<Pt3> = src.iter().map(|p| gt.transform_point(p)).collect();

        let est = RigidTransformEstimator::estimate(&src, &dst).unwrap();
        let (dt, ang) = pose_error(&est.target_se3_source, &gt);
        assert!(dt < 1e-9, "translation error too large: {dt}");
        assert!(ang < 1e-9, "rotation error too large: {ang}");
        assert!(est.rms < 1e-9);
        assert!(!est.reflection_corrected);

        let det = est
            .target_se3_source
            .rotation
            .to_rotation_matrix()
            .matrix()
            .determinant();
        assert!((det - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mirrored_target_yields_proper_rotation() {
        let src = cube_points();
        let dst: Vec<Pt3> = src.iter().map(|p| Pt3::new(p.x, p.y, -p.z)).collect();

        let est = RigidTransformEstimator::estimate(&src, &dst).unwrap();
        assert!(est.reflection_corrected);
        let det = est
            .target_se3_source
            .rotation
            .to_rotation_matrix()
            .matrix()
            .determinant();
        assert!((det - 1.0).abs() < 1e-12, "det = {det}");
        // A mirror image cannot be matched by a rigid motion.
        assert!(est.rms > 1e-3);
    }

    #[test]
    fn centroid_maps_onto_target_centroid() {
        let src = cube_points();
        let dst: Vec<Pt3> = src
            .iter()
            .enumerate()
            .map(|(i, p)| p + Vec3::new(2.0, 0.0, 0.0) + Vec3::repeat(0.01 * (i % 2) as Real))
            .collect();
        let est = RigidTransformEstimator::estimate(&src, &dst).unwrap();
        let c_s = centroid(&src).unwrap();
        let c_t = centroid(&dst).unwrap();
        assert!((est.target_se3_source.transform_point(&c_s) - c_t).norm() < 1e-12);
    }

    #[test]
    fn too_few_points_are_rejected() {
        let src = &cube_points()[..2];
        let err = RigidTransformEstimator::estimate(src, src).unwrap_err();
        assert!(matches!(
            err,
            CalibError::InsufficientCorrespondences {
                required: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let src: Vec<Pt3> = (0..5).map(|i| Pt3::new(i as Real, 2.0 * i as Real, 0.0)).collect();
        let err = RigidTransformEstimator::estimate(&src, &src).unwrap_err();
        assert!(matches!(err, CalibError::DegenerateConfiguration(_)), "{err}");
    }

    #[test]
    fn length_mismatch_is_reported() {
        let src = cube_points();
        let err = RigidTransformEstimator::estimate(&src, &src[..4]).unwrap_err();
        assert!(matches!(err, CalibError::LengthMismatch { left: 6, right: 4 }));
    }
}
