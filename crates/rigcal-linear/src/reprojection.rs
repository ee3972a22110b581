//! Reprojection diagnostics for camera poses.

use rigcal_core::{
    Camera, CalibError, CalibResult, DistortionModel, FxFyCxCySkew, IntrinsicsModel, Iso3,
    NoDistortion, Pinhole, ProjectionModel, Pt2, Pt3, Real,
};
use serde::{Deserialize, Serialize};

/// Pixel discrepancy between observed and predicted image points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReprojectionError {
    /// L2 norm of the stacked per-point differences.
    pub norm: Real,
    pub rms: Real,
    pub max: Real,
    /// Per-point pixel distance; infinite for points on or behind the camera.
    pub per_point: Vec<Real>,
}

impl ReprojectionError {
    fn from_distances(per_point: Vec<Real>) -> Self {
        let sum_sq: Real = per_point.iter().map(|d| d * d).sum();
        let n = per_point.len().max(1) as Real;
        Self {
            norm: sum_sq.sqrt(),
            rms: (sum_sq / n).sqrt(),
            max: per_point.iter().copied().fold(0.0, Real::max),
            per_point,
        }
    }

    /// Whether the aggregate error is above `limit` pixels. Not a failure by
    /// itself; callers surface it.
    pub fn exceeds(&self, limit: Real) -> bool {
        self.norm.is_nan() || self.norm > limit
    }
}

/// Projects object points through a pose and a camera and compares them
/// against observed pixels. Pure; never mutates its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReprojectionVerifier;

impl ReprojectionVerifier {
    /// Pinhole check without distortion; `cam_se3_object` is `T_C_O`.
    pub fn verify(
        object: &[Pt3],
        image: &[Pt2],
        cam_se3_object: &Iso3,
        k: &FxFyCxCySkew<Real>,
    ) -> CalibResult<ReprojectionError> {
        let camera = Camera::new(Pinhole, NoDistortion, *k);
        Self::verify_with_camera(&camera, object, image, cam_se3_object)
    }

    /// Same check through an arbitrary camera model.
    pub fn verify_with_camera<P, D, K>(
        camera: &Camera<Real, P, D, K>,
        object: &[Pt3],
        image: &[Pt2],
        cam_se3_object: &Iso3,
    ) -> CalibResult<ReprojectionError>
    where
        P: ProjectionModel<Real>,
        D: DistortionModel<Real>,
        K: IntrinsicsModel<Real>,
    {
        if object.len() != image.len() {
            return Err(CalibError::LengthMismatch {
                left: object.len(),
                right: image.len(),
            });
        }

        let per_point = object
            .iter()
            .zip(image)
            .map(|(p, px)| {
                camera
                    .project_point(&cam_se3_object.transform_point(p))
                    .map_or(Real::INFINITY, |uv| (uv - px.coords).norm())
            })
            .collect();
        Ok(ReprojectionError::from_distances(per_point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pnp::test_support::{scene, K};
    use nalgebra::{Translation3, UnitQuaternion};

    #[test]
    fn exact_pose_has_zero_error() {
        let (gt, object, image) = scene(10);
        let err = ReprojectionVerifier::verify(&object, &image, &gt, &K).unwrap();
        assert!(err.norm < 1e-9, "norm {}", err.norm);
        assert_eq!(err.per_point.len(), 10);
        assert!(!err.exceeds(1.0));
    }

    #[test]
    fn offset_pixels_are_measured() {
        let (gt, object, mut image) = scene(4);
        image[2].x += 3.0;
        image[3].y -= 4.0;
        let err = ReprojectionVerifier::verify(&object, &image, &gt, &K).unwrap();
        assert!((err.norm - 5.0).abs() < 1e-9);
        assert!((err.max - 4.0).abs() < 1e-9);
        assert!((err.rms - 2.5).abs() < 1e-9);
        assert!(err.exceeds(4.9));
    }

    #[test]
    fn points_behind_camera_are_infinite() {
        let (_, object, image) = scene(4);
        let flipped = Iso3::from_parts(
            Translation3::new(0.0, 0.0, -3.0),
            UnitQuaternion::identity(),
        );
        let err = ReprojectionVerifier::verify(&object, &image, &flipped, &K).unwrap();
        assert!(err.norm.is_infinite());
        assert!(err.exceeds(1e6));
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let (gt, object, image) = scene(4);
        assert!(ReprojectionVerifier::verify(&object, &image[..3], &gt, &K).is_err());
    }
}
