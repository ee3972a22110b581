//! Perspective-n-Point (PnP) pose estimation.
//!
//! Includes:
//! - DLT (linear) pose with normalization, six or more points.
//! - P3P minimal solver (three points, up to four candidates).
//! - Levenberg-Marquardt refinement of the pixel reprojection error.
//! - P3P wrapped in RANSAC for outlier rejection.
//!
//! Solvers estimate `T_C_O`, the transform from object (reference sensor)
//! coordinates into the camera frame. [`PerspectivePoseEstimator`] also
//! reports its inverse `T_O_C`, which is what a rig graph stores.

use rigcal_core::{
    CalibError, CalibResult, FxFyCxCySkew, Iso3, Mat3, Pt2, Pt3, RansacOptions, Real,
};
use serde::{Deserialize, Serialize};

use crate::reprojection::ReprojectionVerifier;

mod dlt;
mod p3p;
mod ransac;
mod refine;

pub use dlt::{dlt, DLT_MIN_POINTS};
pub use p3p::p3p;
pub use ransac::pnp_ransac;
pub use refine::{refine_pose, RefineOptions};

/// Minimum correspondences for either PnP mode.
pub const PNP_MIN_POINTS: usize = 4;

/// Options for both PnP modes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnpOptions {
    /// Consensus search settings; `thresh` is in pixels.
    pub ransac: RansacOptions,
    pub refine: RefineOptions,
}

/// Result of [`PerspectivePoseEstimator::estimate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    /// `T_C_O`: object (reference) coordinates into the camera frame.
    pub cam_se3_object: Iso3,
    /// `T_O_C`: the camera pose in the object (reference) frame.
    pub object_se3_cam: Iso3,
    /// L2 norm of the stacked pixel differences over all correspondences.
    pub residual: Real,
    /// RMS pixel error over all correspondences.
    pub rms: Real,
    /// Correspondences within the RANSAC threshold; every index in
    /// deterministic mode.
    pub inliers: Vec<usize>,
    pub robust: bool,
}

pub(crate) fn check_pairs(object: &[Pt3], image: &[Pt2], required: usize) -> CalibResult<()> {
    if object.len() != image.len() {
        return Err(CalibError::LengthMismatch {
            left: object.len(),
            right: image.len(),
        });
    }
    if object.len() < required {
        return Err(CalibError::InsufficientCorrespondences {
            required,
            actual: object.len(),
        });
    }
    Ok(())
}

/// Index triples spread over the point list, used to seed P3P.
fn seed_triples(n: usize) -> Vec<[usize; 3]> {
    let mut triples = vec![[0, n / 2, n - 1], [0, 1, 2], [n / 3, 2 * n / 3, n - 1]];
    triples.retain(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2]);
    triples.dedup();
    triples
}

/// Deterministic PnP: best of the DLT/P3P seeds, then LM refinement over all
/// points. Returns `T_C_O`.
pub(crate) fn solve_deterministic(
    object: &[Pt3],
    image: &[Pt2],
    k: &Mat3,
    refine: &RefineOptions,
) -> CalibResult<Iso3> {
    check_pairs(object, image, PNP_MIN_POINTS)?;

    let mut seeds = Vec::new();
    if object.len() >= DLT_MIN_POINTS {
        match dlt(object, image, k) {
            Ok(pose) => seeds.push(pose),
            Err(err) => log::debug!("pnp: DLT seed unavailable: {err}"),
        }
    }
    for [i, j, l] in seed_triples(object.len()) {
        let obj = [object[i], object[j], object[l]];
        let img = [image[i], image[j], image[l]];
        if let Ok(candidates) = p3p(&obj, &img, k) {
            seeds.extend(candidates);
        }
    }

    let best = seeds
        .iter()
        .map(|pose| (refine::sum_squared_error(object, image, k, pose), pose))
        .filter(|(e, _)| e.is_finite())
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, pose)| *pose)
        .ok_or_else(|| {
            CalibError::degenerate("no PnP seed places the points in front of the camera")
        })?;

    Ok(refine_pose(object, image, k, &best, refine))
}

/// Camera pose from 3D reference points and their pixel observations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerspectivePoseEstimator;

impl PerspectivePoseEstimator {
    /// Estimate the camera pose.
    ///
    /// Pixels are assumed undistorted. With `robust == false` every point
    /// takes part in the least-squares fit; with `robust == true` a RANSAC
    /// consensus set is found first and refit. The residual always covers all
    /// points and is reported, never used to reject the estimate.
    pub fn estimate(
        object: &[Pt3],
        image: &[Pt2],
        k: &FxFyCxCySkew<Real>,
        robust: bool,
        opts: &PnpOptions,
    ) -> CalibResult<PoseEstimate> {
        let kmtx = k.k_matrix();
        let (cam_se3_object, inliers) = if robust {
            pnp_ransac(object, image, &kmtx, &opts.ransac, &opts.refine)?
        } else {
            let pose = solve_deterministic(object, image, &kmtx, &opts.refine)?;
            (pose, (0..object.len()).collect())
        };

        let err = ReprojectionVerifier::verify(object, image, &cam_se3_object, k)?;
        Ok(PoseEstimate {
            cam_se3_object,
            object_se3_cam: cam_se3_object.inverse(),
            residual: err.norm,
            rms: err.rms,
            inliers,
            robust,
        })
    }
}
