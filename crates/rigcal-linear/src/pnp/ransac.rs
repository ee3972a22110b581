//! RANSAC PnP.
//!
//! Minimal samples are four correspondences: P3P on the first three, the
//! fourth picks among the up-to-four candidates. Each hypothesis is scored by
//! pixel reprojection error and the consensus set is refit with the
//! deterministic solver.

use rigcal_core::{
    ransac_fit, CalibError, CalibResult, Estimator, Iso3, Mat3, Pt2, Pt3, RansacOptions,
};

use super::refine::{sum_squared_error, RefineOptions};
use super::{check_pairs, p3p, solve_deterministic};

#[derive(Clone)]
struct PnpDatum {
    object: Pt3,
    pixel: Pt2,
    k: Mat3,
    refine: RefineOptions,
}

struct P3pEstimator;

impl P3pEstimator {
    fn split(data: &[PnpDatum], indices: &[usize]) -> (Vec<Pt3>, Vec<Pt2>) {
        indices
            .iter()
            .map(|&i| (data[i].object, data[i].pixel))
            .unzip()
    }
}

impl Estimator for P3pEstimator {
    type Datum = PnpDatum;
    type Model = Iso3;

    const MIN_SAMPLES: usize = 4;

    fn fit(data: &[Self::Datum], sample_indices: &[usize]) -> Option<Self::Model> {
        let (object, image) = Self::split(data, sample_indices);
        let k = &data[sample_indices[0]].k;
        let candidates = p3p::p3p(&object[..3], &image[..3], k).ok()?;
        candidates
            .into_iter()
            .map(|pose| {
                let e = sum_squared_error(&object[3..], &image[3..], k, &pose);
                (e, pose)
            })
            .filter(|(e, _)| e.is_finite())
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, pose)| pose)
    }

    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64 {
        sum_squared_error(
            std::slice::from_ref(&datum.object),
            std::slice::from_ref(&datum.pixel),
            &datum.k,
            model,
        )
        .sqrt()
    }

    fn is_degenerate(data: &[Self::Datum], sample_indices: &[usize]) -> bool {
        let [a, b, c] = [0, 1, 2].map(|i| data[sample_indices[i]].object);
        (b - a).cross(&(c - a)).norm() <= 1e-12
    }

    fn refit(data: &[Self::Datum], inliers: &[usize]) -> Option<Self::Model> {
        let (object, image) = Self::split(data, inliers);
        let first = &data[*inliers.first()?];
        solve_deterministic(&object, &image, &first.k, &first.refine).ok()
    }
}

/// Robust `T_C_O` with the consensus set (ascending indices).
pub fn pnp_ransac(
    object: &[Pt3],
    image: &[Pt2],
    k: &Mat3,
    ransac: &RansacOptions,
    refine: &RefineOptions,
) -> CalibResult<(Iso3, Vec<usize>)> {
    check_pairs(object, image, P3pEstimator::MIN_SAMPLES)?;

    let data: Vec<PnpDatum> = object
        .iter()
        .zip(image)
        .map(|(&object, &pixel)| PnpDatum {
            object,
            pixel,
            k: *k,
            refine: refine.clone(),
        })
        .collect();

    let res = ransac_fit::<P3pEstimator>(&data, ransac);
    let Some(pose) = res.model.filter(|_| res.success) else {
        return Err(CalibError::NoConsensus);
    };

    // Final deterministic fit over the consensus set.
    let (obj_in, img_in) = P3pEstimator::split(&data, &res.inliers);
    let pose = solve_deterministic(&obj_in, &img_in, k, refine).unwrap_or(pose);
    let inliers: Vec<usize> = data
        .iter()
        .enumerate()
        .filter(|(_, d)| P3pEstimator::residual(&pose, d) <= ransac.thresh)
        .map(|(i, _)| i)
        .collect();

    if inliers.len() < ransac.min_inliers.max(P3pEstimator::MIN_SAMPLES) {
        return Err(CalibError::NoConsensus);
    }
    log::debug!(
        "pnp ransac: {} / {} inliers after {} iterations",
        inliers.len(),
        data.len(),
        res.iters
    );
    Ok((pose, inliers))
}
