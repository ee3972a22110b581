//! Levenberg-Marquardt refinement of a PnP pose.
//!
//! Parameters are `[ω; t]` with `ω` the rotation vector of `T_C_O`.
//! Residuals are pinhole pixel errors `π(K, T_C_O p_i) - x_i`, stacked as
//! `2N` values; the Jacobian is taken by central differences.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn, Vector3};
use rigcal_core::{Iso3, Mat3, Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};

/// Termination settings for the LM solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineOptions {
    /// Evaluation budget, scaled by `(n + 1)` inside the solver (MINPACK convention).
    pub max_iters: usize,
    pub ftol: Real,
    pub xtol: Real,
    pub gtol: Real,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
        }
    }
}

const JACOBIAN_STEP: Real = 1e-6;

fn params_to_pose(x: &DVector<Real>) -> Iso3 {
    Iso3::new(Vector3::new(x[3], x[4], x[5]), Vector3::new(x[0], x[1], x[2]))
}

fn pose_to_params(pose: &Iso3) -> DVector<Real> {
    let w = pose.rotation.scaled_axis();
    let t = pose.translation.vector;
    DVector::from_column_slice(&[w.x, w.y, w.z, t.x, t.y, t.z])
}

/// Pinhole projection through `K`, without a cheirality check.
fn project(k: &Mat3, pose: &Iso3, p: &Pt3) -> (Real, Real) {
    let pc = pose.transform_point(p);
    let (x, y) = (pc.x / pc.z, pc.y / pc.z);
    (
        k[(0, 0)] * x + k[(0, 1)] * y + k[(0, 2)],
        k[(1, 1)] * y + k[(1, 2)],
    )
}

struct PnpProblem<'a> {
    object: &'a [Pt3],
    image: &'a [Pt2],
    k: &'a Mat3,
    params: DVector<Real>,
}

impl PnpProblem<'_> {
    fn residuals_at(&self, x: &DVector<Real>) -> DVector<Real> {
        let pose = params_to_pose(x);
        let mut r = DVector::zeros(2 * self.object.len());
        for (i, (p, px)) in self.object.iter().zip(self.image).enumerate() {
            let (u, v) = project(self.k, &pose, p);
            r[2 * i] = u - px.x;
            r[2 * i + 1] = v - px.y;
        }
        r
    }
}

impl LeastSquaresProblem<Real, Dyn, Dyn> for PnpProblem<'_> {
    type ResidualStorage = Owned<Real, Dyn>;
    type JacobianStorage = Owned<Real, Dyn, Dyn>;
    type ParameterStorage = Owned<Real, Dyn>;

    fn set_params(&mut self, x: &DVector<Real>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<Real> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<Real>> {
        let r = self.residuals_at(&self.params);
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    fn jacobian(&self) -> Option<DMatrix<Real>> {
        let mut jac = DMatrix::zeros(2 * self.object.len(), 6);
        for j in 0..6 {
            let mut plus = self.params.clone();
            let mut minus = self.params.clone();
            plus[j] += JACOBIAN_STEP;
            minus[j] -= JACOBIAN_STEP;
            let col = (self.residuals_at(&plus) - self.residuals_at(&minus)) / (2.0 * JACOBIAN_STEP);
            jac.set_column(j, &col);
        }
        jac.iter().all(|v| v.is_finite()).then_some(jac)
    }
}

/// Sum of squared pixel residuals of `pose`; infinite for points that end up
/// on or behind the image plane.
pub(crate) fn sum_squared_error(object: &[Pt3], image: &[Pt2], k: &Mat3, pose: &Iso3) -> Real {
    object
        .iter()
        .zip(image)
        .map(|(p, px)| {
            if pose.transform_point(p).z <= 0.0 {
                return Real::INFINITY;
            }
            let (u, v) = project(k, pose, p);
            (u - px.x).powi(2) + (v - px.y).powi(2)
        })
        .sum()
}

/// Minimize the pixel reprojection error of `initial` (`T_C_O`).
///
/// The refined pose is returned only if it does not increase the error.
pub fn refine_pose(
    object: &[Pt3],
    image: &[Pt2],
    k: &Mat3,
    initial: &Iso3,
    opts: &RefineOptions,
) -> Iso3 {
    let problem = PnpProblem {
        object,
        image,
        k,
        params: pose_to_params(initial),
    };
    let lm = LevenbergMarquardt::new()
        .with_ftol(opts.ftol)
        .with_xtol(opts.xtol)
        .with_gtol(opts.gtol)
        .with_patience(opts.max_iters.max(1));

    let (problem, report) = lm.minimize(problem);
    let refined = params_to_pose(&problem.params);

    let before = sum_squared_error(object, image, k, initial);
    let after = sum_squared_error(object, image, k, &refined);
    log::debug!(
        "pnp refine: {:?} after {} evaluations, sse {:.3e} -> {:.3e}",
        report.termination,
        report.number_of_evaluations,
        before,
        after
    );

    if after.is_finite() && after <= before {
        refined
    } else {
        *initial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pnp::test_support::{scene, K};
    use nalgebra::{Translation3, UnitQuaternion};
    use rigcal_core::transform::pose_error;

    #[test]
    fn params_roundtrip() {
        let pose = Iso3::from_parts(
            Translation3::new(0.1, -0.2, 3.0),
            UnitQuaternion::from_euler_angles(0.2, -0.1, 0.4),
        );
        let (dt, ang) = pose_error(&params_to_pose(&pose_to_params(&pose)), &pose);
        assert!(dt < 1e-12 && ang < 1e-12);
    }

    #[test]
    fn refine_converges_from_perturbed_pose() {
        let (gt, object, image) = scene(10);
        let k = K.k_matrix();
        let perturbed = Iso3::from_parts(
            Translation3::new(0.05, -0.03, 0.1),
            UnitQuaternion::from_euler_angles(0.02, -0.03, 0.01),
        ) * gt;

        let refined = refine_pose(&object, &image, &k, &perturbed, &RefineOptions::default());
        let (dt, ang) = pose_error(&refined, &gt);
        assert!(dt < 1e-6, "translation error too large: {dt}");
        assert!(ang < 1e-6, "rotation error too large: {ang}");
        assert!(sum_squared_error(&object, &image, &k, &refined) < 1e-10);
    }
}
