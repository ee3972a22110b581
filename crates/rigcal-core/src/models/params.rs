use serde::{Deserialize, Serialize};

use super::{
    BrownConrady5, Camera, DistortionModel, FxFyCxCySkew, IntrinsicsModel, NoDistortion, Pinhole,
};
use crate::{CalibError, CalibResult, Mat3, Pt2, Real};

/// Serializable distortion model parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistortionParams {
    /// No distortion.
    #[default]
    None,
    /// Brown-Conrady 5-parameter radial-tangential model.
    BrownConrady5 {
        #[serde(flatten)]
        params: BrownConrady5<Real>,
    },
}

/// Intrinsic calibration of a pinhole camera, as stored on disk.
///
/// ```json
/// { "k": { "fx": 525.0, "fy": 525.0, "cx": 319.5, "cy": 239.5, "skew": 0.0 },
///   "distortion": { "type": "brown_conrady5", "k1": 0.1, "k2": 0.0, "k3": 0.0, "p1": 0.0, "p2": 0.0 } }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub k: FxFyCxCySkew<Real>,
    #[serde(default)]
    pub distortion: DistortionParams,
}

/// Concrete camera type built from [`CameraIntrinsics`].
pub type CameraModel = Camera<Real, Pinhole, AnyDistortion, FxFyCxCySkew<Real>>;

impl CameraIntrinsics {
    /// Distortion-free intrinsics.
    pub fn pinhole(k: FxFyCxCySkew<Real>) -> Self {
        Self {
            k,
            distortion: DistortionParams::None,
        }
    }

    /// From a 3x3 calibration matrix and a distortion vector in OpenCV order
    /// `[k1, k2, p1, p2, k3]`. Shorter vectors are zero-padded; an empty or
    /// all-zero vector means no distortion.
    pub fn from_matrix(k: &Mat3, coeffs: &[Real]) -> CalibResult<Self> {
        let k = FxFyCxCySkew::from_k_matrix(k).ok_or_else(|| {
            CalibError::IntrinsicsUnavailable("not an upper-triangular calibration matrix".into())
        })?;
        if coeffs.len() > 5 {
            return Err(CalibError::IntrinsicsUnavailable(format!(
                "expected at most 5 distortion coefficients, got {}",
                coeffs.len()
            )));
        }
        let c = |i: usize| coeffs.get(i).copied().unwrap_or(0.0);
        let distortion = if coeffs.iter().all(|v| *v == 0.0) {
            DistortionParams::None
        } else {
            DistortionParams::BrownConrady5 {
                params: BrownConrady5 {
                    k1: c(0),
                    k2: c(1),
                    p1: c(2),
                    p2: c(3),
                    k3: c(4),
                    iters: 8,
                },
            }
        };
        let intrinsics = Self { k, distortion };
        intrinsics.validate()?;
        Ok(intrinsics)
    }

    pub fn k_matrix(&self) -> Mat3 {
        self.k.k_matrix()
    }

    /// Reject intrinsics that cannot map pixels back to rays.
    pub fn validate(&self) -> CalibResult<()> {
        let k = &self.k;
        let finite = [k.fx, k.fy, k.cx, k.cy, k.skew]
            .iter()
            .all(|v| v.is_finite());
        if !finite || k.fx <= 0.0 || k.fy <= 0.0 {
            return Err(CalibError::IntrinsicsUnavailable(format!(
                "focal lengths must be positive and finite (fx={}, fy={})",
                k.fx, k.fy
            )));
        }
        Ok(())
    }

    /// Remove lens distortion from an observed pixel, keeping it in pixel
    /// units under the same `K`.
    pub fn undistort_pixel(&self, px: &Pt2) -> Pt2 {
        let n_d = self.k.pixel_to_sensor(&px.coords);
        let n_u = match self.distortion {
            DistortionParams::None => n_d,
            DistortionParams::BrownConrady5 { params } => params.undistort(&n_d),
        };
        Pt2::from(self.k.sensor_to_pixel(&n_u))
    }

    /// Build the runtime camera model.
    pub fn build(&self) -> CameraModel {
        let dist = match self.distortion {
            DistortionParams::None => AnyDistortion::None(NoDistortion),
            DistortionParams::BrownConrady5 { params } => AnyDistortion::BrownConrady5(params),
        };
        Camera::new(Pinhole, dist, self.k)
    }
}

#[derive(Clone, Debug)]
#[doc(hidden)]
pub enum AnyDistortion {
    None(NoDistortion),
    BrownConrady5(BrownConrady5<Real>),
}

impl DistortionModel<Real> for AnyDistortion {
    fn distort(&self, n: &nalgebra::Vector2<Real>) -> nalgebra::Vector2<Real> {
        match self {
            AnyDistortion::None(m) => m.distort(n),
            AnyDistortion::BrownConrady5(m) => m.distort(n),
        }
    }

    fn undistort(&self, n: &nalgebra::Vector2<Real>) -> nalgebra::Vector2<Real> {
        match self {
            AnyDistortion::None(m) => m.undistort(n),
            AnyDistortion::BrownConrady5(m) => m.undistort(n),
        }
    }
}
