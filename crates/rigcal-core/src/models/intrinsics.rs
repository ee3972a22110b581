use nalgebra::{Matrix3, RealField, Vector2};
use serde::{Deserialize, Serialize};

/// Last stage of the camera pipeline: normalized image plane to pixels.
pub trait IntrinsicsModel<S: RealField + Copy> {
    fn sensor_to_pixel(&self, sensor: &Vector2<S>) -> Vector2<S>;
    fn pixel_to_sensor(&self, pixel: &Vector2<S>) -> Vector2<S>;
}

/// Upper-triangular calibration matrix
///
/// ```text
/// | fx  skew cx |
/// | 0   fy   cy |
/// | 0   0    1  |
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxFyCxCySkew<S: RealField + Copy> {
    pub fx: S,
    pub fy: S,
    pub cx: S,
    pub cy: S,
    pub skew: S,
}

impl<S: RealField + Copy> FxFyCxCySkew<S> {
    pub fn k_matrix(&self) -> Matrix3<S> {
        let (o, l) = (S::zero(), S::one());
        Matrix3::new(
            self.fx, self.skew, self.cx, //
            o, self.fy, self.cy, //
            o, o, l,
        )
    }

    /// Read the parameters back from a calibration matrix, as found in
    /// driver camera-info messages. `None` unless the lower triangle is zero
    /// and `K[2][2] == 1`.
    pub fn from_k_matrix(k: &Matrix3<S>) -> Option<Self> {
        let lower = [k[(1, 0)], k[(2, 0)], k[(2, 1)]];
        if lower.iter().any(|v| *v != S::zero()) || k[(2, 2)] != S::one() {
            return None;
        }
        Some(Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            skew: k[(0, 1)],
        })
    }
}

impl<S: RealField + Copy> IntrinsicsModel<S> for FxFyCxCySkew<S> {
    fn sensor_to_pixel(&self, n: &Vector2<S>) -> Vector2<S> {
        Vector2::new(
            self.fx * n.x + self.skew * n.y + self.cx,
            self.fy * n.y + self.cy,
        )
    }

    fn pixel_to_sensor(&self, px: &Vector2<S>) -> Vector2<S> {
        let y = (px.y - self.cy) / self.fy;
        Vector2::new((px.x - self.cx - self.skew * y) / self.fx, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skewed() -> FxFyCxCySkew<f64> {
        FxFyCxCySkew {
            fx: 610.0,
            fy: 605.0,
            cx: 322.0,
            cy: 238.0,
            skew: 1.5,
        }
    }

    #[test]
    fn k_matrix_roundtrip() {
        let k = skewed();
        assert_eq!(FxFyCxCySkew::from_k_matrix(&k.k_matrix()), Some(k));

        let mut m = k.k_matrix();
        m[(2, 0)] = 0.1;
        assert!(FxFyCxCySkew::from_k_matrix(&m).is_none());
        let scaled = k.k_matrix() * 2.0;
        assert!(FxFyCxCySkew::from_k_matrix(&scaled).is_none());
    }

    #[test]
    fn pixel_to_sensor_undoes_skew() {
        let k = skewed();
        let n = Vector2::new(0.21, -0.34);
        let px = k.sensor_to_pixel(&n);
        let h = k.k_matrix() * nalgebra::Vector3::new(n.x, n.y, 1.0);
        assert!((px - h.xy()).norm() < 1e-12);
        assert!((k.pixel_to_sensor(&px) - n).norm() < 1e-12);
    }
}
