use nalgebra::{RealField, Vector2};
use serde::{Deserialize, Serialize};

/// Lens distortion applied in normalized image coordinates.
pub trait DistortionModel<S: RealField + Copy> {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S>;
    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S>;
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct NoDistortion;

impl<S: RealField + Copy> DistortionModel<S> for NoDistortion {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S> {
        *n_undist
    }

    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S> {
        *n_dist
    }
}

/// Radial (`k1, k2, k3`) plus tangential (`p1, p2`) distortion.
///
/// `undistort` is a fixed-point iteration; `iters == 0` falls back to 8 steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5<S: RealField> {
    pub k1: S,
    pub k2: S,
    pub k3: S,
    pub p1: S,
    pub p2: S,
    #[serde(default)]
    pub iters: u32,
}

impl<S: RealField + Copy> BrownConrady5<S> {
    fn apply(&self, x: S, y: S) -> (S, S) {
        let two = S::one() + S::one();
        let r2 = x * x + y * y;
        let radial = S::one() + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));

        let xy = x * y;
        let dx = two * self.p1 * xy + self.p2 * (r2 + two * x * x);
        let dy = self.p1 * (r2 + two * y * y) + two * self.p2 * xy;

        (x * radial + dx, y * radial + dy)
    }
}

impl<S: RealField + Copy> DistortionModel<S> for BrownConrady5<S> {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S> {
        let (xd, yd) = self.apply(n_undist.x, n_undist.y);
        Vector2::new(xd, yd)
    }

    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S> {
        let iters = if self.iters == 0 { 8 } else { self.iters };
        let mut n = *n_dist;
        for _ in 0..iters {
            let (xd, yd) = self.apply(n.x, n.y);
            n.x -= xd - n_dist.x;
            n.y -= yd - n_dist.y;
        }
        n
    }
}
