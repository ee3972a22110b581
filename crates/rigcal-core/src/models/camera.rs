use nalgebra::{Point3, RealField, Vector2, Vector3};

use super::{DistortionModel, IntrinsicsModel, ProjectionModel};

/// Unit viewing direction in the camera frame.
#[derive(Clone, Copy, Debug)]
pub struct Ray<S: RealField + Copy> {
    pub dir: Vector3<S>,
}

/// Composable camera: `pixel = K(distortion(projection(p_c)))`.
#[derive(Clone, Debug)]
pub struct Camera<S, P, D, K>
where
    S: RealField + Copy,
    P: ProjectionModel<S>,
    D: DistortionModel<S>,
    K: IntrinsicsModel<S>,
{
    pub proj: P,
    pub dist: D,
    pub k: K,
    _phantom: core::marker::PhantomData<S>,
}

impl<S, P, D, K> Camera<S, P, D, K>
where
    S: RealField + Copy,
    P: ProjectionModel<S>,
    D: DistortionModel<S>,
    K: IntrinsicsModel<S>,
{
    pub fn new(proj: P, dist: D, k: K) -> Self {
        Self {
            proj,
            dist,
            k,
            _phantom: core::marker::PhantomData,
        }
    }

    /// Project a camera-frame point to pixels; `None` when it is not in front
    /// of the camera.
    pub fn project_point_c(&self, p_c: &Vector3<S>) -> Option<Vector2<S>> {
        let n_u = self.proj.project_dir(p_c)?;
        let n_d = self.dist.distort(&n_u);
        Some(self.k.sensor_to_pixel(&n_d))
    }

    pub fn project_point(&self, p_c: &Point3<S>) -> Option<Vector2<S>> {
        self.project_point_c(&p_c.coords)
    }

    pub fn backproject_pixel(&self, px: &Vector2<S>) -> Ray<S> {
        let n_d = self.k.pixel_to_sensor(px);
        let n_u = self.dist.undistort(&n_d);
        let dir = self.proj.unproject_dir(&n_u);
        Ray {
            dir: dir / dir.norm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BrownConrady5, FxFyCxCySkew, NoDistortion, Pinhole};

    fn k() -> FxFyCxCySkew<f64> {
        FxFyCxCySkew {
            fx: 800.0,
            fy: 810.0,
            cx: 640.0,
            cy: 360.0,
            skew: 0.0,
        }
    }

    #[test]
    fn points_behind_camera_are_not_projected() {
        let cam = Camera::new(Pinhole, NoDistortion, k());
        assert!(cam.project_point_c(&Vector3::new(0.1, 0.0, -1.0)).is_none());
        assert!(cam.project_point_c(&Vector3::new(0.1, 0.0, 0.0)).is_none());
    }

    #[test]
    fn backproject_then_project_returns_pixel() {
        let dist = BrownConrady5 {
            k1: -0.12,
            k2: 0.03,
            k3: 0.0,
            p1: 0.001,
            p2: -0.0005,
            iters: 12,
        };
        let cam = Camera::new(Pinhole, dist, k());

        let px = Vector2::new(900.0, 250.0);
        let ray = cam.backproject_pixel(&px);
        let p = ray.dir * 2.5;
        let px2 = cam.project_point_c(&p).unwrap();

        let err = (px2 - px).norm();
        assert!(err < 1e-6, "err={err}");
    }
}
