use nalgebra::{RealField, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// First stage of the camera pipeline: camera-frame direction to the
/// normalized image plane.
pub trait ProjectionModel<S: RealField + Copy> {
    /// `None` for directions the model cannot image.
    fn project_dir(&self, dir_c: &Vector3<S>) -> Option<Vector2<S>>;
    fn unproject_dir(&self, n: &Vector2<S>) -> Vector3<S>;
}

/// Ideal perspective projection onto the `z = 1` plane. Only points with
/// positive depth are imaged.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Pinhole;

impl<S: RealField + Copy> ProjectionModel<S> for Pinhole {
    fn project_dir(&self, dir_c: &Vector3<S>) -> Option<Vector2<S>> {
        (dir_c.z > S::zero()).then(|| dir_c.xy() / dir_c.z)
    }

    fn unproject_dir(&self, n: &Vector2<S>) -> Vector3<S> {
        n.push(S::one())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinhole_images_positive_depth_only() {
        let p = Vector3::new(0.4, -0.2, 2.0);
        let n = Pinhole.project_dir(&p).unwrap();
        assert_eq!(n, Vector2::new(0.2, -0.1));
        assert_eq!(Pinhole.unproject_dir(&n) * 2.0, p);

        assert!(Pinhole.project_dir(&Vector3::new(0.4, -0.2, 0.0)).is_none());
        assert!(Pinhole.project_dir(&Vector3::new(0.4, -0.2, -1.0)).is_none());
    }
}
