//! Mathematical utilities and type definitions.
//!
//! This module provides the scalar and linear-algebra aliases used throughout
//! the workspace, plus a handful of small coordinate helpers.

use nalgebra::{Isometry3, Matrix3, Matrix4, Point2, Point3, Vector2, Vector3};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 2D point with [`Real`] coordinates (pixels).
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates (metric, sensor frame).
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;

/// Convert a 2D point in Euclidean coordinates into homogeneous coordinates.
///
/// Given a point `p = (x, y)`, returns the homogeneous vector `(x, y, 1)`.
pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

/// Convert a 3D homogeneous vector back to a 2D point.
///
/// The input is interpreted as `(x, y, w)` and the result is `(x / w, y / w)`.
/// The caller is responsible for ensuring that `w != 0`.
pub fn from_homogeneous(v: &Vec3) -> Pt2 {
    Pt2::new(v.x / v.z, v.y / v.z)
}

/// Arithmetic mean of a point set, or `None` for an empty slice.
pub fn centroid(points: &[Pt3]) -> Option<Pt3> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
    Some(Pt3::from(sum / points.len() as Real))
}

/// Convert a pixel into normalized image coordinates using `K^{-1}`.
///
/// Returns `None` when `k` is singular.
pub fn pixel_to_normalized(pixel: &Pt2, k: &Mat3) -> Option<Pt2> {
    let k_inv = k.try_inverse()?;
    Some(from_homogeneous(&(k_inv * to_homogeneous(pixel))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_of_empty_set_is_none() {
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn centroid_averages_coordinates() {
        let pts = [
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(2.0, 0.0, 0.0),
            Pt3::new(1.0, 3.0, -3.0),
        ];
        let c = centroid(&pts).unwrap();
        assert!((c - Pt3::new(1.0, 1.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn principal_point_maps_to_origin() {
        let k = Mat3::new(800.0, 0.0, 640.0, 0.0, 780.0, 360.0, 0.0, 0.0, 1.0);
        let n = pixel_to_normalized(&Pt2::new(640.0, 360.0), &k).unwrap();
        assert!(n.coords.norm() < 1e-12);
    }
}
