//! Numerical helpers shared by the linear solvers.
//!
//! - Hartley normalization of 3D points (conditioning for DLT),
//! - real-root polynomial solvers up to degree four (P3P),
//! - reshaping a null-space row of `Vᵗ` into a 3x4 matrix.

use nalgebra::{DMatrix, Matrix3x4, Schur};
use rigcal_core::{centroid, Mat4, Pt3, Real};

/// Hartley normalization for 3D points.
///
/// Centers the points at the origin and scales them so that the mean distance
/// from the origin is `√3`. Returns the normalized points and the 4x4 matrix
/// `T` with `p_norm = T * p_homogeneous`, or `None` for an empty or coincident
/// set.
pub fn normalize_points_3d(points: &[Pt3]) -> Option<(Vec<Pt3>, Mat4)> {
    let c = centroid(points)?;
    let mean_dist =
        points.iter().map(|p| (p - c).norm()).sum::<Real>() / points.len() as Real;
    if mean_dist <= Real::EPSILON {
        return None;
    }

    let s = 3.0_f64.sqrt() / mean_dist;
    #[rustfmt::skip]
    let t = Mat4::new(
        s,   0.0, 0.0, -s * c.x,
        0.0, s,   0.0, -s * c.y,
        0.0, 0.0, s,   -s * c.z,
        0.0, 0.0, 0.0, 1.0,
    );
    let norm = points.iter().map(|p| Pt3::from((p - c) * s)).collect();
    Some((norm, t))
}

fn sort_dedup(mut roots: Vec<Real>) -> Vec<Real> {
    roots.sort_by(|a, b| a.total_cmp(b));
    roots.dedup_by(|a, b| (*a - *b).abs() < 1e-8);
    roots
}

/// Real roots of `ax² + bx + c = 0`, ascending and deduplicated.
///
/// Falls back to the linear equation when `a ≈ 0`.
pub fn solve_quadratic_real(a: Real, b: Real, c: Real) -> Vec<Real> {
    let eps = 1e-12;
    if a.abs() < eps {
        if b.abs() < eps {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc.abs() < eps {
        return vec![-b / (2.0 * a)];
    }
    if disc < 0.0 {
        return Vec::new();
    }
    let sq = disc.sqrt();
    sort_dedup(vec![(-b + sq) / (2.0 * a), (-b - sq) / (2.0 * a)])
}

/// Real roots of `ax³ + bx² + cx + d = 0` (Cardano / trigonometric form).
pub fn solve_cubic_real(a: Real, b: Real, c: Real, d: Real) -> Vec<Real> {
    let eps = 1e-12;
    if a.abs() < eps {
        return solve_quadratic_real(b, c, d);
    }

    let (b, c, d) = (b / a, c / a, d / a);
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let disc = (q * 0.5).powi(2) + (p / 3.0).powi(3);
    let shift = b / 3.0;

    let mut roots = Vec::with_capacity(3);
    if disc > eps {
        let sq = disc.sqrt();
        let u = (-q * 0.5 + sq).cbrt();
        let v = (-q * 0.5 - sq).cbrt();
        roots.push(u + v - shift);
    } else if disc.abs() <= eps {
        let u = (-q * 0.5).cbrt();
        roots.push(2.0 * u - shift);
        roots.push(-u - shift);
    } else {
        let r = (-p / 3.0).sqrt();
        let phi = ((-q * 0.5) / (r * r * r)).clamp(-1.0, 1.0).acos();
        let tau = 2.0 * std::f64::consts::PI;
        for k in 0..3 {
            roots.push(2.0 * r * ((phi + tau * k as Real) / 3.0).cos() - shift);
        }
    }
    sort_dedup(roots)
}

/// Real roots of `ax⁴ + bx³ + cx² + dx + e = 0`.
///
/// Eigenvalues of the companion matrix via Schur decomposition; eigenvalues
/// with an imaginary part above `1e-8` are discarded.
pub fn solve_quartic_real(a: Real, b: Real, c: Real, d: Real, e: Real) -> Vec<Real> {
    if a.abs() < 1e-12 {
        return solve_cubic_real(b, c, d, e);
    }

    let mut comp = DMatrix::<Real>::zeros(4, 4);
    comp[(0, 0)] = -b / a;
    comp[(0, 1)] = -c / a;
    comp[(0, 2)] = -d / a;
    comp[(0, 3)] = -e / a;
    comp[(1, 0)] = 1.0;
    comp[(2, 1)] = 1.0;
    comp[(3, 2)] = 1.0;

    let roots = Schur::new(comp)
        .complex_eigenvalues()
        .iter()
        .filter(|v| v.im.abs() < 1e-8)
        .map(|v| v.re)
        .collect();
    sort_dedup(roots)
}

/// Reshape row `row_idx` of a 12-column `Vᵗ` into a 3x4 matrix, row-major.
pub fn mat34_from_svd_row(v_t: &DMatrix<Real>, row_idx: usize) -> Matrix3x4<Real> {
    debug_assert_eq!(v_t.ncols(), 12, "expected 12 columns");
    Matrix3x4::from_fn(|r, c| v_t[(row_idx, 4 * r + c)])
}
