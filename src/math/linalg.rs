//! Small fixed-size vector helpers and rotation construction.
//!
//! Vectors are plain `[f64; 3]` arrays, matching how trajectories store
//! their samples; rotations are `nalgebra::Matrix3`.

use nalgebra::{Matrix3, Vector3};

use crate::error::{DatasetError, Result};

/// Below this norm a cross product is treated as zero (parallel vectors).
pub const PARALLEL_EPS: f64 = 1e-9;

/// Normalize a 3D vector to unit length.
///
/// Vectors shorter than `1e-10` map to zero.
#[must_use]
pub fn normalize3(v: &[f64; 3]) -> [f64; 3] {
    let norm = norm3(v);
    if norm < 1e-10 {
        return [0.0, 0.0, 0.0];
    }
    [v[0] / norm, v[1] / norm, v[2] / norm]
}

/// Compute the norm of a 3D vector.
#[must_use]
#[inline]
pub fn norm3(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Dot product of two 3D vectors.
#[must_use]
#[inline]
pub fn dot3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product of two 3D vectors.
#[must_use]
#[inline]
pub fn cross3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Component-wise difference `a - b`.
#[must_use]
#[inline]
pub fn sub3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Apply a 3×3 matrix to a vector.
#[must_use]
#[inline]
pub fn apply3(m: &Matrix3<f64>, v: &[f64; 3]) -> [f64; 3] {
    let r = m * Vector3::new(v[0], v[1], v[2]);
    [r.x, r.y, r.z]
}

/// Rotation matrix taking the direction of `from` onto the direction of `to`.
///
/// Uses Rodrigues' formula `R = I + K + K²(1 - c)/s²` with `K` the
/// skew-symmetric matrix of `a × b`. When the directions are (nearly)
/// parallel the formula divides by `s² ≈ 0`, so:
///
/// - same direction: identity
/// - opposite direction: 180° rotation about an axis orthogonal to `from`
///
/// # Errors
///
/// Returns an error if either vector has (near-)zero length or is not finite.
pub fn rotation_between(from: &[f64; 3], to: &[f64; 3]) -> Result<Matrix3<f64>> {
    let (na, nb) = (norm3(from), norm3(to));
    if !(na.is_finite() && nb.is_finite()) || na < 1e-12 || nb < 1e-12 {
        return Err(DatasetError::invalid_input(
            "rotation endpoints must be finite non-zero vectors",
        ));
    }
    let a = [from[0] / na, from[1] / na, from[2] / na];
    let b = [to[0] / nb, to[1] / nb, to[2] / nb];

    let v = cross3(&a, &b);
    let c = dot3(&a, &b);
    let s = norm3(&v);

    if s < PARALLEL_EPS {
        if c > 0.0 {
            return Ok(Matrix3::identity());
        }
        // Half turn about any unit axis u ⟂ a: R = 2uuᵀ - I.
        let u = Vector3::from(orthogonal_unit(&a));
        return Ok(u * u.transpose() * 2.0 - Matrix3::identity());
    }

    let k = Matrix3::new(
        0.0, -v[2], v[1], //
        v[2], 0.0, -v[0], //
        -v[1], v[0], 0.0,
    );
    Ok(Matrix3::identity() + k + k * k * ((1.0 - c) / (s * s)))
}

/// A unit vector orthogonal to the unit vector `a`.
fn orthogonal_unit(a: &[f64; 3]) -> [f64; 3] {
    // Cross with the basis axis least aligned with `a`.
    let axis = if a[0].abs() <= a[1].abs() && a[0].abs() <= a[2].abs() {
        [1.0, 0.0, 0.0]
    } else if a[1].abs() <= a[2].abs() {
        [0.0, 1.0, 0.0]
    } else {
        [0.0, 0.0, 1.0]
    };
    normalize3(&cross3(a, &axis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_orthonormal(r: &Matrix3<f64>) {
        let should_be_identity = r * r.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(should_be_identity[(i, j)], expected, epsilon = 1e-10);
            }
        }
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_normalize3() {
        let n = normalize3(&[3.0, 4.0, 0.0]);
        assert_relative_eq!(n[0], 0.6);
        assert_relative_eq!(n[1], 0.8);
        assert_relative_eq!(n[2], 0.0);
        assert_eq!(normalize3(&[0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cross3() {
        assert_eq!(cross3(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rotation_maps_from_onto_to() {
        let from = [0.0, 0.0, 1.0];
        let to = normalize3(&[0.3, -1.2, 0.7]);
        let r = rotation_between(&from, &to).unwrap();
        let mapped = apply3(&r, &from);
        for i in 0..3 {
            assert_relative_eq!(mapped[i], to[i], epsilon = 1e-10);
        }
        assert_orthonormal(&r);
    }

    #[test]
    fn test_rotation_parallel_is_identity() {
        let r = rotation_between(&[0.0, 0.0, 1.0], &[0.0, 0.0, 5.0]).unwrap();
        assert_relative_eq!(r, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_antiparallel_is_half_turn() {
        let from = [0.0, 0.0, 1.0];
        let r = rotation_between(&from, &[0.0, 0.0, -1.0]).unwrap();
        let mapped = apply3(&r, &from);
        assert_relative_eq!(mapped[2], -1.0, epsilon = 1e-12);
        assert!(r.iter().all(|v| v.is_finite()));
        assert_orthonormal(&r);

        // Nearly anti-parallel goes through the guarded branch too.
        let r = rotation_between(&[1.0, 0.0, 0.0], &[-1.0, 1e-12, 0.0]).unwrap();
        assert!(r.iter().all(|v| v.is_finite()));
        assert_orthonormal(&r);
    }

    #[test]
    fn test_rotation_rejects_zero_vector() {
        assert!(rotation_between(&[0.0; 3], &[1.0, 0.0, 0.0]).is_err());
        assert!(rotation_between(&[1.0, 0.0, 0.0], &[f64::NAN, 0.0, 0.0]).is_err());
    }
}
