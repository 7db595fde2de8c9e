//! Interpolating cubic B-splines.
//!
//! Fits use the not-a-knot knot placement: boundary knots repeated
//! `degree + 1` times and interior knots at every sample abscissa except the
//! two nearest each end. With no smoothing term the fit is a plain linear
//! solve and fully determined by the samples.
//!
//! Coefficients are stored zero-padded to the knot count, the layout
//! produced by FITPACK's `splrep`, so archives can be evaluated by common
//! B-spline tooling without conversion.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// Spline degree.
pub const DEGREE: usize = 3;

/// A fitted cubic B-spline `(knots, coeffs, degree)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubicSpline {
    /// Knot vector, `n + 4` entries for `n` samples.
    pub knots: Vec<f64>,

    /// B-spline coefficients, padded with `DEGREE + 1` trailing zeros.
    pub coeffs: Vec<f64>,
}

impl CubicSpline {
    /// Fit an interpolating spline over the local sample index `0..n`.
    ///
    /// # Errors
    ///
    /// See [`CubicSpline::fit`].
    pub fn fit_indexed(values: &[f64]) -> Result<Self> {
        let x: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
        Self::fit(&x, values)
    }

    /// Fit an interpolating spline through `(x[i], y[i])`.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than `DEGREE + 1` points are given, the
    /// lengths differ, `x` is not strictly increasing, or the collocation
    /// system is singular.
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self> {
        let n = x.len();
        if n != y.len() {
            return Err(DatasetError::length_mismatch(y.len(), n));
        }
        if n <= DEGREE {
            return Err(DatasetError::spline(format!(
                "need at least {} points for a cubic fit, got {n}",
                DEGREE + 1
            )));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(DatasetError::spline("abscissae must be strictly increasing"));
        }

        let knots = not_a_knot_knots(x);

        let a = DMatrix::from_fn(n, n, |row, col| basis_value(&knots, n, col, x[row]));
        let rhs = DVector::from_column_slice(y);
        let solution = a
            .lu()
            .solve(&rhs)
            .ok_or_else(|| DatasetError::spline("collocation matrix is singular"))?;

        let mut coeffs: Vec<f64> = solution.iter().copied().collect();
        coeffs.resize(knots.len(), 0.0);

        Ok(Self { knots, coeffs })
    }

    /// Number of active basis functions (samples the spline was fit to).
    #[must_use]
    pub fn basis_count(&self) -> usize {
        self.knots.len() - DEGREE - 1
    }

    /// Evaluate the spline at `x` (clamped to the knot range).
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.basis_count();
        let lo = self.knots[DEGREE];
        let hi = self.knots[n];
        let x = x.clamp(lo, hi);
        let span = find_span(&self.knots, n, x);
        let basis = basis_funs(&self.knots, span, x);
        (0..=DEGREE)
            .map(|r| basis[r] * self.coeffs[span - DEGREE + r])
            .sum()
    }
}

/// Knot vector for not-a-knot interpolation at abscissae `x`.
fn not_a_knot_knots(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut knots = Vec::with_capacity(n + DEGREE + 1);
    knots.extend(std::iter::repeat(x[0]).take(DEGREE + 1));
    knots.extend_from_slice(&x[2..n - 2]);
    knots.extend(std::iter::repeat(x[n - 1]).take(DEGREE + 1));
    knots
}

/// Knot span index `l` with `knots[l] <= x < knots[l + 1]`, `DEGREE <= l < n`.
fn find_span(knots: &[f64], n: usize, x: f64) -> usize {
    (DEGREE..n)
        .find(|&l| x < knots[l + 1])
        .unwrap_or(n - 1)
}

/// Non-zero basis values `N[span-DEGREE ..= span]` at `x` (Cox-de Boor).
fn basis_funs(knots: &[f64], span: usize, x: f64) -> [f64; DEGREE + 1] {
    let mut values = [0.0; DEGREE + 1];
    let mut left = [0.0; DEGREE + 1];
    let mut right = [0.0; DEGREE + 1];
    values[0] = 1.0;

    for j in 1..=DEGREE {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom == 0.0 { 0.0 } else { values[r] / denom };
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }
    values
}

/// Value of basis function `index` at `x`.
fn basis_value(knots: &[f64], n: usize, index: usize, x: f64) -> f64 {
    let span = find_span(knots, n, x);
    if index + DEGREE < span || index > span {
        return 0.0;
    }
    basis_funs(knots, span, x)[index + DEGREE - span]
}
