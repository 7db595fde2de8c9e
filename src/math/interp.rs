//! Piecewise-linear interpolation.

/// Linearly interpolate `ys(xs)` at ascending `queries`.
///
/// `xs` must be strictly increasing. Queries outside `[xs[0], xs[last]]`
/// are clamped to the boundary value; nothing is extrapolated.
#[must_use]
pub fn interp_sorted(xs: &[f64], ys: &[f64], queries: &[f64]) -> Vec<f64> {
    debug_assert_eq!(xs.len(), ys.len());
    if xs.is_empty() {
        return vec![f64::NAN; queries.len()];
    }
    let last = xs.len() - 1;
    let mut seg = 0;

    queries
        .iter()
        .map(|&q| {
            if q <= xs[0] {
                return ys[0];
            }
            if q >= xs[last] {
                return ys[last];
            }
            while xs[seg + 1] < q {
                seg += 1;
            }
            let (x0, x1) = (xs[seg], xs[seg + 1]);
            let w = (q - x0) / (x1 - x0);
            ys[seg] + w * (ys[seg + 1] - ys[seg])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interp_midpoints() {
        let xs = [0.0, 1.0, 3.0];
        let ys = [0.0, 10.0, 30.0];
        let out = interp_sorted(&xs, &ys, &[0.0, 0.5, 1.0, 2.0, 3.0]);
        let expected = [0.0, 5.0, 10.0, 20.0, 30.0];
        for (a, b) in out.iter().zip(expected) {
            assert_relative_eq!(*a, b);
        }
    }

    #[test]
    fn test_interp_clamps() {
        let out = interp_sorted(&[1.0, 2.0], &[5.0, 7.0], &[0.0, 3.0]);
        assert_eq!(out, vec![5.0, 7.0]);
    }

    #[test]
    fn test_interp_single_point() {
        assert_eq!(interp_sorted(&[1.0], &[4.0], &[1.0]), vec![4.0]);
    }
}
