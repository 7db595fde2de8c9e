//! Pooled per-axis distribution summaries.
//!
//! Positions and backward-difference velocities are pooled across a set of
//! trajectories and summarized per axis (`tx ty tz vx vy vz`): count, mean,
//! sample variance, range and a fixed-bin histogram. Only positions that
//! have a velocity (every sample but the first) are pooled, so both halves
//! cover the same rows.

use serde::Serialize;

use crate::trajectory::Trajectory;
use crate::velocity::{align_positions, derive_velocity};

/// Default histogram bin count.
pub const DEFAULT_BINS: usize = 50;

/// Axis names in report order.
pub const AXES: [&str; 6] = ["tx", "ty", "tz", "vx", "vy", "vz"];

/// Equal-width histogram over `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// Bin edges, `counts.len() + 1` entries.
    pub edges: Vec<f64>,
    /// Values per bin; the last bin includes its upper edge.
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` (all finite) into `bins` equal-width bins.
    #[must_use]
    pub fn build(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let (lo, hi) = min_max(values).unwrap_or((0.0, 1.0));
        // Constant data gets a unit-width range like numpy.
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, lo + 0.5) };
        let width = (hi - lo) / bins as f64;

        let edges = (0..=bins).map(|i| lo + i as f64 * width).collect();
        let mut counts = vec![0; bins];
        for &v in values {
            let idx = (((v - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Self { edges, counts }
    }
}

/// Summary of one axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSummary {
    /// Axis name (`tx` … `vz`).
    pub axis: String,
    /// Finite values pooled.
    pub count: usize,
    /// Non-finite values skipped.
    pub skipped: usize,
    /// Mean.
    pub mean: f64,
    /// Sample variance (ddof = 1); NaN below two values.
    pub variance: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Value histogram.
    pub histogram: Histogram,
}

impl AxisSummary {
    /// Summarize raw values, skipping non-finite entries.
    #[must_use]
    pub fn from_values(axis: &str, values: &[f64], bins: usize) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let n = finite.len();
        let mean = if n > 0 {
            finite.iter().sum::<f64>() / n as f64
        } else {
            f64::NAN
        };
        let variance = if n > 1 {
            finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            f64::NAN
        };
        let (min, max) = min_max(&finite).unwrap_or((f64::NAN, f64::NAN));

        Self {
            axis: axis.to_string(),
            count: n,
            skipped: values.len() - n,
            mean,
            variance,
            min,
            max,
            histogram: Histogram::build(&finite, bins),
        }
    }

    /// Physical unit of the axis.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        if self.axis.starts_with('t') {
            "m"
        } else {
            "m/s"
        }
    }
}

/// Summaries of all six axes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionReport {
    /// Number of trajectories pooled.
    pub trajectories: usize,
    /// One entry per axis, in [`AXES`] order.
    pub axes: Vec<AxisSummary>,
}

impl DistributionReport {
    /// Look up an axis by name.
    #[must_use]
    pub fn axis(&self, name: &str) -> Option<&AxisSummary> {
        self.axes.iter().find(|a| a.axis == name)
    }

    /// One line per axis, e.g. `tx: mean = 0.1 m, variance = 2.0 m^2, …`.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.axes
            .iter()
            .map(|a| {
                let unit = a.unit();
                format!(
                    "{}: n = {}, mean = {:.6} {unit}, variance = {:.6} {unit}^2, \
                     range = [{:.6}, {:.6}]\n",
                    a.axis, a.count, a.mean, a.variance, a.min, a.max
                )
            })
            .collect()
    }
}

/// Pool positions and velocities of `trajectories` and summarize each axis.
#[must_use]
pub fn summarize<'a>(
    trajectories: impl IntoIterator<Item = &'a Trajectory>,
    bins: usize,
) -> DistributionReport {
    let mut columns: [Vec<f64>; 6] = Default::default();
    let mut count = 0;

    for trajectory in trajectories {
        count += 1;
        let positions = align_positions(trajectory);
        let velocities = derive_velocity(trajectory);
        for (p, v) in positions.samples.iter().zip(&velocities.samples) {
            for axis in 0..3 {
                columns[axis].push(p[axis]);
                columns[axis + 3].push(v[axis]);
            }
        }
    }

    let axes = AXES
        .iter()
        .zip(&columns)
        .map(|(name, values)| AxisSummary::from_values(name, values, bins))
        .collect();

    DistributionReport {
        trajectories: count,
        axes,
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_histogram_bins() {
        let h = Histogram::build(&[0.0, 0.1, 0.5, 0.99, 1.0], 2);
        assert_eq!(h.edges, vec![0.0, 0.5, 1.0]);
        assert_eq!(h.counts, vec![2, 3]);

        let constant = Histogram::build(&[3.0, 3.0], 4);
        assert_eq!(constant.counts.iter().sum::<usize>(), 2);
        assert_eq!(constant.edges.len(), 5);
    }

    #[test]
    fn test_axis_summary() {
        let s = AxisSummary::from_values("vx", &[1.0, 2.0, 3.0, f64::INFINITY], 10);
        assert_eq!(s.count, 3);
        assert_eq!(s.skipped, 1);
        assert_relative_eq!(s.mean, 2.0);
        assert_relative_eq!(s.variance, 1.0);
        assert_eq!((s.min, s.max), (1.0, 3.0));
        assert_eq!(s.unit(), "m/s");
    }

    #[test]
    fn test_summarize_linear() {
        let timestamps: Vec<f64> = (0..11).map(|i| i as f64 * 0.5).collect();
        let samples = timestamps.iter().map(|&t| [2.0 * t, 0.0, -t]).collect();
        let traj = Trajectory::positions(timestamps, samples).unwrap();

        let report = summarize([&traj, &traj], DEFAULT_BINS);
        assert_eq!(report.trajectories, 2);
        assert_eq!(report.axes.len(), 6);

        let vx = report.axis("vx").unwrap();
        assert_eq!(vx.count, 20);
        assert_relative_eq!(vx.mean, 2.0, epsilon = 1e-12);
        assert_relative_eq!(vx.variance, 0.0, epsilon = 1e-12);

        // First sample (tx = 0) is not pooled.
        let tx = report.axis("tx").unwrap();
        assert_eq!(tx.min, 1.0);
        assert_eq!(tx.max, 10.0);
        assert_eq!(tx.histogram.counts.len(), DEFAULT_BINS);

        assert!(report.to_text().starts_with("tx: n = 20"));
    }

    #[test]
    fn test_summarize_empty() {
        let report = summarize(std::iter::empty(), DEFAULT_BINS);
        assert_eq!(report.trajectories, 0);
        assert!(report.axes.iter().all(|a| a.count == 0 && a.mean.is_nan()));
    }
}
