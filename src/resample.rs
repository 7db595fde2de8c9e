//! Regular-interval resampling.
//!
//! Samples are stably sorted by timestamp and duplicate timestamps are
//! collapsed to their first occurrence. The output grid is
//! `t_first + k * dt` for every `k` with a grid time strictly below
//! `t_last`; values are interpolated per channel and never extrapolated.

use crate::config::ResampleConfig;
use crate::error::{DatasetError, Result};
use crate::math::interp_sorted;
use crate::trajectory::Trajectory;

/// Resample onto a fixed time step.
///
/// Trajectories with fewer than two distinct timestamps are returned
/// (sorted and de-duplicated) without interpolation.
///
/// # Errors
///
/// Returns [`DatasetError::InvalidConfig`] if the interval is not finite and
/// positive, and [`DatasetError::InvalidInput`] if the time span is not
/// finite.
pub fn resample(trajectory: &Trajectory, config: &ResampleConfig) -> Result<Trajectory> {
    config.validate()?;
    let clean = sorted_unique(trajectory);
    if clean.len() < 2 {
        return Ok(clean);
    }

    let grid = time_grid(&clean.timestamps, config.sample_time)?;
    let channels: Vec<Vec<f64>> = (0..3)
        .map(|axis| interp_sorted(&clean.timestamps, &clean.channel(axis), &grid))
        .collect();
    let samples = (0..grid.len())
        .map(|i| [channels[0][i], channels[1][i], channels[2][i]])
        .collect();

    Ok(Trajectory {
        timestamps: grid,
        samples,
        kind: trajectory.kind,
    })
}

/// Stable sort by time, keeping the first sample of each timestamp.
#[must_use]
pub fn sorted_unique(trajectory: &Trajectory) -> Trajectory {
    let mut order: Vec<usize> = (0..trajectory.len()).collect();
    order.sort_by(|&a, &b| trajectory.timestamps[a].total_cmp(&trajectory.timestamps[b]));

    let mut timestamps: Vec<f64> = Vec::with_capacity(order.len());
    let mut samples = Vec::with_capacity(order.len());
    for i in order {
        let t = trajectory.timestamps[i];
        if timestamps.last() == Some(&t) {
            continue;
        }
        timestamps.push(t);
        samples.push(trajectory.samples[i]);
    }

    Trajectory {
        timestamps,
        samples,
        kind: trajectory.kind,
    }
}

fn time_grid(timestamps: &[f64], dt: f64) -> Result<Vec<f64>> {
    let (first, last) = (timestamps[0], timestamps[timestamps.len() - 1]);
    let steps = (last - first) / dt;
    if !steps.is_finite() {
        return Err(DatasetError::invalid_input(format!(
            "time span [{first}, {last}] is not finite"
        )));
    }
    // One extra step absorbs rounding in the division.
    let n = steps.ceil() as usize;
    Ok((0..=n)
        .map(|k| first + k as f64 * dt)
        .take_while(|&t| t < last)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(timestamps: Vec<f64>) -> Trajectory {
        let samples = timestamps.iter().map(|&t| [t, 2.0 * t, -t]).collect();
        Trajectory::positions(timestamps, samples).unwrap()
    }

    #[test]
    fn test_grid_bounds() {
        let traj = ramp(vec![0.3, 0.7, 1.0, 1.95]);
        let out = resample(&traj, &ResampleConfig::new(0.1)).unwrap();
        assert_eq!(out.timestamps[0], 0.3);
        assert!(out.timestamps.iter().all(|&t| t < 1.95));
        assert_eq!(out.len(), 17);
        for (t, s) in out.timestamps.iter().zip(&out.samples) {
            assert_relative_eq!(s[0], *t, epsilon = 1e-12);
            assert_relative_eq!(s[1], 2.0 * t, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unsorted_and_duplicates() {
        let traj = Trajectory::positions(
            vec![1.0, 0.0, 1.0, 2.0],
            vec![[10.0; 3], [0.0; 3], [99.0; 3], [20.0; 3]],
        )
        .unwrap();
        let clean = sorted_unique(&traj);
        assert_eq!(clean.timestamps, vec![0.0, 1.0, 2.0]);
        assert_eq!(clean.samples[1], [10.0; 3]);

        let out = resample(&traj, &ResampleConfig::new(0.5)).unwrap();
        assert_eq!(out.timestamps, vec![0.0, 0.5, 1.0, 1.5]);
        assert_relative_eq!(out.samples[1][0], 5.0);
        assert_relative_eq!(out.samples[3][0], 15.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        let single = ramp(vec![1.0]);
        assert_eq!(resample(&single, &ResampleConfig::default()).unwrap(), single);

        let same = ramp(vec![1.0, 1.0]);
        assert_eq!(resample(&same, &ResampleConfig::default()).unwrap().len(), 1);

        assert!(resample(&single, &ResampleConfig::new(-0.1)).is_err());
    }

    #[test]
    fn test_non_finite_span_is_rejected() {
        let (traj, dropped) = Trajectory::from_csv_str(
            "timestamp,tx,ty,tz\n0.0,0,0,0\n1.0,1,0,0\ninf,2,0,0\n",
            std::path::Path::new("inf.csv"),
        )
        .unwrap();
        assert_eq!(dropped, 1);
        let out = resample(&traj, &ResampleConfig::new(0.1)).unwrap();
        assert_eq!(out.len(), 10);
        assert!(out.timestamps.iter().all(|&t| t < 1.0));

        for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let traj = ramp(vec![0.0, 1.0, bad]);
            let err = resample(&traj, &ResampleConfig::new(0.1)).unwrap_err();
            assert!(matches!(err, DatasetError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_grid_does_not_accumulate() {
        let traj = ramp(vec![0.0, 100.0]);
        let out = resample(&traj, &ResampleConfig::new(0.1)).unwrap();
        assert_eq!(out.len(), 1000);
        assert_eq!(out.timestamps[999], 999.0 * 0.1);
    }
}
