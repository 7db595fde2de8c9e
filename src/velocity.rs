//! Finite-difference velocity derivation.
//!
//! All tools use the backward-difference convention: velocity sample `i`
//! is `(p[i+1] - p[i]) / (t[i+1] - t[i])` stamped with `t[i+1]`, so the
//! first position sample has no velocity and is dropped. Use
//! [`align_positions`] to get positions on the same timestamps.
//!
//! Duplicate timestamps give a zero time delta; the resulting infinite or
//! NaN components are passed through unchanged for callers to filter.

use crate::math::linalg::norm3;
use crate::trajectory::{SampleKind, Trajectory};

/// Derive the velocity trajectory (one sample shorter than `positions`).
///
/// # Example
///
/// ```
/// use trajectory_dataset::{derive_velocity, Trajectory};
///
/// let traj = Trajectory::positions(
///     vec![0.0, 0.5, 1.0],
///     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 2.0, 0.0]],
/// )?;
/// let vel = derive_velocity(&traj);
/// assert_eq!(vel.timestamps, vec![0.5, 1.0]);
/// assert_eq!(vel.samples, vec![[2.0, 0.0, 0.0], [0.0, 4.0, 0.0]]);
/// # Ok::<(), trajectory_dataset::DatasetError>(())
/// ```
#[must_use]
pub fn derive_velocity(positions: &Trajectory) -> Trajectory {
    let samples = positions
        .samples
        .windows(2)
        .zip(positions.timestamps.windows(2))
        .map(|(ps, ts)| {
            let dt = ts[1] - ts[0];
            [
                (ps[1][0] - ps[0][0]) / dt,
                (ps[1][1] - ps[0][1]) / dt,
                (ps[1][2] - ps[0][2]) / dt,
            ]
        })
        .collect();

    Trajectory {
        timestamps: positions.timestamps.iter().skip(1).copied().collect(),
        samples,
        kind: SampleKind::Velocity,
    }
}

/// Positions restricted to the timestamps that have a velocity.
#[must_use]
pub fn align_positions(positions: &Trajectory) -> Trajectory {
    Trajectory {
        timestamps: positions.timestamps.iter().skip(1).copied().collect(),
        samples: positions.samples.iter().skip(1).copied().collect(),
        kind: positions.kind,
    }
}

/// Speed (velocity magnitude) per sample.
#[must_use]
pub fn speeds(velocities: &Trajectory) -> Vec<f64> {
    velocities.samples.iter().map(norm3).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear(n: usize, dt: f64, v: [f64; 3]) -> Trajectory {
        let timestamps: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let samples = timestamps
            .iter()
            .map(|&t| [v[0] * t, v[1] * t, v[2] * t])
            .collect();
        Trajectory::positions(timestamps, samples).unwrap()
    }

    #[test]
    fn test_constant_velocity() {
        let traj = linear(100, 0.1, [1.0, 0.0, 0.0]);
        let vel = derive_velocity(&traj);
        assert_eq!(vel.len(), 99);
        assert_eq!(vel.kind, SampleKind::Velocity);
        for v in &vel.samples {
            assert_relative_eq!(v[0], 1.0, epsilon = 1e-9);
            assert_relative_eq!(v[1], 0.0);
            assert_relative_eq!(v[2], 0.0);
        }
    }

    #[test]
    fn test_backward_timestamps() {
        let traj = linear(5, 0.2, [0.0, 1.0, 0.0]);
        let vel = derive_velocity(&traj);
        assert_eq!(vel.timestamps, traj.timestamps[1..].to_vec());
        assert_eq!(align_positions(&traj).timestamps, vel.timestamps);
    }

    #[test]
    fn test_duplicate_timestamp_is_non_finite() {
        let traj = Trajectory::positions(
            vec![0.0, 1.0, 1.0, 2.0],
            vec![[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0]],
        )
        .unwrap();
        let vel = derive_velocity(&traj);
        assert_eq!(vel.len(), 3);
        assert!(vel.samples[1][0].is_infinite());
        assert!(vel.samples[1][1].is_nan());
        assert!(vel.samples[2][0].is_finite());
    }

    #[test]
    fn test_short_inputs() {
        assert!(derive_velocity(&Trajectory::default()).is_empty());
        let single = Trajectory::positions(vec![0.0], vec![[1.0; 3]]).unwrap();
        assert!(derive_velocity(&single).is_empty());
    }

    #[test]
    fn test_speeds() {
        let traj = linear(3, 1.0, [3.0, 4.0, 0.0]);
        let s = speeds(&derive_velocity(&traj));
        assert_eq!(s, vec![5.0, 5.0]);
    }
}
