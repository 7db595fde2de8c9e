//! Property tests for length and count invariants.

use proptest::prelude::*;
use trajectory_dataset::{
    derive_velocity, resample, segment_count, segment_trajectory, ResampleConfig, SegmentConfig,
    Stride, Trajectory,
};

/// Strictly increasing timestamps from positive gaps, with arbitrary samples.
fn trajectory(max_len: usize) -> impl Strategy<Value = Trajectory> {
    prop::collection::vec((0.01f64..2.0, prop::array::uniform3(-100.0f64..100.0)), 0..max_len)
        .prop_map(|rows| {
            let mut t = 0.0;
            let mut timestamps = Vec::with_capacity(rows.len());
            let mut samples = Vec::with_capacity(rows.len());
            for (gap, p) in rows {
                t += gap;
                timestamps.push(t);
                samples.push(p);
            }
            Trajectory::positions(timestamps, samples).unwrap()
        })
}

proptest! {
    #[test]
    fn velocity_is_one_shorter(traj in trajectory(200)) {
        let vel = derive_velocity(&traj);
        prop_assert_eq!(vel.len(), traj.len().saturating_sub(1));
        prop_assert_eq!(&vel.timestamps[..], traj.timestamps.get(1..).unwrap_or(&[]));
        prop_assert!(vel.samples.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn sliding_count_matches_formula(
        traj in trajectory(200),
        lin in 1usize..30,
        lout in 1usize..30,
    ) {
        let set = segment_trajectory(&traj, &SegmentConfig::new(lin, lout)).unwrap();
        let expected = if traj.len() >= lin + lout { traj.len() - lin - lout + 1 } else { 0 };
        prop_assert_eq!(set.len(), expected);
        prop_assert_eq!(set.output.shape(), &[3, lout, expected]);
    }

    #[test]
    fn non_overlapping_windows_are_disjoint(
        traj in trajectory(200),
        lin in 1usize..30,
        lout in 1usize..30,
    ) {
        let config = SegmentConfig::new(lin, lout).with_stride(Stride::NonOverlapping);
        let set = segment_trajectory(&traj, &config).unwrap();
        prop_assert_eq!(set.len(), segment_count(traj.len(), lin, lout, lin));
        for s in 0..set.len() {
            prop_assert_eq!(set.input[[0, 0, s]], traj.samples[s * lin][0]);
        }
    }

    #[test]
    fn resample_stays_inside_input_span(
        traj in trajectory(100),
        dt in 0.01f64..1.0,
    ) {
        let out = resample(&traj, &ResampleConfig::new(dt)).unwrap();
        if traj.len() >= 2 {
            let (first, last) = traj.time_span().unwrap();
            prop_assert_eq!(out.timestamps[0], first);
            prop_assert!(out.timestamps.iter().all(|&t| t < last));
            prop_assert!(out.timestamps.windows(2).all(|w| w[1] > w[0]));
        } else {
            prop_assert_eq!(out, traj);
        }
    }
}
