//! Dataset statistics and whitening.
//!
//! All trajectories are pooled into one sample of 3-vectors. From it we
//! estimate the mean, per-axis standard deviation, covariance `Σ` (both with
//! the `n - 1` denominator) and a whitening factor `L`:
//!
//! ```text
//! Σ = C Cᵀ        (Cholesky, C lower triangular)
//! L = C⁻¹         (lower triangular, Lᵀ L = Σ⁻¹)
//! ```
//!
//! so that `L (x - mean)` has identity sample covariance.
//!
//! # Preconditions
//!
//! - at least `min_samples` finite samples (more than the dimension, 3)
//! - the samples must span all three axes: points on a line or a plane give
//!   a singular covariance and fail with [`DatasetError::IllConditioned`]
//!   instead of producing NaN.
//!
//! [`compute_moments`] relaxes the second precondition: it returns the same
//! record with no whitening factor.

use nalgebra::{Matrix3, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::archive::TensorArchive;
use crate::config::StatsConfig;
use crate::error::{DatasetError, Result};
use crate::math::linalg::{apply3, norm3, sub3};
use crate::trajectory::{SampleKind, Trajectory};

/// Aggregate statistics over a whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    /// Whether the statistics describe positions or velocities.
    pub kind: SampleKind,

    /// Per-axis mean.
    pub mean: [f64; 3],

    /// Per-axis sample standard deviation.
    pub std: [f64; 3],

    /// Sample covariance, row-major.
    pub covariance: [[f64; 3]; 3],

    /// Lower-triangular whitening factor, row-major. `None` when the
    /// covariance is singular.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitening: Option<[[f64; 3]; 3]>,

    /// Largest Euclidean norm of any pooled sample.
    pub max_norm: f64,

    /// Number of pooled samples.
    pub sample_count: usize,

    /// Samples excluded because a component was NaN or infinite.
    pub skipped_non_finite: usize,
}

impl StatisticsRecord {
    /// Whitening factor as a matrix, if one exists.
    #[must_use]
    pub fn whitening_matrix(&self) -> Option<Matrix3<f64>> {
        self.whitening.as_ref().map(from_rows)
    }

    /// Covariance as a matrix.
    #[must_use]
    pub fn covariance_matrix(&self) -> Matrix3<f64> {
        from_rows(&self.covariance)
    }

    /// Archive key of the maximum-norm scalar for this kind.
    #[must_use]
    pub const fn max_key(&self) -> &'static str {
        match self.kind {
            SampleKind::Position => "max_length",
            SampleKind::Velocity => "max_velocity",
        }
    }

    /// Tensor archive with the statistics keys. `L_matrix` is left out when
    /// there is no whitening factor.
    ///
    /// # Errors
    ///
    /// Propagates archive construction errors.
    pub fn to_archive(&self) -> Result<TensorArchive> {
        let flat = |m: &[[f64; 3]; 3]| m.iter().flatten().copied().collect::<Vec<f64>>();
        let mut archive = TensorArchive::new().with_metadata("kind", format!("{:?}", self.kind));
        archive.insert_f64("input_mean", vec![3], self.mean.to_vec())?;
        archive.insert_f64("input_std", vec![3], self.std.to_vec())?;
        archive.insert_f64("target_mean", vec![3], self.mean.to_vec())?;
        archive.insert_f64("target_std", vec![3], self.std.to_vec())?;
        archive.insert_f64("cov_matrix", vec![3, 3], flat(&self.covariance))?;
        if let Some(whitening) = &self.whitening {
            archive.insert_f64("L_matrix", vec![3, 3], flat(whitening))?;
        }
        archive.insert_scalar_f64(self.max_key(), self.max_norm)?;
        archive.insert_scalar_i64("sample_count", self.sample_count as i64)?;
        Ok(archive)
    }
}

/// Compute pooled statistics over `trajectories`.
///
/// # Errors
///
/// Returns [`DatasetError::InsufficientSamples`] below `min_samples` finite
/// samples and [`DatasetError::IllConditioned`] when the covariance is
/// singular, near-singular (reciprocal condition number below
/// `condition_epsilon`) or not positive definite.
pub fn compute_statistics(
    trajectories: &[Trajectory],
    config: &StatsConfig,
) -> Result<StatisticsRecord> {
    let mut record = compute_moments(trajectories, config)?;
    let whitening = whitening_factor(&record.covariance_matrix(), config.condition_epsilon)?;
    record.whitening = Some(to_rows(&whitening));
    Ok(record)
}

/// Mean, std, covariance and maximum norm without a whitening factor.
///
/// # Errors
///
/// Returns [`DatasetError::InsufficientSamples`] below `min_samples` finite
/// samples.
pub fn compute_moments(
    trajectories: &[Trajectory],
    config: &StatsConfig,
) -> Result<StatisticsRecord> {
    config.validate()?;
    let kind = trajectories.first().map(|t| t.kind).unwrap_or_default();

    let total: usize = trajectories.iter().map(Trajectory::len).sum();
    let pooled: Vec<[f64; 3]> = trajectories
        .iter()
        .flat_map(|t| t.samples.iter())
        .filter(|s| s.iter().all(|v| v.is_finite()))
        .copied()
        .collect();
    let skipped_non_finite = total - pooled.len();

    let n = pooled.len();
    if n < config.min_samples {
        return Err(DatasetError::insufficient_samples(config.min_samples, n));
    }

    let mut mean = [0.0; 3];
    for s in &pooled {
        for i in 0..3 {
            mean[i] += s[i];
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    let mut cov = Matrix3::zeros();
    let mut max_norm = 0.0f64;
    for s in &pooled {
        let d = sub3(s, &mean);
        for i in 0..3 {
            for j in 0..3 {
                cov[(i, j)] += d[i] * d[j];
            }
        }
        max_norm = max_norm.max(norm3(s));
    }
    cov /= (n - 1) as f64;

    let std = [cov[(0, 0)].sqrt(), cov[(1, 1)].sqrt(), cov[(2, 2)].sqrt()];

    Ok(StatisticsRecord {
        kind,
        mean,
        std,
        covariance: to_rows(&cov),
        whitening: None,
        max_norm,
        sample_count: n,
        skipped_non_finite,
    })
}

/// Lower-triangular `L` with `L Σ Lᵀ = I`.
///
/// # Errors
///
/// Returns [`DatasetError::IllConditioned`] if `cov` is not finite, has a
/// reciprocal condition number below `condition_epsilon`, or fails Cholesky.
pub fn whitening_factor(cov: &Matrix3<f64>, condition_epsilon: f64) -> Result<Matrix3<f64>> {
    if cov.iter().any(|v| !v.is_finite()) {
        return Err(DatasetError::ill_conditioned("covariance has non-finite entries"));
    }

    let eigen = SymmetricEigen::new(*cov);
    let max_eig = eigen.eigenvalues.max();
    let min_eig = eigen.eigenvalues.min();
    if max_eig <= 0.0 {
        return Err(DatasetError::ill_conditioned(
            "covariance is zero: all samples are identical",
        ));
    }
    let rcond = min_eig / max_eig;
    if rcond < condition_epsilon {
        return Err(DatasetError::ill_conditioned(format!(
            "covariance is singular or near-singular (λmin/λmax = {rcond:.3e}); \
             samples must not be collinear or coplanar"
        )));
    }

    let chol = cov
        .cholesky()
        .ok_or_else(|| DatasetError::ill_conditioned("covariance is not positive definite"))?;
    chol.l()
        .try_inverse()
        .ok_or_else(|| DatasetError::ill_conditioned("Cholesky factor is not invertible"))
}

/// Normalizing transforms derived from a [`StatisticsRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// `L (x - mean)`.
    Whiten,
    /// `x / max_norm`.
    MaxNormalize,
    /// `(x - mean) / std`, per axis.
    Standardize,
}

impl Transform {
    /// All transforms, in output order.
    pub const ALL: [Self; 3] = [Self::Whiten, Self::MaxNormalize, Self::Standardize];

    /// Output directory name for files written with this transform.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Whiten => "whitened",
            Self::MaxNormalize => "max_normalized",
            Self::Standardize => "standardized",
        }
    }

    /// Apply to one sample. `None` for [`Transform::Whiten`] when the
    /// record has no whitening factor.
    #[must_use]
    pub fn apply(self, record: &StatisticsRecord, x: &[f64; 3]) -> Option<[f64; 3]> {
        match self {
            Self::Whiten => {
                let l = record.whitening_matrix()?;
                Some(apply3(&l, &sub3(x, &record.mean)))
            }
            Self::MaxNormalize => Some([
                x[0] / record.max_norm,
                x[1] / record.max_norm,
                x[2] / record.max_norm,
            ]),
            Self::Standardize => Some([
                (x[0] - record.mean[0]) / record.std[0],
                (x[1] - record.mean[1]) / record.std[1],
                (x[2] - record.mean[2]) / record.std[2],
            ]),
        }
    }
}

/// Apply a transform to every sample of a trajectory; timestamps are kept.
///
/// # Errors
///
/// Returns [`DatasetError::IllConditioned`] when whitening with a record
/// that has no whitening factor.
pub fn apply_transform(
    trajectory: &Trajectory,
    record: &StatisticsRecord,
    transform: Transform,
) -> Result<Trajectory> {
    let samples = trajectory
        .samples
        .iter()
        .map(|x| transform.apply(record, x))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            DatasetError::ill_conditioned(format!(
                "{:?} statistics have no whitening factor",
                record.kind
            ))
        })?;
    Ok(Trajectory {
        timestamps: trajectory.timestamps.clone(),
        samples,
        kind: trajectory.kind,
    })
}

fn to_rows(m: &Matrix3<f64>) -> [[f64; 3]; 3] {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

fn from_rows(rows: &[[f64; 3]; 3]) -> Matrix3<f64> {
    Matrix3::from_fn(|i, j| rows[i][j])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    /// Correlated Gaussian cloud split over a few trajectories.
    fn correlated_dataset(seed: u64) -> Vec<Trajectory> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..4)
            .map(|k| {
                let samples: Vec<[f64; 3]> = (0..250)
                    .map(|_| {
                        let (a, b, c) = (
                            normal.sample(&mut rng),
                            normal.sample(&mut rng),
                            normal.sample(&mut rng),
                        );
                        [2.0 * a + 5.0, 0.8 * a + 0.5 * b - 1.0, 0.3 * a - 0.2 * b + 0.1 * c]
                    })
                    .collect();
                let timestamps = (0..samples.len()).map(|i| k as f64 * 100.0 + i as f64).collect();
                Trajectory::positions(timestamps, samples).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_whitening_gives_zero_mean_unit_variance() {
        let data = correlated_dataset(11);
        let record = compute_statistics(&data, &StatsConfig::default()).unwrap();
        let whitened: Vec<Trajectory> = data
            .iter()
            .map(|t| apply_transform(t, &record, Transform::Whiten).unwrap())
            .collect();

        let check = compute_statistics(&whitened, &StatsConfig::default()).unwrap();
        for i in 0..3 {
            assert_relative_eq!(check.mean[i], 0.0, epsilon = 1e-9);
            assert_relative_eq!(check.std[i], 1.0, epsilon = 1e-9);
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(check.covariance[i][j], expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_whitening_factor_is_lower_triangular_inverse_factor() {
        let record = compute_statistics(&correlated_dataset(3), &StatsConfig::default()).unwrap();
        let l = record.whitening_matrix().unwrap();
        assert_relative_eq!(l[(0, 1)], 0.0);
        assert_relative_eq!(l[(0, 2)], 0.0);
        assert_relative_eq!(l[(1, 2)], 0.0);

        let inv_cov = record.covariance_matrix().try_inverse().unwrap();
        assert_relative_eq!(l.transpose() * l, inv_cov, epsilon = 1e-8, max_relative = 1e-8);
    }

    #[test]
    fn test_noiseless_line_is_ill_conditioned() {
        let timestamps: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
        let samples = timestamps.iter().map(|&t| [t, 0.0, 0.0]).collect();
        let traj = Trajectory::positions(timestamps, samples).unwrap();

        let err = compute_statistics(&[traj], &StatsConfig::default()).unwrap_err();
        assert!(matches!(err, DatasetError::IllConditioned { .. }));
    }

    #[test]
    fn test_coplanar_is_ill_conditioned() {
        let timestamps: Vec<f64> = (0..50).map(f64::from).collect();
        let samples = timestamps
            .iter()
            .map(|&t| [t.cos() * 3.0, t.sin() * 3.0, 1.0])
            .collect();
        let traj = Trajectory::positions(timestamps, samples).unwrap();
        assert!(compute_statistics(&[traj], &StatsConfig::default())
            .unwrap_err()
            .is_ill_conditioned());
    }

    #[test]
    fn test_moments_of_singular_data_have_no_whitening() {
        let timestamps: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
        let samples = timestamps.iter().map(|&t| [t, 0.0, 0.0]).collect();
        let traj = Trajectory::positions(timestamps, samples).unwrap();

        let record = compute_moments(&[traj.clone()], &StatsConfig::default()).unwrap();
        assert!(record.whitening.is_none());
        assert_relative_eq!(record.max_norm, 9.9, epsilon = 1e-12);
        assert_relative_eq!(record.std[1], 0.0);

        let archive = record.to_archive().unwrap();
        assert!(archive.get("L_matrix").is_none());
        assert!(archive.get("cov_matrix").is_some());

        let err = apply_transform(&traj, &record, Transform::Whiten).unwrap_err();
        assert!(err.is_ill_conditioned());
        assert!(apply_transform(&traj, &record, Transform::MaxNormalize).is_ok());
    }

    #[test]
    fn test_insufficient_samples() {
        let traj = Trajectory::positions(
            vec![0.0, 1.0, 2.0],
            vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        )
        .unwrap();
        let err = compute_statistics(&[traj], &StatsConfig::default()).unwrap_err();
        assert!(matches!(err, DatasetError::InsufficientSamples { min: 4, actual: 3 }));

        let err = compute_statistics(&[], &StatsConfig::default()).unwrap_err();
        assert!(matches!(err, DatasetError::InsufficientSamples { actual: 0, .. }));
    }

    #[test]
    fn test_non_finite_samples_are_skipped() {
        let mut data = correlated_dataset(5);
        data[0].samples[0] = [f64::INFINITY, f64::NAN, 0.0];
        let record = compute_statistics(&data, &StatsConfig::default()).unwrap();
        assert_eq!(record.skipped_non_finite, 1);
        assert_eq!(record.sample_count, 999);
        assert!(record.mean.iter().all(|m| m.is_finite()));
    }

    #[test]
    fn test_max_normalize_and_standardize() {
        let data = correlated_dataset(9);
        let record = compute_statistics(&data, &StatsConfig::default()).unwrap();

        let normalized = apply_transform(&data[0], &record, Transform::MaxNormalize).unwrap();
        assert!(normalized.samples.iter().all(|s| norm3(s) <= 1.0 + 1e-12));

        let standardized: Vec<Trajectory> = data
            .iter()
            .map(|t| apply_transform(t, &record, Transform::Standardize).unwrap())
            .collect();
        let check = compute_statistics(&standardized, &StatsConfig::default()).unwrap();
        for i in 0..3 {
            assert_relative_eq!(check.mean[i], 0.0, epsilon = 1e-9);
            assert_relative_eq!(check.std[i], 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_archive_keys() {
        let record = compute_statistics(&correlated_dataset(1), &StatsConfig::default()).unwrap();
        let archive = record.to_archive().unwrap();
        for key in [
            "input_mean",
            "input_std",
            "target_mean",
            "target_std",
            "cov_matrix",
            "L_matrix",
            "max_length",
            "sample_count",
        ] {
            assert!(archive.get(key).is_some(), "missing {key}");
        }
        assert_eq!(archive.get("L_matrix").unwrap().shape, vec![3, 3]);
        assert_relative_eq!(archive.scalar_f64("max_length").unwrap(), record.max_norm);
    }
}
