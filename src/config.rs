//! Configuration for the dataset tools.
//!
//! Each tool has its own config struct with sensible defaults matching the
//! command-line defaults, a `validate()` method and builder-style setters.
//!
//! # Example
//!
//! ```
//! use trajectory_dataset::{SegmentConfig, Stride};
//!
//! let config = SegmentConfig::new(10, 5)
//!     .with_stride(Stride::NonOverlapping)
//!     .with_splines(true);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// Minimum window length for a cubic spline fit (degree + 1).
pub const MIN_SPLINE_WINDOW: usize = 4;

/// Parameters for synthetic trajectory generation.
///
/// Parameter ranges describe the uniform distributions each trajectory's
/// shape is drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Time step between samples (s).
    pub dt: f64,

    /// Standard deviation of the additive Gaussian position noise (m).
    pub noise: f64,

    /// Number of trajectories generated per family.
    pub count_per_family: usize,

    /// RNG seed. `None` draws a seed from the OS.
    pub seed: Option<u64>,

    /// Generated trajectories with fewer samples are skipped.
    pub min_points: usize,

    /// Duration of linear trajectories (s).
    pub linear_duration: f64,

    /// Velocity components of linear trajectories are drawn from
    /// `[-max_linear_speed, max_linear_speed]` (m/s).
    pub max_linear_speed: f64,

    /// Circle centers are drawn from `[-center_extent, center_extent]³` (m).
    pub center_extent: f64,

    /// Circle radius range (m).
    pub radius_range: (f64, f64),

    /// Angular speed range for circles and lemniscates (rad/s).
    pub angular_speed_range: (f64, f64),

    /// Lemniscate scale range (m).
    pub lemniscate_scale_range: (f64, f64),

    /// Duration of lemniscate trajectories (s).
    pub lemniscate_duration: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            noise: 0.01,
            count_per_family: 100,
            seed: None,
            min_points: 2,
            linear_duration: 10.0,
            max_linear_speed: 1.0,
            center_extent: 10.0,
            radius_range: (1.0, 5.0),
            angular_speed_range: (0.1, 2.0),
            lemniscate_scale_range: (0.5, 2.0),
            lemniscate_duration: 10.0,
        }
    }
}

impl GeneratorConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(DatasetError::invalid_config("dt must be positive"));
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(DatasetError::invalid_config("noise must be non-negative"));
        }
        if self.linear_duration <= 0.0 || self.lemniscate_duration <= 0.0 {
            return Err(DatasetError::invalid_config("durations must be positive"));
        }
        for (name, (lo, hi)) in [
            ("radius_range", self.radius_range),
            ("angular_speed_range", self.angular_speed_range),
            ("lemniscate_scale_range", self.lemniscate_scale_range),
        ] {
            if !(lo > 0.0 && lo < hi) {
                return Err(DatasetError::invalid_config(format!(
                    "{name} must satisfy 0 < low < high"
                )));
            }
        }
        if self.max_linear_speed <= 0.0 || self.center_extent <= 0.0 {
            return Err(DatasetError::invalid_config(
                "max_linear_speed and center_extent must be positive",
            ));
        }
        Ok(())
    }

    /// Small seeded batch for quick experiments and tests.
    #[must_use]
    pub fn small(seed: u64) -> Self {
        Self {
            count_per_family: 3,
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Set the time step.
    #[must_use]
    pub const fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the noise level.
    #[must_use]
    pub const fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the number of trajectories per family.
    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count_per_family = count;
        self
    }

    /// Set the minimum number of samples a generated trajectory must have.
    #[must_use]
    pub const fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }
}

/// Parameters for dataset statistics and whitening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Minimum pooled sample count. Must exceed the dimension (3).
    pub min_samples: usize,

    /// Smallest acceptable `λ_min / λ_max` of the covariance.
    pub condition_epsilon: f64,

    /// Whether to write whitened / max-normalized / standardized copies.
    pub write_transforms: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            min_samples: 4,
            condition_epsilon: 1e-10,
            write_transforms: false,
        }
    }
}

impl StatsConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `min_samples` does not exceed the dimension or the
    /// condition threshold is not a positive number.
    pub fn validate(&self) -> Result<()> {
        if self.min_samples <= 3 {
            return Err(DatasetError::invalid_config(
                "min_samples must exceed the dimension (3)",
            ));
        }
        if !(self.condition_epsilon.is_finite() && self.condition_epsilon > 0.0) {
            return Err(DatasetError::invalid_config(
                "condition_epsilon must be positive",
            ));
        }
        Ok(())
    }

    /// Enable/disable writing transformed copies of every input file.
    #[must_use]
    pub const fn with_transforms(mut self, write: bool) -> Self {
        self.write_transforms = write;
        self
    }

    /// Set the conditioning threshold.
    #[must_use]
    pub const fn with_condition_epsilon(mut self, eps: f64) -> Self {
        self.condition_epsilon = eps;
        self
    }
}

/// Window advance between consecutive segment pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stride {
    /// Advance by one sample; windows overlap.
    #[default]
    Sliding,
    /// Advance by the input window length.
    NonOverlapping,
}

/// Parameters for paired input/output segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Input window length (samples).
    pub inp_seg_len: usize,

    /// Output window length (samples).
    pub out_seg_len: usize,

    /// Window advance.
    pub stride: Stride,

    /// Segment backward-difference velocities instead of positions.
    pub compute_velocity: bool,

    /// Fit a cubic spline to every channel of every window.
    pub fit_splines: bool,
}

impl SegmentConfig {
    /// Create a sliding-window configuration.
    #[must_use]
    pub const fn new(inp_seg_len: usize, out_seg_len: usize) -> Self {
        Self {
            inp_seg_len,
            out_seg_len,
            stride: Stride::Sliding,
            compute_velocity: false,
            fit_splines: false,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for zero-length windows, or for spline fitting on
    /// windows shorter than [`MIN_SPLINE_WINDOW`].
    pub fn validate(&self) -> Result<()> {
        if self.inp_seg_len == 0 || self.out_seg_len == 0 {
            return Err(DatasetError::invalid_config(
                "segment lengths must be at least 1",
            ));
        }
        if self.fit_splines
            && (self.inp_seg_len < MIN_SPLINE_WINDOW || self.out_seg_len < MIN_SPLINE_WINDOW)
        {
            return Err(DatasetError::invalid_config(format!(
                "spline fitting needs windows of at least {MIN_SPLINE_WINDOW} samples"
            )));
        }
        Ok(())
    }

    /// Number of samples the window advances per pair.
    #[must_use]
    pub const fn step(&self) -> usize {
        match self.stride {
            Stride::Sliding => 1,
            Stride::NonOverlapping => self.inp_seg_len,
        }
    }

    /// Set the stride.
    #[must_use]
    pub const fn with_stride(mut self, stride: Stride) -> Self {
        self.stride = stride;
        self
    }

    /// Segment velocities instead of positions.
    #[must_use]
    pub const fn with_velocity(mut self, compute_velocity: bool) -> Self {
        self.compute_velocity = compute_velocity;
        self
    }

    /// Enable/disable per-window spline fits.
    #[must_use]
    pub const fn with_splines(mut self, fit_splines: bool) -> Self {
        self.fit_splines = fit_splines;
        self
    }
}

/// Parameters for regular-interval resampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampleConfig {
    /// Sampling interval (s).
    pub sample_time: f64,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self { sample_time: 0.1 }
    }
}

impl ResampleConfig {
    /// Create a configuration for the given interval.
    #[must_use]
    pub const fn new(sample_time: f64) -> Self {
        Self { sample_time }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error unless the interval is finite and positive.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_time.is_finite() && self.sample_time > 0.0) {
            return Err(DatasetError::invalid_config(
                "sample_time must be positive",
            ));
        }
        Ok(())
    }

    /// Interval in whole milliseconds, used in output directory names.
    #[must_use]
    pub fn millis(&self) -> u64 {
        (self.sample_time * 1000.0).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_generator_config() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dt, 0.1);
        assert_eq!(config.count_per_family, 100);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_generator_validation() {
        let mut config = GeneratorConfig::default();
        config.dt = 0.0;
        assert!(config.validate().is_err());

        config.dt = 0.1;
        config.noise = -1.0;
        assert!(config.validate().is_err());

        config.noise = 0.0;
        config.radius_range = (5.0, 1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generator_builder() {
        let config = GeneratorConfig::small(7).with_dt(0.05).with_noise(0.0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.count_per_family, 3);
        assert_eq!(config.dt, 0.05);
        assert_eq!(config.noise, 0.0);
    }

    #[test]
    fn test_stats_config() {
        assert!(StatsConfig::default().validate().is_ok());
        let config = StatsConfig {
            min_samples: 3,
            ..StatsConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(StatsConfig::default()
            .with_condition_epsilon(0.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_segment_config() {
        let config = SegmentConfig::new(10, 5);
        assert!(config.validate().is_ok());
        assert_eq!(config.step(), 1);
        assert_eq!(config.with_stride(Stride::NonOverlapping).step(), 10);

        assert!(SegmentConfig::new(0, 5).validate().is_err());
        assert!(SegmentConfig::new(3, 5).with_splines(true).validate().is_err());
        assert!(SegmentConfig::new(4, 4).with_splines(true).validate().is_ok());
    }

    #[test]
    fn test_resample_config() {
        assert!(ResampleConfig::new(0.05).validate().is_ok());
        assert!(ResampleConfig::new(0.0).validate().is_err());
        assert!(ResampleConfig::new(f64::NAN).validate().is_err());
        assert_eq!(ResampleConfig::new(0.05).millis(), 50);
    }
}
