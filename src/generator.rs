//! Synthetic trajectory generation.
//!
//! Three families are produced, each with additive Gaussian position noise:
//! - **Linear**: constant velocity from the origin
//! - **Circle**: one full revolution in a randomly tilted plane
//! - **Lemniscate**: a Bernoulli figure-eight in a randomly tilted plane
//!
//! Tilted families are drawn in the XY plane and rotated so that `ẑ` maps to
//! a random unit normal. A seeded [`ChaCha8Rng`] makes a batch reproducible.

use std::f64::consts::PI;
use std::fmt::Write as _;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::error::{DatasetError, Result};
use crate::math::linalg::{apply3, normalize3};
use crate::math::rotation_between;
use crate::trajectory::Trajectory;

const Z_AXIS: [f64; 3] = [0.0, 0.0, 1.0];

/// Trajectory family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// Straight line at constant velocity.
    Linear,
    /// Full circle.
    Circle,
    /// Figure-eight.
    Lemniscate,
}

impl Family {
    /// All families, in output order.
    pub const ALL: [Self; 3] = [Self::Linear, Self::Circle, Self::Lemniscate];

    /// File name prefix.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Linear => "line",
            Self::Circle => "circle",
            Self::Lemniscate => "lemniscate",
        }
    }

    /// File name of the `index`-th trajectory (1-based).
    #[must_use]
    pub fn file_name(self, index: usize) -> String {
        format!("{}_{index}.txt", self.prefix())
    }
}

/// A generated trajectory and the file name it is written under.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTrajectory {
    /// Family it was drawn from.
    pub family: Family,
    /// File name, e.g. `circle_3.txt`.
    pub file_name: String,
    /// Noisy positions.
    pub trajectory: Trajectory,
}

/// Sample times `k * dt` strictly below `duration`.
#[must_use]
pub fn sample_times(duration: f64, dt: f64) -> Vec<f64> {
    let steps = duration / dt;
    if !(dt > 0.0) || !steps.is_finite() {
        return Vec::new();
    }
    let n = steps.ceil().max(0.0) as usize;
    (0..=n)
        .map(|k| k as f64 * dt)
        .take_while(|&t| t < duration)
        .collect()
}

/// Noiseless line `p(t) = v t`.
#[must_use]
pub fn linear_trajectory(velocity: [f64; 3], duration: f64, dt: f64) -> Trajectory {
    let timestamps = sample_times(duration, dt);
    let samples = timestamps
        .iter()
        .map(|&t| [velocity[0] * t, velocity[1] * t, velocity[2] * t])
        .collect();
    Trajectory {
        timestamps,
        samples,
        ..Trajectory::default()
    }
}

/// Noiseless circle covering one revolution.
///
/// The point `center + (r cos ωt, r sin ωt, 0)` is rotated as a whole by
/// the rotation taking `ẑ` to `normal`.
///
/// # Errors
///
/// Returns an error if `normal` is zero or not finite.
pub fn circular_trajectory(
    center: [f64; 3],
    radius: f64,
    angular_speed: f64,
    normal: [f64; 3],
    dt: f64,
) -> Result<Trajectory> {
    let rotation = rotation_between(&Z_AXIS, &normal)?;
    let duration = 2.0 * PI * radius / angular_speed;
    let timestamps = sample_times(duration, dt);
    let samples = timestamps
        .iter()
        .map(|&t| {
            let angle = angular_speed * t;
            let p = [
                center[0] + radius * angle.cos(),
                center[1] + radius * angle.sin(),
                center[2],
            ];
            apply3(&rotation, &p)
        })
        .collect();
    Ok(Trajectory {
        timestamps,
        samples,
        ..Trajectory::default()
    })
}

/// Noiseless Bernoulli lemniscate rotated into the plane with `normal`.
///
/// # Errors
///
/// Returns an error if `normal` is zero or not finite.
pub fn lemniscate_trajectory(
    scale: f64,
    angular_speed: f64,
    normal: [f64; 3],
    duration: f64,
    dt: f64,
) -> Result<Trajectory> {
    let rotation = rotation_between(&Z_AXIS, &normal)?;
    let timestamps = sample_times(duration, dt);
    let samples = timestamps
        .iter()
        .map(|&t| {
            let (sin, cos) = (angular_speed * t).sin_cos();
            let denom = 1.0 + sin * sin;
            apply3(&rotation, &[scale * cos / denom, scale * cos * sin / denom, 0.0])
        })
        .collect();
    Ok(Trajectory {
        timestamps,
        samples,
        ..Trajectory::default()
    })
}

/// Render a generated trajectory: `timestamp,tx,ty,tz` header, timestamps
/// to 2 decimals and coordinates to 5.
#[must_use]
pub fn format_generated(trajectory: &Trajectory) -> String {
    let mut out = String::from("timestamp,tx,ty,tz\n");
    for (t, p) in trajectory.timestamps.iter().zip(&trajectory.samples) {
        let _ = writeln!(out, "{t:.2}, {:.5}, {:.5}, {:.5}", p[0], p[1], p[2]);
    }
    out
}

/// Seeded generator for the three families.
pub struct TrajectoryGenerator {
    config: GeneratorConfig,
    rng: ChaCha8Rng,
    noise: Normal<f64>,
    unit_normal: Normal<f64>,
}

impl TrajectoryGenerator {
    /// Create a generator. Without a configured seed the RNG is seeded from
    /// the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let noise = Normal::new(0.0, config.noise)
            .map_err(|e| DatasetError::invalid_config(format!("noise: {e}")))?;
        let unit_normal = Normal::new(0.0, 1.0)
            .map_err(|e| DatasetError::invalid_config(e.to_string()))?;
        Ok(Self {
            config,
            rng,
            noise,
            unit_normal,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn uniform(&mut self, (lo, hi): (f64, f64)) -> f64 {
        self.rng.gen_range(lo..hi)
    }

    fn random_normal(&mut self) -> [f64; 3] {
        let v = [
            self.unit_normal.sample(&mut self.rng),
            self.unit_normal.sample(&mut self.rng),
            self.unit_normal.sample(&mut self.rng),
        ];
        normalize3(&v)
    }

    fn add_noise(&mut self, mut trajectory: Trajectory) -> Trajectory {
        if self.config.noise > 0.0 {
            for p in &mut trajectory.samples {
                for v in p.iter_mut() {
                    *v += self.noise.sample(&mut self.rng);
                }
            }
        }
        trajectory
    }

    /// Draw one trajectory of the given family.
    ///
    /// # Errors
    ///
    /// Returns an error if a degenerate plane normal is drawn.
    pub fn sample(&mut self, family: Family) -> Result<Trajectory> {
        let dt = self.config.dt;
        let clean = match family {
            Family::Linear => {
                let max = self.config.max_linear_speed;
                let speed = Uniform::new(-max, max);
                let v = [
                    speed.sample(&mut self.rng),
                    speed.sample(&mut self.rng),
                    speed.sample(&mut self.rng),
                ];
                linear_trajectory(v, self.config.linear_duration, dt)
            }
            Family::Circle => {
                let extent = self.config.center_extent;
                let center = [
                    self.uniform((-extent, extent)),
                    self.uniform((-extent, extent)),
                    self.uniform((-extent, extent)),
                ];
                let radius = self.uniform(self.config.radius_range);
                let speed = self.uniform(self.config.angular_speed_range);
                let normal = self.random_normal();
                circular_trajectory(center, radius, speed, normal, dt)?
            }
            Family::Lemniscate => {
                let scale = self.uniform(self.config.lemniscate_scale_range);
                let speed = self.uniform(self.config.angular_speed_range);
                let normal = self.random_normal();
                lemniscate_trajectory(scale, speed, normal, self.config.lemniscate_duration, dt)?
            }
        };
        Ok(self.add_noise(clean))
    }

    /// Draw `count_per_family` trajectories of every family.
    ///
    /// Trajectories with fewer than `min_points` samples are skipped; their
    /// index is not reused, so file names stay aligned with draw order.
    ///
    /// # Errors
    ///
    /// Returns an error if a degenerate plane normal is drawn.
    pub fn generate_all(&mut self) -> Result<Vec<GeneratedTrajectory>> {
        let mut out = Vec::with_capacity(3 * self.config.count_per_family);
        for family in Family::ALL {
            for index in 1..=self.config.count_per_family {
                let trajectory = self.sample(family)?;
                let file_name = family.file_name(index);
                if trajectory.len() < self.config.min_points {
                    tracing::warn!(
                        "skipping {}: {} samples, minimum is {}",
                        file_name,
                        trajectory.len(),
                        self.config.min_points
                    );
                    continue;
                }
                out.push(GeneratedTrajectory {
                    family,
                    file_name,
                    trajectory,
                });
            }
        }
        Ok(out)
    }
}
