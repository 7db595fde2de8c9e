//! Trajectory Dataset Library
//!
//! Preparation of 3D trajectory datasets (position / velocity time series)
//! for downstream analysis and model training.
//!
//! Every transform is a pure function over in-memory [`Trajectory`] values;
//! the [`pipeline`] module wires them to directories of delimited text files
//! and tensor archives, one function per command-line tool.
//!
//! # Features
//!
//! - **Velocity**: backward-difference velocities from positions
//! - **Statistics**: pooled mean, std, covariance and a whitening factor
//! - **Resampling**: piecewise-linear, fixed step, no extrapolation
//! - **Segmentation**: input/output window pairs with optional spline fits
//! - **Generation**: seeded synthetic linear, circular and lemniscate paths
//!
//! # Quick Start
//!
//! ```
//! use trajectory_dataset::{derive_velocity, segment_trajectory, SegmentConfig, Trajectory};
//!
//! let timestamps: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
//! let positions = timestamps.iter().map(|&t| [t, 0.0, 0.0]).collect();
//! let trajectory = Trajectory::positions(timestamps, positions)?;
//!
//! let velocity = derive_velocity(&trajectory);
//! assert_eq!(velocity.len(), 99);
//!
//! let segments = segment_trajectory(&trajectory, &SegmentConfig::new(10, 5))?;
//! assert_eq!(segments.input.shape(), &[3, 10, 86]);
//! # Ok::<(), trajectory_dataset::DatasetError>(())
//! ```
//!
//! # Archives
//!
//! | Tool | Keys |
//! |------|------|
//! | stats | `input_mean`, `input_std`, `target_mean`, `target_std`, `cov_matrix`, `L_matrix`, `max_length` / `max_velocity`, `sample_count` |
//! | segment | `input_segments`, `output_segments`, `num_input_segments`, `num_output_segments`, `inp_seg_len`, `out_seg_len`, spline `knots_*` / `coeffs_*` |
//! | chunk | one `[3·seg_len, n]` tensor per file name, `seg_len` |

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::needless_range_loop)]

pub mod archive;
pub mod config;
pub mod dataset;
pub mod distribution;
pub mod error;
pub mod generator;
pub mod math;
pub mod pipeline;
pub mod resample;
pub mod segment;
pub mod stats;
pub mod trajectory;
pub mod velocity;

// Re-exports for convenient access
pub use archive::{TensorArchive, TensorSummary};
pub use config::{
    GeneratorConfig, ResampleConfig, SegmentConfig, StatsConfig, Stride, MIN_SPLINE_WINDOW,
};
pub use dataset::{discover_trajectory_files, for_each_file, BatchReport};
pub use distribution::{summarize, AxisSummary, DistributionReport};
pub use error::{DatasetError, Result};
pub use generator::{Family, TrajectoryGenerator};
pub use math::CubicSpline;
pub use resample::resample;
pub use segment::{chunk_trajectory, segment_count, segment_trajectory, SegmentSet};
pub use stats::{
    apply_transform, compute_moments, compute_statistics, StatisticsRecord, Transform,
};
pub use trajectory::{read_trajectory, write_trajectory, SampleKind, Trajectory};
pub use velocity::{align_positions, derive_velocity, speeds};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of spatial channels per sample.
pub const CHANNELS: usize = 3;
