//! Directory-level tools.
//!
//! Each `run_*` function wires the pure transforms of this crate to the
//! filesystem the way one command-line tool does: discover inputs, process
//! them with log-and-continue, write outputs and the effective
//! configuration as JSON next to them, and return a serializable summary.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Axis;
use serde::Serialize;

use crate::archive::{TensorArchive, TensorSummary};
use crate::config::{GeneratorConfig, ResampleConfig, SegmentConfig, StatsConfig};
use crate::dataset::{discover_trajectory_files, file_name, for_each_file, BatchReport};
use crate::distribution::{summarize, DistributionReport};
use crate::error::{DatasetError, Result};
use crate::generator::{format_generated, TrajectoryGenerator};
use crate::resample::resample;
use crate::segment::{chunk_archive, chunk_trajectory, segment_trajectory, SegmentSet};
use crate::stats::{
    apply_transform, compute_moments, compute_statistics, StatisticsRecord, Transform,
};
use crate::trajectory::{
    read_trajectory, write_position_velocity, write_text, write_trajectory, SampleKind, Trajectory,
};
use crate::velocity::{align_positions, derive_velocity};

/// Output directory of the velocity tool, created next to the input.
pub const VELOCITY_DIR: &str = "velocity_processed_csv_files";

/// Write `value` as pretty JSON.
///
/// # Errors
///
/// Returns a serialization or I/O error.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    write_text(path, &text)
}

/// `name` as a sibling of `dir`.
fn sibling_dir(dir: &Path, name: &str) -> Result<PathBuf> {
    let abs = fs::canonicalize(dir).map_err(|e| DatasetError::io(dir, e))?;
    Ok(abs.parent().unwrap_or(&abs).join(name))
}

/// `path` itself if it is a file, otherwise the trajectory files inside it.
fn input_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        Ok(vec![path.to_path_buf()])
    } else {
        discover_trajectory_files(path)
    }
}

fn read_positions(path: &Path) -> Result<Trajectory> {
    let trajectory = read_trajectory(path)?;
    if trajectory.kind != SampleKind::Position {
        return Err(DatasetError::invalid_input(
            "expected position columns tx,ty,tz",
        ));
    }
    Ok(trajectory)
}

fn log_report(tool: &str, report: &BatchReport) {
    if report.is_clean() {
        tracing::info!("{}: processed {} file(s)", tool, report.processed.len());
    } else {
        tracing::warn!(
            "{}: processed {} file(s), skipped {}",
            tool,
            report.processed.len(),
            report.failed.len()
        );
    }
}

/// Result of [`run_generate`].
#[derive(Debug, Clone, Serialize)]
pub struct GenerateSummary {
    /// Output directory.
    pub output_dir: PathBuf,
    /// Files written.
    pub files: Vec<String>,
}

/// Generate synthetic trajectories into `output_dir`.
///
/// # Errors
///
/// Returns an error for an invalid configuration or a failed write.
pub fn run_generate(output_dir: &Path, config: &GeneratorConfig) -> Result<GenerateSummary> {
    let mut generator = TrajectoryGenerator::new(config.clone())?;
    let generated = generator.generate_all()?;
    fs::create_dir_all(output_dir).map_err(|e| DatasetError::io(output_dir, e))?;

    let mut files = Vec::with_capacity(generated.len());
    for item in generated {
        write_text(
            &output_dir.join(&item.file_name),
            &format_generated(&item.trajectory),
        )?;
        files.push(item.file_name);
    }
    write_json(&output_dir.join("generator_config.json"), generator.config())?;
    tracing::info!("generated {} trajectories in {}", files.len(), output_dir.display());

    Ok(GenerateSummary {
        output_dir: output_dir.to_path_buf(),
        files,
    })
}

/// Options for [`run_velocity`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct VelocityOptions {
    /// Write only `timestamp,vx,vy,vz`.
    pub velocity_only: bool,
    /// Resample positions before differencing.
    pub resample: Option<ResampleConfig>,
}

/// Result of a per-file directory tool.
#[derive(Debug, Clone, Serialize)]
pub struct DirectorySummary {
    /// Directory the outputs were written to.
    pub output_dir: PathBuf,
    /// Per-file outcome.
    pub report: BatchReport,
}

/// Derive velocities for every file of `input_dir` into
/// `../velocity_processed_csv_files/`.
///
/// # Errors
///
/// Returns an error if the input directory is missing or empty, or the
/// resample interval is invalid.
pub fn run_velocity(input_dir: &Path, options: &VelocityOptions) -> Result<DirectorySummary> {
    if let Some(resample_config) = &options.resample {
        resample_config.validate()?;
    }
    let files = discover_trajectory_files(input_dir)?;
    let output_dir = sibling_dir(input_dir, VELOCITY_DIR)?;

    let (_, report) = for_each_file(&files, |path| {
        let mut positions = read_positions(path)?;
        if let Some(resample_config) = &options.resample {
            positions = resample(&positions, resample_config)?;
        }
        let velocities = derive_velocity(&positions);
        let out = output_dir.join(file_name(path));
        if options.velocity_only {
            write_trajectory(&out, &velocities)
        } else {
            write_position_velocity(&out, &align_positions(&positions), &velocities)
        }
    });

    write_json(&output_dir.join("velocity_config.json"), options)?;
    log_report("velocity", &report);
    Ok(DirectorySummary { output_dir, report })
}

/// Resample every file of `input_dir` into
/// `../resampled_trajectories_<ms>ms/`.
///
/// # Errors
///
/// Returns an error if the input directory is missing or empty, or the
/// interval is invalid.
pub fn run_resample(input_dir: &Path, config: &ResampleConfig) -> Result<DirectorySummary> {
    config.validate()?;
    let files = discover_trajectory_files(input_dir)?;
    let output_dir = sibling_dir(
        input_dir,
        &format!("resampled_trajectories_{}ms", config.millis()),
    )?;

    let (_, report) = for_each_file(&files, |path| {
        let trajectory = read_trajectory(path)?;
        let resampled = resample(&trajectory, config)?;
        tracing::debug!(
            "resampled {}: {} -> {} samples",
            path.display(),
            trajectory.len(),
            resampled.len()
        );
        write_trajectory(&output_dir.join(file_name(path)), &resampled)
    });

    write_json(&output_dir.join("resample_config.json"), config)?;
    log_report("resample", &report);
    Ok(DirectorySummary { output_dir, report })
}

/// Result of [`run_stats`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    /// Position statistics.
    pub position: StatisticsRecord,
    /// Velocity statistics.
    pub velocity: StatisticsRecord,
    /// Loading pass outcome.
    pub load: BatchReport,
    /// Transform pass outcome, if requested.
    pub transform: Option<BatchReport>,
}

fn write_statistics(output_dir: &Path, stem: &str, record: &StatisticsRecord) -> Result<()> {
    if record.skipped_non_finite > 0 {
        tracing::warn!(
            "{:?} statistics: excluded {} non-finite sample(s)",
            record.kind,
            record.skipped_non_finite
        );
    }
    record
        .to_archive()?
        .write(&output_dir.join(format!("{stem}.safetensors")))?;
    write_json(&output_dir.join(format!("{stem}.json")), record)
}

/// Compute position and velocity statistics over `input_dir` and write
/// `pos_stats` / `vel_stats` archives and JSON sidecars into `output_dir`.
///
/// Position statistics are written first. A singular velocity covariance
/// is not fatal: `vel_stats` is then written without `L_matrix`.
///
/// With `write_transforms`, every input file is re-read and written
/// whitened, max-normalized and standardized into subdirectories of
/// `output_dir`.
///
/// # Errors
///
/// Returns an error if no file loads, the position statistics are
/// ill-conditioned, or there are too few velocity samples.
pub fn run_stats(
    input_dir: &Path,
    output_dir: &Path,
    config: &StatsConfig,
) -> Result<StatsSummary> {
    config.validate()?;
    let files = discover_trajectory_files(input_dir)?;
    let (positions, load) = for_each_file(&files, read_positions);
    log_report("stats", &load);
    if positions.is_empty() {
        return Err(DatasetError::empty_input(input_dir));
    }

    let position = compute_statistics(&positions, config)?;
    write_statistics(output_dir, "pos_stats", &position)?;
    write_json(&output_dir.join("stats_config.json"), config)?;

    let velocities: Vec<Trajectory> = positions.iter().map(derive_velocity).collect();
    let velocity = match compute_statistics(&velocities, config) {
        Err(DatasetError::IllConditioned { context }) => {
            tracing::warn!("velocity statistics have no whitening factor: {}", context);
            compute_moments(&velocities, config)?
        }
        other => other?,
    };
    write_statistics(output_dir, "vel_stats", &velocity)?;
    tracing::info!(
        "statistics over {} position samples written to {}",
        position.sample_count,
        output_dir.display()
    );

    let transform = config.write_transforms.then(|| {
        let (_, report) = for_each_file(&files, |path| {
            let trajectory = read_positions(path)?;
            for t in Transform::ALL {
                let out = output_dir.join(t.dir_name()).join(file_name(path));
                write_trajectory(&out, &apply_transform(&trajectory, &position, t)?)?;
            }
            Ok(())
        });
        log_report("transform", &report);
        report
    });

    Ok(StatsSummary {
        position,
        velocity,
        load,
        transform,
    })
}

/// Result of [`run_segment`].
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    /// Archive path.
    pub save_path: PathBuf,
    /// Total segment pairs.
    pub segments: usize,
    /// Per-file outcome.
    pub report: BatchReport,
}

/// Segment a file, or every file of a directory, into one archive.
///
/// # Errors
///
/// Returns an error for an invalid configuration (checked before any file
/// is read), a missing or empty input, or a failed write.
pub fn run_segment(
    input: &Path,
    config: &SegmentConfig,
    save_path: &Path,
) -> Result<SegmentSummary> {
    config.validate()?;
    let files = input_files(input)?;

    let mut all = SegmentSet::empty(config);
    let (sets, report) = for_each_file(&files, |path| {
        let set = segment_trajectory(&read_positions(path)?, config)?;
        if set.is_empty() {
            tracing::warn!(
                "{}: too short for a {}+{} window, no segments",
                path.display(),
                config.inp_seg_len,
                config.out_seg_len
            );
        } else {
            tracing::debug!("{}: {} segment(s)", path.display(), set.len());
        }
        Ok(set)
    });
    for set in sets {
        all.append(set)?;
    }
    log_report("segment", &report);

    all.to_archive()?
        .with_metadata("stride", format!("{:?}", config.stride))
        .with_metadata("compute_velocity", config.compute_velocity.to_string())
        .write(save_path)?;
    write_json(&save_path.with_extension("config.json"), config)?;
    tracing::info!("total segments: {} -> {}", all.len(), save_path.display());

    Ok(SegmentSummary {
        save_path: save_path.to_path_buf(),
        segments: all.len(),
        report,
    })
}

/// Result of [`run_chunk`].
#[derive(Debug, Clone, Serialize)]
pub struct ChunkSummary {
    /// Archive path.
    pub save_path: PathBuf,
    /// Chunks per file name.
    pub chunks: Vec<(String, usize)>,
    /// Per-file outcome.
    pub report: BatchReport,
}

/// Split every file of `input_dir` into consecutive `seg_len` chunks and
/// store them per file name.
///
/// # Errors
///
/// Returns an error for `seg_len == 0`, a missing or empty input, or a
/// failed write.
pub fn run_chunk(
    input_dir: &Path,
    seg_len: usize,
    compute_velocity: bool,
    save_path: &Path,
) -> Result<ChunkSummary> {
    if seg_len == 0 {
        return Err(DatasetError::invalid_config("seg_len must be at least 1"));
    }
    let files = discover_trajectory_files(input_dir)?;
    let (chunks, report) = for_each_file(&files, |path| {
        let chunk = chunk_trajectory(&read_positions(path)?, seg_len, compute_velocity)?;
        tracing::debug!("{}: {} chunk(s)", path.display(), chunk.len_of(Axis(2)));
        Ok((file_name(path), chunk))
    });
    log_report("chunk", &report);

    chunk_archive(chunks.iter().map(|(n, c)| (n.as_str(), c)), seg_len)?.write(save_path)?;

    Ok(ChunkSummary {
        save_path: save_path.to_path_buf(),
        chunks: chunks
            .iter()
            .map(|(name, c)| (name.clone(), c.len_of(Axis(2))))
            .collect(),
        report,
    })
}

/// Result of [`run_distribution`].
#[derive(Debug, Clone, Serialize)]
pub struct DistributionSummary {
    /// Per-axis summaries.
    pub distribution: DistributionReport,
    /// Per-file outcome.
    pub report: BatchReport,
}

/// Summarize the pooled position/velocity distribution of `input_dir`.
///
/// # Errors
///
/// Returns an error if the input directory is missing or empty.
pub fn run_distribution(input_dir: &Path, bins: usize) -> Result<DistributionSummary> {
    let files = discover_trajectory_files(input_dir)?;
    let (trajectories, report) = for_each_file(&files, read_positions);
    log_report("distribution", &report);
    Ok(DistributionSummary {
        distribution: summarize(&trajectories, bins),
        report,
    })
}

/// Describe every entry of an archive.
///
/// # Errors
///
/// Returns an error if the archive cannot be read.
pub fn run_inspect(path: &Path, preview_limit: usize) -> Result<Vec<TensorSummary>> {
    let archive = TensorArchive::read(path)?;
    for (key, value) in archive.metadata() {
        tracing::debug!("metadata {} = {}", key, value);
    }
    Ok(archive.describe(preview_limit))
}
