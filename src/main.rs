//! Trajectory dataset CLI
//!
//! One subcommand per dataset tool. Logging goes to stderr; `--json`
//! prints a machine-readable summary on stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use trajectory_dataset::pipeline::{self, VelocityOptions};
use trajectory_dataset::{
    distribution::DEFAULT_BINS, GeneratorConfig, ResampleConfig, SegmentConfig, StatsConfig, Stride,
};

#[derive(Parser, Debug)]
#[command(name = "trajectory-dataset")]
#[command(about = "Generate, transform and segment 3D trajectory datasets", long_about = None)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print a JSON summary on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate synthetic linear, circular and lemniscate trajectories
    Generate {
        /// Output directory (created if missing)
        path: PathBuf,

        /// Time step between samples (s)
        #[arg(long, default_value = "0.1")]
        dt: f64,

        /// Standard deviation of the position noise (m)
        #[arg(long, default_value = "0.01")]
        noise: f64,

        /// Trajectories per family
        #[arg(long, default_value = "100")]
        count: usize,

        /// RNG seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,

        /// Skip trajectories with fewer samples
        #[arg(long, default_value = "2")]
        min_points: usize,
    },

    /// Derive velocities into ../velocity_processed_csv_files
    Velocity {
        /// Directory of position files
        input_directory: PathBuf,

        /// Write only timestamp and velocity columns
        #[arg(long)]
        velocity_only: bool,

        /// Resample to a fixed step before differencing
        #[arg(long)]
        resample: bool,

        /// Resampling step (s)
        #[arg(long, default_value = "0.1")]
        sample_time: f64,
    },

    /// Compute position/velocity statistics and the whitening transform
    Stats {
        /// Directory of position files
        directory: PathBuf,

        /// Where to write pos_stats / vel_stats (default: the input directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write whitened, max-normalized and standardized copies
        #[arg(long)]
        transform: bool,

        /// Minimum pooled sample count
        #[arg(long, default_value = "4")]
        min_samples: usize,

        /// Smallest acceptable covariance eigenvalue ratio
        #[arg(long, default_value = "1e-10")]
        condition_epsilon: f64,
    },

    /// Resample into ../resampled_trajectories_<ms>ms
    Resample {
        /// Directory of trajectory files
        directory: PathBuf,

        /// Sampling step (s)
        #[arg(default_value = "0.1")]
        sample_time: f64,
    },

    /// Cut input/output window pairs into one archive
    Segment {
        /// A trajectory file or a directory of them
        input: PathBuf,

        /// Input window length (samples)
        inp_seg_len: usize,

        /// Output window length (samples)
        out_seg_len: usize,

        /// Segment velocities instead of positions
        #[arg(long)]
        compute_velocity: bool,

        /// Advance windows by the input length instead of one sample
        #[arg(long)]
        non_overlapping: bool,

        /// Fit a cubic spline to every window
        #[arg(long)]
        splines: bool,

        /// Archive path
        #[arg(long, default_value = "segments.safetensors")]
        save_path: PathBuf,
    },

    /// Cut consecutive non-paired chunks, one tensor per file
    Chunk {
        /// Directory of position files
        directory: PathBuf,

        /// Chunk length (samples)
        seg_len: usize,

        /// Chunk velocities instead of positions
        #[arg(long)]
        compute_velocity: bool,

        /// Archive path
        #[arg(long, default_value = "segments.safetensors")]
        save_path: PathBuf,
    },

    /// Summarize the pooled position/velocity distribution
    Distribution {
        /// Directory of position files
        directory: PathBuf,

        /// Histogram bins
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,
    },

    /// List the contents of an archive
    Inspect {
        /// Archive path
        path: PathBuf,

        /// Print values of tensors with at most this many elements
        #[arg(long, default_value = "16")]
        preview: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn emit<T: Serialize>(json: bool, summary: &T) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Generate {
            path,
            dt,
            noise,
            count,
            seed,
            min_points,
        } => {
            let mut config = GeneratorConfig::default()
                .with_dt(dt)
                .with_noise(noise)
                .with_count(count)
                .with_min_points(min_points);
            config.seed = seed;
            let summary = pipeline::run_generate(&path, &config)
                .with_context(|| format!("generating into {}", path.display()))?;
            info!("trajectories generated at {}", summary.output_dir.display());
            emit(json, &summary)
        }

        Commands::Velocity {
            input_directory,
            velocity_only,
            resample,
            sample_time,
        } => {
            let options = VelocityOptions {
                velocity_only,
                resample: resample.then(|| ResampleConfig::new(sample_time)),
            };
            let summary = pipeline::run_velocity(&input_directory, &options)
                .with_context(|| format!("processing {}", input_directory.display()))?;
            info!(
                "total files processed: {} -> {}",
                summary.report.processed.len(),
                summary.output_dir.display()
            );
            emit(json, &summary)
        }

        Commands::Stats {
            directory,
            output,
            transform,
            min_samples,
            condition_epsilon,
        } => {
            let config = StatsConfig {
                min_samples,
                condition_epsilon,
                write_transforms: transform,
            };
            let output = output.unwrap_or_else(|| directory.clone());
            let summary = pipeline::run_stats(&directory, &output, &config)
                .with_context(|| format!("computing statistics for {}", directory.display()))?;
            for record in [&summary.position, &summary.velocity] {
                info!(
                    "{:?}: mean = {:?}, std = {:?}, {} = {:.6}",
                    record.kind,
                    record.mean,
                    record.std,
                    record.max_key(),
                    record.max_norm
                );
            }
            emit(json, &summary)
        }

        Commands::Resample {
            directory,
            sample_time,
        } => {
            let summary = pipeline::run_resample(&directory, &ResampleConfig::new(sample_time))
                .with_context(|| format!("resampling {}", directory.display()))?;
            emit(json, &summary)
        }

        Commands::Segment {
            input,
            inp_seg_len,
            out_seg_len,
            compute_velocity,
            non_overlapping,
            splines,
            save_path,
        } => {
            let stride = if non_overlapping {
                Stride::NonOverlapping
            } else {
                Stride::Sliding
            };
            let config = SegmentConfig::new(inp_seg_len, out_seg_len)
                .with_stride(stride)
                .with_velocity(compute_velocity)
                .with_splines(splines);
            let summary = pipeline::run_segment(&input, &config, &save_path)
                .with_context(|| format!("segmenting {}", input.display()))?;
            info!("total number of input segments: {}", summary.segments);
            info!("total number of output segments: {}", summary.segments);
            emit(json, &summary)
        }

        Commands::Chunk {
            directory,
            seg_len,
            compute_velocity,
            save_path,
        } => {
            let summary = pipeline::run_chunk(&directory, seg_len, compute_velocity, &save_path)
                .with_context(|| format!("chunking {}", directory.display()))?;
            for (name, n) in &summary.chunks {
                info!("number of segments for {}: {}", name, n);
            }
            emit(json, &summary)
        }

        Commands::Distribution { directory, bins } => {
            let summary = pipeline::run_distribution(&directory, bins)
                .with_context(|| format!("summarizing {}", directory.display()))?;
            if json {
                emit(json, &summary)
            } else {
                print!("{}", summary.distribution.to_text());
                Ok(())
            }
        }

        Commands::Inspect { path, preview } => inspect(&path, preview, json),
    }
}

fn inspect(path: &Path, preview: usize, json: bool) -> anyhow::Result<()> {
    let entries = pipeline::run_inspect(path, preview)
        .with_context(|| format!("reading {}", path.display()))?;
    if json {
        return emit(json, &entries);
    }
    for entry in &entries {
        match &entry.values {
            Some(values) if entry.shape.is_empty() => {
                println!("{} ({}): {}", entry.name, entry.dtype, values[0]);
            }
            Some(values) => {
                println!("{} ({}, {:?}): {:?}", entry.name, entry.dtype, entry.shape, values);
            }
            None => println!("{} ({}, {:?})", entry.name, entry.dtype, entry.shape),
        }
    }
    Ok(())
}
