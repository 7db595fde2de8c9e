//! Windowed segmentation into input/output training pairs.
//!
//! A trajectory of `T` samples yields `floor((T - L_in - L_out) / step) + 1`
//! pairs when `T >= L_in + L_out` and none otherwise. Pair `s` takes its
//! input window from samples `[s*step, s*step + L_in)` and its output window
//! from the `L_out` samples that immediately follow. Windows never cross
//! trajectory boundaries; sets from several trajectories are joined along
//! the segment axis with [`SegmentSet::append`].
//!
//! Tensors are laid out `[channel, timestep, segment]`.

use ndarray::{Array3, Axis};
use serde::Serialize;

use crate::archive::TensorArchive;
use crate::config::SegmentConfig;
use crate::error::{DatasetError, Result};
use crate::math::CubicSpline;
use crate::trajectory::Trajectory;
use crate::velocity::derive_velocity;

/// Number of window pairs a trajectory of `len` samples yields.
#[must_use]
pub const fn segment_count(
    len: usize,
    inp_seg_len: usize,
    out_seg_len: usize,
    step: usize,
) -> usize {
    let span = inp_seg_len + out_seg_len;
    if len < span || step == 0 {
        0
    } else {
        (len - span) / step + 1
    }
}

/// Per-channel spline fits of one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSplines {
    /// One spline per channel (x, y, z).
    pub channels: [CubicSpline; 3],
}

impl WindowSplines {
    fn fit(window: ndarray::ArrayView2<'_, f64>) -> Result<Self> {
        let fit = |c: usize| CubicSpline::fit_indexed(&window.row(c).to_vec());
        Ok(Self {
            channels: [fit(0)?, fit(1)?, fit(2)?],
        })
    }

    /// Shared knot vector (knots depend only on the window length).
    #[must_use]
    pub fn knots(&self) -> &[f64] {
        &self.channels[0].knots
    }

    /// Coefficients as a `[3, knots]` row-major buffer.
    #[must_use]
    pub fn coeffs_flat(&self) -> Vec<f64> {
        self.channels
            .iter()
            .flat_map(|s| s.coeffs.iter().copied())
            .collect()
    }
}

/// Spline companions of one input/output pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSplines {
    /// Fit of the input window.
    pub input: WindowSplines,
    /// Fit of the output window.
    pub output: WindowSplines,
}

/// Input/output window tensors plus optional spline fits.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSet {
    /// Input windows, `[3, inp_seg_len, N]`.
    pub input: Array3<f64>,

    /// Output windows, `[3, out_seg_len, N]`.
    pub output: Array3<f64>,

    /// Input window length.
    pub inp_seg_len: usize,

    /// Output window length.
    pub out_seg_len: usize,

    /// One entry per segment when splines were requested.
    pub splines: Option<Vec<SegmentSplines>>,
}

impl SegmentSet {
    /// An empty set for the given configuration.
    #[must_use]
    pub fn empty(config: &SegmentConfig) -> Self {
        Self {
            input: Array3::zeros((3, config.inp_seg_len, 0)),
            output: Array3::zeros((3, config.out_seg_len, 0)),
            inp_seg_len: config.inp_seg_len,
            out_seg_len: config.out_seg_len,
            splines: config.fit_splines.then(Vec::new),
        }
    }

    /// Number of segment pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.input.len_of(Axis(2))
    }

    /// Whether the set holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append another set's segments after this one's.
    ///
    /// # Errors
    ///
    /// Returns an error if window lengths differ or only one side carries
    /// splines.
    pub fn append(&mut self, other: Self) -> Result<()> {
        if (self.inp_seg_len, self.out_seg_len) != (other.inp_seg_len, other.out_seg_len) {
            return Err(DatasetError::invalid_input(format!(
                "cannot join {}/{} windows with {}/{} windows",
                self.inp_seg_len, self.out_seg_len, other.inp_seg_len, other.out_seg_len
            )));
        }
        let shape_err = |e: ndarray::ShapeError| DatasetError::invalid_input(e.to_string());
        self.input
            .append(Axis(2), other.input.view())
            .map_err(shape_err)?;
        self.output
            .append(Axis(2), other.output.view())
            .map_err(shape_err)?;

        match (&mut self.splines, other.splines) {
            (Some(mine), Some(theirs)) => mine.extend(theirs),
            (None, None) => {}
            _ => {
                return Err(DatasetError::invalid_input(
                    "cannot join segment sets with and without splines",
                ))
            }
        }
        Ok(())
    }

    /// Archive with the segment keys and, if present, per-segment splines.
    ///
    /// # Errors
    ///
    /// Propagates archive construction errors.
    pub fn to_archive(&self) -> Result<TensorArchive> {
        let n = self.len() as i64;
        let mut archive = TensorArchive::new();
        archive.insert_array3("input_segments", &self.input)?;
        archive.insert_array3("output_segments", &self.output)?;
        archive.insert_scalar_i64("num_input_segments", n)?;
        archive.insert_scalar_i64("num_output_segments", n)?;
        archive.insert_scalar_i64("inp_seg_len", self.inp_seg_len as i64)?;
        archive.insert_scalar_i64("out_seg_len", self.out_seg_len as i64)?;

        for (i, pair) in self.splines.iter().flatten().enumerate() {
            for (side, fit) in [("input", &pair.input), ("output", &pair.output)] {
                let knots = fit.knots().to_vec();
                let width = knots.len();
                archive.insert_f64(format!("knots_{side}_{i}"), vec![width], knots)?;
                archive.insert_f64(
                    format!("coeffs_{side}_{i}"),
                    vec![3, width],
                    fit.coeffs_flat(),
                )?;
            }
        }
        Ok(archive)
    }

    /// Rebuild the window tensors from an archive written by
    /// [`SegmentSet::to_archive`]. Spline entries are not read back.
    ///
    /// # Errors
    ///
    /// Returns an error if required keys are missing or inconsistent.
    pub fn from_archive(archive: &TensorArchive) -> Result<Self> {
        let input = archive.array3("input_segments")?;
        let output = archive.array3("output_segments")?;
        if input.len_of(Axis(2)) != output.len_of(Axis(2)) {
            return Err(DatasetError::archive("input/output segment counts differ"));
        }
        let len = |key: &str| -> Result<usize> {
            usize::try_from(archive.scalar_i64(key)?)
                .map_err(|_| DatasetError::archive(format!("'{key}' is negative")))
        };
        Ok(Self {
            inp_seg_len: len("inp_seg_len")?,
            out_seg_len: len("out_seg_len")?,
            input,
            output,
            splines: None,
        })
    }
}

/// Split one trajectory into input/output window pairs.
///
/// With `compute_velocity` the backward-difference velocities are segmented
/// instead of the positions. Trajectories too short for a single pair give
/// an empty set.
///
/// # Errors
///
/// Returns an error for an invalid configuration or a failed spline fit.
pub fn segment_trajectory(trajectory: &Trajectory, config: &SegmentConfig) -> Result<SegmentSet> {
    config.validate()?;
    let source = if config.compute_velocity {
        derive_velocity(trajectory)
    } else {
        trajectory.clone()
    };
    let samples = &source.samples;
    let (lin, lout, step) = (config.inp_seg_len, config.out_seg_len, config.step());
    let n = segment_count(samples.len(), lin, lout, step);

    let input = Array3::from_shape_fn((3, lin, n), |(c, k, s)| samples[s * step + k][c]);
    let output = Array3::from_shape_fn((3, lout, n), |(c, k, s)| samples[s * step + lin + k][c]);

    let splines = if config.fit_splines {
        let fits = (0..n)
            .map(|s| {
                Ok(SegmentSplines {
                    input: WindowSplines::fit(input.index_axis(Axis(2), s))?,
                    output: WindowSplines::fit(output.index_axis(Axis(2), s))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Some(fits)
    } else {
        None
    };

    Ok(SegmentSet {
        input,
        output,
        inp_seg_len: lin,
        out_seg_len: lout,
        splines,
    })
}

/// Split one trajectory into consecutive non-overlapping windows of
/// `seg_len` samples, `[3, seg_len, floor(T / seg_len)]`. Trailing samples
/// that do not fill a window are dropped.
///
/// # Errors
///
/// Returns an error if `seg_len` is zero.
pub fn chunk_trajectory(
    trajectory: &Trajectory,
    seg_len: usize,
    compute_velocity: bool,
) -> Result<Array3<f64>> {
    if seg_len == 0 {
        return Err(DatasetError::invalid_config("seg_len must be at least 1"));
    }
    let source = if compute_velocity {
        derive_velocity(trajectory)
    } else {
        trajectory.clone()
    };
    let n = source.len() / seg_len;
    Ok(Array3::from_shape_fn((3, seg_len, n), |(c, k, s)| {
        source.samples[s * seg_len + k][c]
    }))
}

/// Archive of per-file chunk tensors, each flattened to
/// `[3 * seg_len, n_chunks]` under its file name, plus `seg_len`.
///
/// # Errors
///
/// Propagates archive construction errors.
pub fn chunk_archive<'a>(
    chunks: impl IntoIterator<Item = (&'a str, &'a Array3<f64>)>,
    seg_len: usize,
) -> Result<TensorArchive> {
    let mut archive = TensorArchive::new();
    for (name, chunk) in chunks {
        let (channels, len, n) = chunk.dim();
        let data = chunk.iter().copied().collect();
        archive.insert_f64(name, vec![channels * len, n], data)?;
    }
    archive.insert_scalar_i64("seg_len", seg_len as i64)?;
    Ok(archive)
}
