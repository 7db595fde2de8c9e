//! Trajectory type and delimited-text I/O.
//!
//! A [`Trajectory`] is an ordered series of timestamped 3-vectors, either
//! positions (`tx,ty,tz`) or velocities (`vx,vy,vz`). Files are comma
//! separated with a header row; columns are located by name, so extra
//! columns and any column order are accepted.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// What the three channels of a trajectory hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    /// Position in meters.
    #[default]
    Position,
    /// Velocity in meters per second.
    Velocity,
}

impl SampleKind {
    /// Column names used for this kind in files.
    #[must_use]
    pub const fn columns(self) -> [&'static str; 3] {
        match self {
            Self::Position => ["tx", "ty", "tz"],
            Self::Velocity => ["vx", "vy", "vz"],
        }
    }
}

/// An ordered sequence of timestamped 3D samples.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    /// Sample times in seconds.
    pub timestamps: Vec<f64>,

    /// One `[x, y, z]` per timestamp.
    pub samples: Vec<[f64; 3]>,

    /// Meaning of the samples.
    pub kind: SampleKind,
}

impl Trajectory {
    /// Build a trajectory, checking that both series have the same length.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::LengthMismatch`] if the lengths differ.
    pub fn new(timestamps: Vec<f64>, samples: Vec<[f64; 3]>, kind: SampleKind) -> Result<Self> {
        if timestamps.len() != samples.len() {
            return Err(DatasetError::length_mismatch(samples.len(), timestamps.len()));
        }
        Ok(Self {
            timestamps,
            samples,
            kind,
        })
    }

    /// Build a position trajectory.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::LengthMismatch`] if the lengths differ.
    pub fn positions(timestamps: Vec<f64>, samples: Vec<[f64; 3]>) -> Result<Self> {
        Self::new(timestamps, samples, SampleKind::Position)
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the trajectory has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First and last timestamp, if any.
    #[must_use]
    pub fn time_span(&self) -> Option<(f64, f64)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }

    /// Index of the first timestamp that does not increase, if any.
    #[must_use]
    pub fn first_non_increasing(&self) -> Option<usize> {
        self.timestamps
            .windows(2)
            .position(|w| w[1] <= w[0])
            .map(|i| i + 1)
    }

    /// Values of one channel (0 = x, 1 = y, 2 = z).
    #[must_use]
    pub fn channel(&self, axis: usize) -> Vec<f64> {
        self.samples.iter().map(|s| s[axis]).collect()
    }

    /// Parse a trajectory from delimited text.
    ///
    /// Rows whose required fields are missing or non-numeric are dropped,
    /// as are rows with a NaN sample or a non-finite timestamp. `source` is
    /// only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::MissingColumns`] if the header lacks a
    /// `timestamp` column or a complete `tx,ty,tz` / `vx,vy,vz` triple.
    pub fn from_csv_str(text: &str, source: &Path) -> Result<(Self, usize)> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header: Vec<String> = lines
            .next()
            .map(|h| h.split(',').map(|c| c.trim().to_ascii_lowercase()).collect())
            .unwrap_or_default();

        let missing = || DatasetError::MissingColumns {
            path: source.to_path_buf(),
            found: header.join(","),
        };
        let find = |name: &str| header.iter().position(|c| c == name);

        let time_col = find("timestamp").ok_or_else(missing)?;
        let (kind, cols) = [SampleKind::Position, SampleKind::Velocity]
            .into_iter()
            .find_map(|kind| {
                let [a, b, c] = kind.columns();
                Some((kind, [find(a)?, find(b)?, find(c)?]))
            })
            .ok_or_else(missing)?;

        let mut timestamps = Vec::new();
        let mut samples = Vec::new();
        let mut dropped = 0;

        for line in lines {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let parse = |i: usize| -> Option<f64> {
                fields.get(i)?.parse::<f64>().ok().filter(|v| !v.is_nan())
            };
            let time = parse(time_col).filter(|t| t.is_finite());
            match (time, parse(cols[0]), parse(cols[1]), parse(cols[2])) {
                (Some(t), Some(x), Some(y), Some(z)) => {
                    timestamps.push(t);
                    samples.push([x, y, z]);
                }
                _ => dropped += 1,
            }
        }

        Ok((
            Self {
                timestamps,
                samples,
                kind,
            },
            dropped,
        ))
    }

    /// Render as delimited text with a `timestamp,<channels>` header.
    #[must_use]
    pub fn to_csv_string(&self) -> String {
        let [a, b, c] = self.kind.columns();
        let mut out = format!("timestamp,{a},{b},{c}\n");
        for (t, s) in self.timestamps.iter().zip(&self.samples) {
            let _ = writeln!(out, "{t},{},{},{}", s[0], s[1], s[2]);
        }
        out
    }
}

/// Load a trajectory file, dropping malformed rows.
///
/// Timestamps that do not strictly increase are logged; resampling sorts
/// them, the other tools take rows in file order.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or
/// [`DatasetError::MissingColumns`] if the header is unusable.
pub fn read_trajectory(path: &Path) -> Result<Trajectory> {
    let text = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
    let (trajectory, dropped) = Trajectory::from_csv_str(&text, path)?;
    if dropped > 0 {
        tracing::debug!(
            "{}: dropped {} malformed row(s)",
            path.display(),
            dropped
        );
    }
    if let Some(i) = trajectory.first_non_increasing() {
        tracing::warn!(
            "{}: timestamps do not increase at row {} ({} after {})",
            path.display(),
            i,
            trajectory.timestamps[i],
            trajectory.timestamps[i - 1]
        );
    }
    Ok(trajectory)
}

/// Write a trajectory file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an I/O error if the directory or file cannot be written.
pub fn write_trajectory(path: &Path, trajectory: &Trajectory) -> Result<()> {
    write_text(path, &trajectory.to_csv_string())
}

/// Write positions and velocities side by side
/// (`timestamp,tx,ty,tz,vx,vy,vz`).
///
/// # Errors
///
/// Returns [`DatasetError::LengthMismatch`] if the two series differ in
/// length, or an I/O error on write failure.
pub fn write_position_velocity(
    path: &Path,
    positions: &Trajectory,
    velocities: &Trajectory,
) -> Result<()> {
    if positions.len() != velocities.len() {
        return Err(DatasetError::length_mismatch(
            velocities.len(),
            positions.len(),
        ));
    }
    let mut out = String::from("timestamp,tx,ty,tz,vx,vy,vz\n");
    for ((t, p), v) in positions
        .timestamps
        .iter()
        .zip(&positions.samples)
        .zip(&velocities.samples)
    {
        let _ = writeln!(
            out,
            "{t},{},{},{},{},{},{}",
            p[0], p[1], p[2], v[0], v[1], v[2]
        );
    }
    write_text(path, &out)
}

pub(crate) fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
    }
    fs::write(path, text).map_err(|e| DatasetError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> &'static Path {
        Path::new("test.csv")
    }

    #[test]
    fn test_parse_positions() {
        let text = "timestamp,tx,ty,tz\n0.0,1,2,3\n0.1, 4.5, 5.5, 6.5\n";
        let (traj, dropped) = Trajectory::from_csv_str(text, src()).unwrap();
        assert_eq!(dropped, 0);
        assert_eq!(traj.kind, SampleKind::Position);
        assert_eq!(traj.timestamps, vec![0.0, 0.1]);
        assert_eq!(traj.samples[1], [4.5, 5.5, 6.5]);
    }

    #[test]
    fn test_parse_reordered_and_extra_columns() {
        let text = "id,tz,ty,tx,timestamp\na,3,2,1,0.5\n";
        let (traj, _) = Trajectory::from_csv_str(text, src()).unwrap();
        assert_eq!(traj.samples, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(traj.timestamps, vec![0.5]);
    }

    #[test]
    fn test_parse_velocity_columns() {
        let text = "timestamp,vx,vy,vz\n0.0,1,0,0\n";
        let (traj, _) = Trajectory::from_csv_str(text, src()).unwrap();
        assert_eq!(traj.kind, SampleKind::Velocity);
    }

    #[test]
    fn test_malformed_rows_dropped() {
        let text = "timestamp,tx,ty,tz\n0.0,1,2,3\n0.1,abc,2,3\n0.2,1,2\n0.3,nan,1,1\n0.4,1,1,1\n";
        let (traj, dropped) = Trajectory::from_csv_str(text, src()).unwrap();
        assert_eq!(dropped, 3);
        assert_eq!(traj.len(), 2);
        assert_eq!(traj.timestamps, vec![0.0, 0.4]);
    }

    #[test]
    fn test_non_finite_timestamps_dropped() {
        let text = "timestamp,tx,ty,tz\n0.0,0,0,0\n1.0,1,0,0\ninf,2,0,0\n-inf,3,0,0\n2.0,inf,0,0\n";
        let (traj, dropped) = Trajectory::from_csv_str(text, src()).unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(traj.timestamps, vec![0.0, 1.0, 2.0]);
        assert_eq!(traj.samples[2][0], f64::INFINITY);
    }

    #[test]
    fn test_read_trajectory_accepts_unsorted_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unsorted.csv");
        fs::write(&path, "timestamp,tx,ty,tz\n1.0,1,0,0\n0.5,0,0,0\n").unwrap();
        let traj = read_trajectory(&path).unwrap();
        assert_eq!(traj.first_non_increasing(), Some(1));
        assert_eq!(traj.timestamps, vec![1.0, 0.5]);
    }

    #[test]
    fn test_missing_columns() {
        let text = "time,tx,ty,tz\n0,1,2,3\n";
        let err = Trajectory::from_csv_str(text, src()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumns { .. }));

        let err = Trajectory::from_csv_str("", src()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumns { .. }));
    }

    #[test]
    fn test_csv_round_trip() {
        let traj = Trajectory::positions(vec![0.0, 0.25], vec![[1.0, -2.0, 3.5], [0.0, 0.0, 1e-3]])
            .unwrap();
        let (parsed, _) = Trajectory::from_csv_str(&traj.to_csv_string(), src()).unwrap();
        assert_eq!(parsed, traj);
    }

    #[test]
    fn test_first_non_increasing() {
        let traj =
            Trajectory::positions(vec![0.0, 1.0, 1.0, 2.0], vec![[0.0; 3]; 4]).unwrap();
        assert_eq!(traj.first_non_increasing(), Some(2));
        assert!(Trajectory::positions(vec![0.0, 1.0], vec![[0.0; 3]; 2])
            .unwrap()
            .first_non_increasing()
            .is_none());
    }

    #[test]
    fn test_length_mismatch() {
        let err = Trajectory::positions(vec![0.0], vec![]).unwrap_err();
        assert!(matches!(err, DatasetError::LengthMismatch { .. }));
    }
}
