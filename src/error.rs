//! Error types for trajectory dataset operations.
//!
//! This module provides the error hierarchy shared by every transform and
//! batch tool in the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for trajectory dataset operations.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Input validation errors.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timestamps and samples have mismatched lengths.
    #[error("Length mismatch: {samples} samples vs {timestamps} timestamps")]
    LengthMismatch { samples: usize, timestamps: usize },

    /// Pooled sample too small to estimate a full-rank covariance.
    #[error("Insufficient samples for statistics: need at least {min}, got {actual}")]
    InsufficientSamples { min: usize, actual: usize },

    /// Covariance is singular or near-singular; whitening is undefined.
    #[error("Ill-conditioned input: {context}")]
    IllConditioned { context: String },

    /// Spline fitting failed.
    #[error("Spline error: {0}")]
    SplineError(String),

    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input directory missing or without trajectory files.
    #[error("No trajectory files found in {}", path.display())]
    EmptyInput { path: PathBuf },

    /// A trajectory file lacks the columns needed to load it.
    #[error(
        "Missing columns in {}: expected timestamp and tx,ty,tz or vx,vy,vz, found [{found}]",
        path.display()
    )]
    MissingColumns { path: PathBuf, found: String },

    /// Tensor archive could not be built, written or decoded.
    #[error("Archive error: {0}")]
    ArchiveError(String),

    /// Filesystem failure, with the path involved.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON sidecar serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for trajectory dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

impl DatasetError {
    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a length mismatch error.
    #[must_use]
    pub const fn length_mismatch(samples: usize, timestamps: usize) -> Self {
        Self::LengthMismatch {
            samples,
            timestamps,
        }
    }

    /// Create an insufficient samples error.
    #[must_use]
    pub const fn insufficient_samples(min: usize, actual: usize) -> Self {
        Self::InsufficientSamples { min, actual }
    }

    /// Create an ill-conditioned input error.
    #[must_use]
    pub fn ill_conditioned(context: impl Into<String>) -> Self {
        Self::IllConditioned {
            context: context.into(),
        }
    }

    /// Create a spline error.
    #[must_use]
    pub fn spline(msg: impl Into<String>) -> Self {
        Self::SplineError(msg.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an empty input error.
    #[must_use]
    pub fn empty_input(path: impl Into<PathBuf>) -> Self {
        Self::EmptyInput { path: path.into() }
    }

    /// Create an archive error.
    #[must_use]
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::ArchiveError(msg.into())
    }

    /// Wrap an I/O error with the path it occurred on.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is the ill-conditioned statistics failure path.
    #[must_use]
    pub const fn is_ill_conditioned(&self) -> bool {
        matches!(
            self,
            Self::IllConditioned { .. } | Self::InsufficientSamples { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DatasetError::insufficient_samples(10, 5);
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("5"));

        let err = DatasetError::ill_conditioned("covariance is singular");
        assert!(err.to_string().starts_with("Ill-conditioned input"));
    }

    #[test]
    fn test_error_constructors() {
        let _ = DatasetError::invalid_input("test");
        let _ = DatasetError::length_mismatch(10, 20);
        let _ = DatasetError::spline("window too short");
        let _ = DatasetError::archive("bad header");
        let err = DatasetError::empty_input("/tmp/nothing");
        assert!(err.to_string().contains("/tmp/nothing"));
    }

    #[test]
    fn test_ill_conditioned_classification() {
        assert!(DatasetError::ill_conditioned("x").is_ill_conditioned());
        assert!(DatasetError::insufficient_samples(4, 1).is_ill_conditioned());
        assert!(!DatasetError::invalid_input("x").is_ill_conditioned());
    }
}
