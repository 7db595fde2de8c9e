//! Trajectory file discovery and batch iteration.
//!
//! Every multi-file tool processes the `.csv` / `.txt` files of one
//! directory in sorted path order. A file that fails to load or process is
//! logged and skipped; the batch continues and the failure is recorded in
//! the returned [`BatchReport`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{DatasetError, Result};

/// File extensions recognized as trajectory files.
pub const TRAJECTORY_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// Whether `path` has a trajectory file extension.
#[must_use]
pub fn is_trajectory_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| TRAJECTORY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Sorted trajectory files directly inside `dir`.
///
/// # Errors
///
/// Returns [`DatasetError::EmptyInput`] if `dir` does not exist, is not a
/// directory, or holds no trajectory files, and an I/O error if it cannot be
/// listed.
pub fn discover_trajectory_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DatasetError::empty_input(dir));
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| DatasetError::io(dir, e))? {
        let path = entry.map_err(|e| DatasetError::io(dir, e))?.path();
        if path.is_file() && is_trajectory_file(&path) {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(DatasetError::empty_input(dir));
    }
    files.sort();
    Ok(files)
}

/// A file that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    /// Offending file.
    pub path: PathBuf,
    /// Rendered error.
    pub error: String,
}

/// Outcome of a log-and-continue batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Files processed successfully, in order.
    pub processed: Vec<PathBuf>,
    /// Files skipped after an error, in order.
    pub failed: Vec<FileFailure>,
}

impl BatchReport {
    /// Total files attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }

    /// Whether every file succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record<T>(&mut self, path: &Path, outcome: Result<T>) -> Option<T> {
        match outcome {
            Ok(value) => {
                self.processed.push(path.to_path_buf());
                Some(value)
            }
            Err(e) => {
                tracing::warn!("skipping {}: {}", path.display(), e);
                self.failed.push(FileFailure {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

/// Run `f` on every file, logging and recording failures.
///
/// Returns the successful results (in file order) with the report.
pub fn for_each_file<T, F>(files: &[PathBuf], mut f: F) -> (Vec<T>, BatchReport)
where
    F: FnMut(&Path) -> Result<T>,
{
    let mut report = BatchReport::default();
    let mut results = Vec::with_capacity(files.len());
    for path in files {
        tracing::debug!("processing {}", path.display());
        if let Some(value) = report.record(path, f(path)) {
            results.push(value);
        }
    }
    (results, report)
}

/// File name of `path` as a string (lossy), for output naming.
#[must_use]
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::read_trajectory;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, text: &str) {
        fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn test_discovery_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.txt", "timestamp,tx,ty,tz\n");
        write(dir.path(), "a.csv", "timestamp,tx,ty,tz\n");
        write(dir.path(), "notes.md", "ignored");
        fs::create_dir(dir.path().join("sub.csv")).unwrap();

        let files = discover_trajectory_files(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.csv", "b.txt"]);
    }

    #[test]
    fn test_empty_and_missing_dirs() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            discover_trajectory_files(dir.path()),
            Err(DatasetError::EmptyInput { .. })
        ));
        assert!(matches!(
            discover_trajectory_files(&dir.path().join("missing")),
            Err(DatasetError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_for_each_file_skips_bad_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "good.csv", "timestamp,tx,ty,tz\n0,0,0,0\n1,1,1,1\n");
        write(dir.path(), "bad.csv", "time,x,y,z\n0,0,0,0\n");

        let files = discover_trajectory_files(dir.path()).unwrap();
        let (loaded, report) = for_each_file(&files, read_trajectory);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].len(), 2);
        assert_eq!(report.total(), 2);
        assert!(!report.is_clean());
        assert!(report.failed[0].path.ends_with("bad.csv"));
    }
}
