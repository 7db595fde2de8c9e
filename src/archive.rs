//! Key → tensor archives in the safetensors format.
//!
//! Statistics and segment outputs are written as a flat mapping from names
//! to little-endian `f64` / `i64` tensors of any rank, including 0-d
//! scalars. The format is readable from Python (`safetensors.numpy`) and
//! Rust alike.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use ndarray::Array3;
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};
use serde::Serialize;

use crate::error::{DatasetError, Result};

/// Tensor element storage.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    /// 64-bit floats.
    F64(Vec<f64>),
    /// 64-bit signed integers.
    I64(Vec<i64>),
}

impl TensorData {
    fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::I64(v) => v.len(),
        }
    }

    const fn dtype(&self) -> Dtype {
        match self {
            Self::F64(_) => Dtype::F64,
            Self::I64(_) => Dtype::I64,
        }
    }

    fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            Self::F64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

/// One named entry of an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    /// Dimensions; empty for a scalar.
    pub shape: Vec<usize>,
    /// Row-major elements.
    pub data: TensorData,
}

/// Printable description of an archive entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TensorSummary {
    /// Entry name.
    pub name: String,
    /// `"F64"` or `"I64"`.
    pub dtype: String,
    /// Dimensions.
    pub shape: Vec<usize>,
    /// Values, only for tensors with at most `preview_limit` elements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
}

/// An ordered key → tensor mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorArchive {
    tensors: BTreeMap<String, Tensor>,
    metadata: BTreeMap<String, String>,
}

impl TensorArchive {
    /// Create an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a free-form string metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// String metadata stored with the archive.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Insert an `f64` tensor.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len()` does not match the shape.
    pub fn insert_f64(
        &mut self,
        name: impl Into<String>,
        shape: Vec<usize>,
        data: Vec<f64>,
    ) -> Result<()> {
        self.insert(name.into(), shape, TensorData::F64(data))
    }

    /// Insert an `i64` tensor.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len()` does not match the shape.
    pub fn insert_i64(
        &mut self,
        name: impl Into<String>,
        shape: Vec<usize>,
        data: Vec<i64>,
    ) -> Result<()> {
        self.insert(name.into(), shape, TensorData::I64(data))
    }

    /// Insert a 0-d `f64` scalar.
    ///
    /// # Errors
    ///
    /// Never fails in practice; shares the insert path.
    pub fn insert_scalar_f64(&mut self, name: impl Into<String>, value: f64) -> Result<()> {
        self.insert_f64(name, Vec::new(), vec![value])
    }

    /// Insert a 0-d `i64` scalar.
    ///
    /// # Errors
    ///
    /// Never fails in practice; shares the insert path.
    pub fn insert_scalar_i64(&mut self, name: impl Into<String>, value: i64) -> Result<()> {
        self.insert_i64(name, Vec::new(), vec![value])
    }

    /// Insert a rank-3 `f64` tensor in standard (row-major) layout.
    ///
    /// # Errors
    ///
    /// Never fails in practice; shares the insert path.
    pub fn insert_array3(&mut self, name: impl Into<String>, array: &Array3<f64>) -> Result<()> {
        let shape = array.shape().to_vec();
        let data = array.iter().copied().collect();
        self.insert_f64(name, shape, data)
    }

    fn insert(&mut self, name: String, shape: Vec<usize>, data: TensorData) -> Result<()> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(DatasetError::archive(format!(
                "tensor '{name}' has {} elements but shape {shape:?} needs {expected}",
                data.len()
            )));
        }
        self.tensors.insert(name, Tensor { shape, data });
        Ok(())
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether the archive has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Elements of an `f64` tensor.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is missing or not `f64`.
    pub fn f64_values(&self, name: &str) -> Result<&[f64]> {
        match self.get(name).map(|t| &t.data) {
            Some(TensorData::F64(v)) => Ok(v),
            Some(TensorData::I64(_)) => Err(DatasetError::archive(format!("'{name}' is not f64"))),
            None => Err(DatasetError::archive(format!("missing tensor '{name}'"))),
        }
    }

    /// Value of a single-element `f64` tensor.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is missing, not `f64` or not a scalar.
    pub fn scalar_f64(&self, name: &str) -> Result<f64> {
        match self.f64_values(name)? {
            [v] => Ok(*v),
            _ => Err(DatasetError::archive(format!("'{name}' is not a scalar"))),
        }
    }

    /// Value of a single-element `i64` tensor.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is missing, not `i64` or not a scalar.
    pub fn scalar_i64(&self, name: &str) -> Result<i64> {
        match self.get(name).map(|t| &t.data) {
            Some(TensorData::I64(v)) if v.len() == 1 => Ok(v[0]),
            Some(_) => Err(DatasetError::archive(format!("'{name}' is not an i64 scalar"))),
            None => Err(DatasetError::archive(format!("missing tensor '{name}'"))),
        }
    }

    /// Rebuild a rank-3 `f64` tensor.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is missing, not `f64` or not rank 3.
    pub fn array3(&self, name: &str) -> Result<Array3<f64>> {
        let values = self.f64_values(name)?.to_vec();
        let shape = &self.tensors[name].shape;
        let [a, b, c] = shape[..] else {
            return Err(DatasetError::archive(format!(
                "'{name}' has shape {shape:?}, expected rank 3"
            )));
        };
        Array3::from_shape_vec((a, b, c), values)
            .map_err(|e| DatasetError::archive(format!("'{name}': {e}")))
    }

    /// Encode in the safetensors format.
    ///
    /// # Errors
    ///
    /// Returns an error if the safetensors encoder rejects a tensor.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let buffers: Vec<(&str, &Tensor, Vec<u8>)> = self
            .tensors
            .iter()
            .map(|(name, t)| (name.as_str(), t, t.data.to_le_bytes()))
            .collect();

        let mut views = HashMap::with_capacity(buffers.len());
        for (name, tensor, bytes) in &buffers {
            let view = TensorView::new(tensor.data.dtype(), tensor.shape.clone(), bytes)
                .map_err(|e| DatasetError::archive(format!("tensor '{name}': {e}")))?;
            views.insert((*name).to_string(), view);
        }

        let metadata = (!self.metadata.is_empty())
            .then(|| self.metadata.clone().into_iter().collect::<HashMap<_, _>>());
        safetensors::serialize(views, &metadata)
            .map_err(|e| DatasetError::archive(format!("serialize failed: {e}")))
    }

    /// Decode from the safetensors format. Only `F64` and `I64` tensors are
    /// supported.
    ///
    /// # Errors
    ///
    /// Returns an error on a malformed buffer or an unsupported dtype.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let parsed = SafeTensors::deserialize(bytes)
            .map_err(|e| DatasetError::archive(format!("deserialize failed: {e}")))?;
        let (_, header) = SafeTensors::read_metadata(bytes)
            .map_err(|e| DatasetError::archive(format!("header read failed: {e}")))?;

        let mut archive = Self::new();
        if let Some(meta) = header.metadata() {
            archive.metadata = meta.clone().into_iter().collect();
        }

        for (name, view) in parsed.tensors() {
            let raw = view.data();
            let data = match view.dtype() {
                Dtype::F64 => TensorData::F64(
                    raw.chunks_exact(8)
                        .map(|c| f64::from_le_bytes(c.try_into().unwrap_or([0; 8])))
                        .collect(),
                ),
                Dtype::I64 => TensorData::I64(
                    raw.chunks_exact(8)
                        .map(|c| i64::from_le_bytes(c.try_into().unwrap_or([0; 8])))
                        .collect(),
                ),
                other => {
                    return Err(DatasetError::archive(format!(
                        "tensor '{name}' has unsupported dtype {other:?}"
                    )))
                }
            };
            archive.insert(name, view.shape().to_vec(), data)?;
        }
        Ok(archive)
    }

    /// Write to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an encoding or I/O error.
    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
        }
        fs::write(path, bytes).map_err(|e| DatasetError::io(path, e))
    }

    /// Read from `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O or decoding error.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| DatasetError::io(path, e))?;
        Self::from_bytes(&bytes)
    }

    /// Describe every entry; values are included for tensors with at most
    /// `preview_limit` elements.
    #[must_use]
    pub fn describe(&self, preview_limit: usize) -> Vec<TensorSummary> {
        self.tensors
            .iter()
            .map(|(name, t)| {
                let (dtype, values) = match &t.data {
                    TensorData::F64(v) => ("F64", v.clone()),
                    TensorData::I64(v) => ("I64", v.iter().map(|&x| x as f64).collect()),
                };
                TensorSummary {
                    name: name.clone(),
                    dtype: dtype.to_string(),
                    shape: t.shape.clone(),
                    values: (t.data.len() <= preview_limit).then_some(values),
                }
            })
            .collect()
    }
}
