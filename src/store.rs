//! Append-only vector storage.
//!
//! Vectors are kept in a single contiguous row-major `Vec<f32>` (structure
//! of arrays) rather than a `Vec<Vec<f32>>`: scoring loops walk one flat
//! allocation, and persistence is a single header plus the raw matrix.
//! Vector ids are insertion indices and are never reused — the store
//! supports no deletion or update.

use std::io::{Read, Write};

use tracing::debug;

use crate::error::{ProximaError, Result};
use crate::wire;

/// Owning store for fixed-dimensional f32 vectors.
///
/// The dimension is adopted from the first vector appended; every later
/// append must match it.
#[derive(Debug, Default, Clone)]
pub struct VectorStore {
    data: Vec<f32>,
    dimension: usize,
    len: usize,
}

/// Borrowed read-only view of a store's matrix.
///
/// This is what indexes receive for build and search; it is `Copy` and
/// must not be retained past the call it was handed to.
#[derive(Debug, Clone, Copy)]
pub struct VectorView<'a> {
    data: &'a [f32],
    dimension: usize,
    len: usize,
}

impl<'a> VectorView<'a> {
    /// Row `i` of the matrix. Callers index within `[0, len)`.
    #[inline]
    #[must_use]
    pub fn row(&self, i: usize) -> &'a [f32] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Number of stored vectors.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shared dimension of all rows (0 while the view is empty).
    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Iterate rows in id order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [f32]> {
        let view = *self;
        (0..view.len).map(move |i| view.row(i))
    }
}

impl VectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one vector. The first append fixes the store's dimension.
    pub fn push(&mut self, vec: &[f32]) -> Result<()> {
        if vec.is_empty() {
            return Err(ProximaError::InvalidParameter(
                "cannot store an empty vector".to_string(),
            ));
        }

        if self.len == 0 {
            self.dimension = vec.len();
        } else if vec.len() != self.dimension {
            return Err(ProximaError::DimensionMismatch {
                expected: self.dimension,
                actual: vec.len(),
            });
        }

        self.data.extend_from_slice(vec);
        self.len += 1;
        Ok(())
    }

    /// Append `n` vectors from a contiguous `n × dim` row-major buffer.
    ///
    /// Equivalent to `n` individual [`push`](Self::push) calls.
    pub fn extend_from_buffer(&mut self, buf: &[f32], n: usize, dim: usize) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        if dim == 0 || buf.len() != n * dim {
            return Err(ProximaError::InvalidParameter(format!(
                "buffer of {} floats does not hold {n} vectors of dimension {dim}",
                buf.len()
            )));
        }

        if self.len == 0 {
            self.dimension = dim;
        } else if dim != self.dimension {
            return Err(ProximaError::DimensionMismatch {
                expected: self.dimension,
                actual: dim,
            });
        }

        self.data.extend_from_slice(buf);
        self.len += n;
        Ok(())
    }

    /// Read-only view of vector `i`.
    pub fn get(&self, i: usize) -> Result<&[f32]> {
        if i >= self.len {
            return Err(ProximaError::OutOfRange {
                index: i,
                len: self.len,
            });
        }
        Ok(&self.data[i * self.dimension..(i + 1) * self.dimension])
    }

    /// Read-only view of the full matrix.
    #[must_use]
    pub fn view(&self) -> VectorView<'_> {
        VectorView {
            data: &self.data,
            dimension: self.dimension,
            len: self.len,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dimension adopted from the first append (0 while empty).
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Write `(N: i32, D: i32)` followed by the row-major matrix.
    ///
    /// An empty store writes nothing at all.
    pub fn save(&self, out: &mut dyn Write) -> Result<()> {
        if self.len == 0 {
            return Ok(());
        }

        wire::write_len(out, self.len)?;
        wire::write_len(out, self.dimension)?;
        wire::write_f32_slice(out, &self.data)?;
        Ok(())
    }

    /// Reset this store from a stream written by [`save`](Self::save).
    pub fn load(&mut self, input: &mut dyn Read) -> Result<()> {
        let len = wire::read_len(input, "vector count")?;
        let dimension = wire::read_len(input, "dimension")?;
        if len > 0 && dimension == 0 {
            return Err(ProximaError::CorruptIndex(
                "stored vectors claim dimension 0".to_string(),
            ));
        }

        self.data = wire::read_f32_vec(input, len * dimension)?;
        self.len = len;
        self.dimension = dimension;
        debug!(vectors = self.len, dimension = self.dimension, "store loaded");
        Ok(())
    }
}
