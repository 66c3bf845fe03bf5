//! Database façade: a vector store plus one interchangeable index.
//!
//! The façade owns everything and keeps queries total: a database with no
//! index configured installs an exact [`FlatIndex`] on first search, and
//! an index that cannot train on the current data (IVF with more clusters
//! than vectors) is replaced by Flat rather than surfacing an error.
//!
//! Persistence writes the store region, then — for a non-empty store with
//! an index set — a `(name_len, name_bytes)` tag and the index's own
//! payload, so load can reinstantiate the right strategy.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, info};

use crate::error::{ProximaError, Result};
use crate::index::{AnnoyIndex, FlatIndex, Index, IvfIndex, SearchParams, SearchResults};
use crate::store::VectorStore;
use crate::wire;

/// An in-memory vector database.
#[derive(Default)]
pub struct VectorDb {
    store: VectorStore,
    index: Option<Box<dyn Index>>,
}

impl VectorDb {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one vector; the first append fixes the dimension.
    pub fn add_vector(&mut self, vec: &[f32]) -> Result<()> {
        self.store.push(vec)
    }

    /// Append `n` vectors from a contiguous `n × dim` row-major buffer.
    pub fn add_vectors(&mut self, buf: &[f32], n: usize, dim: usize) -> Result<()> {
        self.store.extend_from_buffer(buf, n, dim)
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Dimension adopted from the first append (0 while empty).
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    /// Read-only view of stored vector `i`.
    pub fn vector(&self, i: usize) -> Result<&[f32]> {
        self.store.get(i)
    }

    /// Install an index, replacing any existing one. The new index starts
    /// untrained; call [`build_index`](Self::build_index) or let the next
    /// search build it lazily.
    pub fn set_index(&mut self, index: Box<dyn Index>) {
        self.index = Some(index);
    }

    /// The currently installed index, if any.
    #[must_use]
    pub fn index(&self) -> Option<&dyn Index> {
        self.index.as_deref()
    }

    /// Build the installed index over the current store contents.
    pub fn build_index(&mut self) -> Result<()> {
        match self.index.as_mut() {
            Some(index) => index.build(self.store.view()),
            None => Err(ProximaError::InvalidParameter(
                "no index is set".to_string(),
            )),
        }
    }

    /// Find the `k` nearest stored vectors to `query`.
    ///
    /// Installs and builds a [`FlatIndex`] when none is set, and builds a
    /// stale index before delegating.
    pub fn search(
        &mut self,
        query: &[f32],
        k: usize,
        params: Option<&SearchParams>,
    ) -> Result<SearchResults> {
        if self.index.is_none() {
            let mut flat: Box<dyn Index> = Box::new(FlatIndex::new());
            flat.build(self.store.view())?;
            self.index = Some(flat);
        }

        if let Some(index) = self.index.as_mut() {
            if !index.is_trained() {
                index.build(self.store.view())?;
            }
            if !index.is_trained() {
                // Training produced nothing usable (e.g. IVF over fewer
                // vectors than clusters); serve exact results instead.
                debug!(
                    index = index.name(),
                    vectors = self.store.len(),
                    "index untrained after build, falling back to exhaustive scan"
                );
                let mut flat: Box<dyn Index> = Box::new(FlatIndex::new());
                flat.build(self.store.view())?;
                *index = flat;
            }
        }

        let index = self.index.as_deref().ok_or(ProximaError::NotTrained)?;
        index.search(self.store.view(), query, k, params)
    }

    /// Serialize the store and the installed index to `path`.
    ///
    /// An empty database produces an empty file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = BufWriter::new(File::create(path.as_ref())?);
        self.store.save(&mut out)?;

        if !self.store.is_empty() {
            if let Some(index) = self.index.as_deref() {
                let name = index.name();
                wire::write_len(&mut out, name.len())?;
                out.write_all(name.as_bytes())?;
                index.save(&mut out)?;
            }
        }

        out.flush()?;
        info!(path = %path.as_ref().display(), vectors = self.store.len(), "database saved");
        Ok(())
    }

    /// Replace this database's contents from a file written by
    /// [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(path.as_ref())?;
        self.store = VectorStore::new();
        self.index = None;

        if file.metadata()?.len() == 0 {
            return Ok(());
        }

        let mut input = BufReader::new(file);
        self.store.load(&mut input)?;

        // The index trailer is optional; clean EOF here means the file
        // was saved without one.
        let name_len = match input.read_i32::<LittleEndian>() {
            Ok(v) => v,
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        if name_len <= 0 {
            return Ok(());
        }

        let mut name_bytes = vec![0_u8; name_len as usize];
        input.read_exact(&mut name_bytes)?;
        let name = String::from_utf8_lossy(&name_bytes);

        let dimension = self.store.dimension();
        let mut index: Box<dyn Index> = match name.as_ref() {
            "IVFIndex" => Box::new(IvfIndex::for_load(dimension)),
            "AnnoyIndex" => Box::new(AnnoyIndex::for_load(dimension)),
            // Unknown discriminators degrade to exact search.
            _ => Box::new(FlatIndex::new()),
        };
        index.load(&mut input)?;

        info!(
            path = %path.as_ref().display(),
            vectors = self.store.len(),
            index = index.name(),
            "database loaded"
        );
        self.index = Some(index);
        Ok(())
    }
}
