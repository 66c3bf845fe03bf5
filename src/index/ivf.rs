//! IVF: inverted-file index over k-means coarse quantization.
//!
//! Build partitions the store into `n_clusters` Voronoi cells and records,
//! per cell, the ids that fell into it. Search scores the query against
//! all centroids, walks only the `n_probe` nearest cells, and scans just
//! their id lists — effective cost `O(K·D + n_probe·N/K·D)` instead of the
//! flat scan's `O(N·D)`.
//!
//! Because cells partition the id range, a candidate can never be
//! collected twice and no deduplication is needed.

use std::io::{Read, Write};

use tracing::debug;

use crate::error::{ProximaError, Result};
use crate::index::{self, Index, SearchParams, SearchResults};
use crate::kmeans::KMeans;
use crate::math;
use crate::store::VectorView;
use crate::wire;

/// Coarse-quantization index.
pub struct IvfIndex {
    n_clusters: usize,
    dimension: usize,
    max_iters: usize,
    n_probe: usize,
    seed: Option<u64>,

    /// Cell centers, `n_clusters × dimension` once trained.
    centroids: Vec<Vec<f32>>,
    /// Per-cell id lists, parallel to `centroids`.
    inverted_lists: Vec<Vec<u32>>,
}

/// `max_iters` used when an index is reconstructed for loading; the value
/// is not persisted, so a restored index trains like a default one.
const DEFAULT_MAX_ITERS: usize = 50;

impl IvfIndex {
    /// Create an untrained IVF index.
    ///
    /// `n_probe` is the default number of cells probed per query; callers
    /// can override it per query via [`SearchParams::Ivf`].
    pub fn new(n_clusters: usize, dimension: usize, max_iters: usize, n_probe: usize) -> Result<Self> {
        if n_clusters == 0 || dimension == 0 || max_iters == 0 || n_probe == 0 {
            return Err(ProximaError::InvalidParameter(
                "n_clusters, dimension, max_iters, and n_probe must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            n_clusters,
            dimension,
            max_iters,
            n_probe,
            seed: None,
            centroids: Vec::new(),
            inverted_lists: Vec::new(),
        })
    }

    /// Placeholder instance for persistence: `load` overwrites everything
    /// except `max_iters` and the default `n_probe`, which are not part of
    /// the wire format.
    pub(crate) fn for_load(dimension: usize) -> Self {
        Self {
            n_clusters: 0,
            dimension,
            max_iters: DEFAULT_MAX_ITERS,
            n_probe: 1,
            seed: None,
            centroids: Vec::new(),
            inverted_lists: Vec::new(),
        }
    }

    /// Configure a deterministic seed for the k-means trainer.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Trained cell centers (empty before build).
    #[must_use]
    pub fn centroids(&self) -> &[Vec<f32>] {
        &self.centroids
    }

    /// Trained per-cell id lists (empty before build).
    #[must_use]
    pub fn inverted_lists(&self) -> &[Vec<u32>] {
        &self.inverted_lists
    }

    fn effective_n_probe(&self, params: Option<&SearchParams>) -> usize {
        let requested = match params {
            Some(SearchParams::Ivf { n_probe }) => *n_probe,
            _ => self.n_probe,
        };
        requested.clamp(1, self.centroids.len())
    }
}

impl Index for IvfIndex {
    fn build(&mut self, data: VectorView<'_>) -> Result<()> {
        if !data.is_empty() && data.dimension() != self.dimension {
            return Err(ProximaError::DimensionMismatch {
                expected: self.dimension,
                actual: data.dimension(),
            });
        }

        let mut trainer = KMeans::new(self.n_clusters, self.max_iters, self.dimension)?;
        if let Some(seed) = self.seed {
            trainer = trainer.with_seed(seed);
        }

        let outcome = trainer.train(data);
        self.centroids = outcome.centroids;
        self.inverted_lists = outcome.buckets;

        debug!(
            cells = self.centroids.len(),
            vectors = data.len(),
            "ivf index trained"
        );
        Ok(())
    }

    fn search(
        &self,
        data: VectorView<'_>,
        query: &[f32],
        k: usize,
        params: Option<&SearchParams>,
    ) -> Result<SearchResults> {
        index::check_query(data, query, k)?;
        if !self.is_trained() {
            return Err(ProximaError::NotTrained);
        }

        // Rank cells by centroid distance; ties resolve to the lower cell.
        let mut cell_scores: Vec<(u32, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(cell, centroid)| (cell as u32, math::squared_euclidean(query, centroid)))
            .collect();
        cell_scores.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let n_probe = self.effective_n_probe(params);
        let mut scored = Vec::new();
        for &(cell, _) in cell_scores.iter().take(n_probe) {
            for &id in &self.inverted_lists[cell as usize] {
                scored.push((id, math::squared_euclidean(query, data.row(id as usize))));
            }
        }

        Ok(index::rank_candidates(scored, k))
    }

    fn is_trained(&self) -> bool {
        !self.centroids.is_empty() && !self.inverted_lists.is_empty()
    }

    fn save(&self, out: &mut dyn Write) -> Result<()> {
        wire::write_len(out, self.centroids.len())?;
        wire::write_len(out, self.dimension)?;
        for centroid in &self.centroids {
            wire::write_f32_slice(out, centroid)?;
        }
        for list in &self.inverted_lists {
            wire::write_ids(out, list)?;
        }
        Ok(())
    }

    fn load(&mut self, input: &mut dyn Read) -> Result<()> {
        let n_clusters = wire::read_len(input, "centroid count")?;
        let dimension = wire::read_len(input, "centroid dimension")?;
        if n_clusters > 0 && dimension == 0 {
            return Err(ProximaError::CorruptIndex(
                "stored centroids claim dimension 0".to_string(),
            ));
        }

        let mut centroids = Vec::with_capacity(n_clusters);
        for _ in 0..n_clusters {
            centroids.push(wire::read_f32_vec(input, dimension)?);
        }

        let mut inverted_lists = Vec::with_capacity(n_clusters);
        for _ in 0..n_clusters {
            inverted_lists.push(wire::read_ids(input, "inverted list")?);
        }

        self.n_clusters = n_clusters;
        self.dimension = dimension;
        self.centroids = centroids;
        self.inverted_lists = inverted_lists;
        debug!(cells = self.n_clusters, "ivf index loaded");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "IVFIndex"
    }
}
