//! Pluggable index strategies.
//!
//! Every index implements the same [`Index`] contract over a borrowed
//! [`VectorView`]: the store owns the raw vectors, the index owns only its
//! learned state (centroids, trees), and search borrows both for the
//! duration of a call. Indexes are interchangeable behind `Box<dyn Index>`.

use std::io::{Read, Write};

use crate::error::{ProximaError, Result};
use crate::store::VectorView;

pub mod annoy;
pub mod flat;
pub mod ivf;

pub use annoy::AnnoyIndex;
pub use flat::FlatIndex;
pub use ivf::IvfIndex;

/// Per-query tuning knobs.
///
/// A sum type rather than a trait hierarchy: each index inspects its own
/// variant and falls back to its constructed defaults on any other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchParams {
    /// IVF: number of cells to probe (clamped to `[1, K]` by the index).
    Ivf { n_probe: usize },
    /// Annoy: node-visit budget for best-first traversal, and which
    /// traversal to run.
    Annoy {
        search_k_nodes: usize,
        use_priority_queue: bool,
    },
}

/// Parallel id/distance arrays produced by a search.
///
/// `distances` holds *squared* Euclidean distances: every index scores
/// with the squared metric, and reporting it unchanged keeps results
/// comparable across indexes. The sequence is non-decreasing and `ids`
/// contains no duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub ids: Vec<u32>,
    pub distances: Vec<f32>,
}

impl SearchResults {
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Common contract for all index strategies.
pub trait Index {
    /// Learn index state from the store's matrix. Rebuilds are wholesale:
    /// any previous state is discarded.
    fn build(&mut self, data: VectorView<'_>) -> Result<()>;

    /// Find the `k` nearest stored vectors to `query`.
    ///
    /// `data` is the same matrix the index was built over; the index must
    /// not retain it past this call.
    fn search(
        &self,
        data: VectorView<'_>,
        query: &[f32],
        k: usize,
        params: Option<&SearchParams>,
    ) -> Result<SearchResults>;

    /// Whether the index is ready to serve queries.
    fn is_trained(&self) -> bool;

    /// Serialize learned state to `out`.
    fn save(&self, out: &mut dyn Write) -> Result<()>;

    /// Restore learned state from `input`, mirroring [`save`](Index::save).
    fn load(&mut self, input: &mut dyn Read) -> Result<()>;

    /// Stable short name, used as the on-disk discriminator.
    fn name(&self) -> &'static str;
}

/// Validate the arguments common to every search call.
pub(crate) fn check_query(data: VectorView<'_>, query: &[f32], k: usize) -> Result<()> {
    if k == 0 {
        return Err(ProximaError::InvalidParameter(
            "k must be at least 1".to_string(),
        ));
    }
    if !data.is_empty() && query.len() != data.dimension() {
        return Err(ProximaError::DimensionMismatch {
            expected: data.dimension(),
            actual: query.len(),
        });
    }
    Ok(())
}

/// Order scored candidates by `(distance, id)` and keep the best `k`.
///
/// The explicit id tiebreak makes output deterministic when distances
/// collide.
pub(crate) fn rank_candidates(mut scored: Vec<(u32, f32)>, k: usize) -> SearchResults {
    scored.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(k);

    let mut results = SearchResults {
        ids: Vec::with_capacity(scored.len()),
        distances: Vec::with_capacity(scored.len()),
    };
    for (id, dist) in scored {
        results.ids.push(id);
        results.distances.push(dist);
    }
    results
}
