//! Exact brute-force index.
//!
//! Scores every stored vector against the query. This is the accuracy
//! reference the approximate indexes are measured against, and the
//! fallback the database installs when no index was chosen.

use std::io::{Read, Write};

use crate::error::Result;
use crate::index::{self, Index, SearchParams, SearchResults};
use crate::math;
use crate::store::VectorView;

/// Exhaustive-scan index. Carries no learned state.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatIndex;

impl FlatIndex {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Index for FlatIndex {
    fn build(&mut self, _data: VectorView<'_>) -> Result<()> {
        // Nothing to learn: every search scans the store directly.
        Ok(())
    }

    fn search(
        &self,
        data: VectorView<'_>,
        query: &[f32],
        k: usize,
        _params: Option<&SearchParams>,
    ) -> Result<SearchResults> {
        index::check_query(data, query, k)?;

        let scored: Vec<(u32, f32)> = data
            .iter()
            .enumerate()
            .map(|(id, row)| (id as u32, math::squared_euclidean(query, row)))
            .collect();

        Ok(index::rank_candidates(scored, k))
    }

    fn is_trained(&self) -> bool {
        true
    }

    fn save(&self, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    fn load(&mut self, _input: &mut dyn Read) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "FlatIndex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProximaError;
    use crate::store::VectorStore;

    fn sample_store() -> VectorStore {
        let mut store = VectorStore::new();
        store.push(&[0.0, 0.0]).unwrap();
        store.push(&[3.0, 0.0]).unwrap();
        store.push(&[0.0, 4.0]).unwrap();
        store.push(&[6.0, 8.0]).unwrap();
        store
    }

    #[test]
    fn returns_nearest_in_order() {
        let store = sample_store();
        let index = FlatIndex::new();
        let results = index.search(store.view(), &[0.0, 0.0], 3, None).unwrap();
        assert_eq!(results.ids, vec![0, 1, 2]);
        assert_eq!(results.distances, vec![0.0, 9.0, 16.0]);
    }

    #[test]
    fn k_larger_than_store_returns_everything() {
        let store = sample_store();
        let index = FlatIndex::new();
        let results = index.search(store.view(), &[0.0, 0.0], 10, None).unwrap();
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn empty_store_yields_empty_results() {
        let store = VectorStore::new();
        let index = FlatIndex::new();
        let results = index.search(store.view(), &[1.0, 2.0], 3, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn wrong_query_dimension_is_rejected() {
        let store = sample_store();
        let index = FlatIndex::new();
        let err = index.search(store.view(), &[1.0], 3, None).unwrap_err();
        assert!(matches!(err, ProximaError::DimensionMismatch { .. }));
    }

    #[test]
    fn zero_k_is_rejected() {
        let store = sample_store();
        let index = FlatIndex::new();
        let err = index.search(store.view(), &[0.0, 0.0], 0, None).unwrap_err();
        assert!(matches!(err, ProximaError::InvalidParameter(_)));
    }
}
