//! End-to-end scenarios for the database façade and the three indexes.

use std::collections::HashSet;

use proxima::{AnnoyIndex, IvfIndex, ProximaError, SearchParams, VectorDb};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-4, "expected {e}, got {a}");
    }
}

fn db_with_random_vectors(n: usize, dim: usize, seed: u64) -> VectorDb {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut db = VectorDb::new();
    for _ in 0..n {
        let row: Vec<f32> = (0..dim).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect();
        db.add_vector(&row).unwrap();
    }
    db
}

// =============================================================================
// Store behavior through the façade
// =============================================================================

#[test]
fn first_vector_adopts_dimension() {
    let mut db = VectorDb::new();
    assert_eq!(db.dimension(), 0);
    db.add_vector(&[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(db.dimension(), 3);

    let err = db.add_vector(&[1.0]).unwrap_err();
    assert!(matches!(
        err,
        ProximaError::DimensionMismatch {
            expected: 3,
            actual: 1
        }
    ));
}

#[test]
fn bulk_append_through_facade() {
    let mut db = VectorDb::new();
    db.add_vectors(&[0.0, 0.0, 3.0, 0.0, 0.0, 4.0], 3, 2).unwrap();
    assert_eq!(db.len(), 3);
    assert_eq!(db.dimension(), 2);
    assert_eq!(db.vector(2).unwrap(), &[0.0, 4.0]);
}

// =============================================================================
// Flat
// =============================================================================

#[test]
fn flat_tiny_scenario() {
    let mut db = VectorDb::new();
    for v in [[0.0, 0.0], [3.0, 0.0], [0.0, 4.0], [6.0, 8.0]] {
        db.add_vector(&v).unwrap();
    }

    // No index set: the façade installs Flat on first search.
    let results = db.search(&[0.0, 0.0], 3, None).unwrap();
    assert_eq!(results.ids, vec![0, 1, 2]);
    assert_close(&results.distances, &[0.0, 9.0, 16.0]);
    assert_eq!(db.index().unwrap().name(), "FlatIndex");
}

#[test]
fn flat_k_exceeding_store_returns_all() {
    let mut db = VectorDb::new();
    db.add_vector(&[1.0]).unwrap();
    db.add_vector(&[2.0]).unwrap();

    let results = db.search(&[0.0], 10, None).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn search_on_empty_database_is_empty() {
    let mut db = VectorDb::new();
    let results = db.search(&[1.0, 2.0], 5, None).unwrap();
    assert!(results.is_empty());
}

// =============================================================================
// IVF
// =============================================================================

fn colinear_db() -> VectorDb {
    let mut db = VectorDb::new();
    for v in [0.0_f32, 1.0, 10.0, 11.0] {
        db.add_vector(&[v]).unwrap();
    }
    db
}

#[test]
fn ivf_trivial_clusters() {
    // Two tight groups on a line: any k-means initialization converges to
    // centroids near 0.5 and 10.5 within 50 iterations.
    let mut db = colinear_db();
    db.set_index(Box::new(IvfIndex::new(2, 1, 50, 1).unwrap()));
    db.build_index().unwrap();

    let results = db
        .search(&[0.0], 2, Some(&SearchParams::Ivf { n_probe: 1 }))
        .unwrap();
    assert_eq!(results.ids, vec![0, 1]);
    assert_close(&results.distances, &[0.0, 1.0]);
}

#[test]
fn ivf_n_probe_widens_the_search() {
    let mut db = colinear_db();
    db.set_index(Box::new(IvfIndex::new(2, 1, 50, 1).unwrap()));
    db.build_index().unwrap();

    // 5.4 is nearer the {0, 1} cell's centroid. With one probe the search
    // never sees id 2 even though it is the second-nearest vector
    // globally.
    let near_cell = db
        .search(&[5.4], 2, Some(&SearchParams::Ivf { n_probe: 1 }))
        .unwrap();
    assert_eq!(near_cell.ids, vec![1, 0]);

    // Probing both cells recovers the true top 2.
    let global = db
        .search(&[5.4], 2, Some(&SearchParams::Ivf { n_probe: 2 }))
        .unwrap();
    assert_eq!(global.ids, vec![1, 2]);
}

#[test]
fn ivf_default_n_probe_applies_without_params() {
    let mut db = colinear_db();
    db.set_index(Box::new(IvfIndex::new(2, 1, 50, 2).unwrap()));
    db.build_index().unwrap();

    // Default n_probe = 2 scans both cells: exact results.
    let results = db.search(&[5.4], 2, None).unwrap();
    assert_eq!(results.ids, vec![1, 2]);
}

#[test]
fn untrained_ivf_falls_back_to_flat() {
    let mut db = VectorDb::new();
    db.add_vector(&[0.0]).unwrap();
    db.add_vector(&[5.0]).unwrap();

    // More clusters than vectors: training yields nothing.
    db.set_index(Box::new(IvfIndex::new(8, 1, 50, 1).unwrap()));
    db.build_index().unwrap();
    assert!(!db.index().unwrap().is_trained());

    let results = db.search(&[4.0], 2, None).unwrap();
    assert_eq!(results.ids, vec![1, 0]);
    assert_eq!(db.index().unwrap().name(), "FlatIndex");
}

#[test]
fn lazy_build_on_first_search() {
    let mut db = colinear_db();
    db.set_index(Box::new(IvfIndex::new(2, 1, 50, 2).unwrap()));
    // No explicit build_index: search must train the index itself.
    let results = db.search(&[10.9], 2, None).unwrap();
    assert_eq!(results.ids, vec![3, 2]);
    assert!(db.index().unwrap().is_trained());
}

// =============================================================================
// Annoy
// =============================================================================

#[test]
fn annoy_greedy_returns_valid_subset() {
    let mut db = db_with_random_vectors(16, 8, 42);
    db.set_index(Box::new(
        AnnoyIndex::new(8, 4, 4, None, false).unwrap().with_seed(42),
    ));
    db.build_index().unwrap();

    let query = vec![0.1_f32; 8];
    let results = db.search(&query, 8, None).unwrap();

    assert!(!results.is_empty());
    assert!(results.len() <= 8);

    // Distinct ids, non-decreasing distances.
    let unique: HashSet<u32> = results.ids.iter().copied().collect();
    assert_eq!(unique.len(), results.ids.len());
    for pair in results.distances.windows(2) {
        assert!(pair[0] <= pair[1]);
    }

    // Every reported distance agrees with the exact scan.
    let mut flat_db = db_with_random_vectors(16, 8, 42);
    let exact = flat_db.search(&query, 16, None).unwrap();
    for (id, dist) in results.ids.iter().zip(&results.distances) {
        let pos = exact.ids.iter().position(|e| e == id).unwrap();
        assert!((exact.distances[pos] - dist).abs() < 1e-5);
    }
}

#[test]
fn annoy_exhaustive_priority_queue_dominates_greedy() {
    let query = vec![0.25_f32; 8];

    let mut flat_db = db_with_random_vectors(64, 8, 7);
    let exact = flat_db.search(&query, 8, None).unwrap();
    let exact_top: HashSet<u32> = exact.ids.iter().copied().collect();

    let mut db = db_with_random_vectors(64, 8, 7);
    db.set_index(Box::new(
        AnnoyIndex::new(8, 4, 4, None, false).unwrap().with_seed(3),
    ));
    db.build_index().unwrap();

    let greedy = db.search(&query, 8, None).unwrap();
    let greedy_hits = greedy.ids.iter().filter(|id| exact_top.contains(id)).count();

    // A budget larger than the forest drains every leaf: the candidate
    // set is the full id range and the results are exact.
    let exhaustive = db
        .search(
            &query,
            8,
            Some(&SearchParams::Annoy {
                search_k_nodes: usize::MAX,
                use_priority_queue: true,
            }),
        )
        .unwrap();
    let pq_hits = exhaustive.ids.iter().filter(|id| exact_top.contains(id)).count();

    assert_eq!(exhaustive.ids, exact.ids);
    assert!(pq_hits >= greedy_hits);
}

#[test]
fn annoy_params_override_constructed_defaults() {
    let mut db = db_with_random_vectors(32, 4, 11);
    // Constructed greedy; the per-query params switch to best-first with
    // an unbounded budget, which is exact.
    db.set_index(Box::new(
        AnnoyIndex::new(4, 2, 4, None, false).unwrap().with_seed(9),
    ));
    db.build_index().unwrap();

    let query = vec![0.0_f32; 4];
    let mut flat_db = db_with_random_vectors(32, 4, 11);
    let exact = flat_db.search(&query, 4, None).unwrap();

    let overridden = db
        .search(
            &query,
            4,
            Some(&SearchParams::Annoy {
                search_k_nodes: usize::MAX,
                use_priority_queue: true,
            }),
        )
        .unwrap();
    assert_eq!(overridden.ids, exact.ids);
}

// =============================================================================
// Error taxonomy
// =============================================================================

#[test]
fn zero_k_is_invalid() {
    let mut db = colinear_db();
    let err = db.search(&[0.0], 0, None).unwrap_err();
    assert!(matches!(err, ProximaError::InvalidParameter(_)));
}

#[test]
fn wrong_query_dimension_is_rejected() {
    let mut db = colinear_db();
    let err = db.search(&[0.0, 1.0], 2, None).unwrap_err();
    assert!(matches!(
        err,
        ProximaError::DimensionMismatch {
            expected: 1,
            actual: 2
        }
    ));
}

#[test]
fn build_without_index_is_invalid() {
    let mut db = VectorDb::new();
    let err = db.build_index().unwrap_err();
    assert!(matches!(err, ProximaError::InvalidParameter(_)));
}

#[test]
fn direct_search_on_untrained_index_errors() {
    // Bypassing the façade surfaces NotTrained instead of auto-building.
    use proxima::Index;

    let mut store = proxima::VectorStore::new();
    store.push(&[0.0]).unwrap();
    store.push(&[1.0]).unwrap();

    let index = IvfIndex::new(2, 1, 50, 1).unwrap();
    let err = index.search(store.view(), &[0.0], 1, None).unwrap_err();
    assert!(matches!(err, ProximaError::NotTrained));
}
