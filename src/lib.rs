//! proxima: an in-memory vector database.
//!
//! Stores fixed-dimensional f32 vectors and answers k-nearest-neighbor
//! queries under Euclidean distance through one of three interchangeable
//! index strategies:
//!
//! | Situation | Recommendation |
//! |-----------|----------------|
//! | Small datasets, exact answers | [`FlatIndex`] (the default) |
//! | Clustered data, tunable recall/speed | [`IvfIndex`] |
//! | High-dimensional, latency-sensitive | [`AnnoyIndex`] |
//!
//! [`FlatIndex`] scans everything and is exact. [`IvfIndex`] partitions
//! the space with k-means and probes only the `n_probe` cells nearest the
//! query. [`AnnoyIndex`] routes the query through a forest of random
//! hyperplane trees and scores only the leaf buckets it reaches.
//!
//! All indexes report *squared* Euclidean distances — ordering is
//! identical to the true metric and the square root is never paid.
//!
//! # Usage
//!
//! ```
//! use proxima::VectorDb;
//!
//! let mut db = VectorDb::new();
//! db.add_vector(&[0.0, 0.0])?;
//! db.add_vector(&[3.0, 0.0])?;
//! db.add_vector(&[0.0, 4.0])?;
//!
//! // No index set: the first search installs an exact FlatIndex.
//! let results = db.search(&[1.0, 0.0], 2, None)?;
//! assert_eq!(results.ids, vec![0, 1]);
//! # Ok::<(), proxima::ProximaError>(())
//! ```
//!
//! Approximate indexes are installed explicitly and built over the
//! current store contents:
//!
//! ```
//! use proxima::{IvfIndex, SearchParams, VectorDb};
//!
//! # let mut db = VectorDb::new();
//! # for i in 0..32 { db.add_vector(&[i as f32, (i % 7) as f32])?; }
//! db.set_index(Box::new(IvfIndex::new(4, db.dimension(), 50, 1)?));
//! db.build_index()?;
//!
//! // Probing every cell makes the search exact; fewer cells trade
//! // recall for speed.
//! let results = db.search(&[3.0, 3.0], 5, Some(&SearchParams::Ivf { n_probe: 4 }))?;
//! # assert_eq!(results.len(), 5);
//! # Ok::<(), proxima::ProximaError>(())
//! ```
//!
//! # Persistence
//!
//! [`VectorDb::save`] writes a single self-describing binary file: the
//! store region `(N: i32, D: i32, matrix: f32 × N·D)` followed by an
//! optional index trailer `(name_len: i32, name_bytes, payload)`. All
//! quantities are little-endian; the format is not portable to
//! big-endian readers. [`VectorDb::load`] reinstantiates the index named
//! by the trailer (unknown names degrade to Flat).
//!
//! # Limits
//!
//! Stored vectors are never mutated or deleted; indexes are rebuilt
//! wholesale rather than maintained incrementally. A database instance is
//! single-threaded: callers are responsible for serializing mutation
//! against concurrent reads.

pub mod db;
pub mod error;
pub mod index;
pub mod kmeans;
pub mod math;
pub mod store;

mod wire;

pub use db::VectorDb;
pub use error::{ProximaError, Result};
pub use index::{AnnoyIndex, FlatIndex, Index, IvfIndex, SearchParams, SearchResults};
pub use kmeans::{KMeans, KMeansOutcome};
pub use store::{VectorStore, VectorView};
