//! Lloyd's algorithm for coarse quantization.
//!
//! Trains the partitioning layer of the IVF index: `k` centroids plus an
//! inverted assignment mapping each centroid to the ids it owns.
//!
//! Two deliberate departures from textbook k-means:
//!
//! - Initialization is random partitioning (shuffle the id range, adopt
//!   the first `k` points), not k-means++. Training is stochastic unless
//!   a seed is supplied.
//! - The loop runs exactly `max_iters` rounds with no convergence test;
//!   the iteration count is the contract.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{ProximaError, Result};
use crate::math;
use crate::store::VectorView;

/// K-means trainer configuration.
pub struct KMeans {
    k: usize,
    max_iters: usize,
    dimension: usize,
    seed: Option<u64>,
}

/// Output of a training run: `k` centroids and `k` id buckets.
///
/// The buckets partition the trained id range; a bucket may be empty.
/// Both vectors are empty when training was skipped (`k > N`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KMeansOutcome {
    pub centroids: Vec<Vec<f32>>,
    pub buckets: Vec<Vec<u32>>,
}

impl KMeansOutcome {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}

impl KMeans {
    /// Create a trainer for `k` clusters over `dimension`-length vectors.
    pub fn new(k: usize, max_iters: usize, dimension: usize) -> Result<Self> {
        if k == 0 || dimension == 0 {
            return Err(ProximaError::InvalidParameter(
                "cluster count and dimension must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            k,
            max_iters,
            dimension,
            seed: None,
        })
    }

    /// Configure a deterministic seed for initialization.
    ///
    /// When set, repeated `train(...)` calls on the same data produce
    /// identical centroids and buckets.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run Lloyd's algorithm over `data`.
    ///
    /// Requesting more clusters than there are points is not an error:
    /// the result is simply empty and the caller's index stays untrained.
    #[must_use]
    pub fn train(&self, data: VectorView<'_>) -> KMeansOutcome {
        let n = data.len();
        if self.k > n {
            return KMeansOutcome::default();
        }

        // Use an explicit seed when configured; otherwise derive one from entropy.
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let mut ids: Vec<u32> = (0..n as u32).collect();
        ids.shuffle(&mut rng);

        let mut centroids: Vec<Vec<f32>> = ids[..self.k]
            .iter()
            .map(|&id| data.row(id as usize).to_vec())
            .collect();
        let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); self.k];

        for _ in 0..self.max_iters {
            for bucket in &mut buckets {
                bucket.clear();
            }
            self.assign(data, &centroids, &mut buckets);
            self.update(data, &buckets, &mut centroids);
        }

        KMeansOutcome { centroids, buckets }
    }

    /// Assignment step: each point joins its nearest centroid's bucket.
    /// Ties go to the lowest centroid index (strict `<` comparison).
    fn assign(&self, data: VectorView<'_>, centroids: &[Vec<f32>], buckets: &mut [Vec<u32>]) {
        for i in 0..data.len() {
            let point = data.row(i);
            let mut best = 0;
            let mut best_dist = f32::INFINITY;

            for (j, centroid) in centroids.iter().enumerate() {
                let d = math::squared_euclidean(point, centroid);
                if d < best_dist {
                    best_dist = d;
                    best = j;
                }
            }

            buckets[best].push(i as u32);
        }
    }

    /// Update step: move each centroid to the mean of its bucket.
    ///
    /// An empty bucket keeps its centroid where it is, so a dead cell's
    /// index stays stable and never turns into NaN.
    fn update(&self, data: VectorView<'_>, buckets: &[Vec<u32>], centroids: &mut [Vec<f32>]) {
        for (centroid, bucket) in centroids.iter_mut().zip(buckets) {
            if bucket.is_empty() {
                continue;
            }

            // Point-major accumulation: the inner loop walks one contiguous row.
            let mut sum = vec![0.0_f32; self.dimension];
            for &id in bucket {
                for (acc, &v) in sum.iter_mut().zip(data.row(id as usize)) {
                    *acc += v;
                }
            }

            let count = bucket.len() as f32;
            for acc in &mut sum {
                *acc /= count;
            }

            *centroid = sum;
        }
    }
}
