//! Scalar math kernel for dense vectors.
//!
//! Every distance computation in the crate goes through these primitives.
//! They operate on equal-length slices; callers guarantee lengths by
//! construction, so no per-call checks are performed and no allocations
//! happen here.
//!
//! Prefer [`squared_euclidean`] wherever only relative order matters (index
//! scoring, sorting candidates): it preserves the ordering of [`euclidean`]
//! while skipping the square root.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Squared Euclidean distance: `Σ(a[i] - b[i])²`.
#[inline]
#[must_use]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean (L2) distance: `sqrt(Σ(a[i] - b[i])²)`.
#[inline]
#[must_use]
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    squared_euclidean(a, b).sqrt()
}

/// Dot product: `Σ a[i]·b[i]`.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// A pseudorandom generator seeded from OS entropy.
///
/// Components that need reproducibility accept an explicit seed instead
/// (see `KMeans::with_seed`); this is the default source for everything
/// else.
#[must_use]
pub fn new_rng() -> StdRng {
    StdRng::seed_from_u64(rand::rng().random())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_euclidean_matches_hand_computation() {
        let a = [0.0_f32, 0.0];
        let b = [3.0_f32, 4.0];
        assert_eq!(squared_euclidean(&a, &b), 25.0);
        assert_eq!(euclidean(&a, &b), 5.0);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = [1.5_f32, -2.0, 0.25];
        assert_eq!(squared_euclidean(&a, &a), 0.0);
    }

    #[test]
    fn dot_product() {
        let a = [1.0_f32, 2.0, 3.0];
        let b = [4.0_f32, -5.0, 6.0];
        assert_eq!(dot(&a, &b), 4.0 - 10.0 + 18.0);
    }

    #[test]
    fn rngs_are_independently_seeded() {
        let mut a = new_rng();
        let mut b = new_rng();
        // Two entropy-seeded generators agreeing on 4 consecutive draws
        // would be astronomically unlikely.
        let draws_a: Vec<u64> = (0..4).map(|_| a.random()).collect();
        let draws_b: Vec<u64> = (0..4).map(|_| b.random()).collect();
        assert_ne!(draws_a, draws_b);
    }
}
