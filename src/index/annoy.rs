//! Random-projection tree forest.
//!
//! Each of `num_trees` trees recursively halves the id set with a random
//! hyperplane: two points are sampled, and the perpendicular bisector of
//! the segment between them becomes the split. Ids with positive margin go
//! left, the rest go right, until a bucket fits in `k_leaf`. Querying a
//! tree costs one root-to-leaf walk; the forest's leaf buckets are pooled,
//! deduplicated, and scored exactly.
//!
//! Two traversals are available per query:
//!
//! - *greedy*: one leaf per tree, following the margin sign;
//! - *best-first*: a max-heap over frontier nodes keyed by the smallest
//!   margin seen on the path down, popping the most promising subtree
//!   anywhere in the forest until `search_k` candidates are collected.
//!   This crosses to the "wrong" side of near-miss splits that greedy
//!   routing commits to.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::{Read, Write};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::{ProximaError, Result};
use crate::index::{self, Index, SearchParams, SearchResults};
use crate::math;
use crate::store::VectorView;
use crate::wire;

/// Affine decision boundary `⟨w, x⟩ + bias = 0` owned by an inner node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Hyperplane {
    w: Vec<f32>,
    bias: f32,
}

impl Hyperplane {
    /// Perpendicular bisector of the segment from `a` to `b`.
    fn bisecting(a: &[f32], b: &[f32]) -> Self {
        let mut w = Vec::with_capacity(a.len());
        let mut bias = 0.0_f32;
        for (&x, &y) in a.iter().zip(b) {
            let diff = x - y;
            w.push(diff);
            bias += diff * (x + y) / 2.0;
        }
        Self { w, bias: -bias }
    }

    /// Signed distance proxy used to route a point through the split.
    #[inline]
    fn margin(&self, x: &[f32]) -> f32 {
        math::dot(&self.w, x) + self.bias
    }
}

/// Tree node: either a terminal id bucket or a hyperplane split with two
/// owned children. The variant is the discrimination — a node is never
/// both.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Leaf {
        bucket: Vec<u32>,
    },
    Inner {
        hyperplane: Hyperplane,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Frontier entry for best-first traversal, ordered by budget so the
/// `BinaryHeap` pops the most promising subtree first.
struct Frontier<'a> {
    budget: f32,
    node: &'a Node,
}

impl PartialEq for Frontier<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.budget.total_cmp(&other.budget) == Ordering::Equal
    }
}

impl Eq for Frontier<'_> {}

impl PartialOrd for Frontier<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.budget.total_cmp(&other.budget)
    }
}

/// Forest of random-projection trees.
pub struct AnnoyIndex {
    dimension: usize,
    num_trees: usize,
    k_leaf: usize,
    search_k: usize,
    use_priority_queue: bool,
    seed: Option<u64>,
    roots: Vec<Node>,
}

impl AnnoyIndex {
    /// Create an untrained forest.
    ///
    /// `search_k` is the default node-visit budget for best-first
    /// traversal; `None` resolves to `num_trees * k_leaf`.
    /// `use_priority_queue` selects the default traversal; both defaults
    /// can be overridden per query via [`SearchParams::Annoy`].
    pub fn new(
        dimension: usize,
        num_trees: usize,
        k_leaf: usize,
        search_k: Option<usize>,
        use_priority_queue: bool,
    ) -> Result<Self> {
        if dimension == 0 || num_trees == 0 || k_leaf == 0 {
            return Err(ProximaError::InvalidParameter(
                "dimension, num_trees, and k_leaf must be greater than 0".to_string(),
            ));
        }
        if search_k == Some(0) {
            return Err(ProximaError::InvalidParameter(
                "search_k must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            dimension,
            num_trees,
            k_leaf,
            search_k: search_k.unwrap_or(num_trees * k_leaf),
            use_priority_queue,
            seed: None,
            roots: Vec::new(),
        })
    }

    /// Placeholder instance for persistence: `load` restores every field
    /// from the stream header.
    pub(crate) fn for_load(dimension: usize) -> Self {
        Self {
            dimension,
            num_trees: 0,
            k_leaf: 0,
            search_k: 0,
            use_priority_queue: false,
            seed: None,
            roots: Vec::new(),
        }
    }

    /// Configure a deterministic seed; each tree derives its own stream
    /// from it, so a fixed seed reproduces the whole forest.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn build_tree(data: VectorView<'_>, mut ids: Vec<u32>, k_leaf: usize, rng: &mut StdRng) -> Node {
        if ids.len() <= k_leaf {
            return Node::Leaf { bucket: ids };
        }

        ids.shuffle(rng);
        let hyperplane = Hyperplane::bisecting(
            data.row(ids[0] as usize),
            data.row(ids[1] as usize),
        );

        let mut left = Vec::new();
        let mut right = Vec::new();
        for &id in &ids {
            if hyperplane.margin(data.row(id as usize)) > 0.0 {
                left.push(id);
            } else {
                right.push(id);
            }
        }

        // A one-sided split cannot be refined further (coincident or
        // degenerate geometry); keep the whole set as an oversized leaf
        // so recursion terminates.
        if left.is_empty() {
            return Node::Leaf { bucket: right };
        }
        if right.is_empty() {
            return Node::Leaf { bucket: left };
        }

        Node::Inner {
            hyperplane,
            left: Box::new(Self::build_tree(data, left, k_leaf, rng)),
            right: Box::new(Self::build_tree(data, right, k_leaf, rng)),
        }
    }

    /// One leaf per tree: follow the margin sign from root to leaf.
    fn collect_greedy(&self, query: &[f32]) -> Vec<u32> {
        let mut candidates = Vec::new();
        for root in &self.roots {
            let mut node = root;
            loop {
                match node {
                    Node::Leaf { bucket } => {
                        candidates.extend_from_slice(bucket);
                        break;
                    }
                    Node::Inner {
                        hyperplane,
                        left,
                        right,
                    } => {
                        node = if hyperplane.margin(query) >= 0.0 {
                            left.as_ref()
                        } else {
                            right.as_ref()
                        };
                    }
                }
            }
        }
        candidates
    }

    /// Best-first over the whole forest: expand the frontier node whose
    /// path has stayed farthest from any split boundary, until `search_k`
    /// candidates are collected or the forest is exhausted.
    fn collect_best_first(&self, query: &[f32], search_k: usize) -> Vec<u32> {
        let mut heap = BinaryHeap::with_capacity(self.roots.len());
        for root in &self.roots {
            heap.push(Frontier {
                budget: f32::INFINITY,
                node: root,
            });
        }

        let mut candidates = Vec::new();
        while candidates.len() < search_k {
            let Some(Frontier { budget, node }) = heap.pop() else {
                break;
            };

            match node {
                Node::Leaf { bucket } => candidates.extend_from_slice(bucket),
                Node::Inner {
                    hyperplane,
                    left,
                    right,
                } => {
                    let m = hyperplane.margin(query);
                    heap.push(Frontier {
                        budget: budget.min(m),
                        node: left.as_ref(),
                    });
                    heap.push(Frontier {
                        budget: budget.min(-m),
                        node: right.as_ref(),
                    });
                }
            }
        }
        candidates
    }

    fn save_node(out: &mut dyn Write, node: &Node) -> Result<()> {
        match node {
            Node::Leaf { bucket } => {
                wire::write_bool(out, true)?;
                wire::write_ids(out, bucket)?;
            }
            Node::Inner {
                hyperplane,
                left,
                right,
            } => {
                wire::write_bool(out, false)?;
                wire::write_f32_slice(out, &hyperplane.w)?;
                wire::write_f32(out, hyperplane.bias)?;
                // Pre-order: left subtree is written before right.
                Self::save_node(out, left)?;
                Self::save_node(out, right)?;
            }
        }
        Ok(())
    }

    fn load_node(input: &mut dyn Read, dimension: usize) -> Result<Node> {
        if wire::read_bool(input, "leaf")? {
            Ok(Node::Leaf {
                bucket: wire::read_ids(input, "leaf bucket")?,
            })
        } else {
            let w = wire::read_f32_vec(input, dimension)?;
            let bias = wire::read_f32(input)?;
            let left = Box::new(Self::load_node(input, dimension)?);
            let right = Box::new(Self::load_node(input, dimension)?);
            Ok(Node::Inner {
                hyperplane: Hyperplane { w, bias },
                left,
                right,
            })
        }
    }

    #[cfg(test)]
    pub(crate) fn roots(&self) -> &[Node] {
        &self.roots
    }
}

impl Index for AnnoyIndex {
    fn build(&mut self, data: VectorView<'_>) -> Result<()> {
        if !data.is_empty() && data.dimension() != self.dimension {
            return Err(ProximaError::DimensionMismatch {
                expected: self.dimension,
                actual: data.dimension(),
            });
        }

        let base_seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let k_leaf = self.k_leaf;

        self.roots = (0..self.num_trees)
            .map(|tree| {
                // Fresh generator per tree so trees are independent but
                // the whole forest reproduces from one seed.
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(tree as u64));
                let ids: Vec<u32> = (0..data.len() as u32).collect();
                Self::build_tree(data, ids, k_leaf, &mut rng)
            })
            .collect();

        debug!(
            trees = self.roots.len(),
            vectors = data.len(),
            "annoy forest built"
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

        let (search_k, use_priority_queue) = match params {
            Some(SearchParams::Annoy {
                search_k_nodes,
                use_priority_queue,
            }) => (*search_k_nodes, *use_priority_queue),
            _ => (self.search_k, self.use_priority_queue),
        };

        let mut candidates = if use_priority_queue {
            self.collect_best_first(query, search_k)
        } else {
            self.collect_greedy(query)
        };

        // Trees overlap, so the pooled buckets contain repeats.
        candidates.sort_unstable();
        candidates.dedup();

        let scored: Vec<(u32, f32)> = candidates
            .into_iter()
            .map(|id| (id, math::squared_euclidean(query, data.row(id as usize))))
            .collect();

        Ok(index::rank_candidates(scored, k))
    }

    fn is_trained(&self) -> bool {
        !self.roots.is_empty()
    }

    fn save(&self, out: &mut dyn Write) -> Result<()> {
        wire::write_bool(out, self.use_priority_queue)?;
        wire::write_len(out, self.roots.len())?;
        wire::write_len(out, self.dimension)?;
        wire::write_len(out, self.k_leaf)?;
        wire::write_len(out, self.search_k)?;
        for root in &self.roots {
            Self::save_node(out, root)?;
        }
        Ok(())
    }

    fn load(&mut self, input: &mut dyn Read) -> Result<()> {
        self.use_priority_queue = wire::read_bool(input, "traversal mode")?;
        self.num_trees = wire::read_len(input, "tree count")?;
        self.dimension = wire::read_len(input, "dimension")?;
        self.k_leaf = wire::read_len(input, "leaf size")?;
        self.search_k = wire::read_len(input, "search budget")?;

        let mut roots = Vec::with_capacity(self.num_trees);
        for _ in 0..self.num_trees {
            roots.push(Self::load_node(input, self.dimension)?);
        }
        self.roots = roots;
        debug!(trees = self.roots.len(), "annoy forest loaded");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AnnoyIndex"
    }
}
