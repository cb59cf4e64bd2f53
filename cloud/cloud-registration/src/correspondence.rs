//! Nearest-neighbour search over the fixed cloud.

use std::collections::hash_map::{Entry, HashMap};

use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;
use nalgebra::Point3;
use rayon::prelude::*;

/// A pairing of a moving point with its closest fixed point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Index into the moving point set.
    pub source_idx: usize,
    /// Index into the indexed (fixed) point set.
    pub target_idx: usize,
    /// Squared Euclidean distance between the two.
    pub distance_sq: f64,
}

/// Leaf capacity of the search tree. Larger than kiddo's default so flat
/// scans split into few, well-filled leaves.
const BUCKET_SIZE: usize = 256;

type Tree = ImmutableKdTree<f64, u64, 3, BUCKET_SIZE>;

/// A KD-tree over a fixed point set.
///
/// Exactly repeated positions are indexed once and resolve to the first of
/// them, so duplicate-heavy and perfectly planar clouds index without
/// trouble.
pub struct PointIndex {
    tree: Option<Tree>,
    /// Original index of each tree entry.
    slots: Vec<usize>,
    points: Vec<Point3<f64>>,
}

impl PointIndex {
    /// Builds the index.
    #[must_use]
    pub fn new(points: &[Point3<f64>]) -> Self {
        let mut seen: HashMap<[u64; 3], usize> = HashMap::with_capacity(points.len());
        let mut slots = Vec::with_capacity(points.len());
        let mut coords: Vec<[f64; 3]> = Vec::with_capacity(points.len());
        for (i, p) in points.iter().enumerate() {
            // +0.0 folds -0.0 onto 0.0 so both hash alike.
            let key = [p.x, p.y, p.z].map(|v| (v + 0.0).to_bits());
            if let Entry::Vacant(slot) = seen.entry(key) {
                slot.insert(i);
                slots.push(i);
                coords.push([p.x, p.y, p.z]);
            }
        }

        let tree = (!coords.is_empty()).then(|| Tree::new_from_slice(&coords));
        Self {
            tree,
            slots,
            points: points.to_vec(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn original(&self, item: u64) -> usize {
        self.slots[item as usize]
    }

    /// The indexed points.
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the `k` nearest points to `query`, closest first.
    ///
    /// `query` itself is included when it is an indexed point.
    #[must_use]
    pub fn nearest_n(&self, query: &Point3<f64>, k: usize) -> Vec<usize> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }
        tree.nearest_n::<SquaredEuclidean>(&[query.x, query.y, query.z], k)
            .into_iter()
            .map(|n| self.original(n.item))
            .collect()
    }

    /// Finds the closest indexed point for every query point.
    ///
    /// Pairs farther apart than `max_dist_sq` (squared) are dropped. The search
    /// runs in parallel; output order follows `queries`.
    #[must_use]
    pub fn correspondences(
        &self,
        queries: &[Point3<f64>],
        max_dist_sq: f64,
    ) -> Vec<Correspondence> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };

        queries
            .par_iter()
            .enumerate()
            .filter_map(|(source_idx, p)| {
                let nearest = tree.nearest_one::<SquaredEuclidean>(&[p.x, p.y, p.z]);
                (nearest.distance <= max_dist_sq).then(|| Correspondence {
                    source_idx,
                    target_idx: self.original(nearest.item),
                    distance_sq: nearest.distance,
                })
            })
            .collect()
    }
}

/// Root mean square distance over a set of correspondences.
///
/// Returns infinity for an empty set.
#[must_use]
pub fn rms_error(correspondences: &[Correspondence]) -> f64 {
    if correspondences.is_empty() {
        return f64::INFINITY;
    }
    let sum_sq: f64 = correspondences.iter().map(|c| c.distance_sq).sum();

    #[allow(clippy::cast_precision_loss)]
    let n = correspondences.len() as f64;
    (sum_sq / n).sqrt()
}
