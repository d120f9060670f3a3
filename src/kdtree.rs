//! Static KD-tree over the motion database.
//!
//! Samples are inserted in bulk, the tree is built once, and from then on the
//! index is read-only and can be queried from any number of threads.
//!
//! # Algorithm
//!
//! Each node splits its samples on the dimension of greatest variance at the
//! median (ties ordered by insertion index). Queries descend toward the
//! query point and backtrack into the far child only while the splitting
//! plane is no farther than the best match found so far. Among equally
//! distant samples the earliest inserted one wins, which makes
//! [`KdTree::query`] and [`KdTree::brute_force_query`] return the very same
//! sample for every input.
//!
//! # Example
//!
//! ```
//! use motion_matching::{KdTree, Sample};
//!
//! let mut index = KdTree::new(2);
//! index.insert(Sample::new(vec![0.0, 0.0], 0, 1))?;
//! index.insert(Sample::new(vec![1.0, 1.0], 0, 2))?;
//! index.build()?;
//!
//! let nearest = index.query(&[0.9, 0.8])?;
//! assert_eq!(nearest.frame(), 2);
//! # Ok::<(), motion_matching::MatchingError>(())
//! ```

use crate::config::SearchMode;
use crate::error::{MatchingError, Result};
use crate::feature::squared_distance;

/// One frame of the motion database.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    features: Vec<f64>,
    clip: usize,
    frame: usize,
}

impl Sample {
    /// Create a sample from normalized features and its source frame.
    #[must_use]
    pub fn new(features: Vec<f64>, clip: usize, frame: usize) -> Self {
        Self {
            features,
            clip,
            frame,
        }
    }

    /// Normalized feature values.
    #[must_use]
    pub fn features(&self) -> &[f64] {
        &self.features
    }

    /// Source clip id.
    #[must_use]
    pub const fn clip(&self) -> usize {
        self.clip
    }

    /// Source frame within the clip.
    #[must_use]
    pub const fn frame(&self) -> usize {
        self.frame
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    sample: usize,
    axis: usize,
    split: f64,
    left: Option<usize>,
    right: Option<usize>,
}

/// Best candidate seen during a search.
#[derive(Debug, Clone, Copy)]
struct Best {
    sample: usize,
    dist: f64,
}

impl Best {
    const NONE: Self = Self {
        sample: usize::MAX,
        dist: f64::INFINITY,
    };

    #[inline]
    fn offer(&mut self, sample: usize, dist: f64) {
        if self.sample == usize::MAX || dist < self.dist || (dist == self.dist && sample < self.sample) {
            self.sample = sample;
            self.dist = dist;
        }
    }
}

/// Balanced KD-tree with exact nearest-neighbour queries.
#[derive(Debug, Clone)]
pub struct KdTree {
    dim: usize,
    samples: Vec<Sample>,
    nodes: Vec<Node>,
    root: Option<usize>,
    built: bool,
}

impl KdTree {
    /// Create an empty index for `dim`-dimensional samples.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            samples: Vec::new(),
            nodes: Vec::new(),
            root: None,
            built: false,
        }
    }

    /// Insert all samples and build the tree.
    ///
    /// # Errors
    ///
    /// Returns an error if any sample has the wrong dimension or a non-finite
    /// feature, or if `dim` is zero while samples are present.
    pub fn from_samples(dim: usize, samples: impl IntoIterator<Item = Sample>) -> Result<Self> {
        let mut index = Self::new(dim);
        index.extend(samples)?;
        index.build()?;
        Ok(index)
    }

    /// Append a sample. Only valid before [`KdTree::build`].
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::IndexAlreadyBuilt`] after the build,
    /// [`MatchingError::DimensionMismatch`] for a sample of the wrong length
    /// and [`MatchingError::InvalidConfig`] for a non-finite feature.
    pub fn insert(&mut self, sample: Sample) -> Result<()> {
        if self.built {
            return Err(MatchingError::IndexAlreadyBuilt);
        }
        if sample.features.len() != self.dim {
            return Err(MatchingError::dimension_mismatch(
                "sample",
                self.dim,
                sample.features.len(),
            ));
        }
        if let Some(i) = sample.features.iter().position(|v| !v.is_finite()) {
            return Err(MatchingError::invalid_config(format!(
                "sample for clip {} frame {} has a non-finite feature at index {i}",
                sample.clip, sample.frame
            )));
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Append many samples. Only valid before [`KdTree::build`].
    ///
    /// # Errors
    ///
    /// Same as [`KdTree::insert`]; samples before the failing one stay inserted.
    pub fn extend(&mut self, samples: impl IntoIterator<Item = Sample>) -> Result<()> {
        for sample in samples {
            self.insert(sample)?;
        }
        Ok(())
    }

    /// Build the tree over every inserted sample.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::IndexAlreadyBuilt`] on a second call and
    /// [`MatchingError::InvalidConfig`] for samples with no dimensions.
    pub fn build(&mut self) -> Result<()> {
        if self.built {
            return Err(MatchingError::IndexAlreadyBuilt);
        }
        if self.dim == 0 && !self.samples.is_empty() {
            return Err(MatchingError::invalid_config("cannot index zero-dimensional samples"));
        }

        let mut order: Vec<usize> = (0..self.samples.len()).collect();
        self.nodes = Vec::with_capacity(order.len());
        self.root = self.build_node(&mut order);
        self.built = true;

        log::info!(
            "Built KD-tree over {} samples ({} dims, depth {})",
            self.samples.len(),
            self.dim,
            self.depth()
        );
        Ok(())
    }

    fn build_node(&mut self, indices: &mut [usize]) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let axis = self.widest_axis(indices);
        let mid = indices.len() / 2;
        let samples = &self.samples;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            samples[a].features[axis]
                .total_cmp(&samples[b].features[axis])
                .then(a.cmp(&b))
        });

        let sample = indices[mid];
        let split = self.samples[sample].features[axis];
        let (lower, upper) = indices.split_at_mut(mid);
        let left = self.build_node(lower);
        let right = self.build_node(&mut upper[1..]);

        self.nodes.push(Node {
            sample,
            axis,
            split,
            left,
            right,
        });
        Some(self.nodes.len() - 1)
    }

    /// Dimension with the largest variance over `indices`; lowest on ties.
    fn widest_axis(&self, indices: &[usize]) -> usize {
        let n = indices.len() as f64;
        let mut best_axis = 0;
        let mut best_variance = f64::NEG_INFINITY;

        for axis in 0..self.dim {
            let mean = indices
                .iter()
                .map(|&i| self.samples[i].features[axis])
                .sum::<f64>()
                / n;
            let variance = indices
                .iter()
                .map(|&i| {
                    let d = self.samples[i].features[axis] - mean;
                    d * d
                })
                .sum::<f64>()
                / n;

            if variance > best_variance {
                best_axis = axis;
                best_variance = variance;
            }
        }

        best_axis
    }

    /// Exact nearest neighbour by tree descent with backtracking.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::IndexNotBuilt`] before the build,
    /// [`MatchingError::EmptyIndex`] without samples, and
    /// [`MatchingError::DimensionMismatch`] / [`MatchingError::NonFiniteQuery`]
    /// for a malformed query.
    pub fn query(&self, point: &[f64]) -> Result<&Sample> {
        self.check_query(point)?;

        let mut best = Best::NONE;
        self.search_node(self.root, point, &mut best);
        Ok(&self.samples[best.sample])
    }

    fn search_node(&self, node: Option<usize>, point: &[f64], best: &mut Best) {
        let Some(id) = node else {
            return;
        };
        let node = &self.nodes[id];

        let dist = squared_distance(&self.samples[node.sample].features, point);
        best.offer(node.sample, dist);

        let diff = point[node.axis] - node.split;
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        self.search_node(near, point, best);
        // Samples across the plane are at least `diff` away on this axis.
        if diff * diff <= best.dist {
            self.search_node(far, point, best);
        }
    }

    /// Exact nearest neighbour by scanning every sample.
    ///
    /// # Errors
    ///
    /// Same as [`KdTree::query`].
    pub fn brute_force_query(&self, point: &[f64]) -> Result<&Sample> {
        self.check_query(point)?;

        let mut best = Best::NONE;
        for (i, sample) in self.samples.iter().enumerate() {
            best.offer(i, squared_distance(&sample.features, point));
        }
        Ok(&self.samples[best.sample])
    }

    /// Answer a query with the given search mode.
    ///
    /// # Errors
    ///
    /// Same as [`KdTree::query`].
    pub fn nearest(&self, point: &[f64], mode: SearchMode) -> Result<&Sample> {
        match mode {
            SearchMode::Tree => self.query(point),
            SearchMode::BruteForce => self.brute_force_query(point),
        }
    }

    fn check_query(&self, point: &[f64]) -> Result<()> {
        if !self.built {
            return Err(MatchingError::IndexNotBuilt);
        }
        if self.samples.is_empty() {
            return Err(MatchingError::EmptyIndex);
        }
        if point.len() != self.dim {
            return Err(MatchingError::dimension_mismatch("query", self.dim, point.len()));
        }
        if let Some(i) = point.iter().position(|v| !v.is_finite()) {
            return Err(MatchingError::NonFiniteQuery(i));
        }
        Ok(())
    }

    /// Feature dimension.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the index holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether [`KdTree::build`] has run.
    #[must_use]
    pub const fn is_built(&self) -> bool {
        self.built
    }

    /// All samples in insertion order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Longest root-to-leaf path; 0 for an unbuilt or empty tree.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.node_depth(self.root)
    }

    fn node_depth(&self, node: Option<usize>) -> usize {
        node.map_or(0, |id| {
            let n = &self.nodes[id];
            1 + self.node_depth(n.left).max(self.node_depth(n.right))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_index() -> KdTree {
        let samples = (0..5_i32).flat_map(|x| {
            (0..5_i32).map(move |y| Sample::new(vec![f64::from(x), f64::from(y)], 0, (x * 5 + y) as usize))
        });
        KdTree::from_samples(2, samples).unwrap()
    }

    #[test]
    fn test_query_finds_grid_point() {
        let index = grid_index();
        let s = index.query(&[3.1, 1.8]).unwrap();
        assert_eq!(s.features(), &[3.0, 2.0]);
        assert_eq!(s.frame(), 17);
    }

    #[test]
    fn test_query_before_build_fails() {
        let mut index = KdTree::new(2);
        index.insert(Sample::new(vec![0.0, 0.0], 0, 0)).unwrap();
        assert!(matches!(index.query(&[0.0, 0.0]), Err(MatchingError::IndexNotBuilt)));
        assert!(matches!(
            index.brute_force_query(&[0.0, 0.0]),
            Err(MatchingError::IndexNotBuilt)
        ));
    }

    #[test]
    fn test_empty_index_fails() {
        let mut index = KdTree::new(3);
        index.build().unwrap();
        assert!(matches!(index.query(&[0.0; 3]), Err(MatchingError::EmptyIndex)));
        assert_eq!(index.depth(), 0);
    }

    #[test]
    fn test_build_twice_and_insert_after_build_fail() {
        let mut index = KdTree::new(1);
        index.insert(Sample::new(vec![1.0], 0, 0)).unwrap();
        index.build().unwrap();
        assert!(matches!(index.build(), Err(MatchingError::IndexAlreadyBuilt)));
        assert!(matches!(
            index.insert(Sample::new(vec![2.0], 0, 1)),
            Err(MatchingError::IndexAlreadyBuilt)
        ));
    }

    #[test]
    fn test_dimension_and_finiteness_checks() {
        let mut index = KdTree::new(2);
        assert!(index.insert(Sample::new(vec![1.0], 0, 0)).is_err());
        assert!(index.insert(Sample::new(vec![1.0, f64::INFINITY], 0, 0)).is_err());
        index.insert(Sample::new(vec![1.0, 2.0], 0, 0)).unwrap();
        index.build().unwrap();
        assert!(matches!(
            index.query(&[1.0, 2.0, 3.0]),
            Err(MatchingError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            index.query(&[1.0, f64::NAN]),
            Err(MatchingError::NonFiniteQuery(1))
        ));
    }

    #[test]
    fn test_ties_prefer_earliest_insertion() {
        let samples = vec![
            Sample::new(vec![1.0, 0.0], 0, 0),
            Sample::new(vec![-1.0, 0.0], 1, 0),
            Sample::new(vec![0.0, 1.0], 2, 0),
            Sample::new(vec![1.0, 0.0], 3, 0),
        ];
        let index = KdTree::from_samples(2, samples).unwrap();
        // equidistant from all four
        let q = [0.0, 0.0];
        assert_eq!(index.query(&q).unwrap().clip(), 0);
        assert_eq!(index.brute_force_query(&q).unwrap().clip(), 0);
        // exact duplicates of the first sample
        assert_eq!(index.query(&[1.0, 0.0]).unwrap().clip(), 0);
    }

    #[test]
    fn test_all_duplicates() {
        let samples = (0..33).map(|i| Sample::new(vec![0.5, 0.5, 0.5], 0, i));
        let index = KdTree::from_samples(3, samples).unwrap();
        assert_eq!(index.query(&[9.0, -3.0, 0.0]).unwrap().frame(), 0);
        assert_eq!(index.brute_force_query(&[9.0, -3.0, 0.0]).unwrap().frame(), 0);
    }

    #[test]
    fn test_tree_is_balanced() {
        let samples = (0..1000_i32).map(|i| {
            let t = f64::from(i);
            Sample::new(vec![t.sin(), (t * 0.37).cos(), t / 1000.0], 0, i as usize)
        });
        let index = KdTree::from_samples(3, samples).unwrap();
        assert_eq!(index.len(), 1000);
        // ceil(log2(1001)) = 10
        assert_eq!(index.depth(), 10);
    }

    #[test]
    fn test_single_sample() {
        let index = KdTree::from_samples(2, [Sample::new(vec![4.0, 4.0], 7, 9)]).unwrap();
        let s = index.query(&[-100.0, 100.0]).unwrap();
        assert_eq!((s.clip(), s.frame()), (7, 9));
    }

    #[test]
    fn test_nearest_dispatches_search_mode() {
        let index = grid_index();
        let q = [0.2, 4.4];
        let tree = index.nearest(&q, SearchMode::Tree).unwrap();
        let brute = index.nearest(&q, SearchMode::BruteForce).unwrap();
        assert!(std::ptr::eq(tree, brute));
        assert_eq!(tree.frame(), 4);
    }
}
