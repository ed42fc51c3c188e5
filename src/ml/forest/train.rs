use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};
use thiserror::Error;

use super::model::{DecisionTree, ForestModel, TreeNode};

/// Training hyperparameters for the forest.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of trees in the ensemble.
    pub trees: usize,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum samples a leaf may hold.
    pub min_samples_leaf: usize,
    /// Seed for bootstrap and feature sampling.
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            trees: 100,
            max_depth: 16,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// In-memory encoded dataset used for training.
#[derive(Debug, Clone)]
pub struct TrainData {
    /// Number of values in each feature vector.
    pub feature_len: usize,
    /// Ordered class labels; `y` holds indices into this.
    pub classes: Vec<String>,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("training table is empty")]
    EmptyDataset,
    #[error("feature matrix has {x_rows} rows but {y_rows} labels")]
    RowMismatch { x_rows: usize, y_rows: usize },
    #[error("need at least 2 classes, found {0}")]
    TooFewClasses(usize),
    #[error("tree count must be at least 1")]
    NoTrees,
    #[error("row {row} has {got} features, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("row {row} has label index {label}, only {classes} classes exist")]
    LabelOutOfRange {
        row: usize,
        label: usize,
        classes: usize,
    },
}

/// Train a random forest with bootstrap sampling and per-split feature
/// subsampling. The whole fit is a pure function of (data, options).
pub fn train_forest(data: &TrainData, options: &TrainOptions) -> Result<ForestModel, TrainError> {
    if data.x.is_empty() || data.y.is_empty() {
        return Err(TrainError::EmptyDataset);
    }
    if data.x.len() != data.y.len() {
        return Err(TrainError::RowMismatch {
            x_rows: data.x.len(),
            y_rows: data.y.len(),
        });
    }
    if data.classes.len() < 2 {
        return Err(TrainError::TooFewClasses(data.classes.len()));
    }
    if options.trees == 0 {
        return Err(TrainError::NoTrees);
    }
    for (row, features) in data.x.iter().enumerate() {
        if features.len() != data.feature_len {
            return Err(TrainError::RowLength {
                row,
                expected: data.feature_len,
                got: features.len(),
            });
        }
    }
    for (row, &label) in data.y.iter().enumerate() {
        if label >= data.classes.len() {
            return Err(TrainError::LabelOutOfRange {
                row,
                label,
                classes: data.classes.len(),
            });
        }
    }

    let builder = TreeBuilder {
        x: &data.x,
        y: &data.y,
        n_classes: data.classes.len(),
        feature_len: data.feature_len,
        max_depth: options.max_depth.max(1),
        min_samples_leaf: options.min_samples_leaf.max(1),
        features_per_split: data.feature_len.isqrt().max(1),
    };

    let mut rng = StdRng::seed_from_u64(options.seed);
    let n = data.x.len();
    let mut trees = Vec::with_capacity(options.trees);
    for _ in 0..options.trees {
        let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
        trees.push(builder.build(&sample, &mut rng));
    }

    Ok(ForestModel {
        classes: data.classes.clone(),
        feature_len: data.feature_len,
        seed: options.seed,
        trees,
    })
}

/// Candidate split with its impurity score.
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f32,
    gini: f64,
}

impl SplitCandidate {
    /// Ordering used everywhere a winner is picked: lower impurity, then
    /// lower feature index, then lower threshold.
    fn beats(&self, other: &SplitCandidate) -> bool {
        if self.gini != other.gini {
            return self.gini < other.gini;
        }
        if self.feature != other.feature {
            return self.feature < other.feature;
        }
        self.threshold < other.threshold
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f32>],
    y: &'a [usize],
    n_classes: usize,
    feature_len: usize,
    max_depth: usize,
    min_samples_leaf: usize,
    features_per_split: usize,
}

impl TreeBuilder<'_> {
    fn build<R: Rng + ?Sized>(&self, indices: &[usize], rng: &mut R) -> DecisionTree {
        let mut nodes = Vec::new();
        self.build_node(indices, 0, &mut nodes, rng);
        DecisionTree { nodes }
    }

    /// Recursively grow one node; children land after their parent in the
    /// flat array, child links are patched once both exist.
    fn build_node<R: Rng + ?Sized>(
        &self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<TreeNode>,
        rng: &mut R,
    ) -> u32 {
        let current = nodes.len() as u32;
        let counts = self.class_counts(indices);
        if depth >= self.max_depth
            || indices.len() < 2 * self.min_samples_leaf
            || is_pure(&counts)
        {
            nodes.push(TreeNode::leaf(majority_class(&counts) as u32));
            return current;
        }

        let Some(split) = self.find_best_split(indices, rng) else {
            nodes.push(TreeNode::leaf(majority_class(&counts) as u32));
            return current;
        };
        let (left_rows, right_rows) = self.partition(indices, split.feature, split.threshold);
        if left_rows.len() < self.min_samples_leaf || right_rows.len() < self.min_samples_leaf {
            nodes.push(TreeNode::leaf(majority_class(&counts) as u32));
            return current;
        }

        nodes.push(TreeNode {
            feature_index: split.feature as u16,
            threshold: split.threshold,
            left: 0,
            right: 0,
            class: None,
        });
        let left = self.build_node(&left_rows, depth + 1, nodes, rng);
        let right = self.build_node(&right_rows, depth + 1, nodes, rng);
        let node = &mut nodes[current as usize];
        node.left = left;
        node.right = right;
        current
    }

    /// Pick the best split among a random feature subset. Features with no
    /// usable split (constant within the node) do not count against the
    /// subset budget, so sparse signal still gets found.
    fn find_best_split<R: Rng + ?Sized>(
        &self,
        indices: &[usize],
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let mut order: Vec<usize> = (0..self.feature_len).collect();
        order.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut evaluated = 0usize;
        for &feature in &order {
            if evaluated >= self.features_per_split {
                break;
            }
            let Some(candidate) = self.best_split_for_feature(indices, feature) else {
                continue;
            };
            evaluated += 1;
            best = match best {
                Some(current) if !candidate.beats(&current) => Some(current),
                _ => Some(candidate),
            };
        }
        best
    }

    /// Exact-greedy scan over one feature: sort the node's values, score
    /// every boundary between distinct neighbors by weighted gini.
    fn best_split_for_feature(&self, indices: &[usize], feature: usize) -> Option<SplitCandidate> {
        let mut values: Vec<(f32, usize)> = indices
            .iter()
            .map(|&row| (self.x[row][feature], self.y[row]))
            .collect();
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = values.len();
        let total = {
            let mut counts = vec![0u32; self.n_classes];
            for &(_, label) in &values {
                counts[label] += 1;
            }
            counts
        };

        let mut left = vec![0u32; self.n_classes];
        let mut best: Option<SplitCandidate> = None;
        for i in 0..n - 1 {
            left[values[i].1] += 1;
            if values[i].0 == values[i + 1].0 {
                continue;
            }
            let left_count = i + 1;
            let right_count = n - left_count;
            if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                continue;
            }
            let candidate = SplitCandidate {
                feature,
                threshold: midpoint(values[i].0, values[i + 1].0),
                gini: weighted_gini(&left, left_count, &total, right_count),
            };
            best = match best {
                Some(current) if !candidate.beats(&current) => Some(current),
                _ => Some(candidate),
            };
        }
        best
    }

    fn partition(
        &self,
        indices: &[usize],
        feature: usize,
        threshold: f32,
    ) -> (Vec<usize>, Vec<usize>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &row in indices {
            if self.x[row][feature] <= threshold {
                left.push(row);
            } else {
                right.push(row);
            }
        }
        (left, right)
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_classes];
        for &row in indices {
            counts[self.y[row]] += 1;
        }
        counts
    }
}

fn is_pure(counts: &[u32]) -> bool {
    counts.iter().filter(|&&count| count > 0).count() <= 1
}

/// Most frequent class; ties go to the lowest index.
fn majority_class(counts: &[u32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_count = 0u32;
    for (idx, &count) in counts.iter().enumerate() {
        if count > best_count {
            best_count = count;
            best_idx = idx;
        }
    }
    best_idx
}

fn midpoint(low: f32, high: f32) -> f32 {
    low + (high - low) / 2.0
}

/// Size-weighted gini impurity of a boundary; `left` holds the class counts
/// of the prefix, the suffix counts are derived from `total`.
fn weighted_gini(left: &[u32], left_count: usize, total: &[u32], right_count: usize) -> f64 {
    let mut left_gini = 1.0f64;
    let mut right_gini = 1.0f64;
    for (&in_left, &overall) in left.iter().zip(total) {
        if left_count > 0 {
            let p = in_left as f64 / left_count as f64;
            left_gini -= p * p;
        }
        if right_count > 0 {
            let p = (overall - in_left) as f64 / right_count as f64;
            right_gini -= p * p;
        }
    }
    let n = (left_count + right_count) as f64;
    (left_count as f64 * left_gini + right_count as f64 * right_gini) / n
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two classes cleanly separated on every feature.
    fn separable_data() -> TrainData {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for _ in 0..6 {
            x.push(vec![0.0, 0.0, 20.0]);
            y.push(0);
            x.push(vec![1.0, 1.0, 70.0]);
            y.push(1);
        }
        TrainData {
            feature_len: 3,
            classes: vec!["low".into(), "high".into()],
            x,
            y,
        }
    }

    #[test]
    fn fits_separable_data_exactly() {
        let data = separable_data();
        let model = train_forest(&data, &TrainOptions::default()).unwrap();
        model.validate().unwrap();
        for (features, &label) in data.x.iter().zip(&data.y) {
            assert_eq!(model.predict_class_index(features).unwrap(), label);
        }
    }

    #[test]
    fn same_seed_gives_identical_models() {
        let data = separable_data();
        let options = TrainOptions {
            trees: 20,
            ..TrainOptions::default()
        };
        let a = train_forest(&data, &options).unwrap();
        let b = train_forest(&data, &options).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_may_disagree_structurally() {
        let data = separable_data();
        let a = train_forest(
            &data,
            &TrainOptions {
                seed: 1,
                ..TrainOptions::default()
            },
        )
        .unwrap();
        let b = train_forest(
            &data,
            &TrainOptions {
                seed: 2,
                ..TrainOptions::default()
            },
        )
        .unwrap();
        // Both models stay correct; only the ensembles differ.
        assert_ne!(a, b);
        assert_eq!(a.predict_label(&[0.0, 0.0, 20.0]).unwrap(), "low");
        assert_eq!(b.predict_label(&[0.0, 0.0, 20.0]).unwrap(), "low");
    }

    #[test]
    fn feature_order_carries_meaning() {
        // Class patterns are mirror images: reversing a feature vector turns
        // one class's row into the other's.
        let mut x = Vec::new();
        let mut y = Vec::new();
        for _ in 0..5 {
            x.push(vec![0.0, 0.0, 0.0, 60.0]);
            y.push(0);
            x.push(vec![60.0, 0.0, 0.0, 0.0]);
            y.push(1);
        }
        let data = TrainData {
            feature_len: 4,
            classes: vec!["head".into(), "tail".into()],
            x,
            y,
        };
        let model = train_forest(&data, &TrainOptions::default()).unwrap();

        let forward = vec![0.0, 0.0, 0.0, 60.0];
        let mut reversed = forward.clone();
        reversed.reverse();
        let straight = model.predict_label(&forward).unwrap();
        let swapped = model.predict_label(&reversed).unwrap();
        assert_eq!(straight, "head");
        assert_eq!(swapped, "tail");
        assert_ne!(straight, swapped);
    }

    #[test]
    fn rejects_malformed_tables() {
        let data = separable_data();

        let empty = TrainData {
            feature_len: 3,
            classes: data.classes.clone(),
            x: Vec::new(),
            y: Vec::new(),
        };
        assert!(matches!(
            train_forest(&empty, &TrainOptions::default()),
            Err(TrainError::EmptyDataset)
        ));

        let mut mismatched = data.clone();
        mismatched.y.pop();
        assert!(matches!(
            train_forest(&mismatched, &TrainOptions::default()),
            Err(TrainError::RowMismatch { .. })
        ));

        let mut single_class = data.clone();
        single_class.classes.truncate(1);
        single_class.y.iter_mut().for_each(|label| *label = 0);
        assert!(matches!(
            train_forest(&single_class, &TrainOptions::default()),
            Err(TrainError::TooFewClasses(1))
        ));

        let mut ragged = data.clone();
        ragged.x[3] = vec![1.0];
        assert!(matches!(
            train_forest(&ragged, &TrainOptions::default()),
            Err(TrainError::RowLength { row: 3, .. })
        ));

        let mut bad_label = data.clone();
        bad_label.y[0] = 7;
        assert!(matches!(
            train_forest(&bad_label, &TrainOptions::default()),
            Err(TrainError::LabelOutOfRange { row: 0, .. })
        ));

        assert!(matches!(
            train_forest(
                &data,
                &TrainOptions {
                    trees: 0,
                    ..TrainOptions::default()
                }
            ),
            Err(TrainError::NoTrees)
        ));
    }

    #[test]
    fn depth_one_trees_are_stumps() {
        let data = separable_data();
        let options = TrainOptions {
            trees: 5,
            max_depth: 1,
            ..TrainOptions::default()
        };
        let model = train_forest(&data, &options).unwrap();
        for tree in &model.trees {
            assert!(tree.nodes.len() <= 3);
        }
    }
}
