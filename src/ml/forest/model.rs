use thiserror::Error;

/// Errors surfaced by model inference.
#[derive(Debug, Error)]
pub enum ForestError {
    /// Feature vector length disagrees with what the model was fit on.
    #[error("feature vector has {got} values, model expects {expected}")]
    FeatureLength { expected: usize, got: usize },
    /// Model carries no class table.
    #[error("model has no classes")]
    NoClasses,
}

/// A decision tree node (split or leaf), stored in a flat array.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Feature index used for the split.
    pub feature_index: u16,
    /// Split threshold; `value <= threshold` goes left.
    pub threshold: f32,
    /// Left child index into the node array.
    pub left: u32,
    /// Right child index into the node array.
    pub right: u32,
    /// Class index for leaf nodes; `None` for splits.
    pub class: Option<u32>,
}

impl TreeNode {
    /// Construct a leaf carrying a class index.
    pub fn leaf(class: u32) -> Self {
        Self {
            feature_index: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
            class: Some(class),
        }
    }
}

/// One CART tree; node 0 is the root. Children always come after their
/// parent in the array, so traversal cannot cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk the tree for one feature vector and return the leaf class index.
    pub fn predict_class(&self, features: &[f32]) -> usize {
        let mut idx = 0usize;
        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0;
            };
            if let Some(class) = node.class {
                return class as usize;
            }
            let value = features
                .get(node.feature_index as usize)
                .copied()
                .unwrap_or(0.0);
            idx = if value <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

/// Trained random-forest classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestModel {
    /// Ordered class labels; leaves index into this table.
    pub classes: Vec<String>,
    /// Expected feature vector length.
    pub feature_len: usize,
    /// Seed the forest was grown from.
    pub seed: u64,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err("Model must contain at least 2 classes".to_string());
        }
        if self.feature_len == 0 {
            return Err("Model feature length must be nonzero".to_string());
        }
        if self.trees.is_empty() {
            return Err("Model must contain at least one tree".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("Tree {tree_idx} has no nodes"));
            }
            for (node_idx, node) in tree.nodes.iter().enumerate() {
                match node.class {
                    Some(class) => {
                        if class as usize >= self.classes.len() {
                            return Err(format!(
                                "Tree {tree_idx} node {node_idx} points at class {class} of {}",
                                self.classes.len()
                            ));
                        }
                    }
                    None => {
                        let left = node.left as usize;
                        let right = node.right as usize;
                        if left <= node_idx || left >= tree.nodes.len() {
                            return Err(format!(
                                "Tree {tree_idx} node {node_idx} has invalid left child {left}"
                            ));
                        }
                        if right <= node_idx || right >= tree.nodes.len() {
                            return Err(format!(
                                "Tree {tree_idx} node {node_idx} has invalid right child {right}"
                            ));
                        }
                        if node.feature_index as usize >= self.feature_len {
                            return Err(format!(
                                "Tree {tree_idx} node {node_idx} splits on feature {} of {}",
                                node.feature_index, self.feature_len
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Per-class vote counts for one feature vector.
    pub fn votes(&self, features: &[f32]) -> Result<Vec<u32>, ForestError> {
        if features.len() != self.feature_len {
            return Err(ForestError::FeatureLength {
                expected: self.feature_len,
                got: features.len(),
            });
        }
        if self.classes.is_empty() {
            return Err(ForestError::NoClasses);
        }
        let mut votes = vec![0u32; self.classes.len()];
        for tree in &self.trees {
            let class = tree.predict_class(features);
            if let Some(slot) = votes.get_mut(class) {
                *slot += 1;
            }
        }
        Ok(votes)
    }

    /// Majority-vote class index; ties resolve to the lowest index.
    pub fn predict_class_index(&self, features: &[f32]) -> Result<usize, ForestError> {
        Ok(argmax(&self.votes(features)?))
    }

    /// Majority-vote class label.
    pub fn predict_label(&self, features: &[f32]) -> Result<&str, ForestError> {
        let votes = self.votes(features)?;
        let best = argmax(&votes);
        self.classes
            .get(best)
            .map(String::as_str)
            .ok_or(ForestError::NoClasses)
    }
}

fn argmax(votes: &[u32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = 0u32;
    for (idx, &count) in votes.iter().enumerate() {
        if count > best_val {
            best_val = count;
            best_idx = idx;
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(feature: u16, threshold: f32, left: u32, right: u32) -> TreeNode {
        TreeNode {
            feature_index: feature,
            threshold,
            left,
            right,
            class: None,
        }
    }

    fn two_class_model() -> ForestModel {
        // One tree: feature 0 <= 0.5 -> class 0, else class 1.
        ForestModel {
            classes: vec!["a".into(), "b".into()],
            feature_len: 2,
            seed: 0,
            trees: vec![DecisionTree {
                nodes: vec![split(0, 0.5, 1, 2), TreeNode::leaf(0), TreeNode::leaf(1)],
            }],
        }
    }

    #[test]
    fn tree_walk_takes_left_on_equal() {
        let model = two_class_model();
        assert_eq!(model.trees[0].predict_class(&[0.5, 9.0]), 0);
        assert_eq!(model.trees[0].predict_class(&[0.6, 9.0]), 1);
    }

    #[test]
    fn wrong_feature_count_is_rejected() {
        let model = two_class_model();
        let err = model.votes(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::FeatureLength {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn vote_ties_pick_lowest_class_index() {
        let mut model = two_class_model();
        // Second tree always answers class 1; votes are now 1:1 on the left
        // branch input.
        model.trees.push(DecisionTree {
            nodes: vec![TreeNode::leaf(1)],
        });
        assert_eq!(model.predict_class_index(&[0.0, 0.0]).unwrap(), 0);
        assert_eq!(model.predict_label(&[0.0, 0.0]).unwrap(), "a");
    }

    #[test]
    fn validate_flags_bad_children_and_classes() {
        let model = two_class_model();
        assert!(model.validate().is_ok());

        let mut backward = model.clone();
        backward.trees[0].nodes[0].left = 0;
        assert!(backward.validate().is_err());

        let mut bad_class = model.clone();
        bad_class.trees[0].nodes[1] = TreeNode::leaf(9);
        assert!(bad_class.validate().is_err());

        let mut bad_feature = model;
        bad_feature.trees[0].nodes[0].feature_index = 7;
        assert!(bad_feature.validate().is_err());
    }
}
