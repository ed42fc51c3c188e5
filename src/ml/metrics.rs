//! Evaluation metrics for the trained classifier.

#[derive(Debug, Clone)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    /// Count of rows whose true class is `class_idx`.
    fn row_total(&self, class_idx: usize) -> u32 {
        (0..self.n_classes)
            .map(|predicted| self.get(class_idx, predicted))
            .sum()
    }

    /// Count of rows predicted as `class_idx`.
    fn column_total(&self, class_idx: usize) -> u32 {
        (0..self.n_classes)
            .map(|truth| self.get(truth, class_idx))
            .sum()
    }
}

#[derive(Debug, Clone)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Harmonic mean of precision and recall.
    pub f1: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute per-class precision, recall and f1 from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let mut stats = Vec::with_capacity(cm.n_classes);
    for class_idx in 0..cm.n_classes {
        let tp = cm.get(class_idx, class_idx) as f32;
        let support = cm.row_total(class_idx);
        let predicted = cm.column_total(class_idx) as f32;
        let precision = if predicted == 0.0 { 0.0 } else { tp / predicted };
        let recall = if support == 0 {
            0.0
        } else {
            tp / support as f32
        };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        stats.push(PerClassStats {
            precision,
            recall,
            f1,
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let total: u64 = cm.counts.iter().map(|&count| count as u64).sum();
    if total == 0 {
        return 0.0;
    }
    let correct: u64 = (0..cm.n_classes)
        .map(|class_idx| cm.get(class_idx, class_idx) as u64)
        .sum();
    correct as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_class_matrix() -> ConfusionMatrix {
        // truth 0: 8 right, 2 called class 1; truth 1: 3 called class 0, 7 right
        let mut cm = ConfusionMatrix::new(2);
        for _ in 0..8 {
            cm.add(0, 0);
        }
        for _ in 0..2 {
            cm.add(0, 1);
        }
        for _ in 0..3 {
            cm.add(1, 0);
        }
        for _ in 0..7 {
            cm.add(1, 1);
        }
        cm
    }

    #[test]
    fn accuracy_counts_the_diagonal() {
        let cm = two_class_matrix();
        assert!((accuracy(&cm) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn per_class_stats_match_hand_computation() {
        let cm = two_class_matrix();
        let stats = precision_recall_by_class(&cm);
        assert_eq!(stats.len(), 2);

        // class 0: tp=8, fp=3, fn=2
        assert!((stats[0].precision - 8.0 / 11.0).abs() < 1e-6);
        assert!((stats[0].recall - 0.8).abs() < 1e-6);
        assert_eq!(stats[0].support, 10);

        // class 1: tp=7, fp=2, fn=3
        assert!((stats[1].precision - 7.0 / 9.0).abs() < 1e-6);
        assert!((stats[1].recall - 0.7).abs() < 1e-6);
        assert_eq!(stats[1].support, 10);
    }

    #[test]
    fn absent_class_scores_zero_instead_of_nan() {
        let mut cm = ConfusionMatrix::new(3);
        cm.add(0, 0);
        cm.add(1, 1);
        let stats = precision_recall_by_class(&cm);
        assert_eq!(stats[2].support, 0);
        assert_eq!(stats[2].precision, 0.0);
        assert_eq!(stats[2].recall, 0.0);
        assert_eq!(stats[2].f1, 0.0);
    }

    #[test]
    fn out_of_range_adds_are_dropped() {
        let mut cm = ConfusionMatrix::new(2);
        cm.add(5, 0);
        cm.add(0, 5);
        assert!(cm.counts.iter().all(|&count| count == 0));
    }

    #[test]
    fn empty_matrix_has_zero_accuracy() {
        let cm = ConfusionMatrix::new(4);
        assert_eq!(accuracy(&cm), 0.0);
    }
}
