//! Seeded random-forest classifier over encoded patient features.
//!
//! Multi-class classification via majority vote over CART trees. Bootstrap
//! row sampling and per-split feature subsampling draw from one seeded
//! generator, so a fit is reproducible from the data and options alone.
//! Ties, in split scoring and in the final vote, break toward the lower
//! index.

mod model;
mod train;

pub use model::{DecisionTree, ForestError, ForestModel, TreeNode};
pub use train::{TrainData, TrainError, TrainOptions, train_forest};
