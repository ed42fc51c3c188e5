//! Machine learning building blocks for the disease classifier.
//!
//! The forest is trained from scratch at every launch and never persisted;
//! determinism comes from the seed carried in the training options.

pub mod forest;
pub mod metrics;
