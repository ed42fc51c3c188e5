//! Library exports for reuse in benchmarks and tests.
/// Application directory resolution.
pub mod app_dirs;
/// TOML configuration loading and saving.
pub mod config;
/// Training dataset CSV loading.
pub mod dataset;
/// Categorical feature encoding.
pub mod encode;
/// Log file setup.
pub mod logging;
/// Model training and evaluation.
pub mod ml;
/// Trained prediction context.
pub mod predict;
/// Prediction and record-store orchestration.
pub mod session;
/// SQLite record store.
pub mod store;
