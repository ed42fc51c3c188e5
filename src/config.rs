//! Application configuration persisted as TOML under the `.prognos` dir.
//!
//! Everything has a serde default so old config files keep loading as new
//! fields appear. The training seed lives here rather than in the code: the
//! model is retrained at every launch and deterministic runs need the seed
//! to be visible and overridable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::store::DB_FILE_NAME;

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application settings loaded from the TOML config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the training dataset CSV.
    #[serde(default = "default_dataset_path")]
    pub dataset: PathBuf,
    /// Path to the SQLite record store. Defaults to the app dir when unset.
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub training: TrainingSettings,
}

/// Knobs for the per-launch model fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// Number of trees in the forest.
    #[serde(default = "default_trees")]
    pub trees: usize,
    /// Maximum tree depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Minimum samples a leaf may hold.
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// Seed for bootstrap and feature sampling.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset_path(),
            database: None,
            training: TrainingSettings::default(),
        }
    }
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            trees: default_trees(),
            max_depth: default_max_depth(),
            min_samples_leaf: default_min_samples_leaf(),
            seed: default_seed(),
        }
    }
}

impl AppConfig {
    /// Resolve the database path, falling back to the app dir default.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => {
                let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
                Ok(dir.join(DB_FILE_NAME))
            }
        }
    }
}

/// Errors that may occur while loading or saving app configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from the default location, returning defaults if missing.
pub fn load_or_default() -> Result<AppConfig, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    load_from(&path)
}

/// Load configuration from an explicit path; a missing file is an error here.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist configuration to the default location.
pub fn save(config: &AppConfig) -> Result<(), ConfigError> {
    let path = config_path()?;
    save_to_path(config, &path)
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, data).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("Disease_symptom_and_patient_profile_dataset.csv")
}

fn default_trees() -> usize {
    100
}

fn default_max_depth() -> usize {
    16
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_seed() -> u64 {
    42
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn training_settings_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        let cfg = AppConfig {
            dataset: PathBuf::from("data/symptoms.csv"),
            database: Some(PathBuf::from("records.db")),
            training: TrainingSettings {
                trees: 25,
                max_depth: 4,
                min_samples_leaf: 2,
                seed: 7,
            },
        };
        save_to_path(&cfg, &path).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.dataset, PathBuf::from("data/symptoms.csv"));
        assert_eq!(loaded.database, Some(PathBuf::from("records.db")));
        assert_eq!(loaded.training.trees, 25);
        assert_eq!(loaded.training.max_depth, 4);
        assert_eq!(loaded.training.min_samples_leaf, 2);
        assert_eq!(loaded.training.seed, 7);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, "[training]\nseed = 9\n").unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.training.seed, 9);
        assert_eq!(loaded.training.trees, 100);
        assert_eq!(loaded.dataset, default_dataset_path());
        assert!(loaded.database.is_none());
    }

    #[test]
    fn load_or_default_without_file_returns_defaults() {
        let base = tempdir().unwrap();
        let _guard = crate::app_dirs::ConfigBaseGuard::set(base.path().to_path_buf());
        let cfg = load_or_default().unwrap();
        assert_eq!(cfg.training.trees, 100);
        assert_eq!(cfg.training.seed, 42);
    }

    #[test]
    fn database_path_defaults_into_app_dir() {
        let base = tempdir().unwrap();
        let _guard = crate::app_dirs::ConfigBaseGuard::set(base.path().to_path_buf());
        let cfg = AppConfig::default();
        let db = cfg.database_path().unwrap();
        assert_eq!(
            db,
            base.path().join(app_dirs::APP_DIR_NAME).join(DB_FILE_NAME)
        );
    }
}
