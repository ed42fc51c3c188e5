//! SQLite-backed history of predictions.
//!
//! Every successful prediction appends one row: the encoded feature values
//! the model actually saw plus the predicted disease label. Rows are never
//! updated or deleted, the table is an append-only log.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encode::EncodedFeatures;

/// Default filename for the patient history database.
pub const DB_FILE_NAME: &str = "patients.db";

/// One persisted prediction, as read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: i64,
    pub fever: i64,
    pub cough: i64,
    pub fatigue: i64,
    pub difficulty_breathing: i64,
    pub age: i64,
    pub gender: i64,
    pub blood_pressure: i64,
    pub cholesterol_level: i64,
    pub disease: String,
}

/// Errors returned when managing the patient database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("Could not write to {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Database is busy, please retry")]
    Busy,
    #[error("SQLite returned an unexpected result")]
    Unexpected,
}

/// SQLite wrapper around the `patients` table.
pub struct PatientDatabase {
    connection: Connection,
}

impl PatientDatabase {
    /// Open (or create) the database at `path`, creating parent directories
    /// as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        create_parent_if_needed(path)?;
        let connection = Connection::open(path)?;
        let db = Self { connection };
        db.apply_pragmas()?;
        db.apply_schema()?;
        Ok(db)
    }

    /// Append one prediction. Returns the id SQLite assigned to the row.
    pub fn append(&self, features: &EncodedFeatures, disease: &str) -> Result<i64, StoreError> {
        let mut stmt = self
            .connection
            .prepare_cached(
                "INSERT INTO patients (fever, cough, fatigue, difficulty_breathing,
                                       age, gender, blood_pressure, cholesterol_level, disease)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .map_err(map_sql_error)?;
        stmt.execute(params![
            features.fever,
            features.cough,
            features.fatigue,
            features.difficulty_breathing,
            features.age.round() as i64,
            features.gender,
            features.blood_pressure,
            features.cholesterol_level,
            disease,
        ])
        .map_err(map_sql_error)?;
        Ok(self.connection.last_insert_rowid())
    }

    /// Fetch every stored prediction in insertion order.
    pub fn list_all(&self) -> Result<Vec<PatientRecord>, StoreError> {
        let mut stmt = self
            .connection
            .prepare(
                "SELECT id, fever, cough, fatigue, difficulty_breathing,
                        age, gender, blood_pressure, cholesterol_level, disease
                 FROM patients ORDER BY id ASC",
            )
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PatientRecord {
                    id: row.get(0)?,
                    fever: row.get(1)?,
                    cough: row.get(2)?,
                    fatigue: row.get(3)?,
                    difficulty_breathing: row.get(4)?,
                    age: row.get(5)?,
                    gender: row.get(6)?,
                    blood_pressure: row.get(7)?,
                    cholesterol_level: row.get(8)?,
                    disease: row.get(9)?,
                })
            })
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows)
    }

    /// Number of stored predictions.
    pub fn count(&self) -> Result<i64, StoreError> {
        self.connection
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
            .map_err(map_sql_error)
    }

    fn apply_pragmas(&self) -> Result<(), StoreError> {
        self.connection
            .execute_batch(
                "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
            )
            .map_err(map_sql_error)?;
        Ok(())
    }

    fn apply_schema(&self) -> Result<(), StoreError> {
        self.connection
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS patients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fever INTEGER NOT NULL,
                cough INTEGER NOT NULL,
                fatigue INTEGER NOT NULL,
                difficulty_breathing INTEGER NOT NULL,
                age INTEGER NOT NULL,
                gender INTEGER NOT NULL,
                blood_pressure INTEGER NOT NULL,
                cholesterol_level INTEGER NOT NULL,
                disease TEXT NOT NULL
            );",
            )
            .map_err(map_sql_error)?;
        Ok(())
    }
}

/// Translate rusqlite errors into friendlier StoreError variants.
fn map_sql_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.extended_code == rusqlite::ffi::SQLITE_BUSY =>
        {
            StoreError::Busy
        }
        rusqlite::Error::InvalidQuery
        | rusqlite::Error::InvalidParameterName(_)
        | rusqlite::Error::MultipleStatement => StoreError::Unexpected,
        other => StoreError::Sql(other),
    }
}

fn create_parent_if_needed(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
