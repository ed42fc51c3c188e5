//! Loader for the symptom/disease training table.
//!
//! The file is a plain comma-separated table with a fixed header. Columns are
//! looked up by name, so their order in the file does not matter; the order
//! features are fed to the model is fixed by [`FEATURE_COLUMNS`].

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Feature column headers in the order the model consumes them.
pub const FEATURE_COLUMNS: [&str; 8] = [
    "Fever",
    "Cough",
    "Fatigue",
    "Difficulty Breathing",
    "Age",
    "Gender",
    "Blood Pressure",
    "Cholesterol Level",
];

/// Label column header.
pub const DISEASE_COLUMN: &str = "Disease";
/// Consultation outcome column; loaded but never fed to the model.
pub const OUTCOME_COLUMN: &str = "Outcome Variable";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("dataset {path} has no data rows")]
    Empty { path: PathBuf },
    #[error("missing column {column:?} in dataset header")]
    MissingColumn { column: &'static str },
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: empty value in column {column:?}")]
    MissingValue { line: usize, column: &'static str },
    #[error("line {line}: invalid age {value:?}: {source}")]
    InvalidAge {
        line: usize,
        value: String,
        source: std::num::ParseFloatError,
    },
}

/// One raw dataset row; categorical fields keep their file spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct SymptomRow {
    pub fever: String,
    pub cough: String,
    pub fatigue: String,
    pub difficulty_breathing: String,
    pub age: f64,
    pub gender: String,
    pub blood_pressure: String,
    pub cholesterol_level: String,
    pub outcome: String,
    pub disease: String,
}

/// The loaded training table.
#[derive(Debug, Clone)]
pub struct SymptomDataset {
    pub rows: Vec<SymptomRow>,
}

impl SymptomDataset {
    /// Unique disease labels in deterministic (sorted) order.
    pub fn disease_labels(&self) -> Vec<String> {
        let mut set = BTreeSet::new();
        for row in &self.rows {
            set.insert(row.disease.clone());
        }
        set.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Positions of the required columns within the header.
struct ColumnIndex {
    fever: usize,
    cough: usize,
    fatigue: usize,
    difficulty_breathing: usize,
    age: usize,
    gender: usize,
    blood_pressure: usize,
    cholesterol_level: usize,
    outcome: usize,
    disease: usize,
    width: usize,
}

impl ColumnIndex {
    fn resolve(header: &[&str]) -> Result<Self, DatasetError> {
        let find = |column: &'static str| {
            header
                .iter()
                .position(|name| *name == column)
                .ok_or(DatasetError::MissingColumn { column })
        };
        Ok(Self {
            fever: find("Fever")?,
            cough: find("Cough")?,
            fatigue: find("Fatigue")?,
            difficulty_breathing: find("Difficulty Breathing")?,
            age: find("Age")?,
            gender: find("Gender")?,
            blood_pressure: find("Blood Pressure")?,
            cholesterol_level: find("Cholesterol Level")?,
            outcome: find(OUTCOME_COLUMN)?,
            disease: find(DISEASE_COLUMN)?,
            width: header.len(),
        })
    }
}

/// Load the training table from a CSV file.
pub fn load(path: &Path) -> Result<SymptomDataset, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut columns: Option<ColumnIndex> = None;
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        match &columns {
            None => columns = Some(ColumnIndex::resolve(&fields)?),
            Some(cols) => rows.push(parse_row(cols, &fields, idx + 1)?),
        }
    }

    if rows.is_empty() {
        return Err(DatasetError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(SymptomDataset { rows })
}

fn parse_row(cols: &ColumnIndex, fields: &[&str], line: usize) -> Result<SymptomRow, DatasetError> {
    if fields.len() != cols.width {
        return Err(DatasetError::FieldCount {
            line,
            expected: cols.width,
            found: fields.len(),
        });
    }
    let take = |pos: usize, column: &'static str| {
        let value = fields[pos];
        if value.is_empty() {
            return Err(DatasetError::MissingValue { line, column });
        }
        Ok(value.to_string())
    };
    let age_text = take(cols.age, "Age")?;
    let age = age_text
        .parse::<f64>()
        .map_err(|source| DatasetError::InvalidAge {
            line,
            value: age_text,
            source,
        })?;
    Ok(SymptomRow {
        fever: take(cols.fever, "Fever")?,
        cough: take(cols.cough, "Cough")?,
        fatigue: take(cols.fatigue, "Fatigue")?,
        difficulty_breathing: take(cols.difficulty_breathing, "Difficulty Breathing")?,
        age,
        gender: take(cols.gender, "Gender")?,
        blood_pressure: take(cols.blood_pressure, "Blood Pressure")?,
        cholesterol_level: take(cols.cholesterol_level, "Cholesterol Level")?,
        outcome: take(cols.outcome, OUTCOME_COLUMN)?,
        disease: take(cols.disease, DISEASE_COLUMN)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &str = "Disease,Fever,Cough,Fatigue,Difficulty Breathing,Age,Gender,Blood Pressure,Cholesterol Level,Outcome Variable";

    fn write_csv(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("symptoms.csv");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_minimal_table() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            &format!(
                "{HEADER}\nInfluenza,Yes,No,Yes,Yes,19,Female,Low,Normal,Positive\nAsthma,No,Yes,Yes,Yes,25,Male,Normal,Normal,Positive\n"
            ),
        );
        let dataset = load(&path).unwrap();
        assert_eq!(dataset.len(), 2);
        let first = &dataset.rows[0];
        assert_eq!(first.disease, "Influenza");
        assert_eq!(first.fever, "Yes");
        assert_eq!(first.age, 19.0);
        assert_eq!(first.blood_pressure, "Low");
        assert_eq!(first.outcome, "Positive");
        assert_eq!(
            dataset.disease_labels(),
            vec!["Asthma".to_string(), "Influenza".to_string()]
        );
    }

    #[test]
    fn header_order_does_not_matter() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "Age,Disease,Gender,Fever,Cough,Fatigue,Difficulty Breathing,Blood Pressure,Cholesterol Level,Outcome Variable\n\
             45,Diabetes,Male,Yes,No,Yes,No,High,Normal,Negative\n",
        );
        let dataset = load(&path).unwrap();
        let row = &dataset.rows[0];
        assert_eq!(row.age, 45.0);
        assert_eq!(row.disease, "Diabetes");
        assert_eq!(row.fever, "Yes");
        assert_eq!(row.cholesterol_level, "Normal");
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "Disease,Fever,Cough,Fatigue,Age,Gender,Blood Pressure,Cholesterol Level,Outcome Variable\n\
             Flu,Yes,No,Yes,45,Male,High,Normal,Positive\n",
        );
        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::MissingColumn {
                column: "Difficulty Breathing"
            }
        ));
    }

    #[test]
    fn short_row_reports_line_and_counts() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            &format!("{HEADER}\nFlu,Yes,No,Yes,Yes,45,Male,High,Normal\n"),
        );
        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::FieldCount {
                line: 2,
                expected: 10,
                found: 9
            }
        ));
    }

    #[test]
    fn unparseable_age_fails() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            &format!("{HEADER}\nFlu,Yes,No,Yes,Yes,old,Male,High,Normal,Positive\n"),
        );
        let err = load(&path).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidAge { line: 2, .. }));
    }

    #[test]
    fn blank_value_fails_with_column_name() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            &format!("{HEADER}\nFlu,Yes,No,Yes,Yes,45,,High,Normal,Positive\n"),
        );
        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::MissingValue {
                line: 2,
                column: "Gender"
            }
        ));
    }

    #[test]
    fn header_only_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = write_csv(dir.path(), &format!("{HEADER}\n"));
        let err = load(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Empty { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}
