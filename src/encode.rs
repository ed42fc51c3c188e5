//! Categorical encoding shared by training and inference.
//!
//! All encoders are fit once from the training table and frozen. Codes
//! follow lexicographic order of the distinct values seen at fit time, so a
//! refit over the same column (in any row order) produces the same map.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::dataset::{SymptomDataset, SymptomRow};

#[derive(Debug, Error)]
pub enum EncodeError {
    /// Categorical value that was never seen when the map was fit.
    #[error("unknown {column} value {value:?} (known values: {known:?})")]
    UnknownCategory {
        column: &'static str,
        value: String,
        known: Vec<String>,
    },
    /// Input outside the fixed vocabulary of a hard-coded field.
    #[error("invalid {field} value {value:?} (expected {expected})")]
    InvalidInput {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Map "Yes"/"No" to 1/0. Anything else is rejected.
pub fn encode_binary(field: &'static str, value: &str) -> Result<i64, EncodeError> {
    match value {
        "Yes" => Ok(1),
        "No" => Ok(0),
        _ => Err(EncodeError::InvalidInput {
            field,
            value: value.to_string(),
            expected: "\"Yes\" or \"No\"",
        }),
    }
}

/// Map "Male"/"Female" to 1/0. Anything else is rejected.
pub fn encode_gender(value: &str) -> Result<i64, EncodeError> {
    match value {
        "Male" => Ok(1),
        "Female" => Ok(0),
        _ => Err(EncodeError::InvalidInput {
            field: "Gender",
            value: value.to_string(),
            expected: "\"Male\" or \"Female\"",
        }),
    }
}

/// Frozen value-to-code mapping for one categorical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingMap {
    column: &'static str,
    codes: BTreeMap<String, i64>,
}

impl EncodingMap {
    /// Fit a map over every value of one column.
    pub fn fit<'a, I>(column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        let codes = distinct
            .into_iter()
            .enumerate()
            .map(|(idx, value)| (value.to_string(), idx as i64))
            .collect();
        Self { column, codes }
    }

    /// Look up the code for a value; unseen values are an error, never a
    /// fallback code.
    pub fn transform(&self, value: &str) -> Result<i64, EncodeError> {
        self.codes
            .get(value)
            .copied()
            .ok_or_else(|| EncodeError::UnknownCategory {
                column: self.column,
                value: value.to_string(),
                known: self.codes.keys().cloned().collect(),
            })
    }

    /// Known values in code order.
    pub fn values(&self) -> Vec<&str> {
        self.codes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Raw, form-shaped input for a single prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientInput {
    pub fever: String,
    pub cough: String,
    pub fatigue: String,
    pub difficulty_breathing: String,
    pub age: f64,
    pub gender: String,
    pub blood_pressure: String,
    pub cholesterol_level: String,
}

/// Encoded form of one patient record, in model feature order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedFeatures {
    pub fever: i64,
    pub cough: i64,
    pub fatigue: i64,
    pub difficulty_breathing: i64,
    pub age: f64,
    pub gender: i64,
    pub blood_pressure: i64,
    pub cholesterol_level: i64,
}

impl EncodedFeatures {
    /// The eight-element model input, in [`crate::dataset::FEATURE_COLUMNS`]
    /// order. Training and inference both go through here so the two can
    /// never disagree on feature order.
    pub fn to_model_row(&self) -> Vec<f32> {
        vec![
            self.fever as f32,
            self.cough as f32,
            self.fatigue as f32,
            self.difficulty_breathing as f32,
            self.age as f32,
            self.gender as f32,
            self.blood_pressure as f32,
            self.cholesterol_level as f32,
        ]
    }
}

/// Per-column encoders fit once from the training table.
///
/// Blood pressure and cholesterol each get their own map. Sharing a single
/// map across both columns would leave inference with whichever vocabulary
/// was fit last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureEncoders {
    pub blood_pressure: EncodingMap,
    pub cholesterol_level: EncodingMap,
}

impl FeatureEncoders {
    /// Fit both categorical maps from the training table.
    pub fn fit(dataset: &SymptomDataset) -> Self {
        Self {
            blood_pressure: EncodingMap::fit(
                "Blood Pressure",
                dataset.rows.iter().map(|row| row.blood_pressure.as_str()),
            ),
            cholesterol_level: EncodingMap::fit(
                "Cholesterol Level",
                dataset.rows.iter().map(|row| row.cholesterol_level.as_str()),
            ),
        }
    }

    /// Encode one raw prediction input.
    pub fn encode_input(&self, input: &PatientInput) -> Result<EncodedFeatures, EncodeError> {
        if !input.age.is_finite() {
            return Err(EncodeError::InvalidInput {
                field: "Age",
                value: input.age.to_string(),
                expected: "a finite number",
            });
        }
        Ok(EncodedFeatures {
            fever: encode_binary("Fever", &input.fever)?,
            cough: encode_binary("Cough", &input.cough)?,
            fatigue: encode_binary("Fatigue", &input.fatigue)?,
            difficulty_breathing: encode_binary(
                "Difficulty Breathing",
                &input.difficulty_breathing,
            )?,
            age: input.age,
            gender: encode_gender(&input.gender)?,
            blood_pressure: self.blood_pressure.transform(&input.blood_pressure)?,
            cholesterol_level: self.cholesterol_level.transform(&input.cholesterol_level)?,
        })
    }

    /// Encode one training row.
    pub fn encode_row(&self, row: &SymptomRow) -> Result<EncodedFeatures, EncodeError> {
        self.encode_input(&PatientInput {
            fever: row.fever.clone(),
            cough: row.cough.clone(),
            fatigue: row.fatigue.clone(),
            difficulty_breathing: row.difficulty_breathing.clone(),
            age: row.age,
            gender: row.gender.clone(),
            blood_pressure: row.blood_pressure.clone(),
            cholesterol_level: row.cholesterol_level.clone(),
        })
    }
}
