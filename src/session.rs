//! One running session: a trained predictor plus its record store.
//!
//! The session owns the order of operations for a request. Encoding and
//! inference run first and only a successful prediction is appended to the
//! database, so a rejected input never leaves a row behind.

use thiserror::Error;
use tracing::info;

use crate::encode::PatientInput;
use crate::predict::{PredictError, Prediction, Predictor};
use crate::store::{PatientDatabase, PatientRecord, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Predict(#[from] PredictError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a stored prediction: the model answer and its row id.
#[derive(Debug, Clone)]
pub struct StoredPrediction {
    pub record_id: i64,
    pub prediction: Prediction,
}

pub struct PredictionSession {
    predictor: Predictor,
    db: PatientDatabase,
}

impl PredictionSession {
    pub fn new(predictor: Predictor, db: PatientDatabase) -> Self {
        Self { predictor, db }
    }

    /// Classify one patient and append the outcome to the history.
    pub fn predict_and_store(
        &self,
        input: &PatientInput,
    ) -> Result<StoredPrediction, SessionError> {
        let features = self.predictor.encode(input)?;
        let prediction = self.predictor.predict_encoded(&features)?;
        let record_id = self.db.append(&features, &prediction.disease)?;
        info!(
            "Prediction stored: id={} disease={} confidence={:.2}",
            record_id, prediction.disease, prediction.confidence
        );
        Ok(StoredPrediction {
            record_id,
            prediction,
        })
    }

    /// All stored predictions, oldest first.
    pub fn records(&self) -> Result<Vec<PatientRecord>, SessionError> {
        Ok(self.db.list_all()?)
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{SymptomDataset, SymptomRow};
    use crate::ml::forest::TrainOptions;
    use crate::store::DB_FILE_NAME;
    use tempfile::tempdir;

    fn dataset() -> SymptomDataset {
        let mut rows = Vec::new();
        let profiles = [
            ("Yes", "No", 45.0, "High", "Flu"),
            ("No", "Yes", 25.0, "Normal", "Asthma"),
        ];
        for _ in 0..4 {
            for (fever, cough, age, bp, disease) in profiles {
                rows.push(SymptomRow {
                    fever: fever.into(),
                    cough: cough.into(),
                    fatigue: "Yes".into(),
                    difficulty_breathing: "No".into(),
                    age,
                    gender: "Male".into(),
                    blood_pressure: bp.into(),
                    cholesterol_level: "Normal".into(),
                    outcome: "Positive".into(),
                    disease: disease.into(),
                });
            }
        }
        SymptomDataset { rows }
    }

    fn input(fever: &str, cough: &str, age: f64, bp: &str) -> PatientInput {
        PatientInput {
            fever: fever.into(),
            cough: cough.into(),
            fatigue: "Yes".into(),
            difficulty_breathing: "No".into(),
            age,
            gender: "Male".into(),
            blood_pressure: bp.into(),
            cholesterol_level: "Normal".into(),
        }
    }

    fn session(dir: &std::path::Path) -> PredictionSession {
        let predictor = Predictor::fit(&dataset(), &TrainOptions::default()).unwrap();
        let db = PatientDatabase::open(dir.join(DB_FILE_NAME)).unwrap();
        PredictionSession::new(predictor, db)
    }

    #[test]
    fn stored_prediction_matches_the_model_answer() {
        let dir = tempdir().unwrap();
        let session = session(dir.path());

        let stored = session.predict_and_store(&input("Yes", "No", 45.0, "High")).unwrap();
        assert_eq!(stored.prediction.disease, "Flu");

        let records = session.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, stored.record_id);
        assert_eq!(records[0].disease, "Flu");
        assert_eq!(records[0].fever, 1);
        assert_eq!(records[0].cough, 0);
        assert_eq!(records[0].age, 45);
    }

    #[test]
    fn consecutive_predictions_append_in_order() {
        let dir = tempdir().unwrap();
        let session = session(dir.path());

        let first = session.predict_and_store(&input("Yes", "No", 45.0, "High")).unwrap();
        let second = session.predict_and_store(&input("No", "Yes", 25.0, "Normal")).unwrap();
        assert!(second.record_id > first.record_id);

        let records = session.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, first.record_id);
        assert_eq!(records[1].id, second.record_id);
    }

    #[test]
    fn rejected_input_writes_nothing() {
        let dir = tempdir().unwrap();
        let session = session(dir.path());

        let err = session
            .predict_and_store(&input("Yes", "No", 45.0, "VeryHigh"))
            .unwrap_err();
        assert!(matches!(err, SessionError::Predict(_)));
        assert!(session.records().unwrap().is_empty());
    }
}
