//! Trained prediction context.
//!
//! [`Predictor`] bundles the fitted category encoders with the forest model.
//! It is built once from the symptom dataset and never mutated afterwards, so
//! every prediction runs against the same encodings and the same trees.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::dataset::{FEATURE_COLUMNS, SymptomDataset};
use crate::encode::{EncodeError, EncodedFeatures, FeatureEncoders, PatientInput};
use crate::ml::forest::{
    ForestError, ForestModel, TrainData, TrainError, TrainOptions, train_forest,
};
use crate::ml::metrics::{ConfusionMatrix, accuracy, precision_recall_by_class};

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("dataset row {row} cannot be encoded: {source}")]
    DatasetRow { row: usize, source: EncodeError },
    #[error("dataset names disease {label:?} outside the label set")]
    UnknownDisease { label: String },
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error("trained model failed validation: {reason}")]
    InvalidModel { reason: String },
    #[error(transparent)]
    Model(#[from] ForestError),
}

/// One answer from the model.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Predicted disease label, always one of the training labels.
    pub disease: String,
    /// Share of trees that voted for the winner, in `(0, 1]`.
    pub confidence: f32,
}

/// Immutable inference context: fitted encoders plus the trained forest.
#[derive(Debug, Clone)]
pub struct Predictor {
    encoders: FeatureEncoders,
    model: ForestModel,
    train_accuracy: f32,
}

impl Predictor {
    /// Fit encoders and forest on the loaded dataset. Reports the training
    /// accuracy to the log so drifting datasets get noticed early.
    pub fn fit(dataset: &SymptomDataset, options: &TrainOptions) -> Result<Self, PredictError> {
        let encoders = FeatureEncoders::fit(dataset);
        let classes = dataset.disease_labels();
        let class_index: BTreeMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();

        let mut x = Vec::with_capacity(dataset.len());
        let mut y = Vec::with_capacity(dataset.len());
        for (idx, row) in dataset.rows.iter().enumerate() {
            let features = encoders
                .encode_row(row)
                .map_err(|source| PredictError::DatasetRow {
                    row: idx + 1,
                    source,
                })?;
            x.push(features.to_model_row());
            let label = class_index
                .get(row.disease.as_str())
                .copied()
                .ok_or_else(|| PredictError::UnknownDisease {
                    label: row.disease.clone(),
                })?;
            y.push(label);
        }

        let data = TrainData {
            feature_len: FEATURE_COLUMNS.len(),
            classes,
            x,
            y,
        };
        let model = train_forest(&data, options)?;
        model
            .validate()
            .map_err(|reason| PredictError::InvalidModel { reason })?;

        let mut cm = ConfusionMatrix::new(model.classes.len());
        for (features, &truth) in data.x.iter().zip(&data.y) {
            cm.add(truth, model.predict_class_index(features)?);
        }
        let train_accuracy = accuracy(&cm);
        info!(
            "Model trained: trees={} rows={} diseases={} train_accuracy={:.3}",
            model.trees.len(),
            data.x.len(),
            model.classes.len(),
            train_accuracy
        );
        for (name, stats) in model.classes.iter().zip(precision_recall_by_class(&cm)) {
            debug!(
                "Class {name}: precision={:.3} recall={:.3} support={}",
                stats.precision, stats.recall, stats.support
            );
        }

        Ok(Self {
            encoders,
            model,
            train_accuracy,
        })
    }

    /// Encode raw patient answers with the fitted encoders.
    pub fn encode(&self, input: &PatientInput) -> Result<EncodedFeatures, PredictError> {
        Ok(self.encoders.encode_input(input)?)
    }

    /// Run the forest over already-encoded features.
    pub fn predict_encoded(&self, features: &EncodedFeatures) -> Result<Prediction, PredictError> {
        let row = features.to_model_row();
        let votes = self.model.votes(&row)?;
        let mut best = 0usize;
        for (idx, &count) in votes.iter().enumerate() {
            if count > votes[best] {
                best = idx;
            }
        }
        let disease = self
            .model
            .classes
            .get(best)
            .cloned()
            .ok_or(PredictError::Model(ForestError::NoClasses))?;
        let total: u32 = votes.iter().sum();
        let confidence = if total == 0 {
            0.0
        } else {
            votes[best] as f32 / total as f32
        };
        Ok(Prediction {
            disease,
            confidence,
        })
    }

    /// Encode and classify in one step.
    pub fn predict(&self, input: &PatientInput) -> Result<Prediction, PredictError> {
        let features = self.encode(input)?;
        self.predict_encoded(&features)
    }

    /// Disease labels the model can produce, sorted.
    pub fn classes(&self) -> &[String] {
        &self.model.classes
    }

    /// Accuracy over the rows the model was fitted on.
    pub fn training_accuracy(&self) -> f32 {
        self.train_accuracy
    }
}
