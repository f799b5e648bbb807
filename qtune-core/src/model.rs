//! The trainable-model capability.
//!
//! The search engine never looks inside a model. Anything that can be fit on
//! a feature matrix plus class labels under an [`Assignment`], and then
//! predict class labels, can be tuned.

use thiserror::Error;

use crate::dataset::FeatureMatrix;
use crate::domain::{Assignment, ParamValue};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainingError {
    #[error("required parameter '{0}' is missing")]
    MissingParameter(String),

    #[error("parameter '{name}' = {value} is invalid: {reason}")]
    InvalidParameter {
        name: String,
        value: ParamValue,
        reason: String,
    },

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("label {label} at row {row} is outside 0..{num_class}")]
    LabelOutOfRange { row: usize, label: u32, num_class: u32 },

    #[error("feature width mismatch: model expects {expected} columns, got {found}")]
    FeatureMismatch { expected: usize, found: usize },

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("model fit failed: {0}")]
    Fit(String),
}

impl TrainingError {
    pub fn invalid(name: &str, value: &ParamValue, reason: impl Into<String>) -> Self {
        TrainingError::InvalidParameter {
            name: name.to_string(),
            value: value.clone(),
            reason: reason.into(),
        }
    }
}

/// A model family that can be fit under a hyperparameter assignment.
pub trait TrainableModel {
    type Fitted: FittedModel;

    fn fit(
        &self,
        features: &FeatureMatrix,
        labels: &[u32],
        params: &Assignment,
    ) -> Result<Self::Fitted, TrainingError>;
}

/// A fitted model that predicts one class label per row.
pub trait FittedModel {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<u32>, TrainingError>;
}

impl<T: TrainableModel + ?Sized> TrainableModel for &T {
    type Fitted = T::Fitted;

    fn fit(
        &self,
        features: &FeatureMatrix,
        labels: &[u32],
        params: &Assignment,
    ) -> Result<Self::Fitted, TrainingError> {
        (**self).fit(features, labels, params)
    }
}
