//! Errors surfaced by a tuning run.

use thiserror::Error;

use qtune_core::{SearchError, SpaceError, SplitError, TrainingError};

use crate::objective::EvaluatorError;

/// A failure inside one stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    #[error(transparent)]
    Space(#[from] SpaceError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuneError {
    #[error("split error: {0}")]
    Split(#[from] SplitError),

    #[error("evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error("fixed dimension 'seed' must be a non-negative integer")]
    MissingSeed,

    /// The message carries the whole cause, so it is not chained again.
    #[error("stage {index} ('{name}') failed: {cause}")]
    Stage {
        index: usize,
        name: String,
        cause: StageError,
    },

    #[error("final scoring failed: {0}")]
    Scoring(#[source] TrainingError),
}

impl TuneError {
    pub(crate) fn stage(index: usize, name: &str, cause: impl Into<StageError>) -> Self {
        TuneError::Stage {
            index,
            name: name.to_string(),
            cause: cause.into(),
        }
    }
}
