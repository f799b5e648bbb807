//! Budgeted surrogate-guided search over one stage's space.
//!
//! The optimizer is a tree-structured Parzen estimator: after an exploratory
//! warm-up it splits the observed trials into a good and a bad set, fits one
//! density per set per open dimension, and proposes the candidate with the
//! highest good/bad density ratio.

pub mod parzen;
mod tpe;
mod warmup;

pub use tpe::StageOptimizer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Assignment, Trial};
use crate::model::TrainingError;

/// Anything that maps an assignment to a loss (lower is better).
pub trait Objective {
    fn evaluate(&mut self, assignment: &Assignment) -> Result<f64, TrainingError>;
}

impl<F> Objective for F
where
    F: FnMut(&Assignment) -> Result<f64, TrainingError>,
{
    fn evaluate(&mut self, assignment: &Assignment) -> Result<f64, TrainingError> {
        self(assignment)
    }
}

/// How the first, model-free trials of a stage are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupStrategy {
    /// Categoricals cycle through seeded permutations of their candidates;
    /// continuous ranges are covered one equal-width stratum per trial.
    #[default]
    Stratified,
    /// Independent uniform draws.
    Random,
}

/// TPE settings shared by every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TpeConfig {
    /// Good-set quantile scale: `n_good = ceil(gamma * sqrt(n))`.
    pub gamma: f64,
    /// Warm-up trials per stage before any density model is fit.
    pub n_startup: usize,
    /// Candidates drawn from the good density per proposal.
    pub n_candidates: usize,
    /// Weight of the prior component in every density.
    pub prior_weight: f64,
    pub warmup: WarmupStrategy,
}

impl Default for TpeConfig {
    fn default() -> Self {
        Self {
            gamma: 0.25,
            n_startup: 20,
            n_candidates: 24,
            prior_weight: 1.0,
            warmup: WarmupStrategy::Stratified,
        }
    }
}

impl TpeConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(SearchError::InvalidSettings(format!(
                "gamma must be in (0, 1], got {}",
                self.gamma
            )));
        }
        if self.n_candidates == 0 {
            return Err(SearchError::InvalidSettings(
                "n_candidates must be at least 1".into(),
            ));
        }
        if !(self.prior_weight.is_finite() && self.prior_weight > 0.0) {
            return Err(SearchError::InvalidSettings(format!(
                "prior_weight must be positive, got {}",
                self.prior_weight
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("evaluation budget must be positive")]
    ZeroBudget,

    #[error("invalid search settings: {0}")]
    InvalidSettings(String),

    #[error("trial {trial} failed to train: {source}")]
    Training {
        trial: usize,
        #[source]
        source: TrainingError,
    },

    #[error("trial {trial} returned non-finite loss {loss}")]
    NonFiniteLoss { trial: usize, loss: f64 },
}

/// Result of one budgeted search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Lowest-loss trial; ties go to the earliest.
    pub best: Trial,
    pub evaluations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_validate() {
        assert!(TpeConfig::default().validate().is_ok());
    }

    #[test]
    fn bad_settings_are_rejected() {
        let mut cfg = TpeConfig {
            gamma: 0.0,
            ..TpeConfig::default()
        };
        assert!(cfg.validate().is_err());
        cfg.gamma = 0.25;
        cfg.n_candidates = 0;
        assert!(cfg.validate().is_err());
        cfg.n_candidates = 24;
        cfg.prior_weight = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let cfg: TpeConfig = serde_json::from_str(r#"{"n_startup": 5, "warmup": "random"}"#).unwrap();
        assert_eq!(cfg.n_startup, 5);
        assert_eq!(cfg.warmup, WarmupStrategy::Random);
        assert_eq!(cfg.gamma, 0.25);
    }

    #[test]
    fn closures_are_objectives() {
        let mut calls = 0;
        let mut objective = |_: &Assignment| -> Result<f64, TrainingError> {
            calls += 1;
            Ok(1.0)
        };
        assert_eq!(objective.evaluate(&Assignment::new()), Ok(1.0));
        assert_eq!(calls, 1);
    }
}
