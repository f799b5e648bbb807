//! Booster hyperparameters, read from an [`Assignment`].

use crate::domain::{Assignment, ParamValue};
use crate::model::TrainingError;

pub const SOFTMAX_OBJECTIVE: &str = "multi:softmax";

#[derive(Debug, Clone, PartialEq)]
pub struct BoosterParams {
    pub num_class: u32,
    pub seed: u64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// Minimum loss reduction required to split.
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub learning_rate: f64,
    pub n_estimators: usize,
    pub reg_lambda: f64,
}

impl BoosterParams {
    /// `num_class` is required. Every other name falls back to the XGBoost
    /// default; unrecognized names are rejected.
    pub fn from_assignment(assignment: &Assignment) -> Result<Self, TrainingError> {
        let mut num_class = None;
        let mut params = Self {
            num_class: 0,
            seed: 0,
            max_depth: 6,
            min_child_weight: 1.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            learning_rate: 0.3,
            n_estimators: 100,
            reg_lambda: 1.0,
        };

        for (name, value) in assignment.iter() {
            let name = name.as_str();
            match name {
                "objective" => {
                    if value.as_str() != Some(SOFTMAX_OBJECTIVE) {
                        return Err(TrainingError::invalid(
                            name,
                            value,
                            format!("only \"{SOFTMAX_OBJECTIVE}\" is supported"),
                        ));
                    }
                }
                "num_class" => {
                    let k = int_at_least(name, value, 2)?;
                    let k = u32::try_from(k)
                        .map_err(|_| TrainingError::invalid(name, value, "too many classes"))?;
                    num_class = Some(k);
                }
                "seed" => params.seed = int_at_least(name, value, 0)? as u64,
                "max_depth" => params.max_depth = int_at_least(name, value, 1)? as usize,
                "n_estimators" => params.n_estimators = int_at_least(name, value, 1)? as usize,
                "min_child_weight" => params.min_child_weight = non_negative(name, value)?,
                "gamma" => params.gamma = non_negative(name, value)?,
                "reg_lambda" => params.reg_lambda = non_negative(name, value)?,
                "learning_rate" | "eta" => params.learning_rate = non_negative(name, value)?,
                "subsample" => params.subsample = unit_fraction(name, value)?,
                "colsample_bytree" => params.colsample_bytree = unit_fraction(name, value)?,
                other => return Err(TrainingError::UnknownParameter(other.to_string())),
            }
        }

        params.num_class =
            num_class.ok_or_else(|| TrainingError::MissingParameter("num_class".into()))?;
        Ok(params)
    }
}

fn int_at_least(name: &str, value: &ParamValue, min: i64) -> Result<i64, TrainingError> {
    match value.as_i64() {
        Some(v) if v >= min => Ok(v),
        Some(_) => Err(TrainingError::invalid(name, value, format!("must be >= {min}"))),
        None => Err(TrainingError::invalid(name, value, "expected an integer")),
    }
}

fn number(name: &str, value: &ParamValue) -> Result<f64, TrainingError> {
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(TrainingError::invalid(name, value, "expected a finite number")),
    }
}

fn non_negative(name: &str, value: &ParamValue) -> Result<f64, TrainingError> {
    let v = number(name, value)?;
    if v < 0.0 {
        return Err(TrainingError::invalid(name, value, "must be >= 0"));
    }
    Ok(v)
}

fn unit_fraction(name: &str, value: &ParamValue) -> Result<f64, TrainingError> {
    let v = number(name, value)?;
    if !(v > 0.0 && v <= 1.0) {
        return Err(TrainingError::invalid(name, value, "must be in (0, 1]"));
    }
    Ok(v)
}
