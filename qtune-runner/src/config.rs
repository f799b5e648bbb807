//! TOML stage-plan configuration.
//!
//! A config names the data columns, the global fixed dimensions, the TPE
//! settings and an ordered list of `[[stage]]` tables. Missing top-level keys
//! fall back to [`TuneConfig::default`], which is the four-stage photon
//! classifier plan.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use qtune_core::{Dimension, ParamValue, TpeConfig, DEFAULT_VALIDATION_FRACTION};

use crate::staging::{StagePlan, TunePlan};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// CSV column roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub group_column: String,
    pub label_column: String,
    pub drop_columns: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            group_column: "dataset_id".into(),
            label_column: "label".into(),
            drop_columns: Vec::new(),
        }
    }
}

/// How a stage declares one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DimensionSpec {
    Fixed {
        value: ParamValue,
    },
    Choice {
        values: Vec<ParamValue>,
    },
    /// Half-open `start..stop` by `step`, searched as a categorical.
    IntRange {
        start: i64,
        stop: i64,
        #[serde(default = "default_step")]
        step: i64,
    },
    Uniform {
        low: f64,
        high: f64,
    },
}

fn default_step() -> i64 {
    1
}

impl DimensionSpec {
    pub fn to_dimension(&self) -> Result<Dimension, String> {
        match self {
            DimensionSpec::Fixed { value } => Ok(Dimension::Fixed {
                value: value.clone(),
            }),
            DimensionSpec::Choice { values } => {
                if values.is_empty() {
                    return Err("choice needs at least one value".into());
                }
                Ok(Dimension::Categorical {
                    choices: values.clone(),
                })
            }
            DimensionSpec::IntRange { start, stop, step } => {
                if *step <= 0 {
                    return Err(format!("int_range step must be positive, got {step}"));
                }
                if start >= stop {
                    return Err(format!("int_range {start}..{stop} is empty"));
                }
                let choices = (*start..*stop)
                    .step_by(*step as usize)
                    .map(ParamValue::Int)
                    .collect();
                Ok(Dimension::Categorical { choices })
            }
            DimensionSpec::Uniform { low, high } => {
                if !(low.is_finite() && high.is_finite() && low < high) {
                    return Err(format!("uniform needs low < high, got [{low}, {high}]"));
                }
                Ok(Dimension::Continuous {
                    low: *low,
                    high: *high,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionConfig {
    pub name: String,
    #[serde(flatten)]
    pub spec: DimensionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    pub name: String,
    pub budget: usize,
    #[serde(default)]
    pub dimensions: Vec<DimensionConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TuneConfig {
    pub validation_fraction: f64,
    pub data: DataConfig,
    pub fixed: BTreeMap<String, ParamValue>,
    pub search: TpeConfig,
    #[serde(rename = "stage")]
    pub stages: Vec<StageConfig>,
}

impl Default for TuneConfig {
    fn default() -> Self {
        let fixed = [
            ("objective", ParamValue::from("multi:softmax")),
            ("num_class", ParamValue::Int(3)),
            ("seed", ParamValue::Int(123)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let stage = |name: &str, dimensions: Vec<(&str, DimensionSpec)>| StageConfig {
            name: name.to_string(),
            budget: 100,
            dimensions: dimensions
                .into_iter()
                .map(|(n, spec)| DimensionConfig {
                    name: n.to_string(),
                    spec,
                })
                .collect(),
        };
        let ints = |start, stop, step| DimensionSpec::IntRange { start, stop, step };
        let uniform = |low, high| DimensionSpec::Uniform { low, high };

        Self {
            validation_fraction: DEFAULT_VALIDATION_FRACTION,
            data: DataConfig::default(),
            fixed,
            search: TpeConfig::default(),
            stages: vec![
                stage(
                    "tree_shape",
                    vec![("max_depth", ints(3, 10, 1)), ("min_child_weight", ints(1, 6, 1))],
                ),
                stage("split_penalty", vec![("gamma", uniform(0.0, 1.0))]),
                stage(
                    "sampling",
                    vec![
                        ("subsample", uniform(0.5, 1.0)),
                        ("colsample_bytree", uniform(0.5, 1.0)),
                    ],
                ),
                stage(
                    "learning",
                    vec![
                        ("learning_rate", uniform(0.0, 1.0)),
                        ("n_estimators", ints(50, 150, 10)),
                    ],
                ),
            ],
        }
    }
}

impl TuneConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let f = self.validation_fraction;
        if !(f > 0.0 && f < 1.0) {
            return invalid(format!("validation_fraction must be in (0, 1), got {f}"));
        }
        if let Err(e) = self.search.validate() {
            return invalid(e.to_string());
        }
        if self.stages.is_empty() {
            return invalid("at least one [[stage]] is required".into());
        }

        let mut names = BTreeSet::new();
        for stage in &self.stages {
            if !names.insert(stage.name.as_str()) {
                return invalid(format!("duplicate stage name '{}'", stage.name));
            }
            if stage.budget == 0 {
                return invalid(format!("stage '{}' has a zero budget", stage.name));
            }
            for dim in &stage.dimensions {
                if let Err(msg) = dim.spec.to_dimension() {
                    return invalid(format!("stage '{}', dimension '{}': {msg}", stage.name, dim.name));
                }
            }
        }
        Ok(())
    }

    /// Replace every stage budget with `budget`.
    pub fn with_budget_override(mut self, budget: usize) -> Self {
        for stage in &mut self.stages {
            stage.budget = budget;
        }
        self
    }

    pub fn to_plan(&self) -> Result<TunePlan, ConfigError> {
        self.validate()?;
        let stages = self
            .stages
            .iter()
            .map(|s| -> Result<StagePlan, ConfigError> {
                let dimensions = s
                    .dimensions
                    .iter()
                    .map(|d| {
                        d.spec
                            .to_dimension()
                            .map(|dim| (d.name.clone(), dim))
                            .map_err(ConfigError::Invalid)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(StagePlan {
                    name: s.name.clone(),
                    budget: s.budget,
                    dimensions,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TunePlan {
            validation_fraction: self.validation_fraction,
            fixed: self
                .fixed
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            search: self.search.clone(),
            stages,
        })
    }
}
