//! Search-space construction.
//!
//! A stage declares its own dimensions on a [`SpaceBuilder`]; `build()` layers
//! those declarations over the [`RunningConfig`], whose resolved values become
//! fixed dimensions. A resolved name can never be reopened as a categorical or
//! continuous dimension, so the search only ever narrows across stages.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::ParamValue;
use crate::running::RunningConfig;

/// One dimension of a search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dimension {
    /// A constant, never searched.
    Fixed { value: ParamValue },
    /// Ordered candidates, selected by index.
    Categorical { choices: Vec<ParamValue> },
    /// Closed interval `[low, high]`, sampled continuously.
    Continuous { low: f64, high: f64 },
}

impl Dimension {
    pub fn kind(&self) -> DimensionKind {
        match self {
            Dimension::Fixed { .. } => DimensionKind::Fixed,
            Dimension::Categorical { .. } => DimensionKind::Categorical,
            Dimension::Continuous { .. } => DimensionKind::Continuous,
        }
    }

    /// Whether the optimizer has to choose a value for this dimension.
    pub fn is_open(&self) -> bool {
        !matches!(self, Dimension::Fixed { .. })
    }

    fn validate(&self, name: &str) -> Result<(), SpaceError> {
        match self {
            Dimension::Fixed { .. } => Ok(()),
            Dimension::Categorical { choices } if choices.is_empty() => {
                Err(SpaceError::EmptyChoices {
                    name: name.to_string(),
                })
            }
            Dimension::Categorical { .. } => Ok(()),
            Dimension::Continuous { low, high } => {
                if low.is_finite() && high.is_finite() && low < high {
                    Ok(())
                } else {
                    Err(SpaceError::InvalidRange {
                        name: name.to_string(),
                        low: *low,
                        high: *high,
                    })
                }
            }
        }
    }
}

/// Kind tag of a [`Dimension`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    Fixed,
    Categorical,
    Continuous,
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DimensionKind::Fixed => "fixed",
            DimensionKind::Categorical => "categorical",
            DimensionKind::Continuous => "continuous",
        };
        f.write_str(s)
    }
}

/// Errors from search-space construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpaceError {
    #[error("dimension '{name}' is already {existing} and cannot be redeclared as {requested}")]
    DuplicateDimension {
        name: String,
        existing: DimensionKind,
        requested: DimensionKind,
    },
    #[error("categorical dimension '{name}' has no candidates")]
    EmptyChoices { name: String },
    #[error("continuous dimension '{name}' needs finite bounds with low < high, got [{low}, {high}]")]
    InvalidRange { name: String, low: f64, high: f64 },
}

/// Collects one stage's dimension declarations.
#[derive(Debug, Clone, Default)]
pub struct SpaceBuilder {
    declared: BTreeMap<String, Dimension>,
}

impl SpaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fixed(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Result<&mut Self, SpaceError> {
        self.declare(name, Dimension::Fixed { value: value.into() })
    }

    pub fn categorical(
        &mut self,
        name: impl Into<String>,
        choices: Vec<ParamValue>,
    ) -> Result<&mut Self, SpaceError> {
        self.declare(name, Dimension::Categorical { choices })
    }

    pub fn continuous(
        &mut self,
        name: impl Into<String>,
        low: f64,
        high: f64,
    ) -> Result<&mut Self, SpaceError> {
        self.declare(name, Dimension::Continuous { low, high })
    }

    /// Declare a dimension. Names are unique within a stage.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        dimension: Dimension,
    ) -> Result<&mut Self, SpaceError> {
        let name = name.into();
        dimension.validate(&name)?;
        if let Some(existing) = self.declared.get(&name) {
            return Err(SpaceError::DuplicateDimension {
                existing: existing.kind(),
                requested: dimension.kind(),
                name,
            });
        }
        self.declared.insert(name, dimension);
        Ok(self)
    }

    /// Names declared by this stage, in sorted order.
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.declared.keys().map(String::as_str)
    }

    /// Snapshot the effective search space for this stage.
    pub fn build(&self, running: &RunningConfig) -> Result<SearchSpace, SpaceError> {
        let mut dimensions: BTreeMap<String, Dimension> = running
            .iter()
            .map(|(name, value)| {
                (
                    name.clone(),
                    Dimension::Fixed {
                        value: value.clone(),
                    },
                )
            })
            .collect();

        for (name, dimension) in &self.declared {
            if let Some(resolved) = running.get(name) {
                match dimension {
                    Dimension::Fixed { value } => {
                        if value != resolved {
                            warn!(
                                dimension = %name,
                                resolved = %resolved,
                                pinned = %value,
                                "stage pins a new value over a resolved dimension"
                            );
                        }
                    }
                    _ => {
                        return Err(SpaceError::DuplicateDimension {
                            name: name.clone(),
                            existing: DimensionKind::Fixed,
                            requested: dimension.kind(),
                        });
                    }
                }
            }
            dimensions.insert(name.clone(), dimension.clone());
        }

        Ok(SearchSpace { dimensions })
    }
}

/// Immutable snapshot of every dimension visible to one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    dimensions: BTreeMap<String, Dimension>,
}

impl SearchSpace {
    pub fn get(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dimensions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Dimension)> {
        self.dimensions.iter()
    }

    /// Dimensions the optimizer must choose values for.
    pub fn open_dimensions(&self) -> impl Iterator<Item = (&String, &Dimension)> {
        self.dimensions.iter().filter(|(_, d)| d.is_open())
    }

    pub fn n_open(&self) -> usize {
        self.open_dimensions().count()
    }
}
