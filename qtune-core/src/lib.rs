//! qtune core: domain types and algorithms for staged hyperparameter search.
//!
//! - Domain types (parameter values, assignments, trials, stage results)
//! - Datasets and the positional train/validation split
//! - Per-stage search-space construction over a running configuration
//! - The trainable-model capability and a native gradient booster
//! - Budgeted TPE search with a deterministic RNG hierarchy

pub mod booster;
pub mod dataset;
pub mod domain;
pub mod metrics;
pub mod model;
pub mod rng;
pub mod running;
pub mod search;
pub mod space;
pub mod split;

pub use dataset::{Dataset, DatasetError, FeatureMatrix};
pub use domain::{Assignment, ParamValue, StageResult, Trial};
pub use model::{FittedModel, TrainableModel, TrainingError};
pub use running::RunningConfig;
pub use search::{Objective, SearchError, SearchOutcome, StageOptimizer, TpeConfig, WarmupStrategy};
pub use space::{Dimension, DimensionKind, SearchSpace, SpaceBuilder, SpaceError};
pub use split::{split_tail, Split, SplitError, DEFAULT_VALIDATION_FRACTION};
