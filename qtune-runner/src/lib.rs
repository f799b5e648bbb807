//! qtune runner: staged tuning orchestration on top of `qtune-core`.
//!
//! This crate provides:
//! - TOML stage-plan configuration with the built-in four-stage default
//! - CSV dataset loading, stable-sorted by group id
//! - The objective evaluator (`loss = -validation accuracy`)
//! - The staging controller and its observer hooks
//! - JSONL trial history, JSON reports and final validation scoring

pub mod config;
pub mod data_loader;
pub mod error;
pub mod history;
pub mod objective;
pub mod report;
pub mod scoring;
pub mod staging;

pub use config::{ConfigError, DataConfig, DimensionConfig, DimensionSpec, StageConfig, TuneConfig};
pub use data_loader::{load_csv, read_csv, LoadError};
pub use error::{StageError, TuneError};
pub use history::{HistoryEntry, TrialHistory};
pub use objective::{EvaluatorError, ObjectiveEvaluator};
pub use report::TuneReport;
pub use scoring::{score_configuration, score_report};
pub use staging::{NoopObserver, StagePlan, StagingController, TuneObserver, TunePlan};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<TuneConfig>();
        assert_sync::<TuneConfig>();
        assert_send::<TunePlan>();
        assert_sync::<TunePlan>();
    }

    #[test]
    fn report_is_send_sync() {
        assert_send::<TuneReport>();
        assert_sync::<TuneReport>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<TuneError>();
        assert_sync::<TuneError>();
        assert_send::<LoadError>();
        assert_sync::<LoadError>();
    }
}
