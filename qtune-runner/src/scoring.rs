//! Final validation scoring of a resolved configuration.
//!
//! Runs outside every stage budget: one refit on the training rows, one
//! prediction pass over the validation rows.

use tracing::info;

use qtune_core::metrics::ClassificationReport;
use qtune_core::{split_tail, Assignment, Dataset, TrainableModel};

use crate::error::TuneError;
use crate::objective::ObjectiveEvaluator;
use crate::report::TuneReport;

/// Per-class confusion scores of `config` on the validation split of `data`.
pub fn score_configuration<M: TrainableModel>(
    model: &M,
    data: &Dataset,
    validation_fraction: f64,
    config: &Assignment,
) -> Result<ClassificationReport, TuneError> {
    let split = split_tail(data, validation_fraction)?;
    let evaluator = ObjectiveEvaluator::new(model, &split)?;
    let predicted = evaluator
        .validation_predictions(config)
        .map_err(TuneError::Scoring)?;

    let truth = split.validation.labels();
    let num_class = config
        .get("num_class")
        .and_then(|v| v.as_i64())
        .and_then(|k| u32::try_from(k).ok())
        .unwrap_or_else(|| data.observed_classes())
        .max(data.observed_classes());

    let report = ClassificationReport::from_predictions(truth, &predicted, num_class);
    info!(
        accuracy = report.accuracy,
        macro_f1 = report.macro_f1(),
        rows = report.rows,
        "validation scored"
    );
    Ok(report)
}

/// Score the report's final configuration and attach the result.
pub fn score_report<M: TrainableModel>(
    model: &M,
    data: &Dataset,
    validation_fraction: f64,
    report: &mut TuneReport,
) -> Result<(), TuneError> {
    let scores = score_configuration(model, data, validation_fraction, &report.final_config)?;
    report.validation = Some(scores);
    Ok(())
}
