//! Staging controller: one budgeted search per stage, in order.
//!
//! The split is computed once. Each stage builds its space over the running
//! configuration, searches it, and folds the winning values of the dimensions
//! it declared back into the running configuration before the next stage
//! starts. Stages are never revisited.

use chrono::Utc;
use tracing::{info, warn};

use qtune_core::{
    split_tail, Assignment, Dataset, Dimension, RunningConfig, SpaceBuilder, StageOptimizer,
    StageResult, TpeConfig, TrainableModel, Trial,
};

use crate::error::TuneError;
use crate::objective::ObjectiveEvaluator;
use crate::report::TuneReport;

// ─── Plan ───────────────────────────────────────────────────────────

/// One stage: a name, an evaluation budget and the dimensions it opens.
#[derive(Debug, Clone, PartialEq)]
pub struct StagePlan {
    pub name: String,
    pub budget: usize,
    pub dimensions: Vec<(String, Dimension)>,
}

/// Everything a run needs apart from the data and the model.
#[derive(Debug, Clone, PartialEq)]
pub struct TunePlan {
    pub validation_fraction: f64,
    /// Global fixed dimensions seeding the running configuration.
    pub fixed: Assignment,
    pub search: TpeConfig,
    pub stages: Vec<StagePlan>,
}

impl TunePlan {
    /// Total evaluations across all stages.
    pub fn total_budget(&self) -> usize {
        self.stages.iter().map(|s| s.budget).sum()
    }
}

// ─── Observer ───────────────────────────────────────────────────────

/// Progress callbacks for a tuning run. Every method defaults to a no-op.
pub trait TuneObserver {
    fn on_stage_start(&mut self, _index: usize, _stage: &StagePlan) {}
    fn on_trial(&mut self, _stage_index: usize, _stage_name: &str, _trial: &Trial) {}
    fn on_stage_complete(&mut self, _result: &StageResult, _running: &RunningConfig) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl TuneObserver for NoopObserver {}

impl<T: TuneObserver> TuneObserver for Option<T> {
    fn on_stage_start(&mut self, index: usize, stage: &StagePlan) {
        if let Some(inner) = self {
            inner.on_stage_start(index, stage);
        }
    }

    fn on_trial(&mut self, stage_index: usize, stage_name: &str, trial: &Trial) {
        if let Some(inner) = self {
            inner.on_trial(stage_index, stage_name, trial);
        }
    }

    fn on_stage_complete(&mut self, result: &StageResult, running: &RunningConfig) {
        if let Some(inner) = self {
            inner.on_stage_complete(result, running);
        }
    }
}

// ─── Controller ─────────────────────────────────────────────────────

pub struct StagingController<M> {
    model: M,
    plan: TunePlan,
}

impl<M: TrainableModel> StagingController<M> {
    pub fn new(model: M, plan: TunePlan) -> Self {
        Self { model, plan }
    }

    pub fn plan(&self) -> &TunePlan {
        &self.plan
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Run every stage against `data` (already in its final row order).
    pub fn run(
        &self,
        data: &Dataset,
        observer: &mut dyn TuneObserver,
    ) -> Result<TuneReport, TuneError> {
        let started_at = Utc::now();
        let split = split_tail(data, self.plan.validation_fraction)?;
        let mut evaluator = ObjectiveEvaluator::new(&self.model, &split)?;

        let mut running = RunningConfig::with_fixed(self.plan.fixed.clone());
        let master_seed = running.seed().ok_or(TuneError::MissingSeed)?;
        let optimizer = StageOptimizer::new(self.plan.search.clone(), master_seed);

        info!(
            rows = data.len(),
            train = split.train.len(),
            validation = split.validation.len(),
            stages = self.plan.stages.len(),
            budget = self.plan.total_budget(),
            "tuning started"
        );

        let mut stages = Vec::with_capacity(self.plan.stages.len());
        for (index, stage) in self.plan.stages.iter().enumerate() {
            observer.on_stage_start(index, stage);
            info!(stage = index, name = %stage.name, budget = stage.budget, "stage started");

            let mut builder = SpaceBuilder::new();
            for (name, dimension) in &stage.dimensions {
                builder
                    .declare(name.clone(), dimension.clone())
                    .map_err(|e| TuneError::stage(index, &stage.name, e))?;
            }
            let space = builder
                .build(&running)
                .map_err(|e| TuneError::stage(index, &stage.name, e))?;

            let stage_key = format!("{index}:{}", stage.name);
            let outcome = optimizer
                .optimize_with_observer(&stage_key, &space, &mut evaluator, stage.budget, |t| {
                    observer.on_trial(index, &stage.name, t)
                })
                .map_err(|e| TuneError::stage(index, &stage.name, e))?;

            let resolved: Assignment = stage
                .dimensions
                .iter()
                .filter_map(|(name, _)| {
                    outcome
                        .best
                        .assignment
                        .get(name)
                        .map(|v| (name.clone(), v.clone()))
                })
                .collect();
            running.absorb(&resolved);

            let result = StageResult {
                stage_index: index,
                stage_name: stage.name.clone(),
                best: outcome.best,
                evaluations: outcome.evaluations,
                resolved,
            };
            info!(
                stage = index,
                name = %stage.name,
                best_loss = result.best.loss,
                best_trial = result.best.index,
                "stage complete"
            );
            observer.on_stage_complete(&result, &running);
            stages.push(result);
        }

        if evaluator.evaluations() != self.plan.total_budget() {
            warn!(
                expected = self.plan.total_budget(),
                actual = evaluator.evaluations(),
                "evaluation count differs from the planned budget"
            );
        }

        Ok(TuneReport {
            final_config: running.into_assignment(),
            total_evaluations: evaluator.evaluations(),
            stages,
            dataset_hash: data.content_hash(),
            train_rows: split.train.len(),
            validation_rows: split.validation.len(),
            started_at,
            finished_at: Utc::now(),
            validation: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtune_core::{FeatureMatrix, FittedModel, ParamValue, TrainingError};

    /// Accuracy depends only on how close `x` is to 0.7; training ignores data.
    struct Bowl;
    struct BowlFit(f64);

    impl TrainableModel for Bowl {
        type Fitted = BowlFit;
        fn fit(&self, _: &FeatureMatrix, _: &[u32], p: &Assignment) -> Result<BowlFit, TrainingError> {
            Ok(BowlFit(p.get("x").and_then(ParamValue::as_f64).unwrap_or(0.0)))
        }
    }

    impl FittedModel for BowlFit {
        fn predict(&self, features: &FeatureMatrix) -> Result<Vec<u32>, TrainingError> {
            // predict label 1 for the first `k` rows, 0 otherwise
            let n = features.n_rows();
            let k = ((1.0 - (self.0 - 0.7).abs()) * n as f64).round() as usize;
            Ok((0..n).map(|i| u32::from(i < k)).collect())
        }
    }

    fn ones(n: usize) -> Dataset {
        Dataset::new(
            vec!["f".into()],
            (0..n).map(|i| i.to_string()).collect(),
            FeatureMatrix::from_rows(1, &vec![vec![0.0]; n]).unwrap(),
            vec![1; n],
        )
        .unwrap()
    }

    fn plan(stages: Vec<StagePlan>) -> TunePlan {
        TunePlan {
            validation_fraction: 0.2,
            fixed: [("seed".to_string(), ParamValue::Int(123))].into_iter().collect(),
            search: TpeConfig::default(),
            stages,
        }
    }

    #[derive(Default)]
    struct Recorder {
        starts: Vec<usize>,
        trials: usize,
        completes: Vec<(usize, usize)>,
    }

    impl TuneObserver for Recorder {
        fn on_stage_start(&mut self, index: usize, _: &StagePlan) {
            self.starts.push(index);
        }
        fn on_trial(&mut self, _: usize, _: &str, _: &Trial) {
            self.trials += 1;
        }
        fn on_stage_complete(&mut self, result: &StageResult, running: &RunningConfig) {
            self.completes.push((result.stage_index, running.len()));
        }
    }

    #[test]
    fn stages_run_in_order_and_spend_their_budgets() {
        let controller = StagingController::new(
            Bowl,
            plan(vec![
                StagePlan {
                    name: "x".into(),
                    budget: 15,
                    dimensions: vec![("x".into(), Dimension::Continuous { low: 0.0, high: 1.0 })],
                },
                StagePlan {
                    name: "pin".into(),
                    budget: 2,
                    dimensions: vec![("y".into(), Dimension::Fixed { value: ParamValue::Int(4) })],
                },
            ]),
        );
        let mut recorder = Recorder::default();
        let report = controller.run(&ones(50), &mut recorder).unwrap();

        assert_eq!(report.total_evaluations, 17);
        assert_eq!(recorder.trials, 17);
        assert_eq!(recorder.starts, vec![0, 1]);
        // seed + x after stage 0, then + y
        assert_eq!(recorder.completes, vec![(0, 2), (1, 3)]);
        assert!(report.final_config.contains("x"));
        assert_eq!(report.final_config.get("y"), Some(&ParamValue::Int(4)));
        assert_eq!(report.train_rows, 40);
        assert_eq!(report.validation_rows, 10);
    }

    #[test]
    fn missing_seed_is_rejected() {
        let mut p = plan(vec![]);
        p.fixed = Assignment::new();
        let err = StagingController::new(Bowl, p)
            .run(&ones(10), &mut NoopObserver)
            .unwrap_err();
        assert_eq!(err, TuneError::MissingSeed);
    }

    #[test]
    fn none_observer_is_a_noop() {
        let controller = StagingController::new(
            Bowl,
            plan(vec![StagePlan {
                name: "x".into(),
                budget: 3,
                dimensions: vec![("x".into(), Dimension::Continuous { low: 0.0, high: 1.0 })],
            }]),
        );
        let mut observer: Option<Recorder> = None;
        assert!(controller.run(&ones(10), &mut observer).is_ok());
    }
}
