//! Scenario tests for the stage optimizer.
//!
//! Tests:
//! 1. Three candidates, budget 3: every candidate is tried, the best is kept
//! 2. Identical inputs produce identical results, trial index included
//! 3. A training failure mid-stage aborts the search with the trial index
//! 4. Guided search keeps searching after finding the optimum

use qtune_core::{
    Assignment, ParamValue, RunningConfig, SearchError, SearchSpace, SpaceBuilder,
    StageOptimizer, TpeConfig, TrainingError,
};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn abc_space() -> SearchSpace {
    let mut builder = SpaceBuilder::new();
    builder
        .categorical("letter", vec!["A".into(), "B".into(), "C".into()])
        .unwrap();
    let running = RunningConfig::with_fixed([("seed".to_string(), ParamValue::Int(123))]);
    builder.build(&running).unwrap()
}

fn abc_loss(a: &Assignment) -> f64 {
    match a.get("letter").and_then(ParamValue::as_str) {
        Some("A") => 0.5,
        Some("B") => 0.2,
        Some("C") => 0.8,
        other => panic!("unexpected letter {other:?}"),
    }
}

// ──────────────────────────────────────────────
// 1. Exhaustive warm-up over three candidates
// ──────────────────────────────────────────────

#[test]
fn three_candidates_three_evaluations_selects_lowest() {
    // GIVEN a categorical over [A, B, C] with losses [0.5, 0.2, 0.8]
    let space = abc_space();
    let opt = StageOptimizer::new(TpeConfig::default(), 123);
    let mut tried = Vec::new();
    let mut objective = |a: &Assignment| -> Result<f64, TrainingError> {
        tried.push(a.get("letter").cloned());
        Ok(abc_loss(a))
    };

    // WHEN the stage runs with budget 3
    let outcome = opt.optimize("0:letters", &space, &mut objective, 3).unwrap();

    // THEN every candidate was evaluated once and B wins
    assert_eq!(tried.len(), 3);
    for letter in ["A", "B", "C"] {
        assert!(tried.contains(&Some(ParamValue::from(letter))), "{letter} not tried");
    }
    assert_eq!(outcome.best.loss, 0.2);
    assert_eq!(
        outcome.best.assignment.get("letter"),
        Some(&ParamValue::from("B"))
    );
    assert_eq!(outcome.best.assignment.get("seed"), Some(&ParamValue::Int(123)));
}

// ──────────────────────────────────────────────
// 2. Determinism
// ──────────────────────────────────────────────

#[test]
fn repeated_runs_agree_on_winner_and_index() {
    let mut builder = SpaceBuilder::new();
    builder.continuous("gamma", 0.0, 1.0).unwrap();
    builder
        .categorical("max_depth", (3..10).map(ParamValue::Int).collect())
        .unwrap();
    let space = builder.build(&RunningConfig::default()).unwrap();

    let run = || {
        let opt = StageOptimizer::new(TpeConfig::default(), 7);
        let mut objective = |a: &Assignment| -> Result<f64, TrainingError> {
            let g = a.get("gamma").and_then(ParamValue::as_f64).unwrap();
            let d = a.get("max_depth").and_then(ParamValue::as_i64).unwrap() as f64;
            Ok((g - 0.3).powi(2) + (d - 5.0).abs() * 0.01)
        };
        opt.optimize("1:shape", &space, &mut objective, 40).unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first.best.index, second.best.index);
    assert_eq!(first.best, second.best);
}

// ──────────────────────────────────────────────
// 3. Failure propagation
// ──────────────────────────────────────────────

#[test]
fn training_error_on_trial_two_aborts_the_stage() {
    // GIVEN an objective that fails on the third evaluation (index 2)
    let space = abc_space();
    let opt = StageOptimizer::new(TpeConfig::default(), 1);
    let mut calls = 0;
    let mut objective = |a: &Assignment| -> Result<f64, TrainingError> {
        calls += 1;
        if calls == 3 {
            return Err(TrainingError::Fit("diverged".into()));
        }
        Ok(abc_loss(a))
    };

    // WHEN the stage runs with budget 5
    let err = opt
        .optimize("0:letters", &space, &mut objective, 5)
        .unwrap_err();

    // THEN no further trials run and the error names trial 2
    assert_eq!(calls, 3);
    assert_eq!(
        err,
        SearchError::Training {
            trial: 2,
            source: TrainingError::Fit("diverged".into()),
        }
    );
}

// ──────────────────────────────────────────────
// 4. No early stopping
// ──────────────────────────────────────────────

#[test]
fn optimum_on_first_trial_still_spends_budget() {
    let space = abc_space();
    let opt = StageOptimizer::new(TpeConfig::default(), 5);
    let mut calls = 0;
    let mut objective = |_: &Assignment| -> Result<f64, TrainingError> {
        calls += 1;
        Ok(if calls == 1 { -1.0 } else { 0.0 })
    };
    let outcome = opt.optimize("0:letters", &space, &mut objective, 30).unwrap();
    assert_eq!(calls, 30);
    assert_eq!(outcome.best.index, 0);
    assert_eq!(outcome.best.loss, -1.0);
}
