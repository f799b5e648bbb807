//! Property tests for plan configuration and the trial history log.

use proptest::prelude::*;

use qtune_core::{Assignment, Dimension, ParamValue};
use qtune_runner::{DimensionSpec, HistoryEntry, TrialHistory, TuneConfig};

fn arb_entry() -> impl Strategy<Value = HistoryEntry> {
    (0usize..4, "[a-z]{1,8}", 0usize..200, -1.0f64..0.0, 1i64..12, 0.01f64..0.99).prop_map(
        |(stage_index, stage, trial, loss, depth, gamma)| {
            let mut assignment = Assignment::new();
            assignment.insert("max_depth", ParamValue::Int(depth));
            assignment.insert("gamma", ParamValue::Float(gamma));
            HistoryEntry {
                stage_index,
                stage,
                trial,
                loss,
                assignment,
            }
        },
    )
}

proptest! {
    #[test]
    fn budget_override_sets_total_budget(budget in 1usize..500) {
        let plan = TuneConfig::default().with_budget_override(budget).to_plan().unwrap();
        prop_assert_eq!(plan.total_budget(), budget * plan.stages.len());
    }

    #[test]
    fn int_range_counts_every_step(start in -20i64..20, len in 1i64..40, step in 1i64..7) {
        let spec = DimensionSpec::IntRange { start, stop: start + len, step };
        match spec.to_dimension().unwrap() {
            Dimension::Categorical { choices } => {
                prop_assert_eq!(choices.len() as i64, (len + step - 1) / step);
                prop_assert_eq!(&choices[0], &ParamValue::Int(start));
                prop_assert!(choices.iter().all(|c| c.as_i64().unwrap() < start + len));
            }
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn history_reads_back_what_was_written(entries in prop::collection::vec(arb_entry(), 0..30)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trials.jsonl");

        let mut history = TrialHistory::create(&path).unwrap();
        for entry in &entries {
            history.append(entry).unwrap();
        }
        prop_assert_eq!(history.finish().unwrap(), entries.len());
        prop_assert_eq!(TrialHistory::read_all(&path).unwrap(), entries);
    }
}
