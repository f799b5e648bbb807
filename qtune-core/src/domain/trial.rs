//! Trials and per-stage results.

use serde::{Deserialize, Serialize};

use super::param::Assignment;

/// One evaluated assignment.
///
/// `index` is the 0-based evaluation order within the stage; it doubles as
/// the tie-breaker when two trials report the same loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub index: usize,
    pub assignment: Assignment,
    pub loss: f64,
}

impl Trial {
    /// True when `self` should replace `other` as the best trial so far:
    /// strictly lower loss, or equal loss found earlier.
    pub fn beats(&self, other: &Trial) -> bool {
        self.loss < other.loss || (self.loss == other.loss && self.index < other.index)
    }
}

/// The winning trial of one completed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_index: usize,
    pub stage_name: String,
    /// Lowest-loss trial observed during the stage.
    pub best: Trial,
    /// Number of objective evaluations the stage spent.
    pub evaluations: usize,
    /// Winning values of the dimensions this stage opened.
    pub resolved: Assignment,
}
