//! Classification metrics.

use serde::{Deserialize, Serialize};

/// Fraction of positions where `truth` and `predicted` agree.
///
/// Returns 0.0 for empty input. Both slices must have equal length; extra
/// entries in the longer one are ignored.
pub fn accuracy(truth: &[u32], predicted: &[u32]) -> f64 {
    let n = truth.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let hits = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    hits as f64 / n as f64
}

/// One-vs-rest confusion counts for a single class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: u64,
    pub tn: u64,
    pub fp: u64,
    pub fn_: u64,
}

impl ConfusionMatrix {
    pub fn for_class(class: u32, truth: &[u32], predicted: &[u32]) -> Self {
        let mut m = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t == class, p == class) {
                (true, true) => m.tp += 1,
                (false, false) => m.tn += 1,
                (false, true) => m.fp += 1,
                (true, false) => m.fn_ += 1,
            }
        }
        m
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Rows whose true label is this class.
    pub fn support(&self) -> u64 {
        self.tp + self.fn_
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    pub class: u32,
    pub confusion: ConfusionMatrix,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Accuracy plus per-class scores over a labeled prediction set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub rows: usize,
    pub classes: Vec<ClassScore>,
}

impl ClassificationReport {
    pub fn from_predictions(truth: &[u32], predicted: &[u32], num_class: u32) -> Self {
        let classes = (0..num_class)
            .map(|class| {
                let confusion = ConfusionMatrix::for_class(class, truth, predicted);
                ClassScore {
                    class,
                    precision: confusion.precision(),
                    recall: confusion.recall(),
                    f1: confusion.f1(),
                    support: confusion.support(),
                    confusion,
                }
            })
            .collect();
        Self {
            accuracy: accuracy(truth, predicted),
            rows: truth.len().min(predicted.len()),
            classes,
        }
    }

    /// Unweighted mean F1 across classes.
    pub fn macro_f1(&self) -> f64 {
        if self.classes.is_empty() {
            return 0.0;
        }
        self.classes.iter().map(|c| c.f1).sum::<f64>() / self.classes.len() as f64
    }
}
