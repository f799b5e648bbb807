//! Native multi-class gradient-boosted trees.
//!
//! Second-order boosting with a softmax objective, one tree per class per
//! round:
//! - gradient `p - y`, hessian `max(2p(1 - p), 1e-16)`
//! - leaf weight `-G / (H + lambda)`
//! - split gain `0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - G²/(H+λ)]`, accepted above `gamma`
//! - rows subsampled per round, columns per tree, both from the `seed` parameter

pub mod params;
mod tree;

pub use params::BoosterParams;
pub use tree::TreeNode;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::dataset::FeatureMatrix;
use crate::domain::Assignment;
use crate::model::{FittedModel, TrainableModel, TrainingError};
use tree::{TreeBuilder, TreeParams};

const BASE_SCORE: f64 = 0.5;
const MIN_HESSIAN: f64 = 1e-16;

/// The gradient-boosting model family.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradientBooster;

impl TrainableModel for GradientBooster {
    type Fitted = BoostedForest;

    fn fit(
        &self,
        features: &FeatureMatrix,
        labels: &[u32],
        params: &Assignment,
    ) -> Result<BoostedForest, TrainingError> {
        let params = BoosterParams::from_assignment(params)?;
        let n = features.n_rows();
        if n == 0 {
            return Err(TrainingError::EmptyTrainingSet);
        }
        if labels.len() != n {
            return Err(TrainingError::Fit(format!(
                "{} labels for {n} rows",
                labels.len()
            )));
        }
        let k = params.num_class as usize;
        if let Some((row, &label)) = labels.iter().enumerate().find(|(_, &l)| l >= params.num_class) {
            return Err(TrainingError::LabelOutOfRange {
                row,
                label,
                num_class: params.num_class,
            });
        }

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_child_weight: params.min_child_weight,
            gamma: params.gamma,
            reg_lambda: params.reg_lambda,
        };
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut margins = vec![BASE_SCORE; n * k];
        let mut probs = vec![0.0; n * k];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut rounds: Vec<Vec<TreeNode>> = Vec::with_capacity(params.n_estimators);

        for round in 0..params.n_estimators {
            for i in 0..n {
                softmax(&margins[i * k..(i + 1) * k], &mut probs[i * k..(i + 1) * k]);
            }
            let rows = sample_indices(&mut rng, n, params.subsample);

            let mut trees = Vec::with_capacity(k);
            for class in 0..k {
                for i in 0..n {
                    let p = probs[i * k + class];
                    let y = if labels[i] as usize == class { 1.0 } else { 0.0 };
                    grad[i] = p - y;
                    hess[i] = (2.0 * p * (1.0 - p)).max(MIN_HESSIAN);
                }
                let columns = sample_indices(&mut rng, features.n_cols(), params.colsample_bytree);
                let tree = TreeBuilder {
                    features,
                    grad: &grad,
                    hess: &hess,
                    columns: &columns,
                    params: tree_params,
                }
                .build(&rows);

                for i in 0..n {
                    margins[i * k + class] += params.learning_rate * tree.predict(features.row(i));
                }
                trees.push(tree);
            }
            trace!(round, rows = rows.len(), "boosting round");
            rounds.push(trees);
        }

        Ok(BoostedForest {
            num_class: params.num_class,
            n_features: features.n_cols(),
            learning_rate: params.learning_rate,
            rounds,
        })
    }
}

/// A fitted ensemble: `rounds[r][class]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedForest {
    num_class: u32,
    n_features: usize,
    learning_rate: f64,
    rounds: Vec<Vec<TreeNode>>,
}

impl BoostedForest {
    pub fn num_class(&self) -> u32 {
        self.num_class
    }

    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Raw per-class scores for one row.
    pub fn margins(&self, row: &[f64]) -> Vec<f64> {
        let mut out = vec![BASE_SCORE; self.num_class as usize];
        for trees in &self.rounds {
            for (class, tree) in trees.iter().enumerate() {
                out[class] += self.learning_rate * tree.predict(row);
            }
        }
        out
    }

    pub fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f64>>, TrainingError> {
        self.check_width(features)?;
        Ok((0..features.n_rows())
            .map(|i| {
                let m = self.margins(features.row(i));
                let mut p = vec![0.0; m.len()];
                softmax(&m, &mut p);
                p
            })
            .collect())
    }

    fn check_width(&self, features: &FeatureMatrix) -> Result<(), TrainingError> {
        if features.n_cols() != self.n_features {
            return Err(TrainingError::FeatureMismatch {
                expected: self.n_features,
                found: features.n_cols(),
            });
        }
        Ok(())
    }
}

impl FittedModel for BoostedForest {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<u32>, TrainingError> {
        self.check_width(features)?;
        Ok((0..features.n_rows())
            .map(|i| argmax(&self.margins(features.row(i))) as u32)
            .collect())
    }
}

fn softmax(margins: &[f64], out: &mut [f64]) {
    let max = margins.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for (o, &m) in out.iter_mut().zip(margins) {
        *o = (m - max).exp();
        total += *o;
    }
    for o in out.iter_mut() {
        *o /= total;
    }
}

/// Index of the first maximum.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Sorted random subset of `0..n` of size `ceil(n * ratio)`.
fn sample_indices(rng: &mut StdRng, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64 * ratio).ceil() as usize).clamp(1.min(n), n);
    let mut picked = rand::seq::index::sample(rng, n, k).into_vec();
    picked.sort_unstable();
    picked
}
