//! Regression trees fit to second-order gradient statistics.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::FeatureMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { weight } => return *weight,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_child_weight: f64,
    pub gamma: f64,
    pub reg_lambda: f64,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Exact greedy tree construction over one gradient/hessian pair.
pub(crate) struct TreeBuilder<'a> {
    pub features: &'a FeatureMatrix,
    pub grad: &'a [f64],
    pub hess: &'a [f64],
    /// Columns this tree may split on.
    pub columns: &'a [usize],
    pub params: TreeParams,
}

impl TreeBuilder<'_> {
    pub(crate) fn build(&self, rows: &[usize]) -> TreeNode {
        self.grow(rows, 0)
    }

    fn grow(&self, rows: &[usize], depth: usize) -> TreeNode {
        let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| self.hess[i]).sum();
        let leaf = TreeNode::Leaf {
            weight: -g / (h + self.params.reg_lambda),
        };

        if depth >= self.params.max_depth || rows.len() < 2 || h < self.params.min_child_weight {
            return leaf;
        }

        // Collected in column order, so the reduction below is independent of
        // how rayon schedules the per-column searches.
        let candidates: Vec<Option<SplitCandidate>> = self
            .columns
            .par_iter()
            .map(|&f| self.best_split_on(rows, f, g, h))
            .collect();
        let best = candidates
            .into_iter()
            .flatten()
            .fold(None::<SplitCandidate>, |acc, c| match acc {
                Some(b) if b.gain >= c.gain => Some(b),
                _ => Some(c),
            });

        match best {
            Some(split) if split.gain > self.params.gamma => {
                let (left, right): (Vec<usize>, Vec<usize>) = rows
                    .iter()
                    .partition(|&&i| self.features.get(i, split.feature) <= split.threshold);
                if left.is_empty() || right.is_empty() {
                    return leaf;
                }
                TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: Box::new(self.grow(&left, depth + 1)),
                    right: Box::new(self.grow(&right, depth + 1)),
                }
            }
            _ => leaf,
        }
    }

    fn best_split_on(&self, rows: &[usize], feature: usize, g: f64, h: f64) -> Option<SplitCandidate> {
        let mut sorted = rows.to_vec();
        sorted.sort_by(|&a, &b| {
            self.features
                .get(a, feature)
                .total_cmp(&self.features.get(b, feature))
        });

        let lambda = self.params.reg_lambda;
        let parent = g * g / (h + lambda);
        let (mut gl, mut hl) = (0.0, 0.0);
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..sorted.len() - 1 {
            let i = sorted[pos];
            gl += self.grad[i];
            hl += self.hess[i];

            let x = self.features.get(i, feature);
            let next = self.features.get(sorted[pos + 1], feature);
            if x == next {
                continue;
            }
            let (gr, hr) = (g - gl, h - hl);
            if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                continue;
            }

            let gain = 0.5 * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent);
            if best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: 0.5 * (x + next),
                    gain,
                });
            }
        }
        best
    }
}
