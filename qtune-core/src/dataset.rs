//! Labeled tabular data held in memory.

use std::cmp::Ordering;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("row {row} has {found} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("column count mismatch: {what} has {found} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("feature value at row {row}, column '{column}' is not finite")]
    NonFinite { row: usize, column: String },
}

/// Row-major matrix of numeric features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    n_rows: usize,
    n_cols: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    /// An empty matrix with a fixed column count.
    pub fn with_columns(n_cols: usize) -> Self {
        Self {
            n_rows: 0,
            n_cols,
            values: Vec::new(),
        }
    }

    pub fn from_rows(n_cols: usize, rows: &[Vec<f64>]) -> Result<Self, DatasetError> {
        let mut m = Self::with_columns(n_cols);
        m.values.reserve(rows.len() * n_cols);
        for row in rows {
            m.push_row(row)?;
        }
        Ok(m)
    }

    pub fn push_row(&mut self, row: &[f64]) -> Result<(), DatasetError> {
        if row.len() != self.n_cols {
            return Err(DatasetError::RaggedRow {
                row: self.n_rows,
                expected: self.n_cols,
                found: row.len(),
            });
        }
        self.values.extend_from_slice(row);
        self.n_rows += 1;
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n_cols..(i + 1) * self.n_cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.n_cols + col]
    }

    /// Copy the given rows, in the given order, into a new matrix.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut values = Vec::with_capacity(rows.len() * self.n_cols);
        for &r in rows {
            values.extend_from_slice(self.row(r));
        }
        Self {
            n_rows: rows.len(),
            n_cols: self.n_cols,
            values,
        }
    }

    fn slice_rows(&self, range: Range<usize>) -> Self {
        Self {
            n_rows: range.len(),
            n_cols: self.n_cols,
            values: self.values[range.start * self.n_cols..range.end * self.n_cols].to_vec(),
        }
    }
}

/// An ordered, labeled dataset.
///
/// Group ids only drive ordering; they never reach the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    feature_names: Vec<String>,
    group_ids: Vec<String>,
    features: FeatureMatrix,
    labels: Vec<u32>,
}

impl Dataset {
    pub fn new(
        feature_names: Vec<String>,
        group_ids: Vec<String>,
        features: FeatureMatrix,
        labels: Vec<u32>,
    ) -> Result<Self, DatasetError> {
        if features.n_cols() != feature_names.len() {
            return Err(DatasetError::LengthMismatch {
                what: "feature_names",
                expected: features.n_cols(),
                found: feature_names.len(),
            });
        }
        if labels.len() != features.n_rows() {
            return Err(DatasetError::LengthMismatch {
                what: "labels",
                expected: features.n_rows(),
                found: labels.len(),
            });
        }
        if group_ids.len() != features.n_rows() {
            return Err(DatasetError::LengthMismatch {
                what: "group_ids",
                expected: features.n_rows(),
                found: group_ids.len(),
            });
        }
        for row in 0..features.n_rows() {
            if let Some(col) = features.row(row).iter().position(|v| !v.is_finite()) {
                return Err(DatasetError::NonFinite {
                    row,
                    column: feature_names[col].clone(),
                });
            }
        }
        Ok(Self {
            feature_names,
            group_ids,
            features,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn group_ids(&self) -> &[String] {
        &self.group_ids
    }

    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Contiguous rows `range`, preserving order.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            group_ids: self.group_ids[range.clone()].to_vec(),
            features: self.features.slice_rows(range.clone()),
            labels: self.labels[range].to_vec(),
        }
    }

    /// Stable sort by group id.
    ///
    /// Ids compare numerically when every one parses as a number, otherwise
    /// lexicographically. Rows sharing an id keep their input order.
    pub fn sorted_by_group(&self) -> Self {
        let numeric: Option<Vec<f64>> = self
            .group_ids
            .iter()
            .map(|g| g.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect();

        let mut order: Vec<usize> = (0..self.len()).collect();
        match numeric {
            Some(keys) => order.sort_by(|&a, &b| {
                keys[a].partial_cmp(&keys[b]).unwrap_or(Ordering::Equal)
            }),
            None => order.sort_by(|&a, &b| self.group_ids[a].cmp(&self.group_ids[b])),
        }

        Self {
            feature_names: self.feature_names.clone(),
            group_ids: order.iter().map(|&i| self.group_ids[i].clone()).collect(),
            features: self.features.select_rows(&order),
            labels: order.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Highest label plus one, or 0 for an empty dataset.
    pub fn observed_classes(&self) -> u32 {
        self.labels.iter().max().map_or(0, |m| m + 1)
    }

    /// BLAKE3 hex digest over schema, labels and feature bits.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for name in &self.feature_names {
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(&(self.len() as u64).to_le_bytes());
        for &label in &self.labels {
            hasher.update(&label.to_le_bytes());
        }
        for v in &self.features.values {
            hasher.update(&v.to_bits().to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
