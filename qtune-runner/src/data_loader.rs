//! CSV dataset loading.
//!
//! The header names every column. One column holds the group id, one the
//! class label; `drop_columns` are ignored and every remaining column is a
//! numeric feature. Rows come back stable-sorted by group id.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use qtune_core::{Dataset, DatasetError, FeatureMatrix};

use crate::config::DataConfig;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{0}' not found in header")]
    MissingColumn(String),

    #[error("row {row}, column '{column}': '{value}' is not a number")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: label '{value}' is not a non-negative class index")]
    InvalidLabel { row: usize, value: String },

    #[error("no feature columns left after removing group, label and dropped columns")]
    NoFeatures,

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// Load and sort a dataset from a CSV file.
pub fn load_csv(path: &Path, config: &DataConfig) -> Result<Dataset, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_csv(file, config)
}

/// Parse CSV from any reader, then stable-sort by group id.
pub fn read_csv<R: Read>(reader: R, config: &DataConfig) -> Result<Dataset, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };
    let group_col = position(&config.group_column)?;
    let label_col = position(&config.label_column)?;
    for dropped in &config.drop_columns {
        position(dropped)?;
    }

    let feature_cols: Vec<usize> = (0..headers.len())
        .filter(|&i| i != group_col && i != label_col)
        .filter(|&i| !config.drop_columns.iter().any(|d| d == &headers[i]))
        .collect();
    if feature_cols.is_empty() {
        return Err(LoadError::NoFeatures);
    }
    let feature_names: Vec<String> = feature_cols.iter().map(|&i| headers[i].to_string()).collect();

    let mut features = FeatureMatrix::with_columns(feature_cols.len());
    let mut labels = Vec::new();
    let mut groups = Vec::new();
    let mut row_buf = Vec::with_capacity(feature_cols.len());

    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        row_buf.clear();
        for &c in &feature_cols {
            let raw = record.get(c).unwrap_or("");
            let value: f64 = raw.parse().map_err(|_| LoadError::InvalidNumber {
                row,
                column: headers[c].to_string(),
                value: raw.to_string(),
            })?;
            row_buf.push(value);
        }
        features.push_row(&row_buf)?;

        let raw_label = record.get(label_col).unwrap_or("");
        labels.push(parse_label(raw_label).ok_or_else(|| LoadError::InvalidLabel {
            row,
            value: raw_label.to_string(),
        })?);
        groups.push(record.get(group_col).unwrap_or("").to_string());
    }

    debug!(rows = labels.len(), features = feature_names.len(), "csv parsed");
    let data = Dataset::new(feature_names, groups, features, labels)?;
    Ok(data.sorted_by_group())
}

/// Accepts `2` and `2.0`; rejects negatives, fractions and text.
fn parse_label(raw: &str) -> Option<u32> {
    if let Ok(v) = raw.parse::<u32>() {
        return Some(v);
    }
    let v: f64 = raw.parse().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}
