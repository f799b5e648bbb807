//! Positional train/validation split.
//!
//! The validation subset is the tail of the (already ordered) dataset. No
//! shuffling takes place, so the split is a pure function of row order and
//! the fraction.

use thiserror::Error;

use crate::dataset::Dataset;

pub const DEFAULT_VALIDATION_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplitError {
    #[error("validation fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),
    #[error("cannot split an empty dataset")]
    EmptyDataset,
}

/// Disjoint train/validation partitions covering every input row.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Dataset,
    pub validation: Dataset,
}

/// Number of validation rows for `n` rows at fraction `fraction`.
///
/// `round(fraction * n)`, half away from zero.
pub fn validation_len(n: usize, fraction: f64) -> Result<usize, SplitError> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(SplitError::InvalidFraction(fraction));
    }
    let len = (fraction * n as f64).round() as usize;
    Ok(len.min(n))
}

/// Split off the last `round(fraction * N)` rows as validation.
pub fn split_tail(data: &Dataset, fraction: f64) -> Result<Split, SplitError> {
    let n_validation = validation_len(data.len(), fraction)?;
    if data.is_empty() {
        return Err(SplitError::EmptyDataset);
    }
    let boundary = data.len() - n_validation;
    Ok(Split {
        train: data.slice(0..boundary),
        validation: data.slice(boundary..data.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::FeatureMatrix;

    fn numbered(n: usize) -> Dataset {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        Dataset::new(
            vec!["row".into()],
            (0..n).map(|i| i.to_string()).collect(),
            FeatureMatrix::from_rows(1, &rows).unwrap(),
            vec![0; n],
        )
        .unwrap()
    }

    #[test]
    fn hundred_rows_at_point_two_keeps_last_twenty() {
        let split = split_tail(&numbered(100), 0.2).unwrap();
        assert_eq!(split.train.len(), 80);
        assert_eq!(split.validation.len(), 20);
        assert_eq!(split.validation.features().row(0), &[80.0]);
        assert_eq!(split.validation.features().row(19), &[99.0]);
        assert_eq!(split.train.features().row(79), &[79.0]);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        // 0.25 * 10 = 2.5 -> 3
        assert_eq!(validation_len(10, 0.25).unwrap(), 3);
        // 0.2 * 7 = 1.4 -> 1
        assert_eq!(validation_len(7, 0.2).unwrap(), 1);
    }

    #[test]
    fn fraction_outside_open_interval_is_rejected() {
        for f in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let err = split_tail(&numbered(10), f).unwrap_err();
            assert!(matches!(err, SplitError::InvalidFraction(_)), "fraction {f}");
        }
    }

    #[test]
    fn empty_dataset_is_rejected() {
        assert_eq!(
            split_tail(&numbered(0), 0.2).unwrap_err(),
            SplitError::EmptyDataset
        );
    }

    #[test]
    fn tiny_dataset_may_leave_validation_empty() {
        let split = split_tail(&numbered(2), 0.2).unwrap();
        assert_eq!(split.train.len(), 2);
        assert!(split.validation.is_empty());
    }

    #[test]
    fn split_is_deterministic() {
        let data = numbered(37);
        assert_eq!(split_tail(&data, 0.3).unwrap(), split_tail(&data, 0.3).unwrap());
    }
}
