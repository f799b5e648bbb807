//! Objective evaluation: train on the training split, score on validation.

use thiserror::Error;

use qtune_core::metrics::accuracy;
use qtune_core::{Assignment, FittedModel, Objective, Split, TrainableModel, TrainingError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluatorError {
    #[error("{partition} partition is empty ({rows} rows in total)")]
    EmptyPartition {
        partition: &'static str,
        rows: usize,
    },
}

/// Turns one assignment into `loss = -accuracy` on the validation subset.
///
/// Borrows the split for the whole run; every stage scores against the same
/// rows.
pub struct ObjectiveEvaluator<'a, M> {
    model: &'a M,
    split: &'a Split,
    evaluations: usize,
}

impl<'a, M: TrainableModel> ObjectiveEvaluator<'a, M> {
    pub fn new(model: &'a M, split: &'a Split) -> Result<Self, EvaluatorError> {
        let rows = split.train.len() + split.validation.len();
        if split.train.is_empty() {
            return Err(EvaluatorError::EmptyPartition {
                partition: "train",
                rows,
            });
        }
        if split.validation.is_empty() {
            return Err(EvaluatorError::EmptyPartition {
                partition: "validation",
                rows,
            });
        }
        Ok(Self {
            model,
            split,
            evaluations: 0,
        })
    }

    /// Fit on train and return validation accuracy.
    pub fn validation_accuracy(&self, assignment: &Assignment) -> Result<f64, TrainingError> {
        let predicted = self.validation_predictions(assignment)?;
        Ok(accuracy(self.split.validation.labels(), &predicted))
    }

    /// Fit on train and predict every validation row.
    pub fn validation_predictions(&self, assignment: &Assignment) -> Result<Vec<u32>, TrainingError> {
        let train = &self.split.train;
        let fitted = self.model.fit(train.features(), train.labels(), assignment)?;
        let predicted = fitted.predict(self.split.validation.features())?;
        if predicted.len() != self.split.validation.len() {
            return Err(TrainingError::Fit(format!(
                "model returned {} predictions for {} rows",
                predicted.len(),
                self.split.validation.len()
            )));
        }
        Ok(predicted)
    }

    /// Evaluations performed through [`Objective::evaluate`].
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn split(&self) -> &Split {
        self.split
    }
}

impl<M: TrainableModel> Objective for ObjectiveEvaluator<'_, M> {
    fn evaluate(&mut self, assignment: &Assignment) -> Result<f64, TrainingError> {
        self.evaluations += 1;
        Ok(-self.validation_accuracy(assignment)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtune_core::{split_tail, Dataset, FeatureMatrix, ParamValue};

    /// Predicts the value of the `answer` parameter for every row.
    struct Constant;

    struct ConstantFit(u32);

    impl TrainableModel for Constant {
        type Fitted = ConstantFit;

        fn fit(
            &self,
            _: &FeatureMatrix,
            _: &[u32],
            params: &Assignment,
        ) -> Result<ConstantFit, TrainingError> {
            let answer = params
                .get("answer")
                .and_then(ParamValue::as_i64)
                .ok_or_else(|| TrainingError::MissingParameter("answer".into()))?;
            Ok(ConstantFit(answer as u32))
        }
    }

    impl FittedModel for ConstantFit {
        fn predict(&self, features: &FeatureMatrix) -> Result<Vec<u32>, TrainingError> {
            Ok(vec![self.0; features.n_rows()])
        }
    }

    fn labelled(labels: &[u32]) -> Dataset {
        let rows: Vec<Vec<f64>> = labels.iter().map(|_| vec![0.0]).collect();
        Dataset::new(
            vec!["x".into()],
            (0..labels.len()).map(|i| i.to_string()).collect(),
            FeatureMatrix::from_rows(1, &rows).unwrap(),
            labels.to_vec(),
        )
        .unwrap()
    }

    fn answer(v: i64) -> Assignment {
        [("answer".to_string(), ParamValue::Int(v))].into_iter().collect()
    }

    #[test]
    fn loss_is_negative_validation_accuracy() {
        // validation = last 2 rows: labels [1, 2]
        let split = split_tail(&labelled(&[0, 0, 0, 1, 2]), 0.4).unwrap();
        let mut eval = ObjectiveEvaluator::new(&Constant, &split).unwrap();
        assert_eq!(eval.evaluate(&answer(1)), Ok(-0.5));
        assert_eq!(eval.evaluate(&answer(0)), Ok(-0.0));
        assert_eq!(eval.evaluations(), 2);
    }

    #[test]
    fn training_errors_propagate() {
        let split = split_tail(&labelled(&[0, 1, 0, 1, 2]), 0.4).unwrap();
        let mut eval = ObjectiveEvaluator::new(&Constant, &split).unwrap();
        assert_eq!(
            eval.evaluate(&Assignment::new()),
            Err(TrainingError::MissingParameter("answer".into()))
        );
    }

    #[test]
    fn empty_partitions_are_rejected() {
        let split = split_tail(&labelled(&[0, 1]), 0.2).unwrap();
        let err = ObjectiveEvaluator::new(&Constant, &split).err();
        assert_eq!(
            err,
            Some(EvaluatorError::EmptyPartition {
                partition: "validation",
                rows: 2
            })
        );
    }
}
