//! Running configuration: every dimension resolved so far.

use serde::{Deserialize, Serialize};

use crate::domain::{Assignment, ParamValue};

/// Name of the fixed dimension that seeds all randomness in a run.
pub const SEED_DIMENSION: &str = "seed";

/// Accumulated resolved values across completed stages.
///
/// Grows monotonically: [`absorb`](Self::absorb) inserts or replaces, nothing
/// ever removes a name. The staging controller owns the only mutable copy and
/// calls `absorb` between stages, never during one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunningConfig {
    values: Assignment,
}

impl RunningConfig {
    /// Start from the global fixed dimensions.
    pub fn with_fixed(values: impl IntoIterator<Item = (String, ParamValue)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    /// Fold a stage's winning values in, replacing any earlier entry.
    pub fn absorb(&mut self, resolved: &Assignment) {
        for (name, value) in resolved.iter() {
            self.values.insert(name.clone(), value.clone());
        }
    }

    /// The `seed` dimension as a non-negative integer, if present.
    pub fn seed(&self) -> Option<u64> {
        self.get(SEED_DIMENSION)
            .and_then(ParamValue::as_i64)
            .and_then(|s| u64::try_from(s).ok())
    }

    pub fn as_assignment(&self) -> &Assignment {
        &self.values
    }

    pub fn into_assignment(self) -> Assignment {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_adds_and_replaces() {
        let mut running = RunningConfig::with_fixed([
            ("seed".to_string(), ParamValue::Int(123)),
            ("max_depth".to_string(), ParamValue::Int(6)),
        ]);

        let resolved: Assignment = [
            ("max_depth".to_string(), ParamValue::Int(4)),
            ("gamma".to_string(), ParamValue::Float(0.28)),
        ]
        .into_iter()
        .collect();
        running.absorb(&resolved);

        assert_eq!(running.len(), 3);
        assert_eq!(running.get("max_depth"), Some(&ParamValue::Int(4)));
        assert_eq!(running.get("gamma"), Some(&ParamValue::Float(0.28)));
    }

    #[test]
    fn seed_requires_non_negative_integer() {
        let ok = RunningConfig::with_fixed([("seed".to_string(), ParamValue::Int(7))]);
        assert_eq!(ok.seed(), Some(7));

        let negative = RunningConfig::with_fixed([("seed".to_string(), ParamValue::Int(-1))]);
        assert_eq!(negative.seed(), None);

        let text = RunningConfig::with_fixed([("seed".to_string(), ParamValue::from("abc"))]);
        assert_eq!(text.seed(), None);

        assert_eq!(RunningConfig::default().seed(), None);
    }
}
