//! Exploratory proposals for the first trials of a stage.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::tpe::{Coord, OpenDim};
use super::WarmupStrategy;

/// Precomputed warm-up coordinates, one column per open dimension.
///
/// Built once per stage from the stage's warm-up RNG. The stratified plan
/// covers categoricals candidate by candidate and continuous ranges stratum
/// by stratum; the random plan defers to the per-trial RNG.
#[derive(Debug, Clone)]
pub(crate) struct WarmupPlan {
    len: usize,
    columns: Option<Vec<Vec<Coord>>>,
}

impl WarmupPlan {
    pub(crate) fn new(
        strategy: WarmupStrategy,
        dims: &[OpenDim<'_>],
        len: usize,
        rng: &mut StdRng,
    ) -> Self {
        let columns = match strategy {
            WarmupStrategy::Random => None,
            WarmupStrategy::Stratified => Some(
                dims.iter()
                    .map(|dim| stratified_column(dim, len, rng))
                    .collect(),
            ),
        };
        Self { len, columns }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn propose(&self, trial: usize, dims: &[OpenDim<'_>], rng: &mut StdRng) -> Vec<Coord> {
        match &self.columns {
            Some(columns) if trial < self.len => columns.iter().map(|c| c[trial]).collect(),
            _ => dims.iter().map(|dim| uniform(dim, rng)).collect(),
        }
    }
}

fn stratified_column(dim: &OpenDim<'_>, len: usize, rng: &mut StdRng) -> Vec<Coord> {
    match *dim {
        OpenDim::Choice { choices, .. } => {
            let k = choices.len();
            let mut column = Vec::with_capacity(len);
            while column.len() < len {
                let mut perm: Vec<usize> = (0..k).collect();
                perm.shuffle(rng);
                column.extend(perm.into_iter().take(len - column.len()).map(Coord::Choice));
            }
            column
        }
        OpenDim::Range { low, high, .. } => {
            let width = high - low;
            let mut strata: Vec<usize> = (0..len).collect();
            strata.shuffle(rng);
            strata
                .into_iter()
                .map(|s| {
                    let u: f64 = rng.gen();
                    let x = low + (s as f64 + u) / len as f64 * width;
                    Coord::Real(x.clamp(low, high))
                })
                .collect()
        }
    }
}

fn uniform(dim: &OpenDim<'_>, rng: &mut StdRng) -> Coord {
    match *dim {
        OpenDim::Choice { choices, .. } => Coord::Choice(rng.gen_range(0..choices.len())),
        OpenDim::Range { low, high, .. } => Coord::Real(low + rng.gen::<f64>() * (high - low)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParamValue;
    use rand::SeedableRng;

    #[test]
    fn stratified_categoricals_cover_each_candidate_before_repeating() {
        let choices = vec![ParamValue::Int(1), ParamValue::Int(2), ParamValue::Int(3)];
        let dims = [OpenDim::Choice {
            name: "c",
            choices: &choices,
        }];
        let mut rng = StdRng::seed_from_u64(7);
        let plan = WarmupPlan::new(WarmupStrategy::Stratified, &dims, 6, &mut rng);

        let picks: Vec<usize> = (0..6)
            .map(|t| match plan.propose(t, &dims, &mut rng)[0] {
                Coord::Choice(i) => i,
                Coord::Real(_) => unreachable!(),
            })
            .collect();
        let mut first: Vec<usize> = picks[..3].to_vec();
        first.sort_unstable();
        assert_eq!(first, vec![0, 1, 2]);
        let mut second: Vec<usize> = picks[3..].to_vec();
        second.sort_unstable();
        assert_eq!(second, vec![0, 1, 2]);
    }

    #[test]
    fn stratified_ranges_hit_every_stratum() {
        let dims = [OpenDim::Range {
            name: "x",
            low: 0.0,
            high: 1.0,
        }];
        let mut rng = StdRng::seed_from_u64(7);
        let plan = WarmupPlan::new(WarmupStrategy::Stratified, &dims, 4, &mut rng);

        let mut strata: Vec<usize> = (0..4)
            .map(|t| match plan.propose(t, &dims, &mut rng)[0] {
                Coord::Real(x) => (x * 4.0).floor().min(3.0) as usize,
                Coord::Choice(_) => unreachable!(),
            })
            .collect();
        strata.sort_unstable();
        assert_eq!(strata, vec![0, 1, 2, 3]);
    }

    #[test]
    fn random_plan_draws_in_bounds() {
        let dims = [OpenDim::Range {
            name: "x",
            low: 0.5,
            high: 1.0,
        }];
        let mut rng = StdRng::seed_from_u64(1);
        let plan = WarmupPlan::new(WarmupStrategy::Random, &dims, 5, &mut rng);
        assert_eq!(plan.len(), 5);
        for t in 0..5 {
            match plan.propose(t, &dims, &mut rng)[0] {
                Coord::Real(x) => assert!((0.5..1.0).contains(&x)),
                Coord::Choice(_) => unreachable!(),
            }
        }
    }
}
