use rand::rngs::StdRng;
use tracing::debug;

use super::parzen::{CategoricalEstimator, ParzenEstimator};
use super::warmup::WarmupPlan;
use super::{Objective, SearchError, SearchOutcome, TpeConfig};
use crate::domain::{Assignment, ParamValue, Trial};
use crate::rng::RngHierarchy;
use crate::space::{Dimension, SearchSpace};

/// A dimension the optimizer chooses values for, borrowed from the space.
#[derive(Debug, Clone, Copy)]
pub(crate) enum OpenDim<'a> {
    Choice {
        name: &'a str,
        choices: &'a [ParamValue],
    },
    Range {
        name: &'a str,
        low: f64,
        high: f64,
    },
}

impl OpenDim<'_> {
    fn name(&self) -> &str {
        match self {
            OpenDim::Choice { name, .. } | OpenDim::Range { name, .. } => name,
        }
    }

    fn value(&self, coord: Coord) -> ParamValue {
        match (self, coord) {
            (OpenDim::Choice { choices, .. }, Coord::Choice(i)) => choices[i].clone(),
            (_, Coord::Real(x)) => ParamValue::Float(x),
            (OpenDim::Range { .. }, Coord::Choice(i)) => ParamValue::Int(i as i64),
        }
    }
}

/// Position of a trial along one open dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Coord {
    Choice(usize),
    Real(f64),
}

struct Observation {
    index: usize,
    loss: f64,
    point: Vec<Coord>,
}

/// Runs one stage's budgeted TPE search.
#[derive(Debug, Clone)]
pub struct StageOptimizer {
    config: TpeConfig,
    rng: RngHierarchy,
}

impl StageOptimizer {
    pub fn new(config: TpeConfig, master_seed: u64) -> Self {
        Self {
            config,
            rng: RngHierarchy::new(master_seed),
        }
    }

    pub fn config(&self) -> &TpeConfig {
        &self.config
    }

    pub fn optimize<O>(
        &self,
        stage_key: &str,
        space: &SearchSpace,
        objective: &mut O,
        budget: usize,
    ) -> Result<SearchOutcome, SearchError>
    where
        O: Objective + ?Sized,
    {
        self.optimize_with_observer(stage_key, space, objective, budget, |_| {})
    }

    /// Evaluate exactly `budget` assignments and return the best trial.
    ///
    /// `on_trial` sees every completed trial in evaluation order. The first
    /// failing evaluation aborts the search.
    pub fn optimize_with_observer<O, F>(
        &self,
        stage_key: &str,
        space: &SearchSpace,
        objective: &mut O,
        budget: usize,
        mut on_trial: F,
    ) -> Result<SearchOutcome, SearchError>
    where
        O: Objective + ?Sized,
        F: FnMut(&Trial),
    {
        if budget == 0 {
            return Err(SearchError::ZeroBudget);
        }
        self.config.validate()?;

        let dims = open_dims(space);
        let warmup_len = self.config.n_startup.max(1).min(budget);
        let mut warmup_rng = self.rng.rng_for(&format!("{stage_key}/warmup"), 0);
        let plan = WarmupPlan::new(self.config.warmup, &dims, warmup_len, &mut warmup_rng);

        let mut history: Vec<Observation> = Vec::with_capacity(budget);
        let mut best: Option<Trial> = None;

        for index in 0..budget {
            let mut rng = self.rng.rng_for(stage_key, index as u64);
            let point = if index < plan.len() {
                plan.propose(index, &dims, &mut rng)
            } else {
                self.propose_guided(&dims, &history, &mut rng)
            };
            let assignment = assemble(space, &dims, &point);

            let loss = objective
                .evaluate(&assignment)
                .map_err(|source| SearchError::Training {
                    trial: index,
                    source,
                })?;
            if !loss.is_finite() {
                return Err(SearchError::NonFiniteLoss { trial: index, loss });
            }

            let trial = Trial {
                index,
                assignment,
                loss,
            };
            debug!(stage = stage_key, trial = index, loss, "trial complete");
            on_trial(&trial);

            if best.as_ref().map_or(true, |b| trial.beats(b)) {
                best = Some(trial);
            }
            history.push(Observation { index, loss, point });
        }

        let best = best.ok_or(SearchError::ZeroBudget)?;
        Ok(SearchOutcome {
            best,
            evaluations: budget,
        })
    }

    fn propose_guided(
        &self,
        dims: &[OpenDim<'_>],
        history: &[Observation],
        rng: &mut StdRng,
    ) -> Vec<Coord> {
        let mut ranked: Vec<&Observation> = history.iter().collect();
        ranked.sort_by(|a, b| a.loss.total_cmp(&b.loss).then(a.index.cmp(&b.index)));

        let n = ranked.len();
        let n_good = ((self.config.gamma * (n as f64).sqrt()).ceil() as usize)
            .clamp(1, n.saturating_sub(1).max(1))
            .min(n);
        let (good, bad) = ranked.split_at(n_good);

        dims.iter()
            .enumerate()
            .map(|(d, dim)| match *dim {
                OpenDim::Choice { choices, .. } => {
                    let pick = |set: &[&Observation]| -> Vec<usize> {
                        set.iter()
                            .filter_map(|o| match o.point[d] {
                                Coord::Choice(i) => Some(i),
                                Coord::Real(_) => None,
                            })
                            .collect()
                    };
                    let l = CategoricalEstimator::fit(&pick(good), choices.len(), self.config.prior_weight);
                    let g = CategoricalEstimator::fit(&pick(bad), choices.len(), self.config.prior_weight);
                    let candidate = best_candidate(self.config.n_candidates, || {
                        let i = l.sample(rng);
                        (i, l.log_pmf(i) - g.log_pmf(i))
                    });
                    Coord::Choice(candidate)
                }
                OpenDim::Range { low, high, .. } => {
                    let pick = |set: &[&Observation]| -> Vec<f64> {
                        set.iter()
                            .filter_map(|o| match o.point[d] {
                                Coord::Real(x) => Some(x),
                                Coord::Choice(_) => None,
                            })
                            .collect()
                    };
                    let l = ParzenEstimator::fit(&pick(good), low, high, self.config.prior_weight);
                    let g = ParzenEstimator::fit(&pick(bad), low, high, self.config.prior_weight);
                    let candidate = best_candidate(self.config.n_candidates, || {
                        let x = l.sample(rng);
                        (x, l.log_pdf(x) - g.log_pdf(x))
                    });
                    Coord::Real(candidate)
                }
            })
            .collect()
    }
}

/// Draw `n` scored candidates and keep the first maximum.
fn best_candidate<T: Copy>(n: usize, mut draw: impl FnMut() -> (T, f64)) -> T {
    let (mut best, mut best_score) = draw();
    for _ in 1..n {
        let (candidate, score) = draw();
        if score > best_score {
            best = candidate;
            best_score = score;
        }
    }
    best
}

fn open_dims(space: &SearchSpace) -> Vec<OpenDim<'_>> {
    space
        .open_dimensions()
        .filter_map(|(name, dim)| match dim {
            Dimension::Categorical { choices } => Some(OpenDim::Choice {
                name: name.as_str(),
                choices: choices.as_slice(),
            }),
            Dimension::Continuous { low, high } => Some(OpenDim::Range {
                name: name.as_str(),
                low: *low,
                high: *high,
            }),
            Dimension::Fixed { .. } => None,
        })
        .collect()
}

fn assemble(space: &SearchSpace, dims: &[OpenDim<'_>], point: &[Coord]) -> Assignment {
    let mut assignment: Assignment = space
        .iter()
        .filter_map(|(name, dim)| match dim {
            Dimension::Fixed { value } => Some((name.clone(), value.clone())),
            _ => None,
        })
        .collect();
    for (dim, &coord) in dims.iter().zip(point) {
        assignment.insert(dim.name(), dim.value(coord));
    }
    assignment
}
