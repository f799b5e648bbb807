//! Density estimators for the good/bad split.

use rand::Rng;

/// Attempts at drawing inside the bounds before clamping.
const MAX_REJECTIONS: usize = 64;

/// Adaptive Parzen mixture of Gaussians truncated to `[low, high]`.
///
/// One component per observation plus a prior component centred on the
/// interval with σ equal to its width. Each observation's σ is the larger
/// gap to its sorted neighbours, clipped to `[width / min(100, m + 1), width]`
/// where `m` counts all components.
#[derive(Debug, Clone, PartialEq)]
pub struct ParzenEstimator {
    low: f64,
    high: f64,
    mus: Vec<f64>,
    sigmas: Vec<f64>,
    weights: Vec<f64>,
    /// Per-component truncation mass `Φ(b) − Φ(a)`.
    mass: Vec<f64>,
}

impl ParzenEstimator {
    pub fn fit(observations: &[f64], low: f64, high: f64, prior_weight: f64) -> Self {
        let width = high - low;
        let prior_mu = low + 0.5 * width;

        // (mu, weight, is_prior), sorted by mu with the prior placed before
        // equal observations
        let mut comps: Vec<(f64, f64, bool)> = observations
            .iter()
            .map(|&x| (x.clamp(low, high), 1.0, false))
            .collect();
        comps.push((prior_mu, prior_weight, true));
        comps.sort_by(|a, b| a.0.total_cmp(&b.0).then(b.2.cmp(&a.2)));

        let m = comps.len();
        let min_sigma = width / (m as f64 + 1.0).min(100.0);
        let sigmas: Vec<f64> = (0..m)
            .map(|i| {
                if comps[i].2 {
                    return width;
                }
                let left = if i > 0 { comps[i].0 - comps[i - 1].0 } else { 0.0 };
                let right = if i + 1 < m { comps[i + 1].0 - comps[i].0 } else { 0.0 };
                left.max(right).clamp(min_sigma, width)
            })
            .collect();

        let total: f64 = comps.iter().map(|c| c.1).sum();
        let mus: Vec<f64> = comps.iter().map(|c| c.0).collect();
        let weights: Vec<f64> = comps.iter().map(|c| c.1 / total).collect();
        let mass = mus
            .iter()
            .zip(&sigmas)
            .map(|(&mu, &s)| {
                (normal_cdf((high - mu) / s) - normal_cdf((low - mu) / s)).max(f64::MIN_POSITIVE)
            })
            .collect();

        Self {
            low,
            high,
            mus,
            sigmas,
            weights,
            mass,
        }
    }

    pub fn components(&self) -> usize {
        self.mus.len()
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let k = pick_weighted(&self.weights, rng);
        let (mu, sigma) = (self.mus[k], self.sigmas[k]);
        let mut x = mu;
        for _ in 0..MAX_REJECTIONS {
            x = mu + sigma * standard_normal(rng);
            if (self.low..=self.high).contains(&x) {
                return x;
            }
        }
        x.clamp(self.low, self.high)
    }

    /// Log density, floored so that `ln` never sees zero.
    pub fn log_pdf(&self, x: f64) -> f64 {
        if x < self.low || x > self.high {
            return f64::MIN_POSITIVE.ln();
        }
        let p: f64 = (0..self.mus.len())
            .map(|k| {
                let z = (x - self.mus[k]) / self.sigmas[k];
                self.weights[k] * (-0.5 * z * z).exp()
                    / (self.sigmas[k] * SQRT_2PI * self.mass[k])
            })
            .sum();
        p.max(f64::MIN_POSITIVE).ln()
    }
}

/// Smoothed distribution over candidate indices.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalEstimator {
    probs: Vec<f64>,
}

impl CategoricalEstimator {
    /// Observed counts plus `prior_weight` pseudo-counts per candidate.
    /// Observations outside `0..n_choices` are ignored.
    pub fn fit(observations: &[usize], n_choices: usize, prior_weight: f64) -> Self {
        let mut counts = vec![prior_weight; n_choices];
        for &i in observations {
            if let Some(c) = counts.get_mut(i) {
                *c += 1.0;
            }
        }
        let total: f64 = counts.iter().sum();
        Self {
            probs: counts.into_iter().map(|c| c / total).collect(),
        }
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        pick_weighted(&self.probs, rng)
    }

    pub fn log_pmf(&self, index: usize) -> f64 {
        self.probs
            .get(index)
            .copied()
            .unwrap_or(0.0)
            .max(f64::MIN_POSITIVE)
            .ln()
    }
}

const SQRT_2PI: f64 = 2.506_628_274_631_000_7;

fn pick_weighted<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    let r: f64 = rng.gen::<f64>() * weights.iter().sum::<f64>();
    let mut acc = 0.0;
    for (i, w) in weights.iter().enumerate() {
        acc += w;
        if r < acc {
            return i;
        }
    }
    weights.len().saturating_sub(1)
}

/// Box-Muller.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Abramowitz & Stegun 7.1.26, |error| < 1.5e-7.
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}
