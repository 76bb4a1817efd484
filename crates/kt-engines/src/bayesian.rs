//! Bayesian optimization with a Gaussian-process surrogate and expected
//! improvement.
//!
//! Seed points are told to the model first (evaluating them when no score is
//! known), then `random_starts` uniform samples are drawn, and every remaining
//! call maximizes expected improvement over a batch of random candidates.

use rand_chacha::ChaCha8Rng;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use tracing::{debug, warn};

use kt_types::{engine_error, Dimension, TuneResult};

use crate::objective::{EngineOutcome, Incumbent, Objective, SearchEngine, SearchProblem};
use crate::sampling::{rng_from_seed, sample_point, unit_normal};

const JITTERS: [f64; 3] = [1e-6, 1e-4, 1e-2];

#[derive(Debug, Clone)]
pub struct BayesianSearch {
    rng: ChaCha8Rng,
    /// Random candidates scored per acquisition step.
    candidates: usize,
    /// Exploration margin of the expected-improvement criterion.
    xi: f64,
    /// RBF length scale in unit-cube coordinates.
    length_scale: f64,
}

impl BayesianSearch {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: rng_from_seed(seed),
            candidates: 500,
            xi: 0.01,
            length_scale: 0.25,
        }
    }

    pub fn with_candidates(mut self, candidates: usize) -> Self {
        self.candidates = candidates.max(1);
        self
    }

    fn propose(
        &mut self,
        normal: &Normal,
        dimensions: &[Dimension],
        xs: &[Vec<f64>],
        ys: &[f64],
    ) -> Vec<f64> {
        let unit: Vec<Vec<f64>> = xs.iter().map(|x| to_unit_point(dimensions, x)).collect();
        let Some(gp) = GaussianProcess::fit(&unit, ys, self.length_scale) else {
            warn!(observations = xs.len(), "surrogate fit failed, sampling at random");
            return sample_point(dimensions, &mut self.rng);
        };

        let y_best = ys.iter().cloned().fold(f64::INFINITY, f64::min);
        let mut best: Option<(Vec<f64>, f64)> = None;
        for _ in 0..self.candidates {
            let candidate = sample_point(dimensions, &mut self.rng);
            let (mu, sigma) = gp.predict(&to_unit_point(dimensions, &candidate));
            let ei = expected_improvement(normal, mu, sigma, y_best, self.xi);
            if best.as_ref().map_or(true, |(_, top)| ei > *top) {
                best = Some((candidate, ei));
            }
        }
        match best {
            Some((point, _)) => point,
            None => sample_point(dimensions, &mut self.rng),
        }
    }
}

impl SearchEngine for BayesianSearch {
    fn name(&self) -> &str {
        "bayesian"
    }

    fn run(
        &mut self,
        problem: &SearchProblem<'_>,
        objective: &mut dyn Objective,
    ) -> TuneResult<EngineOutcome> {
        if problem.budget == 0 {
            return Err(engine_error!("bayesian search needs a budget of at least one evaluation"));
        }

        let normal = unit_normal()?;
        let mut xs: Vec<Vec<f64>> = Vec::new();
        let mut ys: Vec<f64> = Vec::new();
        let mut incumbent = Incumbent::default();
        let mut calls = 0;

        match &problem.seeds.scores {
            Some(scores) => {
                if scores.len() != problem.seeds.points.len() {
                    return Err(engine_error!(
                        "{} seed points but {} seed scores",
                        problem.seeds.points.len(),
                        scores.len()
                    ));
                }
                for (point, score) in problem.seeds.points.iter().zip(scores) {
                    incumbent.offer(point, *score);
                    xs.push(point.clone());
                    ys.push(*score);
                }
            }
            None => {
                for point in problem.seeds.points.iter().take(problem.budget) {
                    let cost = objective.evaluate(point)?;
                    calls += 1;
                    incumbent.offer(point, cost);
                    xs.push(point.clone());
                    ys.push(cost);
                }
            }
        }

        let mut random_left = problem.random_starts;
        while calls < problem.budget {
            let point = if random_left > 0 || xs.len() < 2 {
                random_left = random_left.saturating_sub(1);
                sample_point(problem.dimensions, &mut self.rng)
            } else {
                self.propose(&normal, problem.dimensions, &xs, &ys)
            };
            let cost = objective.evaluate(&point)?;
            calls += 1;
            debug!(call = calls, cost, "bayesian evaluation");
            incumbent.offer(&point, cost);
            xs.push(point);
            ys.push(cost);
        }

        incumbent.into_outcome(self.name())
    }
}

fn to_unit_point(dimensions: &[Dimension], point: &[f64]) -> Vec<f64> {
    dimensions
        .iter()
        .zip(point)
        .map(|(dim, x)| dim.to_unit(*x))
        .collect()
}

/// Zero-mean GP with an RBF kernel over standardized targets.
struct GaussianProcess {
    train: Vec<Vec<f64>>,
    chol: Vec<Vec<f64>>,
    alpha: Vec<f64>,
    y_mean: f64,
    y_std: f64,
    length_scale: f64,
}

impl GaussianProcess {
    fn fit(xs: &[Vec<f64>], ys: &[f64], length_scale: f64) -> Option<Self> {
        let n = xs.len();
        if n == 0 {
            return None;
        }
        let y_mean = ys.iter().sum::<f64>() / n as f64;
        let var = ys.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / n as f64;
        let y_std = if var > 0.0 { var.sqrt() } else { 1.0 };
        let targets: Vec<f64> = ys.iter().map(|y| (y - y_mean) / y_std).collect();

        for jitter in JITTERS {
            let gram: Vec<Vec<f64>> = (0..n)
                .map(|i| {
                    (0..n)
                        .map(|j| {
                            let k = rbf(&xs[i], &xs[j], length_scale);
                            if i == j {
                                k + jitter
                            } else {
                                k
                            }
                        })
                        .collect()
                })
                .collect();
            if let Some(chol) = cholesky(&gram) {
                let alpha = back_substitute(&chol, &forward_substitute(&chol, &targets));
                return Some(Self {
                    train: xs.to_vec(),
                    chol,
                    alpha,
                    y_mean,
                    y_std,
                    length_scale,
                });
            }
        }
        None
    }

    /// Posterior mean and standard deviation in target units.
    fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star: Vec<f64> = self
            .train
            .iter()
            .map(|t| rbf(t, x, self.length_scale))
            .collect();
        let mean: f64 = k_star.iter().zip(&self.alpha).map(|(k, a)| k * a).sum();
        let v = forward_substitute(&self.chol, &k_star);
        let var = (1.0 - v.iter().map(|x| x * x).sum::<f64>()).max(1e-12);
        (mean * self.y_std + self.y_mean, var.sqrt() * self.y_std)
    }
}

fn rbf(a: &[f64], b: &[f64], length_scale: f64) -> f64 {
    let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    (-0.5 * sq / (length_scale * length_scale)).exp()
}

fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum = a[i][j] - (0..j).map(|k| l[i][k] * l[j][k]).sum::<f64>();
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][i] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

/// Solve `L y = b` for lower-triangular `L`.
fn forward_substitute(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; b.len()];
    for i in 0..b.len() {
        let sum: f64 = (0..i).map(|k| l[i][k] * y[k]).sum();
        y[i] = (b[i] - sum) / l[i][i];
    }
    y
}

/// Solve `Lᵀ x = y` for lower-triangular `L`.
fn back_substitute(l: &[Vec<f64>], y: &[f64]) -> Vec<f64> {
    let n = y.len();
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|k| l[k][i] * x[k]).sum();
        x[i] = (y[i] - sum) / l[i][i];
    }
    x
}

/// Expected improvement below `y_best` (minimization).
fn expected_improvement(normal: &Normal, mu: f64, sigma: f64, y_best: f64, xi: f64) -> f64 {
    let improvement = y_best - mu - xi;
    if sigma <= 1e-12 {
        return improvement.max(0.0);
    }
    let z = improvement / sigma;
    improvement * normal.cdf(z) + sigma * normal.pdf(z)
}
