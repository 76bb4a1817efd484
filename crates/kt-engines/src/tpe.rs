//! Tree-structured Parzen estimator.
//!
//! After a random start-up phase, observations are split at the `gamma`
//! quantile into a "good" and a "bad" group. Each dimension is then modelled
//! independently: continuous dimensions by Gaussian kernels in unit-cube
//! coordinates, candidate sets by smoothed frequencies. Candidates are drawn
//! from the good model and the one maximizing `l(x) / g(x)` is evaluated.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use statrs::distribution::{Continuous, Normal};
use tracing::debug;

use kt_types::{engine_error, Dimension, TuneResult};

use crate::objective::{EngineOutcome, Incumbent, Objective, SearchEngine, SearchProblem};
use crate::sampling::{rng_from_seed, sample_dimension, sample_point, unit_normal};

#[derive(Debug, Clone)]
pub struct TreeParzen {
    rng: ChaCha8Rng,
    startup: usize,
    gamma: f64,
    candidates: usize,
}

impl TreeParzen {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: rng_from_seed(seed),
            startup: 10,
            gamma: 0.25,
            candidates: 24,
        }
    }

    pub fn with_startup(mut self, startup: usize) -> Self {
        self.startup = startup;
        self
    }

    fn propose(
        &mut self,
        kernel: &Normal,
        dimensions: &[Dimension],
        xs: &[Vec<f64>],
        ys: &[f64],
    ) -> Vec<f64> {
        let mut order: Vec<usize> = (0..ys.len()).collect();
        order.sort_by(|a, b| ys[*a].total_cmp(&ys[*b]));
        let n_good = ((self.gamma * ys.len() as f64).ceil() as usize).clamp(1, ys.len() - 1);
        let (good, bad) = order.split_at(n_good);

        dimensions
            .iter()
            .enumerate()
            .map(|(d, dim)| {
                let good_vals: Vec<f64> = good.iter().map(|&i| xs[i][d]).collect();
                let bad_vals: Vec<f64> = bad.iter().map(|&i| xs[i][d]).collect();
                match dim {
                    Dimension::Interval { .. } => {
                        self.propose_continuous(kernel, dim, &good_vals, &bad_vals)
                    }
                    Dimension::Candidates(values) => {
                        self.propose_categorical(values, &good_vals, &bad_vals)
                    }
                }
            })
            .collect()
    }

    fn propose_continuous(
        &mut self,
        kernel: &Normal,
        dim: &Dimension,
        good: &[f64],
        bad: &[f64],
    ) -> f64 {
        let good_u: Vec<f64> = good.iter().map(|x| dim.to_unit(*x)).collect();
        let bad_u: Vec<f64> = bad.iter().map(|x| dim.to_unit(*x)).collect();
        let bw_good = bandwidth(good_u.len());
        let bw_bad = bandwidth(bad_u.len());

        let mut best = (sample_dimension(dim, &mut self.rng), f64::NEG_INFINITY);
        for _ in 0..self.candidates {
            let centre = good_u[self.rng.gen_range(0..good_u.len())];
            let step: f64 = self.rng.sample(StandardNormal);
            let u = (centre + bw_good * step).clamp(0.0, 1.0);
            let score = parzen_log_density(kernel, u, &good_u, bw_good)
                - parzen_log_density(kernel, u, &bad_u, bw_bad);
            if score > best.1 {
                best = (dim.snap(dim.from_unit(u)), score);
            }
        }
        best.0
    }

    fn propose_categorical(&mut self, values: &[f64], good: &[f64], bad: &[f64]) -> f64 {
        let weights = |observed: &[f64]| -> Vec<f64> {
            values
                .iter()
                .map(|v| 1.0 + observed.iter().filter(|o| *o == v).count() as f64)
                .collect()
        };
        let good_w = weights(good);
        let bad_w = weights(bad);
        let good_total: f64 = good_w.iter().sum();
        let bad_total: f64 = bad_w.iter().sum();

        let Ok(dist) = WeightedIndex::new(&good_w) else {
            return values[self.rng.gen_range(0..values.len())];
        };
        let mut best = (values[dist.sample(&mut self.rng)], f64::NEG_INFINITY);
        for _ in 0..self.candidates {
            let idx = dist.sample(&mut self.rng);
            let score = (good_w[idx] / good_total).ln() - (bad_w[idx] / bad_total).ln();
            if score > best.1 {
                best = (values[idx], score);
            }
        }
        best.0
    }
}

fn bandwidth(n: usize) -> f64 {
    (1.0 / (n.max(1) as f64).sqrt()).clamp(0.05, 0.5) * 0.5
}

/// Log density of a Gaussian mixture centred on `points`, mixed with a uniform
/// prior over `[0, 1]`.
fn parzen_log_density(kernel: &Normal, u: f64, points: &[f64], bw: f64) -> f64 {
    let kernels: f64 = points.iter().map(|p| kernel.pdf((u - p) / bw) / bw).sum();
    ((kernels + 1.0) / (points.len() as f64 + 1.0)).ln()
}

impl SearchEngine for TreeParzen {
    fn name(&self) -> &str {
        "tpe"
    }

    fn run(
        &mut self,
        problem: &SearchProblem<'_>,
        objective: &mut dyn Objective,
    ) -> TuneResult<EngineOutcome> {
        if problem.budget == 0 {
            return Err(engine_error!("tpe needs a budget of at least one evaluation"));
        }

        let kernel = unit_normal()?;
        let mut xs: Vec<Vec<f64>> = Vec::new();
        let mut ys: Vec<f64> = Vec::new();
        let mut incumbent = Incumbent::default();
        for call in 0..problem.budget {
            let point = if call < self.startup || ys.len() < 2 {
                sample_point(problem.dimensions, &mut self.rng)
            } else {
                self.propose(&kernel, problem.dimensions, &xs, &ys)
            };
            let cost = objective.evaluate(&point)?;
            debug!(call, cost, "tpe evaluation");
            incumbent.offer(&point, cost);
            xs.push(point);
            ys.push(cost);
        }
        incumbent.into_outcome(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{problem_for, Quadratic};
    use crate::Seeds;

    #[test]
    fn proposals_stay_inside_the_space() {
        let dims = vec![
            Dimension::interval(-2.0, 2.0),
            Dimension::integer_interval(0, 9),
            Dimension::Candidates(vec![0.0, 1.0, 2.0, 3.0]),
        ];
        let seeds = Seeds::default();
        let problem = problem_for(&dims, &seeds, 30);
        let mut objective = Quadratic::new(vec![0.5, 4.0, 2.0]);

        TreeParzen::new(Some(4))
            .with_startup(5)
            .run(&problem, &mut objective)
            .unwrap();
        assert_eq!(objective.points.len(), 30);
        for point in &objective.points {
            for (dim, x) in dims.iter().zip(point) {
                assert!(dim.contains(*x), "{x} outside {dim:?}");
            }
        }
    }

    #[test]
    fn good_region_scores_higher() {
        let good = vec![0.1, 0.12, 0.15];
        let bad = vec![0.8, 0.9, 0.85, 0.95];
        let kernel = unit_normal().unwrap();
        let bw = bandwidth(3);
        let ratio = |u: f64| {
            parzen_log_density(&kernel, u, &good, bw) - parzen_log_density(&kernel, u, &bad, bw)
        };
        let near_good = ratio(0.12);
        let near_bad = ratio(0.9);
        assert!(near_good > near_bad);
    }

    #[test]
    fn categorical_proposal_follows_good_frequencies() {
        let mut tpe = TreeParzen::new(Some(8));
        let values = vec![0.0, 1.0, 2.0];
        let picks: Vec<f64> = (0..20)
            .map(|_| tpe.propose_categorical(&values, &[2.0, 2.0, 2.0], &[0.0, 0.0, 1.0, 1.0]))
            .collect();
        assert!(picks.iter().all(|p| values.contains(p)));
        assert!(picks.iter().filter(|p| **p == 2.0).count() > 10);
    }
}
