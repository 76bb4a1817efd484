//! Latin hypercube sampling.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use kt_types::{engine_error, Dimension, TuneResult};

use crate::objective::{EngineOutcome, Incumbent, Objective, SearchEngine, SearchProblem};
use crate::sampling::rng_from_seed;

/// Stratified sampling: each dimension is cut into `budget` equal strata and
/// every stratum is visited exactly once, in an independent random order per
/// dimension. The best evaluated sample wins.
#[derive(Debug, Clone)]
pub struct LatinHypercube {
    rng: ChaCha8Rng,
}

impl LatinHypercube {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: rng_from_seed(seed),
        }
    }

    /// Draw `count` samples over `dimensions`.
    pub fn samples(&mut self, dimensions: &[Dimension], count: usize) -> Vec<Vec<f64>> {
        let mut points = vec![Vec::with_capacity(dimensions.len()); count];
        for dim in dimensions {
            let mut strata: Vec<usize> = (0..count).collect();
            strata.shuffle(&mut self.rng);
            for (point, stratum) in points.iter_mut().zip(strata) {
                // Random jitter within the stratum.
                let u = (stratum as f64 + self.rng.gen::<f64>()) / count as f64;
                point.push(dim.from_unit(u));
            }
        }
        points
    }
}

impl SearchEngine for LatinHypercube {
    fn name(&self) -> &str {
        "lhs"
    }

    fn run(
        &mut self,
        problem: &SearchProblem<'_>,
        objective: &mut dyn Objective,
    ) -> TuneResult<EngineOutcome> {
        if problem.budget == 0 {
            return Err(engine_error!("latin hypercube sampling needs at least one sample"));
        }

        let samples = self.samples(problem.dimensions, problem.budget);
        let mut incumbent = Incumbent::default();
        for (idx, point) in samples.iter().enumerate() {
            let cost = objective.evaluate(point)?;
            debug!(sample = idx, cost, "lhs evaluation");
            incumbent.offer(point, cost);
        }
        incumbent.into_outcome(self.name())
    }
}
