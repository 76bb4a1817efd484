//! Pure random search.

use rand_chacha::ChaCha8Rng;
use tracing::debug;

use kt_types::{engine_error, TuneResult};

use crate::objective::{EngineOutcome, Incumbent, Objective, SearchEngine, SearchProblem};
use crate::sampling::{rng_from_seed, sample_point};

/// Independent uniform sampling across the search space, `budget` times.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    rng: ChaCha8Rng,
}

impl RandomSearch {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: rng_from_seed(seed),
        }
    }
}

impl SearchEngine for RandomSearch {
    fn name(&self) -> &str {
        "random"
    }

    fn run(
        &mut self,
        problem: &SearchProblem<'_>,
        objective: &mut dyn Objective,
    ) -> TuneResult<EngineOutcome> {
        if problem.budget == 0 {
            return Err(engine_error!("random search needs a budget of at least one evaluation"));
        }

        let mut incumbent = Incumbent::default();
        for call in 0..problem.budget {
            let point = sample_point(problem.dimensions, &mut self.rng);
            let cost = objective.evaluate(&point)?;
            debug!(call, cost, "random search evaluation");
            incumbent.offer(&point, cost);
        }
        incumbent.into_outcome(self.name())
    }
}
