//! A/B split testing, one knob at a time.
//!
//! Starting from the reference configuration, each knob in turn is split into
//! `split_count` candidate values. Every candidate is benchmarked against the
//! current best with all other knobs held fixed, and the winner is kept before
//! moving on to the next knob. Observations stay in named form.

use tracing::{debug, info};

use kt_types::{decode_point, engine_error, Configuration, Dimension, TuneResult};

use crate::objective::{EngineOutcome, Objective, SearchEngine, SearchProblem};
use crate::sampling::linspace;

#[derive(Debug, Clone, Default)]
pub struct AbTest;

impl AbTest {
    pub fn new() -> Self {
        Self
    }
}

/// Up to `count` distinct values spread evenly over the dimension.
pub fn split_values(dimension: &Dimension, count: usize) -> Vec<f64> {
    let mut values: Vec<f64> = match dimension {
        Dimension::Interval { low, high, integer } => linspace(*low, *high, count)
            .into_iter()
            .map(|v| if *integer { v.round() } else { v })
            .collect(),
        Dimension::Candidates(candidates) => {
            let mut sorted = candidates.clone();
            sorted.sort_by(f64::total_cmp);
            linspace(0.0, sorted.len().saturating_sub(1) as f64, count.min(sorted.len()))
                .into_iter()
                .map(|pos| sorted[pos.round() as usize])
                .collect()
        }
    };
    values.dedup();
    values
}

impl SearchEngine for AbTest {
    fn name(&self) -> &str {
        "abtest"
    }

    fn run(
        &mut self,
        problem: &SearchProblem<'_>,
        objective: &mut dyn Objective,
    ) -> TuneResult<EngineOutcome> {
        if problem.split_count == 0 {
            return Err(engine_error!("split count must be at least one"));
        }

        let mut current: Vec<f64> = problem.reference.to_vec();
        let mut best = decode_point(problem.knobs, &current)?;
        let mut best_cost = objective.exchange(&best)?;
        let mut observations = vec![best.clone()];
        let mut scores = vec![best_cost];

        for (idx, (knob, dim)) in problem.knobs.iter().zip(problem.dimensions).enumerate() {
            let mut winner: Option<f64> = None;
            for arm in split_values(dim, problem.split_count) {
                if arm == current[idx] {
                    continue;
                }
                let mut candidate: Configuration = best.clone();
                candidate.insert(knob.name.clone(), knob.decode(arm)?);
                let cost = objective.exchange(&candidate)?;
                debug!(knob = %knob.name, arm, cost, "split test arm");
                observations.push(candidate);
                scores.push(cost);
                if cost < best_cost {
                    best_cost = cost;
                    winner = Some(arm);
                }
            }
            if let Some(arm) = winner {
                current[idx] = arm;
                best.insert(knob.name.clone(), knob.decode(arm)?);
                info!(knob = %knob.name, arm, cost = best_cost, "split test winner");
            }
        }

        Ok(EngineOutcome::Named {
            best,
            observations,
            scores,
        })
    }
}
