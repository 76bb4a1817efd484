//! Fixtures shared by the engine tests.

use kt_types::{encode_configuration, Configuration, Dimension, KnobSpec, TuneResult};

use crate::objective::{Objective, SearchProblem, Seeds};

/// Squared distance to `target`; records every evaluated point.
pub(crate) struct Quadratic {
    target: Vec<f64>,
    knobs: Vec<KnobSpec>,
    pub points: Vec<Vec<f64>>,
    pub costs: Vec<f64>,
    pub exchanged: Vec<Configuration>,
}

impl Quadratic {
    pub fn new(target: Vec<f64>) -> Self {
        Self {
            target,
            knobs: Vec::new(),
            points: Vec::new(),
            costs: Vec::new(),
            exchanged: Vec::new(),
        }
    }

    pub fn with_knobs(mut self, knobs: Vec<KnobSpec>) -> Self {
        self.knobs = knobs;
        self
    }

    fn cost(&self, point: &[f64]) -> f64 {
        point
            .iter()
            .zip(&self.target)
            .map(|(x, t)| (x - t).powi(2))
            .sum()
    }
}

impl Objective for Quadratic {
    fn evaluate(&mut self, point: &[f64]) -> TuneResult<f64> {
        let cost = self.cost(point);
        self.points.push(point.to_vec());
        self.costs.push(cost);
        Ok(cost)
    }

    fn exchange(&mut self, configuration: &Configuration) -> TuneResult<f64> {
        let point = encode_configuration(&self.knobs, configuration)?;
        self.exchanged.push(configuration.clone());
        Ok(self.cost(&point))
    }
}

pub(crate) fn problem_for<'a>(
    dimensions: &'a [Dimension],
    seeds: &'a Seeds,
    budget: usize,
) -> SearchProblem<'a> {
    SearchProblem {
        knobs: &[],
        dimensions,
        reference: &[],
        budget,
        seeds,
        random_starts: 5,
        split_count: 5,
    }
}
