//! The contract every search engine satisfies.

use kt_types::{Configuration, Dimension, KnobSpec, TuneResult};

/// The callback engines minimize.
///
/// Implementations block until the candidate has been measured; engines must
/// never issue overlapping evaluations.
pub trait Objective {
    /// Evaluate a search point and record it as a trial.
    fn evaluate(&mut self, point: &[f64]) -> TuneResult<f64>;

    /// Evaluate an already-named configuration without recording it. Engines
    /// that call this keep their own observations.
    fn exchange(&mut self, configuration: &Configuration) -> TuneResult<f64>;
}

/// Points known before the search starts.
///
/// `scores` is `None` when the points still have to be evaluated (e.g. the
/// reference point of a cold start).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Seeds {
    pub points: Vec<Vec<f64>>,
    pub scores: Option<Vec<f64>>,
}

impl Seeds {
    pub fn unscored(points: Vec<Vec<f64>>) -> Self {
        Self {
            points,
            scores: None,
        }
    }

    pub fn scored(points: Vec<Vec<f64>>, scores: Vec<f64>) -> Self {
        Self {
            points,
            scores: Some(scores),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Everything an engine may read about the problem.
#[derive(Debug, Clone, Copy)]
pub struct SearchProblem<'a> {
    pub knobs: &'a [KnobSpec],
    pub dimensions: &'a [Dimension],
    pub reference: &'a [f64],
    /// Evaluation budget.
    pub budget: usize,
    pub seeds: &'a Seeds,
    /// Purely random evaluations before a model-based engine starts fitting.
    pub random_starts: usize,
    /// Candidate values per knob for split testing.
    pub split_count: usize,
}

/// What an engine hands back when it finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// Best search point found; every evaluation went through
    /// [`Objective::evaluate`].
    Best { point: Vec<f64>, cost: f64 },
    /// Best named configuration plus the engine's own named observations.
    Named {
        best: Configuration,
        observations: Vec<Configuration>,
        scores: Vec<f64>,
    },
}

/// A pluggable search strategy.
pub trait SearchEngine: Send {
    /// Human-readable engine name.
    fn name(&self) -> &str;

    /// Drive the search to completion.
    fn run(
        &mut self,
        problem: &SearchProblem<'_>,
        objective: &mut dyn Objective,
    ) -> TuneResult<EngineOutcome>;
}

/// Tracks the lowest-cost point seen so far.
#[derive(Debug, Clone, Default)]
pub(crate) struct Incumbent {
    best: Option<(Vec<f64>, f64)>,
}

impl Incumbent {
    pub(crate) fn offer(&mut self, point: &[f64], cost: f64) {
        let improves = match &self.best {
            None => true,
            Some((_, best)) => cost < *best,
        };
        if improves {
            self.best = Some((point.to_vec(), cost));
        }
    }

    pub(crate) fn into_outcome(self, engine: &str) -> TuneResult<EngineOutcome> {
        self.best
            .map(|(point, cost)| EngineOutcome::Best { point, cost })
            .ok_or_else(|| kt_types::engine_error!("{engine} finished without evaluating any point"))
    }
}
