//! Engine selection and outcome normalization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use kt_engines::{
    AbTest, BayesianSearch, EngineOutcome, LatinHypercube, RandomSearch, SearchEngine,
    SearchProblem, TreeParzen,
};
use kt_types::{
    config_error, decode_point, encode_configuration, Configuration, TuneError, TuneResult,
    WorkerMessage,
};

use crate::bridge::ObjectiveBridge;
use crate::channel::WorkerChannel;
use crate::trial::TrialHistory;

/// The search strategies a worker can run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EngineKind {
    Random,
    #[default]
    Bayesian,
    AbTest,
    Lhs,
    Tpe,
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Bayesian => "bayes",
            Self::AbTest => "abtest",
            Self::Lhs => "lhs",
            Self::Tpe => "tpe",
        }
    }

    /// Whether the run ends with a feature ranking.
    pub fn ranks_features(self) -> bool {
        !matches!(self, Self::Tpe)
    }

    pub fn build(self, seed: Option<u64>) -> Box<dyn SearchEngine> {
        match self {
            Self::Random => Box::new(RandomSearch::new(seed)),
            Self::Bayesian => Box::new(BayesianSearch::new(seed)),
            Self::AbTest => Box::new(AbTest::new()),
            Self::Lhs => Box::new(LatinHypercube::new(seed)),
            Self::Tpe => Box::new(TreeParzen::new(seed)),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = TuneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "bayes" | "bayesian" => Ok(Self::Bayesian),
            "abtest" => Ok(Self::AbTest),
            "lhs" => Ok(Self::Lhs),
            "tpe" => Ok(Self::Tpe),
            other => Err(config_error!("the engine {other} is not supported")),
        }
    }
}

impl TryFrom<String> for EngineKind {
    type Error = TuneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EngineKind> for String {
    fn from(kind: EngineKind) -> Self {
        kind.as_str().to_string()
    }
}

/// How a dispatched search ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Best parameters found; the trial history is ready for ranking.
    Completed(Configuration),
    /// The final message has already been sent and ranking is skipped.
    Reported(Configuration),
}

impl DispatchOutcome {
    pub fn best(&self) -> &Configuration {
        match self {
            Self::Completed(best) | Self::Reported(best) => best,
        }
    }

    pub fn into_best(self) -> Configuration {
        match self {
            Self::Completed(best) | Self::Reported(best) => best,
        }
    }
}

/// Runs the selected engine against the harness and brings its outcome back
/// to named parameters plus a positional trial history.
#[derive(Debug, Clone)]
pub struct EngineDispatcher {
    kind: EngineKind,
    seed: Option<u64>,
}

impl EngineDispatcher {
    pub fn new(kind: EngineKind, seed: Option<u64>) -> Self {
        Self { kind, seed }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn dispatch(
        &self,
        problem: &SearchProblem<'_>,
        channel: &WorkerChannel,
        history: &mut TrialHistory,
    ) -> TuneResult<DispatchOutcome> {
        let mut engine = self.kind.build(self.seed);
        info!(engine = engine.name(), budget = problem.budget, "running performance evaluation");

        let outcome = {
            let mut bridge = ObjectiveBridge::new(problem.knobs, channel, history);
            engine.run(problem, &mut bridge)?
        };

        let best = match outcome {
            EngineOutcome::Best { point, cost } => {
                info!(cost, "minimization procedure has been completed");
                decode_point(problem.knobs, &point)?
            }
            EngineOutcome::Named {
                best,
                observations,
                scores,
            } => {
                // String options become indices so the ranker sees numbers.
                let points = observations
                    .iter()
                    .map(|configuration| encode_configuration(problem.knobs, configuration))
                    .collect::<TuneResult<Vec<_>>>()?;
                *history = TrialHistory::from_observations(points, &scores);
                best
            }
        };

        if !self.kind.ranks_features() {
            channel.send(WorkerMessage::finished(best.clone(), None))?;
            return Ok(DispatchOutcome::Reported(best));
        }
        Ok(DispatchOutcome::Completed(best))
    }
}
