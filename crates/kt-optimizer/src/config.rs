//! Worker job configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use kt_types::{KnobSpec, TuneResult};

use crate::dispatch::EngineKind;

pub(crate) const DEFAULT_RANDOM_STARTS: usize = 20;
pub(crate) const DEFAULT_SPLIT_COUNT: usize = 5;

fn default_name() -> String {
    "optimizer".to_string()
}

fn default_max_eval() -> usize {
    50
}

fn default_random_starts() -> usize {
    DEFAULT_RANDOM_STARTS
}

fn default_split_count() -> usize {
    DEFAULT_SPLIT_COUNT
}

/// Everything needed to start one tuning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_name")]
    pub name: String,

    pub knobs: Vec<KnobSpec>,

    /// "random", "bayes", "abtest", "lhs" or "tpe".
    #[serde(default)]
    pub engine: EngineKind,

    /// Evaluation budget.
    #[serde(default = "default_max_eval")]
    pub max_eval: usize,

    /// Prior trials as `name=value` tokens.
    #[serde(default)]
    pub x0: Option<Vec<Vec<String>>>,

    /// Scores of the prior trials, numbers or numeric strings.
    #[serde(default)]
    pub y0: Option<Vec<Value>>,

    #[serde(default = "default_random_starts")]
    pub n_random_starts: usize,

    /// Candidate values per knob for split testing.
    #[serde(default = "default_split_count")]
    pub split_count: usize,

    /// RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl WorkerConfig {
    pub fn new(name: impl Into<String>, knobs: Vec<KnobSpec>, engine: EngineKind) -> Self {
        Self {
            name: name.into(),
            knobs,
            engine,
            max_eval: default_max_eval(),
            x0: None,
            y0: None,
            n_random_starts: default_random_starts(),
            split_count: default_split_count(),
            seed: None,
        }
    }

    pub fn from_json_str(json: &str) -> TuneResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> TuneResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_max_eval(mut self, n: usize) -> Self {
        self.max_eval = n;
        self
    }

    pub fn with_warm_start(mut self, x0: Vec<Vec<String>>, y0: Vec<Value>) -> Self {
        self.x0 = Some(x0);
        self.y0 = Some(y0);
        self
    }

    pub fn with_random_starts(mut self, n: usize) -> Self {
        self.n_random_starts = n;
        self
    }

    pub fn with_split_count(mut self, n: usize) -> Self {
        self.split_count = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
