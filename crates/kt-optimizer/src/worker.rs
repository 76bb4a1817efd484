//! The tuning worker: one run, one thread, one channel.

use std::thread::{self, JoinHandle};

use serde_json::Value;
use tracing::{error, info, warn};

use kt_engines::{SearchProblem, Seeds};
use kt_types::{internal_error, Configuration, KnobSpec, TuneResult, WorkerMessage};

use crate::channel::{ControllerChannel, WorkerChannel};
use crate::config::{WorkerConfig, DEFAULT_RANDOM_STARTS, DEFAULT_SPLIT_COUNT};
use crate::dispatch::{DispatchOutcome, EngineDispatcher, EngineKind};
use crate::importance::FeatureImportanceRanker;
use crate::space::build_space;
use crate::trial::{RunStatus, TrialHistory};
use crate::warm_start::{adjusted_random_starts, WarmStartTransfer};

/// Finds good settings for a knob list by driving a search engine against an
/// external benchmarking harness.
///
/// Every candidate is sent over the channel as a suggestion and the worker
/// blocks until the harness replies with its measurements. The run ends with
/// exactly one final or failure message.
pub struct Optimizer {
    name: String,
    knobs: Vec<KnobSpec>,
    channel: WorkerChannel,
    engine: EngineKind,
    max_eval: usize,
    x0: Option<Vec<Vec<String>>>,
    y0: Option<Vec<Value>>,
    random_starts: usize,
    split_count: usize,
    seed: Option<u64>,
    status: RunStatus,
}

impl Optimizer {
    pub fn new(
        name: impl Into<String>,
        knobs: Vec<KnobSpec>,
        channel: WorkerChannel,
        engine: EngineKind,
        max_eval: usize,
    ) -> Self {
        let name = name.into();
        Self {
            status: RunStatus::new(name.clone(), engine.to_string()),
            name,
            knobs,
            channel,
            engine,
            max_eval,
            x0: None,
            y0: None,
            random_starts: DEFAULT_RANDOM_STARTS,
            split_count: DEFAULT_SPLIT_COUNT,
            seed: None,
        }
    }

    pub fn from_config(config: WorkerConfig, channel: WorkerChannel) -> Self {
        let mut optimizer = Self::new(
            config.name,
            config.knobs,
            channel,
            config.engine,
            config.max_eval,
        )
        .with_warm_start(config.x0, config.y0)
        .with_random_starts(Some(config.n_random_starts))
        .with_split_count(config.split_count);
        optimizer.seed = config.seed;
        optimizer
    }

    pub fn with_warm_start(mut self, x0: Option<Vec<Vec<String>>>, y0: Option<Vec<Value>>) -> Self {
        self.x0 = x0;
        self.y0 = y0;
        self
    }

    /// `None` keeps the default random-start count.
    pub fn with_random_starts(mut self, n: Option<usize>) -> Self {
        self.random_starts = n.unwrap_or(DEFAULT_RANDOM_STARTS);
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

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Run to completion on the calling thread.
    ///
    /// Returns the best parameters, or `None` after a failure message has been
    /// sent.
    pub fn run(&mut self) -> Option<Configuration> {
        match self.execute() {
            Ok(best) => Some(best),
            Err(err) => {
                let report = err.report();
                error!(worker = %self.name, kind = ?err.class(), error = %report, "tuning failed");
                self.status.mark_failed(report);
                if let Err(send_err) = self.channel.send(WorkerMessage::failure(&err)) {
                    warn!(worker = %self.name, error = %send_err, "failure could not be reported");
                }
                None
            }
        }
    }

    fn execute(&mut self) -> TuneResult<Configuration> {
        let space = build_space(&self.knobs)?;
        self.status.mark_space_built();

        let transferred = WarmStartTransfer::new(&self.knobs, &space)
            .transfer(self.x0.as_deref(), self.y0.as_deref())?;
        let seeds = if transferred.is_empty() {
            Seeds::unscored(vec![space.reference.clone()])
        } else {
            Seeds::scored(transferred.vectors, transferred.scores)
        };
        let random_starts = adjusted_random_starts(seeds.len(), self.random_starts);
        info!(x0 = ?seeds.points, y0 = ?seeds.scores, random_starts, "warm start resolved");
        self.status.mark_warm_start_resolved();

        let problem = SearchProblem {
            knobs: &self.knobs,
            dimensions: &space.dimensions,
            reference: &space.reference,
            budget: self.max_eval,
            seeds: &seeds,
            random_starts,
            split_count: self.split_count,
        };
        self.status.mark_searching();
        let mut history = TrialHistory::new();
        let dispatched = EngineDispatcher::new(self.engine, self.seed).dispatch(
            &problem,
            &self.channel,
            &mut history,
        );
        self.status.absorb(&history);

        match dispatched? {
            DispatchOutcome::Reported(best) => {
                info!(worker = %self.name, params = %best, "optimized result reported");
                self.status.mark_reported(false);
                Ok(best)
            }
            DispatchOutcome::Completed(best) => {
                info!(worker = %self.name, params = %best, "optimized result");
                let names: Vec<String> = self.knobs.iter().map(|k| k.name.clone()).collect();
                let rank = FeatureImportanceRanker::new()
                    .rank(&history.points(), &history.costs(), &names)?
                    .to_string();
                self.channel
                    .send(WorkerMessage::finished(best.clone(), Some(rank.clone())))?;
                info!(worker = %self.name, %rank, "feature importances of current evaluation");
                self.status.mark_reported(true);
                Ok(best)
            }
        }
    }

    /// Run on a dedicated thread named after the worker.
    pub fn spawn(self) -> TuneResult<OptimizerHandle> {
        let name = self.name.clone();
        let thread = thread::Builder::new().name(name.clone()).spawn(move || {
            let mut worker = self;
            let best = worker.run();
            WorkerExit {
                best,
                status: worker.status,
            }
        })?;
        Ok(OptimizerHandle { name, thread })
    }
}

/// What a worker thread leaves behind.
#[derive(Debug, Clone)]
pub struct WorkerExit {
    pub best: Option<Configuration>,
    pub status: RunStatus,
}

/// Handle to a spawned worker.
#[derive(Debug)]
pub struct OptimizerHandle {
    name: String,
    thread: JoinHandle<WorkerExit>,
}

impl OptimizerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn join(self) -> TuneResult<WorkerExit> {
        self.thread
            .join()
            .map_err(|_| internal_error!("worker {} panicked", self.name))
    }

    /// Hang up the controller side and wait for the worker to wind down. A
    /// worker blocked on a reply fails immediately; one busy inside an engine
    /// fails at its next channel operation.
    pub fn stop(self, controller: ControllerChannel) -> TuneResult<WorkerExit> {
        info!(worker = %self.name, "stopping worker");
        controller.close();
        self.join()
    }
}
