//! # kt-optimizer
//!
//! Knob tuning worker.
//!
//! Turns declarative knob lists into numeric search spaces, resolves warm-start
//! trials, drives one of the engines from `kt-engines` against an external
//! benchmarking harness over a duplex channel, and ranks knobs by their
//! influence on the measured cost.

mod bridge;
mod channel;
mod config;
mod dispatch;
mod importance;
mod space;
mod trial;
mod warm_start;
mod worker;

pub use bridge::{aggregate_measurements, ObjectiveBridge};
pub use channel::{duplex, ControllerChannel, WorkerChannel};
pub use config::WorkerConfig;
pub use dispatch::{DispatchOutcome, EngineDispatcher, EngineKind};
pub use importance::{FeatureImportanceRanker, FeatureRanking, RankedFeature};
pub use space::{build_space, KnobSpace, KnobSpaceBuilder};
pub use trial::{RunId, RunState, RunStatus, Trial, TrialHistory};
pub use warm_start::{adjusted_random_starts, TransferredTrials, WarmStartTransfer};
pub use worker::{Optimizer, OptimizerHandle, WorkerExit};
