//! The objective engines minimize: one round trip to the benchmarking harness
//! per evaluation.

use tracing::debug;

use kt_engines::Objective;
use kt_types::{decode_point, Configuration, KnobSpec, TuneError, TuneResult, WorkerMessage};

use crate::channel::WorkerChannel;
use crate::trial::TrialHistory;

pub struct ObjectiveBridge<'a> {
    knobs: &'a [KnobSpec],
    channel: &'a WorkerChannel,
    history: &'a mut TrialHistory,
}

impl<'a> ObjectiveBridge<'a> {
    pub fn new(
        knobs: &'a [KnobSpec],
        channel: &'a WorkerChannel,
        history: &'a mut TrialHistory,
    ) -> Self {
        Self {
            knobs,
            channel,
            history,
        }
    }

    fn round_trip(&self, configuration: Configuration) -> TuneResult<f64> {
        self.channel.send(WorkerMessage::suggested(configuration))?;
        let reply = self.channel.recv()?;
        aggregate_measurements(&reply)
    }
}

impl Objective for ObjectiveBridge<'_> {
    fn evaluate(&mut self, point: &[f64]) -> TuneResult<f64> {
        let configuration = decode_point(self.knobs, point)?;
        let cost = self.round_trip(configuration)?;
        let trial = self.history.record(point.to_vec(), cost);
        debug!(trial = trial.number, cost, "evaluation recorded");
        Ok(cost)
    }

    fn exchange(&mut self, configuration: &Configuration) -> TuneResult<f64> {
        let cost = self.round_trip(configuration.clone())?;
        debug!(%configuration, cost, "named evaluation");
        Ok(cost)
    }
}

/// Sum of a comma-separated list of measurements.
pub fn aggregate_measurements(reply: &str) -> TuneResult<f64> {
    reply.split(',').try_fold(0.0, |total, raw| {
        let raw = raw.trim();
        raw.parse::<f64>()
            .map(|value| total + value)
            .map_err(|_| TuneError::Protocol(format!("the evaluation result {raw:?} is not a number")))
    })
}
