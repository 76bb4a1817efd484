//! Duplex channel between the worker and its controller.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use kt_types::{TuneError, TuneResult, WorkerMessage};

/// Worker end: sends suggestions and the final message, receives evaluation
/// results.
#[derive(Debug)]
pub struct WorkerChannel {
    tx: Sender<WorkerMessage>,
    rx: Receiver<String>,
}

/// Controller end: the benchmarking harness and whoever waits for the result.
#[derive(Debug)]
pub struct ControllerChannel {
    tx: Sender<String>,
    rx: Receiver<WorkerMessage>,
}

/// Create a connected pair of endpoints.
pub fn duplex() -> (WorkerChannel, ControllerChannel) {
    let (to_controller, from_worker) = unbounded();
    let (to_worker, from_controller) = unbounded();
    (
        WorkerChannel {
            tx: to_controller,
            rx: from_controller,
        },
        ControllerChannel {
            tx: to_worker,
            rx: from_worker,
        },
    )
}

impl WorkerChannel {
    pub fn send(&self, message: WorkerMessage) -> TuneResult<()> {
        self.tx
            .send(message)
            .map_err(|_| TuneError::ChannelClosed("controller hung up before receiving".into()))
    }

    /// Block until the controller replies.
    pub fn recv(&self) -> TuneResult<String> {
        self.rx
            .recv()
            .map_err(|_| TuneError::ChannelClosed("controller hung up before replying".into()))
    }
}

impl ControllerChannel {
    /// Next worker message, or `None` once the worker has exited.
    pub fn recv(&self) -> Option<WorkerMessage> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> TuneResult<Option<WorkerMessage>> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(TuneError::ChannelClosed("worker exited".into()))
            }
        }
    }

    /// Answer the pending suggestion with a comma-separated measurement list.
    pub fn reply(&self, result: impl Into<String>) -> TuneResult<()> {
        self.tx
            .send(result.into())
            .map_err(|_| TuneError::ChannelClosed("worker exited before the reply".into()))
    }

    /// Hang up. The worker fails on its next channel operation.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kt_types::{Configuration, ParamValue};

    #[test]
    fn messages_cross_in_both_directions() {
        let (worker, controller) = duplex();
        let mut param = Configuration::new();
        param.insert("x", ParamValue::Int(3));

        worker.send(WorkerMessage::suggested(param.clone())).unwrap();
        let message = controller.recv().unwrap();
        assert_eq!(message.param(), Some(&param));
        assert!(!message.is_terminal());

        controller.reply("1.5,2").unwrap();
        assert_eq!(worker.recv().unwrap(), "1.5,2");
    }

    #[test]
    fn hang_up_is_observed_by_both_sides() {
        let (worker, controller) = duplex();
        controller.close();
        assert!(matches!(worker.recv(), Err(TuneError::ChannelClosed(_))));
        assert!(matches!(
            worker.send(WorkerMessage::finished(Configuration::new(), None)),
            Err(TuneError::ChannelClosed(_))
        ));

        let (worker, controller) = duplex();
        drop(worker);
        assert!(controller.recv().is_none());
        assert!(controller.reply("1").is_err());
        assert!(controller.recv_timeout(Duration::from_millis(5)).is_err());
    }
}
