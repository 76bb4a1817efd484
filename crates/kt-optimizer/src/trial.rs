//! Trial tracking and run lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique run identifier.
pub type RunId = Uuid;

// ---------------------------------------------------------------------------
// Individual trial
// ---------------------------------------------------------------------------

/// One evaluated search point. Lower cost is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// 1-based position in the run.
    pub number: usize,
    pub point: Vec<f64>,
    pub cost: f64,
    pub evaluated_at: DateTime<Utc>,
}

/// Every trial of a run, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialHistory {
    trials: Vec<Trial>,
}

impl TrialHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a history from externally collected observations.
    pub fn from_observations(points: Vec<Vec<f64>>, costs: &[f64]) -> Self {
        let mut history = Self::new();
        for (point, cost) in points.into_iter().zip(costs) {
            history.record(point, *cost);
        }
        history
    }

    pub fn record(&mut self, point: Vec<f64>, cost: f64) -> &Trial {
        let number = self.trials.len() + 1;
        self.trials.push(Trial {
            number,
            point,
            cost,
            evaluated_at: Utc::now(),
        });
        &self.trials[number - 1]
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trial> {
        self.trials.iter()
    }

    pub fn points(&self) -> Vec<Vec<f64>> {
        self.trials.iter().map(|t| t.point.clone()).collect()
    }

    pub fn costs(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.cost).collect()
    }

    /// Lowest-cost trial; the earliest wins ties.
    pub fn best(&self) -> Option<&Trial> {
        self.trials.iter().fold(None, |best: Option<&Trial>, trial| match best {
            Some(current) if current.cost <= trial.cost => Some(current),
            _ => Some(trial),
        })
    }
}

// ---------------------------------------------------------------------------
// Run lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Configured,
    SpaceBuilt,
    WarmStartResolved,
    Searching,
    /// Final result sent together with a feature ranking.
    RankedAndReported,
    /// Final result sent by an engine that skips ranking.
    ReportedAndDone,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::RankedAndReported | Self::ReportedAndDone | Self::Failed
        )
    }
}

/// Aggregate status of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub id: RunId,
    pub name: String,
    pub engine: String,
    pub state: RunState,
    pub trials_completed: usize,
    pub best_trial: Option<Trial>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl RunStatus {
    pub fn new(name: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            engine: engine.into(),
            state: RunState::Configured,
            trials_completed: 0,
            best_trial: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_space_built(&mut self) {
        self.state = RunState::SpaceBuilt;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_warm_start_resolved(&mut self) {
        self.state = RunState::WarmStartResolved;
    }

    pub fn mark_searching(&mut self) {
        self.state = RunState::Searching;
    }

    /// Take the trial count and best trial from `history`.
    pub fn absorb(&mut self, history: &TrialHistory) {
        self.trials_completed = history.len();
        self.best_trial = history.best().cloned();
    }

    pub fn mark_reported(&mut self, ranked: bool) {
        self.state = if ranked {
            RunState::RankedAndReported
        } else {
            RunState::ReportedAndDone
        };
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = RunState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_numbers_trials_from_one() {
        let mut history = TrialHistory::new();
        assert!(history.best().is_none());

        assert_eq!(history.record(vec![1.0], 4.0).number, 1);
        assert_eq!(history.record(vec![2.0], 1.5).number, 2);
        assert_eq!(history.record(vec![3.0], 1.5).number, 3);

        assert_eq!(history.len(), 3);
        assert_eq!(history.points(), vec![vec![1.0], vec![2.0], vec![3.0]]);
        assert_eq!(history.costs(), vec![4.0, 1.5, 1.5]);
        assert_eq!(history.best().unwrap().number, 2);
    }

    #[test]
    fn history_from_observations() {
        let history = TrialHistory::from_observations(vec![vec![0.0, 1.0], vec![2.0, 0.0]], &[3.0, 2.0]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.best().unwrap().point, vec![2.0, 0.0]);
    }

    #[test]
    fn run_status_lifecycle() {
        let mut status = RunStatus::new("tuning-1", "bayes");
        assert_eq!(status.state, RunState::Configured);
        assert!(status.started_at.is_none());

        status.mark_space_built();
        status.mark_warm_start_resolved();
        status.mark_searching();
        assert_eq!(status.state, RunState::Searching);
        assert!(!status.state.is_terminal());

        let mut history = TrialHistory::new();
        history.record(vec![1.0], 2.0);
        history.record(vec![3.0], 0.5);
        status.absorb(&history);
        assert_eq!(status.trials_completed, 2);
        assert_eq!(status.best_trial.as_ref().unwrap().cost, 0.5);

        status.mark_reported(true);
        assert_eq!(status.state, RunState::RankedAndReported);
        assert!(status.state.is_terminal());
        assert!(status.finished_at.is_some());
    }

    #[test]
    fn run_failure() {
        let mut status = RunStatus::new("tuning-2", "tpe");
        status.mark_space_built();
        status.mark_failed("the ref value of x is out of range".into());
        assert_eq!(status.state, RunState::Failed);
        assert_eq!(status.error.as_deref(), Some("the ref value of x is out of range"));
    }
}
