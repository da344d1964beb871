//! Experiment-level bookkeeping maintained by the driver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::trial::TrialId;

/// Unique experiment identifier.
pub type ExperimentId = Uuid;

/// Lifecycle state of a search experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperimentState {
    Pending,
    Running,
    Completed,
}

/// Best trial observed so far, in raw (un-normalized) metric space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestTrial {
    pub trial_id: TrialId,
    pub metric: f64,
}

/// Aggregate status of a running experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentStatus {
    pub id: ExperimentId,
    pub state: ExperimentState,
    pub trials_created: usize,
    pub trials_closed: usize,
    pub best_trial: Option<BestTrial>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExperimentStatus {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ExperimentState::Pending,
            trials_created: 0,
            trials_closed: 0,
            best_trial: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = ExperimentState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.state = ExperimentState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn record_created(&mut self) {
        self.trials_created += 1;
    }

    pub fn record_closed(&mut self) {
        self.trials_closed += 1;
    }

    /// Update the best trial if `raw_metric` improves on the current best.
    /// NaN observations are ignored.
    pub fn record_observation(&mut self, trial_id: TrialId, raw_metric: f64, smaller_is_better: bool) {
        if raw_metric.is_nan() {
            return;
        }
        let improved = match &self.best_trial {
            None => true,
            Some(best) => {
                if smaller_is_better {
                    raw_metric < best.metric
                } else {
                    raw_metric > best.metric
                }
            }
        };
        if improved {
            self.best_trial = Some(BestTrial {
                trial_id,
                metric: raw_metric,
            });
        }
    }
}

impl Default for ExperimentStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_status_lifecycle() {
        let mut status = ExperimentStatus::new();
        assert_eq!(status.state, ExperimentState::Pending);
        assert!(status.started_at.is_none());

        status.mark_running();
        assert_eq!(status.state, ExperimentState::Running);
        assert!(status.started_at.is_some());

        status.mark_completed();
        assert_eq!(status.state, ExperimentState::Completed);
        assert!(status.finished_at.is_some());
    }

    #[test]
    fn best_trial_tracking_minimize() {
        let mut status = ExperimentStatus::new();

        status.record_observation(TrialId::new(0), 0.15, true);
        assert_eq!(status.best_trial.unwrap().metric, 0.15);

        status.record_observation(TrialId::new(1), 0.05, true);
        assert_eq!(status.best_trial.unwrap().metric, 0.05);
        assert_eq!(status.best_trial.unwrap().trial_id, TrialId::new(1));

        // Worse result should not replace
        status.record_observation(TrialId::new(2), 0.30, true);
        assert_eq!(status.best_trial.unwrap().metric, 0.05);
    }

    #[test]
    fn best_trial_tracking_maximize() {
        let mut status = ExperimentStatus::new();

        status.record_observation(TrialId::new(0), 0.80, false);
        status.record_observation(TrialId::new(1), 0.90, false);
        status.record_observation(TrialId::new(2), 0.85, false);
        assert_eq!(status.best_trial.unwrap().trial_id, TrialId::new(1));
        assert_eq!(status.best_trial.unwrap().metric, 0.90);
    }

    #[test]
    fn nan_observation_is_ignored() {
        let mut status = ExperimentStatus::new();
        status.record_observation(TrialId::new(0), f64::NAN, true);
        assert!(status.best_trial.is_none());

        status.record_observation(TrialId::new(1), 1.0, true);
        status.record_observation(TrialId::new(2), f64::NAN, true);
        assert_eq!(status.best_trial.unwrap().trial_id, TrialId::new(1));
    }

    #[test]
    fn trial_counters() {
        let mut status = ExperimentStatus::new();
        status.record_created();
        status.record_created();
        status.record_closed();
        assert_eq!(status.trials_created, 2);
        assert_eq!(status.trials_closed, 1);
    }
}
