//! Trial identity and per-rung validation records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique trial identifier, assigned from a monotonic per-experiment counter
/// so that replays with the same seed produce the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrialId(u64);

impl TrialId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trial-{}", self.0)
    }
}

/// A validation result recorded in a rung.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialMetric {
    pub trial_id: TrialId,

    /// Scalar validation value, normalized so that smaller is better.
    pub metric: f64,

    /// The trial has been selected to advance to the next rung.
    pub promoted: bool,

    /// The trial has been closed out of this rung.
    pub closed: bool,
}

impl TrialMetric {
    pub fn new(trial_id: TrialId, metric: f64, promoted: bool) -> Self {
        Self {
            trial_id,
            metric,
            promoted,
            closed: false,
        }
    }
}
