//! A rung: validation results observed at one training length.

use asc_types::{TrialId, TrialMetric};

/// A bucket of validation results at a fixed training length.
///
/// `metrics` stays sorted ascending by metric (smaller is better after
/// normalization), ties broken by arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Rung {
    /// Cumulative training length at which trials in this rung validate.
    pub length_units: u64,

    /// Trials currently training toward this rung's validation.
    pub outstanding: usize,

    /// Observed results, sorted ascending by metric.
    pub metrics: Vec<TrialMetric>,
}

impl Rung {
    pub fn new(length_units: u64) -> Self {
        Self {
            length_units,
            outstanding: 0,
            metrics: Vec::new(),
        }
    }

    /// Record a validation result and decide which trial, if any, must now
    /// be promoted to the next rung.
    ///
    /// Seeing one more result widens the promoted window by at most one
    /// slot. A new result landing inside the window promotes immediately,
    /// whether or not the window widened; otherwise, when the window did
    /// widen, the result now sitting on its edge is promoted unless it
    /// already was.
    pub fn record_and_promote(
        &mut self,
        trial_id: TrialId,
        metric: f64,
        divisor: f64,
    ) -> Vec<TrialId> {
        let old_window = (self.metrics.len() as f64 / divisor) as usize;
        let new_window = ((self.metrics.len() + 1) as f64 / divisor) as usize;

        // Stable insert: new results rank after equal metrics.
        let insert_at = self.metrics.partition_point(|m| m.metric <= metric);
        let promote_now = insert_at < new_window;
        self.metrics
            .insert(insert_at, TrialMetric::new(trial_id, metric, promote_now));

        if promote_now {
            vec![trial_id]
        } else if new_window > old_window && !self.metrics[old_window].promoted {
            self.metrics[old_window].promoted = true;
            vec![self.metrics[old_window].trial_id]
        } else {
            Vec::new()
        }
    }

    /// Number of recorded results carrying the promoted flag.
    pub fn promoted_count(&self) -> usize {
        self.metrics.iter().filter(|m| m.promoted).count()
    }
}
