//! Adaptive driver composing several ASHA brackets.

use std::collections::HashMap;
use tracing::{debug, info};

use asc_types::{
    AdaptiveConfig, AdaptiveMode, BracketConfig, ExperimentStatus, Operation, SearchError,
    SearchResult, TrialId,
};

use crate::bracket::AshaBracket;
use crate::method::{SearchContext, SearchMethod};

/// Multiplexes several ASHA brackets with different ladder depths over one
/// training budget, routing each trial's events to the bracket that owns it.
///
/// Deep ladders prune hard and cheaply explore many configurations; shallow
/// ladders give every trial more training before judging it. Running a
/// spread of depths hedges against validation curves that cross late.
pub struct AdaptiveSearch {
    config: AdaptiveConfig,
    brackets: Vec<AshaBracket>,
    trial_owner: HashMap<TrialId, usize>,
    status: ExperimentStatus,
}

impl AdaptiveSearch {
    pub fn new(config: AdaptiveConfig) -> SearchResult<Self> {
        config.validate()?;

        let rung_counts = Self::rung_counts(config.mode, config.max_rungs);
        let share = config.budget as f64 / rung_counts.len() as f64;

        let mut brackets = Vec::with_capacity(rung_counts.len());
        for num_rungs in rung_counts {
            let per_trial =
                Self::expected_units_per_trial(config.max_length, config.divisor, num_rungs);
            let max_trials = ((share / per_trial) as usize).max(1);
            info!(num_rungs, max_trials, "spawning bracket");

            brackets.push(AshaBracket::new(BracketConfig {
                divisor: config.divisor,
                num_rungs,
                max_length: config.max_length,
                max_trials,
                max_concurrent_trials: config.max_concurrent_trials,
                metric: config.metric.clone(),
                smaller_is_better: config.smaller_is_better,
            })?);
        }

        Ok(Self {
            config,
            brackets,
            trial_owner: HashMap::new(),
            status: ExperimentStatus::new(),
        })
    }

    /// One ladder depth per bracket, by mode.
    fn rung_counts(mode: AdaptiveMode, max_rungs: usize) -> Vec<usize> {
        match mode {
            AdaptiveMode::Aggressive => vec![max_rungs],
            AdaptiveMode::Standard => (1..=max_rungs).rev().step_by(2).collect(),
            AdaptiveMode::Conservative => (1..=max_rungs).rev().collect(),
        }
    }

    /// Expected training units one trial consumes in a ladder `num_rungs`
    /// deep, assuming geometric survival at rate `1/divisor`.
    fn expected_units_per_trial(max_length: u64, divisor: f64, num_rungs: usize) -> f64 {
        let max_length = max_length as f64;
        max_length * (1.0 - divisor.powi(-(num_rungs as i32))) / (divisor - 1.0) * divisor
            + max_length * divisor.powi(-(num_rungs as i32 - 1))
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    pub fn brackets(&self) -> &[AshaBracket] {
        &self.brackets
    }

    pub fn status(&self) -> &ExperimentStatus {
        &self.status
    }

    /// Global cap on the number of trials across all brackets.
    pub fn max_trials(&self) -> usize {
        self.brackets.iter().map(|b| b.config().max_trials).sum()
    }

    /// Number of trials created so far across all brackets.
    pub fn trial_count(&self) -> usize {
        self.trial_owner.len()
    }

    /// Every bracket has reached its cap and drained its rungs.
    pub fn is_finished(&self) -> bool {
        self.brackets.iter().all(|b| b.is_finished())
    }

    /// Tag freshly created trials with the bracket that owns them and keep
    /// the aggregate counters current.
    fn absorb_operations(&mut self, bracket_index: usize, ops: &[Operation]) {
        for op in ops {
            match op {
                Operation::Create { trial_id, .. } => {
                    self.trial_owner.insert(*trial_id, bracket_index);
                    self.status.record_created();
                }
                Operation::Close { .. } => self.status.record_closed(),
                _ => {}
            }
        }
    }
}

impl SearchMethod for AdaptiveSearch {
    fn initial_operations(&mut self, ctx: &mut SearchContext) -> SearchResult<Vec<Operation>> {
        self.status.mark_running();
        let mut ops = Vec::new();
        for index in 0..self.brackets.len() {
            let batch = self.brackets[index].initial_operations(ctx)?;
            self.absorb_operations(index, &batch);
            ops.extend(batch);
        }
        Ok(ops)
    }

    fn validation_completed(
        &mut self,
        ctx: &mut SearchContext,
        trial_id: TrialId,
        metrics: &HashMap<String, f64>,
    ) -> SearchResult<Vec<Operation>> {
        let index = *self
            .trial_owner
            .get(&trial_id)
            .ok_or(SearchError::UnknownTrial { trial_id })?;
        debug!(%trial_id, bracket = index, "routing validation");

        let ops = self.brackets[index].validation_completed(ctx, trial_id, metrics)?;
        if let Some(raw) = metrics.get(&self.config.metric) {
            self.status
                .record_observation(trial_id, *raw, self.config.smaller_is_better);
        }
        self.absorb_operations(index, &ops);
        if self.is_finished() {
            self.status.mark_completed();
        }
        Ok(ops)
    }

    fn trial_exited_early(
        &mut self,
        ctx: &mut SearchContext,
        trial_id: TrialId,
    ) -> SearchResult<Vec<Operation>> {
        let index = *self
            .trial_owner
            .get(&trial_id)
            .ok_or(SearchError::UnknownTrial { trial_id })?;
        debug!(%trial_id, bracket = index, "routing early exit");

        let ops = self.brackets[index].trial_exited_early(ctx, trial_id)?;
        self.absorb_operations(index, &ops);
        if self.is_finished() {
            self.status.mark_completed();
        }
        Ok(ops)
    }

    fn progress(&self) -> f64 {
        let total: f64 = self.brackets.iter().map(|b| b.progress()).sum();
        total / self.brackets.len() as f64
    }
}
