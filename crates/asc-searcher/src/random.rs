//! Random search: every trial trains straight to the full length.

use std::collections::HashMap;

use asc_types::{BracketConfig, Operation, SearchResult, TrialId};

use crate::bracket::AshaBracket;
use crate::method::{SearchContext, SearchMethod};

/// Random search expressed as a single-rung bracket: no intermediate
/// validations, no pruning, every trial runs to `max_length` and is judged
/// once.
pub struct RandomSearch {
    bracket: AshaBracket,
}

impl RandomSearch {
    pub fn new(config: BracketConfig) -> SearchResult<Self> {
        let bracket = AshaBracket::new(BracketConfig {
            num_rungs: 1,
            ..config
        })?;
        Ok(Self { bracket })
    }

    pub fn trial_count(&self) -> usize {
        self.bracket.trial_count()
    }

    pub fn is_finished(&self) -> bool {
        self.bracket.is_finished()
    }
}

impl SearchMethod for RandomSearch {
    fn initial_operations(&mut self, ctx: &mut SearchContext) -> SearchResult<Vec<Operation>> {
        self.bracket.initial_operations(ctx)
    }

    fn validation_completed(
        &mut self,
        ctx: &mut SearchContext,
        trial_id: TrialId,
        metrics: &HashMap<String, f64>,
    ) -> SearchResult<Vec<Operation>> {
        self.bracket.validation_completed(ctx, trial_id, metrics)
    }

    fn trial_exited_early(
        &mut self,
        ctx: &mut SearchContext,
        trial_id: TrialId,
    ) -> SearchResult<Vec<Operation>> {
        self.bracket.trial_exited_early(ctx, trial_id)
    }

    fn progress(&self) -> f64 {
        self.bracket.progress()
    }
}
