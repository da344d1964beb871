//! The capability set shared by all search methods.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

use asc_types::{Operation, ParameterValue, SearchResult, SearchSpace, TrialId};

use crate::sampler::{RandomSampler, Sampler};

/// Per-experiment context shared by every bracket: the hyperparameter space,
/// the sampler, a seeded rng, and the monotonic trial id counter.
///
/// Replaying the same event stream against the same seed reproduces the
/// trial ids and hyperparameters bit for bit.
pub struct SearchContext {
    space: SearchSpace,
    sampler: Box<dyn Sampler>,
    rng: StdRng,
    next_trial: u64,
}

impl SearchContext {
    /// Create a context with the default random sampler.
    pub fn new(space: SearchSpace, seed: u64) -> Self {
        Self::with_sampler(space, Box::new(RandomSampler), seed)
    }

    pub fn with_sampler(space: SearchSpace, sampler: Box<dyn Sampler>, seed: u64) -> Self {
        Self {
            space,
            sampler,
            rng: StdRng::seed_from_u64(seed),
            next_trial: 0,
        }
    }

    /// Draw a hyperparameter point for a new trial.
    pub fn sample(&mut self) -> HashMap<String, ParameterValue> {
        self.sampler.sample(&self.space, &mut self.rng)
    }

    /// Allocate the next globally unique trial id.
    pub fn next_trial_id(&mut self) -> TrialId {
        let id = TrialId::new(self.next_trial);
        self.next_trial += 1;
        id
    }
}

/// Event-driven interface between a search method and the orchestrator.
///
/// The orchestrator calls `initial_operations` once to seed trials, then
/// reports each completed validation or early exit. Every call returns a
/// batch of operations the orchestrator must execute in the emitted order;
/// the method itself never blocks, spawns threads, or performs I/O.
pub trait SearchMethod {
    /// Seed the experiment with its initial trials.
    fn initial_operations(&mut self, ctx: &mut SearchContext) -> SearchResult<Vec<Operation>>;

    /// Handle a completed validation for `trial_id`.
    fn validation_completed(
        &mut self,
        ctx: &mut SearchContext,
        trial_id: TrialId,
        metrics: &HashMap<String, f64>,
    ) -> SearchResult<Vec<Operation>>;

    /// Handle a trial that terminated without a usable metric.
    fn trial_exited_early(
        &mut self,
        ctx: &mut SearchContext,
        trial_id: TrialId,
    ) -> SearchResult<Vec<Operation>>;

    /// Fraction of the search completed, in [0, 1].
    fn progress(&self) -> f64;
}
