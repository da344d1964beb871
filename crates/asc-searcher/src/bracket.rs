//! A single asynchronous successive halving (ASHA) bracket.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use asc_types::{
    train_and_validate, BracketConfig, Operation, SearchError, SearchResult, SequencerKind, TrialId,
};

use crate::method::{SearchContext, SearchMethod};
use crate::rung::Rung;

/// Metric recorded for trials that terminated without a usable validation
/// value; ranks after every real result.
pub const EXITED_METRIC: f64 = f64::INFINITY;

/// One ASHA searcher: a fixed ladder of rungs, a trial cap, and the
/// event-driven promotion logic between them.
///
/// Each rung validates at a training length `divisor` times longer than the
/// one below it, and keeps roughly `1/divisor` of its trials. Promotions are
/// decided per arriving validation rather than at rung boundaries, so the
/// bracket never waits for a full cohort. The bracket runs until
/// `max_trials` trials have been created and every rung has drained.
pub struct AshaBracket {
    config: BracketConfig,
    rungs: Vec<Rung>,
    trial_rungs: HashMap<TrialId, usize>,
    early_exits: HashSet<TrialId>,
    trials_completed: usize,
}

impl AshaBracket {
    pub fn new(config: BracketConfig) -> SearchResult<Self> {
        config.validate()?;
        let rungs = (0..config.num_rungs)
            .map(|k| {
                let downsampling = config.divisor.powi((config.num_rungs - 1 - k) as i32);
                let length = ((config.max_length as f64 / downsampling) as u64).max(1);
                Rung::new(length)
            })
            .collect();
        Ok(Self {
            config,
            rungs,
            trial_rungs: HashMap::new(),
            early_exits: HashSet::new(),
            trials_completed: 0,
        })
    }

    pub fn config(&self) -> &BracketConfig {
        &self.config
    }

    pub fn rungs(&self) -> &[Rung] {
        &self.rungs
    }

    /// Number of trials created so far.
    pub fn trial_count(&self) -> usize {
        self.trial_rungs.len()
    }

    /// Rung a trial currently occupies, if this bracket owns it.
    pub fn rung_of(&self, trial_id: TrialId) -> Option<usize> {
        self.trial_rungs.get(&trial_id).copied()
    }

    pub fn trials_completed(&self) -> usize {
        self.trials_completed
    }

    /// The bracket is quiescent: trial cap reached and every rung drained.
    pub fn is_finished(&self) -> bool {
        self.trial_rungs.len() == self.config.max_trials
            && self.rungs.iter().all(|r| r.outstanding == 0)
    }

    fn create_trial(&mut self, ctx: &mut SearchContext) -> Vec<Operation> {
        let trial_id = ctx.next_trial_id();
        let hparams = ctx.sample();
        self.rungs[0].outstanding += 1;
        self.trial_rungs.insert(trial_id, 0);
        debug!(%trial_id, length = self.rungs[0].length_units, "creating trial");

        let mut ops = vec![Operation::Create {
            trial_id,
            hparams,
            sequencer: SequencerKind::TrialWorkload,
        }];
        ops.extend(train_and_validate(trial_id, 0, self.rungs[0].length_units));
        ops
    }

    /// Settle a validated (or exited) trial at its rung, promote whichever
    /// trial the rung selects, and keep the bracket fed.
    ///
    /// Early-exited trials selected for promotion are carried upward at the
    /// exited metric until they reach the top rung, as if they had trained
    /// and returned the worst possible result at every level. After the
    /// carry chain settles, a fresh trial is created unless this event
    /// produced new training work or the cap is reached, and once the cap is
    /// reached the drained lower rungs are closed out.
    fn promote(&mut self, trial_id: TrialId, metric: f64, ctx: &mut SearchContext) -> Vec<Operation> {
        let mut ops = Vec::new();
        let mut added_training = false;
        let mut current = Some((trial_id, metric));

        while let Some((tid, m)) = current.take() {
            let rung_index = self.trial_rungs[&tid];
            self.rungs[rung_index].outstanding = self.rungs[rung_index].outstanding.saturating_sub(1);

            if rung_index == self.config.num_rungs - 1 {
                self.trials_completed += 1;
                if !self.early_exits.contains(&tid) {
                    debug!(trial_id = %tid, "trial finished top rung");
                    ops.push(Operation::Close { trial_id: tid });
                }
                continue;
            }

            for pid in self.rungs[rung_index].record_and_promote(tid, m, self.config.divisor) {
                debug!(trial_id = %pid, to_rung = rung_index + 1, "promoting trial");
                self.trial_rungs.insert(pid, rung_index + 1);
                self.rungs[rung_index + 1].outstanding += 1;
                if self.early_exits.contains(&pid) {
                    current = Some((pid, EXITED_METRIC));
                } else {
                    ops.extend(train_and_validate(
                        pid,
                        self.rungs[rung_index].length_units,
                        self.rungs[rung_index + 1].length_units,
                    ));
                    added_training = true;
                }
            }
        }

        let all_trials = self.trial_rungs.len();
        if !added_training && all_trials < self.config.max_trials {
            ops.extend(self.create_trial(ctx));
        }
        // Stragglers are only closed out once the bracket has spawned its
        // full exploration set.
        if all_trials == self.config.max_trials {
            ops.extend(self.close_out_rungs());
        }
        ops
    }

    /// Close every unpromoted trial in rungs that have fully drained,
    /// walking bottom-up and stopping at the first rung still waiting on
    /// results.
    fn close_out_rungs(&mut self) -> Vec<Operation> {
        let mut ops = Vec::new();
        for rung in &mut self.rungs {
            if rung.outstanding > 0 {
                break;
            }
            for entry in rung.metrics.iter_mut() {
                if !entry.promoted && !entry.closed {
                    entry.closed = true;
                    self.trials_completed += 1;
                    if !self.early_exits.contains(&entry.trial_id) {
                        ops.push(Operation::Close {
                            trial_id: entry.trial_id,
                        });
                    }
                }
            }
        }
        ops
    }
}

impl SearchMethod for AshaBracket {
    fn initial_operations(&mut self, ctx: &mut SearchContext) -> SearchResult<Vec<Operation>> {
        // Initial concurrency controls the parallelism of the whole search:
        // every validation that produces no promotion refills one trial
        // until the cap is reached.
        let concurrency = if self.config.max_concurrent_trials > 0 {
            self.config.max_concurrent_trials.min(self.config.max_trials)
        } else {
            // Wide enough to carry at least one trial to the top rung.
            let full_width = self.config.divisor.powi(self.config.num_rungs as i32 - 1);
            (full_width.min(self.config.max_trials as f64) as usize).max(1)
        };
        debug!(concurrency, "seeding bracket");

        let mut ops = Vec::new();
        for _ in 0..concurrency {
            ops.extend(self.create_trial(ctx));
        }
        Ok(ops)
    }

    fn validation_completed(
        &mut self,
        ctx: &mut SearchContext,
        trial_id: TrialId,
        metrics: &HashMap<String, f64>,
    ) -> SearchResult<Vec<Operation>> {
        if !self.trial_rungs.contains_key(&trial_id) {
            return Err(SearchError::UnknownTrial { trial_id });
        }
        let raw = *metrics
            .get(&self.config.metric)
            .ok_or_else(|| SearchError::MissingMetric {
                metric: self.config.metric.clone(),
            })?;
        let metric = if self.config.smaller_is_better { raw } else { -raw };

        if metric.is_nan() {
            // Unorderable result: rank the trial as if it had exited early.
            self.early_exits.insert(trial_id);
            return Ok(self.promote(trial_id, EXITED_METRIC, ctx));
        }
        Ok(self.promote(trial_id, metric, ctx))
    }

    fn trial_exited_early(
        &mut self,
        ctx: &mut SearchContext,
        trial_id: TrialId,
    ) -> SearchResult<Vec<Operation>> {
        if !self.trial_rungs.contains_key(&trial_id) {
            return Err(SearchError::UnknownTrial { trial_id });
        }
        debug!(%trial_id, "trial exited early");
        self.early_exits.insert(trial_id);
        Ok(self.promote(trial_id, EXITED_METRIC, ctx))
    }

    fn progress(&self) -> f64 {
        let all_trials = self.trial_rungs.len();
        // 20% headroom keeps progress from saturating while trials are
        // still being spawned.
        let base =
            (all_trials - self.rungs[0].outstanding) as f64 / (1.2 * self.config.max_trials as f64);
        if all_trials == self.config.max_trials {
            base.max(self.trials_completed as f64 / self.config.max_trials as f64)
        } else {
            base
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use asc_types::SearchSpace;
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;
    use std::collections::VecDeque;

    #[derive(Debug, Clone)]
    struct StreamConfig {
        divisor: f64,
        num_rungs: usize,
        max_length: u64,
        max_trials: usize,
        max_concurrent: usize,
    }

    fn stream_config() -> impl Strategy<Value = StreamConfig> {
        (
            2.0f64..5.0,
            1usize..4,
            1u64..64,
            1usize..24,
            0usize..6,
        )
            .prop_map(
                |(divisor, num_rungs, max_length, max_trials, max_concurrent)| StreamConfig {
                    divisor,
                    num_rungs,
                    max_length,
                    max_trials,
                    max_concurrent,
                },
            )
    }

    /// Drive a bracket with an arbitrary interleaving of validations and
    /// early exits, checking the structural invariants after every event.
    fn run_stream(cfg: &StreamConfig, events: &[(u8, f64, bool)]) -> Result<(), TestCaseError> {
        let config = BracketConfig::new("loss", cfg.max_length, cfg.max_trials)
            .with_divisor(cfg.divisor)
            .with_num_rungs(cfg.num_rungs)
            .with_max_concurrent(cfg.max_concurrent);
        let mut bracket = AshaBracket::new(config).unwrap();
        let mut ctx = SearchContext::new(SearchSpace::new().add_float("x", 0.0, 1.0), 13);

        let mut pending: VecDeque<TrialId> = VecDeque::new();
        let mut closed: Vec<TrialId> = Vec::new();

        fn absorb(ops: &[Operation], pending: &mut VecDeque<TrialId>, closed: &mut Vec<TrialId>) {
            for op in ops {
                match op {
                    Operation::Validate { trial_id, .. } => pending.push_back(*trial_id),
                    Operation::Close { trial_id } => closed.push(*trial_id),
                    _ => {}
                }
            }
        }

        let ops = bracket.initial_operations(&mut ctx).unwrap();
        absorb(&ops, &mut pending, &mut closed);

        for (selector, metric, exit) in events {
            if pending.is_empty() {
                break;
            }
            let index = *selector as usize % pending.len();
            let trial_id = pending.remove(index).unwrap();
            let ops = if *exit {
                bracket.trial_exited_early(&mut ctx, trial_id).unwrap()
            } else {
                let metrics = HashMap::from([("loss".to_string(), *metric)]);
                bracket
                    .validation_completed(&mut ctx, trial_id, &metrics)
                    .unwrap()
            };
            absorb(&ops, &mut pending, &mut closed);

            // Trial cap holds at all times.
            prop_assert!(bracket.trial_count() <= cfg.max_trials);

            // Rung ladder is clamped, monotone, and topped by max_length.
            let lengths: Vec<u64> = bracket.rungs().iter().map(|r| r.length_units).collect();
            prop_assert_eq!(lengths[cfg.num_rungs - 1], cfg.max_length);
            for pair in lengths.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }

            for rung in bracket.rungs() {
                // Results stay sorted with the promoted window never
                // starved.
                for pair in rung.metrics.windows(2) {
                    prop_assert!(pair[0].metric <= pair[1].metric);
                }
                let window = (rung.metrics.len() as f64 / cfg.divisor) as usize;
                prop_assert!(rung.promoted_count() >= window);
            }

            let progress = bracket.progress();
            prop_assert!((0.0..=1.0).contains(&progress));
        }

        // Each trial is closed at most once across the whole stream.
        let mut unique = closed.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), closed.len());
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn invariants_hold_for_arbitrary_streams(
            cfg in stream_config(),
            events in prop::collection::vec(
                (any::<u8>(), -100.0f64..100.0, prop::bool::weighted(0.2)),
                0..80,
            ),
        ) {
            run_stream(&cfg, &events)?;
        }

        #[test]
        fn driving_to_quiescence_closes_every_real_trial(
            divisor in 2.0f64..5.0,
            num_rungs in 1usize..4,
            metrics in prop::collection::vec(-100.0f64..100.0, 8..32),
        ) {
            let max_trials = metrics.len();
            let config = BracketConfig::new("loss", 27, max_trials)
                .with_divisor(divisor)
                .with_num_rungs(num_rungs)
                .with_max_concurrent(2);
            let mut bracket = AshaBracket::new(config).unwrap();
            let mut ctx = SearchContext::new(SearchSpace::new(), 1);

            let mut pending: VecDeque<TrialId> = VecDeque::new();
            let mut closed = 0usize;
            let mut metric_iter = metrics.iter().cycle();

            for op in bracket.initial_operations(&mut ctx).unwrap() {
                if let Operation::Validate { trial_id, .. } = op {
                    pending.push_back(trial_id);
                }
            }
            while let Some(trial_id) = pending.pop_front() {
                let m = HashMap::from([("loss".to_string(), *metric_iter.next().unwrap())]);
                for op in bracket.validation_completed(&mut ctx, trial_id, &m).unwrap() {
                    match op {
                        Operation::Validate { trial_id, .. } => pending.push_back(trial_id),
                        Operation::Close { .. } => closed += 1,
                        _ => {}
                    }
                }
            }

            prop_assert!(bracket.is_finished());
            prop_assert_eq!(closed, max_trials);
            prop_assert_eq!(bracket.trials_completed(), max_trials);
            prop_assert_eq!(bracket.progress(), 1.0);
        }
    }
}
