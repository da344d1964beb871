//! Simulated adaptive hyperparameter sweep.
//!
//! Plays the orchestrator's role: executes the scheduler's operation stream
//! against a synthetic training curve and reports the best configuration.

use std::collections::{HashMap, VecDeque};

use asc_searcher::{AdaptiveSearch, SearchContext, SearchMethod};
use asc_types::{AdaptiveConfig, AdaptiveMode, Operation, ParameterValue, SearchSpace, TrialId};

/// Synthetic validation loss: better near lr = 1e-2, improving with length.
fn simulated_loss(hparams: &HashMap<String, ParameterValue>, at_length: u64) -> f64 {
    let lr = match hparams.get("lr") {
        Some(ParameterValue::Float(v)) => *v,
        _ => 1e-3,
    };
    let misfit = (lr.ln() - 1e-2f64.ln()).abs();
    1.0 + misfit / (1.0 + (at_length as f64).sqrt() * 0.3)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let space = SearchSpace::new()
        .add_log_uniform("lr", 1e-5, 1e-1)
        .add_int("batch_size", 16, 256);

    let config = AdaptiveConfig::new("val_loss", 64, 1024)
        .with_mode(AdaptiveMode::Standard)
        .with_max_rungs(4);

    let mut search = AdaptiveSearch::new(config)?;
    let mut ctx = SearchContext::new(space, 42);

    println!("Ascent adaptive sweep: {} brackets", search.brackets().len());
    for bracket in search.brackets() {
        println!(
            "  ladder depth {} -> up to {} trials",
            bracket.config().num_rungs,
            bracket.config().max_trials
        );
    }

    let mut hparams_of: HashMap<TrialId, HashMap<String, ParameterValue>> = HashMap::new();
    let mut pending: VecDeque<(TrialId, u64)> = VecDeque::new();
    let mut executed = 0usize;

    fn absorb(
        ops: Vec<Operation>,
        hparams_of: &mut HashMap<TrialId, HashMap<String, ParameterValue>>,
        pending: &mut VecDeque<(TrialId, u64)>,
    ) {
        for op in ops {
            match op {
                Operation::Create {
                    trial_id, hparams, ..
                } => {
                    hparams_of.insert(trial_id, hparams);
                }
                Operation::Validate {
                    trial_id,
                    at_length,
                } => pending.push_back((trial_id, at_length)),
                _ => {}
            }
        }
    }

    let ops = search.initial_operations(&mut ctx)?;
    absorb(ops, &mut hparams_of, &mut pending);

    while let Some((trial_id, at_length)) = pending.pop_front() {
        let loss = simulated_loss(&hparams_of[&trial_id], at_length);
        let metrics = HashMap::from([("val_loss".to_string(), loss)]);
        let ops = search.validation_completed(&mut ctx, trial_id, &metrics)?;
        absorb(ops, &mut hparams_of, &mut pending);
        executed += 1;
    }

    println!(
        "executed {} validations over {} trials (progress {:.2})",
        executed,
        search.trial_count(),
        search.progress()
    );

    if let Some(best) = search.status().best_trial {
        println!("best trial: {} (val_loss {:.4})", best.trial_id, best.metric);
        if let Some(hparams) = hparams_of.get(&best.trial_id) {
            let mut names: Vec<&String> = hparams.keys().collect();
            names.sort();
            for name in names {
                println!("  {name} = {}", hparams[name]);
            }
        }
    }

    Ok(())
}
