//! The operation stream the scheduler hands to the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::space::ParameterValue;
use crate::trial::TrialId;

/// How the orchestrator sequences a trial's workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SequencerKind {
    #[default]
    TrialWorkload,
}

/// An instruction for the orchestrator to execute.
///
/// Operations within one returned batch must be applied in order; a `Create`
/// always precedes the `Train` and `Validate` for the same trial. Training
/// lengths are cumulative, in whatever unit the orchestrator defines
/// (batches, records, epochs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Spawn a new trial with the sampled hyperparameters.
    Create {
        trial_id: TrialId,
        hparams: HashMap<String, ParameterValue>,
        sequencer: SequencerKind,
    },

    /// Train from cumulative length `from_length` to `to_length`.
    Train {
        trial_id: TrialId,
        from_length: u64,
        to_length: u64,
    },

    /// Compute validation metrics at cumulative length `at_length`.
    Validate { trial_id: TrialId, at_length: u64 },

    /// Terminate the trial and release its resources.
    Close { trial_id: TrialId },
}

impl Operation {
    /// The trial this operation applies to.
    pub fn trial_id(&self) -> TrialId {
        match self {
            Operation::Create { trial_id, .. }
            | Operation::Train { trial_id, .. }
            | Operation::Validate { trial_id, .. }
            | Operation::Close { trial_id } => *trial_id,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, Operation::Create { .. })
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Operation::Close { .. })
    }
}

/// Build the train/validate pair that extends a trial to `to_length`.
pub fn train_and_validate(trial_id: TrialId, from_length: u64, to_length: u64) -> Vec<Operation> {
    vec![
        Operation::Train {
            trial_id,
            from_length,
            to_length,
        },
        Operation::Validate {
            trial_id,
            at_length: to_length,
        },
    ]
}
