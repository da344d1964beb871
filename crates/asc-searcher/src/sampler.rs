//! Hyperparameter sampling for new trials.

use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;

use asc_types::{ParameterKind, ParameterValue, SearchSpace};

/// Draws hyperparameter points from a search space.
///
/// Implementations must be deterministic given the rng state, so that
/// replaying an experiment with the same seed recreates the same trials.
pub trait Sampler: Send + Sync {
    /// Draw one point from the configured search space.
    fn sample(&self, space: &SearchSpace, rng: &mut StdRng) -> HashMap<String, ParameterValue>;

    /// Human-readable sampler name.
    fn name(&self) -> &str;
}

/// Independent uniform sampling across the search space.
#[derive(Debug, Clone, Default)]
pub struct RandomSampler;

impl Sampler for RandomSampler {
    fn sample(&self, space: &SearchSpace, rng: &mut StdRng) -> HashMap<String, ParameterValue> {
        let mut params = HashMap::new();

        for param in &space.parameters {
            let value = match &param.kind {
                ParameterKind::FloatRange { low, high } => {
                    ParameterValue::Float(rng.gen_range(*low..=*high))
                }
                ParameterKind::IntRange { low, high } => {
                    ParameterValue::Int(rng.gen_range(*low..=*high))
                }
                ParameterKind::LogUniform { low, high } => {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    let log_val: f64 = rng.gen_range(log_low..=log_high);
                    ParameterValue::Float(log_val.exp())
                }
                ParameterKind::Choice { values } => {
                    let idx = rng.gen_range(0..values.len());
                    ParameterValue::Json(values[idx].clone())
                }
            };
            params.insert(param.name.clone(), value);
        }

        params
    }

    fn name(&self) -> &str {
        "random"
    }
}
