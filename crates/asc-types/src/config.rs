//! Scheduler configuration schemas.

use serde::{Deserialize, Serialize};

use crate::errors::SearchResult;
use crate::invalid_config;

fn default_divisor() -> f64 {
    4.0
}

fn default_rungs() -> usize {
    5
}

fn default_smaller_is_better() -> bool {
    true
}

/// Configuration for a single successive-halving bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketConfig {
    /// Geometric reduction factor: each rung trains `divisor` times longer
    /// and keeps roughly `1/divisor` of its trials. Must be >= 2.
    #[serde(default = "default_divisor")]
    pub divisor: f64,

    /// Number of rungs in the ladder.
    #[serde(default = "default_rungs")]
    pub num_rungs: usize,

    /// Cumulative training length at the top rung, in the orchestrator's
    /// units.
    pub max_length: u64,

    /// Total number of trials this bracket may explore.
    pub max_trials: usize,

    /// Concurrent trial limit; 0 picks a width that can fill the ladder.
    #[serde(default)]
    pub max_concurrent_trials: usize,

    /// Name of the validation metric to optimize.
    pub metric: String,

    /// Whether a smaller raw metric is better.
    #[serde(default = "default_smaller_is_better")]
    pub smaller_is_better: bool,
}

impl BracketConfig {
    pub fn new(metric: impl Into<String>, max_length: u64, max_trials: usize) -> Self {
        Self {
            divisor: default_divisor(),
            num_rungs: default_rungs(),
            max_length,
            max_trials,
            max_concurrent_trials: 0,
            metric: metric.into(),
            smaller_is_better: true,
        }
    }

    pub fn with_divisor(mut self, divisor: f64) -> Self {
        self.divisor = divisor;
        self
    }

    pub fn with_num_rungs(mut self, num_rungs: usize) -> Self {
        self.num_rungs = num_rungs;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent_trials: usize) -> Self {
        self.max_concurrent_trials = max_concurrent_trials;
        self
    }

    pub fn with_smaller_is_better(mut self, smaller_is_better: bool) -> Self {
        self.smaller_is_better = smaller_is_better;
        self
    }

    pub fn validate(&self) -> SearchResult<()> {
        if self.divisor.is_nan() || self.divisor < 2.0 {
            return Err(invalid_config!(
                "divisor must be >= 2, got {}",
                self.divisor
            ));
        }
        if self.num_rungs == 0 {
            return Err(invalid_config!("at least one rung is required"));
        }
        if self.max_length == 0 {
            return Err(invalid_config!("max_length must be >= 1"));
        }
        if self.max_trials == 0 {
            return Err(invalid_config!("max_trials must be >= 1"));
        }
        Ok(())
    }
}

/// Exploration/exploitation posture of the adaptive driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdaptiveMode {
    /// A single deep ladder with full pruning.
    Aggressive,
    /// Every other ladder depth, down to plain random search.
    #[default]
    Standard,
    /// One bracket per ladder depth.
    Conservative,
}

/// User-facing configuration for the adaptive driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    #[serde(default)]
    pub mode: AdaptiveMode,

    /// Total training budget in length units, summed over all trials and
    /// brackets. Must cover at least one full-length trial.
    pub budget: u64,

    /// Cumulative training length at the top rung of the deepest ladder.
    pub max_length: u64,

    #[serde(default = "default_divisor")]
    pub divisor: f64,

    /// Depth of the deepest ladder.
    #[serde(default = "default_rungs")]
    pub max_rungs: usize,

    /// Concurrent trial limit applied to each bracket; 0 = auto.
    #[serde(default)]
    pub max_concurrent_trials: usize,

    /// Name of the validation metric to optimize.
    pub metric: String,

    /// Whether a smaller raw metric is better.
    #[serde(default = "default_smaller_is_better")]
    pub smaller_is_better: bool,
}

impl AdaptiveConfig {
    pub fn new(metric: impl Into<String>, max_length: u64, budget: u64) -> Self {
        Self {
            mode: AdaptiveMode::default(),
            budget,
            max_length,
            divisor: default_divisor(),
            max_rungs: default_rungs(),
            max_concurrent_trials: 0,
            metric: metric.into(),
            smaller_is_better: true,
        }
    }

    pub fn with_mode(mut self, mode: AdaptiveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_divisor(mut self, divisor: f64) -> Self {
        self.divisor = divisor;
        self
    }

    pub fn with_max_rungs(mut self, max_rungs: usize) -> Self {
        self.max_rungs = max_rungs;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent_trials: usize) -> Self {
        self.max_concurrent_trials = max_concurrent_trials;
        self
    }

    pub fn with_smaller_is_better(mut self, smaller_is_better: bool) -> Self {
        self.smaller_is_better = smaller_is_better;
        self
    }

    pub fn validate(&self) -> SearchResult<()> {
        if self.divisor.is_nan() || self.divisor < 2.0 {
            return Err(invalid_config!(
                "divisor must be >= 2, got {}",
                self.divisor
            ));
        }
        if self.max_rungs == 0 {
            return Err(invalid_config!("at least one rung is required"));
        }
        if self.max_length == 0 {
            return Err(invalid_config!("max_length must be >= 1"));
        }
        if self.budget < self.max_length {
            return Err(invalid_config!(
                "budget ({}) must cover at least one full-length trial ({})",
                self.budget,
                self.max_length
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_config_defaults() {
        let config = BracketConfig::new("val_loss", 16, 48);
        assert_eq!(config.divisor, 4.0);
        assert_eq!(config.num_rungs, 5);
        assert_eq!(config.max_concurrent_trials, 0);
        assert!(config.smaller_is_better);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bracket_config_serde_defaults() {
        let json = r#"{"max_length": 16, "max_trials": 8, "metric": "val_loss"}"#;
        let config: BracketConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.divisor, 4.0);
        assert_eq!(config.num_rungs, 5);
        assert!(config.smaller_is_better);
    }

    #[test]
    fn bracket_config_rejections() {
        assert!(BracketConfig::new("m", 16, 8)
            .with_divisor(1.5)
            .validate()
            .is_err());
        assert!(BracketConfig::new("m", 16, 8)
            .with_num_rungs(0)
            .validate()
            .is_err());
        assert!(BracketConfig::new("m", 0, 8).validate().is_err());
        assert!(BracketConfig::new("m", 16, 0).validate().is_err());
        assert!(BracketConfig::new("m", 16, 8)
            .with_divisor(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn adaptive_mode_serde_names() {
        assert_eq!(
            serde_json::to_string(&AdaptiveMode::Aggressive).unwrap(),
            "\"aggressive\""
        );
        let mode: AdaptiveMode = serde_json::from_str("\"conservative\"").unwrap();
        assert_eq!(mode, AdaptiveMode::Conservative);
    }

    #[test]
    fn adaptive_config_builder_chain() {
        let config = AdaptiveConfig::new("accuracy", 16, 160)
            .with_mode(AdaptiveMode::Conservative)
            .with_max_rungs(3)
            .with_smaller_is_better(false);
        assert_eq!(config.mode, AdaptiveMode::Conservative);
        assert_eq!(config.max_rungs, 3);
        assert!(!config.smaller_is_better);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn adaptive_config_rejects_small_budget() {
        let config = AdaptiveConfig::new("val_loss", 16, 15);
        assert!(config.validate().is_err());
    }
}
