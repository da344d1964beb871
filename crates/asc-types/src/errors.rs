use thiserror::Error;

use crate::trial::TrialId;

/// Errors surfaced by the search scheduler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("validation metrics do not contain '{metric}'")]
    MissingMetric { metric: String },

    #[error("unknown trial: {trial_id}")]
    UnknownTrial { trial_id: TrialId },

    #[error("invalid search configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias for scheduler operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! invalid_config {
    ($($arg:tt)*) => {
        $crate::SearchError::InvalidConfig {
            message: format!($($arg)*),
        }
    };
}
