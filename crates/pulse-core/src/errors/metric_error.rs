//! Metric and alert computation errors (internal seams only).

use super::error_code::PulseErrorCode;
use super::{RecipeError, StoreError};

/// Errors that can occur while computing a metric or evaluating an alert rule.
///
/// These never escape a public entry point; they are converted into error
/// strings on result objects (metric path) or logged skips (alert path).
#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    #[error("Unknown metric: {key}")]
    UnknownMetric { key: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),

    #[error("Rule config error: {message}")]
    RuleConfig { message: String },
}

impl PulseErrorCode for MetricError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownMetric { .. } => "METRIC_UNKNOWN",
            Self::Store(e) => e.error_code(),
            Self::Recipe(e) => e.error_code(),
            Self::RuleConfig { .. } => "ALERT_RULE_CONFIG",
        }
    }
}
