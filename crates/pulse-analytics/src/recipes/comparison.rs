//! Period-over-period comparison.
//!
//! Re-executes the same recipe over the immediately preceding equal-length
//! window and attaches only the previous value; percentage change is the
//! caller's concern. Ratios are skipped (their sides carry independent
//! filters and no shared window).

use chrono::{DateTime, Utc};

use pulse_core::TenantScope;

use crate::result::{Comparison, DynamicMetricResult};

use super::executor::{window_label, RecipeEngine};
use super::types::CompiledMetric;

impl RecipeEngine<'_> {
    /// Execute a tenant metric and attach the previous-period value when
    /// the recipe supports comparison.
    pub fn execute_with_comparison(
        &self,
        scope: &TenantScope,
        metric: &CompiledMetric,
        now: DateTime<Utc>,
    ) -> DynamicMetricResult {
        let mut result = self.execute(scope, metric, now);
        if !metric.recipe.supports_comparison() || !result.errors.is_empty() {
            return result;
        }
        match self.run_recipe(scope, &metric.recipe, now, 1) {
            Ok(previous) => {
                result.comparison = Some(Comparison {
                    previous_value: previous.value,
                    previous_timeframe: window_label(&metric.recipe, 1),
                });
            }
            Err(e) => {
                // The current value stands; comparison degrades to a warning.
                tracing::warn!(metric_id = %metric.id, error = %e, "comparison window failed");
                result
                    .warnings
                    .push(format!("Previous-period comparison unavailable: {e}"));
            }
        }
        result
    }
}
