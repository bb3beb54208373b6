//! Bounded recipe execution.
//!
//! The underlying store is not assumed to support server-side aggregation:
//! sum/avg/duration/distinct fetch a capped set of rows and aggregate
//! client-side. Every execution produces evidence, and confidence is
//! derived from that evidence, never supplied by the recipe author.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use pulse_core::row::{value_as_datetime, value_as_f64};
use pulse_core::types::ChartType;
use pulse_core::{
    EngineLimits, FieldFilter, FilterOp, MetricError, MetricEvidence, SelectQuery, TabularStore,
    TenantScope,
};

use crate::result::{DynamicMetricResult, MetricResult};

use super::types::{AggKind, CompiledAggSpec, CompiledMetric, CompiledRecipe, TimeWindow};

/// Caveat attached when a ratio denominator evaluates to zero.
pub const ZERO_DENOMINATOR_NOTE: &str = "Denominator is zero";

/// Caveat attached when an aggregation found no usable values.
pub const NO_VALUES_NOTE: &str = "No non-null values found";

/// Caveat attached when evidence rests on fewer than 10 rows.
pub const LOW_SAMPLE_NOTE: &str = "Low sample size";

/// Executes compiled recipes against the tabular store.
pub struct RecipeEngine<'a> {
    store: &'a dyn TabularStore,
    limits: &'a EngineLimits,
}

/// A scalar plus the evidence that backs it.
pub(crate) struct Execution {
    pub value: f64,
    pub evidence: MetricEvidence,
}

impl<'a> RecipeEngine<'a> {
    pub fn new(store: &'a dyn TabularStore, limits: &'a EngineLimits) -> Self {
        Self { store, limits }
    }

    /// Execute one tenant metric for the current period.
    pub fn execute(
        &self,
        scope: &TenantScope,
        metric: &CompiledMetric,
        now: DateTime<Utc>,
    ) -> DynamicMetricResult {
        match self.run_recipe(scope, &metric.recipe, now, 0) {
            Ok(execution) => {
                let mut result = MetricResult::scalar(
                    metric.id.clone(),
                    metric.title.clone(),
                    execution.value,
                    ChartType::Scalar,
                    execution.evidence,
                );
                result.definition = Some(metric.recipe.definition());
                result
            }
            Err(e) => {
                tracing::warn!(metric_id = %metric.id, error = %e, "recipe execution failed");
                let mut result = MetricResult::error(
                    metric.id.clone(),
                    metric.title.clone(),
                    window_label(&metric.recipe, 0),
                    e.to_string(),
                );
                result.definition = Some(metric.recipe.definition());
                result
            }
        }
    }

    /// Execute a recipe for the current or a shifted period.
    /// `periods_back = 1` is the immediately preceding equal-length window.
    pub(crate) fn run_recipe(
        &self,
        scope: &TenantScope,
        recipe: &CompiledRecipe,
        now: DateTime<Utc>,
        periods_back: i64,
    ) -> Result<Execution, MetricError> {
        match recipe {
            CompiledRecipe::Count {
                table,
                filters,
                window,
            } => {
                let all_filters = with_window(filters, window, now, periods_back);
                let count = self.store.count(scope, table, &all_filters)?;
                let evidence = MetricEvidence::from_counts(
                    label_for(window, periods_back),
                    count,
                    count,
                    BTreeMap::new(),
                );
                Ok(Execution {
                    value: count as f64,
                    evidence,
                })
            }
            CompiledRecipe::Sum {
                table,
                field,
                filters,
                window,
            } => self.aggregate_field(scope, table, field, filters, window, now, periods_back, AggKind::Sum),
            CompiledRecipe::Avg {
                table,
                field,
                filters,
                window,
            } => self.aggregate_field(scope, table, field, filters, window, now, periods_back, AggKind::Avg),
            CompiledRecipe::Ratio {
                numerator,
                denominator,
                multiplier,
            } => self.ratio(scope, numerator, denominator, *multiplier, now),
            CompiledRecipe::Duration {
                table,
                start_field,
                end_field,
                unit,
                filters,
                window,
            } => self.duration(
                scope,
                table,
                start_field,
                end_field,
                *unit,
                filters,
                window,
                now,
                periods_back,
            ),
            CompiledRecipe::DistinctCount {
                table,
                field,
                filters,
                window,
            } => self.distinct_count(scope, table, field, filters, window, now, periods_back),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn aggregate_field(
        &self,
        scope: &TenantScope,
        table: &str,
        field: &str,
        filters: &[FieldFilter],
        window: &Option<TimeWindow>,
        now: DateTime<Utc>,
        periods_back: i64,
        agg: AggKind,
    ) -> Result<Execution, MetricError> {
        let all_filters = with_window(filters, window, now, periods_back);
        let row_count = self.store.count(scope, table, &all_filters)?;
        let fetch_cap = self.limits.effective_aggregation_fetch_rows();
        let query = SelectQuery {
            filters: all_filters,
            columns: vec![field.to_string()],
            limit: Some(fetch_cap),
            ..SelectQuery::default()
        };
        let rows = self.store.select(scope, table, &query)?;

        let values: Vec<f64> = rows
            .iter()
            .filter_map(|row| row.get(field).and_then(value_as_f64))
            .collect();
        let nulls = rows.len() - values.len();

        let mut null_rates = BTreeMap::new();
        if !rows.is_empty() {
            null_rates.insert(field.to_string(), nulls as f64 / rows.len() as f64);
        }
        let mut evidence = MetricEvidence::from_counts(
            label_for(window, periods_back),
            row_count,
            rows.len() as u64,
            null_rates,
        );
        annotate_sampling(&mut evidence, row_count, rows.len(), fetch_cap);

        let value = if values.is_empty() {
            evidence.add_note(NO_VALUES_NOTE);
            0.0
        } else {
            let sum: f64 = values.iter().sum();
            match agg {
                AggKind::Sum => sum,
                AggKind::Avg => sum / values.len() as f64,
                AggKind::Count => values.len() as f64,
            }
        };
        Ok(Execution { value, evidence })
    }

    fn ratio(
        &self,
        scope: &TenantScope,
        numerator: &CompiledAggSpec,
        denominator: &CompiledAggSpec,
        multiplier: f64,
        now: DateTime<Utc>,
    ) -> Result<Execution, MetricError> {
        let num = self.run_agg_spec(scope, numerator, now)?;
        let den = self.run_agg_spec(scope, denominator, now)?;

        let mut evidence = MetricEvidence::from_counts(
            "all_time",
            num.evidence.row_count + den.evidence.row_count,
            num.evidence.sampled_rows + den.evidence.sampled_rows,
            BTreeMap::new(),
        );
        for note in num
            .evidence
            .computation_notes
            .iter()
            .chain(den.evidence.computation_notes.iter())
        {
            evidence.add_note(note.clone());
        }

        let value = if den.value == 0.0 {
            evidence.add_note(ZERO_DENOMINATOR_NOTE);
            0.0
        } else {
            num.value / den.value * multiplier
        };
        Ok(Execution { value, evidence })
    }

    fn run_agg_spec(
        &self,
        scope: &TenantScope,
        spec: &CompiledAggSpec,
        now: DateTime<Utc>,
    ) -> Result<Execution, MetricError> {
        match spec.agg {
            AggKind::Count => {
                let count = self.store.count(scope, &spec.table, &spec.filters)?;
                Ok(Execution {
                    value: count as f64,
                    evidence: MetricEvidence::from_counts("all_time", count, count, BTreeMap::new()),
                })
            }
            AggKind::Sum | AggKind::Avg => {
                let field = spec.field.as_deref().unwrap_or("value");
                self.aggregate_field(
                    scope,
                    &spec.table,
                    field,
                    &spec.filters,
                    &None,
                    now,
                    0,
                    spec.agg,
                )
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn duration(
        &self,
        scope: &TenantScope,
        table: &str,
        start_field: &str,
        end_field: &str,
        unit: super::types::DurationUnit,
        filters: &[FieldFilter],
        window: &Option<TimeWindow>,
        now: DateTime<Utc>,
        periods_back: i64,
    ) -> Result<Execution, MetricError> {
        let all_filters = with_window(filters, window, now, periods_back);
        let row_count = self.store.count(scope, table, &all_filters)?;
        let fetch_cap = self.limits.effective_aggregation_fetch_rows();
        let query = SelectQuery {
            filters: all_filters,
            columns: vec![start_field.to_string(), end_field.to_string()],
            limit: Some(fetch_cap),
            ..SelectQuery::default()
        };
        let rows = self.store.select(scope, table, &query)?;

        // Rows missing either end are excluded, not treated as zero.
        let spans: Vec<f64> = rows
            .iter()
            .filter_map(|row| {
                let start = row.get(start_field).and_then(value_as_datetime)?;
                let end = row.get(end_field).and_then(value_as_datetime)?;
                Some((end - start).num_seconds() as f64 / unit.seconds())
            })
            .collect();

        let mut null_rates = BTreeMap::new();
        if !rows.is_empty() {
            let missing = rows.len() - spans.len();
            null_rates.insert(
                format!("{start_field},{end_field}"),
                missing as f64 / rows.len() as f64,
            );
        }
        let mut evidence = MetricEvidence::from_counts(
            label_for(window, periods_back),
            row_count,
            rows.len() as u64,
            null_rates,
        );
        annotate_sampling(&mut evidence, row_count, rows.len(), fetch_cap);

        let value = if spans.is_empty() {
            evidence.add_note(format!(
                "No rows with both {start_field} and {end_field} present"
            ));
            0.0
        } else {
            spans.iter().sum::<f64>() / spans.len() as f64
        };
        Ok(Execution { value, evidence })
    }

    #[allow(clippy::too_many_arguments)]
    fn distinct_count(
        &self,
        scope: &TenantScope,
        table: &str,
        field: &str,
        filters: &[FieldFilter],
        window: &Option<TimeWindow>,
        now: DateTime<Utc>,
        periods_back: i64,
    ) -> Result<Execution, MetricError> {
        let all_filters = with_window(filters, window, now, periods_back);
        let row_count = self.store.count(scope, table, &all_filters)?;
        let fetch_cap = self.limits.effective_aggregation_fetch_rows();
        let query = SelectQuery {
            filters: all_filters,
            columns: vec![field.to_string()],
            limit: Some(fetch_cap),
            ..SelectQuery::default()
        };
        let rows = self.store.select(scope, table, &query)?;

        let mut distinct: Vec<String> = rows
            .iter()
            .filter_map(|row| match row.get(field) {
                None | Some(Value::Null) => None,
                Some(value) => Some(value.to_string()),
            })
            .collect();
        distinct.sort_unstable();
        distinct.dedup();

        let mut evidence = MetricEvidence::from_counts(
            label_for(window, periods_back),
            row_count,
            rows.len() as u64,
            BTreeMap::new(),
        );
        annotate_sampling(&mut evidence, row_count, rows.len(), fetch_cap);
        if distinct.is_empty() && row_count > 0 {
            evidence.add_note(NO_VALUES_NOTE);
        }

        Ok(Execution {
            value: distinct.len() as f64,
            evidence,
        })
    }
}

/// Append the trailing-window range filters for the requested period.
fn with_window(
    filters: &[FieldFilter],
    window: &Option<TimeWindow>,
    now: DateTime<Utc>,
    periods_back: i64,
) -> Vec<FieldFilter> {
    let mut all = filters.to_vec();
    if let Some(window) = window {
        let span = Duration::days(window.days);
        let end = now - span * periods_back as i32;
        let start = end - span;
        all.push(FieldFilter::new(
            window.field.clone(),
            FilterOp::Gte,
            Value::String(start.to_rfc3339()),
        ));
        all.push(FieldFilter::new(
            window.field.clone(),
            FilterOp::Lt,
            Value::String(end.to_rfc3339()),
        ));
    }
    all
}

fn label_for(window: &Option<TimeWindow>, periods_back: i64) -> String {
    match window {
        None => "all_time".to_string(),
        Some(window) if periods_back == 0 => format!("last_{}_days", window.days),
        Some(window) => format!("previous_last_{}_days", window.days),
    }
}

/// Timeframe label a recipe execution will report.
pub(crate) fn window_label(recipe: &CompiledRecipe, periods_back: i64) -> String {
    match recipe {
        CompiledRecipe::Ratio { .. } => "all_time".to_string(),
        CompiledRecipe::Count { window, .. }
        | CompiledRecipe::Sum { window, .. }
        | CompiledRecipe::Avg { window, .. }
        | CompiledRecipe::Duration { window, .. }
        | CompiledRecipe::DistinctCount { window, .. } => label_for(window, periods_back),
    }
}

/// Note partial sampling and low population on the evidence.
fn annotate_sampling(
    evidence: &mut MetricEvidence,
    row_count: u64,
    fetched: usize,
    fetch_cap: usize,
) {
    if row_count as usize > fetch_cap && fetched == fetch_cap {
        evidence.add_note(format!("Sampled {fetched} of {row_count} rows"));
    }
    if row_count > 0 && row_count < pulse_core::constants::LOW_SAMPLE_ROWS {
        evidence.add_note(LOW_SAMPLE_NOTE);
    }
}
