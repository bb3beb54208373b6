//! Per-metric compute functions, routed by catalog key.
//!
//! Every function is a pure read: (store, scope, timeframe, dimension,
//! revenue model) in, `MetricResult` out. Transient store failures become
//! explicit error results; they never escape as exceptions.

mod activities;
mod deals;
mod leads;

use serde_json::Value;

use pulse_core::row::{field_as_str, Row};
use pulse_core::{
    EngineLimits, FieldFilter, FilterOp, MetricError, TabularStore, TenantScope, Timeframe,
};

use crate::result::{MetricResult, SeriesPoint};
use crate::revenue::RevenueModel;

use super::definitions::MetricDefinition;

/// Shared inputs for one metric computation.
pub(crate) struct ComputeCtx<'a> {
    pub store: &'a dyn TabularStore,
    pub scope: &'a TenantScope,
    pub timeframe: &'a Timeframe,
    pub dimension: Option<&'a str>,
    pub model: Option<&'a RevenueModel>,
    pub limits: &'a EngineLimits,
}

/// Compute one catalog metric. Always returns a structured result.
pub fn compute_metric(
    store: &dyn TabularStore,
    scope: &TenantScope,
    def: &MetricDefinition,
    timeframe: &Timeframe,
    dimension: Option<&str>,
    model: Option<&RevenueModel>,
    limits: &EngineLimits,
) -> MetricResult {
    let ctx = ComputeCtx {
        store,
        scope,
        timeframe,
        dimension,
        model,
        limits,
    };
    let computed = match def.key {
        "win_rate" => deals::win_rate(&ctx, def),
        "pipeline_value" => deals::pipeline_value(&ctx, def),
        "avg_deal_size" => deals::avg_deal_size(&ctx, def),
        "sales_cycle_days" => deals::sales_cycle_days(&ctx, def),
        "open_deal_count" => deals::open_deal_count(&ctx, def),
        "stage_funnel" => deals::stage_funnel(&ctx, def),
        "rep_pipeline" => deals::rep_pipeline(&ctx, def),
        "lead_source_breakdown" => deals::lead_source_breakdown(&ctx, def),
        "lead_conversion_rate" => leads::lead_conversion_rate(&ctx, def),
        "lead_volume" => leads::lead_volume(&ctx, def),
        "activity_volume" => activities::activity_volume(&ctx, def),
        "activities_per_deal" => activities::activities_per_deal(&ctx, def),
        other => Err(MetricError::UnknownMetric {
            key: other.to_string(),
        }),
    };
    match computed {
        Ok(mut result) => {
            if result.dimension.is_none() {
                result.dimension = dimension.map(str::to_string);
            }
            result
        }
        Err(e) => {
            tracing::warn!(metric_key = def.key, error = %e, "metric computation failed");
            MetricResult::error(def.key, def.title, timeframe.label.clone(), e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Shared row helpers.
// ---------------------------------------------------------------------------

/// Won under the revenue model, or the synced `won` flag when no model.
pub(crate) fn deal_is_won(row: &Row, model: Option<&RevenueModel>) -> bool {
    match model {
        Some(model) => field_as_str(row, "stage").is_some_and(|stage| model.is_won(stage)),
        None => truthy_field(row, "won"),
    }
}

/// Lost under the revenue model, or closed-without-win when no model.
pub(crate) fn deal_is_lost(row: &Row, model: Option<&RevenueModel>) -> bool {
    match model {
        Some(model) => field_as_str(row, "stage").is_some_and(|stage| model.is_lost(stage)),
        None => truthy_field(row, "closed") && !truthy_field(row, "won"),
    }
}

/// Open pipeline membership: neither won nor lost.
pub(crate) fn deal_is_open(row: &Row, model: Option<&RevenueModel>) -> bool {
    !deal_is_won(row, model) && !deal_is_lost(row, model)
}

pub(crate) fn truthy_field(row: &Row, field: &str) -> bool {
    match row.get(field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

/// Range filters restricting `field` to the timeframe.
pub(crate) fn window_filters(field: &str, timeframe: &Timeframe) -> Vec<FieldFilter> {
    vec![
        FieldFilter::new(
            field,
            FilterOp::Gte,
            Value::String(timeframe.start.to_rfc3339()),
        ),
        FieldFilter::new(
            field,
            FilterOp::Lt,
            Value::String(timeframe.end.to_rfc3339()),
        ),
    ]
}

/// Count plus a capped fetch for client-side aggregation.
pub(crate) fn count_and_fetch(
    ctx: &ComputeCtx<'_>,
    table: &str,
    filters: Vec<FieldFilter>,
) -> Result<(u64, Vec<Row>), MetricError> {
    let total = ctx.store.count(ctx.scope, table, &filters)?;
    let query = pulse_core::SelectQuery {
        filters,
        limit: Some(ctx.limits.effective_aggregation_fetch_rows()),
        ..Default::default()
    };
    let rows = ctx.store.select(ctx.scope, table, &query)?;
    Ok((total, rows))
}

/// Group rows by a string field, mapping each group through `f`, sorted by
/// value descending then label for determinism.
pub(crate) fn group_by_field<F>(rows: &[Row], field: &str, f: F) -> Vec<SeriesPoint>
where
    F: Fn(&[&Row]) -> f64,
{
    let mut groups: std::collections::BTreeMap<String, Vec<&Row>> = Default::default();
    for row in rows {
        let label = field_as_str(row, field).unwrap_or("unknown").to_string();
        groups.entry(label).or_default().push(row);
    }
    let mut points: Vec<SeriesPoint> = groups
        .into_iter()
        .map(|(label, members)| SeriesPoint {
            value: f(&members),
            label,
        })
        .collect();
    points.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    points
}
