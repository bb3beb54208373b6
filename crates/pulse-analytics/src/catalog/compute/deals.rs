//! Deal-backed catalog metrics.

use std::collections::BTreeMap;

use pulse_core::row::{field_as_datetime, field_as_f64, field_is_null, Row};
use pulse_core::types::ChartType;
use pulse_core::{MetricError, MetricEvidence};

use crate::result::MetricResult;

use super::super::definitions::MetricDefinition;
use super::{
    count_and_fetch, deal_is_lost, deal_is_open, deal_is_won, group_by_field, window_filters,
    ComputeCtx,
};

/// Caveat attached when a metric falls back to the synced `won` flag.
const NO_MODEL_NOTE: &str = "Revenue model not confirmed; using synced won flag";

fn evidence_with_model_note(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
    row_count: u64,
    sampled: u64,
    null_rates: BTreeMap<String, f64>,
) -> MetricEvidence {
    let mut evidence =
        MetricEvidence::from_counts(ctx.timeframe.label.clone(), row_count, sampled, null_rates);
    if def.requires_revenue_model && ctx.model.is_none() {
        evidence.add_note(NO_MODEL_NOTE);
    }
    evidence
}

/// Share of resolved deals (won or lost) that were won in the window.
pub(crate) fn win_rate(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let filters = window_filters("close_date", ctx.timeframe);
    let (total, rows) = count_and_fetch(ctx, "crm_deals", filters)?;

    let resolved: Vec<&Row> = rows
        .iter()
        .filter(|row| deal_is_won(row, ctx.model) || deal_is_lost(row, ctx.model))
        .collect();

    let mut evidence =
        evidence_with_model_note(ctx, def, total, rows.len() as u64, BTreeMap::new());

    if let Some(dimension) = ctx.dimension {
        let resolved_rows: Vec<Row> = resolved.iter().map(|r| (*r).clone()).collect();
        let data = group_by_field(&resolved_rows, dimension, |members| {
            let won = members
                .iter()
                .filter(|row| deal_is_won(row, ctx.model))
                .count();
            won as f64 / members.len() as f64
        });
        return Ok(MetricResult::series(
            def.key, def.title, data, def.chart_type, evidence,
        ));
    }

    let value = if resolved.is_empty() {
        evidence.add_note("No resolved deals in window");
        0.0
    } else {
        let won = resolved
            .iter()
            .filter(|row| deal_is_won(row, ctx.model))
            .count();
        won as f64 / resolved.len() as f64
    };
    Ok(MetricResult::scalar(
        def.key, def.title, value, def.chart_type, evidence,
    ))
}

/// Total value of the open pipeline (current state, no window).
pub(crate) fn pipeline_value(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let (total, rows) = count_and_fetch(ctx, "crm_deals", Vec::new())?;
    let open: Vec<Row> = rows
        .into_iter()
        .filter(|row| deal_is_open(row, ctx.model))
        .collect();

    let value_nulls = open.iter().filter(|row| field_is_null(row, "value")).count();
    let mut null_rates = BTreeMap::new();
    if !open.is_empty() {
        null_rates.insert("value".to_string(), value_nulls as f64 / open.len() as f64);
    }
    let evidence = evidence_with_model_note(ctx, def, total, open.len() as u64, null_rates);

    if let Some(dimension) = ctx.dimension {
        let data = group_by_field(&open, dimension, |members| {
            members
                .iter()
                .filter_map(|row| field_as_f64(row, "value"))
                .sum()
        });
        return Ok(MetricResult::series(
            def.key, def.title, data, ChartType::Bar, evidence,
        ));
    }

    let value: f64 = open.iter().filter_map(|row| field_as_f64(row, "value")).sum();
    Ok(MetricResult::scalar(
        def.key, def.title, value, def.chart_type, evidence,
    ))
}

/// Average value of deals won in the window.
pub(crate) fn avg_deal_size(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let filters = window_filters("close_date", ctx.timeframe);
    let (total, rows) = count_and_fetch(ctx, "crm_deals", filters)?;
    let won: Vec<Row> = rows
        .into_iter()
        .filter(|row| deal_is_won(row, ctx.model))
        .collect();

    let mut evidence =
        evidence_with_model_note(ctx, def, total, won.len() as u64, BTreeMap::new());

    if let Some(dimension) = ctx.dimension {
        let data = group_by_field(&won, dimension, |members| {
            let values: Vec<f64> = members
                .iter()
                .filter_map(|row| field_as_f64(row, "value"))
                .collect();
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        });
        return Ok(MetricResult::series(
            def.key, def.title, data, ChartType::Bar, evidence,
        ));
    }

    let values: Vec<f64> = won
        .iter()
        .filter_map(|row| field_as_f64(row, "value"))
        .collect();
    let value = if values.is_empty() {
        evidence.add_note("No won deals with a value in window");
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    };
    Ok(MetricResult::scalar(
        def.key, def.title, value, def.chart_type, evidence,
    ))
}

/// Average days from creation to close for deals won in the window.
pub(crate) fn sales_cycle_days(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let filters = window_filters("close_date", ctx.timeframe);
    let (total, rows) = count_and_fetch(ctx, "crm_deals", filters)?;

    // Deals missing either timestamp are excluded, not counted as zero.
    let cycles: Vec<f64> = rows
        .iter()
        .filter(|row| deal_is_won(row, ctx.model))
        .filter_map(|row| {
            let created = field_as_datetime(row, "created_at")?;
            let closed = field_as_datetime(row, "close_date")?;
            Some((closed - created).num_seconds() as f64 / 86_400.0)
        })
        .collect();

    let mut evidence =
        evidence_with_model_note(ctx, def, total, rows.len() as u64, BTreeMap::new());
    let value = if cycles.is_empty() {
        evidence.add_note("No won deals with both created_at and close_date");
        0.0
    } else {
        cycles.iter().sum::<f64>() / cycles.len() as f64
    };
    Ok(MetricResult::scalar(
        def.key, def.title, value, def.chart_type, evidence,
    ))
}

/// Number of deals currently open.
pub(crate) fn open_deal_count(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let (total, rows) = count_and_fetch(ctx, "crm_deals", Vec::new())?;
    let open: Vec<Row> = rows
        .into_iter()
        .filter(|row| deal_is_open(row, ctx.model))
        .collect();

    let evidence = evidence_with_model_note(ctx, def, total, open.len() as u64, BTreeMap::new());

    if let Some(dimension) = ctx.dimension {
        let data = group_by_field(&open, dimension, |members| members.len() as f64);
        return Ok(MetricResult::series(
            def.key, def.title, data, ChartType::Bar, evidence,
        ));
    }
    Ok(MetricResult::scalar(
        def.key,
        def.title,
        open.len() as f64,
        def.chart_type,
        evidence,
    ))
}

/// Open deal count per stage, in funnel order when a model exists.
pub(crate) fn stage_funnel(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let (total, rows) = count_and_fetch(ctx, "crm_deals", Vec::new())?;
    let open: Vec<Row> = rows
        .into_iter()
        .filter(|row| deal_is_open(row, ctx.model))
        .collect();

    let mut data = group_by_field(&open, "stage", |members| members.len() as f64);

    // With a model, reorder to the inferred funnel; unknown stages keep
    // their count-descending order at the tail.
    if let Some(model) = ctx.model {
        let order: Vec<&str> = model.open_stages();
        data.sort_by_key(|point| {
            order
                .iter()
                .position(|stage| *stage == point.label)
                .unwrap_or(usize::MAX)
        });
    }

    let evidence = evidence_with_model_note(ctx, def, total, open.len() as u64, BTreeMap::new());
    Ok(MetricResult::series(
        def.key, def.title, data, def.chart_type, evidence,
    ))
}

/// Open pipeline value per assignee.
pub(crate) fn rep_pipeline(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let (total, rows) = count_and_fetch(ctx, "crm_deals", Vec::new())?;
    let open: Vec<Row> = rows
        .into_iter()
        .filter(|row| deal_is_open(row, ctx.model))
        .collect();

    let data = group_by_field(&open, "assigned_by_id", |members| {
        members
            .iter()
            .filter_map(|row| field_as_f64(row, "value"))
            .sum()
    });
    let evidence = evidence_with_model_note(ctx, def, total, open.len() as u64, BTreeMap::new());
    Ok(MetricResult::series(
        def.key, def.title, data, def.chart_type, evidence,
    ))
}

/// Deals created in the window per lead source.
pub(crate) fn lead_source_breakdown(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let filters = window_filters("created_at", ctx.timeframe);
    let (total, rows) = count_and_fetch(ctx, "crm_deals", filters)?;

    let source_nulls = rows
        .iter()
        .filter(|row| field_is_null(row, "lead_source"))
        .count();
    let mut null_rates = BTreeMap::new();
    if !rows.is_empty() {
        null_rates.insert(
            "lead_source".to_string(),
            source_nulls as f64 / rows.len() as f64,
        );
    }

    let data = group_by_field(&rows, "lead_source", |members| members.len() as f64);
    let evidence = MetricEvidence::from_counts(
        ctx.timeframe.label.clone(),
        total,
        rows.len() as u64,
        null_rates,
    );
    Ok(MetricResult::series(
        def.key, def.title, data, def.chart_type, evidence,
    ))
}
