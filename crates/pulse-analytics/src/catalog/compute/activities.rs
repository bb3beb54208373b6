//! Activity-backed catalog metrics.

use std::collections::BTreeMap;

use pulse_core::MetricError;
use pulse_core::MetricEvidence;

use crate::result::MetricResult;

use super::super::definitions::MetricDefinition;
use super::{count_and_fetch, deal_is_open, group_by_field, window_filters, ComputeCtx};

/// Activities logged in the window.
pub(crate) fn activity_volume(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let filters = window_filters("created_at", ctx.timeframe);

    if let Some(dimension) = ctx.dimension {
        let (total, rows) = count_and_fetch(ctx, "crm_activities", filters)?;
        let data = group_by_field(&rows, dimension, |members| members.len() as f64);
        let evidence = MetricEvidence::from_counts(
            ctx.timeframe.label.clone(),
            total,
            rows.len() as u64,
            BTreeMap::new(),
        );
        return Ok(MetricResult::series(
            def.key, def.title, data, def.chart_type, evidence,
        ));
    }

    let total = ctx.store.count(ctx.scope, "crm_activities", &filters)?;
    let evidence = MetricEvidence::from_counts(
        ctx.timeframe.label.clone(),
        total,
        total,
        BTreeMap::new(),
    );
    Ok(MetricResult::scalar(
        def.key,
        def.title,
        total as f64,
        def.chart_type,
        evidence,
    ))
}

/// Activities in the window per currently open deal.
pub(crate) fn activities_per_deal(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let activity_filters = window_filters("created_at", ctx.timeframe);
    let activity_count = ctx
        .store
        .count(ctx.scope, "crm_activities", &activity_filters)?;

    let (deal_total, deal_rows) = count_and_fetch(ctx, "crm_deals", Vec::new())?;
    let open_count = deal_rows
        .iter()
        .filter(|row| deal_is_open(row, ctx.model))
        .count();

    let mut evidence = MetricEvidence::from_counts(
        ctx.timeframe.label.clone(),
        activity_count + deal_total,
        activity_count + deal_rows.len() as u64,
        BTreeMap::new(),
    );

    let value = if open_count == 0 {
        evidence.add_note("Denominator is zero");
        0.0
    } else {
        activity_count as f64 / open_count as f64
    };
    Ok(MetricResult::scalar(
        def.key, def.title, value, def.chart_type, evidence,
    ))
}
