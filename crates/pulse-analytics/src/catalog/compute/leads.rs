//! Lead-backed catalog metrics.

use std::collections::BTreeMap;

use pulse_core::MetricError;
use pulse_core::MetricEvidence;

use crate::result::MetricResult;

use super::super::definitions::MetricDefinition;
use super::{count_and_fetch, group_by_field, truthy_field, window_filters, ComputeCtx};

/// Share of leads created in the window that converted.
pub(crate) fn lead_conversion_rate(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let filters = window_filters("created_at", ctx.timeframe);
    let (total, rows) = count_and_fetch(ctx, "crm_leads", filters)?;

    let mut evidence = MetricEvidence::from_counts(
        ctx.timeframe.label.clone(),
        total,
        rows.len() as u64,
        BTreeMap::new(),
    );

    if let Some(dimension) = ctx.dimension {
        let data = group_by_field(&rows, dimension, |members| {
            let converted = members
                .iter()
                .filter(|row| truthy_field(row, "converted"))
                .count();
            converted as f64 / members.len() as f64
        });
        return Ok(MetricResult::series(
            def.key, def.title, data, def.chart_type, evidence,
        ));
    }

    let value = if rows.is_empty() {
        evidence.add_note("No leads created in window");
        0.0
    } else {
        let converted = rows
            .iter()
            .filter(|row| truthy_field(row, "converted"))
            .count();
        converted as f64 / rows.len() as f64
    };
    Ok(MetricResult::scalar(
        def.key, def.title, value, def.chart_type, evidence,
    ))
}

/// Leads created in the window.
pub(crate) fn lead_volume(
    ctx: &ComputeCtx<'_>,
    def: &MetricDefinition,
) -> Result<MetricResult, MetricError> {
    let filters = window_filters("created_at", ctx.timeframe);

    if let Some(dimension) = ctx.dimension {
        let (total, rows) = count_and_fetch(ctx, "crm_leads", filters)?;
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

    let total = ctx.store.count(ctx.scope, "crm_leads", &filters)?;
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
