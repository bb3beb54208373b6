//! Trust sampling — null-rate estimation over a capped sample per table.

use std::collections::BTreeMap;

use pulse_core::row::field_is_null;
use pulse_core::{
    EngineLimits, MetricError, MetricEvidence, SelectQuery, TabularStore, TenantScope,
};

use super::definitions::MetricDefinition;

/// Sample each required table and derive a trust score for the metric.
///
/// Independent of validation: a metric can validate (tables populated) and
/// still earn low trust from null-riddled fields. Fewer than 10 total rows
/// penalizes trust further via the evidence derivation.
pub fn compute_trust(
    store: &dyn TabularStore,
    scope: &TenantScope,
    def: &MetricDefinition,
    limits: &EngineLimits,
    timeframe_label: &str,
) -> Result<MetricEvidence, MetricError> {
    let sample_cap = limits.effective_trust_sample_rows();
    let mut total_rows = 0u64;
    let mut total_sampled = 0u64;
    let mut null_rates: BTreeMap<String, f64> = BTreeMap::new();

    for (table, fields) in def.required_fields {
        let population = store.count(scope, table, &[])?;
        total_rows += population;

        let query = SelectQuery {
            columns: fields.iter().map(|f| f.to_string()).collect(),
            limit: Some(sample_cap),
            ..SelectQuery::default()
        };
        let rows = store.select(scope, table, &query)?;
        total_sampled += rows.len() as u64;

        for field in *fields {
            let nulls = rows.iter().filter(|row| field_is_null(row, field)).count();
            let rate = if rows.is_empty() {
                1.0
            } else {
                nulls as f64 / rows.len() as f64
            };
            null_rates.insert(format!("{table}.{field}"), rate);
        }
    }

    let mut evidence =
        MetricEvidence::from_counts(timeframe_label, total_rows, total_sampled, null_rates);
    if total_sampled < total_rows {
        evidence.add_note(format!("Sampled {total_sampled} of {total_rows} rows"));
    }
    Ok(evidence)
}
