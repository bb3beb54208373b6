//! The static metric catalog.
//!
//! Definitions are immutable after registration: the catalog is a const
//! table, and compute functions are routed by key in `compute`.

use pulse_core::constants::{TABLE_ACTIVITIES, TABLE_DEALS, TABLE_LEADS};
use pulse_core::types::ChartType;
use pulse_core::TimeGrain;

/// A registered metric: identity, data requirements, and breakdown rules.
#[derive(Debug, Clone, Copy)]
pub struct MetricDefinition {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub required_tables: &'static [&'static str],
    /// Fields whose population backs the metric, per required table.
    pub required_fields: &'static [(&'static str, &'static [&'static str])],
    pub allowed_dimensions: &'static [&'static str],
    pub allowed_grains: &'static [TimeGrain],
    /// True when the metric needs won/lost stage classification to be exact.
    pub requires_revenue_model: bool,
    pub chart_type: ChartType,
}

const MONTHLY: &[TimeGrain] = &[TimeGrain::Week, TimeGrain::Month, TimeGrain::Quarter];
const ALL_GRAINS: &[TimeGrain] = &[
    TimeGrain::Day,
    TimeGrain::Week,
    TimeGrain::Month,
    TimeGrain::Quarter,
];

/// All registered metrics.
pub const METRIC_CATALOG: &[MetricDefinition] = &[
    MetricDefinition {
        key: "win_rate",
        title: "Win rate",
        description: "Share of resolved deals that were won in the window.",
        required_tables: &[TABLE_DEALS],
        required_fields: &[(TABLE_DEALS, &["stage", "won", "close_date"])],
        allowed_dimensions: &["assigned_by_id", "lead_source"],
        allowed_grains: MONTHLY,
        requires_revenue_model: true,
        chart_type: ChartType::Scalar,
    },
    MetricDefinition {
        key: "pipeline_value",
        title: "Open pipeline value",
        description: "Total value of deals that are neither won nor lost.",
        required_tables: &[TABLE_DEALS],
        required_fields: &[(TABLE_DEALS, &["stage", "value"])],
        allowed_dimensions: &["assigned_by_id", "stage"],
        allowed_grains: MONTHLY,
        requires_revenue_model: true,
        chart_type: ChartType::Scalar,
    },
    MetricDefinition {
        key: "avg_deal_size",
        title: "Average deal size",
        description: "Average value of won deals in the window.",
        required_tables: &[TABLE_DEALS],
        required_fields: &[(TABLE_DEALS, &["stage", "value", "close_date"])],
        allowed_dimensions: &["assigned_by_id", "lead_source"],
        allowed_grains: MONTHLY,
        requires_revenue_model: true,
        chart_type: ChartType::Scalar,
    },
    MetricDefinition {
        key: "sales_cycle_days",
        title: "Sales cycle length",
        description: "Average days from deal creation to close for won deals.",
        required_tables: &[TABLE_DEALS],
        required_fields: &[(TABLE_DEALS, &["created_at", "close_date", "stage"])],
        allowed_dimensions: &[],
        allowed_grains: MONTHLY,
        requires_revenue_model: true,
        chart_type: ChartType::Scalar,
    },
    MetricDefinition {
        key: "open_deal_count",
        title: "Open deals",
        description: "Number of deals currently in the open pipeline.",
        required_tables: &[TABLE_DEALS],
        required_fields: &[(TABLE_DEALS, &["stage"])],
        allowed_dimensions: &["assigned_by_id", "stage"],
        allowed_grains: ALL_GRAINS,
        requires_revenue_model: true,
        chart_type: ChartType::Scalar,
    },
    MetricDefinition {
        key: "stage_funnel",
        title: "Stage funnel",
        description: "Open deal count per pipeline stage, in funnel order.",
        required_tables: &[TABLE_DEALS],
        required_fields: &[(TABLE_DEALS, &["stage"])],
        allowed_dimensions: &[],
        allowed_grains: MONTHLY,
        requires_revenue_model: true,
        chart_type: ChartType::Funnel,
    },
    MetricDefinition {
        key: "lead_conversion_rate",
        title: "Lead conversion rate",
        description: "Share of leads created in the window that converted.",
        required_tables: &[TABLE_LEADS],
        required_fields: &[(TABLE_LEADS, &["converted", "created_at"])],
        allowed_dimensions: &["source"],
        allowed_grains: MONTHLY,
        requires_revenue_model: false,
        chart_type: ChartType::Scalar,
    },
    MetricDefinition {
        key: "lead_volume",
        title: "Lead volume",
        description: "Leads created in the window.",
        required_tables: &[TABLE_LEADS],
        required_fields: &[(TABLE_LEADS, &["created_at"])],
        allowed_dimensions: &["source"],
        allowed_grains: ALL_GRAINS,
        requires_revenue_model: false,
        chart_type: ChartType::Bar,
    },
    MetricDefinition {
        key: "activity_volume",
        title: "Activity volume",
        description: "Activities logged in the window.",
        required_tables: &[TABLE_ACTIVITIES],
        required_fields: &[(TABLE_ACTIVITIES, &["created_at"])],
        allowed_dimensions: &["kind", "assigned_by_id"],
        allowed_grains: ALL_GRAINS,
        requires_revenue_model: false,
        chart_type: ChartType::Bar,
    },
    MetricDefinition {
        key: "activities_per_deal",
        title: "Activities per open deal",
        description: "Activities logged in the window per open deal.",
        required_tables: &[TABLE_ACTIVITIES, TABLE_DEALS],
        required_fields: &[
            (TABLE_ACTIVITIES, &["created_at"]),
            (TABLE_DEALS, &["stage"]),
        ],
        allowed_dimensions: &[],
        allowed_grains: MONTHLY,
        requires_revenue_model: true,
        chart_type: ChartType::Scalar,
    },
    MetricDefinition {
        key: "rep_pipeline",
        title: "Pipeline by rep",
        description: "Open pipeline value per assignee.",
        required_tables: &[TABLE_DEALS],
        required_fields: &[(TABLE_DEALS, &["stage", "value", "assigned_by_id"])],
        allowed_dimensions: &[],
        allowed_grains: MONTHLY,
        requires_revenue_model: true,
        chart_type: ChartType::Bar,
    },
    MetricDefinition {
        key: "lead_source_breakdown",
        title: "Deals by lead source",
        description: "Deals created in the window per lead source.",
        required_tables: &[TABLE_DEALS],
        required_fields: &[(TABLE_DEALS, &["lead_source", "created_at"])],
        allowed_dimensions: &[],
        allowed_grains: MONTHLY,
        requires_revenue_model: false,
        chart_type: ChartType::Pie,
    },
];

/// Look up a metric by key.
pub fn find_metric(key: &str) -> Option<&'static MetricDefinition> {
    METRIC_CATALOG.iter().find(|def| def.key == key)
}

/// All registered metric keys, in catalog order.
pub fn metric_keys() -> Vec<&'static str> {
    METRIC_CATALOG.iter().map(|def| def.key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_twelve_unique_keys() {
        assert_eq!(METRIC_CATALOG.len(), 12);
        let mut keys = metric_keys();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 12);
    }

    #[test]
    fn every_required_field_table_is_required() {
        for def in METRIC_CATALOG {
            for (table, _) in def.required_fields {
                assert!(
                    def.required_tables.contains(table),
                    "{} lists fields for non-required table {table}",
                    def.key
                );
            }
        }
    }
}
