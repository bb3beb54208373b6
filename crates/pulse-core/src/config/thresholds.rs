//! Alert thresholds and fetch limits.
//!
//! All defaults preserve the observed production behavior (10 pp conversion
//! drop, 15 % stall share, 60 %/75 % concentration). They are embedder
//! overridable, not per-tenant.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AGGREGATION_FETCH_ROWS, DEFAULT_ALERT_SCAN_ROWS, DEFAULT_TRUST_SAMPLE_ROWS,
};

/// Thresholds used by the deterministic alert rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Minimum win-rate decline in percentage points for `conversion_drop`
    /// (strictly greater than). Default: 0.10.
    pub conversion_drop_pp: Option<f64>,
    /// Minimum deals per window for `conversion_drop`. Default: 5.
    pub min_deals_per_window: Option<u64>,
    /// Minimum stalled share of open pipeline for `pipeline_stall`. Default: 0.15.
    pub stall_min_share: Option<f64>,
    /// Minimum stalled deal count for `pipeline_stall`. Default: 2.
    pub stall_min_deals: Option<u64>,
    /// Activity decline fraction for `rep_slip`. Default: 0.20.
    pub rep_slip_activity_drop: Option<f64>,
    /// Pipeline growth fraction for `rep_slip`. Default: 0.10.
    pub rep_slip_pipeline_growth: Option<f64>,
    /// Minimum prior-period activities per assignee for `rep_slip`. Default: 3.
    pub rep_slip_min_activities: Option<u64>,
    /// Minimum flagged deals for `forecast_risk`. Default: 2.
    pub forecast_min_deals: Option<u64>,
    /// Trailing fraction of the stage order considered late-stage. Default: 0.25.
    pub forecast_trailing_fraction: Option<f64>,
    /// Pipeline share that warrants a concentration warning. Default: 0.60.
    pub concentration_warning_share: Option<f64>,
    /// Pipeline share that escalates concentration to critical. Default: 0.75.
    pub concentration_critical_share: Option<f64>,
    /// Trend decline fraction for warning severity. Default: 0.15.
    pub trend_warning_decline: Option<f64>,
    /// Trend decline fraction for critical severity. Default: 0.30.
    pub trend_critical_decline: Option<f64>,
    /// Staleness cutoff in days for stagnation warnings. Default: 30.
    pub stagnation_warning_days: Option<i64>,
    /// Stricter cutoff in days that escalates stagnation. Default: 90.
    pub stagnation_critical_days: Option<i64>,
    /// Minimum records before stagnation is evaluated. Default: 5.
    pub stagnation_min_records: Option<u64>,
    /// Stale fraction that fires stagnation. Default: 0.3.
    pub stagnation_min_fraction: Option<f64>,
    /// Fill rate below which `missing_data` fires. Default: 0.7.
    pub missing_data_fill_rate: Option<f64>,
    /// Minimum combined relative change for `divergence`. Default: 0.2.
    pub divergence_min_change: Option<f64>,
    /// Win rate below which the fallback health check flags. Default: 0.2.
    pub low_win_rate: Option<f64>,
}

impl AlertThresholds {
    pub fn effective_conversion_drop_pp(&self) -> f64 {
        self.conversion_drop_pp.unwrap_or(0.10)
    }

    pub fn effective_min_deals_per_window(&self) -> u64 {
        self.min_deals_per_window.unwrap_or(5)
    }

    pub fn effective_stall_min_share(&self) -> f64 {
        self.stall_min_share.unwrap_or(0.15)
    }

    pub fn effective_stall_min_deals(&self) -> u64 {
        self.stall_min_deals.unwrap_or(2)
    }

    pub fn effective_rep_slip_activity_drop(&self) -> f64 {
        self.rep_slip_activity_drop.unwrap_or(0.20)
    }

    pub fn effective_rep_slip_pipeline_growth(&self) -> f64 {
        self.rep_slip_pipeline_growth.unwrap_or(0.10)
    }

    pub fn effective_rep_slip_min_activities(&self) -> u64 {
        self.rep_slip_min_activities.unwrap_or(3)
    }

    pub fn effective_forecast_min_deals(&self) -> u64 {
        self.forecast_min_deals.unwrap_or(2)
    }

    pub fn effective_forecast_trailing_fraction(&self) -> f64 {
        self.forecast_trailing_fraction.unwrap_or(0.25)
    }

    pub fn effective_concentration_warning_share(&self) -> f64 {
        self.concentration_warning_share.unwrap_or(0.60)
    }

    pub fn effective_concentration_critical_share(&self) -> f64 {
        self.concentration_critical_share.unwrap_or(0.75)
    }

    pub fn effective_trend_warning_decline(&self) -> f64 {
        self.trend_warning_decline.unwrap_or(0.15)
    }

    pub fn effective_trend_critical_decline(&self) -> f64 {
        self.trend_critical_decline.unwrap_or(0.30)
    }

    pub fn effective_stagnation_warning_days(&self) -> i64 {
        self.stagnation_warning_days.unwrap_or(30)
    }

    pub fn effective_stagnation_critical_days(&self) -> i64 {
        self.stagnation_critical_days.unwrap_or(90)
    }

    pub fn effective_stagnation_min_records(&self) -> u64 {
        self.stagnation_min_records.unwrap_or(5)
    }

    pub fn effective_stagnation_min_fraction(&self) -> f64 {
        self.stagnation_min_fraction.unwrap_or(0.3)
    }

    pub fn effective_missing_data_fill_rate(&self) -> f64 {
        self.missing_data_fill_rate.unwrap_or(0.7)
    }

    pub fn effective_divergence_min_change(&self) -> f64 {
        self.divergence_min_change.unwrap_or(0.2)
    }

    pub fn effective_low_win_rate(&self) -> f64 {
        self.low_win_rate.unwrap_or(0.2)
    }
}

/// Fetch caps. The engine samples and estimates; it never scans unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLimits {
    /// Rows sampled per table for trust computation. Default: 200.
    pub trust_sample_rows: Option<usize>,
    /// Rows fetched for client-side aggregation. Default: 10 000.
    pub aggregation_fetch_rows: Option<usize>,
    /// Rows scanned by a single alert rule. Default: 20 000.
    pub alert_scan_rows: Option<usize>,
}

impl EngineLimits {
    pub fn effective_trust_sample_rows(&self) -> usize {
        self.trust_sample_rows.unwrap_or(DEFAULT_TRUST_SAMPLE_ROWS)
    }

    pub fn effective_aggregation_fetch_rows(&self) -> usize {
        self.aggregation_fetch_rows
            .unwrap_or(DEFAULT_AGGREGATION_FETCH_ROWS)
    }

    pub fn effective_alert_scan_rows(&self) -> usize {
        self.alert_scan_rows.unwrap_or(DEFAULT_ALERT_SCAN_ROWS)
    }
}
