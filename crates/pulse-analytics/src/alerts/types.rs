//! Alert types — the universal output of rule evaluation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pulse_core::row::Row;
use pulse_core::{
    AlertThresholds, EngineLimits, MetricError, SelectQuery, Severity, TabularStore, TenantScope,
    Timeframe,
};

use crate::revenue::RevenueModel;

/// Every alert the engine can raise, across rule families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    // Fixed catalog rules, computed every snapshot.
    PipelineStall,
    ConversionDrop,
    RepSlip,
    ForecastRisk,
    ConcentrationRisk,
    // Tenant-generated rule patterns.
    TrendDecline,
    Stagnation,
    Concentration,
    MissingData,
    Divergence,
    // Ad-hoc fallback health checks.
    StaleDeals,
    MissingFields,
    PipelineConcentration,
    LowWinRate,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PipelineStall => "pipeline_stall",
            Self::ConversionDrop => "conversion_drop",
            Self::RepSlip => "rep_slip",
            Self::ForecastRisk => "forecast_risk",
            Self::ConcentrationRisk => "concentration_risk",
            Self::TrendDecline => "trend_decline",
            Self::Stagnation => "stagnation",
            Self::Concentration => "concentration",
            Self::MissingData => "missing_data",
            Self::Divergence => "divergence",
            Self::StaleDeals => "stale_deals",
            Self::MissingFields => "missing_fields",
            Self::PipelineConcentration => "pipeline_concentration",
            Self::LowWinRate => "low_win_rate",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured alert evidence. `record_counts` and `confidence` are always
/// present; either `baseline_period` or `timeframe` is set by construction.
/// `detail` is the only free-form extension point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvidence {
    pub record_counts: BTreeMap<String, u64>,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    pub detail: BTreeMap<String, Value>,
}

impl AlertEvidence {
    /// Evidence anchored to a single observation window.
    pub fn for_timeframe(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            record_counts: BTreeMap::new(),
            confidence,
            baseline_period: None,
            timeframe: Some(label.into()),
            detail: BTreeMap::new(),
        }
    }

    /// Evidence comparing against a baseline period.
    pub fn with_baseline(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            record_counts: BTreeMap::new(),
            confidence,
            baseline_period: Some(label.into()),
            timeframe: None,
            detail: BTreeMap::new(),
        }
    }

    pub fn count(mut self, key: impl Into<String>, value: u64) -> Self {
        self.record_counts.insert(key.into(), value);
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.detail.insert(key.into(), value);
        self
    }
}

/// One fired alert. Alerts are recomputed wholesale per run and have no
/// identity across runs beyond their (tenant, type) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub summary: String,
    pub evidence: AlertEvidence,
    pub recommended_actions: Vec<String>,
}

/// Shared inputs for one alert evaluation pass.
pub struct AlertContext<'a> {
    pub store: &'a dyn TabularStore,
    pub scope: &'a TenantScope,
    pub now: DateTime<Utc>,
    pub timeframe: Timeframe,
    pub model: Option<&'a RevenueModel>,
    pub thresholds: &'a AlertThresholds,
    pub limits: &'a EngineLimits,
}

impl AlertContext<'_> {
    /// Capped fetch of all deal rows for the tenant.
    pub fn fetch_deals(&self) -> Result<Vec<Row>, MetricError> {
        let query = SelectQuery::default().with_limit(self.limits.effective_alert_scan_rows());
        Ok(self.store.select(self.scope, "crm_deals", &query)?)
    }

    /// Capped fetch of rows matching filters.
    pub fn fetch(
        &self,
        table: &str,
        filters: Vec<pulse_core::FieldFilter>,
    ) -> Result<Vec<Row>, MetricError> {
        let query = SelectQuery {
            filters,
            limit: Some(self.limits.effective_alert_scan_rows()),
            ..SelectQuery::default()
        };
        Ok(self.store.select(self.scope, table, &query)?)
    }
}
