//! Core value types: tenant scoping, severities, timeframes, chart hints.

pub mod collections;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The (tenant, CRM source) pair every query is scoped to.
///
/// There is no implicit ambient tenant anywhere in the engine; every public
/// entry point takes this explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    pub tenant_id: String,
    pub crm_source: String,
}

impl TenantScope {
    pub fn new(tenant_id: impl Into<String>, crm_source: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            crm_source: crm_source.into(),
        }
    }
}

/// Alert severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time grains a metric may be broken down by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGrain {
    Day,
    Week,
    Month,
    Quarter,
}

impl TimeGrain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "quarter" => Some(Self::Quarter),
            _ => None,
        }
    }
}

/// Chart rendering hint attached to a metric result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Scalar,
    Line,
    Bar,
    Pie,
    Funnel,
}

/// A half-open time window `[start, end)` with a human label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeframe {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
}

impl Timeframe {
    /// Window covering the trailing `days` days up to `now`.
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
            label: format!("last_{days}_days"),
        }
    }

    /// The immediately preceding window of equal length.
    pub fn previous(&self) -> Self {
        let span = self.end - self.start;
        Self {
            start: self.start - span,
            end: self.start,
            label: format!("previous_{}", self.label),
        }
    }

    /// Window length.
    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    /// True if `ts` falls inside the window.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_window_is_adjacent_and_equal_length() {
        let now = Utc::now();
        let tf = Timeframe::last_days(now, 30);
        let prev = tf.previous();
        assert_eq!(prev.end, tf.start);
        assert_eq!(prev.span(), tf.span());
    }

    #[test]
    fn timeframe_contains_is_half_open() {
        let now = Utc::now();
        let tf = Timeframe::last_days(now, 7);
        assert!(tf.contains(tf.start));
        assert!(!tf.contains(tf.end));
    }
}
