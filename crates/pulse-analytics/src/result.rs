//! Metric result types — the universal output of catalog and recipe
//! computation, and the input to alert evaluation and snapshots.

use serde::{Deserialize, Serialize};

use pulse_core::types::ChartType;
use pulse_core::MetricEvidence;

/// One labelled point in a series result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// A metric value: a scalar or a labelled series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    Series(Vec<SeriesPoint>),
}

impl MetricValue {
    /// Scalar view; series values have no single scalar.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Series(_) => None,
        }
    }
}

/// Previous-period value for trend deltas. The caller computes percentage
/// change; the engine only reports the raw prior value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub previous_value: f64,
    pub previous_timeframe: String,
}

/// A computed metric with its evidence and derived confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub metric_key: String,
    pub title: String,
    pub value: MetricValue,
    pub chart_type: ChartType,
    pub evidence: MetricEvidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// Non-fatal data-quality notes.
    pub warnings: Vec<String>,
    /// Computation failures. A non-empty list means the value is unusable.
    pub errors: Vec<String>,
    /// Derived from evidence, distinct from the raw trust score.
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
    /// Human definition string for recipe-backed metrics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

/// Result of a tenant-specific declarative recipe. Shape-identical to a
/// catalog result; the distinction is who authored the definition.
pub type DynamicMetricResult = MetricResult;

impl MetricResult {
    /// A scalar result with confidence derived from its evidence.
    pub fn scalar(
        metric_key: impl Into<String>,
        title: impl Into<String>,
        value: f64,
        chart_type: ChartType,
        evidence: MetricEvidence,
    ) -> Self {
        let confidence = evidence.confidence();
        Self {
            metric_key: metric_key.into(),
            title: title.into(),
            value: MetricValue::Scalar(value),
            chart_type,
            evidence,
            dimension: None,
            warnings: Vec::new(),
            errors: Vec::new(),
            confidence,
            comparison: None,
            definition: None,
        }
    }

    /// A series result with confidence derived from its evidence.
    pub fn series(
        metric_key: impl Into<String>,
        title: impl Into<String>,
        data: Vec<SeriesPoint>,
        chart_type: ChartType,
        evidence: MetricEvidence,
    ) -> Self {
        let confidence = evidence.confidence();
        Self {
            metric_key: metric_key.into(),
            title: title.into(),
            value: MetricValue::Series(data),
            chart_type,
            evidence,
            dimension: None,
            warnings: Vec::new(),
            errors: Vec::new(),
            confidence,
            comparison: None,
            definition: None,
        }
    }

    /// An explicit error result. Confidence is zero; the caller still gets
    /// a structured object rather than an exception.
    pub fn error(
        metric_key: impl Into<String>,
        title: impl Into<String>,
        timeframe: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            metric_key: metric_key.into(),
            title: title.into(),
            value: MetricValue::Scalar(0.0),
            chart_type: ChartType::Scalar,
            evidence: MetricEvidence::empty(timeframe),
            dimension: None,
            warnings: Vec::new(),
            errors: vec![message.into()],
            confidence: 0.0,
            comparison: None,
            definition: None,
        }
    }

    /// Relative change vs. the previous period, when a comparison with a
    /// nonzero baseline is attached.
    pub fn relative_change(&self) -> Option<f64> {
        let current = self.value.as_scalar()?;
        let previous = self.comparison.as_ref()?.previous_value;
        if previous == 0.0 {
            return None;
        }
        Some((current - previous) / previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_change_requires_nonzero_baseline() {
        let mut result = MetricResult::scalar(
            "m",
            "M",
            120.0,
            ChartType::Scalar,
            MetricEvidence::from_counts("last_30_days", 100, 100, Default::default()),
        );
        assert_eq!(result.relative_change(), None);
        result.comparison = Some(Comparison {
            previous_value: 100.0,
            previous_timeframe: "previous_last_30_days".into(),
        });
        assert!((result.relative_change().unwrap() - 0.2).abs() < 1e-9);
        result.comparison = Some(Comparison {
            previous_value: 0.0,
            previous_timeframe: "previous_last_30_days".into(),
        });
        assert_eq!(result.relative_change(), None);
    }
}
