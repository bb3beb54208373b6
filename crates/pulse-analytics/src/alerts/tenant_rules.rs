//! Tenant-generated alert rules.
//!
//! Unlike the fixed catalog rules, these are patterns parameterized by
//! tenant configuration rows (`tenant_alert_rules`) and evaluated against
//! the tenant's generated metrics or raw tables. Invalid configs are
//! dropped at load time; a failing evaluation is skipped, never fatal.

use chrono::Duration;
use serde::Deserialize;
use serde_json::{json, Value};

use pulse_core::constants::TABLE_TENANT_ALERT_RULES;
use pulse_core::row::field_is_null;
use pulse_core::{
    FieldFilter, FilterOp, MetricError, SelectQuery, Severity, TabularStore, TenantScope,
};

use crate::recipes::whitelist::{check_field, check_table};
use crate::result::DynamicMetricResult;

use super::stats::{rule_confidence, top_share};
use super::types::{AlertContext, AlertEvidence, AlertRecord, AlertType};

/// Expected relationship between two metrics in a divergence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivergenceExpectation {
    /// The metrics normally move in the same direction.
    Together,
    /// The metrics normally move in opposite directions.
    Inverse,
}

/// A parsed tenant alert rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum TenantRuleConfig {
    /// Fires only on decline of a generated metric.
    TrendDecline {
        metric_id: String,
        #[serde(default)]
        warning_decline: Option<f64>,
        #[serde(default)]
        critical_decline: Option<f64>,
    },
    /// Entity-level staleness as a fraction of total records.
    Stagnation {
        table: String,
        #[serde(default)]
        warning_days: Option<i64>,
        #[serde(default)]
        critical_days: Option<i64>,
        #[serde(default)]
        min_fraction: Option<f64>,
    },
    /// One dimension value dominating a summed field.
    Concentration {
        table: String,
        dimension: String,
        value_field: String,
    },
    /// Fill rate of a field below a threshold.
    MissingData {
        table: String,
        field: String,
        #[serde(default)]
        fill_rate: Option<f64>,
    },
    /// Two metrics moving against their expected relationship.
    Divergence {
        metric_a: String,
        metric_b: String,
        expectation: DivergenceExpectation,
        #[serde(default)]
        min_change: Option<f64>,
    },
}

impl TenantRuleConfig {
    /// Validate table/field references against the query whitelist.
    fn validate(&self) -> Result<(), MetricError> {
        match self {
            Self::Stagnation { table, .. } => {
                check_table(table)?;
                check_field(table, "modified_at")?;
            }
            Self::Concentration {
                table,
                dimension,
                value_field,
            } => {
                check_field(table, dimension)?;
                check_field(table, value_field)?;
            }
            Self::MissingData { table, field, .. } => {
                check_field(table, field)?;
            }
            Self::TrendDecline { .. } | Self::Divergence { .. } => {}
        }
        Ok(())
    }
}

/// Load and validate the tenant's alert rule configs. Invalid rows are
/// dropped with a warning.
pub fn load_tenant_rules(
    store: &dyn TabularStore,
    scope: &TenantScope,
) -> Result<Vec<TenantRuleConfig>, MetricError> {
    let rows = store.select(scope, TABLE_TENANT_ALERT_RULES, &SelectQuery::default())?;
    let mut configs = Vec::with_capacity(rows.len());
    for row in rows {
        let rule_id = row
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("unnamed_rule")
            .to_string();
        let Some(raw) = row.get("rule") else {
            tracing::warn!(rule_id = %rule_id, "alert rule row has no rule payload; dropped");
            continue;
        };
        let parsed: Value = match raw {
            Value::String(text) => match serde_json::from_str(text) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(rule_id = %rule_id, error = %e, "unparseable rule; dropped");
                    continue;
                }
            },
            other => other.clone(),
        };
        match serde_json::from_value::<TenantRuleConfig>(parsed) {
            Ok(config) => match config.validate() {
                Ok(()) => configs.push(config),
                Err(e) => {
                    tracing::warn!(rule_id = %rule_id, error = %e, "rule failed whitelist; dropped");
                }
            },
            Err(e) => {
                tracing::warn!(rule_id = %rule_id, error = %e, "invalid rule config; dropped");
            }
        }
    }
    Ok(configs)
}

/// Evaluate all tenant rules with per-rule failure isolation.
pub fn evaluate_tenant_rules(
    ctx: &AlertContext<'_>,
    configs: &[TenantRuleConfig],
    metrics: &[DynamicMetricResult],
) -> Vec<AlertRecord> {
    let mut alerts = Vec::new();
    for config in configs {
        match evaluate_rule(ctx, config, metrics) {
            Ok(mut fired) => alerts.append(&mut fired),
            Err(e) => {
                tracing::error!(error = %e, "tenant rule evaluation failed; skipped");
            }
        }
    }
    alerts
}

fn evaluate_rule(
    ctx: &AlertContext<'_>,
    config: &TenantRuleConfig,
    metrics: &[DynamicMetricResult],
) -> Result<Vec<AlertRecord>, MetricError> {
    match config {
        TenantRuleConfig::TrendDecline {
            metric_id,
            warning_decline,
            critical_decline,
        } => Ok(trend_decline(
            metrics,
            metric_id,
            warning_decline.unwrap_or_else(|| ctx.thresholds.effective_trend_warning_decline()),
            critical_decline.unwrap_or_else(|| ctx.thresholds.effective_trend_critical_decline()),
        )),
        TenantRuleConfig::Stagnation {
            table,
            warning_days,
            critical_days,
            min_fraction,
        } => stagnation(
            ctx,
            table,
            warning_days.unwrap_or_else(|| ctx.thresholds.effective_stagnation_warning_days()),
            critical_days.unwrap_or_else(|| ctx.thresholds.effective_stagnation_critical_days()),
            min_fraction.unwrap_or_else(|| ctx.thresholds.effective_stagnation_min_fraction()),
        ),
        TenantRuleConfig::Concentration {
            table,
            dimension,
            value_field,
        } => concentration(ctx, table, dimension, value_field),
        TenantRuleConfig::MissingData {
            table,
            field,
            fill_rate,
        } => missing_data(
            ctx,
            table,
            field,
            fill_rate.unwrap_or_else(|| ctx.thresholds.effective_missing_data_fill_rate()),
        ),
        TenantRuleConfig::Divergence {
            metric_a,
            metric_b,
            expectation,
            min_change,
        } => Ok(divergence(
            metrics,
            metric_a,
            metric_b,
            *expectation,
            min_change.unwrap_or_else(|| ctx.thresholds.effective_divergence_min_change()),
        )),
    }
}

/// Fires only on decline: positive change never alerts.
fn trend_decline(
    metrics: &[DynamicMetricResult],
    metric_id: &str,
    warning_decline: f64,
    critical_decline: f64,
) -> Vec<AlertRecord> {
    let Some(metric) = metrics.iter().find(|m| m.metric_key == metric_id) else {
        return Vec::new();
    };
    let Some(change) = metric.relative_change() else {
        return Vec::new();
    };
    if change >= 0.0 {
        return Vec::new();
    }
    let decline = -change;
    if decline < warning_decline {
        return Vec::new();
    }
    let severity = if decline >= critical_decline {
        Severity::Critical
    } else {
        Severity::Warning
    };
    let previous = metric
        .comparison
        .as_ref()
        .map(|c| c.previous_timeframe.clone())
        .unwrap_or_else(|| "previous_period".to_string());

    let evidence = AlertEvidence::with_baseline(previous, metric.confidence)
        .count("sampled_rows", metric.evidence.sampled_rows)
        .detail("metric_id", json!(metric_id))
        .detail("relative_change", json!(change));

    vec![AlertRecord {
        alert_type: AlertType::TrendDecline,
        severity,
        summary: format!(
            "{} declined {:.0}% versus the previous period",
            metric.title,
            decline * 100.0
        ),
        evidence,
        recommended_actions: vec![format!(
            "Investigate what changed behind '{}' this period",
            metric.title
        )],
    }]
}

/// Staleness as a fraction of total records, with a stricter cutoff for
/// escalation. Tiny tenants (< 5 records) never alert.
fn stagnation(
    ctx: &AlertContext<'_>,
    table: &str,
    warning_days: i64,
    critical_days: i64,
    min_fraction: f64,
) -> Result<Vec<AlertRecord>, MetricError> {
    let total = ctx.store.count(ctx.scope, table, &[])?;
    if total < ctx.thresholds.effective_stagnation_min_records() {
        return Ok(Vec::new());
    }

    let stale_filter = |days: i64| {
        vec![FieldFilter::new(
            "modified_at",
            FilterOp::Lt,
            Value::String((ctx.now - Duration::days(days)).to_rfc3339()),
        )]
    };
    let stale_warning = ctx.store.count(ctx.scope, table, &stale_filter(warning_days))?;
    let stale_critical = ctx
        .store
        .count(ctx.scope, table, &stale_filter(critical_days))?;

    let warning_fraction = stale_warning as f64 / total as f64;
    if warning_fraction < min_fraction {
        return Ok(Vec::new());
    }
    let critical_fraction = stale_critical as f64 / total as f64;
    let severity = if critical_fraction >= min_fraction {
        Severity::Critical
    } else {
        Severity::Warning
    };

    let evidence = AlertEvidence::for_timeframe("current", rule_confidence(total))
        .count("total_records", total)
        .count("stale_records", stale_warning)
        .detail("table", json!(table))
        .detail("stale_fraction", json!(warning_fraction))
        .detail("warning_cutoff_days", json!(warning_days))
        .detail("critical_cutoff_days", json!(critical_days));

    Ok(vec![AlertRecord {
        alert_type: AlertType::Stagnation,
        severity,
        summary: format!(
            "{:.0}% of {table} records have not been touched in {warning_days}+ days",
            warning_fraction * 100.0
        ),
        evidence,
        recommended_actions: vec![
            format!("Triage the untouched {table} records"),
            "Archive records that are no longer being worked".to_string(),
        ],
    }])
}

/// One dimension value dominating a summed field. A single-valued
/// dimension (e.g. a one-rep CRM) is excluded as meaningless.
fn concentration(
    ctx: &AlertContext<'_>,
    table: &str,
    dimension: &str,
    value_field: &str,
) -> Result<Vec<AlertRecord>, MetricError> {
    let rows = ctx.fetch(table, Vec::new())?;
    let mut sums: std::collections::BTreeMap<String, f64> = Default::default();
    for row in &rows {
        let Some(key) = row.get(dimension).and_then(Value::as_str) else {
            continue;
        };
        *sums.entry(key.to_string()).or_insert(0.0) +=
            pulse_core::row::field_as_f64(row, value_field).unwrap_or(0.0);
    }
    if sums.len() < 2 {
        return Ok(Vec::new());
    }
    let Some((label, share)) = top_share(sums.iter().map(|(k, v)| (k.as_str(), *v))) else {
        return Ok(Vec::new());
    };
    let warning = ctx.thresholds.effective_concentration_warning_share();
    if share < warning {
        return Ok(Vec::new());
    }
    let severity = if share >= ctx.thresholds.effective_concentration_critical_share() {
        Severity::Critical
    } else {
        Severity::Warning
    };

    let evidence = AlertEvidence::for_timeframe("current", rule_confidence(rows.len() as u64))
        .count("rows", rows.len() as u64)
        .count("dimension_values", sums.len() as u64)
        .detail("table", json!(table))
        .detail("dimension", json!(dimension))
        .detail("top_value", json!(label))
        .detail("top_share", json!(share));

    Ok(vec![AlertRecord {
        alert_type: AlertType::Concentration,
        severity,
        summary: format!(
            "'{label}' accounts for {:.0}% of {table}.{value_field} across {dimension}",
            share * 100.0
        ),
        evidence,
        recommended_actions: vec![format!(
            "Reduce dependence on '{label}' before it becomes a single point of failure"
        )],
    }])
}

/// Field fill rate below a threshold.
fn missing_data(
    ctx: &AlertContext<'_>,
    table: &str,
    field: &str,
    min_fill_rate: f64,
) -> Result<Vec<AlertRecord>, MetricError> {
    let rows = ctx.fetch(table, Vec::new())?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let filled = rows.iter().filter(|row| !field_is_null(row, field)).count();
    let fill_rate = filled as f64 / rows.len() as f64;
    if fill_rate >= min_fill_rate {
        return Ok(Vec::new());
    }

    let evidence = AlertEvidence::for_timeframe("current", rule_confidence(rows.len() as u64))
        .count("rows", rows.len() as u64)
        .count("filled_rows", filled as u64)
        .detail("table", json!(table))
        .detail("field", json!(field))
        .detail("fill_rate", json!(fill_rate));

    Ok(vec![AlertRecord {
        alert_type: AlertType::MissingData,
        severity: Severity::Warning,
        summary: format!(
            "Only {:.0}% of {table}.{field} is populated (expected at least {:.0}%)",
            fill_rate * 100.0,
            min_fill_rate * 100.0
        ),
        evidence,
        recommended_actions: vec![format!("Backfill {table}.{field} from the source CRM")],
    }])
}

/// Two metrics moving against their expected relationship.
fn divergence(
    metrics: &[DynamicMetricResult],
    metric_a: &str,
    metric_b: &str,
    expectation: DivergenceExpectation,
    min_change: f64,
) -> Vec<AlertRecord> {
    let change_of = |key: &str| {
        metrics
            .iter()
            .find(|m| m.metric_key == key)
            .and_then(|m| m.relative_change().map(|c| (m.title.clone(), c)))
    };
    let (Some((title_a, change_a)), Some((title_b, change_b))) =
        (change_of(metric_a), change_of(metric_b))
    else {
        return Vec::new();
    };

    let contradicts = match expectation {
        DivergenceExpectation::Together => change_a.signum() != change_b.signum(),
        DivergenceExpectation::Inverse => change_a.signum() == change_b.signum(),
    };
    let total_divergence = change_a.abs() + change_b.abs();
    if !contradicts || total_divergence < min_change {
        return Vec::new();
    }

    let evidence = AlertEvidence::with_baseline("previous_period", 0.7)
        .detail("metric_a", json!(metric_a))
        .detail("metric_b", json!(metric_b))
        .detail("change_a", json!(change_a))
        .detail("change_b", json!(change_b))
        .detail("total_divergence", json!(total_divergence));

    vec![AlertRecord {
        alert_type: AlertType::Divergence,
        severity: Severity::Warning,
        summary: format!(
            "{title_a} and {title_b} moved {} ({:+.0}% vs {:+.0}%), against expectation",
            match expectation {
                DivergenceExpectation::Together => "apart",
                DivergenceExpectation::Inverse => "together",
            },
            change_a * 100.0,
            change_b * 100.0
        ),
        evidence,
        recommended_actions: vec![format!(
            "Check whether the relationship between {title_a} and {title_b} actually changed"
        )],
    }]
}
