//! Snapshot orchestration.
//!
//! One call computes every catalog metric (validated, trust-sampled),
//! executes the tenant's generated recipes, evaluates alerts, and persists
//! the snapshot and open-alert set through the store trait. Best-effort
//! throughout: individual failures degrade to error results or warnings,
//! never abort the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use pulse_core::constants::{ALERT_STATUS_OPEN, TABLE_ALERTS, TABLE_SNAPSHOTS};
use pulse_core::row::Row;
use pulse_core::{FieldFilter, PulseConfig, TabularStore, TenantScope, Timeframe};

use crate::alerts::{compute_alerts, AlertContext, AlertRecord};
use crate::catalog::{compute_metric, trust, MetricValidator, METRIC_CATALOG};
use crate::recipes::{load_tenant_metrics, RecipeEngine};
use crate::result::{DynamicMetricResult, MetricResult};
use crate::revenue::builder::load_confirmed_model;

/// One persisted snapshot: all catalog metric results for a timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub tenant_id: String,
    pub crm_source: String,
    pub timeframe: String,
    pub computed_at: DateTime<Utc>,
    pub metrics: Vec<MetricResult>,
    pub dynamic_metrics: Vec<DynamicMetricResult>,
    pub alert_count: u64,
}

/// Result of one snapshot run.
#[derive(Debug, Clone)]
pub struct SnapshotOutcome {
    pub snapshot: SnapshotRecord,
    pub alerts: Vec<AlertRecord>,
    /// Non-fatal problems hit along the way (persistence, model load).
    pub warnings: Vec<String>,
}

/// Compute and persist a full snapshot for the tenant.
pub fn compute_snapshot(
    store: &dyn TabularStore,
    scope: &TenantScope,
    now: DateTime<Utc>,
    timeframe: &Timeframe,
    config: &PulseConfig,
) -> SnapshotOutcome {
    let mut warnings = Vec::new();

    let model = match load_confirmed_model(store, scope) {
        Ok(model) => model,
        Err(e) => {
            tracing::warn!(error = %e, "revenue model load failed; computing without one");
            warnings.push(format!("Revenue model unavailable: {e}"));
            None
        }
    };

    // One validator per pass: its population cache must not outlive us.
    let validator = MetricValidator::new(store);
    let mut metrics = Vec::with_capacity(METRIC_CATALOG.len());
    for def in METRIC_CATALOG {
        let outcome = validator.validate(scope, def.key, None);
        if !outcome.ok {
            metrics.push(MetricResult::error(
                def.key,
                def.title,
                timeframe.label.clone(),
                outcome
                    .reason
                    .unwrap_or_else(|| "validation failed".to_string()),
            ));
            continue;
        }

        let mut result = compute_metric(
            store,
            scope,
            def,
            timeframe,
            None,
            model.as_ref(),
            &config.limits,
        );

        // Fold trust-sampled null rates into the result evidence so the
        // snapshot carries field-level data quality alongside the value.
        match trust::compute_trust(store, scope, def, &config.limits, &timeframe.label) {
            Ok(trust_evidence) => {
                result.evidence.null_rates = trust_evidence.null_rates;
                result.evidence.fields_evaluated = trust_evidence.fields_evaluated;
                result.evidence.data_trust_score = result.evidence.derive_trust();
                result.confidence = result.evidence.confidence();
            }
            Err(e) => {
                result
                    .warnings
                    .push(format!("Trust sampling unavailable: {e}"));
            }
        }
        metrics.push(result);
    }

    // Tenant-generated recipes, with period-over-period comparison.
    let engine = RecipeEngine::new(store, &config.limits);
    let dynamic_metrics: Vec<DynamicMetricResult> = match load_tenant_metrics(store, scope) {
        Ok(compiled) => compiled
            .iter()
            .map(|metric| engine.execute_with_comparison(scope, metric, now))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "tenant metrics unavailable");
            warnings.push(format!("Tenant metrics unavailable: {e}"));
            Vec::new()
        }
    };

    let ctx = AlertContext {
        store,
        scope,
        now,
        timeframe: timeframe.clone(),
        model: model.as_ref(),
        thresholds: &config.thresholds,
        limits: &config.limits,
    };
    let alerts = compute_alerts(&ctx, &dynamic_metrics);

    let snapshot = SnapshotRecord {
        tenant_id: scope.tenant_id.clone(),
        crm_source: scope.crm_source.clone(),
        timeframe: timeframe.label.clone(),
        computed_at: now,
        metrics,
        dynamic_metrics,
        alert_count: alerts.len() as u64,
    };

    if let Err(e) = persist_snapshot(store, scope, &snapshot) {
        warnings.push(format!("Snapshot not persisted: {e}"));
    }
    if let Err(e) = replace_open_alerts(store, scope, now, &alerts) {
        warnings.push(format!("Alerts not persisted: {e}"));
    }

    SnapshotOutcome {
        snapshot,
        alerts,
        warnings,
    }
}

fn persist_snapshot(
    store: &dyn TabularStore,
    scope: &TenantScope,
    snapshot: &SnapshotRecord,
) -> Result<(), pulse_core::StoreError> {
    let value = serde_json::to_value(snapshot).map_err(|e| {
        pulse_core::StoreError::Serialization {
            message: e.to_string(),
        }
    })?;
    let serde_json::Value::Object(row) = value else {
        return Err(pulse_core::StoreError::Serialization {
            message: "snapshot did not serialize to an object".to_string(),
        });
    };
    store.insert(scope, TABLE_SNAPSHOTS, &[row])?;
    Ok(())
}

/// Delete-then-reinsert the tenant's open alerts. Dismissed rows are owned
/// by the caller's workflow and are left untouched.
pub fn replace_open_alerts(
    store: &dyn TabularStore,
    scope: &TenantScope,
    now: DateTime<Utc>,
    alerts: &[AlertRecord],
) -> Result<(), pulse_core::StoreError> {
    store.delete(
        scope,
        TABLE_ALERTS,
        &[FieldFilter::eq("status", json!(ALERT_STATUS_OPEN))],
    )?;
    let rows: Vec<Row> = alerts
        .iter()
        .map(|alert| {
            let mut row = Row::new();
            row.insert("alert_type".into(), json!(alert.alert_type.as_str()));
            row.insert("severity".into(), json!(alert.severity.as_str()));
            row.insert("summary".into(), json!(alert.summary));
            row.insert(
                "evidence".into(),
                serde_json::to_value(&alert.evidence).unwrap_or(serde_json::Value::Null),
            );
            row.insert(
                "recommended_actions".into(),
                json!(alert.recommended_actions),
            );
            row.insert("status".into(), json!(ALERT_STATUS_OPEN));
            row.insert("created_at".into(), json!(now.to_rfc3339()));
            row
        })
        .collect();
    if !rows.is_empty() {
        store.insert(scope, TABLE_ALERTS, &rows)?;
    }
    Ok(())
}
