//! Tenant-generated alert rule tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use pulse_analytics::alerts::tenant_rules::{evaluate_tenant_rules, load_tenant_rules};
use pulse_analytics::alerts::types::{AlertContext, AlertType};
use pulse_analytics::result::{Comparison, MetricResult};
use pulse_core::row::Row;
use pulse_core::traits::store::test_helpers::MemoryStore;
use pulse_core::types::ChartType;
use pulse_core::{
    AlertThresholds, EngineLimits, MetricEvidence, Severity, TenantScope, Timeframe,
};

fn scope() -> TenantScope {
    TenantScope::new("tenant-1", "pipedrive")
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn ctx<'a>(
    store: &'a MemoryStore,
    scope: &'a TenantScope,
    thresholds: &'a AlertThresholds,
    limits: &'a EngineLimits,
) -> AlertContext<'a> {
    AlertContext {
        store,
        scope,
        now: now(),
        timeframe: Timeframe::last_days(now(), 30),
        model: None,
        thresholds,
        limits,
    }
}

fn metric_with_change(key: &str, current: f64, previous: f64) -> MetricResult {
    let mut result = MetricResult::scalar(
        key,
        key,
        current,
        ChartType::Scalar,
        MetricEvidence::from_counts("last_30_days", 100, 100, Default::default()),
    );
    result.comparison = Some(Comparison {
        previous_value: previous,
        previous_timeframe: "previous_last_30_days".into(),
    });
    result
}

fn rule_row(id: &str, rule: serde_json::Value) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), json!(id));
    row.insert("rule".into(), rule);
    row
}

#[test]
fn trend_decline_fires_only_on_decline() {
    let store = MemoryStore::new();
    let scope = scope();
    store.seed(
        &scope,
        "tenant_alert_rules",
        vec![rule_row(
            "r1",
            json!({"pattern": "trend_decline", "metric_id": "new_deals"}),
        )],
    );
    let configs = load_tenant_rules(&store, &scope).unwrap();
    assert_eq!(configs.len(), 1);

    let thresholds = AlertThresholds::default();
    let limits = EngineLimits::default();
    let ctx = ctx(&store, &scope, &thresholds, &limits);

    // 40% decline: fires critical (default critical threshold is 30%).
    let falling = [metric_with_change("new_deals", 60.0, 100.0)];
    let alerts = evaluate_tenant_rules(&ctx, &configs, &falling);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::TrendDecline);
    assert_eq!(alerts[0].severity, Severity::Critical);

    // 20% decline: warning.
    let dipping = [metric_with_change("new_deals", 80.0, 100.0)];
    let alerts = evaluate_tenant_rules(&ctx, &configs, &dipping);
    assert_eq!(alerts[0].severity, Severity::Warning);

    // Growth never alerts.
    let rising = [metric_with_change("new_deals", 140.0, 100.0)];
    assert!(evaluate_tenant_rules(&ctx, &configs, &rising).is_empty());

    // Small decline under the warning threshold stays quiet.
    let flat = [metric_with_change("new_deals", 95.0, 100.0)];
    assert!(evaluate_tenant_rules(&ctx, &configs, &flat).is_empty());
}

#[test]
fn stagnation_requires_five_records_and_escalates() {
    let store = MemoryStore::new();
    let scope = scope();
    let configs = vec![serde_json::from_value(
        json!({"pattern": "stagnation", "table": "crm_deals"}),
    )
    .unwrap()];

    let stale_row = |id: &str, days: i64| {
        let mut row = Row::new();
        row.insert("id".into(), json!(id));
        row.insert(
            "modified_at".into(),
            json!((now() - Duration::days(days)).to_rfc3339()),
        );
        row
    };

    let thresholds = AlertThresholds::default();
    let limits = EngineLimits::default();

    // Four records: under the floor, never alerts.
    store.seed(
        &scope,
        "crm_deals",
        (0..4).map(|i| stale_row(&format!("d{i}"), 200)).collect(),
    );
    let ctx1 = ctx(&store, &scope, &thresholds, &limits);
    assert!(evaluate_tenant_rules(&ctx1, &configs, &[]).is_empty());

    // Two more ancient records: 6 total, all stale past 90 days → critical.
    store.seed(
        &scope,
        "crm_deals",
        (4..6).map(|i| stale_row(&format!("d{i}"), 200)).collect(),
    );
    let ctx2 = ctx(&store, &scope, &thresholds, &limits);
    let alerts = evaluate_tenant_rules(&ctx2, &configs, &[]);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::Stagnation);
    assert_eq!(alerts[0].severity, Severity::Critical);
}

#[test]
fn concentration_ignores_single_valued_dimensions() {
    let store = MemoryStore::new();
    let scope = scope();
    let deal = |id: &str, assignee: &str, value: f64| {
        let mut row = Row::new();
        row.insert("id".into(), json!(id));
        row.insert("assigned_by_id".into(), json!(assignee));
        row.insert("value".into(), json!(value));
        row
    };
    // A one-rep CRM: concentration over assignees is meaningless.
    store.seed(
        &scope,
        "crm_deals",
        vec![
            deal("d1", "solo", 9000.0),
            deal("d2", "solo", 500.0),
            deal("d3", "solo", 500.0),
        ],
    );

    let configs = vec![serde_json::from_value(json!({
        "pattern": "concentration",
        "table": "crm_deals",
        "dimension": "assigned_by_id",
        "value_field": "value"
    }))
    .unwrap()];

    let thresholds = AlertThresholds::default();
    let limits = EngineLimits::default();
    let ctx = ctx(&store, &scope, &thresholds, &limits);
    assert!(evaluate_tenant_rules(&ctx, &configs, &[]).is_empty());
}

#[test]
fn concentration_fires_when_one_value_dominates() {
    let store = MemoryStore::new();
    let scope = scope();
    let deal = |id: &str, assignee: &str, value: f64| {
        let mut row = Row::new();
        row.insert("id".into(), json!(id));
        row.insert("assigned_by_id".into(), json!(assignee));
        row.insert("value".into(), json!(value));
        row
    };
    store.seed(
        &scope,
        "crm_deals",
        vec![
            deal("d1", "ace", 9000.0),
            deal("d2", "rookie", 500.0),
            deal("d3", "rookie2", 500.0),
        ],
    );

    let configs = vec![serde_json::from_value(json!({
        "pattern": "concentration",
        "table": "crm_deals",
        "dimension": "assigned_by_id",
        "value_field": "value"
    }))
    .unwrap()];

    let thresholds = AlertThresholds::default();
    let limits = EngineLimits::default();
    let ctx = ctx(&store, &scope, &thresholds, &limits);
    let alerts = evaluate_tenant_rules(&ctx, &configs, &[]);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::Concentration);
    assert_eq!(alerts[0].severity, Severity::Critical);
}

#[test]
fn missing_data_checks_fill_rate() {
    let store = MemoryStore::new();
    let scope = scope();
    let deal = |id: &str, value: serde_json::Value| {
        let mut row = Row::new();
        row.insert("id".into(), json!(id));
        row.insert("value".into(), value);
        row
    };
    store.seed(
        &scope,
        "crm_deals",
        vec![
            deal("d1", json!(100)),
            deal("d2", json!(null)),
            deal("d3", json!(null)),
            deal("d4", json!(null)),
        ],
    );

    let configs = vec![serde_json::from_value(json!({
        "pattern": "missing_data",
        "table": "crm_deals",
        "field": "value"
    }))
    .unwrap()];

    let thresholds = AlertThresholds::default();
    let limits = EngineLimits::default();
    let ctx = ctx(&store, &scope, &thresholds, &limits);
    let alerts = evaluate_tenant_rules(&ctx, &configs, &[]);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::MissingData);
    let fill = alerts[0].evidence.detail["fill_rate"].as_f64().unwrap();
    assert!((fill - 0.25).abs() < 1e-9);
}

#[test]
fn divergence_fires_when_signs_contradict_expectation() {
    let store = MemoryStore::new();
    let scope = scope();
    let configs = vec![serde_json::from_value(json!({
        "pattern": "divergence",
        "metric_a": "activity_volume",
        "metric_b": "new_deals",
        "expectation": "together"
    }))
    .unwrap()];

    let thresholds = AlertThresholds::default();
    let limits = EngineLimits::default();
    let ctx = ctx(&store, &scope, &thresholds, &limits);

    // Activity up 30%, deals down 25%: contradicts "together", 55% total.
    let metrics = [
        metric_with_change("activity_volume", 130.0, 100.0),
        metric_with_change("new_deals", 75.0, 100.0),
    ];
    let alerts = evaluate_tenant_rules(&ctx, &configs, &metrics);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::Divergence);

    // Both moving up together: expected, no alert.
    let aligned = [
        metric_with_change("activity_volume", 130.0, 100.0),
        metric_with_change("new_deals", 120.0, 100.0),
    ];
    assert!(evaluate_tenant_rules(&ctx, &configs, &aligned).is_empty());

    // Contradicting signs but tiny total divergence: no alert.
    let faint = [
        metric_with_change("activity_volume", 104.0, 100.0),
        metric_with_change("new_deals", 97.0, 100.0),
    ];
    assert!(evaluate_tenant_rules(&ctx, &configs, &faint).is_empty());
}

#[test]
fn invalid_rule_rows_are_dropped_at_load_time() {
    let store = MemoryStore::new();
    let scope = scope();
    store.seed(
        &scope,
        "tenant_alert_rules",
        vec![
            rule_row("good", json!({"pattern": "trend_decline", "metric_id": "m"})),
            rule_row("bad_pattern", json!({"pattern": "teleport"})),
            rule_row(
                "bad_field",
                json!({
                    "pattern": "missing_data",
                    "table": "crm_deals",
                    "field": "not_whitelisted"
                }),
            ),
        ],
    );
    let configs = load_tenant_rules(&store, &scope).unwrap();
    assert_eq!(configs.len(), 1);
}
