//! Snapshot orchestration tests: full catalog computation, persistence,
//! and open-alert replacement.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use pulse_analytics::snapshot::compute_snapshot;
use pulse_analytics::MetricValue;
use pulse_core::row::Row;
use pulse_core::traits::store::test_helpers::MemoryStore;
use pulse_core::{PulseConfig, TenantScope, Timeframe};

fn scope() -> TenantScope {
    TenantScope::new("tenant-1", "pipedrive")
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn seed_tenant(store: &MemoryStore, scope: &TenantScope) {
    let deal = |id: &str, stage: &str, won: bool, closed: bool, value: f64, days: i64| {
        let mut row = Row::new();
        row.insert("id".into(), json!(id));
        row.insert("stage".into(), json!(stage));
        row.insert("won".into(), json!(won));
        row.insert("closed".into(), json!(closed));
        row.insert("value".into(), json!(value));
        row.insert("assigned_by_id".into(), json!("u1"));
        row.insert("lead_source".into(), json!("inbound"));
        row.insert(
            "created_at".into(),
            json!((now() - Duration::days(days + 20)).to_rfc3339()),
        );
        row.insert(
            "modified_at".into(),
            json!((now() - Duration::days(days)).to_rfc3339()),
        );
        row.insert(
            "close_date".into(),
            json!((now() - Duration::days(days)).to_rfc3339()),
        );
        row
    };
    let mut deals = Vec::new();
    for i in 0..6 {
        deals.push(deal(&format!("won{i}"), "won", true, true, 4000.0, 5 + i));
    }
    for i in 0..6 {
        deals.push(deal(&format!("lost{i}"), "lost", false, true, 2000.0, 5 + i));
    }
    for i in 0..8 {
        let mut open = deal(&format!("open{i}"), "demo", false, false, 3000.0, 2 + i);
        open.insert(
            "close_date".into(),
            json!((now() + Duration::days(30)).to_rfc3339()),
        );
        deals.push(open);
    }
    store.seed(scope, "crm_deals", deals);

    let lead = |id: &str, converted: bool| {
        let mut row = Row::new();
        row.insert("id".into(), json!(id));
        row.insert("source".into(), json!("webform"));
        row.insert("converted".into(), json!(converted));
        row.insert(
            "created_at".into(),
            json!((now() - Duration::days(10)).to_rfc3339()),
        );
        row
    };
    store.seed(
        scope,
        "crm_leads",
        (0..12).map(|i| lead(&format!("l{i}"), i % 3 == 0)).collect(),
    );

    let activity = |id: &str| {
        let mut row = Row::new();
        row.insert("id".into(), json!(id));
        row.insert("kind".into(), json!("call"));
        row.insert("assigned_by_id".into(), json!("u1"));
        row.insert(
            "created_at".into(),
            json!((now() - Duration::days(3)).to_rfc3339()),
        );
        row
    };
    store.seed(
        scope,
        "crm_activities",
        (0..15).map(|i| activity(&format!("a{i}"))).collect(),
    );
}

#[test]
fn snapshot_covers_the_whole_catalog_and_persists() {
    let store = MemoryStore::new();
    let scope = scope();
    seed_tenant(&store, &scope);

    let config = PulseConfig::default();
    let timeframe = Timeframe::last_days(now(), 30);
    let outcome = compute_snapshot(&store, &scope, now(), &timeframe, &config);

    assert_eq!(outcome.snapshot.metrics.len(), 12);
    // Every metric computed (no validation failures on a seeded tenant).
    for metric in &outcome.snapshot.metrics {
        assert!(
            metric.errors.is_empty(),
            "{} errored: {:?}",
            metric.metric_key,
            metric.errors
        );
    }

    let win_rate = outcome
        .snapshot
        .metrics
        .iter()
        .find(|m| m.metric_key == "win_rate")
        .unwrap();
    match &win_rate.value {
        MetricValue::Scalar(v) => assert!((*v - 0.5).abs() < 1e-9, "win rate {v}"),
        MetricValue::Series(_) => panic!("expected scalar win rate"),
    }
    assert!(win_rate.confidence > 0.0);

    // Exactly one snapshot row was persisted.
    let persisted = store.rows(&scope, "revenue_snapshots");
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].get("tenant_id"), Some(&json!("tenant-1")));
}

#[test]
fn open_alerts_are_replaced_and_dismissed_rows_survive() {
    let store = MemoryStore::new();
    let scope = scope();
    seed_tenant(&store, &scope);

    // Pre-existing alert state: one dismissed, one stale open.
    let mut dismissed = Row::new();
    dismissed.insert("alert_type".into(), json!("concentration_risk"));
    dismissed.insert("status".into(), json!("dismissed"));
    let mut stale_open = Row::new();
    stale_open.insert("alert_type".into(), json!("conversion_drop"));
    stale_open.insert("status".into(), json!("open"));
    store.seed(&scope, "revenue_alerts", vec![dismissed, stale_open]);

    let config = PulseConfig::default();
    let timeframe = Timeframe::last_days(now(), 30);
    let outcome = compute_snapshot(&store, &scope, now(), &timeframe, &config);

    let rows = store.rows(&scope, "revenue_alerts");
    // The stale open alert is gone; the dismissed row survived.
    assert!(rows
        .iter()
        .any(|row| row.get("status") == Some(&json!("dismissed"))));
    let open_rows: Vec<_> = rows
        .iter()
        .filter(|row| row.get("status") == Some(&json!("open")))
        .collect();
    assert_eq!(open_rows.len(), outcome.alerts.len());
    assert!(!open_rows
        .iter()
        .any(|row| row.get("alert_type") == Some(&json!("conversion_drop"))),
        "stale open alert should have been replaced");
}

#[test]
fn snapshot_degrades_gracefully_when_a_table_fails() {
    let store = MemoryStore::new();
    let scope = scope();
    seed_tenant(&store, &scope);
    store.fail_table("crm_leads");

    let config = PulseConfig::default();
    let timeframe = Timeframe::last_days(now(), 30);
    let outcome = compute_snapshot(&store, &scope, now(), &timeframe, &config);

    // Lead metrics fail with structured errors; deal metrics still compute.
    let lead_volume = outcome
        .snapshot
        .metrics
        .iter()
        .find(|m| m.metric_key == "lead_volume")
        .unwrap();
    assert!(!lead_volume.errors.is_empty());

    let open_deals = outcome
        .snapshot
        .metrics
        .iter()
        .find(|m| m.metric_key == "open_deal_count")
        .unwrap();
    assert!(open_deals.errors.is_empty());
}
