//! Metric validator tests: check ordering, messages, and the per-pass
//! population cache.

use serde_json::json;

use pulse_analytics::catalog::{metric_keys, MetricValidator, METRIC_CATALOG};
use pulse_core::row::Row;
use pulse_core::traits::store::test_helpers::MemoryStore;
use pulse_core::TenantScope;

fn scope() -> TenantScope {
    TenantScope::new("tenant-1", "pipedrive")
}

fn deal(id: &str) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), json!(id));
    row.insert("stage".into(), json!("demo"));
    row.insert("won".into(), json!(false));
    row.insert("value".into(), json!(1000));
    row
}

#[test]
fn unknown_metric_lists_real_catalog_keys() {
    let store = MemoryStore::new();
    let validator = MetricValidator::new(&store);
    let outcome = validator.validate(&scope(), "profit_margin", None);
    assert!(!outcome.ok);
    let reason = outcome.reason.unwrap();
    assert!(reason.contains("profit_margin"), "{reason}");
    // The message must contain at least one real catalog key.
    assert!(
        metric_keys().iter().any(|key| reason.contains(key)),
        "{reason}"
    );
}

#[test]
fn disallowed_dimension_is_named_in_the_error() {
    let store = MemoryStore::new();
    let scope = scope();
    store.seed(&scope, "crm_deals", vec![deal("d1")]);
    let validator = MetricValidator::new(&store);
    let outcome = validator.validate(&scope, "win_rate", Some("favorite_color"));
    assert!(!outcome.ok);
    let reason = outcome.reason.unwrap();
    assert!(reason.contains("favorite_color"), "{reason}");
    assert!(reason.contains("assigned_by_id"), "{reason}");
}

#[test]
fn dimension_check_runs_before_population_check() {
    // Empty store: the dimension error must win over the empty-table error.
    let store = MemoryStore::new();
    let validator = MetricValidator::new(&store);
    let outcome = validator.validate(&scope(), "win_rate", Some("favorite_color"));
    assert!(!outcome.ok);
    let reason = outcome.reason.unwrap();
    assert!(reason.contains("favorite_color"), "{reason}");
    assert!(!reason.contains("crm_deals"), "{reason}");
    // No row data was touched at all.
    assert_eq!(store.count_calls_for("crm_deals"), 0);
}

#[test]
fn empty_required_table_is_named() {
    let store = MemoryStore::new();
    let validator = MetricValidator::new(&store);
    let outcome = validator.validate(&scope(), "win_rate", None);
    assert!(!outcome.ok);
    assert!(outcome.reason.unwrap().contains("crm_deals"));
}

#[test]
fn population_counts_are_cached_within_one_pass() {
    let store = MemoryStore::new();
    let scope = scope();
    store.seed(&scope, "crm_deals", vec![deal("d1")]);
    store.seed(&scope, "crm_leads", vec![deal("l1")]);
    store.seed(&scope, "crm_activities", vec![deal("a1")]);

    let validator = MetricValidator::new(&store);
    for def in METRIC_CATALOG {
        let _ = validator.validate(&scope, def.key, None);
    }
    // Many metrics require crm_deals, but one pass issues one count.
    assert_eq!(store.count_calls_for("crm_deals"), 1);
    assert_eq!(store.count_calls_for("crm_leads"), 1);
    assert_eq!(store.count_calls_for("crm_activities"), 1);
}

#[test]
fn fresh_validator_does_not_reuse_stale_counts() {
    let store = MemoryStore::new();
    let scope = scope();
    store.seed(&scope, "crm_deals", vec![deal("d1")]);

    let first = MetricValidator::new(&store);
    assert!(first.validate(&scope, "open_deal_count", None).ok);

    let second = MetricValidator::new(&store);
    assert!(second.validate(&scope, "open_deal_count", None).ok);
    assert_eq!(store.count_calls_for("crm_deals"), 2);
}

#[test]
fn validation_survives_a_failing_backend() {
    let store = MemoryStore::new();
    store.fail_table("crm_deals");
    let validator = MetricValidator::new(&store);
    let outcome = validator.validate(&scope(), "win_rate", None);
    assert!(!outcome.ok);
    assert!(outcome.reason.unwrap().contains("crm_deals"));
}
