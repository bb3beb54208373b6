//! Recipe engine tests: the six recipe shapes, evidence derivation, and
//! period-over-period comparison.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use pulse_analytics::recipes::{compile_recipe, CompiledMetric, RecipeEngine};
use pulse_core::row::Row;
use pulse_core::traits::store::test_helpers::MemoryStore;
use pulse_core::{EngineLimits, TenantScope};

fn scope() -> TenantScope {
    TenantScope::new("tenant-1", "pipedrive")
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn metric(id: &str, recipe: serde_json::Value) -> CompiledMetric {
    CompiledMetric {
        id: id.to_string(),
        title: id.to_string(),
        recipe: compile_recipe(&recipe).unwrap(),
    }
}

fn deal(id: &str, value: serde_json::Value, days_ago: i64) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), json!(id));
    row.insert("value".into(), value);
    row.insert(
        "created_at".into(),
        json!((now() - Duration::days(days_ago)).to_rfc3339()),
    );
    row
}

#[test]
fn sum_over_zero_rows_is_zero_with_zero_trust() {
    let store = MemoryStore::new();
    let limits = EngineLimits::default();
    let engine = RecipeEngine::new(&store, &limits);
    let metric = metric(
        "total_value",
        json!({"kind": "sum", "table": "crm_deals", "field": "value"}),
    );
    let result = engine.execute(&scope(), &metric, now());
    assert_eq!(result.value.as_scalar(), Some(0.0));
    assert_eq!(result.evidence.row_count, 0);
    assert_eq!(result.evidence.data_trust_score, 0.0);
    assert_eq!(result.confidence, 0.0);
    assert!(result.errors.is_empty());
}

#[test]
fn avg_and_distinct_count_over_zero_rows_are_zero_not_errors() {
    let store = MemoryStore::new();
    let limits = EngineLimits::default();
    let engine = RecipeEngine::new(&store, &limits);

    let avg = engine.execute(
        &scope(),
        &metric("avg", json!({"kind": "avg", "table": "crm_deals", "field": "value"})),
        now(),
    );
    assert_eq!(avg.value.as_scalar(), Some(0.0));
    assert!(avg.errors.is_empty());

    let distinct = engine.execute(
        &scope(),
        &metric(
            "stages",
            json!({"kind": "distinct_count", "table": "crm_deals", "field": "stage"}),
        ),
        now(),
    );
    assert_eq!(distinct.value.as_scalar(), Some(0.0));
    assert_eq!(distinct.evidence.row_count, 0);
    assert_eq!(distinct.confidence, 0.0);
}

#[test]
fn ratio_with_zero_denominator_never_raises() {
    let store = MemoryStore::new();
    let scope = scope();
    store.seed(
        &scope,
        "crm_deals",
        vec![deal("d1", json!(100), 5), deal("d2", json!(200), 6)],
    );
    let limits = EngineLimits::default();
    let engine = RecipeEngine::new(&store, &limits);
    let metric = metric(
        "deals_per_lead",
        json!({
            "kind": "ratio",
            "numerator": {"agg": "count", "table": "crm_deals"},
            "denominator": {"agg": "count", "table": "crm_leads"},
            "multiplier": 100.0
        }),
    );
    let result = engine.execute(&scope, &metric, now());
    assert_eq!(result.value.as_scalar(), Some(0.0));
    assert!(result.errors.is_empty());
    assert!(result
        .evidence
        .computation_notes
        .iter()
        .any(|note| note.contains("Denominator is zero")));
    assert!(result.confidence <= 0.7);
}

#[test]
fn low_sample_caps_confidence_at_half() {
    let store = MemoryStore::new();
    let scope = scope();
    store.seed(
        &scope,
        "crm_deals",
        vec![
            deal("d1", json!(100), 1),
            deal("d2", json!(300), 2),
            deal("d3", json!(200), 3),
        ],
    );
    let limits = EngineLimits::default();
    let engine = RecipeEngine::new(&store, &limits);
    let result = engine.execute(
        &scope,
        &metric("sum", json!({"kind": "sum", "table": "crm_deals", "field": "value"})),
        now(),
    );
    assert_eq!(result.value.as_scalar(), Some(600.0));
    assert!(result.confidence <= 0.5);
}

#[test]
fn duration_excludes_rows_missing_either_end() {
    let store = MemoryStore::new();
    let scope = scope();
    let mut complete_10 = deal("d1", json!(100), 30);
    complete_10.insert(
        "close_date".into(),
        json!((now() - Duration::days(20)).to_rfc3339()),
    );
    let mut complete_20 = deal("d2", json!(100), 40);
    complete_20.insert(
        "close_date".into(),
        json!((now() - Duration::days(20)).to_rfc3339()),
    );
    let missing_end = deal("d3", json!(100), 50);
    store.seed(
        &scope,
        "crm_deals",
        vec![complete_10, complete_20, missing_end],
    );

    let limits = EngineLimits::default();
    let engine = RecipeEngine::new(&store, &limits);
    let result = engine.execute(
        &scope,
        &metric(
            "cycle",
            json!({
                "kind": "duration",
                "table": "crm_deals",
                "start_field": "created_at",
                "end_field": "close_date",
                "unit": "days"
            }),
        ),
        now(),
    );
    // (10 + 20) / 2, the third deal is excluded.
    assert_eq!(result.value.as_scalar(), Some(15.0));
}

#[test]
fn count_with_window_compares_against_previous_period() {
    let store = MemoryStore::new();
    let scope = scope();
    store.seed(
        &scope,
        "crm_deals",
        vec![
            deal("d1", json!(1), 5),
            deal("d2", json!(1), 10),
            deal("d3", json!(1), 15),
            deal("d4", json!(1), 35),
            deal("d5", json!(1), 45),
        ],
    );
    let limits = EngineLimits::default();
    let engine = RecipeEngine::new(&store, &limits);
    let metric = metric(
        "new_deals",
        json!({
            "kind": "count",
            "table": "crm_deals",
            "window": {"days": 30, "field": "created_at"}
        }),
    );
    let result = engine.execute_with_comparison(&scope, &metric, now());
    assert_eq!(result.value.as_scalar(), Some(3.0));
    let comparison = result.comparison.expect("windowed count compares");
    assert_eq!(comparison.previous_value, 2.0);
    assert!(comparison.previous_timeframe.contains("previous"));
}

#[test]
fn ratio_skips_comparison() {
    let store = MemoryStore::new();
    let scope = scope();
    store.seed(&scope, "crm_deals", vec![deal("d1", json!(1), 5)]);
    store.seed(&scope, "crm_leads", vec![deal("l1", json!(1), 5)]);
    let limits = EngineLimits::default();
    let engine = RecipeEngine::new(&store, &limits);
    let metric = metric(
        "ratio",
        json!({
            "kind": "ratio",
            "numerator": {"agg": "count", "table": "crm_deals"},
            "denominator": {"agg": "count", "table": "crm_leads"}
        }),
    );
    let result = engine.execute_with_comparison(&scope, &metric, now());
    assert!(result.comparison.is_none());
}

#[test]
fn filters_respect_the_suffix_grammar() {
    let store = MemoryStore::new();
    let scope = scope();
    store.seed(
        &scope,
        "crm_deals",
        vec![
            deal("d1", json!(50), 1),
            deal("d2", json!(500), 2),
            deal("d3", json!(5000), 3),
            deal("d4", json!(null), 4),
        ],
    );
    let limits = EngineLimits::default();
    let engine = RecipeEngine::new(&store, &limits);
    let result = engine.execute(
        &scope,
        &metric(
            "big_deals",
            json!({
                "kind": "count",
                "table": "crm_deals",
                "filters": {"value__gte": 500}
            }),
        ),
        now(),
    );
    assert_eq!(result.value.as_scalar(), Some(2.0));
}

#[test]
fn store_failure_becomes_an_error_result() {
    let store = MemoryStore::new();
    store.fail_table("crm_deals");
    let limits = EngineLimits::default();
    let engine = RecipeEngine::new(&store, &limits);
    let result = engine.execute(
        &scope(),
        &metric("sum", json!({"kind": "sum", "table": "crm_deals", "field": "value"})),
        now(),
    );
    assert!(!result.errors.is_empty());
    assert_eq!(result.confidence, 0.0);
}
