//! Recipe loading and compilation.
//!
//! Tenant recipes arrive as JSON rows in `tenant_metrics`, written either
//! by a human or by the external recipe generator. Every recipe is
//! validated here before it can run; invalid ones are dropped with a
//! warning rather than failing the whole load.

use serde_json::Value;

use pulse_core::constants::TABLE_TENANT_METRICS;
use pulse_core::filter::parse_filter_map;
use pulse_core::{
    FieldFilter, MetricError, RecipeError, SelectQuery, TabularStore, TenantScope,
};

use super::types::{
    CompiledAggSpec, CompiledMetric, CompiledRecipe, RawAggSpec, RawRecipe, KNOWN_KINDS,
};
use super::whitelist::{check_field, check_table};

/// Compile and validate a raw recipe JSON value.
pub fn compile_recipe(raw: &Value) -> Result<CompiledRecipe, RecipeError> {
    // Fail fast on unknown kinds so the error names the bad tag instead of
    // surfacing as a generic deserialization failure.
    let kind = raw
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| RecipeError::InvalidConfig {
            message: "recipe is missing a 'kind' tag".to_string(),
        })?;
    if !KNOWN_KINDS.contains(&kind) {
        return Err(RecipeError::UnknownKind {
            kind: kind.to_string(),
        });
    }

    let raw_recipe: RawRecipe =
        serde_json::from_value(raw.clone()).map_err(|e| RecipeError::InvalidConfig {
            message: e.to_string(),
        })?;

    match raw_recipe {
        RawRecipe::Count {
            table,
            filters,
            window,
        } => {
            check_table(&table)?;
            let filters = compile_filters(&table, &filters)?;
            check_window(&table, &window)?;
            Ok(CompiledRecipe::Count {
                table,
                filters,
                window,
            })
        }
        RawRecipe::Sum {
            table,
            field,
            filters,
            window,
        } => {
            check_field(&table, &field)?;
            let filters = compile_filters(&table, &filters)?;
            check_window(&table, &window)?;
            Ok(CompiledRecipe::Sum {
                table,
                field,
                filters,
                window,
            })
        }
        RawRecipe::Avg {
            table,
            field,
            filters,
            window,
        } => {
            check_field(&table, &field)?;
            let filters = compile_filters(&table, &filters)?;
            check_window(&table, &window)?;
            Ok(CompiledRecipe::Avg {
                table,
                field,
                filters,
                window,
            })
        }
        RawRecipe::Ratio {
            numerator,
            denominator,
            multiplier,
        } => Ok(CompiledRecipe::Ratio {
            numerator: compile_agg_spec(numerator)?,
            denominator: compile_agg_spec(denominator)?,
            multiplier,
        }),
        RawRecipe::Duration {
            table,
            start_field,
            end_field,
            unit,
            filters,
            window,
        } => {
            check_field(&table, &start_field)?;
            check_field(&table, &end_field)?;
            let filters = compile_filters(&table, &filters)?;
            check_window(&table, &window)?;
            Ok(CompiledRecipe::Duration {
                table,
                start_field,
                end_field,
                unit,
                filters,
                window,
            })
        }
        RawRecipe::DistinctCount {
            table,
            field,
            filters,
            window,
        } => {
            check_field(&table, &field)?;
            let filters = compile_filters(&table, &filters)?;
            check_window(&table, &window)?;
            Ok(CompiledRecipe::DistinctCount {
                table,
                field,
                filters,
                window,
            })
        }
    }
}

fn compile_agg_spec(raw: RawAggSpec) -> Result<CompiledAggSpec, RecipeError> {
    match (&raw.agg, &raw.field) {
        (super::types::AggKind::Count, _) => check_table(&raw.table)?,
        (_, Some(field)) => check_field(&raw.table, field)?,
        (agg, None) => {
            return Err(RecipeError::InvalidConfig {
                message: format!("{agg:?} aggregation requires a field"),
            })
        }
    }
    let filters = compile_filters(&raw.table, &raw.filters)?;
    Ok(CompiledAggSpec {
        agg: raw.agg,
        table: raw.table,
        field: raw.field,
        filters,
    })
}

fn compile_filters(
    table: &str,
    raw: &serde_json::Map<String, Value>,
) -> Result<Vec<FieldFilter>, RecipeError> {
    let filters = parse_filter_map(raw)?;
    for filter in &filters {
        check_field(table, &filter.field)?;
    }
    Ok(filters)
}

fn check_window(
    table: &str,
    window: &Option<super::types::TimeWindow>,
) -> Result<(), RecipeError> {
    if let Some(window) = window {
        check_field(table, &window.field)?;
        if window.days <= 0 {
            return Err(RecipeError::InvalidConfig {
                message: format!("window.days must be positive, got {}", window.days),
            });
        }
    }
    Ok(())
}

/// Load, compile, and validate all tenant recipes.
///
/// Each `tenant_metrics` row carries `id`, `title`, and a `recipe` payload
/// (object, or a JSON-encoded string from older sync versions). Rows that
/// fail validation are dropped with a warning; one bad generated recipe
/// must not take out the tenant's whole metric set.
pub fn load_tenant_metrics(
    store: &dyn TabularStore,
    scope: &TenantScope,
) -> Result<Vec<CompiledMetric>, MetricError> {
    let rows = store.select(scope, TABLE_TENANT_METRICS, &SelectQuery::default())?;
    let mut compiled = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("unnamed_metric")
            .to_string();
        let title = row
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(&id)
            .to_string();
        let Some(raw_recipe) = row.get("recipe") else {
            tracing::warn!(metric_id = %id, "tenant metric row has no recipe; dropped");
            continue;
        };
        // Older rows store the recipe as a JSON string.
        let parsed: Value = match raw_recipe {
            Value::String(text) => match serde_json::from_str(text) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(metric_id = %id, error = %e, "unparseable recipe; dropped");
                    continue;
                }
            },
            other => other.clone(),
        };
        match compile_recipe(&parsed) {
            Ok(recipe) => compiled.push(CompiledMetric { id, title, recipe }),
            Err(e) => {
                tracing::warn!(metric_id = %id, error = %e, "invalid recipe; dropped");
            }
        }
    }
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_kind_is_rejected_by_name() {
        let err = compile_recipe(&json!({"kind": "median", "table": "crm_deals"})).unwrap_err();
        assert!(matches!(err, RecipeError::UnknownKind { .. }));
        assert!(err.to_string().contains("median"));
    }

    #[test]
    fn unknown_operator_is_rejected_at_load_time() {
        let err = compile_recipe(&json!({
            "kind": "count",
            "table": "crm_deals",
            "filters": {"value__between": 10}
        }))
        .unwrap_err();
        assert!(matches!(err, RecipeError::UnknownOperator { .. }));
    }

    #[test]
    fn non_whitelisted_field_is_rejected() {
        let err = compile_recipe(&json!({
            "kind": "sum",
            "table": "crm_deals",
            "field": "secret_margin"
        }))
        .unwrap_err();
        assert!(matches!(err, RecipeError::FieldNotAllowed { .. }));
    }

    #[test]
    fn valid_ratio_compiles() {
        let recipe = compile_recipe(&json!({
            "kind": "ratio",
            "numerator": {"agg": "count", "table": "crm_deals", "filters": {"won": true}},
            "denominator": {"agg": "count", "table": "crm_deals"},
            "multiplier": 100.0
        }))
        .unwrap();
        assert_eq!(recipe.kind(), "ratio");
        assert!(!recipe.supports_comparison());
    }
}
