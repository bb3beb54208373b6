//! Filter model — the only way any component touches row data.
//!
//! Recipe authors write string keys like `value__gte` or `stage__in`;
//! those are parsed into [`FieldFilter`] at load time so an invalid
//! operator is a structured error instead of silent equality. Filter
//! evaluation over JSON rows lives here and is shared by the in-memory
//! store, the SQLite store, and the recipe engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::RecipeError;
use crate::row::{self, Row};

/// Comparison operators accepted by the filter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Bare field key — equality, with boolean/null special cases.
    Eq,
    /// `field__not`
    Not,
    /// `field__gt`
    Gt,
    /// `field__lt`
    Lt,
    /// `field__gte`
    Gte,
    /// `field__lte`
    Lte,
    /// `field__is` — null / boolean identity check.
    Is,
    /// `field__in` — membership in a JSON array.
    In,
}

impl FilterOp {
    pub fn as_suffix(&self) -> &'static str {
        match self {
            Self::Eq => "",
            Self::Not => "not",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Is => "is",
            Self::In => "in",
        }
    }
}

/// One parsed filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Shorthand for an equality filter.
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }
}

/// Parse a suffixed filter key (`value__gte`) into field + operator.
///
/// Keys without a `__` separator are equality. Keys with an unrecognized
/// suffix are rejected; they never fall through to equality.
pub fn parse_filter_key(key: &str) -> Result<(String, FilterOp), RecipeError> {
    match key.rsplit_once("__") {
        None => Ok((key.to_string(), FilterOp::Eq)),
        Some((field, suffix)) => {
            let op = match suffix {
                "not" => FilterOp::Not,
                "gt" => FilterOp::Gt,
                "lt" => FilterOp::Lt,
                "gte" => FilterOp::Gte,
                "lte" => FilterOp::Lte,
                "is" => FilterOp::Is,
                "in" => FilterOp::In,
                _ => {
                    return Err(RecipeError::UnknownOperator {
                        field: field.to_string(),
                        suffix: suffix.to_string(),
                    })
                }
            };
            Ok((field.to_string(), op))
        }
    }
}

/// Parse a `{key: value}` filter map into a vector of [`FieldFilter`]s.
pub fn parse_filter_map(
    map: &serde_json::Map<String, Value>,
) -> Result<Vec<FieldFilter>, RecipeError> {
    let mut filters = Vec::with_capacity(map.len());
    for (key, value) in map {
        let (field, op) = parse_filter_key(key)?;
        filters.push(FieldFilter::new(field, op, value.clone()));
    }
    Ok(filters)
}

/// Evaluate a single filter against a row.
pub fn matches_filter(row: &Row, filter: &FieldFilter) -> bool {
    let field_value = row.get(&filter.field);
    match filter.op {
        FilterOp::Eq => values_equal(field_value, &filter.value),
        FilterOp::Not => !values_equal(field_value, &filter.value),
        FilterOp::Gt => compare(field_value, &filter.value).is_some_and(|o| o.is_gt()),
        FilterOp::Lt => compare(field_value, &filter.value).is_some_and(|o| o.is_lt()),
        FilterOp::Gte => compare(field_value, &filter.value).is_some_and(|o| o.is_ge()),
        FilterOp::Lte => compare(field_value, &filter.value).is_some_and(|o| o.is_le()),
        FilterOp::Is => match &filter.value {
            Value::Null => matches!(field_value, None | Some(Value::Null)),
            Value::Bool(expected) => truthy(field_value) == *expected,
            other => values_equal(field_value, other),
        },
        FilterOp::In => match &filter.value {
            Value::Array(candidates) => candidates
                .iter()
                .any(|candidate| values_equal(field_value, candidate)),
            _ => false,
        },
    }
}

/// Evaluate all filters (conjunction).
pub fn matches_all(row: &Row, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|f| matches_filter(row, f))
}

/// Equality with numeric coercion and boolean/null special cases.
fn values_equal(field_value: Option<&Value>, expected: &Value) -> bool {
    match (field_value, expected) {
        (None, Value::Null) | (Some(Value::Null), Value::Null) => true,
        (None, _) => false,
        (Some(actual), expected) => {
            if actual == expected {
                return true;
            }
            // Numeric coercion: "42" == 42 == 42.0
            if let (Some(a), Some(b)) = (row::value_as_f64(actual), row::value_as_f64(expected)) {
                if matches!(actual, Value::Number(_) | Value::String(_))
                    && matches!(expected, Value::Number(_) | Value::String(_))
                {
                    return a == b;
                }
            }
            // Boolean special case: true matches 1/"true", false matches 0/"false".
            if let Value::Bool(b) = expected {
                return truthy(Some(actual)) == *b && bool_like(actual);
            }
            false
        }
    }
}

/// Ordering for range operators. Numbers compare numerically; strings
/// compare lexically (ISO 8601 timestamps order correctly this way).
fn compare(field_value: Option<&Value>, expected: &Value) -> Option<std::cmp::Ordering> {
    let actual = field_value?;
    if let (Value::String(a), Value::String(b)) = (actual, expected) {
        // Prefer numeric comparison when both sides parse as numbers.
        if let (Ok(x), Ok(y)) = (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
            return x.partial_cmp(&y);
        }
        return Some(a.as_str().cmp(b.as_str()));
    }
    let a = row::value_as_f64(actual)?;
    let b = row::value_as_f64(expected)?;
    a.partial_cmp(&b)
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

fn bool_like(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_f64(), Some(0.0) | Some(1.0)),
        Value::String(s) => matches!(
            s.to_ascii_lowercase().as_str(),
            "true" | "false" | "1" | "0" | "yes" | "no"
        ),
        _ => false,
    }
}

/// Sort direction for [`SelectQuery::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

/// A bounded, whitelisted select against one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectQuery {
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<(String, SortDir)>,
    pub limit: Option<usize>,
    /// Empty = all columns.
    pub columns: Vec<String>,
}

impl SelectQuery {
    pub fn filtered(filters: Vec<FieldFilter>) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_order(mut self, field: impl Into<String>, dir: SortDir) -> Self {
        self.order_by = Some((field.into(), dir));
        self
    }
}

/// Apply order/limit/column projection to rows already filtered.
/// Shared by store implementations that filter client-side.
pub fn apply_query_shape(mut rows: Vec<Row>, query: &SelectQuery) -> Vec<Row> {
    if let Some((field, dir)) = &query.order_by {
        rows.sort_by(|a, b| {
            let ord = compare(a.get(field), b.get(field).unwrap_or(&Value::Null))
                .unwrap_or(std::cmp::Ordering::Equal);
            match dir {
                SortDir::Asc => ord,
                SortDir::Desc => ord.reverse(),
            }
        });
    }
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }
    if !query.columns.is_empty() {
        rows = rows
            .into_iter()
            .map(|row| {
                let mut projected = Row::new();
                for col in &query.columns {
                    if let Some(v) = row.get(col) {
                        projected.insert(col.clone(), v.clone());
                    }
                }
                projected
            })
            .collect();
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        let mut r = Row::new();
        for (k, v) in pairs {
            r.insert((*k).to_string(), v.clone());
        }
        r
    }

    #[test]
    fn parse_recognizes_all_suffixes() {
        assert_eq!(parse_filter_key("amount__gt").unwrap().1, FilterOp::Gt);
        assert_eq!(parse_filter_key("amount__lte").unwrap().1, FilterOp::Lte);
        assert_eq!(parse_filter_key("stage__in").unwrap().1, FilterOp::In);
        assert_eq!(parse_filter_key("won").unwrap(), ("won".into(), FilterOp::Eq));
    }

    #[test]
    fn parse_rejects_unknown_suffix() {
        let err = parse_filter_key("stage__bogus").unwrap_err();
        assert!(err.to_string().contains("bogus"), "{err}");
    }

    #[test]
    fn equality_matches_booleans_loosely() {
        let r = row(&[("won", json!(true))]);
        assert!(matches_filter(&r, &FieldFilter::eq("won", json!(true))));
        let r = row(&[("won", json!(1))]);
        assert!(matches_filter(&r, &FieldFilter::eq("won", json!(true))));
        let r = row(&[("won", json!("false"))]);
        assert!(matches_filter(&r, &FieldFilter::eq("won", json!(false))));
    }

    #[test]
    fn null_equality_covers_missing_fields() {
        let r = row(&[("a", json!(1))]);
        assert!(matches_filter(&r, &FieldFilter::eq("missing", json!(null))));
        assert!(matches_filter(
            &r,
            &FieldFilter::new("missing", FilterOp::Is, json!(null))
        ));
    }

    #[test]
    fn range_operators_compare_numbers_and_dates() {
        let r = row(&[("value", json!(500)), ("close_date", json!("2026-02-01"))]);
        assert!(matches_filter(
            &r,
            &FieldFilter::new("value", FilterOp::Gt, json!(100))
        ));
        assert!(matches_filter(
            &r,
            &FieldFilter::new("close_date", FilterOp::Gte, json!("2026-01-15"))
        ));
        assert!(!matches_filter(
            &r,
            &FieldFilter::new("close_date", FilterOp::Lt, json!("2026-01-15"))
        ));
    }

    #[test]
    fn in_operator_checks_membership() {
        let r = row(&[("stage", json!("demo"))]);
        assert!(matches_filter(
            &r,
            &FieldFilter::new("stage", FilterOp::In, json!(["demo", "proposal"]))
        ));
        assert!(!matches_filter(
            &r,
            &FieldFilter::new("stage", FilterOp::In, json!(["won"]))
        ));
    }

    #[test]
    fn query_shape_orders_limits_and_projects() {
        let rows = vec![
            row(&[("v", json!(3)), ("x", json!("a"))]),
            row(&[("v", json!(1)), ("x", json!("b"))]),
            row(&[("v", json!(2)), ("x", json!("c"))]),
        ];
        let q = SelectQuery::default()
            .with_order("v", SortDir::Desc)
            .with_limit(2);
        let shaped = apply_query_shape(rows, &q);
        assert_eq!(shaped.len(), 2);
        assert_eq!(shaped[0].get("v"), Some(&json!(3)));
    }
}
