//! Row model for the tabular store.
//!
//! Rows are JSON objects. CRM sync writes heterogeneous payloads per
//! vendor, so the engine reads fields defensively through the coercion
//! helpers here rather than assuming types.

use chrono::{DateTime, NaiveDate, Utc};

pub use serde_json::Value;

/// A single record from a tabular store.
pub type Row = serde_json::Map<String, Value>;

/// Numeric view of a JSON value. Strings holding numbers are coerced.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Timestamp view of a JSON value. Accepts RFC 3339 timestamps and bare
/// `YYYY-MM-DD` dates (interpreted as midnight UTC).
pub fn value_as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0)?,
        Utc,
    ))
}

/// True when the field is absent or JSON null.
pub fn field_is_null(row: &Row, field: &str) -> bool {
    matches!(row.get(field), None | Some(Value::Null))
}

/// Field as f64, if present and coercible.
pub fn field_as_f64(row: &Row, field: &str) -> Option<f64> {
    row.get(field).and_then(value_as_f64)
}

/// Field as &str, if present.
pub fn field_as_str<'a>(row: &'a Row, field: &str) -> Option<&'a str> {
    row.get(field).and_then(Value::as_str)
}

/// Field as timestamp, if present and parseable.
pub fn field_as_datetime(row: &Row, field: &str) -> Option<DateTime<Utc>> {
    row.get(field).and_then(value_as_datetime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_coercion_handles_strings_and_bools() {
        assert_eq!(value_as_f64(&json!(3.5)), Some(3.5));
        assert_eq!(value_as_f64(&json!("42")), Some(42.0));
        assert_eq!(value_as_f64(&json!(" 7.25 ")), Some(7.25));
        assert_eq!(value_as_f64(&json!(true)), Some(1.0));
        assert_eq!(value_as_f64(&json!("n/a")), None);
        assert_eq!(value_as_f64(&json!(null)), None);
    }

    #[test]
    fn datetime_parses_rfc3339_and_bare_dates() {
        assert!(value_as_datetime(&json!("2026-03-01T12:30:00Z")).is_some());
        assert!(value_as_datetime(&json!("2026-03-01")).is_some());
        assert!(value_as_datetime(&json!("yesterday")).is_none());
    }

    #[test]
    fn null_check_covers_missing_and_explicit_null() {
        let mut row = Row::new();
        row.insert("a".into(), json!(null));
        assert!(field_is_null(&row, "a"));
        assert!(field_is_null(&row, "missing"));
        row.insert("b".into(), json!(0));
        assert!(!field_is_null(&row, "b"));
    }
}
