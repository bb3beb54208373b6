//! Recipe types: the raw serde layer and the compiled, validated form.
//!
//! Raw specs mirror the JSON stored in `tenant_metrics`. Compilation
//! parses the filter grammar, checks the whitelist, and produces a closed
//! tagged-variant type with per-variant fields, so an unknown recipe kind
//! or operator is rejected at load time, never at execution time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use pulse_core::FieldFilter;

/// Aggregation kinds allowed on either side of a ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggKind {
    Count,
    Sum,
    Avg,
}

/// Units for duration recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    #[default]
    Days,
    Hours,
    Seconds,
}

impl DurationUnit {
    /// Seconds per unit.
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Days => 86_400.0,
            Self::Hours => 3_600.0,
            Self::Seconds => 1.0,
        }
    }
}

/// A trailing time window over a timestamp field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub days: i64,
    #[serde(default = "default_window_field")]
    pub field: String,
}

fn default_window_field() -> String {
    "created_at".to_string()
}

// ---------------------------------------------------------------------------
// Raw serde layer (as stored in tenant_metrics).
// ---------------------------------------------------------------------------

/// One side of a ratio, as authored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAggSpec {
    pub agg: AggKind,
    pub table: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub filters: Map<String, Value>,
}

/// A recipe as authored. `kind` selects the variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawRecipe {
    Count {
        table: String,
        #[serde(default)]
        filters: Map<String, Value>,
        #[serde(default)]
        window: Option<TimeWindow>,
    },
    Sum {
        table: String,
        field: String,
        #[serde(default)]
        filters: Map<String, Value>,
        #[serde(default)]
        window: Option<TimeWindow>,
    },
    Avg {
        table: String,
        field: String,
        #[serde(default)]
        filters: Map<String, Value>,
        #[serde(default)]
        window: Option<TimeWindow>,
    },
    Ratio {
        numerator: RawAggSpec,
        denominator: RawAggSpec,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
    },
    Duration {
        table: String,
        start_field: String,
        end_field: String,
        #[serde(default)]
        unit: DurationUnit,
        #[serde(default)]
        filters: Map<String, Value>,
        #[serde(default)]
        window: Option<TimeWindow>,
    },
    DistinctCount {
        table: String,
        field: String,
        #[serde(default)]
        filters: Map<String, Value>,
        #[serde(default)]
        window: Option<TimeWindow>,
    },
}

fn default_multiplier() -> f64 {
    1.0
}

/// Recipe kinds understood by the loader, for fail-fast kind checking.
pub const KNOWN_KINDS: &[&str] = &["count", "sum", "avg", "ratio", "duration", "distinct_count"];

// ---------------------------------------------------------------------------
// Compiled, validated form.
// ---------------------------------------------------------------------------

/// A validated aggregation side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledAggSpec {
    pub agg: AggKind,
    pub table: String,
    pub field: Option<String>,
    pub filters: Vec<FieldFilter>,
}

/// A validated recipe, ready for bounded execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompiledRecipe {
    Count {
        table: String,
        filters: Vec<FieldFilter>,
        window: Option<TimeWindow>,
    },
    Sum {
        table: String,
        field: String,
        filters: Vec<FieldFilter>,
        window: Option<TimeWindow>,
    },
    Avg {
        table: String,
        field: String,
        filters: Vec<FieldFilter>,
        window: Option<TimeWindow>,
    },
    Ratio {
        numerator: CompiledAggSpec,
        denominator: CompiledAggSpec,
        multiplier: f64,
    },
    Duration {
        table: String,
        start_field: String,
        end_field: String,
        unit: DurationUnit,
        filters: Vec<FieldFilter>,
        window: Option<TimeWindow>,
    },
    DistinctCount {
        table: String,
        field: String,
        filters: Vec<FieldFilter>,
        window: Option<TimeWindow>,
    },
}

impl CompiledRecipe {
    /// Recipe kind tag (matches the authored `kind` value).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Count { .. } => "count",
            Self::Sum { .. } => "sum",
            Self::Avg { .. } => "avg",
            Self::Ratio { .. } => "ratio",
            Self::Duration { .. } => "duration",
            Self::DistinctCount { .. } => "distinct_count",
        }
    }

    /// Period-over-period comparison is defined for windowed recipes only,
    /// and never for ratios.
    pub fn supports_comparison(&self) -> bool {
        match self {
            Self::Ratio { .. } => false,
            Self::Count { window, .. }
            | Self::Sum { window, .. }
            | Self::Avg { window, .. }
            | Self::Duration { window, .. }
            | Self::DistinctCount { window, .. } => window.is_some(),
        }
    }

    /// Human definition string used in evidence.
    pub fn definition(&self) -> String {
        match self {
            Self::Count { table, .. } => format!("count of {table} rows"),
            Self::Sum { table, field, .. } => format!("sum of {table}.{field}"),
            Self::Avg { table, field, .. } => format!("average of {table}.{field}"),
            Self::Ratio {
                numerator,
                denominator,
                multiplier,
            } => format!(
                "{:?} of {} over {:?} of {} × {multiplier}",
                numerator.agg, numerator.table, denominator.agg, denominator.table
            ),
            Self::Duration {
                table,
                start_field,
                end_field,
                unit,
                ..
            } => format!("average {table}.{end_field} − {table}.{start_field} in {unit:?}"),
            Self::DistinctCount { table, field, .. } => {
                format!("distinct values of {table}.{field}")
            }
        }
    }
}

/// A compiled tenant metric: id, title, and its validated recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledMetric {
    pub id: String,
    pub title: String,
    pub recipe: CompiledRecipe,
}
