//! # pulse-core
//!
//! Foundation crate for the Pulse revenue analytics engine.
//! Defines tenant scoping, the tabular store trait and filter model,
//! the evidence/trust types, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod evidence;
pub mod filter;
pub mod row;
pub mod tracing;
pub mod traits;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::{AlertThresholds, EngineLimits, PulseConfig};
pub use errors::error_code::PulseErrorCode;
pub use errors::{MetricError, RecipeError, StoreError};
pub use evidence::MetricEvidence;
pub use filter::{FieldFilter, FilterOp, SelectQuery, SortDir};
pub use row::{Row, Value};
pub use traits::store::TabularStore;
pub use types::collections::{FxHashMap, FxHashSet};
pub use types::{ChartType, Severity, TenantScope, TimeGrain, Timeframe};
