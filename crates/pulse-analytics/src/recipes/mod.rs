//! Dynamic recipe engine.
//!
//! Tenants (and the external recipe generator) describe aggregations as
//! declarative recipes: count/sum/avg/ratio/duration/distinct_count over a
//! whitelisted (table, field) pair with a safe filter grammar. Recipes are
//! compiled and validated at load time; execution is bounded and always
//! produces evidence.

pub mod comparison;
pub mod executor;
pub mod loader;
pub mod types;
pub mod whitelist;

pub use executor::RecipeEngine;
pub use loader::{compile_recipe, load_tenant_metrics};
pub use types::{AggKind, CompiledAggSpec, CompiledMetric, CompiledRecipe, DurationUnit, TimeWindow};
