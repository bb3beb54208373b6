//! Error taxonomy for the Pulse engine.
//!
//! Nothing here is fatal to an enclosing process: public entry points
//! return structured result values, and these errors appear only at
//! internal seams (store access, recipe loading, metric computation).

pub mod error_code;
pub mod metric_error;
pub mod recipe_error;
pub mod store_error;

pub use metric_error::MetricError;
pub use recipe_error::RecipeError;
pub use store_error::StoreError;
