//! Recipe load-time errors.
//!
//! Recipes are rejected when loaded from tenant configuration, not when
//! executed, so a bad operator or field reference fails fast with a
//! structured message instead of silently falling through to equality.

use super::error_code::PulseErrorCode;

/// Errors raised while parsing and validating a declarative recipe.
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("Unknown recipe kind: {kind}")]
    UnknownKind { kind: String },

    #[error("Unknown filter operator suffix '__{suffix}' on field '{field}'")]
    UnknownOperator { field: String, suffix: String },

    #[error("Table '{table}' is not in the query whitelist")]
    TableNotAllowed { table: String },

    #[error("Field '{field}' is not whitelisted on table '{table}'")]
    FieldNotAllowed { table: String, field: String },

    #[error("Invalid recipe config: {message}")]
    InvalidConfig { message: String },
}

impl PulseErrorCode for RecipeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownKind { .. } => "RECIPE_UNKNOWN_KIND",
            Self::UnknownOperator { .. } => "RECIPE_UNKNOWN_OPERATOR",
            Self::TableNotAllowed { .. } => "RECIPE_TABLE_NOT_ALLOWED",
            Self::FieldNotAllowed { .. } => "RECIPE_FIELD_NOT_ALLOWED",
            Self::InvalidConfig { .. } => "RECIPE_INVALID_CONFIG",
        }
    }
}
