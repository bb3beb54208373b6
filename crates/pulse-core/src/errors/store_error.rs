//! Errors surfaced by tabular store implementations.

use super::error_code::{self, PulseErrorCode};

/// Errors that can occur in a tabular store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Store busy (another operation in progress)")]
    Busy,

    #[error("Unknown table: {table}")]
    UnknownTable { table: String },

    #[error("Row serialization failed: {message}")]
    Serialization { message: String },
}

impl PulseErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Backend { .. } => error_code::STORE_ERROR,
            Self::Busy => error_code::STORE_BUSY,
            Self::UnknownTable { .. } => error_code::TABLE_UNKNOWN,
            Self::Serialization { .. } => error_code::SERIALIZATION_FAILED,
        }
    }
}
