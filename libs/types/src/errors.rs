//! Error types for sale event validation
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Reasons a raw sale record is refused.
///
/// Every variant is non-fatal: the record is dropped and the aggregate
/// state is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Negative amount: {0}")]
    NegativeAmount(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl EventError {
    /// Short label for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            EventError::InvalidAmount(_) => "invalid_amount",
            EventError::NegativeAmount(_) => "negative_amount",
            EventError::InvalidQuantity(_) => "invalid_quantity",
            EventError::MissingField(_) => "missing_field",
            EventError::InvalidTimestamp(_) => "invalid_timestamp",
        }
    }
}
