//! Domain error types.

use thiserror::Error;

/// Failure reported by a registration store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Could not generate a unique coupon code after {0} attempts")]
    CodeGenerationExhausted(u32),
}

/// Failure of a check-in or coupon operation.
///
/// Terminal idempotent states (already checked in, already redeemed) are not
/// errors; they are returned as outcomes.
#[derive(Debug, Error)]
pub enum CheckInError {
    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("{0}")]
    NotFound(String),

    #[error("This registration belongs to a different event")]
    WrongEvent,

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl From<StoreError> for CheckInError {
    fn from(err: StoreError) -> Self {
        CheckInError::Persistence(err.to_string())
    }
}
