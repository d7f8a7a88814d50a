//! # Store Error Types Module
//!
//! Error types shared by the data layer, the checkout flow and both
//! front-ends. The bot turns them into localized messages, the REST API
//! turns them into HTTP status codes.

use thiserror::Error;

/// Errors raised by store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row looked up by id does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Checkout was attempted on a cart without items
    #[error("cart is empty")]
    EmptyCart,

    /// Input rejected before touching the database
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown order status value
    #[error("invalid order status: {0}")]
    InvalidStatus(String),

    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }

    /// Whether the error is caused by the caller rather than the store
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StoreError::Database(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
