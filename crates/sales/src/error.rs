use thiserror::Error;

use warung_core::{ProductId, StorageError};

/// Why a checkout did not produce a transaction.
///
/// Every variant means nothing was persisted: the unit of work is dropped
/// (rolled back) before the error reaches the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Malformed cart, detected before touching storage.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("product id {0} not found")]
    ProductNotFound(ProductId),

    #[error(
        "insufficient stock for product {product_name} (available: {available}, requested: {requested})"
    )]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: i64,
        requested: i64,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CheckoutError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// `true` for failures caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}
