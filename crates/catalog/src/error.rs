use thiserror::Error;

use warung_core::{DomainError, StorageError};

/// Catalog operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CatalogError {
    pub fn category_not_found() -> Self {
        Self::NotFound { entity: "category" }
    }

    pub fn product_not_found() -> Self {
        Self::NotFound { entity: "product" }
    }
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::Conflict(msg) => Self::Validation(msg),
            DomainError::NotFound => Self::NotFound { entity: "record" },
        }
    }
}
