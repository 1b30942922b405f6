use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warung_core::{CategoryId, DomainError, DomainResult, ProductId};

/// A catalog product as stored.
///
/// Prices are integers in the smallest currency unit. `stock` never goes
/// below zero: admin writes are validated here and checkout checks before it
/// decrements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: i64,
    pub stock: i64,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read view of a product joined with its category name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
}

/// Create/update payload for a product (updates replace every field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub unit_price: i64,
    pub stock: i64,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl ProductInput {
    pub fn validate(self) -> DomainResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.unit_price < 0 {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }
        if self.stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        if let Some(category_id) = self.category_id {
            CategoryId::parse_positive(category_id.get())?;
        }

        Ok(Self { name, ..self })
    }
}

/// Listing filter. `name` matches as a case-insensitive substring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub name: Option<String>,
}

impl ProductFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Normalized needle: trimmed, lowercased, `None` when blank.
    pub fn name_needle(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, product_name: &str) -> bool {
        match self.name_needle() {
            Some(needle) => product_name.to_lowercase().contains(&needle),
            None => true,
        }
    }
}
