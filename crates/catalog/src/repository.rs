//! Catalog persistence port.

use std::sync::Arc;

use async_trait::async_trait;

use warung_core::{CategoryId, ProductId};

use crate::{Category, CategoryInput, CatalogError, Product, ProductDetail, ProductFilter, ProductInput};

/// Single-row persistence for categories and products.
///
/// Implementations receive already-validated inputs (see [`crate::CatalogService`])
/// and report missing rows as [`CatalogError::NotFound`]. Listings are ordered by id.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;

    async fn get_category(&self, id: CategoryId) -> Result<Category, CatalogError>;

    async fn create_category(&self, input: &CategoryInput) -> Result<Category, CatalogError>;

    async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, CatalogError>;

    /// Products in the category keep existing with `category_id = None`.
    async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError>;

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductDetail>, CatalogError>;

    async fn get_product(&self, id: ProductId) -> Result<ProductDetail, CatalogError>;

    /// Unknown `category_id` is a [`CatalogError::Validation`].
    async fn create_product(&self, input: &ProductInput) -> Result<Product, CatalogError>;

    async fn update_product(&self, id: ProductId, input: &ProductInput) -> Result<Product, CatalogError>;

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError>;
}

#[async_trait]
impl<R> CatalogRepository for Arc<R>
where
    R: CatalogRepository + ?Sized,
{
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        (**self).list_categories().await
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category, CatalogError> {
        (**self).get_category(id).await
    }

    async fn create_category(&self, input: &CategoryInput) -> Result<Category, CatalogError> {
        (**self).create_category(input).await
    }

    async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, CatalogError> {
        (**self).update_category(id, input).await
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        (**self).delete_category(id).await
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductDetail>, CatalogError> {
        (**self).list_products(filter).await
    }

    async fn get_product(&self, id: ProductId) -> Result<ProductDetail, CatalogError> {
        (**self).get_product(id).await
    }

    async fn create_product(&self, input: &ProductInput) -> Result<Product, CatalogError> {
        (**self).create_product(input).await
    }

    async fn update_product(&self, id: ProductId, input: &ProductInput) -> Result<Product, CatalogError> {
        (**self).update_product(id, input).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        (**self).delete_product(id).await
    }
}
