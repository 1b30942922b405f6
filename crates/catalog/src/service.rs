use tracing::instrument;

use warung_core::{CategoryId, ProductId};

use crate::{
    Category, CategoryInput, CatalogError, CatalogRepository, Product, ProductDetail, ProductFilter,
    ProductInput,
};

/// Validating front for a [`CatalogRepository`].
///
/// Inputs are normalized (trimmed) and checked before they reach storage, so
/// repositories only ever see well-formed payloads.
#[derive(Debug, Clone)]
pub struct CatalogService<R> {
    repo: R,
}

impl<R> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }
}

impl<R: CatalogRepository> CatalogService<R> {
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.repo.list_categories().await
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Category, CatalogError> {
        self.repo.get_category(id).await
    }

    #[instrument(skip(self, input), err)]
    pub async fn create_category(&self, input: CategoryInput) -> Result<Category, CatalogError> {
        let input = input.validate()?;
        let category = self.repo.create_category(&input).await?;
        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }

    #[instrument(skip(self, input), fields(category_id = %id), err)]
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: CategoryInput,
    ) -> Result<Category, CatalogError> {
        let input = input.validate()?;
        self.repo.update_category(id, &input).await
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        self.repo.delete_category(id).await
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductDetail>, CatalogError> {
        self.repo.list_products(filter).await
    }

    pub async fn get_product(&self, id: ProductId) -> Result<ProductDetail, CatalogError> {
        self.repo.get_product(id).await
    }

    #[instrument(skip(self, input), err)]
    pub async fn create_product(&self, input: ProductInput) -> Result<Product, CatalogError> {
        let input = input.validate()?;
        let product = self.repo.create_product(&input).await?;
        tracing::info!(product_id = %product.id, stock = product.stock, "product created");
        Ok(product)
    }

    #[instrument(skip(self, input), fields(product_id = %id), err)]
    pub async fn update_product(&self, id: ProductId, input: ProductInput) -> Result<Product, CatalogError> {
        let input = input.validate()?;
        self.repo.update_product(id, &input).await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        self.repo.delete_product(id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;

    /// Records what reached the repository; every write succeeds.
    #[derive(Default)]
    struct RecordingRepo {
        created: Mutex<Vec<ProductInput>>,
    }

    #[async_trait]
    impl CatalogRepository for RecordingRepo {
        async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
            Ok(vec![])
        }
        async fn get_category(&self, _id: CategoryId) -> Result<Category, CatalogError> {
            Err(CatalogError::category_not_found())
        }
        async fn create_category(&self, input: &CategoryInput) -> Result<Category, CatalogError> {
            Ok(Category {
                id: CategoryId::new(1),
                name: input.name.clone(),
                description: input.description.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
        }
        async fn update_category(&self, _id: CategoryId, _input: &CategoryInput) -> Result<Category, CatalogError> {
            Err(CatalogError::category_not_found())
        }
        async fn delete_category(&self, _id: CategoryId) -> Result<(), CatalogError> {
            Ok(())
        }
        async fn list_products(&self, _filter: &ProductFilter) -> Result<Vec<ProductDetail>, CatalogError> {
            Ok(vec![])
        }
        async fn get_product(&self, _id: ProductId) -> Result<ProductDetail, CatalogError> {
            Err(CatalogError::product_not_found())
        }
        async fn create_product(&self, input: &ProductInput) -> Result<Product, CatalogError> {
            self.created.lock().unwrap().push(input.clone());
            Ok(Product {
                id: ProductId::new(1),
                name: input.name.clone(),
                unit_price: input.unit_price,
                stock: input.stock,
                category_id: input.category_id,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
        }
        async fn update_product(&self, _id: ProductId, _input: &ProductInput) -> Result<Product, CatalogError> {
            Err(CatalogError::product_not_found())
        }
        async fn delete_product(&self, _id: ProductId) -> Result<(), CatalogError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn invalid_product_never_reaches_repository() {
        let service = CatalogService::new(RecordingRepo::default());
        let err = service
            .create_product(ProductInput {
                name: "Kopi".to_string(),
                unit_price: -10,
                stock: 1,
                category_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Validation(_)));
        assert!(service.repository().created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn repository_receives_normalized_input() {
        let service = CatalogService::new(RecordingRepo::default());
        let product = service
            .create_product(ProductInput {
                name: "  Kopi  ".to_string(),
                unit_price: 3500,
                stock: 10,
                category_id: None,
            })
            .await
            .unwrap();

        assert_eq!(product.name, "Kopi");
        assert_eq!(service.repository().created.lock().unwrap()[0].name, "Kopi");
    }
}
