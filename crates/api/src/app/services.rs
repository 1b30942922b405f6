//! Store selection and the services handlers call into.
//!
//! `SalesStore` has an associated unit-of-work type, so the two backends are
//! kept apart in an enum instead of behind a trait object.

use warung_catalog::{
    CatalogError, CatalogService, Category, CategoryInput, Product, ProductDetail, ProductFilter,
    ProductInput,
};
use warung_core::{CategoryId, ProductId, StorageError};
use warung_infra::config::AppConfig;
use warung_infra::db;
use warung_infra::store::{InMemoryStore, PostgresStore};
use warung_sales::{CartItem, CheckoutEngine, CheckoutError, DailySalesReport, SalesReporter, Transaction};

/// The engines for one backing store.
#[derive(Debug, Clone)]
pub struct Services<S> {
    pub catalog: CatalogService<S>,
    pub checkout: CheckoutEngine<S>,
    pub reports: SalesReporter<S>,
}

impl<S: Clone> Services<S> {
    pub fn new(store: S) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            checkout: CheckoutEngine::new(store.clone()),
            reports: SalesReporter::new(store),
        }
    }
}

pub enum AppServices {
    InMemory(Services<InMemoryStore>),
    Postgres(Services<PostgresStore>),
}

macro_rules! on_backend {
    ($self:expr, $services:ident => $body:expr) => {
        match $self {
            AppServices::InMemory($services) => $body,
            AppServices::Postgres($services) => $body,
        }
    };
}

impl AppServices {
    pub fn in_memory(store: InMemoryStore) -> Self {
        Self::InMemory(Services::new(store))
    }

    pub fn postgres(store: PostgresStore) -> Self {
        Self::Postgres(Services::new(store))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "in-memory",
            Self::Postgres(_) => "postgres",
        }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        on_backend!(self, s => s.catalog.list_categories().await)
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Category, CatalogError> {
        on_backend!(self, s => s.catalog.get_category(id).await)
    }

    pub async fn create_category(&self, input: CategoryInput) -> Result<Category, CatalogError> {
        on_backend!(self, s => s.catalog.create_category(input).await)
    }

    pub async fn update_category(
        &self,
        id: CategoryId,
        input: CategoryInput,
    ) -> Result<Category, CatalogError> {
        on_backend!(self, s => s.catalog.update_category(id, input).await)
    }

    pub async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        on_backend!(self, s => s.catalog.delete_category(id).await)
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductDetail>, CatalogError> {
        on_backend!(self, s => s.catalog.list_products(filter).await)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<ProductDetail, CatalogError> {
        on_backend!(self, s => s.catalog.get_product(id).await)
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<Product, CatalogError> {
        on_backend!(self, s => s.catalog.create_product(input).await)
    }

    pub async fn update_product(&self, id: ProductId, input: ProductInput) -> Result<Product, CatalogError> {
        on_backend!(self, s => s.catalog.update_product(id, input).await)
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        on_backend!(self, s => s.catalog.delete_product(id).await)
    }

    pub async fn checkout(&self, items: &[CartItem]) -> Result<Transaction, CheckoutError> {
        on_backend!(self, s => s.checkout.checkout(items).await)
    }

    pub async fn daily_sales_report(&self) -> Result<DailySalesReport, StorageError> {
        on_backend!(self, s => s.reports.daily_sales_report().await)
    }
}

/// Connect to Postgres when `DATABASE_URL` is set, otherwise run in memory.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StorageError> {
    let services = match &config.database {
        Some(db_config) => {
            let pool = db::connect(db_config).await?;
            db::apply_schema(&pool).await?;
            AppServices::postgres(PostgresStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (data is lost on exit)");
            AppServices::in_memory(InMemoryStore::new())
        }
    };

    tracing::info!(backend = services.backend_name(), "storage ready");
    Ok(services)
}
