//! Storage ports used by checkout and reporting.
//!
//! A [`SalesStore`] hands out [`UnitOfWork`]s. Everything done through a unit
//! of work becomes visible only on [`UnitOfWork::commit`]; dropping it without
//! committing (early return, error, or a cancelled future) rolls it back.
//!
//! Isolation between concurrent units of work is the store's job. The Postgres
//! store locks product rows (`SELECT ... FOR UPDATE`) so two checkouts of the
//! same product serialize. The engine only decides the lock order: every cart
//! product is locked up front through [`CatalogAccessor::lock_products`] in
//! ascending id order, so carts listing the same products in different orders
//! cannot deadlock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warung_core::{ProductId, StorageError, TransactionDetailId, TransactionId};

/// The product fields checkout reads, locked for the rest of the unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockedProduct {
    pub id: ProductId,
    pub name: String,
    pub unit_price: i64,
    pub stock: i64,
}

/// Catalog capability consumed by the checkout engine.
#[async_trait]
pub trait CatalogAccessor: Send {
    /// Lock every listed product for the rest of the unit of work.
    ///
    /// `ids` is sorted and free of duplicates. Unknown ids are skipped; the
    /// per-line lookup reports them.
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<(), StorageError>;

    /// `None` when no product has this id.
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<StockedProduct>, StorageError>;

    async fn decrement_stock(&mut self, id: ProductId, amount: i64) -> Result<(), StorageError>;
}

/// A detail row waiting for its transaction header id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransactionDetail {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub subtotal: i64,
}

/// What the store assigns when a header is inserted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TransactionHeader {
    pub id: TransactionId,
    pub created_at: DateTime<Utc>,
}

/// Write side for transaction headers and details.
#[async_trait]
pub trait SalesLedger: Send {
    async fn insert_transaction(&mut self, total_amount: i64) -> Result<TransactionHeader, StorageError>;

    async fn insert_detail(
        &mut self,
        transaction_id: TransactionId,
        detail: &NewTransactionDetail,
    ) -> Result<TransactionDetailId, StorageError>;
}

/// One atomic scope spanning catalog reads/writes and ledger inserts.
#[async_trait]
pub trait UnitOfWork: CatalogAccessor + SalesLedger {
    async fn commit(self) -> Result<(), StorageError>;
}

/// Quantity sold of one product over a reporting window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: ProductId,
    /// Current catalog name, or the latest snapshotted name if the product is gone.
    pub name: String,
    pub quantity_sold: i64,
}

/// Raw figures for a reporting window, read from one consistent snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesSnapshot {
    pub total_revenue: i64,
    pub transaction_count: i64,
    /// One entry per product sold in the window, in no particular order.
    pub product_sales: Vec<ProductSales>,
}

#[async_trait]
pub trait SalesStore: Send + Sync {
    type Work: UnitOfWork;

    async fn begin(&self) -> Result<Self::Work, StorageError>;

    /// Figures for transactions created in `[from, until)`.
    async fn sales_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<SalesSnapshot, StorageError>;
}

#[async_trait]
impl<S> SalesStore for Arc<S>
where
    S: SalesStore + ?Sized,
{
    type Work = S::Work;

    async fn begin(&self) -> Result<Self::Work, StorageError> {
        (**self).begin().await
    }

    async fn sales_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<SalesSnapshot, StorageError> {
        (**self).sales_between(from, until).await
    }
}
