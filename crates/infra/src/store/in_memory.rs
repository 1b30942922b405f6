//! In-memory catalog and sales store.
//!
//! All state sits behind one async mutex. A unit of work holds the lock for
//! its whole lifetime and stages only what it changes: copies of the products
//! it decrements plus the rows it inserts. Commit applies them, drop discards
//! them. Units of work are therefore fully serialized, and their cost does not
//! grow with recorded history.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use warung_catalog::{
    CatalogError, CatalogRepository, Category, CategoryInput, Product, ProductDetail, ProductFilter,
    ProductInput,
};
use warung_core::{CategoryId, ProductId, StorageError, TransactionDetailId, TransactionId};
use warung_sales::{
    CatalogAccessor, NewTransactionDetail, ProductSales, SalesLedger, SalesSnapshot, SalesStore,
    StockedProduct, Transaction, TransactionDetail, TransactionHeader, UnitOfWork,
};

/// Source of `created_at`/`updated_at` timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct TransactionRow {
    total_amount: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    transactions: BTreeMap<TransactionId, TransactionRow>,
    details: Vec<TransactionDetail>,
    last_category_id: i64,
    last_product_id: i64,
    last_transaction_id: i64,
    last_detail_id: i64,
}

impl State {
    fn product_detail(&self, product: &Product) -> ProductDetail {
        let category_name = product
            .category_id
            .and_then(|id| self.categories.get(&id))
            .map(|c| c.name.clone());
        ProductDetail {
            product: product.clone(),
            category_name,
        }
    }

    fn ensure_category(&self, id: Option<CategoryId>) -> Result<(), CatalogError> {
        match id {
            Some(id) if !self.categories.contains_key(&id) => {
                Err(CatalogError::Validation("category not found".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Shared in-memory store. Clones share state.
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    clock: Clock,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }

    /// Every committed transaction with its details, oldest first.
    pub async fn transactions(&self) -> Vec<Transaction> {
        let state = self.state.lock().await;
        state
            .transactions
            .iter()
            .map(|(id, row)| Transaction {
                id: *id,
                total_amount: row.total_amount,
                created_at: row.created_at,
                details: state
                    .details
                    .iter()
                    .filter(|d| d.transaction_id == *id)
                    .cloned()
                    .collect(),
            })
            .collect()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let state = self.state.lock().await;
        Ok(state.categories.values().cloned().collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category, CatalogError> {
        let state = self.state.lock().await;
        state
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(CatalogError::category_not_found)
    }

    async fn create_category(&self, input: &CategoryInput) -> Result<Category, CatalogError> {
        let now = (self.clock)();
        let mut state = self.state.lock().await;
        state.last_category_id += 1;
        let category = Category {
            id: CategoryId::new(state.last_category_id),
            name: input.name.clone(),
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, CatalogError> {
        let now = (self.clock)();
        let mut state = self.state.lock().await;
        let category = state
            .categories
            .get_mut(&id)
            .ok_or_else(CatalogError::category_not_found)?;
        category.name = input.name.clone();
        category.description = input.description.clone();
        category.updated_at = now;
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;
        if state.categories.remove(&id).is_none() {
            return Err(CatalogError::category_not_found());
        }
        for product in state.products.values_mut() {
            if product.category_id == Some(id) {
                product.category_id = None;
            }
        }
        Ok(())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductDetail>, CatalogError> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .values()
            .filter(|p| filter.matches(&p.name))
            .map(|p| state.product_detail(p))
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<ProductDetail, CatalogError> {
        let state = self.state.lock().await;
        state
            .products
            .get(&id)
            .map(|p| state.product_detail(p))
            .ok_or_else(CatalogError::product_not_found)
    }

    async fn create_product(&self, input: &ProductInput) -> Result<Product, CatalogError> {
        let now = (self.clock)();
        let mut state = self.state.lock().await;
        state.ensure_category(input.category_id)?;

        state.last_product_id += 1;
        let product = Product {
            id: ProductId::new(state.last_product_id),
            name: input.name.clone(),
            unit_price: input.unit_price,
            stock: input.stock,
            category_id: input.category_id,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, input: &ProductInput) -> Result<Product, CatalogError> {
        let now = (self.clock)();
        let mut state = self.state.lock().await;
        if !state.products.contains_key(&id) {
            return Err(CatalogError::product_not_found());
        }
        state.ensure_category(input.category_id)?;

        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(CatalogError::product_not_found)?;
        product.name = input.name.clone();
        product.unit_price = input.unit_price;
        product.stock = input.stock;
        product.category_id = input.category_id;
        product.updated_at = now;
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;
        state
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(CatalogError::product_not_found)
    }
}

#[async_trait]
impl SalesStore for InMemoryStore {
    type Work = InMemoryWork;

    async fn begin(&self) -> Result<Self::Work, StorageError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = Staged {
            last_transaction_id: guard.last_transaction_id,
            last_detail_id: guard.last_detail_id,
            ..Staged::default()
        };
        Ok(InMemoryWork {
            guard,
            staged,
            clock: Arc::clone(&self.clock),
        })
    }

    async fn sales_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<SalesSnapshot, StorageError> {
        let state = self.state.lock().await;
        let in_window = |created_at: DateTime<Utc>| created_at >= from && created_at < until;

        let mut snapshot = SalesSnapshot::default();
        for row in state.transactions.values().filter(|r| in_window(r.created_at)) {
            snapshot.total_revenue += row.total_amount;
            snapshot.transaction_count += 1;
        }

        // product id -> (quantity, latest snapshotted name)
        let mut sold: BTreeMap<ProductId, (i64, &str)> = BTreeMap::new();
        for detail in &state.details {
            let counted = state
                .transactions
                .get(&detail.transaction_id)
                .is_some_and(|r| in_window(r.created_at));
            if !counted {
                continue;
            }
            let entry = sold.entry(detail.product_id).or_insert((0, ""));
            entry.0 += detail.quantity;
            // details are appended in id order
            entry.1 = &detail.product_name;
        }

        snapshot.product_sales = sold
            .into_iter()
            .map(|(product_id, (quantity_sold, snapshot_name))| ProductSales {
                product_id,
                name: state
                    .products
                    .get(&product_id)
                    .map_or_else(|| snapshot_name.to_string(), |p| p.name.clone()),
                quantity_sold,
            })
            .collect();

        Ok(snapshot)
    }
}

/// Changes made by one unit of work, not yet applied.
#[derive(Debug, Default)]
struct Staged {
    products: BTreeMap<ProductId, Product>,
    transactions: BTreeMap<TransactionId, TransactionRow>,
    details: Vec<TransactionDetail>,
    last_transaction_id: i64,
    last_detail_id: i64,
}

/// Exclusive, staged view of an [`InMemoryStore`].
pub struct InMemoryWork {
    guard: OwnedMutexGuard<State>,
    staged: Staged,
    clock: Clock,
}

impl InMemoryWork {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.staged.products.get(&id).or_else(|| self.guard.products.get(&id))
    }
}

#[async_trait]
impl CatalogAccessor for InMemoryWork {
    async fn lock_products(&mut self, _ids: &[ProductId]) -> Result<(), StorageError> {
        // the store mutex is already held exclusively
        Ok(())
    }

    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<StockedProduct>, StorageError> {
        Ok(self.product(id).map(|p| StockedProduct {
            id: p.id,
            name: p.name.clone(),
            unit_price: p.unit_price,
            stock: p.stock,
        }))
    }

    async fn decrement_stock(&mut self, id: ProductId, amount: i64) -> Result<(), StorageError> {
        let now = (self.clock)();
        if !self.staged.products.contains_key(&id) {
            if let Some(product) = self.guard.products.get(&id) {
                self.staged.products.insert(id, product.clone());
            }
        }
        let product = self
            .staged
            .products
            .get_mut(&id)
            .filter(|p| p.stock >= amount)
            .ok_or_else(|| {
                StorageError::new("decrement_stock", format!("product {id} missing or short of stock"))
            })?;
        product.stock -= amount;
        product.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl SalesLedger for InMemoryWork {
    async fn insert_transaction(&mut self, total_amount: i64) -> Result<TransactionHeader, StorageError> {
        let created_at = (self.clock)();
        self.staged.last_transaction_id += 1;
        let id = TransactionId::new(self.staged.last_transaction_id);
        self.staged.transactions.insert(
            id,
            TransactionRow {
                total_amount,
                created_at,
            },
        );
        Ok(TransactionHeader { id, created_at })
    }

    async fn insert_detail(
        &mut self,
        transaction_id: TransactionId,
        detail: &NewTransactionDetail,
    ) -> Result<TransactionDetailId, StorageError> {
        let known = self.staged.transactions.contains_key(&transaction_id)
            || self.guard.transactions.contains_key(&transaction_id);
        if !known {
            return Err(StorageError::new(
                "insert_detail",
                format!("transaction {transaction_id} does not exist"),
            ));
        }
        self.staged.last_detail_id += 1;
        let id = TransactionDetailId::new(self.staged.last_detail_id);
        self.staged.details.push(TransactionDetail {
            id,
            transaction_id,
            product_id: detail.product_id,
            product_name: detail.product_name.clone(),
            quantity: detail.quantity,
            subtotal: detail.subtotal,
        });
        Ok(id)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryWork {
    async fn commit(self) -> Result<(), StorageError> {
        let InMemoryWork {
            mut guard, staged, ..
        } = self;
        let state = &mut *guard;
        state.products.extend(staged.products);
        state.transactions.extend(staged.transactions);
        state.details.extend(staged.details);
        state.last_transaction_id = staged.last_transaction_id;
        state.last_detail_id = staged.last_detail_id;
        Ok(())
    }
}
