//! Postgres-backed catalog and sales store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | Result | Scenario |
//! |------------|----------------------|--------|----------|
//! | Database (foreign key violation) | `23503` | `CatalogError::Validation` | Product points at a missing category |
//! | Database (check constraint violation) | `23514` | `CatalogError::Validation` | Negative price or stock slipped past validation |
//! | Database (other) | Any other | `StorageError` | Other database errors |
//! | PoolClosed / PoolTimedOut | N/A | `StorageError` | Pool shut down or exhausted |
//! | Other | N/A | `StorageError` | Network errors, connection failures, etc. |
//!
//! ## Checkout isolation
//!
//! A [`PgUnitOfWork`] is one database transaction. All product rows of a cart
//! are locked first with one `SELECT ... ORDER BY id FOR UPDATE`, so
//! concurrent checkouts touching the same products serialize on the row locks
//! and always acquire them in the same order. The per-line reads that follow
//! re-lock rows this transaction already holds. Dropping the unit of work
//! rolls the transaction back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use warung_catalog::{
    CatalogError, CatalogRepository, Category, CategoryInput, Product, ProductDetail, ProductFilter,
    ProductInput,
};
use warung_core::{CategoryId, ProductId, StorageError, TransactionDetailId, TransactionId};
use warung_sales::{
    CatalogAccessor, NewTransactionDetail, ProductSales, SalesLedger, SalesSnapshot, SalesStore,
    StockedProduct, TransactionHeader, UnitOfWork,
};

const PRODUCT_COLUMNS: &str = r#"
    p.id, p.name, p.unit_price, p.stock, p.category_id, p.created_at, p.updated_at,
    c.name AS category_name
"#;

/// Postgres store. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_product_detail(&self, id: i64) -> Result<Option<ProductDetail>, CatalogError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             LEFT JOIN categories c ON c.id = p.category_id \
             WHERE p.id = $1"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_catalog_error("get_product", e))?;
        Ok(row.map(ProductDetail::from))
    }
}

#[async_trait]
impl CatalogRepository for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM categories
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_catalog_error("list_categories", e))?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn get_category(&self, id: CategoryId) -> Result<Category, CatalogError> {
        sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_catalog_error("get_category", e))?
        .map(Category::from)
        .ok_or_else(CatalogError::category_not_found)
    }

    #[instrument(skip(self, input), err)]
    async fn create_category(&self, input: &CategoryInput) -> Result<Category, CatalogError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(input.description.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_catalog_error("create_category", e))?;

        Ok(row.into())
    }

    #[instrument(skip(self, input), fields(category_id = %id), err)]
    async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, CatalogError> {
        sqlx::query_as::<_, CategoryRow>(
            r#"
            UPDATE categories
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(id.get())
        .bind(&input.name)
        .bind(input.description.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_catalog_error("update_category", e))?
        .map(Category::from)
        .ok_or_else(CatalogError::category_not_found)
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_catalog_error("delete_category", e))?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::category_not_found());
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductDetail>, CatalogError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             LEFT JOIN categories c ON c.id = p.category_id \
             WHERE ($1::TEXT IS NULL OR p.name ILIKE $1 ESCAPE '\\') \
             ORDER BY p.id ASC"
        );
        let pattern = filter
            .name_needle()
            .map(|needle| format!("%{}%", escape_like(&needle)));

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_catalog_error("list_products", e))?;

        Ok(rows.into_iter().map(ProductDetail::from).collect())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> Result<ProductDetail, CatalogError> {
        self.fetch_product_detail(id.get())
            .await?
            .ok_or_else(CatalogError::product_not_found)
    }

    #[instrument(skip(self, input), err)]
    async fn create_product(&self, input: &ProductInput) -> Result<Product, CatalogError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (name, unit_price, stock, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, unit_price, stock, category_id, created_at, updated_at,
                      NULL::TEXT AS category_name
            "#,
        )
        .bind(&input.name)
        .bind(input.unit_price)
        .bind(input.stock)
        .bind(input.category_id.map(CategoryId::get))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_catalog_error("create_product", e))?;

        Ok(ProductDetail::from(row).product)
    }

    #[instrument(skip(self, input), fields(product_id = %id), err)]
    async fn update_product(&self, id: ProductId, input: &ProductInput) -> Result<Product, CatalogError> {
        sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET name = $2, unit_price = $3, stock = $4, category_id = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, unit_price, stock, category_id, created_at, updated_at,
                      NULL::TEXT AS category_name
            "#,
        )
        .bind(id.get())
        .bind(&input.name)
        .bind(input.unit_price)
        .bind(input.stock)
        .bind(input.category_id.map(CategoryId::get))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_catalog_error("update_product", e))?
        .map(|row| ProductDetail::from(row).product)
        .ok_or_else(CatalogError::product_not_found)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_catalog_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::product_not_found());
        }
        Ok(())
    }
}

#[async_trait]
impl SalesStore for PostgresStore {
    type Work = PgUnitOfWork;

    async fn begin(&self) -> Result<Self::Work, StorageError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PgUnitOfWork { tx })
    }

    /// Both aggregates come from one `REPEATABLE READ` snapshot, so a checkout
    /// committing in between cannot make revenue and count disagree.
    #[instrument(skip(self), err)]
    async fn sales_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<SalesSnapshot, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_isolation", e))?;

        let totals = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(total_amount), 0)::BIGINT AS total_revenue,
                COUNT(*) AS transaction_count
            FROM transactions
            WHERE created_at >= $1 AND created_at < $2
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("sales_totals", e))?;

        let total_revenue: i64 = totals
            .try_get("total_revenue")
            .map_err(|e| map_sqlx_error("sales_totals", e))?;
        let transaction_count: i64 = totals
            .try_get("transaction_count")
            .map_err(|e| map_sqlx_error("sales_totals", e))?;

        let product_sales = sqlx::query_as::<_, ProductSalesRow>(
            r#"
            SELECT
                td.product_id,
                COALESCE(MAX(p.name), (ARRAY_AGG(td.product_name ORDER BY td.id DESC))[1]) AS name,
                SUM(td.quantity)::BIGINT AS quantity_sold
            FROM transaction_details td
            JOIN transactions t ON t.id = td.transaction_id
            LEFT JOIN products p ON p.id = td.product_id
            WHERE t.created_at >= $1 AND t.created_at < $2
            GROUP BY td.product_id
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("product_sales", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(SalesSnapshot {
            total_revenue,
            transaction_count,
            product_sales: product_sales.into_iter().map(ProductSales::from).collect(),
        })
    }
}

/// One open database transaction. Rolled back on drop unless committed.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CatalogAccessor for PgUnitOfWork {
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<(), StorageError> {
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        sqlx::query(
            r#"
            SELECT id
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_products", e))?;
        Ok(())
    }

    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<StockedProduct>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, unit_price, stock
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("product_for_update", e))?;

        row.map(|row| stocked_product(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("product_for_update", e))
    }

    async fn decrement_stock(&mut self, id: ProductId, amount: i64) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            "#,
        )
        .bind(id.get())
        .bind(amount)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        // The row is locked by product_for_update; anything else is a broken invariant.
        if result.rows_affected() != 1 {
            return Err(StorageError::new(
                "decrement_stock",
                format!("product {id} missing or short of stock under lock"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SalesLedger for PgUnitOfWork {
    async fn insert_transaction(&mut self, total_amount: i64) -> Result<TransactionHeader, StorageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (total_amount)
            VALUES ($1)
            RETURNING id, created_at
            "#,
        )
        .bind(total_amount)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_transaction", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("insert_transaction", e))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| map_sqlx_error("insert_transaction", e))?;

        Ok(TransactionHeader {
            id: TransactionId::new(id),
            created_at,
        })
    }

    async fn insert_detail(
        &mut self,
        transaction_id: TransactionId,
        detail: &NewTransactionDetail,
    ) -> Result<TransactionDetailId, StorageError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transaction_details
                (transaction_id, product_id, product_name, quantity, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(transaction_id.get())
        .bind(detail.product_id.get())
        .bind(&detail.product_name)
        .bind(detail.quantity)
        .bind(detail.subtotal)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_detail", e))?;

        Ok(TransactionDetailId::new(id))
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> Result<(), StorageError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

/// Escape `%`, `_` and the escape character itself for an `ILIKE ... ESCAPE '\'` pattern.
fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn map_catalog_error(operation: &'static str, err: sqlx::Error) -> CatalogError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23503") => return CatalogError::Validation("category not found".to_string()),
            Some("23514") => {
                return CatalogError::Validation(format!(
                    "constraint violated: {}",
                    db_err.constraint().unwrap_or("check")
                ));
            }
            _ => {}
        }
    }
    CatalogError::Storage(map_sqlx_error(operation, err))
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
            StorageError::new(operation, format!("database error [{code}]: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => StorageError::new(operation, "connection pool closed"),
        sqlx::Error::PoolTimedOut => StorageError::new(operation, "timed out acquiring a connection"),
        other => StorageError::new(operation, other.to_string()),
    }
}

fn stocked_product(row: &PgRow) -> Result<StockedProduct, sqlx::Error> {
    Ok(StockedProduct {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        unit_price: row.try_get("unit_price")?,
        stock: row.try_get("stock")?,
    })
}

struct CategoryRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId::new(row.id),
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

struct ProductRow {
    id: i64,
    name: String,
    unit_price: i64,
    stock: i64,
    category_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_name: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            unit_price: row.try_get("unit_price")?,
            stock: row.try_get("stock")?,
            category_id: row.try_get("category_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            category_name: row.try_get("category_name")?,
        })
    }
}

impl From<ProductRow> for ProductDetail {
    fn from(row: ProductRow) -> Self {
        ProductDetail {
            product: Product {
                id: ProductId::new(row.id),
                name: row.name,
                unit_price: row.unit_price,
                stock: row.stock,
                category_id: row.category_id.map(CategoryId::new),
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            category_name: row.category_name,
        }
    }
}

struct ProductSalesRow {
    product_id: i64,
    name: String,
    quantity_sold: i64,
}

impl<'r> FromRow<'r, PgRow> for ProductSalesRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductSalesRow {
            product_id: row.try_get("product_id")?,
            name: row.try_get("name")?,
            quantity_sold: row.try_get("quantity_sold")?,
        })
    }
}

impl From<ProductSalesRow> for ProductSales {
    fn from(row: ProductSalesRow) -> Self {
        ProductSales {
            product_id: ProductId::new(row.product_id),
            name: row.name,
            quantity_sold: row.quantity_sold,
        }
    }
}
