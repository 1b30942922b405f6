//! Checkout engine.
//!
//! ```text
//! cart
//!   ↓
//! 1. Validate lines (no storage access)
//!   ↓
//! 2. Begin unit of work, lock the cart's products in ascending id order
//!   ↓
//! 3. Per line, in order: lock product → check stock → price → decrement
//!   ↓
//! 4. Insert header, then details in cart order
//!   ↓
//! 5. Commit
//! ```
//!
//! Any error between 2 and 5 drops the unit of work, which rolls back every
//! decrement and insert made so far.

use std::collections::BTreeSet;

use tracing::{instrument, Span};

use warung_core::ProductId;

use crate::cart::{validate_cart, CartItem};
use crate::error::CheckoutError;
use crate::store::{CatalogAccessor, NewTransactionDetail, SalesLedger, SalesStore, UnitOfWork};
use crate::transaction::{Transaction, TransactionDetail};

#[derive(Debug, Clone)]
pub struct CheckoutEngine<S> {
    store: S,
}

impl<S> CheckoutEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: SalesStore> CheckoutEngine<S> {
    /// Turn a cart into a committed [`Transaction`], or change nothing.
    ///
    /// Duplicate product ids are separate lines: each is checked against the
    /// stock left by the lines before it. Calling this twice with the same
    /// cart records two transactions.
    #[instrument(
        skip(self, items),
        fields(lines = items.len(), transaction_id, total_amount)
    )]
    pub async fn checkout(&self, items: &[CartItem]) -> Result<Transaction, CheckoutError> {
        let result = self.run(items).await;

        match &result {
            Ok(tx) => {
                let span = Span::current();
                span.record("transaction_id", tx.id.get());
                span.record("total_amount", tx.total_amount);
                tracing::info!("checkout committed");
            }
            Err(CheckoutError::Storage(e)) => {
                tracing::error!(error = %e, "checkout rolled back on storage failure");
            }
            Err(e) => {
                tracing::warn!(error = %e, "checkout rejected");
            }
        }

        result
    }

    async fn run(&self, items: &[CartItem]) -> Result<Transaction, CheckoutError> {
        validate_cart(items)?;

        let mut work = self.store.begin().await?;
        work.lock_products(&lock_order(items)).await?;

        let pending = reserve_lines(&mut work, items).await?;
        let header = work.insert_transaction(pending.total_amount).await?;

        let mut details = Vec::with_capacity(pending.lines.len());
        for line in pending.lines {
            let id = work.insert_detail(header.id, &line).await?;
            details.push(TransactionDetail {
                id,
                transaction_id: header.id,
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                subtotal: line.subtotal,
            });
        }

        work.commit().await?;

        Ok(Transaction {
            id: header.id,
            total_amount: pending.total_amount,
            created_at: header.created_at,
            details,
        })
    }
}

#[derive(Debug)]
struct PendingCheckout {
    total_amount: i64,
    lines: Vec<NewTransactionDetail>,
}

/// Distinct product ids of a cart, ascending.
fn lock_order(items: &[CartItem]) -> Vec<ProductId> {
    items
        .iter()
        .map(|item| item.product_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Check and decrement stock for every line, pricing as we go.
async fn reserve_lines<W>(work: &mut W, items: &[CartItem]) -> Result<PendingCheckout, CheckoutError>
where
    W: CatalogAccessor,
{
    let mut total_amount: i64 = 0;
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let product = work
            .product_for_update(item.product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(item.product_id))?;

        if product.stock < item.quantity {
            return Err(CheckoutError::InsufficientStock {
                product_id: product.id,
                product_name: product.name,
                available: product.stock,
                requested: item.quantity,
            });
        }

        let subtotal = product.unit_price.checked_mul(item.quantity).ok_or_else(|| {
            CheckoutError::validation(format!("subtotal overflows for product {}", product.id))
        })?;
        total_amount = total_amount
            .checked_add(subtotal)
            .ok_or_else(|| CheckoutError::validation("total amount overflows"))?;

        work.decrement_stock(item.product_id, item.quantity).await?;

        lines.push(NewTransactionDetail {
            product_id: item.product_id,
            product_name: product.name,
            quantity: item.quantity,
            subtotal,
        });
    }

    Ok(PendingCheckout { total_amount, lines })
}
