use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warung_core::{ProductId, TransactionDetailId, TransactionId};

/// A completed checkout. Created once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Sum of the details' subtotals, fixed at creation.
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    /// In cart order.
    pub details: Vec<TransactionDetail>,
}

/// One line of a transaction.
///
/// `product_name` and `subtotal` are copied at purchase time and do not track
/// later catalog edits or deletions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub id: TransactionDetailId,
    pub transaction_id: TransactionId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub subtotal: i64,
}
