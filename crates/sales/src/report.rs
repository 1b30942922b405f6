//! Daily sales report.

use std::cmp::Reverse;

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use warung_core::StorageError;

use crate::store::{ProductSales, SalesSnapshot, SalesStore};

/// Revenue, transaction count and best seller for one calendar day.
///
/// Computed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySalesReport {
    pub total_revenue: i64,
    pub total_transaction_count: i64,
    pub top_product: Option<TopProduct>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProduct {
    pub name: String,
    pub quantity_sold: i64,
}

impl DailySalesReport {
    pub fn empty() -> Self {
        Self {
            total_revenue: 0,
            total_transaction_count: 0,
            top_product: None,
        }
    }
}

impl From<SalesSnapshot> for DailySalesReport {
    fn from(snapshot: SalesSnapshot) -> Self {
        Self {
            total_revenue: snapshot.total_revenue,
            total_transaction_count: snapshot.transaction_count,
            top_product: top_seller(&snapshot.product_sales).map(|p| TopProduct {
                name: p.name.clone(),
                quantity_sold: p.quantity_sold,
            }),
        }
    }
}

/// Highest quantity sold; ties go to the lowest product id.
fn top_seller(sales: &[ProductSales]) -> Option<&ProductSales> {
    sales
        .iter()
        .max_by_key(|p| (p.quantity_sold, Reverse(p.product_id)))
}

/// UTC instants bounding `day` in `tz`: `[midnight, next midnight)`.
///
/// A midnight skipped by a DST jump resolves to the first instant of the day
/// that does exist.
pub fn day_bounds<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = day.succ_opt().unwrap_or(NaiveDate::MAX);
    (local_midnight(day, tz), local_midnight(next, tz))
}

fn local_midnight<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = day.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = naive + chrono::Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|| naive.and_utc())
        }
    }
}

/// Read-only reporting over a [`SalesStore`].
#[derive(Debug, Clone)]
pub struct SalesReporter<S> {
    store: S,
}

impl<S> SalesReporter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: SalesStore> SalesReporter<S> {
    /// Report for today's date on the server's local clock.
    pub async fn daily_sales_report(&self) -> Result<DailySalesReport, StorageError> {
        self.report_for(Local::now().date_naive()).await
    }

    #[instrument(skip(self), err)]
    pub async fn report_for(&self, day: NaiveDate) -> Result<DailySalesReport, StorageError> {
        let (from, until) = day_bounds(day, &Local);
        let snapshot = self.store.sales_between(from, until).await?;
        let report = DailySalesReport::from(snapshot);

        tracing::debug!(
            total_revenue = report.total_revenue,
            transactions = report.total_transaction_count,
            "daily sales report computed"
        );
        Ok(report)
    }
}
