//! Integration tests for the checkout and reporting pipeline.
//!
//! Tests: CatalogService → CheckoutEngine → SalesStore → SalesReporter
//!
//! Verifies:
//! - Successful checkouts price lines and decrement stock
//! - Every failure leaves stock and the ledger untouched
//! - Concurrent checkouts never oversell
//! - Daily reports aggregate only the requested day

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

    use warung_catalog::{CatalogRepository, CatalogService, ProductInput};
    use warung_core::{ProductId, StorageError, TransactionDetailId, TransactionId};
    use warung_sales::{
        CartItem, CatalogAccessor, CheckoutEngine, CheckoutError, NewTransactionDetail, SalesLedger,
        SalesReporter, SalesSnapshot, SalesStore, StockedProduct, TopProduct, TransactionHeader,
        UnitOfWork,
    };

    use crate::store::{InMemoryStore, InMemoryWork};

    struct Harness {
        store: InMemoryStore,
        catalog: CatalogService<InMemoryStore>,
        checkout: CheckoutEngine<InMemoryStore>,
        reports: SalesReporter<InMemoryStore>,
    }

    fn harness_with(store: InMemoryStore) -> Harness {
        Harness {
            catalog: CatalogService::new(store.clone()),
            checkout: CheckoutEngine::new(store.clone()),
            reports: SalesReporter::new(store.clone()),
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(InMemoryStore::new())
    }

    /// A clock the test can move.
    fn manual_clock(start: DateTime<Utc>) -> (Arc<Mutex<DateTime<Utc>>>, InMemoryStore) {
        let now = Arc::new(Mutex::new(start));
        let reader = Arc::clone(&now);
        let store = InMemoryStore::with_clock(Arc::new(move || *reader.lock().unwrap()));
        (now, store)
    }

    fn local_noon(day: NaiveDate) -> DateTime<Utc> {
        Local
            .from_local_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    async fn add_product(h: &Harness, name: &str, unit_price: i64, stock: i64) -> ProductId {
        h.catalog
            .create_product(ProductInput {
                name: name.to_string(),
                unit_price,
                stock,
                category_id: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn stock_of(h: &Harness, id: ProductId) -> i64 {
        h.store.get_product(id).await.unwrap().product.stock
    }

    fn line(id: ProductId, quantity: i64) -> CartItem {
        CartItem::new(id.get(), quantity)
    }

    #[tokio::test]
    async fn checkout_then_report_matches_worked_example() {
        let h = harness();
        let a = add_product(&h, "Kopi Susu", 3500, 10).await;
        let b = add_product(&h, "Teh Manis", 3000, 40).await;
        let cart = [line(a, 2), line(b, 5)];

        let tx = h.checkout.checkout(&cart).await.unwrap();
        assert_eq!(tx.total_amount, 22000);
        assert_eq!(tx.details.len(), 2);
        assert_eq!(tx.details[0].product_id, a);
        assert_eq!(tx.details[0].subtotal, 7000);
        assert_eq!(tx.details[1].product_id, b);
        assert_eq!(tx.details[1].subtotal, 15000);
        assert!(tx.details.iter().all(|d| d.transaction_id == tx.id));
        assert_eq!(stock_of(&h, a).await, 8);
        assert_eq!(stock_of(&h, b).await, 35);

        h.checkout.checkout(&cart).await.unwrap();

        let report = h.reports.daily_sales_report().await.unwrap();
        assert_eq!(report.total_revenue, 44000);
        assert_eq!(report.total_transaction_count, 2);
        assert_eq!(
            report.top_product,
            Some(TopProduct {
                name: "Teh Manis".to_string(),
                quantity_sold: 10
            })
        );
    }

    #[tokio::test]
    async fn same_cart_twice_records_two_transactions() {
        let h = harness();
        let a = add_product(&h, "Kopi", 1000, 10).await;
        let cart = [line(a, 3)];

        let first = h.checkout.checkout(&cart).await.unwrap();
        let second = h.checkout.checkout(&cart).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(stock_of(&h, a).await, 4);
        assert_eq!(h.store.transactions().await.len(), 2);
    }

    #[tokio::test]
    async fn missing_product_rolls_back_earlier_lines() {
        let h = harness();
        let a = add_product(&h, "Kopi", 1000, 10).await;

        let err = h
            .checkout
            .checkout(&[line(a, 2), CartItem::new(999, 1)])
            .await
            .unwrap_err();

        assert_eq!(err, CheckoutError::ProductNotFound(ProductId::new(999)));
        assert_eq!(stock_of(&h, a).await, 10);
        assert!(h.store.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn insufficient_stock_rolls_back_everything() {
        let h = harness();
        let a = add_product(&h, "Kopi", 1000, 10).await;
        let b = add_product(&h, "Gula", 500, 1).await;

        let err = h
            .checkout
            .checkout(&[line(a, 2), line(b, 3)])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CheckoutError::InsufficientStock {
                product_id: b,
                product_name: "Gula".to_string(),
                available: 1,
                requested: 3,
            }
        );
        assert_eq!(stock_of(&h, a).await, 10);
        assert_eq!(stock_of(&h, b).await, 1);
        assert!(h.store.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_lines_draw_down_stock_in_order() {
        let h = harness();
        let a = add_product(&h, "Kopi", 1000, 5).await;

        let err = h
            .checkout
            .checkout(&[line(a, 3), line(a, 3)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InsufficientStock { available: 2, requested: 3, .. }
        ));
        assert_eq!(stock_of(&h, a).await, 5);

        let tx = h.checkout.checkout(&[line(a, 3), line(a, 2)]).await.unwrap();
        assert_eq!(tx.details.len(), 2);
        assert_eq!(tx.total_amount, 5000);
        assert_eq!(stock_of(&h, a).await, 0);
    }

    #[tokio::test]
    async fn invalid_cart_touches_nothing() {
        let h = harness();
        let a = add_product(&h, "Kopi", 1000, 5).await;

        let err = h.checkout.checkout(&[]).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));

        let err = h
            .checkout
            .checkout(&[line(a, 1), CartItem::new(a.get(), 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));

        assert_eq!(stock_of(&h, a).await, 5);
        assert!(h.store.transactions().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_checkouts_never_oversell() {
        let h = harness();
        let a = add_product(&h, "Kopi", 1000, 4).await;

        let first = tokio::spawn({
            let engine = h.checkout.clone();
            async move { engine.checkout(&[line(a, 4)]).await }
        });
        let second = tokio::spawn({
            let engine = h.checkout.clone();
            async move { engine.checkout(&[line(a, 4)]).await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let short = results
            .iter()
            .filter(|r| matches!(r, Err(CheckoutError::InsufficientStock { .. })))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(short, 1);
        assert_eq!(stock_of(&h, a).await, 0);
        assert_eq!(h.store.transactions().await.len(), 1);
    }

    #[tokio::test]
    async fn details_keep_the_name_sold_under() {
        let h = harness();
        let a = add_product(&h, "Kopi", 1000, 10).await;
        let tx = h.checkout.checkout(&[line(a, 1)]).await.unwrap();

        h.catalog
            .update_product(
                a,
                ProductInput {
                    name: "Kopi Tubruk".to_string(),
                    unit_price: 1200,
                    stock: 9,
                    category_id: None,
                },
            )
            .await
            .unwrap();

        let stored = h.store.transactions().await;
        assert_eq!(stored[0].id, tx.id);
        assert_eq!(stored[0].details[0].product_name, "Kopi");

        let report = h.reports.daily_sales_report().await.unwrap();
        assert_eq!(report.top_product.unwrap().name, "Kopi Tubruk");

        h.catalog.delete_product(a).await.unwrap();
        let report = h.reports.daily_sales_report().await.unwrap();
        assert_eq!(report.top_product.unwrap().name, "Kopi");
        assert_eq!(h.store.transactions().await[0].details[0].product_name, "Kopi");
    }

    #[tokio::test]
    async fn top_product_tie_goes_to_lowest_id() {
        let h = harness();
        let a = add_product(&h, "Kopi", 1000, 10).await;
        let b = add_product(&h, "Teh", 1000, 10).await;

        h.checkout.checkout(&[line(b, 3)]).await.unwrap();
        h.checkout.checkout(&[line(a, 3)]).await.unwrap();

        let report = h.reports.daily_sales_report().await.unwrap();
        assert_eq!(report.top_product.unwrap().name, "Kopi");
    }

    #[tokio::test]
    async fn empty_day_reports_zeroes() {
        let h = harness();
        add_product(&h, "Kopi", 1000, 10).await;

        let report = h.reports.daily_sales_report().await.unwrap();
        assert_eq!(report.total_revenue, 0);
        assert_eq!(report.total_transaction_count, 0);
        assert_eq!(report.top_product, None);
    }

    #[tokio::test]
    async fn report_counts_only_the_requested_day() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let yesterday = today.pred_opt().unwrap();
        let (now, store) = manual_clock(local_noon(yesterday));
        let h = harness_with(store);
        let a = add_product(&h, "Kopi", 1000, 100).await;
        let b = add_product(&h, "Teh", 2000, 100).await;

        h.checkout.checkout(&[line(a, 50)]).await.unwrap();

        *now.lock().unwrap() = local_noon(today);
        h.checkout.checkout(&[line(b, 2)]).await.unwrap();
        h.checkout.checkout(&[line(a, 1)]).await.unwrap();

        let report = h.reports.report_for(today).await.unwrap();
        assert_eq!(report.total_revenue, 5000);
        assert_eq!(report.total_transaction_count, 2);
        assert_eq!(
            report.top_product,
            Some(TopProduct {
                name: "Teh".to_string(),
                quantity_sold: 2
            })
        );

        let report = h.reports.report_for(yesterday).await.unwrap();
        assert_eq!(report.total_revenue, 50000);
        assert_eq!(report.total_transaction_count, 1);
    }

    /// Where a [`FaultyStore`] misbehaves.
    #[derive(Debug, Clone, Copy)]
    enum Fault {
        Nothing,
        LockProducts,
        Commit,
        InsertDetail,
        HangOnHeader,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Lock(Vec<ProductId>),
        Lookup(ProductId),
    }

    #[derive(Clone)]
    struct FaultyStore {
        inner: InMemoryStore,
        fault: Fault,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    struct FaultyWork {
        inner: InMemoryWork,
        fault: Fault,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    #[async_trait]
    impl SalesStore for FaultyStore {
        type Work = FaultyWork;

        async fn begin(&self) -> Result<Self::Work, StorageError> {
            Ok(FaultyWork {
                inner: self.inner.begin().await?,
                fault: self.fault,
                calls: Arc::clone(&self.calls),
            })
        }

        async fn sales_between(
            &self,
            from: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> Result<SalesSnapshot, StorageError> {
            self.inner.sales_between(from, until).await
        }
    }

    #[async_trait]
    impl CatalogAccessor for FaultyWork {
        async fn lock_products(&mut self, ids: &[ProductId]) -> Result<(), StorageError> {
            self.calls.lock().unwrap().push(Call::Lock(ids.to_vec()));
            if let Fault::LockProducts = self.fault {
                return Err(StorageError::new("lock_products", "deadlock detected"));
            }
            self.inner.lock_products(ids).await
        }

        async fn product_for_update(&mut self, id: ProductId) -> Result<Option<StockedProduct>, StorageError> {
            self.calls.lock().unwrap().push(Call::Lookup(id));
            self.inner.product_for_update(id).await
        }

        async fn decrement_stock(&mut self, id: ProductId, amount: i64) -> Result<(), StorageError> {
            self.inner.decrement_stock(id, amount).await
        }
    }

    #[async_trait]
    impl SalesLedger for FaultyWork {
        async fn insert_transaction(&mut self, total_amount: i64) -> Result<TransactionHeader, StorageError> {
            if let Fault::HangOnHeader = self.fault {
                std::future::pending::<()>().await;
            }
            self.inner.insert_transaction(total_amount).await
        }

        async fn insert_detail(
            &mut self,
            transaction_id: TransactionId,
            detail: &NewTransactionDetail,
        ) -> Result<TransactionDetailId, StorageError> {
            if let Fault::InsertDetail = self.fault {
                return Err(StorageError::new("insert_detail", "disk full"));
            }
            self.inner.insert_detail(transaction_id, detail).await
        }
    }

    #[async_trait]
    impl UnitOfWork for FaultyWork {
        async fn commit(self) -> Result<(), StorageError> {
            if let Fault::Commit = self.fault {
                return Err(StorageError::new("commit", "connection reset"));
            }
            self.inner.commit().await
        }
    }

    async fn faulty(fault: Fault) -> (Harness, CheckoutEngine<FaultyStore>, ProductId) {
        let h = harness();
        let a = add_product(&h, "Kopi", 1000, 10).await;
        let engine = CheckoutEngine::new(FaultyStore {
            inner: h.store.clone(),
            fault,
            calls: Arc::default(),
        });
        (h, engine, a)
    }

    #[tokio::test]
    async fn commit_failure_rolls_back() {
        let (h, engine, a) = faulty(Fault::Commit).await;

        let err = engine.checkout(&[line(a, 2)]).await.unwrap_err();

        assert_eq!(err, CheckoutError::Storage(StorageError::new("commit", "connection reset")));
        assert!(!err.is_client_error());
        assert_eq!(stock_of(&h, a).await, 10);
        assert!(h.store.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn write_failure_mid_checkout_rolls_back() {
        let (h, engine, a) = faulty(Fault::InsertDetail).await;

        let err = engine.checkout(&[line(a, 2)]).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Storage(ref e) if e.operation == "insert_detail"));
        assert_eq!(stock_of(&h, a).await, 10);
        assert!(h.store.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn cancelled_checkout_leaves_no_trace() {
        let (h, engine, a) = faulty(Fault::HangOnHeader).await;

        let outcome = tokio::time::timeout(Duration::from_millis(50), engine.checkout(&[line(a, 2)])).await;
        assert!(outcome.is_err());

        assert_eq!(stock_of(&h, a).await, 10);
        assert!(h.store.transactions().await.is_empty());
        // the store is usable again once the cancelled unit of work is gone
        h.checkout.checkout(&[line(a, 1)]).await.unwrap();
    }

    #[tokio::test]
    async fn cart_products_are_locked_in_id_order_before_any_line() {
        let h = harness();
        let a = add_product(&h, "Kopi", 1000, 10).await;
        let b = add_product(&h, "Teh", 500, 10).await;
        let store = FaultyStore {
            inner: h.store.clone(),
            fault: Fault::Nothing,
            calls: Arc::default(),
        };
        let engine = CheckoutEngine::new(store.clone());

        engine
            .checkout(&[line(b, 1), line(a, 2), line(b, 3)])
            .await
            .unwrap();

        assert_eq!(
            *store.calls.lock().unwrap(),
            vec![
                Call::Lock(vec![a, b]),
                Call::Lookup(b),
                Call::Lookup(a),
                Call::Lookup(b),
            ]
        );
        assert_eq!(stock_of(&h, a).await, 8);
        assert_eq!(stock_of(&h, b).await, 6);
    }

    #[tokio::test]
    async fn lock_failure_touches_nothing() {
        let (h, engine, a) = faulty(Fault::LockProducts).await;

        let err = engine.checkout(&[line(a, 2)]).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Storage(ref e) if e.operation == "lock_products"));
        assert_eq!(stock_of(&h, a).await, 10);
        assert!(h.store.transactions().await.is_empty());
    }
}
