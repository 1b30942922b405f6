//! Sales domain module: checkout and daily sales reporting.
//!
//! The checkout engine and the reporter are generic over the [`store`] ports,
//! so the same logic runs against Postgres in production and the in-memory
//! store in tests.

pub mod cart;
pub mod checkout;
pub mod error;
pub mod report;
pub mod store;
pub mod transaction;

pub use cart::{validate_cart, CartItem};
pub use checkout::CheckoutEngine;
pub use error::CheckoutError;
pub use report::{day_bounds, DailySalesReport, SalesReporter, TopProduct};
pub use store::{
    CatalogAccessor, NewTransactionDetail, ProductSales, SalesLedger, SalesSnapshot, SalesStore,
    StockedProduct, TransactionHeader, UnitOfWork,
};
pub use transaction::{Transaction, TransactionDetail};
