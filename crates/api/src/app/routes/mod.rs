use axum::{
    routing::{get, post},
    Router,
};

pub mod categories;
pub mod checkout;
pub mod products;
pub mod reports;
pub mod system;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .route("/api/checkout", post(checkout::checkout))
        .route("/api/report/hari-ini", get(reports::daily_sales_report))
        .route("/api/report/today", get(reports::daily_sales_report))
}
