use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::Response};

use crate::app::errors;
use crate::app::services::AppServices;

/// Today's revenue, transaction count and best seller (server-local day).
pub async fn daily_sales_report(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.daily_sales_report().await {
        Ok(report) => errors::json_success(StatusCode::OK, "daily sales report", report),
        Err(e) => errors::storage_error_to_response(e),
    }
}
