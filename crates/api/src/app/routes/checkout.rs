use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::Response,
    Json,
};

use crate::app::dto::CheckoutRequest;
use crate::app::errors;
use crate::app::services::AppServices;

pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(v) => v,
        Err(e) => return errors::invalid_body(e.body_text()),
    };

    match services.checkout(&request.items).await {
        Ok(transaction) => errors::json_success(StatusCode::CREATED, "checkout successful", transaction),
        Err(e) => errors::checkout_error_to_response(e),
    }
}
