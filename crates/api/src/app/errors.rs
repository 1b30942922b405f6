use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use warung_catalog::CatalogError;
use warung_core::StorageError;
use warung_sales::CheckoutError;

use crate::app::dto::Envelope;

const STORAGE_ERROR_MESSAGE: &str = "internal storage error";

pub fn catalog_error_to_response(err: CatalogError) -> Response {
    match err {
        CatalogError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        CatalogError::NotFound { entity } => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found"))
        }
        CatalogError::Storage(e) => storage_error_to_response(e),
    }
}

pub fn checkout_error_to_response(err: CheckoutError) -> Response {
    let message = err.to_string();
    match err {
        CheckoutError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        CheckoutError::ProductNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "product_not_found", message)
        }
        CheckoutError::InsufficientStock { .. } => {
            json_error(StatusCode::CONFLICT, "insufficient_stock", message)
        }
        CheckoutError::Storage(e) => storage_error_to_response(e),
    }
}

pub fn storage_error_to_response(err: StorageError) -> Response {
    tracing::error!(operation = err.operation, error = %err.message, "request failed on storage");
    // driver messages stay in the log
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", STORAGE_ERROR_MESSAGE)
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (status, Json(Envelope::failure(code, message))).into_response()
}

pub fn json_success<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    (status, Json(Envelope::ok(message, data))).into_response()
}

pub fn invalid_id(what: &str) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}

pub fn invalid_body(detail: impl std::fmt::Display) -> Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid_request_body",
        format!("invalid request body: {detail}"),
    )
}
