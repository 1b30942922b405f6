use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use warung_catalog::{ProductFilter, ProductInput};
use warung_core::ProductId;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

fn parse_id(raw: &str) -> Result<ProductId, Response> {
    raw.parse().map_err(|_| errors::invalid_id("product"))
}

/// `?name=` filters by case-insensitive substring.
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<ProductFilter>, QueryRejection>,
) -> Response {
    let Query(filter) = match query {
        Ok(v) => v,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", e.body_text()),
    };
    match services.list_products(&filter).await {
        Ok(items) => errors::json_success(StatusCode::OK, "products retrieved", items),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.get_product(id).await {
        Ok(product) => errors::json_success(StatusCode::OK, "product retrieved", product),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> Response {
    let Json(input) = match body {
        Ok(v) => v,
        Err(e) => return errors::invalid_body(e.body_text()),
    };
    match services.create_product(input).await {
        Ok(product) => errors::json_success(StatusCode::CREATED, "product created", product),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(input) = match body {
        Ok(v) => v,
        Err(e) => return errors::invalid_body(e.body_text()),
    };
    match services.update_product(id, input).await {
        Ok(product) => errors::json_success(StatusCode::OK, "product updated", product),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.delete_product(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
