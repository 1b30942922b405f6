use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use warung_catalog::CategoryInput;
use warung_core::CategoryId;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

fn parse_id(raw: &str) -> Result<CategoryId, Response> {
    raw.parse().map_err(|_| errors::invalid_id("category"))
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.list_categories().await {
        Ok(items) => errors::json_success(StatusCode::OK, "categories retrieved", items),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.get_category(id).await {
        Ok(category) => errors::json_success(StatusCode::OK, "category retrieved", category),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> Response {
    let Json(input) = match body {
        Ok(v) => v,
        Err(e) => return errors::invalid_body(e.body_text()),
    };
    match services.create_category(input).await {
        Ok(category) => errors::json_success(StatusCode::CREATED, "category created", category),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(input) = match body {
        Ok(v) => v,
        Err(e) => return errors::invalid_body(e.body_text()),
    };
    match services.update_category(id, input).await {
        Ok(category) => errors::json_success(StatusCode::OK, "category updated", category),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.delete_category(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
