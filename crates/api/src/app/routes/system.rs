use axum::Json;

use crate::app::dto::HealthResponse;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Server is running smoothly",
    })
}
