use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    let info = &services.info;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "name": info.name,
            "version": info.version,
            "environment": info.environment,
        })),
    )
}

pub async fn root(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": format!("Welcome to the {}", services.info.name),
        "version": services.info.version,
        "api": crate::app::API_PREFIX,
    }))
}
