use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::config::get_config;

/// Shared-token guard for the maintenance endpoints (log browsing, retention
/// sweep, relay diagnostics).
pub async fn require_admin_token(req: Request, next: Next) -> Response {
    let Some(header) = req.headers().get("x-admin-token") else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "missing_admin_token"})),
        )
            .into_response();
    };
    let Ok(provided) = header.to_str() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "bad_admin_token"})),
        )
            .into_response();
    };

    let expected = &get_config().admin_api_token;
    if ConstantTimeEq::ct_eq(provided.as_bytes(), expected.as_bytes()).into() {
        next.run(req).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_admin_token"})),
        )
            .into_response()
    }
}
