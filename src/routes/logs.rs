use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};

use crate::{
    error::Result,
    services::audit_service::RETENTION_DAYS,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ShopLogsQuery {
    pub shop: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

fn counts_to_object(counts: Vec<(String, i64)>) -> JsonValue {
    let map: Map<String, JsonValue> = counts
        .into_iter()
        .map(|(key, count)| (key, JsonValue::from(count)))
        .collect();
    JsonValue::Object(map)
}

/// Per-shop audit trail with totals, newest first.
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<ShopLogsQuery>,
) -> Result<impl IntoResponse> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    let logs = state.audit_service.list_for_shop(&query.shop, limit).await?;
    let total = state.audit_service.count_for_shop(&query.shop).await?;
    let by_status = state.audit_service.counts_by_status(&query.shop).await?;
    let by_event_type = state
        .audit_service
        .counts_by_event_type(&query.shop)
        .await?;

    Ok(Json(json!({
        "logs": logs,
        "total": total,
        "by_status": counts_to_object(by_status),
        "by_event_type": counts_to_object(by_event_type),
    })))
}

/// Relay history of a single order, newest first.
pub async fn logs_for_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let logs = state.audit_service.list_for_order(&order_id, limit).await?;

    Ok(Json(json!({ "order_id": order_id, "logs": logs })))
}

pub async fn cleanup_info() -> impl IntoResponse {
    Json(json!({
        "message": "Use POST method to execute cleanup",
        "endpoint": "/api/cleanup-audit-logs",
        "method": "POST",
    }))
}

/// Retention sweep: drop every entry older than the fixed window,
/// unconditional on status.
pub async fn run_cleanup(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let deleted = state
        .audit_service
        .purge_older_than(chrono::Duration::days(RETENTION_DAYS))
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Cleaned up {} audit logs older than {} days",
            deleted, RETENTION_DAYS
        ),
        "deleted_count": deleted,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub shop: String,
}

/// Relay wiring status for a shop: configuration presence plus the most
/// recent audit activity.
pub async fn webhook_status(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
) -> Result<impl IntoResponse> {
    let center = state.center_service.get_for_shop(&query.shop).await?;
    let total = state.audit_service.count_for_shop(&query.shop).await?;
    let recent = state.audit_service.list_for_shop(&query.shop, 5).await?;

    let recent: Vec<JsonValue> = recent
        .into_iter()
        .map(|log| {
            json!({
                "id": log.id,
                "shopify_order_id": log.shopify_order_id,
                "order_name": log.order_name,
                "event_type": log.event_type,
                "status": log.status,
                "created_at": log.created_at,
                "error_message": log.error_message,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "shop": query.shop,
        "has_logistic_center": center.is_some(),
        "logistic_center": center.map(|c| json!({
            "name": c.name,
            "has_base_url": c.base_url.as_deref().is_some_and(|u| !u.is_empty()),
            "has_access_token": c.access_token.as_deref().is_some_and(|t| !t.is_empty()),
        })),
        "audit_logs": {
            "total": total,
            "recent": recent,
        },
    })))
}
