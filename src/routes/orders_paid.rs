use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde_json::{json, Value as JsonValue};
use tracing::{error, info, warn};

use crate::{
    config::get_config,
    dto::order_dto::OrderWebhook,
    models::audit_log::{AuditLogUpdate, AuditStatus, EventType, NewAuditLog},
    utils::{gid, shopify_auth},
    AppState,
};

const UNKNOWN: &str = "unknown";

/// Reachability probe; the platform only ever POSTs here.
pub async fn order_paid_info() -> impl IntoResponse {
    Json(json!({
        "message": "This endpoint only accepts POST requests from the commerce platform",
        "endpoint": "/webhooks/orders/paid",
        "method": "POST",
    }))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn acknowledged_error(message: String) -> (StatusCode, Json<JsonValue>) {
    // Failures on this path are recorded, never surfaced as retryable:
    // repeated non-2xx responses would get the webhook subscription dropped.
    (
        StatusCode::OK,
        Json(json!({ "success": false, "error": message })),
    )
}

/// Orders/paid webhook: relay the paid order to the logistics backend as a
/// package-creation request, bracketed by audit writes.
pub async fn handle_order_paid(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<JsonValue>) {
    let shop = header_str(&headers, "x-shopify-shop-domain")
        .unwrap_or(UNKNOWN)
        .to_string();
    let config = get_config();

    let signature = header_str(&headers, "x-shopify-hmac-sha256");
    let authenticated = signature.is_some_and(|sig| {
        shopify_auth::verify_webhook_hmac(&config.shopify_webhook_secret, &body, sig)
    });
    if !authenticated {
        warn!("Webhook authentication failed for shop {}", shop);
        state
            .audit_service
            .record(NewAuditLog {
                order_name: Some(UNKNOWN.to_string()),
                error_message: Some(
                    "Webhook authentication failed: invalid or missing HMAC signature".to_string(),
                ),
                request_data: Some(json!({ "error_type": "authentication_error" })),
                ..NewAuditLog::new(UNKNOWN, shop, EventType::Error, AuditStatus::Error)
            })
            .await;
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Webhook authentication failed" })),
        );
    }

    let raw: JsonValue = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            error!("Invalid JSON in orders/paid webhook: {}", e);
            state
                .audit_service
                .record(NewAuditLog {
                    order_name: Some(UNKNOWN.to_string()),
                    error_message: Some(format!("Invalid webhook body: {}", e)),
                    request_data: Some(json!({ "error_type": "parse_error" })),
                    ..NewAuditLog::new(UNKNOWN, shop, EventType::Error, AuditStatus::Error)
                })
                .await;
            return acknowledged_error("Invalid webhook body".to_string());
        }
    };

    let order: OrderWebhook = match serde_json::from_value(raw.clone()) {
        Ok(order) => order,
        Err(e) => {
            error!("Unexpected orders/paid payload shape: {}", e);
            state
                .audit_service
                .record(NewAuditLog {
                    order_name: Some(UNKNOWN.to_string()),
                    error_message: Some(format!("Invalid order payload: {}", e)),
                    request_data: Some(json!({ "error_type": "parse_error" })),
                    ..NewAuditLog::new(UNKNOWN, shop, EventType::Error, AuditStatus::Error)
                })
                .await;
            return acknowledged_error("Invalid order payload".to_string());
        }
    };

    let Some(raw_id) = order.id.clone() else {
        error!("orders/paid payload missing order id");
        state
            .audit_service
            .record(NewAuditLog {
                order_name: Some(UNKNOWN.to_string()),
                error_message: Some("Invalid order payload: missing order id".to_string()),
                request_data: Some(json!({ "error_type": "parse_error" })),
                ..NewAuditLog::new(UNKNOWN, shop, EventType::Error, AuditStatus::Error)
            })
            .await;
        return acknowledged_error("Invalid order payload: missing order id".to_string());
    };

    let shopify_order_id = gid::order_id_from_gid(&raw_id);
    let order_name = order.label(&shopify_order_id);

    if order.financial_status.as_deref() != Some("paid") {
        info!(
            "Order {} not paid yet, financial_status: {:?}",
            shopify_order_id, order.financial_status
        );
        return (
            StatusCode::OK,
            Json(json!({ "success": true, "message": "Order not paid" })),
        );
    }

    let center = match state.center_service.get_for_shop(&shop).await {
        Ok(center) => center,
        Err(e) => {
            error!("Failed to load logistic center for shop {}: {}", shop, e);
            state
                .audit_service
                .record(NewAuditLog {
                    order_name: Some(order_name.clone()),
                    error_message: Some(format!("Failed to load logistic center: {}", e)),
                    ..NewAuditLog::new(
                        shopify_order_id.clone(),
                        shop,
                        EventType::Error,
                        AuditStatus::Error,
                    )
                })
                .await;
            return acknowledged_error("Failed to load logistic center".to_string());
        }
    };

    let rejection_request_data = json!({
        "order_id": raw_id.clone(),
        "order_name": order_name.clone(),
        "financial_status": order.financial_status.clone(),
    });

    let Some(center) = center else {
        error!("No logistic center configured for shop: {}", shop);
        state
            .audit_service
            .record(NewAuditLog {
                order_name: Some(order_name.clone()),
                error_message: Some("No logistic center configured for this shop".to_string()),
                request_data: Some(rejection_request_data),
                ..NewAuditLog::new(
                    shopify_order_id.clone(),
                    shop,
                    EventType::Error,
                    AuditStatus::Error,
                )
            })
            .await;
        return acknowledged_error("No logistic center configured".to_string());
    };

    if !center.is_fully_configured() {
        error!(
            "Logistic center missing baseUrl or accessToken for shop: {}",
            shop
        );
        state
            .audit_service
            .record(NewAuditLog {
                order_name: Some(order_name.clone()),
                error_message: Some("Logistic center missing baseUrl or accessToken".to_string()),
                request_data: Some(rejection_request_data),
                ..NewAuditLog::new(
                    shopify_order_id.clone(),
                    shop,
                    EventType::Error,
                    AuditStatus::Error,
                )
            })
            .await;
        return acknowledged_error("Logistic center not fully configured".to_string());
    }

    info!(
        "Saving audit log for order {} ({})",
        order_name, shopify_order_id
    );
    state
        .audit_service
        .record(NewAuditLog {
            order_name: Some(order_name.clone()),
            request_data: Some(json!({
                "full_order": raw,
                "order_id": raw_id,
                "order_name": order_name.clone(),
                "financial_status": order.financial_status.clone(),
                "total_price": order.total_price.clone(),
                "currency": order.currency.clone(),
                "line_items_count": order.line_items.len(),
                "has_shipping_address": order.shipping_address.is_some(),
                "has_billing_address": order.billing_address.is_some(),
                "has_customer": order.customer.is_some(),
            })),
            ..NewAuditLog::new(
                shopify_order_id.clone(),
                shop.clone(),
                EventType::OrderPaid,
                AuditStatus::Pending,
            )
        })
        .await;

    match state
        .relay_service
        .relay_paid_order(&center, &shop, &order)
        .await
    {
        Ok(outcome) => {
            state
                .audit_service
                .record_update(
                    &shopify_order_id,
                    EventType::OrderPaid,
                    AuditLogUpdate {
                        status: Some(AuditStatus::Success),
                        response_data: Some(outcome.body.clone()),
                        http_status: Some(outcome.http_status),
                        ..Default::default()
                    },
                )
                .await;

            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": format!("Package sent to logistics backend for order {}", order_name),
                    "response": outcome.body,
                })),
            )
        }
        Err(e) => {
            error!(
                "Failed to relay order {} to logistics backend: {}",
                shopify_order_id, e
            );
            state
                .audit_service
                .record_update(
                    &shopify_order_id,
                    EventType::OrderPaid,
                    AuditLogUpdate {
                        status: Some(AuditStatus::Error),
                        error_message: Some(e.to_string()),
                        http_status: e.http_status(),
                        ..Default::default()
                    },
                )
                .await;

            acknowledged_error(e.to_string())
        }
    }
}
