use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value as JsonValue};
use tracing::{error, info, warn};

use crate::{
    dto::logistics_dto::{normalize, EventKind, TRACKING_BASE_URL},
    error::{Error, Result},
    models::audit_log::{AuditLogUpdate, AuditStatus, EventType, NewAuditLog},
    AppState,
};

/// Logistics-backend webhook: package lifecycle events flow back into the
/// commerce platform's fulfillment orders. Unlike the outbound path,
/// downstream failures here surface as 5xx so the backend retries.
pub async fn handle_logistics_event(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<JsonValue>)> {
    info!("Webhook received from logistics backend");

    let event = normalize(&body)?;

    if event.kind == EventKind::Unrecognized {
        // Acknowledge so the sender does not retry a status we will never
        // process.
        info!("Ignoring unrecognized package status for package {}", event.package_id);
        return Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": format!("Event not processed for package {}", event.package_id),
            })),
        ));
    }

    // The webhook carries no tenant key; routing only works when exactly one
    // active session exists (single-tenant deployments).
    let sessions = state.session_service.active_sessions().await?;
    if sessions.len() != 1 {
        warn!(
            "Cannot resolve shop for logistics event: {} active sessions",
            sessions.len()
        );
        return Err(Error::BadRequest(
            "Could not determine the shop: expected exactly one active session".to_string(),
        ));
    }
    let session = &sessions[0];
    let shop = session.shop.clone();
    info!("Resolved shop for logistics event: {}", shop);

    let Some(access_token) = session
        .access_token
        .clone()
        .filter(|t| !t.trim().is_empty())
    else {
        error!("No usable session token for shop: {}", shop);
        return Err(Error::NotFound(
            "Shop not found or not authenticated".to_string(),
        ));
    };

    let (event_type, order_label) = match event.kind {
        EventKind::PackageCreated => (EventType::PackageCreated, event.package_id.to_string()),
        EventKind::ShipmentCompleted => (
            EventType::ShipmentCompleted,
            event
                .tracking_number
                .clone()
                .unwrap_or_else(|| event.package_id.to_string()),
        ),
        EventKind::Unrecognized => unreachable!("handled above"),
    };

    match event.kind {
        EventKind::PackageCreated => {
            let Some(order_id) = event.shopify_order_id.clone() else {
                // Without the platform order id there is nothing to update;
                // still acknowledged so the backend does not retry.
                warn!(
                    "Package {} created but no shopify_order_id was provided",
                    event.package_id
                );
                return Ok((
                    StatusCode::OK,
                    Json(json!({
                        "success": true,
                        "message": format!(
                            "Package {} received but shopify_order_id unavailable; ensure imported_id carries the platform order id",
                            event.package_id
                        ),
                    })),
                ));
            };

            state
                .audit_service
                .record(NewAuditLog {
                    order_name: Some(order_label),
                    request_data: Some(body.clone()),
                    ..NewAuditLog::new(
                        order_id.clone(),
                        shop.clone(),
                        event_type,
                        AuditStatus::Pending,
                    )
                })
                .await;

            match state
                .fulfillment_service
                .advance_to_in_progress(&shop, &access_token, &order_id)
                .await
            {
                Ok(()) => {
                    state
                        .audit_service
                        .record_update(
                            &order_id,
                            event_type,
                            AuditLogUpdate {
                                status: Some(AuditStatus::Success),
                                http_status: Some(200),
                                ..Default::default()
                            },
                        )
                        .await;
                }
                Err(e) => {
                    state
                        .audit_service
                        .record_update(
                            &order_id,
                            event_type,
                            AuditLogUpdate {
                                status: Some(AuditStatus::Error),
                                error_message: Some(e.to_string()),
                                ..Default::default()
                            },
                        )
                        .await;
                    return Err(e);
                }
            }
        }

        EventKind::ShipmentCompleted => {
            let Some(order_id) = event.shopify_order_id.clone() else {
                return Err(Error::BadRequest(
                    "shopify_order_id required for shipment_completed; ensure imported_id carries the platform order id"
                        .to_string(),
                ));
            };

            let tracking_number = event
                .tracking_number
                .clone()
                .unwrap_or_else(|| event.package_id.to_string());
            let tracking_url = event
                .tracking_url
                .clone()
                .unwrap_or_else(|| format!("{}/{}", TRACKING_BASE_URL, tracking_number));

            state
                .audit_service
                .record(NewAuditLog {
                    order_name: Some(order_label),
                    request_data: Some(body.clone()),
                    ..NewAuditLog::new(
                        order_id.clone(),
                        shop.clone(),
                        event_type,
                        AuditStatus::Pending,
                    )
                })
                .await;

            match state
                .fulfillment_service
                .create_fulfillment_with_tracking(
                    &shop,
                    &access_token,
                    &order_id,
                    &tracking_number,
                    &tracking_url,
                )
                .await
            {
                Ok(()) => {
                    state
                        .audit_service
                        .record_update(
                            &order_id,
                            event_type,
                            AuditLogUpdate {
                                status: Some(AuditStatus::Success),
                                http_status: Some(200),
                                response_data: Some(json!({
                                    "tracking_number": tracking_number,
                                    "tracking_url": tracking_url,
                                })),
                                ..Default::default()
                            },
                        )
                        .await;
                }
                Err(e) => {
                    state
                        .audit_service
                        .record_update(
                            &order_id,
                            event_type,
                            AuditLogUpdate {
                                status: Some(AuditStatus::Error),
                                error_message: Some(e.to_string()),
                                ..Default::default()
                            },
                        )
                        .await;
                    return Err(e);
                }
            }
        }

        EventKind::Unrecognized => unreachable!("handled above"),
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": format!("Event {} processed successfully", event_type.as_str()),
        })),
    ))
}
