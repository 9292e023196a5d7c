use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use validator::Validate;

/// Relay event categories recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    OrderPaid,
    PackageCreated,
    ShipmentCompleted,
    FulfillmentUpdated,
    Error,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::OrderPaid => "order_paid",
            EventType::PackageCreated => "package_created",
            EventType::ShipmentCompleted => "shipment_completed",
            EventType::FulfillmentUpdated => "fulfillment_updated",
            EventType::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Pending,
    Success,
    Error,
    Retry,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Pending => "pending",
            AuditStatus::Success => "success",
            AuditStatus::Error => "error",
            AuditStatus::Retry => "retry",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub shopify_order_id: String,
    pub order_name: Option<String>,
    pub shop: String,
    pub event_type: String,
    pub status: String,
    pub request_data: Option<JsonValue>,
    pub response_data: Option<JsonValue>,
    pub error_message: Option<String>,
    pub http_status: Option<i32>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new audit entry. `event_type` and `status` are always present
/// by construction; the string identifiers must be non-empty.
#[derive(Debug, Clone, Validate)]
pub struct NewAuditLog {
    #[validate(length(min = 1))]
    pub shopify_order_id: String,
    pub order_name: Option<String>,
    #[validate(length(min = 1))]
    pub shop: String,
    pub event_type: EventType,
    pub status: AuditStatus,
    pub request_data: Option<JsonValue>,
    pub response_data: Option<JsonValue>,
    pub error_message: Option<String>,
    pub http_status: Option<i32>,
    pub retry_count: i32,
}

impl NewAuditLog {
    pub fn new(
        shopify_order_id: impl Into<String>,
        shop: impl Into<String>,
        event_type: EventType,
        status: AuditStatus,
    ) -> Self {
        Self {
            shopify_order_id: shopify_order_id.into(),
            order_name: None,
            shop: shop.into(),
            event_type,
            status,
            request_data: None,
            response_data: None,
            error_message: None,
            http_status: None,
            retry_count: 0,
        }
    }
}

/// Partial update merged onto the most recent entry for an
/// (order, event type) pair. Only provided fields overwrite.
#[derive(Debug, Clone, Default)]
pub struct AuditLogUpdate {
    pub shop: Option<String>,
    pub order_name: Option<String>,
    pub status: Option<AuditStatus>,
    pub response_data: Option<JsonValue>,
    pub error_message: Option<String>,
    pub http_status: Option<i32>,
    pub retry_count: Option<i32>,
}
