use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, info};

use crate::dto::order_dto::{OrderAddress, OrderCustomer, OrderLineItem, OrderWebhook};
use crate::error::{Error, Result};
use crate::models::logistic_center::LogisticCenter;
use crate::utils::gid;

/// Platform tag carried on every outbound package payload.
const ECOMMERCE_ID_SHOPIFY: i64 = 1;

/// Package-creation payload sent to the logistics backend when an order is
/// paid. Absent addresses and customer serialize as explicit nulls.
#[derive(Debug, Clone, Serialize)]
pub struct PackagePayload {
    pub shopify_order_id: String,
    pub order_name: String,
    pub order_number: JsonValue,
    pub financial_status: Option<String>,
    pub line_items: Vec<OrderLineItem>,
    pub shipping_address: Option<OrderAddress>,
    pub billing_address: Option<OrderAddress>,
    pub customer: Option<OrderCustomer>,
    pub total_price: Option<String>,
    pub subtotal_price: Option<String>,
    pub total_shipping_price: Option<String>,
    pub currency: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub shop: String,
    pub ecommerce_id: i64,
    pub client_id: i32,
}

#[derive(Debug, Clone)]
pub struct RelayOutcome {
    pub http_status: i32,
    pub body: JsonValue,
}

pub fn build_package_payload(
    center: &LogisticCenter,
    shop: &str,
    order: &OrderWebhook,
) -> Result<PackagePayload> {
    let raw_id = order
        .id
        .clone()
        .ok_or_else(|| Error::BadRequest("Order payload missing id".to_string()))?;
    let shopify_order_id = gid::order_id_from_gid(&raw_id);
    let order_name = order.label(&shopify_order_id);

    let order_number = order
        .order_number
        .map(JsonValue::from)
        .or_else(|| order.name.clone().map(JsonValue::String))
        .unwrap_or(JsonValue::Null);

    Ok(PackagePayload {
        shopify_order_id,
        order_name,
        order_number,
        financial_status: order.financial_status.clone(),
        line_items: order.line_items.clone(),
        shipping_address: order.shipping_address.clone(),
        billing_address: order.billing_address.clone(),
        customer: order.customer.clone(),
        total_price: order.total_price.clone(),
        subtotal_price: order.subtotal_price.clone(),
        total_shipping_price: order.shipping_total(),
        currency: order.currency.clone(),
        created_at: order.created_at.clone(),
        updated_at: order.updated_at.clone(),
        shop: shop.to_string(),
        ecommerce_id: ECOMMERCE_ID_SHOPIFY,
        client_id: center.external_id,
    })
}

/// Destination for package creation: `{base_url}/webhook/{access_token}/shopify`.
pub fn webhook_url(center: &LogisticCenter) -> Result<String> {
    let base = center
        .base_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::Config("Logistic center missing baseUrl".to_string()))?;
    let token = center
        .access_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Config("Logistic center missing accessToken".to_string()))?;

    url::Url::parse(base)
        .map_err(|e| Error::Config(format!("Invalid logistics backend base URL: {}", e)))?;

    Ok(format!(
        "{}/webhook/{}/shopify",
        base.trim_end_matches('/'),
        token
    ))
}

/// Outbound client for the logistics backend.
#[derive(Clone)]
pub struct RelayService {
    client: Client,
}

impl RelayService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Send the package-creation payload for a paid order. The caller has
    /// already checked the financial status and configuration and brackets
    /// this call with audit writes.
    pub async fn relay_paid_order(
        &self,
        center: &LogisticCenter,
        shop: &str,
        order: &OrderWebhook,
    ) -> Result<RelayOutcome> {
        let url = webhook_url(center)?;
        let payload = build_package_payload(center, shop, order)?;

        info!(
            "Sending package to logistics backend for order {} ({})",
            payload.order_name, payload.shopify_order_id
        );

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::transport(None, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "Logistics backend rejected package for order {}: {} - {}",
                payload.shopify_order_id, status, body
            );
            return Err(Error::transport(
                Some(status.as_u16() as i32),
                format!("Error from logistics backend: {} - {}", status, body),
            ));
        }

        let body = response.json::<JsonValue>().await.map_err(|e| {
            Error::transport(
                Some(status.as_u16() as i32),
                format!("Invalid JSON response from logistics backend: {}", e),
            )
        })?;

        info!(
            "Package created in logistics backend for order {}",
            payload.shopify_order_id
        );

        Ok(RelayOutcome {
            http_status: status.as_u16() as i32,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn center(base_url: Option<&str>, access_token: Option<&str>) -> LogisticCenter {
        LogisticCenter {
            id: 1,
            shop: "test-shop.myshopify.com".to_string(),
            external_id: 7,
            name: Some("Centro Santiago".to_string()),
            base_url: base_url.map(str::to_string),
            access_token: access_token.map(str::to_string),
            active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn webhook_url_templates_base_and_token() {
        let url = webhook_url(&center(Some("https://api.example.cl/"), Some("tok123"))).unwrap();
        assert_eq!(url, "https://api.example.cl/webhook/tok123/shopify");
    }

    #[test]
    fn webhook_url_requires_both_fields() {
        assert!(webhook_url(&center(None, Some("tok"))).is_err());
        assert!(webhook_url(&center(Some("https://api.example.cl"), None)).is_err());
        assert!(webhook_url(&center(Some("   "), Some("tok"))).is_err());
        assert!(webhook_url(&center(Some("not a url"), Some("tok"))).is_err());
    }

    #[test]
    fn payload_carries_platform_and_tenant_tags() {
        let order: OrderWebhook = serde_json::from_value(json!({
            "id": "gid://shopify/Order/9001",
            "name": "#9001",
            "order_number": 9001,
            "financial_status": "paid",
            "total_price": "15990",
            "currency": "CLP"
        }))
        .unwrap();

        let payload = build_package_payload(
            &center(Some("https://api.example.cl"), Some("tok")),
            "test-shop.myshopify.com",
            &order,
        )
        .unwrap();

        assert_eq!(payload.shopify_order_id, "9001");
        assert_eq!(payload.order_name, "#9001");
        assert_eq!(payload.ecommerce_id, 1);
        assert_eq!(payload.client_id, 7);
        assert_eq!(payload.shop, "test-shop.myshopify.com");

        let serialized = serde_json::to_value(&payload).unwrap();
        assert_eq!(serialized["shipping_address"], JsonValue::Null);
        assert_eq!(serialized["billing_address"], JsonValue::Null);
        assert_eq!(serialized["customer"], JsonValue::Null);
        assert_eq!(serialized["line_items"], json!([]));
    }

    #[test]
    fn payload_requires_order_id() {
        let order: OrderWebhook = serde_json::from_value(json!({"name": "#1"})).unwrap();
        let result = build_package_payload(
            &center(Some("https://api.example.cl"), Some("tok")),
            "test-shop.myshopify.com",
            &order,
        );
        assert!(result.is_err());
    }
}
