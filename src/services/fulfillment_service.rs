use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::utils::gid;

const SHOPIFY_API_VERSION: &str = "2024-10";

/// Carrier label shown to the customer on fulfillment tracking info.
const CARRIER_NAME: &str = "Recibelo";

const FULFILLMENT_ORDERS_QUERY: &str = r#"
query getFulfillmentOrders($orderId: ID!) {
  order(id: $orderId) {
    id
    fulfillmentOrders(first: 10) {
      edges {
        node {
          id
          status
          requestStatus
        }
      }
    }
  }
}
"#;

const ADVANCE_STATUS_MUTATION: &str = r#"
mutation fulfillmentOrderUpdate($id: ID!, $status: FulfillmentOrderStatus!) {
  fulfillmentOrderUpdate(id: $id, status: $status) {
    fulfillmentOrder {
      id
      status
    }
    userErrors {
      field
      message
    }
  }
}
"#;

const CREATE_FULFILLMENT_MUTATION: &str = r#"
mutation fulfillmentCreateV2($fulfillment: FulfillmentV2Input!) {
  fulfillmentCreateV2(fulfillment: $fulfillment) {
    fulfillment {
      id
      status
      trackingInfo {
        number
        url
        company
      }
    }
    userErrors {
      field
      message
    }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentOrderNode {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub request_status: Option<String>,
}

/// Only untouched fulfillment orders advance; anything already submitted,
/// advanced or cancelled is skipped rather than retried.
fn needs_advance(node: &FulfillmentOrderNode) -> bool {
    node.status == "OPEN" && node.request_status.as_deref() == Some("UNSUBMITTED")
}

fn can_fulfill(node: &FulfillmentOrderNode) -> bool {
    matches!(node.status.as_str(), "IN_PROGRESS" | "OPEN")
}

fn ensure_no_graphql_errors(response: &JsonValue) -> Result<()> {
    if let Some(errors) = response.get("errors").filter(|e| !e.is_null()) {
        return Err(Error::transport(
            None,
            format!("GraphQL errors: {}", errors),
        ));
    }
    Ok(())
}

fn parse_fulfillment_orders(response: &JsonValue) -> Vec<FulfillmentOrderNode> {
    response["data"]["order"]["fulfillmentOrders"]["edges"]
        .as_array()
        .map(|edges| {
            edges
                .iter()
                .filter_map(|edge| serde_json::from_value(edge["node"].clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn user_errors(result: &JsonValue, mutation: &str) -> Option<JsonValue> {
    result["data"][mutation]["userErrors"]
        .as_array()
        .filter(|errs| !errs.is_empty())
        .map(|errs| JsonValue::Array(errs.clone()))
}

/// Moves an order's fulfillment orders through their states on the commerce
/// platform, one GraphQL call at a time.
#[derive(Clone)]
pub struct FulfillmentService {
    client: Client,
    api_base: Option<String>,
}

impl FulfillmentService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            api_base: None,
        }
    }

    /// Point the admin API at an explicit endpoint instead of the shop
    /// domain, e.g. a local mock server.
    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = Some(api_base);
        self
    }

    fn endpoint(&self, shop: &str) -> String {
        self.api_base.clone().unwrap_or_else(|| {
            format!(
                "https://{}/admin/api/{}/graphql.json",
                shop, SHOPIFY_API_VERSION
            )
        })
    }

    async fn graphql(
        &self,
        shop: &str,
        access_token: &str,
        query: &str,
        variables: JsonValue,
    ) -> Result<JsonValue> {
        let response = self
            .client
            .post(self.endpoint(shop))
            .header("X-Shopify-Access-Token", access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| Error::transport(None, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transport(
                Some(status.as_u16() as i32),
                format!("Admin API returned {}: {}", status, body),
            ));
        }

        let body = response.json::<JsonValue>().await.map_err(|e| {
            Error::transport(
                Some(status.as_u16() as i32),
                format!("Invalid JSON from admin API: {}", e),
            )
        })?;

        Ok(body)
    }

    async fn fetch_fulfillment_orders(
        &self,
        shop: &str,
        access_token: &str,
        shopify_order_id: &str,
    ) -> Result<Vec<FulfillmentOrderNode>> {
        let response = self
            .graphql(
                shop,
                access_token,
                FULFILLMENT_ORDERS_QUERY,
                json!({ "orderId": gid::order_gid(shopify_order_id) }),
            )
            .await?;
        ensure_no_graphql_errors(&response)?;
        Ok(parse_fulfillment_orders(&response))
    }

    /// Move every open, unsubmitted fulfillment order of the order to
    /// IN_PROGRESS. Per-item mutation failures are logged and skipped; only
    /// a failure of the query itself aborts.
    pub async fn advance_to_in_progress(
        &self,
        shop: &str,
        access_token: &str,
        shopify_order_id: &str,
    ) -> Result<()> {
        let orders = self
            .fetch_fulfillment_orders(shop, access_token, shopify_order_id)
            .await?;

        for node in orders.iter().filter(|n| needs_advance(n)) {
            let result = self
                .graphql(
                    shop,
                    access_token,
                    ADVANCE_STATUS_MUTATION,
                    json!({ "id": node.id, "status": "IN_PROGRESS" }),
                )
                .await;

            match result {
                Ok(body) => {
                    if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
                        error!("Error updating fulfillment order {}: {}", node.id, errors);
                    } else if let Some(errs) = user_errors(&body, "fulfillmentOrderUpdate") {
                        error!("User errors updating fulfillment order {}: {}", node.id, errs);
                    } else {
                        info!("FulfillmentOrder {} moved to IN_PROGRESS", node.id);
                    }
                }
                Err(e) => {
                    error!("Failed to update fulfillment order {}: {}", node.id, e);
                }
            }
        }

        Ok(())
    }

    /// Create a fulfillment with tracking info for every in-progress or open
    /// fulfillment order, notifying the customer. Same per-item failure
    /// isolation as [`advance_to_in_progress`].
    pub async fn create_fulfillment_with_tracking(
        &self,
        shop: &str,
        access_token: &str,
        shopify_order_id: &str,
        tracking_number: &str,
        tracking_url: &str,
    ) -> Result<()> {
        let orders = self
            .fetch_fulfillment_orders(shop, access_token, shopify_order_id)
            .await?;

        for node in orders.iter().filter(|n| can_fulfill(n)) {
            let variables = json!({
                "fulfillment": {
                    "fulfillmentOrderId": node.id,
                    "trackingInfo": {
                        "number": tracking_number,
                        "url": tracking_url,
                        "company": CARRIER_NAME,
                    },
                    "notifyCustomer": true,
                }
            });

            let result = self
                .graphql(shop, access_token, CREATE_FULFILLMENT_MUTATION, variables)
                .await;

            match result {
                Ok(body) => {
                    if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
                        error!("Error creating fulfillment for {}: {}", node.id, errors);
                    } else if let Some(errs) = user_errors(&body, "fulfillmentCreateV2") {
                        error!("User errors creating fulfillment for {}: {}", node.id, errs);
                    } else {
                        info!("Fulfillment created for {} ({})", node.id, tracking_number);
                    }
                }
                Err(e) => {
                    error!("Failed to create fulfillment for {}: {}", node.id, e);
                }
            }
        }

        Ok(())
    }
}
