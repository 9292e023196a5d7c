use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use logistics_relay_backend::dto::order_dto::OrderWebhook;
use logistics_relay_backend::error::Error;
use logistics_relay_backend::models::logistic_center::LogisticCenter;
use logistics_relay_backend::services::relay_service::RelayService;

fn center(base_url: &str) -> LogisticCenter {
    LogisticCenter {
        id: 1,
        shop: "test-shop.myshopify.com".to_string(),
        external_id: 7,
        name: Some("Centro Santiago".to_string()),
        base_url: Some(base_url.to_string()),
        access_token: Some("tok123".to_string()),
        active: true,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

fn paid_order() -> OrderWebhook {
    serde_json::from_value(json!({
        "id": 9001,
        "name": "#9001",
        "order_number": 9001,
        "financial_status": "paid",
        "line_items": [
            {"id": 11, "name": "Producto A", "quantity": 2, "sku": "SKU-A", "variant_id": 21, "price": "7995"}
        ],
        "shipping_address": {
            "first_name": "Ana", "last_name": "Rojas", "address1": "Av. Siempre Viva 123",
            "city": "Santiago", "province": "RM", "country": "Chile", "zip": "8320000"
        },
        "customer": {"id": 31, "email": "ana@example.com", "first_name": "Ana", "last_name": "Rojas"},
        "total_price": "15990",
        "subtotal_price": "15990",
        "total_shipping_price_set": {"shop_money": {"amount": "2500"}},
        "currency": "CLP",
        "created_at": "2026-07-01T12:00:00-04:00",
        "updated_at": "2026-07-01T12:05:00-04:00"
    }))
    .unwrap()
}

#[tokio::test]
async fn relay_posts_package_and_returns_backend_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook/tok123/shopify"))
        .and(body_partial_json(json!({
            "shopify_order_id": "9001",
            "order_name": "#9001",
            "ecommerce_id": 1,
            "client_id": 7,
            "shop": "test-shop.myshopify.com",
            "total_shipping_price": "2500",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "package_id": 555
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = RelayService::new(reqwest::Client::new());
    let outcome = service
        .relay_paid_order(&center(&server.uri()), "test-shop.myshopify.com", &paid_order())
        .await
        .unwrap();

    assert_eq!(outcome.http_status, 200);
    assert_eq!(outcome.body["package_id"], json!(555));
}

#[tokio::test]
async fn non_2xx_response_is_a_transport_error_with_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook/tok123/shopify"))
        .respond_with(ResponseTemplate::new(422).set_body_string("commune without coverage"))
        .mount(&server)
        .await;

    let service = RelayService::new(reqwest::Client::new());
    let result = service
        .relay_paid_order(&center(&server.uri()), "test-shop.myshopify.com", &paid_order())
        .await;

    match result {
        Err(Error::Transport { status, message }) => {
            assert_eq!(status, Some(422));
            assert!(message.contains("commune without coverage"));
        }
        other => panic!("expected transport error, got {:?}", other.map(|o| o.http_status)),
    }
}

#[tokio::test]
async fn connection_failure_is_a_transport_error_without_status() {
    let service = RelayService::new(reqwest::Client::new());
    let result = service
        .relay_paid_order(
            &center("http://127.0.0.1:1"),
            "test-shop.myshopify.com",
            &paid_order(),
        )
        .await;

    match result {
        Err(Error::Transport { status, .. }) => assert_eq!(status, None),
        other => panic!("expected transport error, got {:?}", other.map(|o| o.http_status)),
    }
}
