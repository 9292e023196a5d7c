use std::env;

use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use logistics_relay_backend::models::audit_log::{
    AuditLogUpdate, AuditStatus, EventType, NewAuditLog,
};
use logistics_relay_backend::services::audit_service::AuditService;

async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to create test pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

fn unique_order_id(tag: &str) -> String {
    format!(
        "{}-{}",
        tag,
        chrono::Utc::now().timestamp_nanos_opt().unwrap()
    )
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance"]
async fn save_requires_order_id_and_shop() {
    let service = AuditService::new(setup_test_db().await);

    let missing_order = NewAuditLog::new("", "test-shop", EventType::OrderPaid, AuditStatus::Pending);
    assert!(service.save(missing_order).await.is_err());

    let missing_shop = NewAuditLog::new("123", "", EventType::OrderPaid, AuditStatus::Pending);
    assert!(service.save(missing_shop).await.is_err());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance"]
async fn update_on_missing_pair_degrades_to_create() {
    let service = AuditService::new(setup_test_db().await);
    let order_id = unique_order_id("missing-pair");

    service
        .update(
            &order_id,
            EventType::ShipmentCompleted,
            AuditLogUpdate {
                shop: Some("test-shop".to_string()),
                status: Some(AuditStatus::Success),
                response_data: Some(json!({"tracking_number": "TRK9"})),
                ..Default::default()
            },
        )
        .await
        .expect("update should create a new entry");

    let logs = service.list_for_order(&order_id, 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "success");
    assert_eq!(logs[0].event_type, "shipment_completed");
    assert_eq!(
        logs[0].response_data.as_ref().unwrap()["tracking_number"],
        json!("TRK9")
    );
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance"]
async fn update_targets_the_most_recent_entry_and_merges_fields() {
    let service = AuditService::new(setup_test_db().await);
    let order_id = unique_order_id("merge");

    let first = NewAuditLog {
        error_message: Some("first attempt failed".to_string()),
        http_status: Some(500),
        ..NewAuditLog::new(
            order_id.clone(),
            "test-shop",
            EventType::OrderPaid,
            AuditStatus::Error,
        )
    };
    service.save(first).await.unwrap();

    let second = NewAuditLog::new(
        order_id.clone(),
        "test-shop",
        EventType::OrderPaid,
        AuditStatus::Pending,
    );
    service.save(second).await.unwrap();

    // Only the provided fields overwrite; a negative retry count is ignored.
    service
        .update(
            &order_id,
            EventType::OrderPaid,
            AuditLogUpdate {
                status: Some(AuditStatus::Success),
                retry_count: Some(-1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let logs = service.list_for_order(&order_id, 10).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].status, "success");
    assert_eq!(logs[0].retry_count, 0);
    assert_eq!(logs[1].status, "error");
    assert_eq!(logs[1].error_message.as_deref(), Some("first attempt failed"));
    assert_eq!(logs[1].http_status, Some(500));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance"]
async fn purge_removes_only_expired_entries_and_is_idempotent() {
    let pool = setup_test_db().await;
    let service = AuditService::new(pool.clone());
    let old_order = unique_order_id("old");
    let fresh_order = unique_order_id("fresh");

    let old = service
        .save(NewAuditLog::new(
            old_order.clone(),
            "test-shop",
            EventType::OrderPaid,
            AuditStatus::Success,
        ))
        .await
        .unwrap();
    sqlx::query("UPDATE audit_logs SET created_at = NOW() - INTERVAL '16 days' WHERE id = $1")
        .bind(old.id)
        .execute(&pool)
        .await
        .unwrap();

    service
        .save(NewAuditLog::new(
            fresh_order.clone(),
            "test-shop",
            EventType::OrderPaid,
            AuditStatus::Success,
        ))
        .await
        .unwrap();

    let deleted = service
        .purge_older_than(chrono::Duration::days(15))
        .await
        .unwrap();
    assert!(deleted >= 1);

    assert!(service.list_for_order(&old_order, 10).await.unwrap().is_empty());
    assert_eq!(service.list_for_order(&fresh_order, 10).await.unwrap().len(), 1);

    let second = service
        .purge_older_than(chrono::Duration::days(15))
        .await
        .unwrap();
    assert_eq!(second, 0);
}
