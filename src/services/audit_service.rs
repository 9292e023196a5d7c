use chrono::Duration;
use sqlx::PgPool;
use tracing::{error, info};
use validator::Validate;

use crate::error::Result;
use crate::models::audit_log::{AuditLog, AuditLogUpdate, AuditStatus, EventType, NewAuditLog};

/// Number of days an audit entry survives before the retention sweep
/// removes it, regardless of status.
pub const RETENTION_DAYS: i64 = 15;

/// Durable store of relay attempts. Every call goes straight to the
/// database; the relay depends on reading the latest state.
#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, entry: NewAuditLog) -> Result<AuditLog> {
        entry.validate()?;

        let row = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs
                (shopify_order_id, order_name, shop, event_type, status,
                 request_data, response_data, error_message, http_status, retry_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&entry.shopify_order_id)
        .bind(&entry.order_name)
        .bind(&entry.shop)
        .bind(entry.event_type.as_str())
        .bind(entry.status.as_str())
        .bind(&entry.request_data)
        .bind(&entry.response_data)
        .bind(&entry.error_message)
        .bind(entry.http_status)
        .bind(entry.retry_count)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Merge the provided fields onto the most recent entry for the pair.
    /// Without a matching entry this degrades to `save` with a pending
    /// default status.
    pub async fn update(
        &self,
        shopify_order_id: &str,
        event_type: EventType,
        update: AuditLogUpdate,
    ) -> Result<()> {
        let existing = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE shopify_order_id = $1 AND event_type = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(shopify_order_id)
        .bind(event_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(existing) = existing else {
            self.save(NewAuditLog {
                shopify_order_id: shopify_order_id.to_string(),
                order_name: update.order_name,
                shop: update.shop.unwrap_or_default(),
                event_type,
                status: update.status.unwrap_or(AuditStatus::Pending),
                request_data: None,
                response_data: update.response_data,
                error_message: update.error_message,
                http_status: update.http_status,
                retry_count: update.retry_count.unwrap_or(0),
            })
            .await?;
            return Ok(());
        };

        let retry_count = update.retry_count.filter(|c| *c >= 0);

        sqlx::query(
            r#"
            UPDATE audit_logs SET
                status = COALESCE($1, status),
                response_data = COALESCE($2, response_data),
                error_message = COALESCE($3, error_message),
                http_status = COALESCE($4, http_status),
                retry_count = COALESCE($5, retry_count),
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(update.status.map(|s| s.as_str()))
        .bind(&update.response_data)
        .bind(&update.error_message)
        .bind(update.http_status)
        .bind(retry_count)
        .bind(existing.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_for_order(&self, shopify_order_id: &str, limit: i64) -> Result<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE shopify_order_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(shopify_order_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_for_shop(&self, shop: &str, limit: i64) -> Result<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE shop = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(shop)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_for_shop(&self, shop: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM audit_logs WHERE shop = $1"#)
            .bind(shop)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    pub async fn counts_by_status(&self, shop: &str) -> Result<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT status, COUNT(*) FROM audit_logs WHERE shop = $1 GROUP BY status"#,
        )
        .bind(shop)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn counts_by_event_type(&self, shop: &str) -> Result<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT event_type, COUNT(*) FROM audit_logs WHERE shop = $1 GROUP BY event_type"#,
        )
        .bind(shop)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete every entry older than `max_age`, unconditional on status.
    /// Returns the number of rows removed.
    pub async fn purge_older_than(&self, max_age: Duration) -> Result<u64> {
        let cutoff = crate::utils::time::now() - max_age;
        let result = sqlx::query(r#"DELETE FROM audit_logs WHERE created_at < $1"#)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        info!("Purged {} audit logs older than {} days", deleted, max_age.num_days());
        Ok(deleted)
    }

    /// Best-effort save. Audit persistence must never decide the outcome of
    /// a relay, so failures are logged and dropped here.
    pub async fn record(&self, entry: NewAuditLog) {
        let order_id = entry.shopify_order_id.clone();
        let event_type = entry.event_type;
        if let Err(e) = self.save(entry).await {
            error!(
                "Failed to save audit log for order {} ({}): {}",
                order_id,
                event_type.as_str(),
                e
            );
        }
    }

    /// Best-effort update, same failure boundary as [`record`].
    pub async fn record_update(
        &self,
        shopify_order_id: &str,
        event_type: EventType,
        update: AuditLogUpdate,
    ) {
        if let Err(e) = self.update(shopify_order_id, event_type, update).await {
            error!(
                "Failed to update audit log for order {} ({}): {}",
                shopify_order_id,
                event_type.as_str(),
                e
            );
        }
    }
}
