use sqlx::PgPool;

use crate::error::Result;
use crate::models::session::Session;

#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
}

impl SessionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Sessions that have not expired. Inbound logistics events carry no
    /// tenant key, so routing falls back to "exactly one active session".
    pub async fn active_sessions(&self) -> Result<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, shop, access_token, expires FROM sessions
            WHERE expires IS NULL OR expires > NOW()
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    pub async fn get_for_shop(&self, shop: &str) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, shop, access_token, expires FROM sessions
            WHERE shop = $1
            LIMIT 1
            "#,
        )
        .bind(shop)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }
}
