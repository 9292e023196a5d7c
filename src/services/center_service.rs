use sqlx::PgPool;

use crate::error::Result;
use crate::models::logistic_center::LogisticCenter;

#[derive(Clone)]
pub struct CenterService {
    pool: PgPool,
}

impl CenterService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_for_shop(&self, shop: &str) -> Result<Option<LogisticCenter>> {
        let center = sqlx::query_as::<_, LogisticCenter>(
            r#"
            SELECT * FROM logistic_centers
            WHERE shop = $1
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(shop)
        .fetch_optional(&self.pool)
        .await?;

        Ok(center)
    }
}
