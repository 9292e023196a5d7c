use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-shop logistics backend configuration. Written by the configuration
/// screens, read-only to the relay.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LogisticCenter {
    pub id: i32,
    pub shop: String,
    pub external_id: i32,
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub access_token: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LogisticCenter {
    /// Both endpoint fields must be present and non-empty before the
    /// order-paid relay may call out.
    pub fn is_fully_configured(&self) -> bool {
        self.base_url.as_deref().is_some_and(|u| !u.trim().is_empty())
            && self
                .access_token
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty())
    }
}
