use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Commerce-platform session row, written by the embedded-app auth layer.
/// The relay only reads it to resolve the owning shop of inbound events.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub shop: String,
    pub access_token: Option<String>,
    pub expires: Option<DateTime<Utc>>,
}
