use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A portfolio shared with one recipient via a link token.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Share {
    pub id: i64,
    pub portfolio_id: i64,
    pub shared_with_email: String,
    pub shared_by_user_id: i64,
    pub token: Uuid,
    pub view_count: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_viewed_at: Option<OffsetDateTime>,
    pub is_active: bool,
    pub message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}
