use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{CreateShareRequest, UpdateShareRequest};
use super::repo_types::Share;

const SHARE_COLUMNS: &str = r#"
    id, portfolio_id, shared_with_email, shared_by_user_id, token, view_count,
    last_viewed_at, is_active, message, created_at, expires_at
"#;

impl Share {
    pub async fn create(
        db: &PgPool,
        shared_by: i64,
        token: Uuid,
        req: &CreateShareRequest,
    ) -> sqlx::Result<Share> {
        sqlx::query_as::<_, Share>(&format!(
            r#"
            INSERT INTO shares (portfolio_id, shared_with_email, shared_by_user_id, token, message, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SHARE_COLUMNS}
            "#
        ))
        .bind(req.portfolio_id)
        .bind(&req.shared_with_email)
        .bind(shared_by)
        .bind(token)
        .bind(&req.message)
        .bind(req.expires_at)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<Share>> {
        sqlx::query_as::<_, Share>(&format!("SELECT {SHARE_COLUMNS} FROM shares WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_for_portfolio(db: &PgPool, portfolio_id: i64) -> sqlx::Result<Vec<Share>> {
        sqlx::query_as::<_, Share>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE portfolio_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(portfolio_id)
        .fetch_all(db)
        .await
    }

    pub async fn update(db: &PgPool, id: i64, req: &UpdateShareRequest) -> sqlx::Result<Share> {
        sqlx::query_as::<_, Share>(&format!(
            r#"
            UPDATE shares
               SET is_active = COALESCE($2, is_active),
                   message = COALESCE($3, message),
                   expires_at = COALESCE($4, expires_at)
             WHERE id = $1
            RETURNING {SHARE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(req.is_active)
        .bind(&req.message)
        .bind(req.expires_at)
        .fetch_one(db)
        .await
    }

    /// Counts one view of a live share in a single statement. `None` when the
    /// token is unknown, revoked or expired.
    pub async fn record_view(db: &PgPool, token: Uuid) -> sqlx::Result<Option<Share>> {
        sqlx::query_as::<_, Share>(&format!(
            r#"
            UPDATE shares
               SET view_count = view_count + 1,
                   last_viewed_at = now()
             WHERE token = $1
               AND is_active
               AND (expires_at IS NULL OR expires_at > now())
            RETURNING {SHARE_COLUMNS}
            "#
        ))
        .bind(token)
        .fetch_optional(db)
        .await
    }
}
