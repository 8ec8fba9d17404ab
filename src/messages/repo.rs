use sqlx::PgPool;

use super::repo_types::{Conversation, ConversationSummary, Message, MessageType, NewMessage};

const CONVERSATION_COLUMNS: &str =
    "id, user_id, portfolio_id, title, is_active, created_at, updated_at";

const MESSAGE_COLUMNS: &str = r#"
    id, conversation_id, sender_id, recipient_id, content, message_type, is_read,
    reply_to_id, triggered_by_voice, ai_model, created_at
"#;

impl Conversation {
    pub async fn create(
        db: &PgPool,
        user_id: i64,
        title: Option<&str>,
        portfolio_id: Option<i64>,
    ) -> sqlx::Result<Conversation> {
        sqlx::query_as::<_, Conversation>(&format!(
            r#"
            INSERT INTO conversations (user_id, title, portfolio_id)
            VALUES ($1, $2, $3)
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(title)
        .bind(portfolio_id)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<Conversation>> {
        sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn list_by_user(db: &PgPool, user_id: i64) -> sqlx::Result<Vec<ConversationSummary>> {
        sqlx::query_as::<_, ConversationSummary>(
            r#"
            SELECT c.id, c.title, c.portfolio_id, c.is_active, c.created_at, c.updated_at,
                   COUNT(m.id) AS message_count
            FROM conversations c
            LEFT JOIN messages m ON m.conversation_id = c.id
            WHERE c.user_id = $1
            GROUP BY c.id
            ORDER BY COALESCE(c.updated_at, c.created_at) DESC, c.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn touch(db: &PgPool, id: i64) -> sqlx::Result<()> {
        sqlx::query("UPDATE conversations SET updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

impl Message {
    pub async fn create(db: &PgPool, new: &NewMessage) -> sqlx::Result<Message> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (
                conversation_id, sender_id, recipient_id, content, message_type,
                reply_to_id, triggered_by_voice
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(new.conversation_id)
        .bind(new.sender_id)
        .bind(new.recipient_id)
        .bind(&new.content)
        .bind(MessageType::User)
        .bind(new.reply_to_id)
        .bind(new.triggered_by_voice)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<Message>> {
        sqlx::query_as::<_, Message>(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_in_conversation(db: &PgPool, conversation_id: i64) -> sqlx::Result<Vec<Message>> {
        sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 ORDER BY created_at, id"
        ))
        .bind(conversation_id)
        .fetch_all(db)
        .await
    }

    /// Direct messages addressed to `user_id`, newest first.
    pub async fn inbox(db: &PgPool, user_id: i64) -> sqlx::Result<Vec<Message>> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE recipient_id = $1 AND conversation_id IS NULL
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn mark_read(db: &PgPool, id: i64) -> sqlx::Result<Message> {
        sqlx::query_as::<_, Message>(&format!(
            "UPDATE messages SET is_read = TRUE WHERE id = $1 RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(db)
        .await
    }

    /// The message and its reply ancestors, nearest first, at most `limit` rows.
    /// Each hop must move to a smaller id, so the walk ends even on bad data.
    pub async fn ancestors(db: &PgPool, id: i64, limit: usize) -> sqlx::Result<Vec<Message>> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            WITH RECURSIVE chain AS (
                SELECT m.*, 1 AS depth
                FROM messages m
                WHERE m.id = $1
                UNION ALL
                SELECT p.*, c.depth + 1
                FROM messages p
                JOIN chain c ON p.id = c.reply_to_id
                WHERE c.depth < $2 AND p.id < c.id
            )
            SELECT {MESSAGE_COLUMNS} FROM chain ORDER BY depth
            "#
        ))
        .bind(id)
        .bind(limit as i32)
        .fetch_all(db)
        .await
    }
}
