use sqlx::PgPool;

use crate::auth::repo_types::{NewUser, User};

const USER_COLUMNS: &str = r#"
    id, email, username, hashed_password, full_name, role, is_active, is_verified,
    profile_image, bio, created_at, updated_at, last_login
"#;

/// New accounts start active and unverified.
fn insert_user_sql() -> String {
    format!(
        r#"
        INSERT INTO users (email, username, hashed_password, full_name, bio, role, is_active, is_verified)
        VALUES ($1, $2, $3, $4, $5, $6, TRUE, FALSE)
        RETURNING {USER_COLUMNS}
        "#
    )
}

impl User {
    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Find a user by (normalized) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    /// First user holding either identifier; used for the signup uniqueness check.
    pub async fn find_by_email_or_username(
        db: &PgPool,
        email: &str,
        username: &str,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $2 LIMIT 1"
        ))
        .bind(email)
        .bind(username)
        .fetch_optional(db)
        .await
    }

    /// Create a new active, unverified user.
    pub async fn create(db: &PgPool, new: &NewUser) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&insert_user_sql())
            .bind(&new.email)
            .bind(&new.username)
            .bind(&new.hashed_password)
            .bind(&new.full_name)
            .bind(&new.bio)
            .bind(new.role)
            .fetch_one(db)
            .await
    }

    pub async fn touch_last_login(db: &PgPool, id: i64) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET last_login = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(db)
        .await
    }

    /// Partial profile edit; `None` keeps the current value.
    pub async fn update_profile(
        db: &PgPool,
        id: i64,
        full_name: Option<&str>,
        bio: Option<&str>,
        profile_image: Option<&str>,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET full_name = COALESCE($2, full_name),
                   bio = COALESCE($3, bio),
                   profile_image = COALESCE($4, profile_image),
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(full_name)
        .bind(bio)
        .bind(profile_image)
        .fetch_one(db)
        .await
    }

    pub async fn set_password(db: &PgPool, id: i64, hashed_password: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET hashed_password = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(hashed_password)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_active(db: &PgPool, id: i64, is_active: bool) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sets_active_and_unverified() {
        let sql = insert_user_sql();
        let squash = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        let sql = squash(&sql);

        let cols = sql
            .split_once("INSERT INTO users (")
            .and_then(|(_, rest)| rest.split_once(')'))
            .map(|(cols, _)| cols.split(", ").collect::<Vec<_>>())
            .unwrap();
        let vals = sql
            .split_once("VALUES (")
            .and_then(|(_, rest)| rest.split_once(')'))
            .map(|(vals, _)| vals.split(", ").collect::<Vec<_>>())
            .unwrap();
        assert_eq!(cols.len(), vals.len());

        let value_of = |col: &str| vals[cols.iter().position(|c| *c == col).unwrap()];
        assert_eq!(value_of("is_active"), "TRUE");
        assert_eq!(value_of("is_verified"), "FALSE");
        assert_eq!(value_of("hashed_password"), "$3");
        assert!(sql.contains("RETURNING id, email"));
    }
}
