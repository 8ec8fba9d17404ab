use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Role, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

/// Full user record as seen by its owner. Never carries the password digest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub profile_image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            full_name: u.full_name,
            bio: u.bio,
            role: u.role,
            is_active: u.is_active,
            is_verified: u.is_verified,
            profile_image: u.profile_image,
            created_at: u.created_at,
            last_login: u.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_role_defaults_to_candidate() {
        let req: SignupRequest = serde_json::from_str(
            r#"{"email":"a@b.co","username":"abc","password":"12345678"}"#,
        )
        .unwrap();
        assert_eq!(req.role, Role::Candidate);
        assert_eq!(Role::default(), Role::Candidate);

        let req: SignupRequest = serde_json::from_str(
            r#"{"email":"a@b.co","username":"abc","password":"12345678","role":"recruiter"}"#,
        )
        .unwrap();
        assert_eq!(req.role, Role::Recruiter);
    }
}
