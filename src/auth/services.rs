use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, warn};

use super::dto::{SignupRequest, TokenPair};
use super::jwt::JwtKeys;
use super::password::{hash_password, verify_against_dummy, verify_password};
use super::repo_types::{NewUser, Role, User};
use crate::errors::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;
const INVALID_CREDENTIALS: &str = "Incorrect email or password";
const INVALID_REFRESH: &str = "Invalid or expired refresh token";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,50}$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn check_password_strength(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Normalizes a signup payload in place and rejects malformed input.
pub fn validate_signup(req: &mut SignupRequest) -> AppResult<()> {
    req.email = normalize_email(&req.email);
    req.username = req.username.trim().to_string();
    req.full_name = non_blank(req.full_name.take());
    req.bio = non_blank(req.bio.take());

    if !is_valid_email(&req.email) {
        return Err(AppError::validation("Invalid email"));
    }
    if !USERNAME_RE.is_match(&req.username) {
        return Err(AppError::validation(
            "Username must be 3-50 characters of letters, digits, '_', '.' or '-'",
        ));
    }
    check_password_strength(&req.password)?;
    if req.role == Role::Admin {
        return Err(AppError::validation("Role must be 'candidate' or 'recruiter'"));
    }
    Ok(())
}

/// Row to insert for a validated signup. Only the argon2 digest is kept.
pub fn new_user(req: SignupRequest) -> AppResult<NewUser> {
    Ok(NewUser {
        hashed_password: hash_password(&req.password)?,
        email: req.email,
        username: req.username,
        full_name: req.full_name,
        bio: req.bio,
        role: req.role,
    })
}

/// Error for a signup whose email or username is already held by `existing`.
pub fn signup_conflict(existing: &User, email: &str) -> AppError {
    if existing.email == email {
        AppError::validation("Email already registered")
    } else {
        AppError::validation("Username already taken")
    }
}

/// Login decision: digest must verify and the account must be active.
/// Unknown email and wrong password are indistinguishable to the caller.
pub fn authenticate(user: Option<User>, password: &str) -> AppResult<User> {
    let Some(user) = user else {
        verify_against_dummy(password);
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };

    let ok = verify_password(password, &user.hashed_password).map_err(|e| {
        error!(user_id = user.id, error = %e, "stored password digest unreadable");
        AppError::Internal(e)
    })?;
    if !ok {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    if !user.is_active {
        warn!(user_id = user.id, "login on inactive account");
        return Err(AppError::forbidden("Account is inactive. Please contact support."));
    }
    Ok(user)
}

pub fn issue_token_pair(keys: &JwtKeys, user: &User) -> AppResult<TokenPair> {
    Ok(TokenPair {
        access_token: keys.issue_access_token(user.id, user.role)?,
        refresh_token: keys.issue_refresh_token(user.id)?,
        token_type: "bearer",
    })
}

/// User id behind a refresh token. Every failure reads the same.
pub fn refresh_subject(keys: &JwtKeys, token: &str) -> AppResult<i64> {
    keys.decode_refresh(token)
        .ok()
        .and_then(|c| c.user_id())
        .ok_or_else(|| AppError::unauthorized(INVALID_REFRESH))
}

/// The refresh-token owner must still exist and be active.
pub fn admit_refresh(user: Option<User>) -> AppResult<User> {
    match user {
        Some(u) if u.is_active => Ok(u),
        _ => Err(AppError::unauthorized(INVALID_REFRESH)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use time::OffsetDateTime;

    pub(crate) fn sample_user(id: i64, password: &str, is_active: bool) -> User {
        User {
            id,
            email: format!("user{id}@example.com"),
            username: format!("user{id}"),
            hashed_password: hash_password(password).unwrap(),
            full_name: None,
            role: Role::Candidate,
            is_active,
            is_verified: false,
            profile_image: None,
            bio: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            last_login: None,
        }
    }

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "s".into(),
            issuer: "i".into(),
            audience: "a".into(),
            access_ttl_minutes: 30,
            refresh_ttl_days: 7,
        })
    }

    fn signup(email: &str, username: &str, password: &str, role: Role) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            full_name: Some("  ".into()),
            bio: None,
            role,
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("no-at.example.com"));
        assert!(!is_valid_email("sp ace@x.io"));
    }

    #[test]
    fn signup_normalizes_and_accepts() {
        let mut req = signup("  Jane@Example.COM ", " jane_doe ", "longenough", Role::Recruiter);
        validate_signup(&mut req).unwrap();
        assert_eq!(req.email, "jane@example.com");
        assert_eq!(req.username, "jane_doe");
        assert_eq!(req.full_name, None);
    }

    #[test]
    fn signup_rejects_short_password_boundary() {
        let mut seven = signup("a@b.co", "abc", "1234567", Role::Candidate);
        assert!(matches!(validate_signup(&mut seven), Err(AppError::Validation(_))));
        let mut eight = signup("a@b.co", "abc", "12345678", Role::Candidate);
        assert!(validate_signup(&mut eight).is_ok());
    }

    #[test]
    fn new_user_keeps_only_the_digest() {
        let mut req = signup("a@b.co", "abc", "plain-secret", Role::Recruiter);
        validate_signup(&mut req).unwrap();
        let row = new_user(req).unwrap();

        assert_ne!(row.hashed_password, "plain-secret");
        assert!(!row.hashed_password.contains("plain-secret"));
        assert!(verify_password("plain-secret", &row.hashed_password).unwrap());
        assert_eq!(row.role, Role::Recruiter);
        assert_eq!(row.email, "a@b.co");
    }

    #[test]
    fn signup_rejects_admin_and_bad_usernames() {
        let mut admin = signup("a@b.co", "abc", "12345678", Role::Admin);
        assert!(validate_signup(&mut admin).is_err());
        let mut short = signup("a@b.co", "ab", "12345678", Role::Candidate);
        assert!(validate_signup(&mut short).is_err());
        let mut slashy = signup("a@b.co", "a/b/c", "12345678", Role::Candidate);
        assert!(validate_signup(&mut slashy).is_err());
    }

    #[test]
    fn conflict_message_names_the_taken_field() {
        let existing = sample_user(1, "whatever1", true);
        let by_email = signup_conflict(&existing, "user1@example.com");
        assert!(by_email.to_string().contains("Email already registered"));
        let by_name = signup_conflict(&existing, "other@example.com");
        assert!(by_name.to_string().contains("Username already taken"));
        assert_eq!(by_name.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn login_succeeds_with_right_password_on_active_account() {
        let user = sample_user(1, "right-password", true);
        assert_eq!(authenticate(Some(user), "right-password").unwrap().id, 1);
    }

    #[test]
    fn login_wrong_password_and_unknown_email_look_the_same() {
        let user = sample_user(1, "right-password", true);
        let wrong = authenticate(Some(user), "wrong-password").unwrap_err();
        let unknown = authenticate(None, "wrong-password").unwrap_err();
        assert!(matches!(wrong, AppError::Unauthorized(_)));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn login_on_inactive_account_is_forbidden() {
        let user = sample_user(1, "right-password", false);
        let err = authenticate(Some(user), "right-password").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn inactive_account_with_wrong_password_is_still_unauthorized() {
        let user = sample_user(1, "right-password", false);
        let err = authenticate(Some(user), "nope-nope").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn token_pair_is_bearer_and_typed() {
        let keys = keys();
        let user = sample_user(9, "pw-pw-pw-pw", true);
        let pair = issue_token_pair(&keys, &user).unwrap();
        assert_eq!(pair.token_type, "bearer");
        assert!(keys.decode_access(&pair.access_token).is_ok());
        assert_eq!(refresh_subject(&keys, &pair.refresh_token).unwrap(), 9);
    }

    #[test]
    fn refresh_rejects_access_tokens_and_garbage_alike() {
        let keys = keys();
        let user = sample_user(9, "pw-pw-pw-pw", true);
        let access = keys.issue_access_token(user.id, user.role).unwrap();
        let a = refresh_subject(&keys, &access).unwrap_err().to_string();
        let b = refresh_subject(&keys, "garbage").unwrap_err().to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn refresh_requires_existing_active_user() {
        assert!(admit_refresh(None).is_err());
        assert!(admit_refresh(Some(sample_user(1, "pw-pw-pw-pw", false))).is_err());
        assert!(admit_refresh(Some(sample_user(1, "pw-pw-pw-pw", true))).is_ok());
    }
}
