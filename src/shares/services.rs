use time::OffsetDateTime;

use super::dto::{CreateShareRequest, UpdateShareRequest};
use crate::auth::services::{is_valid_email, normalize_email};
use crate::errors::{AppError, AppResult};

fn future(expires_at: Option<OffsetDateTime>, now: OffsetDateTime) -> AppResult<()> {
    match expires_at {
        Some(at) if at <= now => Err(AppError::validation("Expiry must be in the future")),
        _ => Ok(()),
    }
}

pub fn validate_create(req: &mut CreateShareRequest, now: OffsetDateTime) -> AppResult<()> {
    req.shared_with_email = normalize_email(&req.shared_with_email);
    if !is_valid_email(&req.shared_with_email) {
        return Err(AppError::validation("Invalid email"));
    }
    future(req.expires_at, now)
}

pub fn validate_update(req: &UpdateShareRequest, now: OffsetDateTime) -> AppResult<()> {
    future(req.expires_at, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn create(email: &str, expires_at: Option<OffsetDateTime>) -> CreateShareRequest {
        CreateShareRequest {
            portfolio_id: 1,
            shared_with_email: email.into(),
            message: None,
            expires_at,
        }
    }

    #[test]
    fn create_normalizes_email_and_checks_expiry() {
        let now = OffsetDateTime::now_utc();
        let mut ok = create(" HR@Corp.io ", Some(now + Duration::days(1)));
        validate_create(&mut ok, now).unwrap();
        assert_eq!(ok.shared_with_email, "hr@corp.io");

        assert!(validate_create(&mut create("nope", None), now).is_err());
        assert!(validate_create(&mut create("a@b.co", Some(now)), now).is_err());
        assert!(validate_create(&mut create("a@b.co", Some(now - Duration::hours(1))), now).is_err());
    }

    #[test]
    fn update_rejects_past_expiry() {
        let now = OffsetDateTime::now_utc();
        let req = UpdateShareRequest {
            expires_at: Some(now - Duration::days(1)),
            ..Default::default()
        };
        assert!(validate_update(&req, now).is_err());
        assert!(validate_update(&UpdateShareRequest::default(), now).is_ok());
    }
}
