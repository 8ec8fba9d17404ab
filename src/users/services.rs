use tracing::warn;

use super::dto::UpdateProfileRequest;
use crate::auth::password::verify_password;
use crate::auth::services::check_password_strength;
use crate::auth::User;
use crate::errors::{AppError, AppResult};

const MAX_FULL_NAME_LEN: usize = 255;
const MAX_BIO_LEN: usize = 2000;
const MAX_IMAGE_URL_LEN: usize = 500;

fn within(field: &str, value: Option<&str>, max: usize) -> AppResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

/// Trims every provided field; empty strings are kept (they clear the value).
pub fn validate_profile_update(req: &mut UpdateProfileRequest) -> AppResult<()> {
    for v in [&mut req.full_name, &mut req.bio, &mut req.profile_image]
        .into_iter()
        .flatten()
    {
        *v = v.trim().to_string();
    }
    within("full_name", req.full_name.as_deref(), MAX_FULL_NAME_LEN)?;
    within("bio", req.bio.as_deref(), MAX_BIO_LEN)?;
    within("profile_image", req.profile_image.as_deref(), MAX_IMAGE_URL_LEN)?;
    Ok(())
}

/// Current password must verify and the new one must meet the length rule.
pub fn check_password_change(user: &User, current: &str, new: &str) -> AppResult<()> {
    let ok = verify_password(current, &user.hashed_password).map_err(AppError::Internal)?;
    if !ok {
        warn!(user_id = user.id, "password change with wrong current password");
        return Err(AppError::validation("Current password is incorrect"));
    }
    check_password_strength(new)
}

/// An admin may toggle anyone except themselves off.
pub fn check_status_change(admin: &User, target_id: i64, is_active: bool) -> AppResult<()> {
    if admin.id == target_id && !is_active {
        return Err(AppError::validation("You cannot deactivate your own account"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::tests::sample_user;

    #[test]
    fn profile_fields_are_trimmed_and_bounded() {
        let mut req = UpdateProfileRequest {
            full_name: Some("  Jane Doe ".into()),
            bio: None,
            profile_image: Some(String::new()),
        };
        validate_profile_update(&mut req).unwrap();
        assert_eq!(req.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(req.profile_image.as_deref(), Some(""));

        let mut long = UpdateProfileRequest {
            bio: Some("x".repeat(MAX_BIO_LEN + 1)),
            ..Default::default()
        };
        assert!(matches!(validate_profile_update(&mut long), Err(AppError::Validation(_))));
    }

    #[test]
    fn password_change_needs_current_password() {
        let user = sample_user(1, "old-password", true);
        assert!(check_password_change(&user, "old-password", "new-password").is_ok());
        assert!(matches!(
            check_password_change(&user, "wrong-password", "new-password"),
            Err(AppError::Validation(_))
        ));
        assert!(check_password_change(&user, "old-password", "short").is_err());
    }

    #[test]
    fn admin_cannot_disable_self() {
        let admin = sample_user(9, "pw-pw-pw-pw", true);
        assert!(check_status_change(&admin, 9, false).is_err());
        assert!(check_status_change(&admin, 9, true).is_ok());
        assert!(check_status_change(&admin, 3, false).is_ok());
    }
}
