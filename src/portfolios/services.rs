use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{CreatePortfolioRequest, CreateSkillRequest, UpdatePortfolioRequest};
use super::repo_types::{Portfolio, Visibility};
use crate::auth::{Role, User};
use crate::errors::{AppError, AppResult};

const SLUG_MIN: usize = 3;
const SLUG_MAX: usize = 100;
const PORTFOLIO_NOT_FOUND: &str = "Portfolio not found";

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap();
}

pub fn validate_slug(slug: &str) -> AppResult<()> {
    if !(SLUG_MIN..=SLUG_MAX).contains(&slug.len()) || !SLUG_RE.is_match(slug) {
        return Err(AppError::validation(format!(
            "Slug must be {SLUG_MIN}-{SLUG_MAX} lowercase letters, digits or single hyphens"
        )));
    }
    Ok(())
}

fn require_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::validation("Title must not be empty"));
    }
    Ok(())
}

pub fn validate_create(req: &mut CreatePortfolioRequest) -> AppResult<()> {
    req.slug = req.slug.trim().to_string();
    require_title(&req.title)?;
    validate_slug(&req.slug)
}

pub fn validate_update(req: &mut UpdatePortfolioRequest) -> AppResult<()> {
    if let Some(slug) = req.slug.as_mut() {
        *slug = slug.trim().to_string();
        validate_slug(slug)?;
    }
    if let Some(title) = &req.title {
        require_title(title)?;
    }
    Ok(())
}

pub fn validate_skill(req: &CreateSkillRequest) -> AppResult<()> {
    require_title(&req.name)?;
    if let Some(p) = req.proficiency {
        if !(1..=100).contains(&p) {
            return Err(AppError::validation("Proficiency must be between 1 and 100"));
        }
    }
    Ok(())
}

fn is_admin(user: Option<&User>) -> bool {
    user.is_some_and(|u| u.role == Role::Admin)
}

fn owns(user: Option<&User>, p: &Portfolio) -> bool {
    user.is_some_and(|u| u.id == p.user_id)
}

/// Read access by slug. Private portfolios look missing to everyone but the owner and admins.
pub fn can_view(viewer: Option<&User>, p: &Portfolio) -> bool {
    match p.visibility {
        Visibility::Public | Visibility::Unlisted => true,
        Visibility::Private => owns(viewer, p) || is_admin(viewer),
    }
}

pub fn ensure_viewable(viewer: Option<&User>, p: Option<Portfolio>) -> AppResult<Portfolio> {
    p.filter(|p| can_view(viewer, p))
        .ok_or_else(|| AppError::not_found(PORTFOLIO_NOT_FOUND))
}

/// Write access: owner only. Others learn nothing about existence unless they could read it.
pub fn ensure_owner(user: &User, p: Option<Portfolio>) -> AppResult<Portfolio> {
    let p = p.ok_or_else(|| AppError::not_found(PORTFOLIO_NOT_FOUND))?;
    if p.user_id == user.id {
        return Ok(p);
    }
    if can_view(Some(user), &p) {
        return Err(AppError::forbidden("You do not own this portfolio"));
    }
    Err(AppError::not_found(PORTFOLIO_NOT_FOUND))
}

/// Delete is also open to admins.
pub fn ensure_deletable(user: &User, p: Option<Portfolio>) -> AppResult<Portfolio> {
    match p {
        Some(p) if is_admin(Some(user)) => Ok(p),
        other => ensure_owner(user, other),
    }
}

/// True when an update moves the portfolio to public for the first time.
pub fn publishes(current: &Portfolio, next: Option<Visibility>) -> bool {
    next == Some(Visibility::Public) && current.published_at.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::tests::sample_user;
    use time::OffsetDateTime;

    fn portfolio(owner: i64, visibility: Visibility) -> Portfolio {
        Portfolio {
            id: 1,
            user_id: owner,
            title: "Work".into(),
            tagline: None,
            bio: None,
            profile_image: None,
            resume_url: None,
            visibility,
            slug: "my-work".into(),
            is_default: true,
            contact_email: None,
            location: None,
            website: None,
            linkedin: None,
            github: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            published_at: None,
        }
    }

    fn with_role(id: i64, role: Role) -> User {
        User {
            role,
            ..sample_user(id, "pw-pw-pw-pw", true)
        }
    }

    #[test]
    fn slugs() {
        assert!(validate_slug("jane-doe-2025").is_ok());
        assert!(validate_slug("abc").is_ok());
        assert!(validate_slug("ab").is_err());
        assert!(validate_slug("Jane").is_err());
        assert!(validate_slug("a--b").is_err());
        assert!(validate_slug("-abc").is_err());
        assert!(validate_slug("abc-").is_err());
        assert!(validate_slug(&"a".repeat(100)).is_ok());
        assert!(validate_slug(&"a".repeat(101)).is_err());
    }

    #[test]
    fn private_portfolio_is_hidden_from_strangers() {
        let owner = with_role(1, Role::Candidate);
        let stranger = with_role(2, Role::Recruiter);
        let admin = with_role(3, Role::Admin);
        let p = portfolio(1, Visibility::Private);

        assert!(can_view(Some(&owner), &p));
        assert!(can_view(Some(&admin), &p));
        assert!(!can_view(Some(&stranger), &p));
        assert!(!can_view(None, &p));
        assert!(matches!(
            ensure_viewable(None, Some(p.clone())),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(ensure_owner(&stranger, Some(p)), Err(AppError::NotFound(_))));
    }

    #[test]
    fn public_and_unlisted_are_readable_but_not_writable() {
        let stranger = with_role(2, Role::Candidate);
        for v in [Visibility::Public, Visibility::Unlisted] {
            let p = portfolio(1, v);
            assert!(can_view(None, &p));
            assert!(matches!(ensure_owner(&stranger, Some(p)), Err(AppError::Forbidden(_))));
        }
    }

    #[test]
    fn admin_may_delete_but_not_edit() {
        let admin = with_role(3, Role::Admin);
        let p = portfolio(1, Visibility::Private);
        assert!(ensure_deletable(&admin, Some(p.clone())).is_ok());
        assert!(ensure_owner(&admin, Some(p)).is_err());
        assert!(matches!(ensure_deletable(&admin, None), Err(AppError::NotFound(_))));
    }

    #[test]
    fn publish_happens_once() {
        let mut p = portfolio(1, Visibility::Private);
        assert!(publishes(&p, Some(Visibility::Public)));
        assert!(!publishes(&p, Some(Visibility::Unlisted)));
        assert!(!publishes(&p, None));
        p.published_at = Some(OffsetDateTime::now_utc());
        assert!(!publishes(&p, Some(Visibility::Public)));
    }

    #[test]
    fn skill_proficiency_bounds() {
        let skill = |p| CreateSkillRequest {
            name: "Rust".into(),
            category: None,
            proficiency: p,
            years_experience: None,
            is_highlighted: false,
            order_index: 0,
        };
        assert!(validate_skill(&skill(Some(1))).is_ok());
        assert!(validate_skill(&skill(Some(100))).is_ok());
        assert!(validate_skill(&skill(None)).is_ok());
        assert!(validate_skill(&skill(Some(0))).is_err());
        assert!(validate_skill(&skill(Some(101))).is_err());
    }
}
