use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use super::jwt::JwtKeys;
use super::repo_types::{Role, User};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

const BAD_CREDENTIALS: &str = "Could not validate credentials";

/// What the request carries in its Authorization header.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Credential<'a> {
    Absent,
    Bearer(&'a str),
    Malformed,
}

pub(crate) fn credential(headers: &HeaderMap) -> Credential<'_> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Credential::Absent;
    };
    let Ok(value) = value.to_str() else {
        return Credential::Malformed;
    };
    match value.trim().split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Credential::Bearer(token.trim())
        }
        _ => Credential::Malformed,
    }
}

/// Decodes an access token down to the subject id and the role it was issued for.
pub(crate) fn access_subject(keys: &JwtKeys, token: &str) -> AppResult<(i64, Option<Role>)> {
    let claims = keys.decode_access(token).map_err(|e| {
        debug!(error = %e, "access token rejected");
        AppError::unauthorized(BAD_CREDENTIALS)
    })?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::unauthorized(BAD_CREDENTIALS))?;
    Ok((user_id, claims.role))
}

/// Identity resolution: the subject must exist, be active and still hold the role in the token.
pub(crate) fn admit(user: Option<User>, token_role: Option<Role>) -> AppResult<User> {
    let user = user.ok_or_else(|| AppError::not_found("User not found"))?;
    if !user.is_active {
        return Err(AppError::forbidden("Inactive user"));
    }
    if let Some(role) = token_role {
        if role != user.role {
            warn!(user_id = user.id, token_role = ?role, role = ?user.role, "role changed since token issue");
            return Err(AppError::unauthorized(BAD_CREDENTIALS));
        }
    }
    Ok(user)
}

/// Capability check shared by every role-gated route.
pub fn require_role(user: &User, allowed: &[Role]) -> AppResult<()> {
    if allowed.contains(&user.role) {
        return Ok(());
    }
    debug!(user_id = user.id, role = ?user.role, ?allowed, "role gate refused");
    Err(AppError::forbidden(format!(
        "This resource requires one of the roles: {}",
        allowed
            .iter()
            .map(|r| format!("{r:?}").to_lowercase())
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

async fn resolve(state: &AppState, token: &str) -> AppResult<User> {
    let (user_id, role) = access_subject(&state.keys, token)?;
    let user = User::find_by_id(&state.db, user_id).await?;
    admit(user, role)
}

/// Authenticated, active caller. Re-resolved from the database on every request.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match credential(&parts.headers) {
            Credential::Absent => Err(AppError::unauthorized("Not authenticated")),
            Credential::Malformed => Err(AppError::unauthorized("Invalid Authorization header")),
            Credential::Bearer(token) => resolve(state, token).await.map(CurrentUser),
        }
    }
}

/// Caller if a valid access token was presented, anonymous otherwise.
pub struct OptionalUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Credential::Bearer(token) = credential(&parts.headers) else {
            return Ok(OptionalUser(None));
        };
        match resolve(state, token).await {
            Ok(user) => Ok(OptionalUser(Some(user))),
            Err(AppError::Database(e)) => Err(AppError::Database(e)),
            Err(e) => {
                debug!(error = %e, "optional auth fell back to anonymous");
                Ok(OptionalUser(None))
            }
        }
    }
}
