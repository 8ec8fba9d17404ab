use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LogoutResponse, RefreshRequest, SignupRequest, TokenPair, UserResponse},
        extractors::CurrentUser,
        repo_types::User,
        services::{
            admit_refresh, authenticate, issue_token_pair, new_user, normalize_email,
            refresh_subject, signup_conflict, validate_signup,
        },
    },
    errors::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    validate_signup(&mut payload)?;

    if let Some(existing) =
        User::find_by_email_or_username(&state.db, &payload.email, &payload.username).await?
    {
        warn!(email = %payload.email, username = %payload.username, "signup identifier taken");
        return Err(signup_conflict(&existing, &payload.email));
    }

    let row = new_user(payload)?;

    // A concurrent signup can still win between the check and the insert.
    let user = User::create(&state.db, &row).await.map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            AppError::Conflict("Email or username already registered".into())
        } else {
            AppError::Database(e)
        }
    })?;

    info!(user_id = user.id, email = %user.email, role = ?user.role, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let email = normalize_email(&payload.email);
    let user = User::find_by_email(&state.db, &email).await?;
    let user = authenticate(user, &payload.password)?;

    let user = User::touch_last_login(&state.db, user.id).await?;
    let pair = issue_token_pair(&state.keys, &user)?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(Json(pair))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    let user_id = refresh_subject(&state.keys, &payload.refresh_token)?;
    let user = admit_refresh(User::find_by_id(&state.db, user_id).await?)?;

    let pair = issue_token_pair(&state.keys, &user)?;
    info!(user_id = user.id, "tokens refreshed");
    Ok(Json(pair))
}

#[instrument(skip_all)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

/// Tokens are stateless; the client discards them. This only records the event.
#[instrument(skip_all)]
pub async fn logout(CurrentUser(user): CurrentUser) -> Json<LogoutResponse> {
    info!(user_id = user.id, "user logged out");
    Json(LogoutResponse {
        message: "Successfully logged out",
        username: user.username,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::tests::sample_user;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[test]
    fn user_response_never_carries_the_digest() {
        let user = sample_user(3, "pw-pw-pw-pw", true);
        let digest = user.hashed_password.clone();
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains(&digest));
        assert!(!json.contains("hashed_password"));
        assert!(json.contains("\"is_verified\":false"));
    }

    #[tokio::test]
    async fn me_without_token_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let app = auth_routes().with_state(AppState::fake(dir.path()));

        let res = app
            .oneshot(Request::get("/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_with_refresh_token_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::fake(dir.path());
        let token = state.keys.issue_refresh_token(1).unwrap();
        let app = auth_routes().with_state(state);

        let res = app
            .oneshot(
                Request::post("/auth/logout")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_with_access_token_is_unauthorized_before_db() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::fake(dir.path());
        let token = state
            .keys
            .issue_access_token(1, crate::auth::repo_types::Role::Candidate)
            .unwrap();
        let app = auth_routes().with_state(state);

        let res = app
            .oneshot(
                Request::post("/auth/refresh")
                    .header("Content-Type", "application/json")
                    .body(Body::from(format!(r#"{{"refresh_token":"{token}"}}"#)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signup_with_short_password_is_rejected_before_db() {
        let dir = tempfile::tempdir().unwrap();
        let app = auth_routes().with_state(AppState::fake(dir.path()));

        let res = app
            .oneshot(
                Request::post("/auth/signup")
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        r#"{"email":"a@b.co","username":"abc","password":"short"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
