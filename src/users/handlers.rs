use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{
    ChangePasswordRequest, MessageResponse, PublicProfile, UpdateProfileRequest, UpdateStatusRequest,
};
use super::services::{check_password_change, check_status_change, validate_profile_update};
use crate::{
    auth::{dto::UserResponse, password::hash_password, require_role, CurrentUser, Role, User},
    errors::{AppError, AppResult},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me).patch(update_me))
        .route("/users/me/password", post(change_password))
        .route("/users/:username", get(public_profile))
        .route("/admin/users/:id/status", patch(set_status))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(mut payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    validate_profile_update(&mut payload)?;
    let updated = User::update_profile(
        &state.db,
        user.id,
        payload.full_name.as_deref(),
        payload.bio.as_deref(),
        payload.profile_image.as_deref(),
    )
    .await?;
    info!("profile updated");
    Ok(Json(updated.into()))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    check_password_change(&user, &payload.current_password, &payload.new_password)?;
    let digest = hash_password(&payload.new_password)?;
    User::set_password(&state.db, user.id, &digest).await?;
    info!("password changed");
    Ok(Json(MessageResponse {
        message: "Password updated successfully",
    }))
}

#[instrument(skip(state))]
pub async fn public_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<PublicProfile>> {
    User::find_by_username(&state.db, &username)
        .await?
        .filter(|u| u.is_active)
        .map(|u| Json(u.into()))
        .ok_or_else(|| AppError::not_found("User not found"))
}

#[instrument(skip(state, admin, payload), fields(admin_id = admin.id))]
pub async fn set_status(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<UserResponse>> {
    require_role(&admin, &[Role::Admin])?;
    check_status_change(&admin, id, payload.is_active)?;

    let user = User::set_active(&state.db, id, payload.is_active)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(target_id = id, is_active = payload.is_active, "account status changed");
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn me_requires_a_token() {
        let dir = tempfile::tempdir().unwrap();
        let app = user_routes().with_state(AppState::fake(dir.path()));
        let res = app
            .oneshot(Request::get("/users/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_bearer_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let app = user_routes().with_state(AppState::fake(dir.path()));
        let res = app
            .oneshot(
                Request::patch("/admin/users/2/status")
                    .header("Authorization", "Bearer not-a-jwt")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"is_active":false}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
