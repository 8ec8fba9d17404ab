use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::dto::{CreateShareRequest, ShareListQuery, UpdateShareRequest};
use super::repo_types::Share;
use super::services::{validate_create, validate_update};
use crate::{
    auth::CurrentUser,
    errors::{AppError, AppResult},
    portfolios::{
        dto::PortfolioDetails, repo::load_details, repo_types::Portfolio, services::ensure_owner,
    },
    state::AppState,
};

const SHARE_NOT_FOUND: &str = "Share not found";

pub fn share_routes() -> Router<AppState> {
    Router::new()
        .route("/shares", post(create_share).get(list_shares))
        .route("/shares/:id", patch(update_share))
        .route("/shares/link/:token", get(open_share_link))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_share(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(mut payload): Json<CreateShareRequest>,
) -> AppResult<(StatusCode, Json<Share>)> {
    validate_create(&mut payload, OffsetDateTime::now_utc())?;
    ensure_owner(&user, Portfolio::find_by_id(&state.db, payload.portfolio_id).await?)?;

    let share = Share::create(&state.db, user.id, Uuid::new_v4(), &payload).await?;
    info!(share_id = share.id, portfolio_id = share.portfolio_id, "portfolio shared");
    Ok((StatusCode::CREATED, Json(share)))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn list_shares(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<ShareListQuery>,
) -> AppResult<Json<Vec<Share>>> {
    ensure_owner(&user, Portfolio::find_by_id(&state.db, q.portfolio_id).await?)?;
    Ok(Json(Share::list_for_portfolio(&state.db, q.portfolio_id).await?))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_share(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateShareRequest>,
) -> AppResult<Json<Share>> {
    validate_update(&payload, OffsetDateTime::now_utc())?;
    let share = Share::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(SHARE_NOT_FOUND))?;
    let portfolio = Portfolio::find_by_id(&state.db, share.portfolio_id).await?;
    if portfolio.map_or(true, |p| p.user_id != user.id) {
        return Err(AppError::not_found(SHARE_NOT_FOUND));
    }

    let updated = Share::update(&state.db, id, &payload).await?;
    if payload.is_active == Some(false) {
        info!(share_id = id, "share revoked");
    }
    Ok(Json(updated))
}

/// Public entry point for a shared link. Visibility of the portfolio does not matter here.
#[instrument(skip(state, token))]
pub async fn open_share_link(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<PortfolioDetails>> {
    let token = Uuid::parse_str(&token).map_err(|_| AppError::not_found(SHARE_NOT_FOUND))?;
    let share = Share::record_view(&state.db, token)
        .await?
        .ok_or_else(|| AppError::not_found(SHARE_NOT_FOUND))?;
    debug!(share_id = share.id, views = share.view_count, "share link opened");

    let portfolio = Portfolio::find_by_id(&state.db, share.portfolio_id)
        .await?
        .ok_or_else(|| AppError::not_found(SHARE_NOT_FOUND))?;
    Ok(Json(load_details(&state.db, portfolio).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn malformed_link_token_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = share_routes().with_state(AppState::fake(dir.path()));
        let res = app
            .oneshot(Request::get("/shares/link/not-a-uuid").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_requires_a_token() {
        let dir = tempfile::tempdir().unwrap();
        let app = share_routes().with_state(AppState::fake(dir.path()));
        let res = app
            .oneshot(Request::get("/shares?portfolio_id=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
