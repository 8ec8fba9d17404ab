use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{
    CreateExperienceRequest, CreatePortfolioRequest, CreateProjectRequest, CreateSkillRequest,
    DeletedResponse, PortfolioDetails, PortfolioListItem, UpdatePortfolioRequest,
};
use super::repo::{delete_child, load_details, ChildKind};
use super::repo_types::{Experience, Portfolio, Project, Skill, Visibility};
use super::services::{
    ensure_deletable, ensure_owner, ensure_viewable, publishes, validate_create, validate_skill,
    validate_update,
};
use crate::{
    auth::{require_role, CurrentUser, OptionalUser, Role, User},
    errors::{AppError, AppResult},
    state::AppState,
};

const SLUG_TAKEN: &str = "Slug already in use";

pub fn portfolio_routes() -> Router<AppState> {
    Router::new()
        .route("/portfolios", post(create_portfolio).get(list_portfolios))
        // GET addresses a portfolio by slug, writes by numeric id.
        .route(
            "/portfolios/:id",
            get(get_portfolio)
                .patch(update_portfolio)
                .delete(delete_portfolio),
        )
        .route("/portfolios/:id/projects", post(add_project))
        .route("/portfolios/:id/skills", post(add_skill))
        .route("/portfolios/:id/experiences", post(add_experience))
        .route("/portfolios/:id/projects/:child_id", delete(remove_project))
        .route("/portfolios/:id/skills/:child_id", delete(remove_skill))
        .route("/portfolios/:id/experiences/:child_id", delete(remove_experience))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_portfolio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(mut payload): Json<CreatePortfolioRequest>,
) -> AppResult<(StatusCode, Json<PortfolioDetails>)> {
    require_role(&user, &[Role::Candidate, Role::Admin])?;
    validate_create(&mut payload)?;

    if Portfolio::slug_taken(&state.db, &payload.slug, None).await? {
        return Err(AppError::validation(SLUG_TAKEN));
    }
    let published = payload.visibility == Visibility::Public;
    let portfolio = Portfolio::create(&state.db, user.id, &payload, published).await?;

    info!(portfolio_id = portfolio.id, slug = %portfolio.slug, "portfolio created");
    Ok((StatusCode::CREATED, Json(load_details(&state.db, portfolio).await?)))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn list_portfolios(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<PortfolioListItem>>> {
    let items = Portfolio::list_by_user(&state.db, user.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state, viewer))]
pub async fn get_portfolio(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Path(slug): Path<String>,
) -> AppResult<Json<PortfolioDetails>> {
    let found = Portfolio::find_by_slug(&state.db, &slug).await?;
    let portfolio = ensure_viewable(viewer.as_ref(), found)?;
    Ok(Json(load_details(&state.db, portfolio).await?))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_portfolio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdatePortfolioRequest>,
) -> AppResult<Json<PortfolioDetails>> {
    validate_update(&mut payload)?;
    let current = ensure_owner(&user, Portfolio::find_by_id(&state.db, id).await?)?;

    if let Some(slug) = &payload.slug {
        if Portfolio::slug_taken(&state.db, slug, Some(id)).await? {
            return Err(AppError::validation(SLUG_TAKEN));
        }
    }

    let publish = publishes(&current, payload.visibility);
    let updated = Portfolio::update(&state.db, id, &payload, publish).await?;
    if publish {
        info!(portfolio_id = id, "portfolio published");
    }
    Ok(Json(load_details(&state.db, updated).await?))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_portfolio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DeletedResponse>> {
    let portfolio = ensure_deletable(&user, Portfolio::find_by_id(&state.db, id).await?)?;
    let deleted = Portfolio::delete(&state.db, portfolio.id).await?;
    if portfolio.user_id != user.id {
        warn!(portfolio_id = id, owner_id = portfolio.user_id, "portfolio deleted by admin");
    }
    Ok(Json(DeletedResponse { id, deleted }))
}

async fn owned(state: &AppState, user: &User, id: i64) -> AppResult<Portfolio> {
    ensure_owner(user, Portfolio::find_by_id(&state.db, id).await?)
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn add_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    owned(&state, &user, id).await?;
    if payload.title.trim().is_empty() {
        return Err(AppError::validation("Title must not be empty"));
    }
    let project = Project::create(&state.db, id, &payload).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn add_skill(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CreateSkillRequest>,
) -> AppResult<(StatusCode, Json<Skill>)> {
    validate_skill(&payload)?;
    owned(&state, &user, id).await?;
    let skill = Skill::create(&state.db, id, &payload).await?;
    Ok((StatusCode::CREATED, Json(skill)))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn add_experience(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CreateExperienceRequest>,
) -> AppResult<(StatusCode, Json<Experience>)> {
    owned(&state, &user, id).await?;
    if payload.title.trim().is_empty() || payload.company.trim().is_empty() {
        return Err(AppError::validation("Title and company must not be empty"));
    }
    let experience = Experience::create(&state.db, id, &payload).await?;
    Ok((StatusCode::CREATED, Json(experience)))
}

async fn remove(
    state: &AppState,
    user: &User,
    kind: ChildKind,
    id: i64,
    child_id: i64,
) -> AppResult<Json<DeletedResponse>> {
    owned(state, user, id).await?;
    if !delete_child(&state.db, kind, id, child_id).await? {
        return Err(AppError::not_found(format!("{kind:?} not found")));
    }
    Ok(Json(DeletedResponse {
        id: child_id,
        deleted: true,
    }))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn remove_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, child_id)): Path<(i64, i64)>,
) -> AppResult<Json<DeletedResponse>> {
    remove(&state, &user, ChildKind::Project, id, child_id).await
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn remove_skill(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, child_id)): Path<(i64, i64)>,
) -> AppResult<Json<DeletedResponse>> {
    remove(&state, &user, ChildKind::Skill, id, child_id).await
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn remove_experience(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, child_id)): Path<(i64, i64)>,
) -> AppResult<Json<DeletedResponse>> {
    remove(&state, &user, ChildKind::Experience, id, child_id).await
}
