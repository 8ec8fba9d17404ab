use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::CurrentUser,
    errors::{AppError, AppResult},
    state::AppState,
};

use super::dto::{LinkedInUploadRequest, LinkedInUploadResponse, ListQuery, ListUploadsResponse, UploadResponse};
use super::services::{
    list_uploads, store_batch, store_linkedin, store_resume, CategoryFilter, IncomingFile,
};
use super::validator::UploadError;

const RESUME_BODY_LIMIT: usize = 12 * 1024 * 1024;
const BATCH_BODY_LIMIT: usize = 110 * 1024 * 1024;

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/upload/resume",
            post(upload_resume).layer(DefaultBodyLimit::max(RESUME_BODY_LIMIT)),
        )
        .route(
            "/upload/documents",
            post(upload_documents).layer(DefaultBodyLimit::max(BATCH_BODY_LIMIT)),
        )
        .route("/upload/linkedin", post(upload_linkedin))
        .route("/upload/list", get(list_user_uploads))
}

/// Drains the multipart body, keeping parts whose field name is in `names`.
async fn collect_files(mp: &mut Multipart, names: &[&str]) -> AppResult<Vec<IncomingFile>> {
    let mut files = Vec::new();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {e}")))?
    {
        if !field.name().is_some_and(|n| names.contains(&n)) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Failed to read upload: {e}")))?;
        files.push(IncomingFile {
            file_name,
            content_type,
            body,
        });
    }
    Ok(files)
}

/// POST /upload/resume (multipart field `file`)
#[instrument(skip(state, user, mp), fields(user_id = user.0.id))]
pub async fn upload_resume(
    State(state): State<AppState>,
    user: CurrentUser,
    mut mp: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let file = collect_files(&mut mp, &["file"])
        .await?
        .into_iter()
        .next()
        .ok_or(UploadError::NoFile)?;

    let res = store_resume(state.storage.as_ref(), user.0.id, file, OffsetDateTime::now_utc()).await?;
    Ok(Json(res))
}

/// POST /upload/documents (multipart field `files` / `files[]`)
#[instrument(skip(state, user, mp), fields(user_id = user.0.id))]
pub async fn upload_documents(
    State(state): State<AppState>,
    user: CurrentUser,
    mut mp: Multipart,
) -> AppResult<Json<Vec<UploadResponse>>> {
    let files = collect_files(&mut mp, &["files", "files[]"]).await?;
    let count = files.len();

    let results = store_batch(state.storage.as_ref(), user.0.id, files, OffsetDateTime::now_utc()).await?;
    info!(
        received = count,
        stored = results.iter().filter(|r| r.success).count(),
        "batch upload finished"
    );
    Ok(Json(results))
}

#[instrument(skip(state, user, payload), fields(user_id = user.0.id))]
pub async fn upload_linkedin(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<LinkedInUploadRequest>,
) -> AppResult<Json<LinkedInUploadResponse>> {
    let res = store_linkedin(state.storage.as_ref(), user.0.id, payload, OffsetDateTime::now_utc()).await?;
    Ok(Json(res))
}

#[instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn list_user_uploads(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<ListUploadsResponse>> {
    let filter = CategoryFilter::from_query(q.category.as_deref());
    let res = list_uploads(state.storage.as_ref(), user.0.id, filter).await?;
    Ok(Json(res))
}
