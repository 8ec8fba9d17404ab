use bytes::Bytes;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{error, info, warn};

use super::dto::{LinkedInUploadRequest, LinkedInUploadResponse, ListUploadsResponse, ListedFile, UploadResponse};
use super::validator::{
    check_size, classify, object_key, sanitize_filename, timestamp, Category, FileKind, UploadError,
    MAX_BATCH_FILES,
};
use crate::storage::StorageClient;

const LINKEDIN_PROFILE_MARKER: &str = "linkedin.com/in/";

/// One file part as received from the client.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Validate-then-write for a single file. `accept` decides which allow-lists apply.
async fn store_one(
    storage: &dyn StorageClient,
    user_id: i64,
    file: IncomingFile,
    accept: &[FileKind],
    category_for: impl Fn(FileKind) -> Category,
    now: OffsetDateTime,
) -> Result<UploadResponse, UploadError> {
    let (kind, _ext) = classify(file.content_type.as_deref(), accept)?;
    check_size(file.body.len(), kind.max_size())?;
    let file_name = sanitize_filename(file.file_name.as_deref())?;
    let category = category_for(kind);

    let key = object_key(user_id, category, now, &file_name);
    let stored = storage
        .put_object(&key, file.body)
        .await
        .map_err(UploadError::Storage)?;

    info!(user_id, %category, key = %stored.key, size = stored.size, "file uploaded");
    Ok(UploadResponse {
        success: true,
        message: String::new(),
        file_path: stored.path,
        file_name,
        file_type: file.content_type.unwrap_or_default(),
        file_size: stored.size,
        category: category.to_string(),
    })
}

/// Single resume upload: any failure fails the whole request.
pub async fn store_resume(
    storage: &dyn StorageClient,
    user_id: i64,
    file: IncomingFile,
    now: OffsetDateTime,
) -> Result<UploadResponse, UploadError> {
    let mut res = store_one(storage, user_id, file, &[FileKind::Resume], |_| Category::Resumes, now).await?;
    res.message = "Resume uploaded successfully".into();
    Ok(res)
}

/// Batch upload: the count is checked up front, then every file gets its own
/// success or failure entry. Fails only when nothing could be stored.
pub async fn store_batch(
    storage: &dyn StorageClient,
    user_id: i64,
    files: Vec<IncomingFile>,
    now: OffsetDateTime,
) -> Result<Vec<UploadResponse>, UploadError> {
    if files.len() > MAX_BATCH_FILES {
        return Err(UploadError::TooManyFiles { max: MAX_BATCH_FILES });
    }
    if files.is_empty() {
        return Err(UploadError::NoFile);
    }

    let accept = [FileKind::Image, FileKind::Resume];
    let to_category = |kind| match kind {
        FileKind::Image => Category::Images,
        FileKind::Resume => Category::Documents,
    };

    let mut results = Vec::with_capacity(files.len());
    for file in files {
        let name = file.file_name.clone();
        let content_type = file.content_type.clone();
        match store_one(storage, user_id, file, &accept, to_category, now).await {
            Ok(mut res) => {
                res.message = "File uploaded successfully".into();
                results.push(res);
            }
            Err(e) => {
                match &e {
                    UploadError::Storage(inner) => error!(user_id, error = ?inner, "batch file write failed"),
                    other => warn!(user_id, file_name = ?name, error = %other, "batch file rejected"),
                }
                results.push(UploadResponse::failed(name, content_type, e.to_string()));
            }
        }
    }

    if !results.iter().any(|r| r.success) {
        return Err(UploadError::NoValidFiles);
    }
    Ok(results)
}

pub enum LinkedInInput {
    Url(String),
    Raw(String),
}

fn present(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// Exactly one of `profile_url` / `raw_data`; a URL must point at a profile.
pub fn linkedin_input(req: LinkedInUploadRequest) -> Result<LinkedInInput, UploadError> {
    match (present(req.profile_url), present(req.raw_data)) {
        (Some(_), Some(_)) => Err(UploadError::LinkedinInputAmbiguous),
        (None, None) => Err(UploadError::LinkedinInputMissing),
        (Some(url), None) if !url.contains(LINKEDIN_PROFILE_MARKER) => Err(UploadError::InvalidLinkedinUrl),
        (Some(url), None) => Ok(LinkedInInput::Url(url.trim().to_string())),
        (None, Some(raw)) => Ok(LinkedInInput::Raw(raw)),
    }
}

pub async fn store_linkedin(
    storage: &dyn StorageClient,
    user_id: i64,
    req: LinkedInUploadRequest,
    now: OffsetDateTime,
) -> Result<LinkedInUploadResponse, UploadError> {
    match linkedin_input(req)? {
        LinkedInInput::Url(url) => {
            info!(user_id, "linkedin profile url received");
            Ok(LinkedInUploadResponse {
                success: true,
                message: "LinkedIn profile URL received. Will be processed by AI.".into(),
                profile_url: Some(url),
                data_source: "url",
                stored_path: None,
            })
        }
        LinkedInInput::Raw(raw) => {
            let key = format!(
                "{user_id}/{}/linkedin_data_{}.json",
                Category::Linkedin,
                timestamp(now)
            );
            let stored = storage
                .put_object(&key, Bytes::from(raw))
                .await
                .map_err(UploadError::Storage)?;
            info!(user_id, key = %stored.key, size = stored.size, "linkedin raw data stored");
            Ok(LinkedInUploadResponse {
                success: true,
                message: "LinkedIn data received. Will be processed by AI.".into(),
                profile_url: None,
                data_source: "raw_data",
                stored_path: Some(stored.path),
            })
        }
    }
}

/// Category restriction for a listing. A name that is not a known category
/// matches nothing rather than failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(Category),
    Unknown,
}

impl CategoryFilter {
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|c| !c.is_empty()) {
            None => CategoryFilter::All,
            Some(name) => name
                .parse()
                .map(CategoryFilter::Only)
                .unwrap_or(CategoryFilter::Unknown),
        }
    }

    fn admits(self, found: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => c == found,
            CategoryFilter::Unknown => false,
        }
    }
}

/// Files directly inside the user's category directories.
pub async fn list_uploads(
    storage: &dyn StorageClient,
    user_id: i64,
    filter: CategoryFilter,
) -> Result<ListUploadsResponse, UploadError> {
    let Some(objects) = storage
        .list_objects(&user_id.to_string())
        .await
        .map_err(UploadError::Storage)?
    else {
        return Ok(ListUploadsResponse {
            files: Vec::new(),
            total: 0,
            user_id,
            message: Some("No uploads found"),
        });
    };

    let files: Vec<ListedFile> = objects
        .into_iter()
        .filter_map(|obj| {
            let mut parts = obj.key.splitn(3, '/');
            let (_, dir, name) = (parts.next()?, parts.next()?, parts.next()?);
            if name.contains('/') {
                return None;
            }
            let found: Category = dir.parse().ok()?;
            if !filter.admits(found) {
                return None;
            }
            Some(ListedFile {
                file_name: name.to_string(),
                category: found,
                file_size: obj.size,
                upload_date: obj.created_at.format(&Rfc3339).unwrap_or_default(),
                file_path: obj.path,
            })
        })
        .collect();

    Ok(ListUploadsResponse {
        total: files.len(),
        files,
        user_id,
        message: None,
    })
}
