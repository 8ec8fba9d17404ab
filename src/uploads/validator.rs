use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{macros::format_description, OffsetDateTime};

use crate::errors::AppError;

pub const MAX_RESUME_SIZE: usize = 10 * 1024 * 1024;
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;
pub const MAX_BATCH_FILES: usize = 10;

const RESUME_TYPES: &[(&str, &str)] = &[
    ("application/pdf", ".pdf"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    ("application/msword", ".doc"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
    ("application/vnd.ms-excel", ".xls"),
];

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/heic", ".heic"),
    ("image/heif", ".heif"),
];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid file type. Allowed types: {allowed}")]
    UnsupportedType { content_type: String, allowed: String },

    #[error("File too large. Maximum size: {}MB", .max_bytes / (1024 * 1024))]
    TooLarge { max_bytes: usize },

    #[error("Invalid file name")]
    InvalidFilename,

    #[error("No file provided")]
    NoFile,

    #[error("Maximum {max} files allowed per upload")]
    TooManyFiles { max: usize },

    #[error("No valid files were uploaded")]
    NoValidFiles,

    #[error("Invalid LinkedIn profile URL. Must contain 'linkedin.com/in/'")]
    InvalidLinkedinUrl,

    #[error("Either profile_url or raw_data must be provided")]
    LinkedinInputMissing,

    #[error("Provide either profile_url or raw_data, not both")]
    LinkedinInputAmbiguous,

    #[error("Unknown upload category '{0}'")]
    UnknownCategory(String),

    #[error("Failed to store file")]
    Storage(#[source] anyhow::Error),
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Storage(inner) => AppError::Internal(inner.context("failed to upload file")),
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// Storage bucket under a user's upload root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Resumes,
    Images,
    Documents,
    Linkedin,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Resumes => "resumes",
            Category::Images => "images",
            Category::Documents => "documents",
            Category::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resumes" => Ok(Category::Resumes),
            "images" => Ok(Category::Images),
            "documents" => Ok(Category::Documents),
            "linkedin" => Ok(Category::Linkedin),
            other => Err(UploadError::UnknownCategory(other.to_string())),
        }
    }
}

/// Which allow-list a declared MIME type matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Resume,
    Image,
}

impl FileKind {
    fn allowed(self) -> &'static [(&'static str, &'static str)] {
        match self {
            FileKind::Resume => RESUME_TYPES,
            FileKind::Image => IMAGE_TYPES,
        }
    }

    pub fn max_size(self) -> usize {
        match self {
            FileKind::Resume => MAX_RESUME_SIZE,
            FileKind::Image => MAX_IMAGE_SIZE,
        }
    }
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Matches a declared content type against the accepted allow-lists, in order.
/// Returns the matching kind and its canonical extension.
pub fn classify(
    content_type: Option<&str>,
    accept: &[FileKind],
) -> Result<(FileKind, &'static str), UploadError> {
    let declared = content_type.map(essence).unwrap_or_default();
    for &kind in accept {
        if let Some((_, ext)) = kind.allowed().iter().find(|(mime, _)| *mime == declared) {
            return Ok((kind, ext));
        }
    }
    let allowed = accept
        .iter()
        .flat_map(|k| k.allowed().iter().map(|(_, ext)| *ext))
        .collect::<Vec<_>>()
        .join(", ");
    Err(UploadError::UnsupportedType {
        content_type: declared,
        allowed,
    })
}

pub fn check_size(len: usize, limit: usize) -> Result<(), UploadError> {
    if len > limit {
        return Err(UploadError::TooLarge { max_bytes: limit });
    }
    Ok(())
}

/// Keeps only the final path component of a client-supplied name.
pub fn sanitize_filename(name: Option<&str>) -> Result<String, UploadError> {
    let base = name
        .map(|n| n.rsplit(['/', '\\']).next().unwrap_or_default().trim())
        .unwrap_or_default();
    let valid = !base.is_empty()
        && base != "."
        && base != ".."
        && Path::new(base).file_name().is_some()
        && !base.chars().any(char::is_control);
    if !valid {
        return Err(UploadError::InvalidFilename);
    }
    Ok(base.to_string())
}

/// `YYYYMMDD_HHMMSS` in UTC.
pub fn timestamp(at: OffsetDateTime) -> String {
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    at.format(&fmt).unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// `{user_id}/{category}/{timestamp}_{file_name}`
pub fn object_key(user_id: i64, category: Category, at: OffsetDateTime, file_name: &str) -> String {
    format!("{user_id}/{category}/{}_{file_name}", timestamp(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn resume_types_map_to_extensions() {
        assert_eq!(
            classify(Some("application/pdf"), &[FileKind::Resume]).unwrap(),
            (FileKind::Resume, ".pdf")
        );
        assert_eq!(
            classify(Some("application/msword"), &[FileKind::Resume]).unwrap().1,
            ".doc"
        );
        assert_eq!(
            classify(Some("Application/PDF; charset=binary"), &[FileKind::Resume]).unwrap().1,
            ".pdf"
        );
    }

    #[test]
    fn resume_endpoint_rejects_images_and_unknowns() {
        let err = classify(Some("image/png"), &[FileKind::Resume]).unwrap_err();
        assert!(err.to_string().contains(".pdf"));
        assert!(classify(Some("text/plain"), &[FileKind::Resume]).is_err());
        assert!(classify(None, &[FileKind::Resume]).is_err());
    }

    #[test]
    fn batch_accepts_both_lists() {
        let accept = [FileKind::Image, FileKind::Resume];
        assert_eq!(classify(Some("image/heic"), &accept).unwrap(), (FileKind::Image, ".heic"));
        assert_eq!(
            classify(Some("application/vnd.ms-excel"), &accept).unwrap(),
            (FileKind::Resume, ".xls")
        );
        assert!(classify(Some("application/zip"), &accept).is_err());
    }

    #[test]
    fn size_limits_are_inclusive() {
        assert!(check_size(MAX_RESUME_SIZE, MAX_RESUME_SIZE).is_ok());
        assert!(matches!(
            check_size(MAX_RESUME_SIZE + 1, MAX_RESUME_SIZE),
            Err(UploadError::TooLarge { max_bytes }) if max_bytes == 10 * 1024 * 1024
        ));
        assert!(check_size(MAX_IMAGE_SIZE, FileKind::Image.max_size()).is_ok());
        assert!(check_size(MAX_IMAGE_SIZE + 1, FileKind::Image.max_size()).is_err());
    }

    #[test]
    fn too_large_message_names_megabytes() {
        let msg = UploadError::TooLarge { max_bytes: MAX_RESUME_SIZE }.to_string();
        assert_eq!(msg, "File too large. Maximum size: 10MB");
    }

    #[test]
    fn filenames_lose_directories() {
        assert_eq!(sanitize_filename(Some("cv.pdf")).unwrap(), "cv.pdf");
        assert_eq!(sanitize_filename(Some("../../etc/passwd")).unwrap(), "passwd");
        assert_eq!(sanitize_filename(Some("C:\\docs\\cv.pdf")).unwrap(), "cv.pdf");
        assert!(sanitize_filename(Some("dir/")).is_err());
        assert!(sanitize_filename(Some("..")).is_err());
        assert!(sanitize_filename(None).is_err());
    }

    #[test]
    fn keys_are_namespaced_and_timestamped() {
        let at = datetime!(2025-03-07 09:05:01 UTC);
        assert_eq!(timestamp(at), "20250307_090501");
        assert_eq!(
            object_key(12, Category::Resumes, at, "cv.pdf"),
            "12/resumes/20250307_090501_cv.pdf"
        );
    }

    #[test]
    fn categories_parse_only_known_names() {
        assert_eq!("linkedin".parse::<Category>().unwrap(), Category::Linkedin);
        assert!("../1".parse::<Category>().is_err());
    }

    #[test]
    fn storage_failures_become_internal_errors() {
        let e: AppError = UploadError::Storage(anyhow::anyhow!("disk full")).into();
        assert_eq!(e.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let e: AppError = UploadError::NoValidFiles.into();
        assert_eq!(e.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
