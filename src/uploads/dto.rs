use serde::{Deserialize, Serialize};

use super::validator::Category;

/// Metadata for one stored (or rejected) file.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file_path: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub category: String,
}

impl UploadResponse {
    /// Batch entry for a file that was not stored.
    pub fn failed(file_name: Option<String>, file_type: Option<String>, message: String) -> Self {
        Self {
            success: false,
            message,
            file_path: String::new(),
            file_name: file_name.unwrap_or_default(),
            file_type: file_type.unwrap_or_default(),
            file_size: 0,
            category: "error".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkedInUploadRequest {
    pub profile_url: Option<String>,
    pub raw_data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkedInUploadResponse {
    pub success: bool,
    pub message: String,
    pub profile_url: Option<String>,
    pub data_source: &'static str,
    pub stored_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListedFile {
    pub file_name: String,
    pub category: Category,
    pub file_size: u64,
    pub upload_date: String,
    pub file_path: String,
}

#[derive(Debug, Serialize)]
pub struct ListUploadsResponse {
    pub files: Vec<ListedFile>,
    pub total: usize,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}
