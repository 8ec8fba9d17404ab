use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Experience, Portfolio, Project, Skill, Visibility};

#[derive(Debug, Deserialize)]
pub struct CreatePortfolioRequest {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub visibility: Visibility,
    pub tagline: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub resume_url: Option<String>,
    pub contact_email: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePortfolioRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub visibility: Option<Visibility>,
    pub tagline: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub resume_url: Option<String>,
    pub contact_email: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    pub demo_url: Option<String>,
    pub repo_url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateSkillRequest {
    pub name: String,
    pub category: Option<String>,
    pub proficiency: Option<i32>,
    pub years_experience: Option<i32>,
    #[serde(default)]
    pub is_highlighted: bool,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateExperienceRequest {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub description: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub order_index: i32,
}

/// Row in the caller's portfolio list.
#[derive(Debug, Serialize)]
pub struct PortfolioListItem {
    pub id: i64,
    pub title: String,
    pub tagline: Option<String>,
    pub slug: String,
    pub visibility: Visibility,
    pub is_default: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<Portfolio> for PortfolioListItem {
    fn from(p: Portfolio) -> Self {
        Self {
            id: p.id,
            title: p.title,
            tagline: p.tagline,
            slug: p.slug,
            visibility: p.visibility,
            is_default: p.is_default,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PortfolioDetails {
    #[serde(flatten)]
    pub portfolio: Portfolio,
    pub projects: Vec<Project>,
    pub skills: Vec<Skill>,
    pub experiences: Vec<Experience>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: i64,
    pub deleted: bool,
}
