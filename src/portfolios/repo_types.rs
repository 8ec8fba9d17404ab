use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "portfolio_visibility", rename_all = "lowercase")]
pub enum Visibility {
    /// Listed and readable by everyone.
    Public,
    /// Readable by anyone holding the slug.
    Unlisted,
    #[default]
    Private,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Portfolio {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub tagline: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub resume_url: Option<String>,
    pub visibility: Visibility,
    pub slug: String,
    pub is_default: bool,
    pub contact_email: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub portfolio_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub tech_stack: Json<Vec<String>>,
    pub demo_url: Option<String>,
    pub repo_url: Option<String>,
    pub is_featured: bool,
    pub order_index: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Skill {
    pub id: i64,
    pub portfolio_id: i64,
    pub name: String,
    pub category: Option<String>,
    pub proficiency: Option<i32>,
    pub years_experience: Option<i32>,
    pub is_highlighted: bool,
    pub order_index: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Experience {
    pub id: i64,
    pub portfolio_id: i64,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub description: Option<String>,
    pub technologies: Json<Vec<String>>,
    pub order_index: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
