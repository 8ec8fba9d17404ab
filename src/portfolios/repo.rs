use sqlx::{types::Json, PgPool};

use super::dto::{
    CreateExperienceRequest, CreatePortfolioRequest, CreateProjectRequest, CreateSkillRequest,
    PortfolioDetails, UpdatePortfolioRequest,
};
use super::repo_types::{Experience, Portfolio, Project, Skill};

const PORTFOLIO_COLUMNS: &str = r#"
    id, user_id, title, tagline, bio, profile_image, resume_url, visibility, slug, is_default,
    contact_email, location, website, linkedin, github, created_at, updated_at, published_at
"#;

impl Portfolio {
    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<Portfolio>> {
        sqlx::query_as::<_, Portfolio>(&format!(
            "SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_slug(db: &PgPool, slug: &str) -> sqlx::Result<Option<Portfolio>> {
        sqlx::query_as::<_, Portfolio>(&format!(
            "SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(db)
        .await
    }

    pub async fn slug_taken(db: &PgPool, slug: &str, except_id: Option<i64>) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM portfolios WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(except_id)
        .fetch_one(db)
        .await
    }

    pub async fn list_by_user(db: &PgPool, user_id: i64) -> sqlx::Result<Vec<Portfolio>> {
        sqlx::query_as::<_, Portfolio>(&format!(
            "SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    /// Inserts a portfolio; the first one a user creates becomes their default.
    pub async fn create(
        db: &PgPool,
        user_id: i64,
        req: &CreatePortfolioRequest,
        published: bool,
    ) -> sqlx::Result<Portfolio> {
        sqlx::query_as::<_, Portfolio>(&format!(
            r#"
            INSERT INTO portfolios (
                user_id, title, slug, visibility, tagline, bio, profile_image, resume_url,
                contact_email, location, website, linkedin, github, is_default, published_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                NOT EXISTS (SELECT 1 FROM portfolios WHERE user_id = $1),
                CASE WHEN $14 THEN now() END
            )
            RETURNING {PORTFOLIO_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&req.title)
        .bind(&req.slug)
        .bind(req.visibility)
        .bind(&req.tagline)
        .bind(&req.bio)
        .bind(&req.profile_image)
        .bind(&req.resume_url)
        .bind(&req.contact_email)
        .bind(&req.location)
        .bind(&req.website)
        .bind(&req.linkedin)
        .bind(&req.github)
        .bind(published)
        .fetch_one(db)
        .await
    }

    /// Partial update. `published_at` is only ever set once.
    pub async fn update(
        db: &PgPool,
        id: i64,
        req: &UpdatePortfolioRequest,
        publish: bool,
    ) -> sqlx::Result<Portfolio> {
        sqlx::query_as::<_, Portfolio>(&format!(
            r#"
            UPDATE portfolios
               SET title = COALESCE($2, title),
                   slug = COALESCE($3, slug),
                   visibility = COALESCE($4, visibility),
                   tagline = COALESCE($5, tagline),
                   bio = COALESCE($6, bio),
                   profile_image = COALESCE($7, profile_image),
                   resume_url = COALESCE($8, resume_url),
                   contact_email = COALESCE($9, contact_email),
                   location = COALESCE($10, location),
                   website = COALESCE($11, website),
                   linkedin = COALESCE($12, linkedin),
                   github = COALESCE($13, github),
                   published_at = CASE WHEN $14 AND published_at IS NULL THEN now() ELSE published_at END,
                   updated_at = now()
             WHERE id = $1
            RETURNING {PORTFOLIO_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&req.title)
        .bind(&req.slug)
        .bind(req.visibility)
        .bind(&req.tagline)
        .bind(&req.bio)
        .bind(&req.profile_image)
        .bind(&req.resume_url)
        .bind(&req.contact_email)
        .bind(&req.location)
        .bind(&req.website)
        .bind(&req.linkedin)
        .bind(&req.github)
        .bind(publish)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: i64) -> sqlx::Result<bool> {
        let res = sqlx::query("DELETE FROM portfolios WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

impl Project {
    pub async fn list(db: &PgPool, portfolio_id: i64) -> sqlx::Result<Vec<Project>> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, portfolio_id, title, description, role, company, start_date, end_date,
                   tech_stack, demo_url, repo_url, is_featured, order_index, created_at
            FROM projects
            WHERE portfolio_id = $1
            ORDER BY order_index, id
            "#,
        )
        .bind(portfolio_id)
        .fetch_all(db)
        .await
    }

    pub async fn create(db: &PgPool, portfolio_id: i64, req: &CreateProjectRequest) -> sqlx::Result<Project> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (
                portfolio_id, title, description, role, company, start_date, end_date,
                tech_stack, demo_url, repo_url, is_featured, order_index
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, portfolio_id, title, description, role, company, start_date, end_date,
                      tech_stack, demo_url, repo_url, is_featured, order_index, created_at
            "#,
        )
        .bind(portfolio_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.role)
        .bind(&req.company)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(Json(&req.tech_stack))
        .bind(&req.demo_url)
        .bind(&req.repo_url)
        .bind(req.is_featured)
        .bind(req.order_index)
        .fetch_one(db)
        .await
    }
}

impl Skill {
    pub async fn list(db: &PgPool, portfolio_id: i64) -> sqlx::Result<Vec<Skill>> {
        sqlx::query_as::<_, Skill>(
            r#"
            SELECT id, portfolio_id, name, category, proficiency, years_experience,
                   is_highlighted, order_index, created_at
            FROM skills
            WHERE portfolio_id = $1
            ORDER BY order_index, id
            "#,
        )
        .bind(portfolio_id)
        .fetch_all(db)
        .await
    }

    pub async fn create(db: &PgPool, portfolio_id: i64, req: &CreateSkillRequest) -> sqlx::Result<Skill> {
        sqlx::query_as::<_, Skill>(
            r#"
            INSERT INTO skills (portfolio_id, name, category, proficiency, years_experience, is_highlighted, order_index)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, portfolio_id, name, category, proficiency, years_experience,
                      is_highlighted, order_index, created_at
            "#,
        )
        .bind(portfolio_id)
        .bind(&req.name)
        .bind(&req.category)
        .bind(req.proficiency)
        .bind(req.years_experience)
        .bind(req.is_highlighted)
        .bind(req.order_index)
        .fetch_one(db)
        .await
    }
}

impl Experience {
    pub async fn list(db: &PgPool, portfolio_id: i64) -> sqlx::Result<Vec<Experience>> {
        sqlx::query_as::<_, Experience>(
            r#"
            SELECT id, portfolio_id, title, company, location, employment_type, start_date, end_date,
                   description, technologies, order_index, created_at
            FROM experiences
            WHERE portfolio_id = $1
            ORDER BY order_index, id
            "#,
        )
        .bind(portfolio_id)
        .fetch_all(db)
        .await
    }

    pub async fn create(
        db: &PgPool,
        portfolio_id: i64,
        req: &CreateExperienceRequest,
    ) -> sqlx::Result<Experience> {
        sqlx::query_as::<_, Experience>(
            r#"
            INSERT INTO experiences (
                portfolio_id, title, company, location, employment_type, start_date, end_date,
                description, technologies, order_index
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, portfolio_id, title, company, location, employment_type, start_date, end_date,
                      description, technologies, order_index, created_at
            "#,
        )
        .bind(portfolio_id)
        .bind(&req.title)
        .bind(&req.company)
        .bind(&req.location)
        .bind(&req.employment_type)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(&req.description)
        .bind(Json(&req.technologies))
        .bind(req.order_index)
        .fetch_one(db)
        .await
    }
}

/// Which child table a delete targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Project,
    Skill,
    Experience,
}

impl ChildKind {
    pub fn table(self) -> &'static str {
        match self {
            ChildKind::Project => "projects",
            ChildKind::Skill => "skills",
            ChildKind::Experience => "experiences",
        }
    }
}

/// Deletes a child row only when it belongs to `portfolio_id`.
pub async fn delete_child(db: &PgPool, kind: ChildKind, portfolio_id: i64, child_id: i64) -> sqlx::Result<bool> {
    let res = sqlx::query(&format!(
        "DELETE FROM {} WHERE id = $1 AND portfolio_id = $2",
        kind.table()
    ))
    .bind(child_id)
    .bind(portfolio_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Portfolio with its child collections, each ordered by `order_index` then id.
pub async fn load_details(db: &PgPool, portfolio: Portfolio) -> sqlx::Result<PortfolioDetails> {
    let (projects, skills, experiences) = tokio::try_join!(
        Project::list(db, portfolio.id),
        Skill::list(db, portfolio.id),
        Experience::list(db, portfolio.id),
    )?;
    Ok(PortfolioDetails {
        portfolio,
        projects,
        skills,
        experiences,
    })
}
