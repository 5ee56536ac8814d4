use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        landing::{CreateLandingContentRequest, LandingContent, UpdateLandingContentRequest},
        patch,
    },
};

pub struct LandingService;

impl LandingService {
    pub async fn list(pool: &PgPool) -> AppResult<Vec<LandingContent>> {
        let sections =
            sqlx::query_as::<_, LandingContent>("SELECT * FROM landing_content ORDER BY section")
                .fetch_all(pool)
                .await?;
        Ok(sections)
    }

    pub async fn create(pool: &PgPool, req: &CreateLandingContentRequest) -> AppResult<LandingContent> {
        let section = sqlx::query_as::<_, LandingContent>(
            "INSERT INTO landing_content (section, title, content, image_url, is_visible)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(req.section.trim())
        .bind(&req.title)
        .bind(&req.content)
        .bind(&req.image_url)
        .bind(req.is_visible.unwrap_or(true))
        .fetch_one(pool)
        .await?;
        Ok(section)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateLandingContentRequest,
    ) -> AppResult<LandingContent> {
        let title = patch::binds(&req.title);
        let content = patch::binds(&req.content);
        let image_url = patch::binds(&req.image_url);
        sqlx::query_as::<_, LandingContent>(
            "UPDATE landing_content
             SET section    = COALESCE($1, section),
                 title      = CASE WHEN $2 THEN $3 ELSE title END,
                 content    = CASE WHEN $4 THEN $5 ELSE content END,
                 image_url  = CASE WHEN $6 THEN $7 ELSE image_url END,
                 is_visible = COALESCE($8, is_visible),
                 updated_at = NOW()
             WHERE id = $9
             RETURNING *",
        )
        .bind(req.section.as_deref().map(str::trim))
        .bind(title.0)
        .bind(title.1)
        .bind(content.0)
        .bind(content.1)
        .bind(image_url.0)
        .bind(image_url.1)
        .bind(req.is_visible)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Landing section not found"))
    }
}
