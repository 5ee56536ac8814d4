use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        instructor::{CreateInstructorRequest, Instructor, UpdateInstructorRequest},
        patch,
    },
};

pub struct InstructorService;

impl InstructorService {
    pub async fn list(pool: &PgPool, only_active: bool) -> AppResult<Vec<Instructor>> {
        let instructors = sqlx::query_as::<_, Instructor>(
            "SELECT * FROM instructors
             WHERE ($1 = FALSE OR is_active = TRUE)
             ORDER BY name",
        )
        .bind(only_active)
        .fetch_all(pool)
        .await?;
        Ok(instructors)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> AppResult<Instructor> {
        sqlx::query_as::<_, Instructor>("SELECT * FROM instructors WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("Instructor not found"))
    }

    pub async fn create(pool: &PgPool, req: &CreateInstructorRequest) -> AppResult<Instructor> {
        let instructor = sqlx::query_as::<_, Instructor>(
            "INSERT INTO instructors (name, phone, email, specializations, is_active)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(req.name.trim())
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.specializations)
        .bind(req.is_active.unwrap_or(true))
        .fetch_one(pool)
        .await?;
        Ok(instructor)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateInstructorRequest,
    ) -> AppResult<Instructor> {
        let (phone, email) = (patch::binds(&req.phone), patch::binds(&req.email));
        sqlx::query_as::<_, Instructor>(
            "UPDATE instructors
             SET name            = COALESCE($1, name),
                 phone           = CASE WHEN $2 THEN $3 ELSE phone END,
                 email           = CASE WHEN $4 THEN $5 ELSE email END,
                 specializations = COALESCE($6, specializations),
                 is_active       = COALESCE($7, is_active)
             WHERE id = $8
             RETURNING *",
        )
        .bind(req.name.as_deref().map(str::trim))
        .bind(phone.0)
        .bind(phone.1)
        .bind(email.0)
        .bind(email.1)
        .bind(&req.specializations)
        .bind(req.is_active)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Instructor not found"))
    }

    /// Fails with 400 while lessons still reference the instructor.
    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM instructors WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Instructor not found"));
        }
        Ok(())
    }
}
