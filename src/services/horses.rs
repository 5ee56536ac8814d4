use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        horse::{
            archived_nickname, CreateHorseRequest, Horse, HorseRemoval, HorseStatus,
            UpdateHorseRequest,
        },
        patch,
    },
    services::metrics::HORSES_ARCHIVED_COUNTER,
};

pub struct HorseService;

impl HorseService {
    pub async fn list(pool: &PgPool) -> AppResult<Vec<Horse>> {
        let horses = sqlx::query_as::<_, Horse>("SELECT * FROM horses ORDER BY nickname")
            .fetch_all(pool)
            .await?;
        Ok(horses)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> AppResult<Horse> {
        sqlx::query_as::<_, Horse>("SELECT * FROM horses WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("Horse not found"))
    }

    pub async fn create(pool: &PgPool, req: &CreateHorseRequest) -> AppResult<Horse> {
        let horse = sqlx::query_as::<_, Horse>(
            "INSERT INTO horses (nickname, breed, age, status, notes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(req.nickname.trim())
        .bind(req.breed.trim())
        .bind(req.age)
        .bind(req.status.unwrap_or(HorseStatus::Active))
        .bind(&req.notes)
        .fetch_one(pool)
        .await?;
        Ok(horse)
    }

    pub async fn update(pool: &PgPool, id: Uuid, req: &UpdateHorseRequest) -> AppResult<Horse> {
        let notes = patch::binds(&req.notes);
        sqlx::query_as::<_, Horse>(
            "UPDATE horses
             SET nickname = COALESCE($1, nickname),
                 breed    = COALESCE($2, breed),
                 age      = COALESCE($3, age),
                 status   = COALESCE($4, status),
                 notes    = CASE WHEN $5 THEN $6 ELSE notes END
             WHERE id = $7
             RETURNING *",
        )
        .bind(req.nickname.as_deref().map(str::trim))
        .bind(req.breed.as_deref().map(str::trim))
        .bind(req.age)
        .bind(req.status)
        .bind(notes.0)
        .bind(notes.1)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Horse not found"))
    }

    /// Removes a horse, keeping it as an archived record when completed lessons reference it.
    ///
    /// Links to lessons that never happened are dropped first. Everything runs in one transaction.
    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<HorseRemoval> {
        let mut tx = pool.begin().await?;

        let nickname: String =
            sqlx::query_scalar("SELECT nickname FROM horses WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound("Horse not found"))?;

        sqlx::query(
            "DELETE FROM lesson_horses lh
             USING lessons l
             WHERE lh.lesson_id = l.id AND lh.horse_id = $1 AND l.status <> 'completed'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let still_referenced: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM lesson_horses WHERE horse_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        let outcome = if still_referenced {
            sqlx::query("UPDATE horses SET nickname = $1, status = $2 WHERE id = $3")
                .bind(archived_nickname(&nickname))
                .bind(HorseStatus::Unavailable)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            HorseRemoval::Archived
        } else {
            sqlx::query("DELETE FROM horses WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            HorseRemoval::Deleted
        };

        tx.commit().await?;

        if outcome == HorseRemoval::Archived {
            HORSES_ARCHIVED_COUNTER.inc();
            info!(horse_id = %id, "Horse has lesson history, archived instead of deleted");
        }
        Ok(outcome)
    }
}
