use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::user::{User, UserRole},
};

pub struct UserService;

impl UserService {
    pub async fn list(pool: &PgPool) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, vk_id, name, email, role, created_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(users)
    }

    pub async fn update_role(pool: &PgPool, id: Uuid, role: UserRole) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET role = $1 WHERE id = $2
             RETURNING id, vk_id, name, email, role, created_at",
        )
        .bind(role)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found"))
    }
}
