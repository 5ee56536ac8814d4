use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        client::{search_pattern, Client, CreateClientRequest, UpdateClientRequest},
        patch,
    },
};

pub struct ClientService;

impl ClientService {
    pub async fn list(pool: &PgPool) -> AppResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
        Ok(clients)
    }

    /// Case-insensitive substring match on name, phone and email.
    pub async fn search(pool: &PgPool, query: &str) -> AppResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT * FROM clients
             WHERE LOWER(name) LIKE $1
                OR LOWER(COALESCE(phone, '')) LIKE $1
                OR LOWER(COALESCE(email, '')) LIKE $1
             ORDER BY name",
        )
        .bind(search_pattern(query))
        .fetch_all(pool)
        .await?;
        Ok(clients)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> AppResult<Client> {
        sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("Client not found"))
    }

    pub async fn create(pool: &PgPool, req: &CreateClientRequest) -> AppResult<Client> {
        let client = sqlx::query_as::<_, Client>(
            "INSERT INTO clients (name, phone, email, notes)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(req.name.trim())
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.notes)
        .fetch_one(pool)
        .await?;
        Ok(client)
    }

    pub async fn update(pool: &PgPool, id: Uuid, req: &UpdateClientRequest) -> AppResult<Client> {
        let (phone, email, notes) =
            (patch::binds(&req.phone), patch::binds(&req.email), patch::binds(&req.notes));
        sqlx::query_as::<_, Client>(
            "UPDATE clients
             SET name  = COALESCE($1, name),
                 phone = CASE WHEN $2 THEN $3 ELSE phone END,
                 email = CASE WHEN $4 THEN $5 ELSE email END,
                 notes = CASE WHEN $6 THEN $7 ELSE notes END
             WHERE id = $8
             RETURNING *",
        )
        .bind(req.name.as_deref().map(str::trim))
        .bind(phone.0)
        .bind(phone.1)
        .bind(email.0)
        .bind(email.1)
        .bind(notes.0)
        .bind(notes.1)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Client not found"))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Client not found"));
        }
        Ok(())
    }
}
