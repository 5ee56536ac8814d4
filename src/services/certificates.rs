use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        certificate::{
            generate_number, Certificate, CertificateStatus, CreateCertificateRequest,
            UpdateCertificateRequest,
        },
        patch,
    },
};

const GENERATED_NUMBER_ATTEMPTS: usize = 5;

pub struct CertificateService;

impl CertificateService {
    pub async fn list(pool: &PgPool) -> AppResult<Vec<Certificate>> {
        let certificates =
            sqlx::query_as::<_, Certificate>("SELECT * FROM certificates ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?;
        Ok(certificates)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> AppResult<Certificate> {
        sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("Certificate not found"))
    }

    /// Creates a certificate. A blank number is generated, retrying on the rare collision.
    pub async fn create(pool: &PgPool, req: &CreateCertificateRequest) -> AppResult<Certificate> {
        let explicit = req.number.as_deref().map(str::trim).filter(|n| !n.is_empty());
        if explicit.is_some() {
            return Self::insert(pool, &req.number_or_generated(), req)
                .await
                .map_err(duplicate_number);
        }

        let mut last = None;
        for _ in 0..GENERATED_NUMBER_ATTEMPTS {
            match Self::insert(pool, &generate_number(), req).await {
                Err(AppError::Conflict(msg)) => last = Some(AppError::Conflict(msg)),
                other => return other,
            }
        }
        Err(last.map(duplicate_number).unwrap_or_else(|| {
            AppError::Internal(anyhow::anyhow!("certificate number generation failed"))
        }))
    }

    async fn insert(
        pool: &PgPool,
        number: &str,
        req: &CreateCertificateRequest,
    ) -> AppResult<Certificate> {
        let certificate = sqlx::query_as::<_, Certificate>(
            "INSERT INTO certificates (number, client_id, value, status, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(number)
        .bind(req.client_id)
        .bind(req.value)
        .bind(req.status.unwrap_or(CertificateStatus::Active))
        .bind(req.expires_at)
        .fetch_one(pool)
        .await?;
        Ok(certificate)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateCertificateRequest,
    ) -> AppResult<Certificate> {
        let client_id = patch::binds(&req.client_id);
        let expires_at = patch::binds(&req.expires_at);
        sqlx::query_as::<_, Certificate>(
            "UPDATE certificates
             SET number     = COALESCE($1, number),
                 client_id  = CASE WHEN $2 THEN $3 ELSE client_id END,
                 value      = COALESCE($4, value),
                 status     = COALESCE($5, status),
                 expires_at = CASE WHEN $6 THEN $7 ELSE expires_at END,
                 used_at    = CASE WHEN $5 = 'used'::certificate_status THEN COALESCE(used_at, NOW())
                                   ELSE used_at END
             WHERE id = $8
             RETURNING *",
        )
        .bind(req.number.as_deref().map(str::trim))
        .bind(client_id.0)
        .bind(client_id.1)
        .bind(req.value)
        .bind(req.status)
        .bind(expires_at.0)
        .bind(expires_at.1)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)
        .map_err(duplicate_number)?
        .ok_or(AppError::NotFound("Certificate not found"))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM certificates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Certificate not found"));
        }
        Ok(())
    }
}

fn duplicate_number(err: AppError) -> AppError {
    match err {
        AppError::Conflict(_) => AppError::Conflict("Certificate number already exists".into()),
        other => other,
    }
}
