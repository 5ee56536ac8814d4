use std::collections::HashMap;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        client::Client,
        patch,
        subscription::{
            CreateSubscriptionRequest, Subscription, SubscriptionStatus, SubscriptionWithClient,
            UpdateSubscriptionRequest,
        },
    },
};

pub struct SubscriptionService;

impl SubscriptionService {
    pub async fn list(pool: &PgPool) -> AppResult<Vec<SubscriptionWithClient>> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Self::with_clients(pool, subscriptions).await
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> AppResult<SubscriptionWithClient> {
        let subscription = Self::get_plain(pool, id).await?;
        Self::with_clients(pool, vec![subscription])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Subscription not found"))
    }

    pub async fn get_plain(pool: &PgPool, id: Uuid) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("Subscription not found"))
    }

    pub async fn list_for_client(pool: &PgPool, client_id: Uuid) -> AppResult<Vec<Subscription>> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE client_id = $1 ORDER BY created_at DESC",
        )
        .bind(client_id)
        .fetch_all(pool)
        .await?;
        Ok(subscriptions)
    }

    pub async fn create(pool: &PgPool, req: &CreateSubscriptionRequest) -> AppResult<Subscription> {
        let new = req.resolve(Utc::now())?;
        let subscription = sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions
                (client_id, total_lessons, lessons_remaining, duration_months, status, expires_at, used_at)
             VALUES ($1, $2, $3, $4, $5, $6, CASE WHEN $5 = 'used'::subscription_status THEN NOW() END)
             RETURNING *",
        )
        .bind(new.client_id)
        .bind(new.total_lessons)
        .bind(new.lessons_remaining)
        .bind(new.duration_months)
        .bind(new.status)
        .bind(new.expires_at)
        .fetch_one(pool)
        .await?;
        Ok(subscription)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateSubscriptionRequest,
    ) -> AppResult<Subscription> {
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Subscription not found"))?;

        req.validate_against(&current)?;

        let remaining = req.lessons_remaining.unwrap_or(current.lessons_remaining);
        let status = match req.status {
            Some(status) => status,
            None if remaining == 0 => SubscriptionStatus::Used,
            None => current.status,
        };
        let used_at = match status {
            SubscriptionStatus::Used => current.used_at.or_else(|| Some(Utc::now())),
            _ => current.used_at,
        };

        let updated = sqlx::query_as::<_, Subscription>(
            "UPDATE subscriptions
             SET total_lessons     = $1,
                 lessons_remaining = $2,
                 duration_months   = $3,
                 status            = $4,
                 expires_at        = $5,
                 used_at           = $6
             WHERE id = $7
             RETURNING *",
        )
        .bind(req.total_lessons.unwrap_or(current.total_lessons))
        .bind(remaining)
        .bind(req.duration_months.unwrap_or(current.duration_months))
        .bind(status)
        .bind(patch::apply(req.expires_at, current.expires_at))
        .bind(used_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn with_clients(
        pool: &PgPool,
        subscriptions: Vec<Subscription>,
    ) -> AppResult<Vec<SubscriptionWithClient>> {
        let ids: Vec<Uuid> = subscriptions.iter().map(|s| s.client_id).collect();
        let clients: HashMap<Uuid, Client> =
            sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(pool)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect();

        subscriptions
            .into_iter()
            .map(|subscription| {
                let client = clients
                    .get(&subscription.client_id)
                    .cloned()
                    .ok_or(AppError::NotFound("Client not found"))?;
                Ok(SubscriptionWithClient { subscription, client })
            })
            .collect()
    }
}
