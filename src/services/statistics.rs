use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::statistics::{HorseWorkload, InstructorWorkload},
};

pub struct StatisticsService;

impl StatisticsService {
    /// Hours and lesson counts per horse, from completed lessons in `[start, end]`.
    /// Every horse is listed, ordered by nickname; idle ones carry zeros.
    pub async fn horse_workload(
        pool: &PgPool,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<HorseWorkload>> {
        let rows = sqlx::query_as::<_, HorseWorkload>(
            "SELECT h.id AS horse_id, h.nickname AS horse_name,
                    COALESCE(SUM(l.duration), 0)::float8 / 60.0 AS total_hours,
                    COUNT(l.id) AS total_lessons
             FROM horses h
             LEFT JOIN lesson_horses lh ON lh.horse_id = h.id
             LEFT JOIN lessons l
                    ON l.id = lh.lesson_id
                   AND l.status = 'completed'
                   AND l.date >= $1 AND l.date <= $2
             GROUP BY h.id
             ORDER BY h.nickname",
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn instructor_workload(
        pool: &PgPool,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<InstructorWorkload>> {
        let rows = sqlx::query_as::<_, InstructorWorkload>(
            "SELECT i.id AS instructor_id, i.name AS instructor_name,
                    COALESCE(SUM(l.duration), 0)::float8 / 60.0 AS total_hours,
                    COUNT(l.id) AS total_lessons
             FROM instructors i
             LEFT JOIN lesson_instructors li ON li.instructor_id = i.id
             LEFT JOIN lessons l
                    ON l.id = li.lesson_id
                   AND l.status = 'completed'
                   AND l.date >= $1 AND l.date <= $2
             GROUP BY i.id
             ORDER BY i.name",
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Sum of completed lesson cost in the half-open window `[start, end)`.
    pub async fn revenue(pool: &PgPool, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Decimal> {
        let revenue: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(cost), 0)
             FROM lessons
             WHERE status = 'completed' AND date >= $1 AND date < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;
        Ok(revenue)
    }

    pub async fn new_clients(pool: &PgPool, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM clients WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}
