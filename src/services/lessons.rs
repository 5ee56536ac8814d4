use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        certificate::Certificate,
        client::Client,
        lesson::{
            completes, dedup_ids, CreateLessonRequest, Lesson, LessonHorse, LessonHorseRow,
            LessonInstructor, LessonInstructorRow, LessonStatus, LessonWithRelations, PaymentType,
            UpdateLessonRequest, DEFAULT_DURATION_MINUTES,
        },
        patch,
        subscription::{after_deduction, Subscription},
    },
    services::metrics::LESSONS_COMPLETED_COUNTER,
};

pub struct LessonService;

impl LessonService {
    /// Lessons in an optional date window, newest first.
    pub async fn list(
        pool: &PgPool,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<LessonWithRelations>> {
        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons
             WHERE ($1::timestamptz IS NULL OR date >= $1)
               AND ($2::timestamptz IS NULL OR date <= $2)
             ORDER BY date DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;
        Self::with_relations(pool, lessons).await
    }

    pub async fn list_for_client(pool: &PgPool, client_id: Uuid) -> AppResult<Vec<LessonWithRelations>> {
        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE client_id = $1 ORDER BY date DESC",
        )
        .bind(client_id)
        .fetch_all(pool)
        .await?;
        Self::with_relations(pool, lessons).await
    }

    pub async fn list_for_subscription(
        pool: &PgPool,
        subscription_id: Uuid,
    ) -> AppResult<Vec<LessonWithRelations>> {
        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE subscription_id = $1 ORDER BY date DESC",
        )
        .bind(subscription_id)
        .fetch_all(pool)
        .await?;
        Self::with_relations(pool, lessons).await
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> AppResult<LessonWithRelations> {
        let lesson = sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("Lesson not found"))?;
        Self::with_relations(pool, vec![lesson])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Lesson not found"))
    }

    /// Creates a lesson with its links. A lesson created as completed is settled immediately.
    pub async fn create(pool: &PgPool, req: &CreateLessonRequest) -> AppResult<LessonWithRelations> {
        req.validate()?;
        let mut tx = pool.begin().await?;

        let lesson = sqlx::query_as::<_, Lesson>(
            "INSERT INTO lessons
                (client_id, date, duration, type, payment_type, cost, status, is_paid, notes,
                 certificate_id, subscription_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(req.client_id)
        .bind(req.date)
        .bind(req.duration.unwrap_or(DEFAULT_DURATION_MINUTES))
        .bind(req.lesson_type)
        .bind(req.payment_type)
        .bind(req.cost)
        .bind(req.status.unwrap_or(LessonStatus::Planned))
        .bind(req.is_paid.unwrap_or(false))
        .bind(&req.notes)
        .bind(req.certificate_id)
        .bind(req.subscription_id)
        .fetch_one(&mut *tx)
        .await?;

        replace_instructors(&mut *tx, lesson.id, &req.instructor_ids).await?;
        replace_horses(&mut *tx, lesson.id, &req.horse_ids).await?;

        let completed = lesson.status == LessonStatus::Completed;
        if completed {
            settle_payment(&mut *tx, &lesson).await?;
        }

        tx.commit().await?;
        if completed {
            LESSONS_COMPLETED_COUNTER.with_label_values(&[lesson.payment_type.as_str()]).inc();
        }

        Self::get(pool, lesson.id).await
    }

    /// Applies a partial update; moving into `completed` settles the payment in the same transaction.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateLessonRequest,
    ) -> AppResult<LessonWithRelations> {
        req.validate()?;
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Lesson not found"))?;

        let next_status = req.status.unwrap_or(current.status);
        let lesson = sqlx::query_as::<_, Lesson>(
            "UPDATE lessons
             SET client_id       = $1,
                 date            = $2,
                 duration        = $3,
                 type            = $4,
                 payment_type    = $5,
                 cost            = $6,
                 status          = $7,
                 is_paid         = $8,
                 notes           = $9,
                 certificate_id  = $10,
                 subscription_id = $11
             WHERE id = $12
             RETURNING *",
        )
        .bind(req.client_id.unwrap_or(current.client_id))
        .bind(req.date.unwrap_or(current.date))
        .bind(req.duration.unwrap_or(current.duration))
        .bind(req.lesson_type.unwrap_or(current.lesson_type))
        .bind(req.payment_type.unwrap_or(current.payment_type))
        .bind(req.cost.unwrap_or(current.cost))
        .bind(next_status)
        .bind(req.is_paid.unwrap_or(current.is_paid))
        .bind(patch::apply(req.notes.clone(), current.notes))
        .bind(patch::apply(req.certificate_id, current.certificate_id))
        .bind(patch::apply(req.subscription_id, current.subscription_id))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(ids) = &req.instructor_ids {
            replace_instructors(&mut *tx, id, ids).await?;
        }
        if let Some(ids) = &req.horse_ids {
            replace_horses(&mut *tx, id, ids).await?;
        }

        let completed = completes(current.status, next_status);
        if completed {
            settle_payment(&mut *tx, &lesson).await?;
        }

        tx.commit().await?;
        if completed {
            LESSONS_COMPLETED_COUNTER.with_label_values(&[lesson.payment_type.as_str()]).inc();
        }

        Self::get(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Lesson not found"));
        }
        Ok(())
    }

    /// Attaches client, payment source, instructors and horses with one query per relation.
    async fn with_relations(
        pool: &PgPool,
        lessons: Vec<Lesson>,
    ) -> AppResult<Vec<LessonWithRelations>> {
        if lessons.is_empty() {
            return Ok(Vec::new());
        }
        let lesson_ids: Vec<Uuid> = lessons.iter().map(|l| l.id).collect();
        let client_ids: Vec<Uuid> = lessons.iter().map(|l| l.client_id).collect();
        let certificate_ids: Vec<Uuid> = lessons.iter().filter_map(|l| l.certificate_id).collect();
        let subscription_ids: Vec<Uuid> = lessons.iter().filter_map(|l| l.subscription_id).collect();

        let clients: HashMap<Uuid, Client> =
            sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ANY($1)")
                .bind(&client_ids)
                .fetch_all(pool)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect();

        let certificates: HashMap<Uuid, Certificate> =
            sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE id = ANY($1)")
                .bind(&certificate_ids)
                .fetch_all(pool)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect();

        let subscriptions: HashMap<Uuid, Subscription> =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = ANY($1)")
                .bind(&subscription_ids)
                .fetch_all(pool)
                .await?
                .into_iter()
                .map(|s| (s.id, s))
                .collect();

        let mut instructors: HashMap<Uuid, Vec<LessonInstructor>> = HashMap::new();
        let rows = sqlx::query_as::<_, LessonInstructorRow>(
            "SELECT li.id AS link_id, li.lesson_id, i.*
             FROM lesson_instructors li
             JOIN instructors i ON i.id = li.instructor_id
             WHERE li.lesson_id = ANY($1)
             ORDER BY i.name",
        )
        .bind(&lesson_ids)
        .fetch_all(pool)
        .await?;
        for row in rows {
            instructors.entry(row.lesson_id).or_default().push(LessonInstructor {
                id: row.link_id,
                lesson_id: row.lesson_id,
                instructor_id: row.instructor.id,
                instructor: row.instructor,
            });
        }

        let mut horses: HashMap<Uuid, Vec<LessonHorse>> = HashMap::new();
        let rows = sqlx::query_as::<_, LessonHorseRow>(
            "SELECT lh.id AS link_id, lh.lesson_id, h.*
             FROM lesson_horses lh
             JOIN horses h ON h.id = lh.horse_id
             WHERE lh.lesson_id = ANY($1)
             ORDER BY h.nickname",
        )
        .bind(&lesson_ids)
        .fetch_all(pool)
        .await?;
        for row in rows {
            horses.entry(row.lesson_id).or_default().push(LessonHorse {
                id: row.link_id,
                lesson_id: row.lesson_id,
                horse_id: row.horse.id,
                horse: row.horse,
            });
        }

        lessons
            .into_iter()
            .map(|lesson| {
                let client = clients
                    .get(&lesson.client_id)
                    .cloned()
                    .ok_or(AppError::NotFound("Client not found"))?;
                Ok(LessonWithRelations {
                    certificate: lesson.certificate_id.and_then(|id| certificates.get(&id).cloned()),
                    subscription: lesson.subscription_id.and_then(|id| subscriptions.get(&id).cloned()),
                    lesson_instructors: instructors.remove(&lesson.id).unwrap_or_default(),
                    lesson_horses: horses.remove(&lesson.id).unwrap_or_default(),
                    client,
                    lesson,
                })
            })
            .collect()
    }
}

async fn replace_instructors(conn: &mut PgConnection, lesson_id: Uuid, ids: &[Uuid]) -> AppResult<()> {
    sqlx::query("DELETE FROM lesson_instructors WHERE lesson_id = $1")
        .bind(lesson_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        "INSERT INTO lesson_instructors (lesson_id, instructor_id)
         SELECT $1, UNNEST($2::uuid[])",
    )
    .bind(lesson_id)
    .bind(dedup_ids(ids))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn replace_horses(conn: &mut PgConnection, lesson_id: Uuid, ids: &[Uuid]) -> AppResult<()> {
    sqlx::query("DELETE FROM lesson_horses WHERE lesson_id = $1")
        .bind(lesson_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        "INSERT INTO lesson_horses (lesson_id, horse_id)
         SELECT $1, UNNEST($2::uuid[])",
    )
    .bind(lesson_id)
    .bind(dedup_ids(ids))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Charges the payment source of a lesson that just became completed.
///
/// Subscriptions lose exactly one lesson (row locked for the deduction). When the lesson
/// isn't linked to one, the client's newest usable subscription is charged and linked.
/// With no chargeable subscription the lesson still completes and nothing is deducted.
/// Certificates are marked used. Cash needs nothing.
async fn settle_payment(conn: &mut PgConnection, lesson: &Lesson) -> AppResult<()> {
    match lesson.payment_type {
        PaymentType::Cash => Ok(()),
        PaymentType::Subscription => deduct_subscription(conn, lesson).await,
        PaymentType::Certificate => redeem_certificate(conn, lesson).await,
    }
}

async fn deduct_subscription(conn: &mut PgConnection, lesson: &Lesson) -> AppResult<()> {
    let subscription = match lesson.subscription_id {
        Some(id) => {
            let linked = sqlx::query_as::<_, Subscription>(
                "SELECT * FROM subscriptions WHERE id = $1 FOR UPDATE",
            )
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::validation("Linked subscription does not exist"))?;
            if linked.client_id != lesson.client_id {
                return Err(AppError::validation("Subscription belongs to another client"));
            }
            Some(linked)
        }
        None => {
            sqlx::query_as::<_, Subscription>(
                "SELECT * FROM subscriptions
                 WHERE client_id = $1
                   AND status = 'active'
                   AND lessons_remaining > 0
                   AND (expires_at IS NULL OR expires_at > NOW())
                 ORDER BY created_at DESC
                 LIMIT 1
                 FOR UPDATE",
            )
            .bind(lesson.client_id)
            .fetch_optional(&mut *conn)
            .await?
        }
    };

    let Some(subscription) = subscription.filter(|s| s.is_chargeable(Utc::now())) else {
        warn!(
            lesson_id = %lesson.id,
            client_id = %lesson.client_id,
            "Lesson completed without a chargeable subscription, nothing deducted"
        );
        return Ok(());
    };
    let Some((remaining, status)) = after_deduction(subscription.lessons_remaining) else {
        return Ok(());
    };

    sqlx::query(
        "UPDATE subscriptions
         SET lessons_remaining = $1,
             status            = $2,
             used_at           = CASE WHEN $2 = 'used'::subscription_status THEN NOW() ELSE used_at END
         WHERE id = $3",
    )
    .bind(remaining)
    .bind(status)
    .bind(subscription.id)
    .execute(&mut *conn)
    .await?;

    if lesson.subscription_id.is_none() {
        sqlx::query("UPDATE lessons SET subscription_id = $1 WHERE id = $2")
            .bind(subscription.id)
            .bind(lesson.id)
            .execute(&mut *conn)
            .await?;
    }

    info!(
        lesson_id = %lesson.id,
        subscription_id = %subscription.id,
        lessons_remaining = remaining,
        "Lesson completed, subscription charged"
    );
    Ok(())
}

async fn redeem_certificate(conn: &mut PgConnection, lesson: &Lesson) -> AppResult<()> {
    let Some(certificate_id) = lesson.certificate_id else {
        return Ok(());
    };
    let result = sqlx::query(
        "UPDATE certificates SET status = 'used', used_at = NOW()
         WHERE id = $1 AND status = 'active'",
    )
    .bind(certificate_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::validation("Certificate is not active"));
    }
    info!(lesson_id = %lesson.id, certificate_id = %certificate_id, "Lesson completed, certificate redeemed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    use crate::{
        models::{
            client::CreateClientRequest,
            horse::CreateHorseRequest,
            instructor::CreateInstructorRequest,
            lesson::LessonType,
            subscription::{CreateSubscriptionRequest, SubscriptionStatus},
        },
        services::{
            clients::ClientService, horses::HorseService, instructors::InstructorService,
            subscriptions::SubscriptionService,
        },
    };

    struct Stable {
        client: Uuid,
        instructor: Uuid,
        horse: Uuid,
    }

    async fn stable(pool: &PgPool, client_name: &str) -> Stable {
        let client = ClientService::create(
            pool,
            &CreateClientRequest { name: client_name.into(), phone: None, email: None, notes: None },
        )
        .await
        .unwrap();
        let instructor = InstructorService::create(
            pool,
            &CreateInstructorRequest {
                name: "Алексей Орлов".into(),
                phone: None,
                email: None,
                specializations: vec![],
                is_active: None,
            },
        )
        .await
        .unwrap();
        let horse = HorseService::create(
            pool,
            &CreateHorseRequest {
                nickname: "Звёздочка".into(),
                breed: "Орловский рысак".into(),
                age: 8,
                status: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        Stable { client: client.id, instructor: instructor.id, horse: horse.id }
    }

    async fn subscription(
        pool: &PgPool,
        client_id: Uuid,
        total: i32,
        expires_at: Option<DateTime<Utc>>,
    ) -> Subscription {
        SubscriptionService::create(
            pool,
            &CreateSubscriptionRequest {
                client_id,
                total_lessons: total,
                lessons_remaining: None,
                duration_months: None,
                status: None,
                expires_at,
            },
        )
        .await
        .unwrap()
    }

    fn planned(stable: &Stable, subscription_id: Option<Uuid>) -> CreateLessonRequest {
        CreateLessonRequest {
            client_id: stable.client,
            date: Utc::now(),
            duration: None,
            lesson_type: LessonType::BeginnerRiding,
            payment_type: PaymentType::Subscription,
            cost: Decimal::new(2000, 0),
            status: None,
            is_paid: None,
            notes: None,
            certificate_id: None,
            subscription_id,
            instructor_ids: vec![stable.instructor],
            horse_ids: vec![stable.horse],
        }
    }

    fn complete() -> UpdateLessonRequest {
        UpdateLessonRequest { status: Some(LessonStatus::Completed), ..Default::default() }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn completion_deducts_exactly_one_and_flips_to_used(pool: PgPool) {
        let s = stable(&pool, "Петров Илья").await;
        let pass = subscription(&pool, s.client, 2, None).await;

        let first = LessonService::create(&pool, &planned(&s, Some(pass.id))).await.unwrap();
        LessonService::update(&pool, first.lesson.id, &complete()).await.unwrap();
        let after_one = SubscriptionService::get_plain(&pool, pass.id).await.unwrap();
        assert_eq!(after_one.lessons_remaining, 1);
        assert_eq!(after_one.status, SubscriptionStatus::Active);

        // Editing an already completed lesson charges nothing more.
        let mut again = complete();
        again.notes = Some(Some("хорошо держался в седле".into()));
        LessonService::update(&pool, first.lesson.id, &again).await.unwrap();
        assert_eq!(
            SubscriptionService::get_plain(&pool, pass.id).await.unwrap().lessons_remaining,
            1
        );

        // An unlinked lesson is charged to the client's pass and linked to it.
        let second = LessonService::create(&pool, &planned(&s, None)).await.unwrap();
        let completed = LessonService::update(&pool, second.lesson.id, &complete()).await.unwrap();
        assert_eq!(completed.lesson.subscription_id, Some(pass.id));

        let used = SubscriptionService::get_plain(&pool, pass.id).await.unwrap();
        assert_eq!(used.lessons_remaining, 0);
        assert_eq!(used.status, SubscriptionStatus::Used);
        assert!(used.used_at.is_some());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn completion_without_a_pass_still_completes(pool: PgPool) {
        let s = stable(&pool, "Смирнова Ольга").await;
        let lesson = LessonService::create(&pool, &planned(&s, None)).await.unwrap();

        let completed = LessonService::update(&pool, lesson.lesson.id, &complete()).await.unwrap();
        assert_eq!(completed.lesson.status, LessonStatus::Completed);
        assert_eq!(completed.lesson.subscription_id, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn exhausted_or_overdue_pass_is_not_charged(pool: PgPool) {
        let s = stable(&pool, "Кузнецов Тимур").await;

        // Past its date but the hourly sweep has not run yet.
        let overdue = subscription(&pool, s.client, 4, Some(Utc::now() - Duration::hours(1))).await;
        let lesson = LessonService::create(&pool, &planned(&s, Some(overdue.id))).await.unwrap();
        let completed = LessonService::update(&pool, lesson.lesson.id, &complete()).await.unwrap();
        assert_eq!(completed.lesson.status, LessonStatus::Completed);
        assert_eq!(
            SubscriptionService::get_plain(&pool, overdue.id).await.unwrap().lessons_remaining,
            4
        );

        let single = subscription(&pool, s.client, 1, None).await;
        let a = LessonService::create(&pool, &planned(&s, Some(single.id))).await.unwrap();
        let b = LessonService::create(&pool, &planned(&s, Some(single.id))).await.unwrap();
        LessonService::update(&pool, a.lesson.id, &complete()).await.unwrap();
        let completed = LessonService::update(&pool, b.lesson.id, &complete()).await.unwrap();
        assert_eq!(completed.lesson.status, LessonStatus::Completed);

        let spent = SubscriptionService::get_plain(&pool, single.id).await.unwrap();
        assert_eq!(spent.lessons_remaining, 0);
        assert_eq!(spent.status, SubscriptionStatus::Used);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn another_clients_pass_is_rejected(pool: PgPool) {
        let owner = stable(&pool, "Иванова Анна").await;
        let other = stable(&pool, "Петров Илья").await;
        let pass = subscription(&pool, owner.client, 5, None).await;

        let lesson = LessonService::create(&pool, &planned(&other, Some(pass.id))).await.unwrap();
        let result = LessonService::update(&pool, lesson.lesson.id, &complete()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        // The failed completion rolled back.
        let unchanged = LessonService::get(&pool, lesson.lesson.id).await.unwrap();
        assert_eq!(unchanged.lesson.status, LessonStatus::Planned);
        assert_eq!(
            SubscriptionService::get_plain(&pool, pass.id).await.unwrap().lessons_remaining,
            5
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn null_unlinks_subscription_and_clears_notes(pool: PgPool) {
        let s = stable(&pool, "Иванова Анна").await;
        let pass = subscription(&pool, s.client, 3, None).await;
        let mut req = planned(&s, Some(pass.id));
        req.notes = Some("первое занятие".into());
        let lesson = LessonService::create(&pool, &req).await.unwrap();

        let keep: UpdateLessonRequest = serde_json::from_str(r#"{"duration":60}"#).unwrap();
        let kept = LessonService::update(&pool, lesson.lesson.id, &keep).await.unwrap();
        assert_eq!(kept.lesson.notes.as_deref(), Some("первое занятие"));
        assert_eq!(kept.lesson.subscription_id, Some(pass.id));

        let clear: UpdateLessonRequest =
            serde_json::from_str(r#"{"notes":null,"subscriptionId":null}"#).unwrap();
        let cleared = LessonService::update(&pool, lesson.lesson.id, &clear).await.unwrap();
        assert_eq!(cleared.lesson.notes, None);
        assert_eq!(cleared.lesson.subscription_id, None);
        assert!(cleared.subscription.is_none());
    }
}
