use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_int_counter, CounterVec, Gauge,
    GaugeVec, IntCounter,
};
use sqlx::PgPool;
use tracing::{info, warn};

lazy_static! {
    // ── Event counters ──────────────────────────────────────────────────────
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "stable_logins_total",
        "VK login attempts by outcome",
        &["status"]
    ).unwrap();

    pub static ref LESSONS_COMPLETED_COUNTER: CounterVec = register_counter_vec!(
        "stable_lessons_completed_total",
        "Lessons moved to completed, by payment type",
        &["payment_type"]
    ).unwrap();

    pub static ref HORSES_ARCHIVED_COUNTER: IntCounter = register_int_counter!(
        "stable_horses_archived_total",
        "Horse deletions that kept an archived record"
    ).unwrap();

    // ── Business gauges ─────────────────────────────────────────────────────
    pub static ref LESSONS_GAUGE: GaugeVec = register_gauge_vec!(
        "stable_lessons",
        "Lessons by status",
        &["status"]
    ).unwrap();

    pub static ref HORSES_GAUGE: GaugeVec = register_gauge_vec!(
        "stable_horses",
        "Horses by status",
        &["status"]
    ).unwrap();

    pub static ref ACTIVE_SUBSCRIPTIONS_GAUGE: Gauge = register_gauge!(
        "stable_subscriptions_active",
        "Subscriptions in active status"
    ).unwrap();

    pub static ref ACTIVE_CERTIFICATES_GAUGE: Gauge = register_gauge!(
        "stable_certificates_active",
        "Certificates in active status"
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let lessons: Vec<(String, i64)> =
        sqlx::query_as("SELECT status::TEXT, COUNT(*)::BIGINT FROM lessons GROUP BY status")
            .fetch_all(pool)
            .await?;
    LESSONS_GAUGE.reset();
    for (status, count) in lessons {
        LESSONS_GAUGE.with_label_values(&[&status]).set(count as f64);
    }

    let horses: Vec<(String, i64)> =
        sqlx::query_as("SELECT status::TEXT, COUNT(*)::BIGINT FROM horses GROUP BY status")
            .fetch_all(pool)
            .await?;
    HORSES_GAUGE.reset();
    for (status, count) in horses {
        HORSES_GAUGE.with_label_values(&[&status]).set(count as f64);
    }

    let subscriptions: i64 =
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM subscriptions WHERE status = 'active'")
            .fetch_one(pool)
            .await?;
    ACTIVE_SUBSCRIPTIONS_GAUGE.set(subscriptions as f64);

    let certificates: i64 =
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM certificates WHERE status = 'active'")
            .fetch_one(pool)
            .await?;
    ACTIVE_CERTIFICATES_GAUGE.set(certificates as f64);

    info!("Metrics: collected");
    Ok(())
}
