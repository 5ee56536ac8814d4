use sqlx::PgPool;
use tracing::{info, warn};

use crate::{error::AppResult, services::auth::AuthService};

const SWEEP_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub subscriptions: u64,
    pub certificates: u64,
}

/// Spawn the hourly pass-expiry sweep.
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        loop {
            match sweep(&pool, false).await {
                Ok(report) if report.subscriptions + report.certificates > 0 => info!(
                    subscriptions = report.subscriptions,
                    certificates = report.certificates,
                    "Expiry sweep: passes expired"
                ),
                Ok(_) => {}
                Err(e) => warn!("Expiry sweep failed: {}", e),
            }
            if let Err(e) = AuthService::purge_expired_sessions(&pool).await {
                warn!("Session cleanup failed: {}", e);
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
        }
    });
}

/// Marks active subscriptions and certificates past their expiry date as `expired`.
/// With `dry_run` the rows are only counted.
pub async fn sweep(pool: &PgPool, dry_run: bool) -> AppResult<SweepReport> {
    if dry_run {
        let (subscriptions, certificates): (i64, i64) = sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM subscriptions WHERE status = 'active' AND expires_at < NOW()),
                (SELECT COUNT(*) FROM certificates WHERE status = 'active' AND expires_at < NOW())",
        )
        .fetch_one(pool)
        .await?;
        return Ok(SweepReport {
            subscriptions: subscriptions as u64,
            certificates: certificates as u64,
        });
    }

    let mut tx = pool.begin().await?;
    let subscriptions = sqlx::query(
        "UPDATE subscriptions SET status = 'expired'
         WHERE status = 'active' AND expires_at < NOW()",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();
    let certificates = sqlx::query(
        "UPDATE certificates SET status = 'expired'
         WHERE status = 'active' AND expires_at < NOW()",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;

    Ok(SweepReport { subscriptions, certificates })
}
