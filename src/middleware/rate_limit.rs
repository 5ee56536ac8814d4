use tracing::warn;

use crate::error::{AppError, AppResult};

/// Checks a rate limit stored in Redis.
///
/// Uses the INCR + EXPIRE strategy:
/// - Increments a counter for `key`
/// - On first increment, sets TTL to `window_secs`
/// - Returns 429 if counter exceeds `max_attempts`
///
/// When Redis cannot be reached the request is let through.
pub async fn check_rate_limit(
    redis: &redis::Client,
    key: &str,
    max_attempts: u64,
    window_secs: u64,
) -> AppResult<()> {
    let mut conn = match redis.get_multiplexed_async_connection().await {
        Ok(conn) => conn,
        Err(e) => {
            warn!("Rate limit skipped, Redis unavailable: {e}");
            return Ok(());
        }
    };

    let count: u64 = match redis::cmd("INCR").arg(key).query_async(&mut conn).await {
        Ok(count) => count,
        Err(e) => {
            warn!("Rate limit skipped, INCR failed: {e}");
            return Ok(());
        }
    };

    if count == 1 {
        // TTL only on first hit so retries don't extend the window
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .query_async(&mut conn)
            .await;
    }

    if count > max_attempts {
        return Err(AppError::TooManyRequests);
    }

    Ok(())
}
