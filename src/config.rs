use std::env;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub session_secret: String,
    pub session_ttl_hours: u64,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
    pub cookie_secure: bool,
    // VK social login
    pub admin_vk_id: Option<String>,
    pub vk_api_url: String,
    pub vk_api_version: String,
    /// Offset of the stable's wall clock from UTC, used for month boundaries
    /// and date-only query parameters.
    pub utc_offset_hours: i32,
    pub calendar_feed_token: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            session_secret: required("SESSION_SECRET")?,
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "168".into())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            admin_vk_id: env::var("ADMIN_VK_ID").ok().filter(|s| !s.is_empty()),
            vk_api_url: env::var("VK_API_URL").unwrap_or_else(|_| "https://api.vk.com".into()),
            vk_api_version: env::var("VK_API_VERSION").unwrap_or_else(|_| "5.199".into()),
            utc_offset_hours: env::var("STABLE_UTC_OFFSET_HOURS")
                .unwrap_or_else(|_| "3".into())
                .parse()?,
            calendar_feed_token: env::var("CALENDAR_FEED_TOKEN").ok().filter(|s| !s.is_empty()),
        })
    }

    /// The stable's local offset. Falls back to UTC for out-of-range values.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
