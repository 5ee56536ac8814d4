use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        auth::{AuthenticatedUser, SessionClaims, VkProfile},
        user::{User, UserRole},
    },
};

/// A freshly issued session: the signed token and its lifetime in seconds.
pub struct IssuedSession {
    pub token: String,
    pub max_age_secs: i64,
}

pub struct AuthService;

impl AuthService {
    /// Finds the user bound to a VK account, creating it on first login.
    ///
    /// The configured admin VK id is created as an administrator; existing users keep their role.
    pub async fn upsert_vk_user(
        pool: &PgPool,
        profile: &VkProfile,
        admin_vk_id: Option<&str>,
    ) -> AppResult<User> {
        let vk_id = profile.id.to_string();
        let role = if admin_vk_id == Some(vk_id.as_str()) {
            UserRole::Administrator
        } else {
            UserRole::Observer
        };

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (vk_id, name, email, role)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (vk_id) DO UPDATE SET vk_id = EXCLUDED.vk_id
             RETURNING id, vk_id, name, email, role, created_at",
        )
        .bind(&vk_id)
        .bind(profile.full_name())
        .bind(&profile.email)
        .bind(role)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }

    /// Stores a session row and signs a token referencing it.
    pub async fn issue_session(
        pool: &PgPool,
        user_id: Uuid,
        secret: &str,
        ttl_hours: u64,
    ) -> AppResult<IssuedSession> {
        let ttl = Duration::hours(ttl_hours as i64);
        let expires_at = Utc::now() + ttl;

        let session_id: Uuid = sqlx::query_scalar(
            "INSERT INTO sessions (user_id, expires_at) VALUES ($1, $2) RETURNING id",
        )
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        let token = Self::sign(user_id, session_id, secret, ttl.num_seconds() as usize)?;
        Ok(IssuedSession { token, max_age_secs: ttl.num_seconds() })
    }

    pub fn sign(
        user_id: Uuid,
        session_id: Uuid,
        secret: &str,
        ttl_seconds: usize,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = SessionClaims {
            sub: user_id.to_string(),
            jti: session_id.to_string(),
            iat: now,
            exp: now + ttl_seconds,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Verifies signature and expiry, returning `(user_id, session_id)`.
    pub fn verify(token: &str, secret: &str) -> anyhow::Result<(Uuid, Uuid)> {
        let key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let claims = decode::<SessionClaims>(token, &key, &validation)?.claims;
        Ok((claims.sub.parse()?, claims.jti.parse()?))
    }

    /// Loads the user behind a live session. Revoked or expired sessions yield `None`.
    pub async fn session_user(
        pool: &PgPool,
        user_id: Uuid,
        session_id: Uuid,
    ) -> AppResult<Option<AuthenticatedUser>> {
        let row: Option<(String, UserRole)> = sqlx::query_as(
            "SELECT u.name, u.role
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.id = $1 AND s.user_id = $2
               AND s.revoked = FALSE AND s.expires_at > NOW()",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(name, role)| AuthenticatedUser { user_id, session_id, name, role }))
    }

    pub async fn revoke(pool: &PgPool, session_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE sessions SET revoked = TRUE WHERE id = $1")
            .bind(session_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn get_user(pool: &PgPool, user_id: Uuid) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, vk_id, name, email, role, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;
        Ok(user)
    }

    /// Drops sessions that expired more than a day ago.
    pub async fn purge_expired_sessions(pool: &PgPool) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE expires_at < NOW() - INTERVAL '1 day'",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_token_round_trips_ids() {
        let user = Uuid::new_v4();
        let session = Uuid::new_v4();
        let token = AuthService::sign(user, session, "secret", 3600).unwrap();
        assert_eq!(AuthService::verify(&token, "secret").unwrap(), (user, session));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = AuthService::sign(Uuid::new_v4(), Uuid::new_v4(), "secret", 3600).unwrap();
        assert!(AuthService::verify(&token, "other").is_err());
        assert!(AuthService::verify("not-a-jwt", "secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp() as usize;
        let claims = SessionClaims {
            sub: Uuid::new_v4().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(AuthService::verify(&token, "secret").is_err());
    }
}
