use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserRole;

/// Claims embedded in the session JWT carried by the `sid` cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // user UUID
    pub jti: String, // session row UUID (to enable revocation)
    pub exp: usize,
    pub iat: usize,
}

/// Resolved from a live session. Available via Axum extractors.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub role: UserRole,
}

/// Profile returned by VK `users.get`.
#[derive(Debug, Clone, Deserialize)]
pub struct VkProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl VkProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}
