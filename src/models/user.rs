use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Observer,
    Instructor,
    Administrator,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::Observer => "observer",
            UserRole::Instructor => "instructor",
            UserRole::Administrator => "administrator",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub vk_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

// Request DTOs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VkLoginRequest {
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_from_wire_names() {
        let req: UpdateRoleRequest = serde_json::from_str(r#"{"role":"instructor"}"#).unwrap();
        assert_eq!(req.role, UserRole::Instructor);
        assert!(serde_json::from_str::<UpdateRoleRequest>(r#"{"role":"owner"}"#).is_err());
    }

    #[test]
    fn user_serializes_camel_case() {
        let user = User {
            id: Uuid::nil(),
            vk_id: Some("42".into()),
            name: "Анна Петрова".into(),
            email: None,
            role: UserRole::Administrator,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(user).unwrap();
        assert_eq!(value["vkId"], "42");
        assert_eq!(value["role"], "administrator");
        assert!(value.get("createdAt").is_some());
    }
}
