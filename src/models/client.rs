use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::patch::Nullable,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub phone: Nullable<String>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub email: Nullable<String>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub notes: Nullable<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClientSearchQuery {
    pub search: Option<String>,
}

impl CreateClientRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Name is required"));
        }
        Ok(())
    }
}

impl UpdateClientRequest {
    pub fn validate(&self) -> AppResult<()> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(AppError::validation("Name cannot be empty"));
        }
        Ok(())
    }
}

/// LIKE pattern for a case-insensitive substring search, with wildcards escaped.
pub fn search_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_pattern_lowercases_and_escapes() {
        assert_eq!(search_pattern(" Иванов "), "%иванов%");
        assert_eq!(search_pattern("50%_off"), "%50\\%\\_off%");
    }
}
