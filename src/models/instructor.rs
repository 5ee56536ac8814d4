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
pub struct Instructor {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub specializations: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstructorRequest {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstructorRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub phone: Nullable<String>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub email: Nullable<String>,
    pub specializations: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct InstructorListQuery {
    pub active: Option<bool>,
}

impl CreateInstructorRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Name is required"));
        }
        Ok(())
    }
}

impl UpdateInstructorRequest {
    pub fn validate(&self) -> AppResult<()> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(AppError::validation("Name cannot be empty"));
        }
        Ok(())
    }
}
