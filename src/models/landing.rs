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
pub struct LandingContent {
    pub id: Uuid,
    pub section: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub is_visible: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLandingContentRequest {
    pub section: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub is_visible: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLandingContentRequest {
    pub section: Option<String>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub title: Nullable<String>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub content: Nullable<String>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub image_url: Nullable<String>,
    pub is_visible: Option<bool>,
}

impl CreateLandingContentRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.section.trim().is_empty() {
            return Err(AppError::validation("Section is required"));
        }
        Ok(())
    }
}

impl UpdateLandingContentRequest {
    pub fn validate(&self) -> AppResult<()> {
        if matches!(&self.section, Some(s) if s.trim().is_empty()) {
            return Err(AppError::validation("Section cannot be empty"));
        }
        Ok(())
    }
}
