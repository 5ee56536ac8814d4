use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::patch::Nullable,
};

/// Prefix given to a horse that was deleted but must be kept for lesson history.
pub const ARCHIVED_PREFIX: &str = "[УДАЛЕНО] ";

const MAX_AGE: i32 = 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "horse_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HorseStatus {
    Active,
    Rest,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Horse {
    pub id: Uuid,
    pub nickname: String,
    pub breed: String,
    pub age: i32,
    pub status: HorseStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHorseRequest {
    pub nickname: String,
    pub breed: String,
    pub age: i32,
    pub status: Option<HorseStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHorseRequest {
    pub nickname: Option<String>,
    pub breed: Option<String>,
    pub age: Option<i32>,
    pub status: Option<HorseStatus>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub notes: Nullable<String>,
}

/// What happened to a horse on delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HorseRemoval {
    Deleted,
    Archived,
}

fn check_age(age: i32) -> AppResult<()> {
    if !(0..=MAX_AGE).contains(&age) {
        return Err(AppError::validation(format!("Age must be between 0 and {MAX_AGE}")));
    }
    Ok(())
}

impl CreateHorseRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.nickname.trim().is_empty() {
            return Err(AppError::validation("Nickname is required"));
        }
        if self.breed.trim().is_empty() {
            return Err(AppError::validation("Breed is required"));
        }
        check_age(self.age)
    }
}

impl UpdateHorseRequest {
    pub fn validate(&self) -> AppResult<()> {
        if matches!(&self.nickname, Some(n) if n.trim().is_empty()) {
            return Err(AppError::validation("Nickname cannot be empty"));
        }
        if matches!(&self.breed, Some(b) if b.trim().is_empty()) {
            return Err(AppError::validation("Breed cannot be empty"));
        }
        match self.age {
            Some(age) => check_age(age),
            None => Ok(()),
        }
    }
}

/// Nickname for a horse kept only for history. Already-archived names are left alone.
pub fn archived_nickname(nickname: &str) -> String {
    if nickname.starts_with(ARCHIVED_PREFIX) {
        nickname.to_string()
    } else {
        format!("{ARCHIVED_PREFIX}{nickname}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archived_nickname_is_prefixed_once() {
        let once = archived_nickname("Буран");
        assert_eq!(once, "[УДАЛЕНО] Буран");
        assert_eq!(archived_nickname(&once), once);
    }

    #[test]
    fn create_rejects_blank_fields_and_bad_age() {
        let mut req = CreateHorseRequest {
            nickname: "Звёздочка".into(),
            breed: "Орловский рысак".into(),
            age: 9,
            status: None,
            notes: None,
        };
        assert!(req.validate().is_ok());

        req.age = -1;
        assert!(req.validate().is_err());

        req.age = 9;
        req.nickname = "   ".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_allows_partial_bodies() {
        assert!(UpdateHorseRequest::default().validate().is_ok());

        let req: UpdateHorseRequest = serde_json::from_str(r#"{"status":"rest"}"#).unwrap();
        assert_eq!(req.status, Some(HorseStatus::Rest));
        assert!(req.validate().is_ok());

        let req = UpdateHorseRequest { breed: Some(String::new()), ..Default::default() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_distinguishes_null_notes_from_missing_notes() {
        let req: UpdateHorseRequest = serde_json::from_str(r#"{"notes":null}"#).unwrap();
        assert_eq!(req.notes, Some(None));
        let req: UpdateHorseRequest = serde_json::from_str(r#"{"age":7}"#).unwrap();
        assert_eq!(req.notes, None);
    }
}
