use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{
    certificate::Certificate, client::Client, horse::Horse, instructor::Instructor,
    patch::Nullable, subscription::Subscription,
};
use crate::error::{AppError, AppResult};

pub const DEFAULT_DURATION_MINUTES: i32 = 45;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "lesson_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    Hippotherapy,
    BeginnerRiding,
    AdvancedRiding,
    Walk,
    MountedArchery,
}

impl LessonType {
    /// Label shown to the stable's staff and in calendar exports.
    pub fn label(self) -> &'static str {
        match self {
            LessonType::Hippotherapy => "Иппотерапия",
            LessonType::BeginnerRiding => "Верховая езда новичок",
            LessonType::AdvancedRiding => "Верховая езда опытный",
            LessonType::Walk => "Прогулка",
            LessonType::MountedArchery => "Конная стрельба из лука",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Subscription,
    Certificate,
}

impl PaymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Subscription => "subscription",
            PaymentType::Certificate => "certificate",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "lesson_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Planned,
    Completed,
    Cancelled,
}

impl LessonStatus {
    pub fn label(self) -> &'static str {
        match self {
            LessonStatus::Planned => "Запланировано",
            LessonStatus::Completed => "Завершено",
            LessonStatus::Cancelled => "Отменено",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: Uuid,
    pub client_id: Uuid,
    pub date: DateTime<Utc>,
    pub duration: i32,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub lesson_type: LessonType,
    pub payment_type: PaymentType,
    pub cost: Decimal,
    pub status: LessonStatus,
    pub is_paid: bool,
    pub notes: Option<String>,
    pub certificate_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonInstructor {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub instructor_id: Uuid,
    pub instructor: Instructor,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonHorse {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub horse_id: Uuid,
    pub horse: Horse,
}

/// A lesson with its client, payment source, instructors and horses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonWithRelations {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub client: Client,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    pub lesson_instructors: Vec<LessonInstructor>,
    pub lesson_horses: Vec<LessonHorse>,
}

/// Join row with the instructor flattened in, as loaded by the lesson service.
#[derive(Debug, Clone, FromRow)]
pub struct LessonInstructorRow {
    pub link_id: Uuid,
    pub lesson_id: Uuid,
    #[sqlx(flatten)]
    pub instructor: Instructor,
}

#[derive(Debug, Clone, FromRow)]
pub struct LessonHorseRow {
    pub link_id: Uuid,
    pub lesson_id: Uuid,
    #[sqlx(flatten)]
    pub horse: Horse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonRequest {
    pub client_id: Uuid,
    #[serde(deserialize_with = "crate::dates::deserialize")]
    pub date: DateTime<Utc>,
    pub duration: Option<i32>,
    #[serde(rename = "type")]
    pub lesson_type: LessonType,
    pub payment_type: PaymentType,
    pub cost: Decimal,
    pub status: Option<LessonStatus>,
    pub is_paid: Option<bool>,
    pub notes: Option<String>,
    pub certificate_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    #[serde(default)]
    pub instructor_ids: Vec<Uuid>,
    #[serde(default)]
    pub horse_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLessonRequest {
    pub client_id: Option<Uuid>,
    #[serde(default, deserialize_with = "crate::dates::deserialize_optional")]
    pub date: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    #[serde(rename = "type")]
    pub lesson_type: Option<LessonType>,
    pub payment_type: Option<PaymentType>,
    pub cost: Option<Decimal>,
    pub status: Option<LessonStatus>,
    pub is_paid: Option<bool>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub notes: Nullable<String>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub certificate_id: Nullable<Uuid>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub subscription_id: Nullable<Uuid>,
    pub instructor_ids: Option<Vec<Uuid>>,
    pub horse_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn check_duration(duration: i32) -> AppResult<()> {
    if duration <= 0 {
        return Err(AppError::validation("Duration must be positive"));
    }
    Ok(())
}

fn check_cost(cost: Decimal) -> AppResult<()> {
    if cost.is_sign_negative() && !cost.is_zero() {
        return Err(AppError::validation("Cost cannot be negative"));
    }
    Ok(())
}

impl CreateLessonRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.instructor_ids.is_empty() {
            return Err(AppError::validation("At least one instructor is required"));
        }
        if self.horse_ids.is_empty() {
            return Err(AppError::validation("At least one horse is required"));
        }
        check_duration(self.duration.unwrap_or(DEFAULT_DURATION_MINUTES))?;
        check_cost(self.cost)
    }
}

impl UpdateLessonRequest {
    pub fn validate(&self) -> AppResult<()> {
        if matches!(&self.instructor_ids, Some(ids) if ids.is_empty()) {
            return Err(AppError::validation("At least one instructor is required"));
        }
        if matches!(&self.horse_ids, Some(ids) if ids.is_empty()) {
            return Err(AppError::validation("At least one horse is required"));
        }
        if let Some(d) = self.duration {
            check_duration(d)?;
        }
        if let Some(c) = self.cost {
            check_cost(c)?;
        }
        Ok(())
    }
}

/// Whether an update moves a lesson into `completed`, which is when payment is settled.
pub fn completes(previous: LessonStatus, next: LessonStatus) -> bool {
    previous != LessonStatus::Completed && next == LessonStatus::Completed
}

/// Drops repeated ids while keeping the caller's order.
pub fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
