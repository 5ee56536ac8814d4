use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::client::Client;
use crate::error::{AppError, AppResult};

pub const DEFAULT_DURATION_MONTHS: i32 = 6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Used,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub client_id: Uuid,
    pub lessons_remaining: i32,
    pub total_lessons: i32,
    pub duration_months: i32,
    pub status: SubscriptionStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Active, not past its expiry date, with at least one lesson left.
    ///
    /// The expiry sweep runs hourly, so `expires_at` is checked alongside the status.
    pub fn is_chargeable(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.lessons_remaining > 0
            && self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionWithClient {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub client: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub client_id: Uuid,
    pub total_lessons: i32,
    pub lessons_remaining: Option<i32>,
    pub duration_months: Option<i32>,
    pub status: Option<SubscriptionStatus>,
    #[serde(default, deserialize_with = "crate::dates::deserialize_optional")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub total_lessons: Option<i32>,
    pub lessons_remaining: Option<i32>,
    pub duration_months: Option<i32>,
    pub status: Option<SubscriptionStatus>,
    #[serde(default, deserialize_with = "crate::dates::deserialize_nullable")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

/// Fully resolved values for a new subscription row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub client_id: Uuid,
    pub total_lessons: i32,
    pub lessons_remaining: i32,
    pub duration_months: i32,
    pub status: SubscriptionStatus,
    pub expires_at: DateTime<Utc>,
}

fn check_counts(total: i32, remaining: i32) -> AppResult<()> {
    if total < 1 {
        return Err(AppError::validation("totalLessons must be at least 1"));
    }
    if remaining < 0 || remaining > total {
        return Err(AppError::validation(
            "lessonsRemaining must be between 0 and totalLessons",
        ));
    }
    Ok(())
}

impl CreateSubscriptionRequest {
    /// Validates the request and fills in defaults relative to `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> AppResult<NewSubscription> {
        let remaining = self.lessons_remaining.unwrap_or(self.total_lessons);
        check_counts(self.total_lessons, remaining)?;

        let duration_months = self.duration_months.unwrap_or(DEFAULT_DURATION_MONTHS);
        if duration_months < 1 {
            return Err(AppError::validation("durationMonths must be at least 1"));
        }

        let expires_at = match self.expires_at {
            Some(at) => at,
            None => now
                .checked_add_months(Months::new(duration_months as u32))
                .ok_or_else(|| AppError::validation("durationMonths is too large"))?,
        };

        let status = match self.status {
            Some(s) => s,
            None if remaining == 0 => SubscriptionStatus::Used,
            None => SubscriptionStatus::Active,
        };

        Ok(NewSubscription {
            client_id: self.client_id,
            total_lessons: self.total_lessons,
            lessons_remaining: remaining,
            duration_months,
            status,
            expires_at,
        })
    }
}

impl UpdateSubscriptionRequest {
    /// Validates the update against the row it will be applied to.
    pub fn validate_against(&self, current: &Subscription) -> AppResult<()> {
        let total = self.total_lessons.unwrap_or(current.total_lessons);
        let remaining = self.lessons_remaining.unwrap_or(current.lessons_remaining);
        check_counts(total, remaining)?;
        if matches!(self.duration_months, Some(m) if m < 1) {
            return Err(AppError::validation("durationMonths must be at least 1"));
        }
        Ok(())
    }
}

/// Remaining count and status after one lesson is taken from a subscription.
///
/// Returns `None` when nothing is left to deduct.
pub fn after_deduction(lessons_remaining: i32) -> Option<(i32, SubscriptionStatus)> {
    if lessons_remaining <= 0 {
        return None;
    }
    let left = lessons_remaining - 1;
    let status = if left == 0 {
        SubscriptionStatus::Used
    } else {
        SubscriptionStatus::Active
    };
    Some((left, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(total: i32, remaining: Option<i32>) -> CreateSubscriptionRequest {
        CreateSubscriptionRequest {
            client_id: Uuid::nil(),
            total_lessons: total,
            lessons_remaining: remaining,
            duration_months: None,
            status: None,
            expires_at: None,
        }
    }

    #[test]
    fn deduction_decrements_by_one_and_flips_to_used() {
        assert_eq!(after_deduction(8), Some((7, SubscriptionStatus::Active)));
        assert_eq!(after_deduction(1), Some((0, SubscriptionStatus::Used)));
    }

    #[test]
    fn deduction_never_goes_negative() {
        assert_eq!(after_deduction(0), None);
        assert_eq!(after_deduction(-3), None);
    }

    #[test]
    fn resolve_defaults_remaining_and_expiry() {
        let now = DateTime::parse_from_rfc3339("2024-08-31T10:00:00Z").unwrap().with_timezone(&Utc);
        let resolved = request(8, None).resolve(now).unwrap();
        assert_eq!(resolved.lessons_remaining, 8);
        assert_eq!(resolved.duration_months, DEFAULT_DURATION_MONTHS);
        assert_eq!(resolved.status, SubscriptionStatus::Active);
        // Month arithmetic clamps to the end of a shorter month.
        assert_eq!(resolved.expires_at.to_rfc3339(), "2025-02-28T10:00:00+00:00");
    }

    #[test]
    fn chargeable_needs_active_status_lessons_and_time_left() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z").unwrap().with_timezone(&Utc);
        let mut sub = Subscription {
            id: Uuid::nil(),
            client_id: Uuid::nil(),
            lessons_remaining: 3,
            total_lessons: 8,
            duration_months: 6,
            status: SubscriptionStatus::Active,
            expires_at: Some(now + chrono::Duration::days(30)),
            created_at: now,
            used_at: None,
        };
        assert!(sub.is_chargeable(now));

        // Past its date but not yet swept.
        sub.expires_at = Some(now - chrono::Duration::minutes(5));
        assert!(!sub.is_chargeable(now));

        sub.expires_at = None;
        assert!(sub.is_chargeable(now));

        sub.lessons_remaining = 0;
        assert!(!sub.is_chargeable(now));

        sub.lessons_remaining = 3;
        sub.status = SubscriptionStatus::Expired;
        assert!(!sub.is_chargeable(now));
    }

    #[test]
    fn resolve_rejects_inconsistent_counts() {
        let now = Utc::now();
        assert!(request(0, None).resolve(now).is_err());
        assert!(request(4, Some(5)).resolve(now).is_err());
        assert!(request(4, Some(-1)).resolve(now).is_err());
        assert_eq!(
            request(4, Some(0)).resolve(now).unwrap().status,
            SubscriptionStatus::Used
        );
    }
}
