use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::patch::Nullable,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "certificate_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Active,
    Used,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: Uuid,
    pub number: String,
    pub client_id: Option<Uuid>,
    pub value: Decimal,
    pub status: CertificateStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCertificateRequest {
    pub number: Option<String>,
    pub client_id: Option<Uuid>,
    pub value: Decimal,
    pub status: Option<CertificateStatus>,
    #[serde(default, deserialize_with = "crate::dates::deserialize_optional")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCertificateRequest {
    pub number: Option<String>,
    #[serde(default, deserialize_with = "crate::models::patch::nullable")]
    pub client_id: Nullable<Uuid>,
    pub value: Option<Decimal>,
    pub status: Option<CertificateStatus>,
    #[serde(default, deserialize_with = "crate::dates::deserialize_nullable")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl CreateCertificateRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.value <= Decimal::ZERO {
            return Err(AppError::validation("Value must be positive"));
        }
        Ok(())
    }

    /// The requested number, or a freshly generated one when blank.
    pub fn number_or_generated(&self) -> String {
        match self.number.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => generate_number(),
        }
    }
}

impl UpdateCertificateRequest {
    pub fn validate(&self) -> AppResult<()> {
        if matches!(self.value, Some(v) if v <= Decimal::ZERO) {
            return Err(AppError::validation("Value must be positive"));
        }
        if matches!(&self.number, Some(n) if n.trim().is_empty()) {
            return Err(AppError::validation("Number cannot be empty"));
        }
        Ok(())
    }
}

/// Random 8-digit certificate number.
pub fn generate_number() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..100_000_000);
    format!("{n:08}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_numbers_are_eight_digits() {
        for _ in 0..50 {
            let n = generate_number();
            assert_eq!(n.len(), 8);
            assert!(n.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn value_accepts_string_or_number() {
        let a: CreateCertificateRequest = serde_json::from_str(r#"{"value":"3000.50"}"#).unwrap();
        let b: CreateCertificateRequest = serde_json::from_str(r#"{"value":3000.5}"#).unwrap();
        assert_eq!(a.value, b.value);
        assert!(a.validate().is_ok());
    }

    #[test]
    fn blank_number_is_generated() {
        let req: CreateCertificateRequest =
            serde_json::from_str(r#"{"number":"  ","value":1000}"#).unwrap();
        assert_eq!(req.number_or_generated().len(), 8);

        let req: CreateCertificateRequest =
            serde_json::from_str(r#"{"number":"A-17","value":1000}"#).unwrap();
        assert_eq!(req.number_or_generated(), "A-17");
    }

    #[test]
    fn zero_value_is_rejected() {
        let req: CreateCertificateRequest = serde_json::from_str(r#"{"value":0}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
