//! Date helpers shared by query parameters, request bodies and statistics.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{AppError, AppResult};

/// Parses either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
///
/// Bare dates are read in the stable's local offset, at the start of the day
/// or, when `end_of_day` is set, at its last second.
pub fn parse_datetime(raw: &str, offset: FixedOffset, end_of_day: bool) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)?
    } else {
        NaiveTime::MIN
    };
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Inclusive `[start, end]` window from optional query parameters.
///
/// Defaults run from the first day of the current local month to now.
pub fn range_or_current_month(
    start: Option<&str>,
    end: Option<&str>,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = match start.filter(|s| !s.trim().is_empty()) {
        Some(raw) => parse_datetime(raw, offset, false)
            .ok_or_else(|| AppError::validation(format!("Invalid startDate: {raw}")))?,
        None => {
            let local = now.with_timezone(&offset);
            month_bounds(local.year(), local.month(), offset)?.0
        }
    };
    let end = match end.filter(|s| !s.trim().is_empty()) {
        Some(raw) => parse_datetime(raw, offset, true)
            .ok_or_else(|| AppError::validation(format!("Invalid endDate: {raw}")))?,
        None => now,
    };
    if end < start {
        return Err(AppError::validation("endDate must not be before startDate"));
    }
    Ok((start, end))
}

/// Optional query bound; blank values count as absent.
pub fn parse_bound(
    raw: Option<&str>,
    offset: FixedOffset,
    end_of_day: bool,
    name: &str,
) -> AppResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_datetime(s, offset, end_of_day)
            .map(Some)
            .ok_or_else(|| AppError::validation(format!("Invalid {name}: {s}"))),
    }
}

/// Half-open `[first instant of month, first instant of next month)` in the given offset.
pub fn month_bounds(
    year: i32,
    month: u32,
    offset: FixedOffset,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let invalid = || AppError::validation(format!("Invalid month: {year}-{month}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;

    let to_utc = |d: NaiveDate| {
        offset
            .from_local_datetime(&d.and_time(NaiveTime::MIN))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(invalid)
    };
    Ok((to_utc(first)?, to_utc(next)?))
}

/// Serde helper for optional body timestamps that may arrive as bare dates (read as UTC midnight).
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_datetime(s, Utc.fix(), false)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {s}"))),
    }
}

/// Patch variant of [`deserialize_optional`]: `null` or `""` clears, an absent key keeps.
pub fn deserialize_nullable<'de, D>(deserializer: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional(deserializer).map(Some)
}

/// Required variant of [`deserialize_optional`].
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional(deserializer)?.ok_or_else(|| serde::de::Error::custom("date is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moscow() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    #[test]
    fn parses_rfc3339_and_bare_dates() {
        let dt = parse_datetime("2024-05-10T09:30:00Z", moscow(), false).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-05-10T09:30:00+00:00");

        let start = parse_datetime("2024-05-10", moscow(), false).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-05-09T21:00:00+00:00");

        let end = parse_datetime("2024-05-10", moscow(), true).unwrap();
        assert_eq!(end.to_rfc3339(), "2024-05-10T20:59:59+00:00");

        assert!(parse_datetime("10.05.2024", moscow(), false).is_none());
    }

    #[test]
    fn month_bounds_wrap_december() {
        let (start, end) = month_bounds(2024, 12, moscow()).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-11-30T21:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-12-31T21:00:00+00:00");
        assert!(month_bounds(2024, 13, moscow()).is_err());
    }

    #[test]
    fn default_range_starts_at_local_month() {
        let now = DateTime::parse_from_rfc3339("2024-03-15T12:00:00Z").unwrap().with_timezone(&Utc);
        let (start, end) = range_or_current_month(None, None, moscow(), now).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-02-29T21:00:00+00:00");
        assert_eq!(end, now);
    }

    #[test]
    fn optional_bounds() {
        assert_eq!(parse_bound(None, moscow(), false, "startDate").unwrap(), None);
        assert_eq!(parse_bound(Some(" "), moscow(), false, "startDate").unwrap(), None);
        assert!(parse_bound(Some("2024-05-10"), moscow(), true, "endDate").unwrap().is_some());
        assert!(parse_bound(Some("yesterday"), moscow(), false, "startDate").is_err());
    }

    #[test]
    fn reversed_range_is_rejected() {
        let now = Utc::now();
        let result = range_or_current_month(Some("2024-03-10"), Some("2024-03-01"), moscow(), now);
        assert!(result.is_err());
    }

    #[test]
    fn body_dates_accept_both_forms() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default, deserialize_with = "deserialize_optional")]
            at: Option<DateTime<Utc>>,
        }
        let b: Body = serde_json::from_str(r#"{"at":"2025-01-31"}"#).unwrap();
        assert_eq!(b.at.unwrap().to_rfc3339(), "2025-01-31T00:00:00+00:00");
        let b: Body = serde_json::from_str(r#"{"at":null}"#).unwrap();
        assert!(b.at.is_none());
        let b: Body = serde_json::from_str(r#"{}"#).unwrap();
        assert!(b.at.is_none());
    }

    #[test]
    fn patch_dates_tell_null_from_absent() {
        #[derive(Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "deserialize_nullable")]
            at: Option<Option<DateTime<Utc>>>,
        }
        let p: Patch = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(p.at, None);
        let p: Patch = serde_json::from_str(r#"{"at":null}"#).unwrap();
        assert_eq!(p.at, Some(None));
        let p: Patch = serde_json::from_str(r#"{"at":"2025-01-31"}"#).unwrap();
        assert!(matches!(p.at, Some(Some(_))));
    }
}
