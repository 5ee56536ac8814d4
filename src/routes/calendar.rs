use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    dates::parse_bound,
    error::AppResult,
    extract::ApiQuery,
    middleware::{access::Action, auth::authenticate},
    services::{calendar::render_feed, lessons::LessonService},
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub token: Option<String>,
}

/// Whether the query carries the shared feed token. No token configured means no token access.
fn feed_token_matches(configured: Option<&str>, given: Option<&str>) -> bool {
    matches!((configured, given), (Some(expected), Some(given)) if expected == given)
}

/// GET /api/calendar/lessons.ics: lessons as an iCalendar feed.
pub async fn lessons_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<CalendarQuery>,
) -> AppResult<impl IntoResponse> {
    if !feed_token_matches(state.config.calendar_feed_token.as_deref(), query.token.as_deref()) {
        let user = authenticate(&state, &headers).await?;
        user.require(Action::View)?;
    }

    let offset = state.config.utc_offset();
    let start = parse_bound(query.start_date.as_deref(), offset, false, "startDate")?;
    let end = parse_bound(query.end_date.as_deref(), offset, true, "endDate")?;
    let lessons = LessonService::list(&state.db, start, end).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "inline; filename=\"lessons.ics\""),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        render_feed(&lessons, Utc::now()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_token_requires_configuration() {
        assert!(feed_token_matches(Some("s3cret"), Some("s3cret")));
        assert!(!feed_token_matches(Some("s3cret"), Some("guess")));
        assert!(!feed_token_matches(Some("s3cret"), None));
        assert!(!feed_token_matches(None, Some("anything")));
    }
}
