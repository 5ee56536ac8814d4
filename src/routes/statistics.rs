use axum::{extract::State, Json};
use chrono::{Datelike, FixedOffset, Utc};

use crate::{
    dates::{month_bounds, range_or_current_month},
    error::AppResult,
    extract::ApiQuery,
    middleware::access::Action,
    models::{
        auth::AuthenticatedUser,
        statistics::{
            HorseWorkload, InstructorWorkload, MonthQuery, NewClientsResponse, RevenueResponse,
            WorkloadQuery,
        },
    },
    services::statistics::StatisticsService,
    AppState,
};

/// Requested month, defaulting to the current one on the stable's clock.
fn month_of(query: &MonthQuery, offset: FixedOffset) -> (i32, u32) {
    let today = Utc::now().with_timezone(&offset);
    (query.year.unwrap_or(today.year()), query.month.unwrap_or(today.month()))
}

pub async fn horse_workload(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<WorkloadQuery>,
) -> AppResult<Json<Vec<HorseWorkload>>> {
    user.require(Action::View)?;
    let (start, end) = range_or_current_month(
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        state.config.utc_offset(),
        Utc::now(),
    )?;
    StatisticsService::horse_workload(&state.db, start, end).await.map(Json)
}

pub async fn instructor_workload(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<WorkloadQuery>,
) -> AppResult<Json<Vec<InstructorWorkload>>> {
    user.require(Action::View)?;
    let (start, end) = range_or_current_month(
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        state.config.utc_offset(),
        Utc::now(),
    )?;
    StatisticsService::instructor_workload(&state.db, start, end).await.map(Json)
}

pub async fn revenue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<MonthQuery>,
) -> AppResult<Json<RevenueResponse>> {
    user.require(Action::View)?;
    let offset = state.config.utc_offset();
    let (year, month) = month_of(&query, offset);
    let (start, end) = month_bounds(year, month, offset)?;
    let revenue = StatisticsService::revenue(&state.db, start, end).await?;
    Ok(Json(RevenueResponse { revenue }))
}

pub async fn new_clients(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<MonthQuery>,
) -> AppResult<Json<NewClientsResponse>> {
    user.require(Action::View)?;
    let offset = state.config.utc_offset();
    let (year, month) = month_of(&query, offset);
    let (start, end) = month_bounds(year, month, offset)?;
    let count = StatisticsService::new_clients(&state.db, start, end).await?;
    Ok(Json(NewClientsResponse { count }))
}
