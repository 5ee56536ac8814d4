use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    dates::parse_bound,
    error::{AppError, AppResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::access::Action,
    models::{
        auth::AuthenticatedUser,
        lesson::{CreateLessonRequest, LessonRangeQuery, LessonWithRelations, UpdateLessonRequest},
    },
    services::lessons::LessonService,
    AppState,
};

pub async fn list_lessons(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<LessonRangeQuery>,
) -> AppResult<Json<Vec<LessonWithRelations>>> {
    user.require(Action::View)?;
    let offset = state.config.utc_offset();
    let start = parse_bound(query.start_date.as_deref(), offset, false, "startDate")?;
    let end = parse_bound(query.end_date.as_deref(), offset, true, "endDate")?;
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            return Err(AppError::validation("endDate must not be before startDate"));
        }
    }
    LessonService::list(&state.db, start, end).await.map(Json)
}

pub async fn get_lesson(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<LessonWithRelations>> {
    user.require(Action::View)?;
    LessonService::get(&state.db, id).await.map(Json)
}

pub async fn create_lesson(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateLessonRequest>,
) -> AppResult<(StatusCode, Json<LessonWithRelations>)> {
    user.require(Action::ManageRecords)?;
    let lesson = LessonService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

pub async fn update_lesson(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateLessonRequest>,
) -> AppResult<Json<LessonWithRelations>> {
    user.require(Action::ManageRecords)?;
    LessonService::update(&state.db, id, &body).await.map(Json)
}

pub async fn delete_lesson(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require(Action::ManageRecords)?;
    LessonService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
