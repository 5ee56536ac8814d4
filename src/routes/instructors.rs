use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::access::Action,
    models::{
        auth::AuthenticatedUser,
        instructor::{CreateInstructorRequest, Instructor, InstructorListQuery, UpdateInstructorRequest},
    },
    services::instructors::InstructorService,
    AppState,
};

pub async fn list_instructors(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<InstructorListQuery>,
) -> AppResult<Json<Vec<Instructor>>> {
    user.require(Action::View)?;
    InstructorService::list(&state.db, query.active.unwrap_or(false))
        .await
        .map(Json)
}

pub async fn get_instructor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Instructor>> {
    user.require(Action::View)?;
    InstructorService::get(&state.db, id).await.map(Json)
}

pub async fn create_instructor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateInstructorRequest>,
) -> AppResult<(StatusCode, Json<Instructor>)> {
    user.require(Action::ManageStaff)?;
    body.validate()?;
    let instructor = InstructorService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(instructor)))
}

pub async fn update_instructor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateInstructorRequest>,
) -> AppResult<Json<Instructor>> {
    user.require(Action::ManageStaff)?;
    body.validate()?;
    InstructorService::update(&state.db, id, &body).await.map(Json)
}

pub async fn delete_instructor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require(Action::ManageStaff)?;
    InstructorService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
