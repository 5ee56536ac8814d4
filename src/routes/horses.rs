use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppResult,
    extract::{ApiJson, ApiPath},
    middleware::access::Action,
    models::{
        auth::AuthenticatedUser,
        horse::{CreateHorseRequest, Horse, HorseRemoval, UpdateHorseRequest},
    },
    services::horses::HorseService,
    AppState,
};

pub async fn list_horses(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<Horse>>> {
    user.require(Action::View)?;
    HorseService::list(&state.db).await.map(Json)
}

pub async fn get_horse(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Horse>> {
    user.require(Action::View)?;
    HorseService::get(&state.db, id).await.map(Json)
}

pub async fn create_horse(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateHorseRequest>,
) -> AppResult<(StatusCode, Json<Horse>)> {
    user.require(Action::ManageRecords)?;
    body.validate()?;
    let horse = HorseService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(horse)))
}

pub async fn update_horse(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateHorseRequest>,
) -> AppResult<Json<Horse>> {
    user.require(Action::ManageRecords)?;
    body.validate()?;
    HorseService::update(&state.db, id, &body).await.map(Json)
}

pub async fn delete_horse(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Value>> {
    user.require(Action::DeleteRecords)?;
    let outcome = HorseService::delete(&state.db, id).await?;
    let message = match outcome {
        HorseRemoval::Deleted => "Horse deleted",
        HorseRemoval::Archived => "Horse has lesson history and was archived",
    };
    Ok(Json(json!({ "message": message, "outcome": outcome })))
}
