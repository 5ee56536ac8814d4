use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    extract::{ApiJson, ApiPath},
    middleware::access::Action,
    models::{
        auth::AuthenticatedUser,
        landing::{CreateLandingContentRequest, LandingContent, UpdateLandingContentRequest},
    },
    services::landing::LandingService,
    AppState,
};

/// Public: the landing page is rendered for anonymous visitors.
pub async fn list_sections(State(state): State<AppState>) -> AppResult<Json<Vec<LandingContent>>> {
    LandingService::list(&state.db).await.map(Json)
}

pub async fn create_section(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateLandingContentRequest>,
) -> AppResult<(StatusCode, Json<LandingContent>)> {
    user.require(Action::ManageContent)?;
    body.validate()?;
    let section = LandingService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(section)))
}

pub async fn update_section(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateLandingContentRequest>,
) -> AppResult<Json<LandingContent>> {
    user.require(Action::ManageContent)?;
    body.validate()?;
    LandingService::update(&state.db, id, &body).await.map(Json)
}
