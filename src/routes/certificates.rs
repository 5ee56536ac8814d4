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
        certificate::{Certificate, CreateCertificateRequest, UpdateCertificateRequest},
    },
    services::certificates::CertificateService,
    AppState,
};

pub async fn list_certificates(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<Certificate>>> {
    user.require(Action::View)?;
    CertificateService::list(&state.db).await.map(Json)
}

pub async fn get_certificate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Certificate>> {
    user.require(Action::View)?;
    CertificateService::get(&state.db, id).await.map(Json)
}

pub async fn create_certificate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateCertificateRequest>,
) -> AppResult<(StatusCode, Json<Certificate>)> {
    user.require(Action::ManageRecords)?;
    body.validate()?;
    let certificate = CertificateService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(certificate)))
}

pub async fn update_certificate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateCertificateRequest>,
) -> AppResult<Json<Certificate>> {
    user.require(Action::ManageRecords)?;
    body.validate()?;
    CertificateService::update(&state.db, id, &body).await.map(Json)
}

pub async fn delete_certificate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require(Action::DeleteRecords)?;
    CertificateService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
