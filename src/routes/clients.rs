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
        client::{Client, ClientSearchQuery, CreateClientRequest, UpdateClientRequest},
        lesson::LessonWithRelations,
        subscription::Subscription,
    },
    services::{
        clients::ClientService, lessons::LessonService, subscriptions::SubscriptionService,
    },
    AppState,
};

pub async fn list_clients(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<ClientSearchQuery>,
) -> AppResult<Json<Vec<Client>>> {
    user.require(Action::View)?;
    let clients = match query.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => ClientService::search(&state.db, q).await?,
        None => ClientService::list(&state.db).await?,
    };
    Ok(Json(clients))
}

pub async fn get_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Client>> {
    user.require(Action::View)?;
    ClientService::get(&state.db, id).await.map(Json)
}

pub async fn client_subscriptions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Vec<Subscription>>> {
    user.require(Action::View)?;
    ClientService::get(&state.db, id).await?;
    SubscriptionService::list_for_client(&state.db, id).await.map(Json)
}

pub async fn client_lessons(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Vec<LessonWithRelations>>> {
    user.require(Action::View)?;
    ClientService::get(&state.db, id).await?;
    LessonService::list_for_client(&state.db, id).await.map(Json)
}

pub async fn create_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateClientRequest>,
) -> AppResult<(StatusCode, Json<Client>)> {
    user.require(Action::ManageRecords)?;
    body.validate()?;
    let client = ClientService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateClientRequest>,
) -> AppResult<Json<Client>> {
    user.require(Action::ManageRecords)?;
    body.validate()?;
    ClientService::update(&state.db, id, &body).await.map(Json)
}

pub async fn delete_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require(Action::DeleteRecords)?;
    ClientService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
