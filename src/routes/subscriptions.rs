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
        lesson::LessonWithRelations,
        subscription::{
            CreateSubscriptionRequest, Subscription, SubscriptionWithClient, UpdateSubscriptionRequest,
        },
    },
    services::{lessons::LessonService, subscriptions::SubscriptionService},
    AppState,
};

pub async fn list_subscriptions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<SubscriptionWithClient>>> {
    user.require(Action::View)?;
    SubscriptionService::list(&state.db).await.map(Json)
}

pub async fn get_subscription(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<SubscriptionWithClient>> {
    user.require(Action::View)?;
    SubscriptionService::get(&state.db, id).await.map(Json)
}

pub async fn subscription_lessons(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Vec<LessonWithRelations>>> {
    user.require(Action::View)?;
    SubscriptionService::get_plain(&state.db, id).await?;
    LessonService::list_for_subscription(&state.db, id).await.map(Json)
}

pub async fn create_subscription(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateSubscriptionRequest>,
) -> AppResult<(StatusCode, Json<Subscription>)> {
    user.require(Action::ManageRecords)?;
    let subscription = SubscriptionService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn update_subscription(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateSubscriptionRequest>,
) -> AppResult<Json<Subscription>> {
    user.require(Action::ManageRecords)?;
    SubscriptionService::update(&state.db, id, &body).await.map(Json)
}
