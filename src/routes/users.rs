use axum::{
    extract::State,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppResult,
    extract::{ApiJson, ApiPath},
    middleware::access::Action,
    models::{
        auth::AuthenticatedUser,
        user::{UpdateRoleRequest, User},
    },
    services::users::UserService,
    AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<User>>> {
    user.require(Action::ManageUsers)?;
    UserService::list(&state.db).await.map(Json)
}

pub async fn update_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateRoleRequest>,
) -> AppResult<Json<User>> {
    user.require(Action::ManageUsers)?;
    let updated = UserService::update_role(&state.db, id, body.role).await?;
    info!(by = %user.user_id, user_id = %id, role = %updated.role, "User role changed");
    Ok(Json(updated))
}
