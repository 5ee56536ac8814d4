use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    extract::ApiJson,
    middleware::{
        auth::{clear_session_cookie, session_cookie, session_token},
        rate_limit::check_rate_limit,
    },
    models::{
        auth::AuthenticatedUser,
        user::{User, VkLoginRequest},
    },
    services::{auth::AuthService, metrics::LOGINS_COUNTER},
    AppState,
};

const LOGIN_ATTEMPTS: u64 = 10;
const LOGIN_WINDOW_SECS: u64 = 900;

/// Best-effort client address; the API runs behind a reverse proxy.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".into())
}

pub async fn vk_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<VkLoginRequest>,
) -> AppResult<impl IntoResponse> {
    let rate_key = format!("rate:vk-login:{}", client_ip(&headers));
    check_rate_limit(&state.redis, &rate_key, LOGIN_ATTEMPTS, LOGIN_WINDOW_SECS).await?;

    let access_token = body
        .access_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::validation("accessToken is required"))?;

    let profile = state.vk.profile(access_token).await.map_err(|e| {
        LOGINS_COUNTER.with_label_values(&["rejected"]).inc();
        warn!("VK login failed: {e}");
        AppError::Unauthorized("VK authentication failed")
    })?;

    let user =
        AuthService::upsert_vk_user(&state.db, &profile, state.config.admin_vk_id.as_deref()).await?;
    let session = AuthService::issue_session(
        &state.db,
        user.id,
        &state.config.session_secret,
        state.config.session_ttl_hours,
    )
    .await?;

    LOGINS_COUNTER.with_label_values(&["success"]).inc();
    info!(user_id = %user.id, role = %user.role, "User logged in via VK");

    let cookie = session_cookie(&session.token, session.max_age_secs, state.config.cookie_secure);
    Ok(([(header::SET_COOKIE, cookie)], Json(user)))
}

pub async fn me(State(state): State<AppState>, user: AuthenticatedUser) -> AppResult<Json<User>> {
    AuthService::get_user(&state.db, user.user_id).await.map(Json)
}

/// Always succeeds; a valid session is revoked on the way out.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    if let Some(token) = session_token(&headers) {
        if let Ok((_, session_id)) = AuthService::verify(&token, &state.config.session_secret) {
            AuthService::revoke(&state.db, session_id).await?;
        }
    }
    Ok((
        [(header::SET_COOKIE, clear_session_cookie(state.config.cookie_secure))],
        Json(json!({ "success": true })),
    ))
}
