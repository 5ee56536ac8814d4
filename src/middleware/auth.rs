use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::{
    error::AppError,
    models::auth::AuthenticatedUser,
    services::auth::AuthService,
    AppState,
};

pub const SESSION_COOKIE: &str = "sid";

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(state, &parts.headers).await
    }
}

/// Resolves the session carried by the request to a live user.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
    let token = session_token(headers).ok_or(AppError::Unauthorized("Authentication required"))?;

    let (user_id, session_id) = AuthService::verify(&token, &state.config.session_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired session"))?;

    AuthService::session_user(&state.db, user_id, session_id)
        .await?
        .ok_or(AppError::Unauthorized("Invalid or expired session"))
}

/// Session token from the `sid` cookie, or from `Authorization: Bearer`.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = get_cookie(headers, SESSION_COOKIE).filter(|t| !t.is_empty()) {
        return Some(token);
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|part| part.trim().strip_prefix(&prefix).map(str::to_string))
}

pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}{secure}")
}

pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}
