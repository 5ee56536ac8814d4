use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// `Json` whose rejections are reported as `400 { "error": ... }`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Query` with the same error shape as [`ApiJson`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose parse failures (e.g. a malformed UUID) get the JSON error body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn echo(ApiPath(id): ApiPath<Uuid>) -> String {
        id.to_string()
    }

    #[tokio::test]
    async fn malformed_path_id_gets_json_error() {
        let app = Router::new().route("/horses/{id}", get(echo));
        let response = app
            .oneshot(Request::get("/horses/not-a-uuid").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value["error"].is_string());
    }

    #[tokio::test]
    async fn well_formed_path_id_passes_through() {
        let id = Uuid::new_v4();
        let app = Router::new().route("/horses/{id}", get(echo));
        let response = app
            .oneshot(Request::get(format!("/horses/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], id.to_string().as_bytes());
    }
}
