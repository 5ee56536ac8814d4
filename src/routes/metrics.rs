use axum::{http::header, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};

use crate::error::AppResult;

/// GET /metrics: counters and gauges from `services::metrics`, in Prometheus text format.
pub async fn metrics_handler() -> AppResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(anyhow::Error::from)?;
    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], buffer))
}
