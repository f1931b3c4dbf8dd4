use crate::application::ingest::IngestionService;
use crate::application::signature::SIGNATURE_HEADER;
use crate::error::RoundUpError;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::sync::Arc;

pub fn router(service: Arc<IngestionService>) -> Router {
    Router::new()
        .route("/webhook", post(receive_webhook))
        .route("/health", get(liveness))
        .with_state(service)
}

/// Inbound webhook endpoint. The body is taken raw: the signature covers the exact bytes.
async fn receive_webhook(
    State(service): State<Arc<IngestionService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match service.ingest(&body, signature).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(err) => {
            let status = status_for(&err);
            (status, status.canonical_reason().unwrap_or_default()).into_response()
        }
    }
}

async fn liveness() -> &'static str {
    "ok"
}

fn status_for(err: &RoundUpError) -> StatusCode {
    match err {
        RoundUpError::Authentication => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
