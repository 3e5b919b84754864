use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{error, warn};

use crate::services::billing::{
    normalizer::{PaddleAdapter, ProviderAdapter, StripeAdapter},
    webhook::WebhookOutcome,
    BillingError,
};
use crate::state::AppState;

pub async fn stripe_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_delivery(&app_state, Arc::new(StripeAdapter), &headers, &body).await
}

pub async fn paddle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_delivery(&app_state, Arc::new(PaddleAdapter), &headers, &body).await
}

async fn handle_delivery(
    app_state: &AppState,
    adapter: Arc<dyn ProviderAdapter>,
    headers: &HeaderMap,
    body: &[u8],
) -> Response {
    let provider = adapter.provider();
    let sig = headers
        .get(adapter.signature_header())
        .and_then(|h| h.to_str().ok());

    let processor = app_state.webhook_processor(adapter);
    match processor.process(sig, body, OffsetDateTime::now_utc()).await {
        Ok(WebhookOutcome::Duplicate) => {
            Json(json!({ "received": true, "duplicate": true })).into_response()
        }
        Ok(_) => Json(json!({ "received": true })).into_response(),
        Err(err) => {
            match &err {
                BillingError::Storage(_) | BillingError::Configuration(_) => {
                    error!(%provider, ?err, "webhook processing failed")
                }
                _ => warn!(%provider, %err, "webhook rejected"),
            }
            err.into_response()
        }
    }
}
