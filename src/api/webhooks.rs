use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{info, warn};

use crate::health::{check_webhook_health, HealthState};
use crate::payments::webhook::SIGNATURE_HEADER;
use crate::services::webhook_processor::WebhookProcessor;

pub struct WebhookState {
    pub processor: Arc<WebhookProcessor>,
}

/// POST /webhooks/stripe
pub async fn handle_stripe_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    info!(bytes = body.len(), "Received Stripe webhook");

    let signature = match headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(signature) => signature,
        None => {
            warn!("Missing webhook signature");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"status": "error", "error": "missing signature"})),
            );
        }
    };

    if state.processor.process_webhook(&body, signature).await {
        (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"status": "error"})),
        )
    }
}

/// GET /health
pub async fn health(State(state): State<Arc<WebhookState>>) -> impl IntoResponse {
    let health_status = check_webhook_health(state.processor.settings());
    let code = if health_status.status == HealthState::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(health_status))
}
