//! HTTP surface of the webhook receiver

pub mod webhooks;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::webhook_processor::WebhookProcessor;
use webhooks::WebhookState;

pub fn router(processor: Arc<WebhookProcessor>) -> Router {
    let state = Arc::new(WebhookState { processor });

    Router::new()
        .route("/health", get(webhooks::health))
        .route("/webhooks/stripe", post(webhooks::handle_stripe_webhook))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
