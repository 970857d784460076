//! HTTP receiver for Stripe payment notifications.

use anyhow::Context as _;
use order_payments::api;
use order_payments::config::AppConfig;
use order_payments::database::{dynamodb_client, load_sdk_config, DynamoPaymentRepository};
use order_payments::logging::init_tracing;
use order_payments::messaging::SqsPublisher;
use order_payments::services::{WebhookProcessor, WebhookSettings};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    init_tracing(&config.logging);

    if config.gateway.webhook_secret.is_none() {
        warn!("STRIPE_WEBHOOK_SECRET not set, every webhook will be rejected");
    }

    let sdk_config = load_sdk_config(&config.aws).await;
    let payments = Arc::new(DynamoPaymentRepository::new(
        dynamodb_client(&sdk_config, &config.aws),
        config.aws.payments_table.clone(),
    ));
    let publisher = Arc::new(SqsPublisher::from_sdk_config(&sdk_config, &config.aws));

    let settings =
        WebhookSettings::from_config(&config.gateway, config.aws.payment_events_queue_url.clone());
    let processor = Arc::new(WebhookProcessor::new(settings, publisher, payments));

    let app = api::router(processor);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(address = %addr, "webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("webhook server stopped");
    Ok(())
}
