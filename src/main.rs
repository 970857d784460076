//! Lambda entry point: consumes SQS batches of order payment events.

use anyhow::Context as _;
use aws_lambda_events::sqs::SqsEvent;
use chrono::Utc;
use lambda_runtime::{service_fn, LambdaEvent};
use order_payments::cancellation::cancel_pair;
use order_payments::config::AppConfig;
use order_payments::database::{
    dynamodb_client, load_sdk_config, DynamoOrderRepository, DynamoPaymentRepository,
};
use order_payments::events::{InboundMessage, MessageRouter};
use order_payments::logging::init_tracing;
use order_payments::payments::StripeGateway;
use order_payments::services::{
    CancelPaymentHandler, QueryPaymentStatusHandler, StartPaymentHandler,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Time kept back from the invocation deadline to log and return cleanly.
const DEADLINE_MARGIN: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    init_tracing(&config.logging);

    info!(
        orders_table = %config.aws.orders_table,
        payments_table = %config.aws.payments_table,
        currency = %config.payment.default_currency,
        "starting order payments consumer"
    );

    let sdk_config = load_sdk_config(&config.aws).await;
    let dynamodb = dynamodb_client(&sdk_config, &config.aws);
    let orders = Arc::new(DynamoOrderRepository::new(
        dynamodb.clone(),
        config.aws.orders_table.clone(),
    ));
    let payments = Arc::new(DynamoPaymentRepository::new(
        dynamodb,
        config.aws.payments_table.clone(),
    ));
    let gateway = Arc::new(
        StripeGateway::new(config.gateway.clone()).context("failed to build Stripe client")?,
    );

    let router = Arc::new(MessageRouter::new(
        Arc::new(StartPaymentHandler::new(
            orders,
            payments,
            gateway.clone(),
            config.payment.clone(),
        )),
        Arc::new(QueryPaymentStatusHandler::new(gateway.clone())),
        Arc::new(CancelPaymentHandler::new(gateway)),
    ));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<SqsEvent>| {
        let router = router.clone();
        async move { handle_batch(&router, event).await }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}

/// Processes one batch. Always succeeds: per-message failures are logged and
/// redelivery is left to the queue.
async fn handle_batch(
    router: &MessageRouter,
    event: LambdaEvent<SqsEvent>,
) -> Result<(), lambda_runtime::Error> {
    let request_id = event.context.request_id.clone();
    let budget = remaining_time(event.context.deadline);

    let (handle, signal) = cancel_pair();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(budget).await;
        warn!("invocation deadline approaching, cancelling in-flight calls");
        handle.cancel();
    });

    let messages: Vec<InboundMessage> = event
        .payload
        .records
        .into_iter()
        .map(InboundMessage::from)
        .collect();

    let report = router.process_batch(messages, &signal).await;
    timer.abort();

    info!(
        request_id = %request_id,
        total = report.len(),
        failed = report.failed(),
        "invocation finished"
    );
    Ok(())
}

/// Time until the deadline (epoch millis) minus the margin, never negative.
fn remaining_time(deadline_ms: u64) -> Duration {
    let now_ms = Utc::now().timestamp_millis().max(0) as u64;
    Duration::from_millis(deadline_ms.saturating_sub(now_ms)).saturating_sub(DEADLINE_MARGIN)
}
