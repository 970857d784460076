//! Query-status and cancel-payment use cases

mod common;

use common::{dec, RecordingGateway};
use httpmock::prelude::*;
use order_payments::cancellation::CancelSignal;
use order_payments::config::GatewayConfig;
use order_payments::payments::StripeGateway;
use order_payments::services::{
    CancelPaymentHandler, CancelPaymentRequest, QueryPaymentStatusHandler,
    QueryPaymentStatusRequest, UseCase,
};
use serde_json::json;
use std::sync::Arc;

fn stripe(base_url: String) -> Arc<StripeGateway> {
    Arc::new(
        StripeGateway::new(GatewayConfig {
            secret_key: "sk_test_cases".to_string(),
            webhook_secret: None,
            base_url,
            timeout_secs: 5,
            webhook_tolerance_secs: 300,
            return_url: "https://shop.test/return".to_string(),
        })
        .expect("gateway"),
    )
}

#[tokio::test]
async fn test_cancel_echoes_caller_reason_while_gateway_gets_fixed_code() {
    let server = MockServer::start();
    let cancel = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/payment_intents/pi_123/cancel")
            .body_contains("cancellation_reason=requested_by_customer");
        then.status(200).json_body(json!({
            "id": "pi_123",
            "status": "canceled",
            "amount": 1000,
            "currency": "brl"
        }));
    });

    let handler = CancelPaymentHandler::new(stripe(server.base_url()));
    let before = chrono::Utc::now();
    let response = handler
        .handle(
            CancelPaymentRequest {
                payment_intent_id: "pi_123".to_string(),
                reason: "Cliente desistiu da compra".to_string(),
            },
            &CancelSignal::never(),
        )
        .await
        .expect("cancelled");

    cancel.assert();
    assert_eq!(response.payment_intent_id, "pi_123");
    assert!(response.cancelled);
    assert_eq!(response.reason, "Cliente desistiu da compra");
    assert!(response.cancelled_at >= before);

    let body = serde_json::to_value(&response).expect("serialize");
    assert_eq!(body["motivoCancelamento"], "Cliente desistiu da compra");
    assert_eq!(body["cancelado"], true);
}

#[tokio::test]
async fn test_cancel_failure_propagates_gateway_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/payment_intents/pi_done/cancel");
        then.status(400).json_body(json!({
            "error": {
                "type": "invalid_request_error",
                "code": "payment_intent_unexpected_state",
                "message": "You cannot cancel this PaymentIntent because it has a status of succeeded."
            }
        }));
    });

    let handler = CancelPaymentHandler::new(stripe(server.base_url()));
    let err = handler
        .handle(
            CancelPaymentRequest {
                payment_intent_id: "pi_done".to_string(),
                reason: "customer request".to_string(),
            },
            &CancelSignal::never(),
        )
        .await
        .expect_err("already succeeded");

    assert_eq!(
        err.to_string(),
        "Gateway error: You cannot cancel this PaymentIntent because it has a status of succeeded."
    );
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_query_twice_yields_identical_results() {
    let server = MockServer::start();
    let lookup = server.mock(|when, then| {
        when.method(GET).path("/v1/payment_intents/pi_123");
        then.status(200).json_body(json!({
            "id": "pi_123",
            "status": "requires_capture",
            "amount": 2150,
            "currency": "brl",
            "created": 1704067200,
            "metadata": { "id_pedido": "P1", "nome_cliente": "Ana Souza" }
        }));
    });

    let handler = QueryPaymentStatusHandler::new(stripe(server.base_url()));
    let request = QueryPaymentStatusRequest {
        payment_intent_id: "pi_123".to_string(),
    };

    let first = handler
        .handle(request.clone(), &CancelSignal::never())
        .await
        .expect("first query");
    let second = handler
        .handle(request, &CancelSignal::never())
        .await
        .expect("second query");

    lookup.assert_hits(2);
    assert_eq!(first.status, second.status);
    assert_eq!(first.amount, second.amount);
    assert_eq!(first.currency, second.currency);

    assert_eq!(first.status, "requires_capture");
    assert_eq!(first.amount, dec("21.50"));
    assert_eq!(first.order_id, "P1");
    assert_eq!(first.customer_name, "Ana Souza");
    assert_eq!(first.confirmed_at, None);
}

#[tokio::test]
async fn test_query_without_metadata_falls_back_to_intent_id() {
    let gateway = RecordingGateway::new();
    let handler = QueryPaymentStatusHandler::new(gateway.clone());

    let response = handler
        .handle(
            QueryPaymentStatusRequest {
                payment_intent_id: "pi_orphan".to_string(),
            },
            &CancelSignal::never(),
        )
        .await
        .expect("status");

    assert_eq!(response.order_id, "pi_orphan");
    assert_eq!(response.customer_name, "");
    assert_eq!(*gateway.status_calls.lock().unwrap(), vec!["pi_orphan"]);

    let body = serde_json::to_value(&response).expect("serialize");
    assert_eq!(body["idPedido"], "pi_orphan");
    assert!(body["dataConfirmacao"].is_null());
}

#[tokio::test]
async fn test_unreachable_gateway_is_an_internal_error() {
    // nothing listens on the discard port
    let handler = QueryPaymentStatusHandler::new(stripe("http://127.0.0.1:9".to_string()));

    let err = handler
        .handle(
            QueryPaymentStatusRequest {
                payment_intent_id: "pi_123".to_string(),
            },
            &CancelSignal::never(),
        )
        .await
        .expect_err("connection refused");

    assert!(err.to_string().starts_with("Internal error:"));
    assert!(err.is_retryable());
}
