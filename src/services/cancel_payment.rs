use crate::cancellation::CancelSignal;
use crate::error::AppResult;
use crate::payments::provider::PaymentGateway;
use crate::services::UseCase;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

pub const DEFAULT_CANCELLATION_REASON: &str = "customer request";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelPaymentRequest {
    pub payment_intent_id: String,
    /// Echoed back in the response; the gateway always receives its own
    /// fixed reason code.
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelPaymentResponse {
    #[serde(rename = "paymentIntentId")]
    pub payment_intent_id: String,
    #[serde(rename = "cancelado")]
    pub cancelled: bool,
    #[serde(rename = "dataCancelamento")]
    pub cancelled_at: DateTime<Utc>,
    #[serde(rename = "motivoCancelamento")]
    pub reason: String,
}

pub struct CancelPaymentHandler {
    gateway: Arc<dyn PaymentGateway>,
}

impl CancelPaymentHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl UseCase for CancelPaymentHandler {
    type Request = CancelPaymentRequest;
    type Response = CancelPaymentResponse;

    async fn handle(
        &self,
        request: CancelPaymentRequest,
        cancel: &CancelSignal,
    ) -> AppResult<CancelPaymentResponse> {
        info!(
            payment_intent_id = %request.payment_intent_id,
            reason = %request.reason,
            "cancelling payment"
        );

        let cancelled = cancel
            .run(
                "cancel payment",
                self.gateway.cancel_payment(&request.payment_intent_id),
            )
            .await
            .map_err(|e| {
                error!(payment_intent_id = %request.payment_intent_id, error = %e, "failed to cancel payment");
                e
            })?;

        Ok(CancelPaymentResponse {
            payment_intent_id: request.payment_intent_id,
            cancelled,
            cancelled_at: Utc::now(),
            reason: request.reason,
        })
    }
}
