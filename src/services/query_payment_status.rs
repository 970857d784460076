use crate::cancellation::CancelSignal;
use crate::error::AppResult;
use crate::payments::provider::PaymentGateway;
use crate::services::UseCase;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPaymentStatusRequest {
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPaymentStatusResponse {
    #[serde(rename = "paymentIntentId")]
    pub payment_intent_id: String,
    pub status: String,
    #[serde(rename = "valor")]
    pub amount: BigDecimal,
    #[serde(rename = "moeda")]
    pub currency: String,
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "dataConfirmacao")]
    pub confirmed_at: Option<DateTime<Utc>>,
    /// From the intent's `id_pedido` metadata; the intent id when absent.
    #[serde(rename = "idPedido")]
    pub order_id: String,
    /// From the intent's `nome_cliente` metadata; empty when absent.
    #[serde(rename = "nomeCliente")]
    pub customer_name: String,
}

pub struct QueryPaymentStatusHandler {
    gateway: Arc<dyn PaymentGateway>,
}

impl QueryPaymentStatusHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl UseCase for QueryPaymentStatusHandler {
    type Request = QueryPaymentStatusRequest;
    type Response = QueryPaymentStatusResponse;

    async fn handle(
        &self,
        request: QueryPaymentStatusRequest,
        cancel: &CancelSignal,
    ) -> AppResult<QueryPaymentStatusResponse> {
        let status = cancel
            .run(
                "get payment status",
                self.gateway.get_payment_status(&request.payment_intent_id),
            )
            .await
            .map_err(|e| {
                error!(payment_intent_id = %request.payment_intent_id, error = %e, "failed to query payment status");
                e
            })?;

        let order_id = status
            .metadata
            .get("id_pedido")
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| status.payment_intent_id.clone());
        let customer_name = status
            .metadata
            .get("nome_cliente")
            .cloned()
            .unwrap_or_default();

        info!(
            payment_intent_id = %status.payment_intent_id,
            order_id = %order_id,
            status = %status.status,
            "payment status queried"
        );

        Ok(QueryPaymentStatusResponse {
            payment_intent_id: status.payment_intent_id,
            status: status.status.to_string(),
            amount: status.amount,
            currency: status.currency,
            created_at: status.created_at,
            confirmed_at: status.confirmed_at,
            order_id,
            customer_name,
        })
    }
}
