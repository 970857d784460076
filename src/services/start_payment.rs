use crate::cancellation::CancelSignal;
use crate::config::PaymentConfig;
use crate::database::models::{Order, PaymentRecord};
use crate::database::{OrderRepository, PaymentRepository};
use crate::error::{AppError, AppResult};
use crate::payments::provider::PaymentGateway;
use crate::payments::types::PaymentStatus;
use crate::services::order_mapping::build_create_request;
use crate::services::UseCase;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct StartPaymentRequest {
    pub order_id: String,
    pub status: Option<String>,
    pub order_date: NaiveDate,
    /// Set when the message carried no usable `dataPedido`.
    pub order_date_defaulted: bool,
    pub event_time: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartPaymentResponse {
    #[serde(rename = "idPedido")]
    pub order_id: String,
    #[serde(rename = "paymentIntentId")]
    pub payment_intent_id: String,
    pub status: String,
    #[serde(rename = "valor")]
    pub amount: BigDecimal,
    #[serde(rename = "moeda")]
    pub currency: String,
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "urlPagamento")]
    pub payment_url: String,
}

pub struct StartPaymentHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    settings: PaymentConfig,
}

impl StartPaymentHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        settings: PaymentConfig,
    ) -> Self {
        Self {
            orders,
            payments,
            gateway,
            settings,
        }
    }

    pub fn checkout_url(&self, payment_intent_id: &str) -> String {
        format!("{}/{}", self.settings.checkout_base_url, payment_intent_id)
    }

    async fn load_order(
        &self,
        request: &StartPaymentRequest,
        cancel: &CancelSignal,
    ) -> AppResult<Option<Order>> {
        if request.order_date_defaulted {
            warn!(order_id = %request.order_id, "order date unknown, looking up order by id");
            return cancel
                .run("find order by id", self.orders.find_order_by_id(&request.order_id))
                .await;
        }

        let date_key = Order::date_key(request.order_date);
        let order = cancel
            .run(
                "get order",
                self.orders.get_order(&date_key, &request.order_id),
            )
            .await?;
        if order.is_some() {
            return Ok(order);
        }

        warn!(
            order_id = %request.order_id,
            order_date = %date_key,
            "order not under its date, looking up order by id"
        );
        cancel
            .run("find order by id", self.orders.find_order_by_id(&request.order_id))
            .await
    }

    async fn record_payment(
        &self,
        order: &Order,
        status: &PaymentStatus,
        payment_url: &str,
        cancel: &CancelSignal,
    ) {
        let now = Utc::now();
        let record = PaymentRecord {
            order_id: order.id.clone(),
            payment_intent_id: status.payment_intent_id.clone(),
            status: status.status.to_string(),
            amount: status.amount.clone(),
            currency: status.currency.clone(),
            created_at: status.created_at,
            updated_at: now,
            payment_url: payment_url.to_string(),
            gateway_metadata: PaymentRecord::metadata_json(&status.metadata),
        };

        // the intent already exists at the gateway; a failed save must not fail the request
        if let Err(e) = cancel
            .run("save payment", self.payments.save_payment(&record))
            .await
        {
            error!(
                order_id = %order.id,
                payment_intent_id = %record.payment_intent_id,
                error = %e,
                "failed to record payment locally"
            );
        }
    }
}

#[async_trait]
impl UseCase for StartPaymentHandler {
    type Request = StartPaymentRequest;
    type Response = StartPaymentResponse;

    async fn handle(
        &self,
        request: StartPaymentRequest,
        cancel: &CancelSignal,
    ) -> AppResult<StartPaymentResponse> {
        info!(
            order_id = %request.order_id,
            order_status = request.status.as_deref().unwrap_or("-"),
            event_time = %request.event_time,
            "starting payment"
        );

        let order = match self.load_order(&request, cancel).await? {
            Some(order) => order,
            None => {
                error!(order_id = %request.order_id, "order not found");
                return Err(AppError::not_found("Order", &request.order_id));
            }
        };

        let create_request =
            build_create_request(&order, &self.settings.default_currency, &request.metadata);

        let payment_intent_id = cancel
            .run("create payment", self.gateway.create_payment(&create_request))
            .await
            .map_err(|e| {
                error!(order_id = %order.id, error = %e, "failed to create payment");
                e
            })?;

        let status = cancel
            .run(
                "get payment status",
                self.gateway.get_payment_status(&payment_intent_id),
            )
            .await
            .map_err(|e| {
                error!(
                    order_id = %order.id,
                    payment_intent_id = %payment_intent_id,
                    error = %e,
                    "failed to fetch payment status"
                );
                e
            })?;

        let payment_url = self.checkout_url(&payment_intent_id);
        self.record_payment(&order, &status, &payment_url, cancel)
            .await;

        info!(
            order_id = %order.id,
            payment_intent_id = %payment_intent_id,
            status = %status.status,
            "payment started"
        );

        Ok(StartPaymentResponse {
            order_id: request.order_id,
            payment_intent_id,
            status: status.status.to_string(),
            amount: status.amount,
            currency: status.currency,
            created_at: status.created_at,
            payment_url,
        })
    }
}
