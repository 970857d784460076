use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::GatewayConfig;
use crate::database::PaymentRepository;
use crate::messaging::{OutboundMessage, PaymentEventMessage, QueuePublisher};
use crate::payments::types::{GatewayEventType, WebhookEvent};
use crate::payments::webhook::{parse_event, verify_signature};

#[derive(Debug, Error)]
pub enum WebhookProcessorError {
    #[error("Webhook secret is not configured")]
    MissingSecret,
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Publish error: {0}")]
    PublishError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub webhook_secret: Option<String>,
    pub tolerance_secs: u64,
    /// Queue receiving payment events; publishing is skipped when unset.
    pub events_queue_url: Option<String>,
}

impl WebhookSettings {
    pub fn from_config(gateway: &GatewayConfig, events_queue_url: Option<String>) -> Self {
        Self {
            webhook_secret: gateway.webhook_secret.clone(),
            tolerance_secs: gateway.webhook_tolerance_secs,
            events_queue_url,
        }
    }
}

/// Event name published for each handled gateway event.
pub fn outbound_event_name(event_type: &GatewayEventType) -> Option<&'static str> {
    match event_type {
        GatewayEventType::PaymentSucceeded => Some("pagamento_confirmado"),
        GatewayEventType::PaymentFailed => Some("pagamento_falhou"),
        GatewayEventType::PaymentCanceled => Some("pagamento_cancelado"),
        GatewayEventType::Unhandled(_) => None,
    }
}

pub struct WebhookProcessor {
    settings: WebhookSettings,
    publisher: Arc<dyn QueuePublisher>,
    payments: Arc<dyn PaymentRepository>,
}

impl WebhookProcessor {
    pub fn new(
        settings: WebhookSettings,
        publisher: Arc<dyn QueuePublisher>,
        payments: Arc<dyn PaymentRepository>,
    ) -> Self {
        Self {
            settings,
            publisher,
            payments,
        }
    }

    pub fn settings(&self) -> &WebhookSettings {
        &self.settings
    }

    /// Verifies and handles one notification. Returns `true` on success,
    /// including for event types this service ignores.
    pub async fn process_webhook(&self, payload: &str, signature: &str) -> bool {
        match self.try_process(payload, signature).await {
            Ok(event_type) => {
                info!(event_type = %event_type.as_str(), "Webhook processed successfully");
                true
            }
            Err(e) => {
                error!(error = %e, "Webhook processing failed");
                false
            }
        }
    }

    pub async fn try_process(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<GatewayEventType, WebhookProcessorError> {
        let secret = self
            .settings
            .webhook_secret
            .as_deref()
            .ok_or(WebhookProcessorError::MissingSecret)?;

        let verification = verify_signature(
            payload.as_bytes(),
            signature,
            secret,
            self.settings.tolerance_secs,
            Utc::now(),
        )
        .map_err(|e| WebhookProcessorError::InvalidSignature(e.to_string()))?;

        if !verification.valid {
            return Err(WebhookProcessorError::InvalidSignature(
                verification
                    .reason
                    .unwrap_or_else(|| "signature mismatch".to_string()),
            ));
        }

        let event = parse_event(payload.as_bytes())
            .map_err(|e| WebhookProcessorError::InvalidPayload(e.to_string()))?;
        info!(event_id = %event.event_id, event_type = %event.event_type.as_str(), "Webhook received");

        self.process_event(&event).await?;
        Ok(event.event_type)
    }

    async fn process_event(&self, event: &WebhookEvent) -> Result<(), WebhookProcessorError> {
        let event_name = match outbound_event_name(&event.event_type) {
            Some(name) => name,
            None => {
                info!(event_type = %event.event_type.as_str(), "Webhook event type not handled");
                return Ok(());
            }
        };

        let payment_intent_id = match event.payment_intent_id.as_deref() {
            Some(id) => id,
            None => {
                warn!(event_id = %event.event_id, "Webhook event carries no payment intent");
                return Ok(());
            }
        };

        match event.event_type {
            GatewayEventType::PaymentFailed => {
                warn!(payment_intent_id = %payment_intent_id, "Payment failed")
            }
            _ => info!(payment_intent_id = %payment_intent_id, event = %event_name, "Payment state changed"),
        }

        let order_id = event
            .metadata
            .get("id_pedido")
            .filter(|v| !v.is_empty())
            .cloned();
        let status = event
            .status
            .as_ref()
            .map(|s| s.to_string())
            .or_else(|| default_status(&event.event_type).map(str::to_string));

        self.publish_event(event, event_name, payment_intent_id, &order_id, &status)
            .await?;

        if let (Some(order_id), Some(status)) = (order_id.as_deref(), status.as_deref()) {
            self.update_payment_status(order_id, payment_intent_id, status)
                .await?;
        }

        Ok(())
    }

    async fn publish_event(
        &self,
        event: &WebhookEvent,
        event_name: &str,
        payment_intent_id: &str,
        order_id: &Option<String>,
        status: &Option<String>,
    ) -> Result<(), WebhookProcessorError> {
        let queue_url = match self.settings.events_queue_url.as_deref() {
            Some(url) => url,
            None => return Ok(()),
        };

        let message = PaymentEventMessage {
            event: event_name.to_string(),
            payment_intent_id: payment_intent_id.to_string(),
            order_id: order_id.clone(),
            status: status.clone(),
            gateway_event_id: event.event_id.clone(),
            occurred_at: event.created_at,
        };
        let outbound = OutboundMessage::from_message(&message)
            .map_err(|e| WebhookProcessorError::PublishError(e.to_string()))?;

        self.publisher
            .send(&outbound, queue_url)
            .await
            .map_err(|e| WebhookProcessorError::PublishError(e.to_string()))
    }

    async fn update_payment_status(
        &self,
        order_id: &str,
        payment_intent_id: &str,
        status: &str,
    ) -> Result<(), WebhookProcessorError> {
        let existing = self
            .payments
            .get_payment(order_id, payment_intent_id)
            .await
            .map_err(|e| WebhookProcessorError::DatabaseError(e.to_string()))?;

        let mut record = match existing {
            Some(record) => record,
            None => {
                warn!(
                    order_id = %order_id,
                    payment_intent_id = %payment_intent_id,
                    "No local payment record to update"
                );
                return Ok(());
            }
        };

        record.status = status.to_string();
        self.payments
            .save_payment(&record)
            .await
            .map_err(|e| WebhookProcessorError::DatabaseError(e.to_string()))
    }
}

fn default_status(event_type: &GatewayEventType) -> Option<&'static str> {
    match event_type {
        GatewayEventType::PaymentSucceeded => Some("succeeded"),
        GatewayEventType::PaymentFailed => Some("requires_payment_method"),
        GatewayEventType::PaymentCanceled => Some("canceled"),
        GatewayEventType::Unhandled(_) => None,
    }
}
