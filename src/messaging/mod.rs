//! Outbound queue publishing.

use crate::config::AwsConfig;
use crate::error::{AppError, AppErrorKind};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::MessageAttributeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info};

/// Message attribute that carries the event name.
pub const EVENT_ATTRIBUTE: &str = "evento";

pub type MessagingResult<T> = Result<T, MessagingError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessagingError {
    #[error("Failed to serialize message: {0}")]
    Serialization(String),

    #[error("Invalid message attribute: {0}")]
    Attribute(String),

    #[error("Failed to send message to {queue_url}: {message}")]
    Send { queue_url: String, message: String },
}

impl From<MessagingError> for AppError {
    fn from(err: MessagingError) -> Self {
        AppError::new(AppErrorKind::Messaging, err.to_string())
    }
}

/// A typed message with its routing event name.
pub trait QueueMessage: Serialize + Send + Sync {
    fn event(&self) -> &str;
}

/// Event published for each recognised gateway webhook notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEventMessage {
    #[serde(rename = "evento")]
    pub event: String,
    #[serde(rename = "paymentIntentId")]
    pub payment_intent_id: String,
    #[serde(rename = "idPedido", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "idEventoGateway")]
    pub gateway_event_id: String,
    #[serde(rename = "dataHoraEvento")]
    pub occurred_at: DateTime<Utc>,
}

impl QueueMessage for PaymentEventMessage {
    fn event(&self) -> &str {
        &self.event
    }
}

/// Serialized message ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub event: String,
    pub body: String,
}

impl OutboundMessage {
    pub fn from_message<M: QueueMessage>(message: &M) -> MessagingResult<Self> {
        let body = serde_json::to_string(message)
            .map_err(|e| MessagingError::Serialization(e.to_string()))?;
        Ok(Self {
            event: message.event().to_string(),
            body,
        })
    }
}

#[async_trait]
pub trait QueuePublisher: Send + Sync {
    async fn send(&self, message: &OutboundMessage, queue_url: &str) -> MessagingResult<()>;
}

pub struct SqsPublisher {
    client: aws_sdk_sqs::Client,
}

impl SqsPublisher {
    pub fn new(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(sdk_config: &SdkConfig, config: &AwsConfig) -> Self {
        let client = match &config.sqs_endpoint_url {
            Some(endpoint) => {
                info!(endpoint = %endpoint, "using SQS endpoint override");
                let sqs_config = aws_sdk_sqs::config::Builder::from(sdk_config)
                    .endpoint_url(endpoint)
                    .build();
                aws_sdk_sqs::Client::from_conf(sqs_config)
            }
            None => aws_sdk_sqs::Client::new(sdk_config),
        };
        Self::new(client)
    }
}

#[async_trait]
impl QueuePublisher for SqsPublisher {
    async fn send(&self, message: &OutboundMessage, queue_url: &str) -> MessagingResult<()> {
        let mut attrs = HashMap::new();
        attrs.insert(
            EVENT_ATTRIBUTE.to_string(),
            MessageAttributeValue::builder()
                .data_type("String")
                .string_value(&message.event)
                .build()
                .map_err(|e| MessagingError::Attribute(e.to_string()))?,
        );

        let output = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(&message.body)
            .set_message_attributes(Some(attrs))
            .send()
            .await
            .map_err(|e| {
                let err = MessagingError::Send {
                    queue_url: queue_url.to_string(),
                    message: DisplayErrorContext(&e).to_string(),
                };
                error!(event = %message.event, error = %err, "failed to publish message");
                err
            })?;

        info!(
            event = %message.event,
            message_id = output.message_id().unwrap_or_default(),
            "message published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_event_serializes_with_wire_names() {
        let message = PaymentEventMessage {
            event: "pagamento_confirmado".to_string(),
            payment_intent_id: "pi_123".to_string(),
            order_id: Some("P1".to_string()),
            status: Some("succeeded".to_string()),
            gateway_event_id: "evt_1".to_string(),
            occurred_at: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .expect("ts")
                .with_timezone(&Utc),
        };

        let outbound = OutboundMessage::from_message(&message).expect("serialize");
        assert_eq!(outbound.event, "pagamento_confirmado");

        let json: serde_json::Value = serde_json::from_str(&outbound.body).expect("json");
        assert_eq!(json["evento"], "pagamento_confirmado");
        assert_eq!(json["paymentIntentId"], "pi_123");
        assert_eq!(json["idPedido"], "P1");
        assert_eq!(json["dataHoraEvento"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn messaging_error_maps_to_retryable_app_error() {
        let app: AppError = MessagingError::Send {
            queue_url: "https://sqs.local/q".to_string(),
            message: "throttled".to_string(),
        }
        .into();
        assert_eq!(app.kind, AppErrorKind::Messaging);
        assert!(app.is_retryable());
    }
}
