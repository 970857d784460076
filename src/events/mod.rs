//! Inbound queue messages: model, typed decoding and the batch router.

pub mod decode;
pub mod router;

use crate::services::{CancelPaymentRequest, QueryPaymentStatusRequest, StartPaymentRequest};
use aws_lambda_events::sqs::SqsMessage;
use std::collections::HashMap;

pub use decode::{decode_command, DecodeError, DecodedCommand, FieldWarning};
pub use router::{BatchReport, MessageOutcome, MessageRouter};

/// Attribute holding the event name.
pub const EVENT_ATTRIBUTE: &str = "evento";

/// Transport-neutral view of one queued message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundMessage {
    pub message_id: String,
    pub body: String,
    /// String-valued message attributes.
    pub attributes: HashMap<String, String>,
}

impl InboundMessage {
    pub fn new(message_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn event(&self) -> Option<&str> {
        self.attributes.get(EVENT_ATTRIBUTE).map(String::as_str)
    }
}

impl From<SqsMessage> for InboundMessage {
    fn from(message: SqsMessage) -> Self {
        let attributes = message
            .message_attributes
            .into_iter()
            .filter_map(|(name, attr)| attr.string_value.map(|value| (name, value)))
            .collect();

        Self {
            message_id: message.message_id.unwrap_or_default(),
            body: message.body.unwrap_or_default(),
            attributes,
        }
    }
}

/// Closed set of routable events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StartPayment,
    QueryPayment,
    CancelPayment,
}

impl EventKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "iniciar_pagamento" => Some(EventKind::StartPayment),
            "consultar_pagamento" => Some(EventKind::QueryPayment),
            "cancelar_pagamento" => Some(EventKind::CancelPayment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::StartPayment => "iniciar_pagamento",
            EventKind::QueryPayment => "consultar_pagamento",
            EventKind::CancelPayment => "cancelar_pagamento",
        }
    }
}

/// A decoded request, ready for its use case.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentCommand {
    Start(StartPaymentRequest),
    Query(QueryPaymentStatusRequest),
    Cancel(CancelPaymentRequest),
}

impl PaymentCommand {
    pub fn kind(&self) -> EventKind {
        match self {
            PaymentCommand::Start(_) => EventKind::StartPayment,
            PaymentCommand::Query(_) => EventKind::QueryPayment,
            PaymentCommand::Cancel(_) => EventKind::CancelPayment,
        }
    }
}
