use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of a payment intent as reported by the gateway.
///
/// The gateway owns these transitions; this service only observes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    /// Any value the gateway adds later.
    Other(String),
}

impl IntentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            IntentStatus::RequiresPaymentMethod => "requires_payment_method",
            IntentStatus::RequiresConfirmation => "requires_confirmation",
            IntentStatus::RequiresAction => "requires_action",
            IntentStatus::Processing => "processing",
            IntentStatus::RequiresCapture => "requires_capture",
            IntentStatus::Canceled => "canceled",
            IntentStatus::Succeeded => "succeeded",
            IntentStatus::Other(value) => value.as_str(),
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "requires_payment_method" => IntentStatus::RequiresPaymentMethod,
            "requires_confirmation" => IntentStatus::RequiresConfirmation,
            "requires_action" => IntentStatus::RequiresAction,
            "processing" => IntentStatus::Processing,
            "requires_capture" => IntentStatus::RequiresCapture,
            "canceled" => IntentStatus::Canceled,
            "succeeded" => IntentStatus::Succeeded,
            other => IntentStatus::Other(other.to_string()),
        }
    }

    /// Confirmation counts as successful once funds are authorized or settled.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, IntentStatus::Succeeded | IntentStatus::RequiresCapture)
    }

    pub fn is_captured(&self) -> bool {
        matches!(self, IntentStatus::Succeeded)
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IntentStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IntentStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(IntentStatus::parse(&raw))
    }
}

/// Input of the gateway's create operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: String,
    /// Major currency units (e.g. reais), converted to minor units on the wire.
    pub amount: BigDecimal,
    pub currency: String,
    pub description: String,
    pub receipt_email: String,
    pub customer_name: String,
    pub metadata: BTreeMap<String, String>,
}

/// Snapshot of a payment intent returned by the gateway's status lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub payment_intent_id: String,
    pub status: IntentStatus,
    pub amount: BigDecimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    /// Never set by a status lookup; only webhook notifications carry it.
    pub confirmed_at: Option<DateTime<Utc>>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookVerificationResult {
    pub valid: bool,
    pub reason: Option<String>,
}

/// Webhook event kinds this service reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventType {
    PaymentSucceeded,
    PaymentFailed,
    PaymentCanceled,
    Unhandled(String),
}

impl GatewayEventType {
    pub fn parse(value: &str) -> Self {
        match value {
            "payment_intent.succeeded" => GatewayEventType::PaymentSucceeded,
            "payment_intent.payment_failed" => GatewayEventType::PaymentFailed,
            "payment_intent.canceled" => GatewayEventType::PaymentCanceled,
            other => GatewayEventType::Unhandled(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GatewayEventType::PaymentSucceeded => "payment_intent.succeeded",
            GatewayEventType::PaymentFailed => "payment_intent.payment_failed",
            GatewayEventType::PaymentCanceled => "payment_intent.canceled",
            GatewayEventType::Unhandled(other) => other.as_str(),
        }
    }
}

/// A verified webhook notification.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub event_id: String,
    pub event_type: GatewayEventType,
    pub payment_intent_id: Option<String>,
    pub status: Option<IntentStatus>,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_status_parses_known_and_unknown_values() {
        assert_eq!(IntentStatus::parse("succeeded"), IntentStatus::Succeeded);
        assert_eq!(
            IntentStatus::parse("requires_capture"),
            IntentStatus::RequiresCapture
        );
        let other = IntentStatus::parse("partially_funded");
        assert_eq!(other, IntentStatus::Other("partially_funded".to_string()));
        assert_eq!(other.as_str(), "partially_funded");
    }

    #[test]
    fn confirmation_and_capture_predicates() {
        assert!(IntentStatus::Succeeded.is_confirmed());
        assert!(IntentStatus::RequiresCapture.is_confirmed());
        assert!(!IntentStatus::RequiresAction.is_confirmed());
        assert!(IntentStatus::Succeeded.is_captured());
        assert!(!IntentStatus::RequiresCapture.is_captured());
    }

    #[test]
    fn intent_status_serializes_as_plain_string() {
        let json = serde_json::to_value(IntentStatus::Canceled).expect("serialize");
        assert_eq!(json, serde_json::json!("canceled"));
    }

    #[test]
    fn gateway_event_type_mapping() {
        let events = [
            ("payment_intent.succeeded", GatewayEventType::PaymentSucceeded),
            ("payment_intent.payment_failed", GatewayEventType::PaymentFailed),
            ("payment_intent.canceled", GatewayEventType::PaymentCanceled),
        ];
        for (raw, expected) in events {
            assert_eq!(GatewayEventType::parse(raw), expected, "event {}", raw);
        }
        assert_eq!(
            GatewayEventType::parse("charge.refunded"),
            GatewayEventType::Unhandled("charge.refunded".to_string())
        );
    }
}
