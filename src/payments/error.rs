use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Failures raised by the payment gateway adapter.
///
/// `Gateway` carries an error the processor itself reported (declines,
/// unknown intent, invalid state). `Internal` covers everything else:
/// transport failures, timeouts, undecodable responses. Both render to a
/// single message string for callers; the split only matters for logs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PaymentError {
    #[error("Gateway error: {message}")]
    Gateway {
        message: String,
        code: Option<String>,
        http_status: Option<u16>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Webhook verification failed: {message}")]
    WebhookVerification { message: String },
}

impl PaymentError {
    pub fn gateway(message: impl Into<String>) -> Self {
        PaymentError::Gateway {
            message: message.into(),
            code: None,
            http_status: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PaymentError::Internal {
            message: message.into(),
        }
    }

    pub fn webhook(message: impl Into<String>) -> Self {
        PaymentError::WebhookVerification {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::Gateway { http_status, .. } => {
                matches!(http_status, Some(429) | Some(500..=599))
            }
            PaymentError::Internal { .. } => true,
            PaymentError::Validation { .. } => false,
            PaymentError::WebhookVerification { .. } => false,
        }
    }

    /// True when the processor itself rejected the call.
    pub fn is_gateway_reported(&self) -> bool {
        matches!(self, PaymentError::Gateway { .. })
    }
}
