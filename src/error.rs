//! Error contract of the payment use cases
//!
//! Every use case returns `AppResult<T>`. Callers only see the message; the
//! kind drives log fields, error codes and the retry classification.

use crate::payments::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes for logs and outbound events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    #[serde(rename = "ORDER_NOT_FOUND")]
    OrderNotFound,
    #[serde(rename = "PAYMENT_NOT_FOUND")]
    PaymentNotFound,
    #[serde(rename = "PAYMENT_GATEWAY_ERROR")]
    PaymentGatewayError,
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "MESSAGING_ERROR")]
    MessagingError,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    /// A record the use case depends on is absent
    NotFound { entity: &'static str, id: String },
    /// The payment processor failed or rejected the call
    Gateway {
        reported_by_gateway: bool,
        retryable: bool,
    },
    /// Datastore failure
    Storage { retryable: bool },
    /// Outbound queue failure
    Messaging,
    Validation,
    /// The invocation was cancelled before the operation completed
    Cancelled { operation: String },
    Internal,
}

/// Unified use-case error
#[derive(Debug, Clone, PartialEq)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub message: String,
    pub context: Option<String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        let id = id.into();
        let message = format!("{} not found: {}", entity, id);
        Self::new(AppErrorKind::NotFound { entity, id }, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation, message)
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        let message = format!("Operation cancelled: {}", operation);
        Self::new(AppErrorKind::Cancelled { operation }, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Internal, message)
    }

    /// Get error code for logs and events
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::NotFound { entity, .. } if *entity == "Payment" => {
                ErrorCode::PaymentNotFound
            }
            AppErrorKind::NotFound { .. } => ErrorCode::OrderNotFound,
            AppErrorKind::Gateway { .. } => ErrorCode::PaymentGatewayError,
            AppErrorKind::Storage { .. } => ErrorCode::DatabaseError,
            AppErrorKind::Messaging => ErrorCode::MessagingError,
            AppErrorKind::Validation => ErrorCode::ValidationError,
            AppErrorKind::Cancelled { .. } => ErrorCode::Cancelled,
            AppErrorKind::Internal => ErrorCode::InternalError,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::NotFound { .. } => false,
            AppErrorKind::Gateway { retryable, .. } => *retryable,
            AppErrorKind::Storage { retryable } => *retryable,
            AppErrorKind::Messaging => true,
            AppErrorKind::Validation => false,
            AppErrorKind::Cancelled { .. } => true,
            AppErrorKind::Internal => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

// Note: From<DatabaseError> lives in database/error.rs and
// From<MessagingError> in messaging/mod.rs

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        let kind = match &err {
            PaymentError::Gateway { .. } | PaymentError::Internal { .. } => AppErrorKind::Gateway {
                reported_by_gateway: err.is_gateway_reported(),
                retryable: err.is_retryable(),
            },
            PaymentError::Validation { .. } => AppErrorKind::Validation,
            PaymentError::WebhookVerification { .. } => AppErrorKind::Validation,
        };

        AppError::new(kind, err.to_string())
    }
}

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;
