use crate::error::{AppError, AppErrorKind};
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseErrorKind {
    /// Request rejected or failed inside the datastore
    Query,
    /// No response within the configured operation timeout
    Timeout,
    /// Could not reach the datastore
    Unavailable,
    /// A stored item could not be mapped to or from its record type
    Serialization,
}

impl fmt::Display for DatabaseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DatabaseErrorKind::Query => "query failed",
            DatabaseErrorKind::Timeout => "timed out",
            DatabaseErrorKind::Unavailable => "unavailable",
            DatabaseErrorKind::Serialization => "invalid item",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Database {kind}: {message}")]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    pub message: String,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(DatabaseErrorKind::Serialization, message)
    }

    /// Maps an SDK failure, keeping the full error chain in the message.
    pub fn from_sdk<E, R>(operation: &str, err: SdkError<E, R>) -> Self
    where
        E: std::error::Error + 'static,
        R: fmt::Debug,
    {
        let kind = match &err {
            SdkError::TimeoutError(_) => DatabaseErrorKind::Timeout,
            SdkError::DispatchFailure(_) => DatabaseErrorKind::Unavailable,
            _ => DatabaseErrorKind::Query,
        };
        Self::new(
            kind,
            format!("DynamoDB {} failed: {}", operation, DisplayErrorContext(&err)),
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            DatabaseErrorKind::Timeout | DatabaseErrorKind::Unavailable
        )
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::new(
            AppErrorKind::Storage {
                retryable: err.is_retryable(),
            },
            err.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_retryable() {
        let err = DatabaseError::new(DatabaseErrorKind::Timeout, "get_item");
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Database timed out: get_item");
    }

    #[test]
    fn test_serialization_maps_to_storage_error() {
        let app: AppError = DatabaseError::serialization("missing attribute Id").into();
        assert_eq!(app.kind, AppErrorKind::Storage { retryable: false });
        assert!(app.message.contains("missing attribute Id"));
    }
}
