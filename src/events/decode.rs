//! Per-event decoding of message bodies.
//!
//! Identifying fields are required and reported when missing or malformed.
//! Dates and the cancellation reason are lenient: a missing or unparseable
//! value falls back to a default and is reported as a [`FieldWarning`].

use crate::events::{EventKind, PaymentCommand};
use crate::services::cancel_payment::DEFAULT_CANCELLATION_REASON;
use crate::services::{CancelPaymentRequest, QueryPaymentStatusRequest, StartPaymentRequest};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub type Body = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("message body is not a JSON object: {0}")]
    InvalidBody(String),

    #[error("invalid {event} message, missing or invalid fields: {}", .fields.join(", "))]
    InvalidFields {
        event: &'static str,
        fields: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCommand {
    pub command: PaymentCommand,
    pub warnings: Vec<FieldWarning>,
}

pub fn parse_body(raw: &str) -> Result<Body, DecodeError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DecodeError::InvalidBody(format!(
            "expected an object, got {}",
            json_type(&other)
        ))),
        Err(e) => Err(DecodeError::InvalidBody(e.to_string())),
    }
}

/// Decodes `body` into the command for `kind`. `now` is the fallback for
/// missing dates.
pub fn decode_command(
    kind: EventKind,
    body: &Body,
    now: DateTime<Utc>,
) -> Result<DecodedCommand, DecodeError> {
    let mut warnings = Vec::new();
    let mut invalid = Vec::new();

    let command = match kind {
        EventKind::StartPayment => {
            let order_id = required_text(body, "idPedido", &mut invalid);
            let status = optional_text(body, "status", &mut warnings);
            let order_date = date_field(body, "dataPedido", &mut warnings);
            let event_time = datetime_field(body, "dataHoraEvento", &mut warnings);
            let metadata = metadata_field(body, "metadados", &mut warnings);

            PaymentCommand::Start(StartPaymentRequest {
                order_id: order_id.unwrap_or_default(),
                status,
                order_date_defaulted: order_date.is_none(),
                order_date: order_date.unwrap_or_else(|| now.date_naive()),
                event_time: event_time.unwrap_or(now),
                metadata,
            })
        }
        EventKind::QueryPayment => {
            let payment_intent_id = required_text(body, "paymentIntentId", &mut invalid);
            PaymentCommand::Query(QueryPaymentStatusRequest {
                payment_intent_id: payment_intent_id.unwrap_or_default(),
            })
        }
        EventKind::CancelPayment => {
            let payment_intent_id = required_text(body, "paymentIntentId", &mut invalid);
            let reason = optional_text(body, "motivoCancelamento", &mut warnings);
            if reason.is_none() {
                warnings.push(FieldWarning {
                    field: "motivoCancelamento",
                    reason: format!("defaulted to '{}'", DEFAULT_CANCELLATION_REASON),
                });
            }
            PaymentCommand::Cancel(CancelPaymentRequest {
                payment_intent_id: payment_intent_id.unwrap_or_default(),
                reason: reason.unwrap_or_else(|| DEFAULT_CANCELLATION_REASON.to_string()),
            })
        }
    };

    if !invalid.is_empty() {
        return Err(DecodeError::InvalidFields {
            event: kind.as_str(),
            fields: invalid,
        });
    }

    Ok(DecodedCommand { command, warnings })
}

enum Text {
    Missing,
    Invalid(&'static str),
    Present(String),
}

/// Numbers are accepted and rendered as text.
fn raw_text(body: &Body, field: &str) -> Text {
    match body.get(field) {
        None | Some(Value::Null) => Text::Missing,
        Some(Value::String(s)) => Text::Present(s.clone()),
        Some(Value::Number(n)) => Text::Present(n.to_string()),
        Some(other) => Text::Invalid(json_type(other)),
    }
}

/// Like [`raw_text`] but trimmed; a blank string counts as missing.
fn text(body: &Body, field: &str) -> Text {
    match raw_text(body, field) {
        Text::Present(s) if s.trim().is_empty() => Text::Missing,
        Text::Present(s) => Text::Present(s.trim().to_string()),
        other => other,
    }
}

fn required_text(body: &Body, field: &'static str, invalid: &mut Vec<String>) -> Option<String> {
    match text(body, field) {
        Text::Present(value) => Some(value),
        Text::Missing => {
            invalid.push(field.to_string());
            None
        }
        Text::Invalid(kind) => {
            invalid.push(format!("{} ({})", field, kind));
            None
        }
    }
}

/// Passed through untouched; only an absent or null value is missing.
fn optional_text(
    body: &Body,
    field: &'static str,
    warnings: &mut Vec<FieldWarning>,
) -> Option<String> {
    match raw_text(body, field) {
        Text::Present(value) => Some(value),
        Text::Missing => None,
        Text::Invalid(kind) => {
            warnings.push(FieldWarning {
                field,
                reason: format!("ignored {} value", kind),
            });
            None
        }
    }
}

fn date_field(
    body: &Body,
    field: &'static str,
    warnings: &mut Vec<FieldWarning>,
) -> Option<NaiveDate> {
    let parsed = match text(body, field) {
        Text::Present(raw) => parse_date(&raw).ok_or(raw),
        Text::Missing => Err(String::new()),
        Text::Invalid(kind) => Err(kind.to_string()),
    };
    match parsed {
        Ok(date) => Some(date),
        Err(raw) => {
            warnings.push(FieldWarning {
                field,
                reason: defaulted_reason(&raw),
            });
            None
        }
    }
}

fn datetime_field(
    body: &Body,
    field: &'static str,
    warnings: &mut Vec<FieldWarning>,
) -> Option<DateTime<Utc>> {
    let parsed = match text(body, field) {
        Text::Present(raw) => parse_datetime(&raw).ok_or(raw),
        Text::Missing => Err(String::new()),
        Text::Invalid(kind) => Err(kind.to_string()),
    };
    match parsed {
        Ok(value) => Some(value),
        Err(raw) => {
            warnings.push(FieldWarning {
                field,
                reason: defaulted_reason(&raw),
            });
            None
        }
    }
}

fn defaulted_reason(raw: &str) -> String {
    if raw.is_empty() {
        "missing, defaulted to now".to_string()
    } else {
        format!("unparseable '{}', defaulted to now", raw)
    }
}

fn metadata_field(
    body: &Body,
    field: &'static str,
    warnings: &mut Vec<FieldWarning>,
) -> BTreeMap<String, String> {
    let object = match body.get(field) {
        None | Some(Value::Null) => return BTreeMap::new(),
        Some(Value::Object(object)) => object,
        Some(other) => {
            warnings.push(FieldWarning {
                field,
                reason: format!("ignored {} value", json_type(other)),
            });
            return BTreeMap::new();
        }
    };

    let mut metadata = BTreeMap::new();
    for (key, value) in object {
        match value {
            Value::String(s) => {
                metadata.insert(key.clone(), s.clone());
            }
            Value::Number(_) | Value::Bool(_) => {
                metadata.insert(key.clone(), value.to_string());
            }
            _ => warnings.push(FieldWarning {
                field,
                reason: format!("ignored non-scalar entry '{}'", key),
            }),
        }
    }
    metadata
}

/// Accepts `YYYY-MM-DD`, RFC 3339 and naive `YYYY-MM-DDTHH:MM:SS` values.
/// An offset timestamp keeps the calendar date of its own offset.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    parse_datetime(raw).map(|dt| dt.date_naive())
}

/// Naive values are taken as UTC; a plain date means midnight UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
