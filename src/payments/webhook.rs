//! Stripe webhook signature verification and event decoding.
//!
//! The `Stripe-Signature` header has the form `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`.
//! The signed payload is `"<t>.<raw body>"`, HMAC-SHA256 with the endpoint secret.

use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::{
    GatewayEventType, IntentStatus, WebhookEvent, WebhookVerificationResult,
};
use crate::payments::utils::verify_hmac_sha256_hex;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Clone, PartialEq, Eq)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> PaymentResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = match part.trim().split_once('=') {
            Some(kv) => kv,
            None => continue,
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    PaymentError::webhook(format!("invalid signature timestamp: {}", value))
                })?)
            }
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| PaymentError::webhook("signature header has no timestamp"))?;
    if signatures.is_empty() {
        return Err(PaymentError::webhook("signature header has no v1 signature"));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Checks a webhook signature against `secret`.
///
/// A malformed header is an error; a well-formed header whose signature does
/// not match, or whose timestamp is outside `tolerance_secs`, is reported as
/// `valid: false`. A tolerance of zero disables the timestamp check.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: u64,
    now: DateTime<Utc>,
) -> PaymentResult<WebhookVerificationResult> {
    let parsed = parse_signature_header(header)?;

    let mut signed_payload = format!("{}.", parsed.timestamp).into_bytes();
    signed_payload.extend_from_slice(payload);

    let matched = parsed
        .signatures
        .iter()
        .any(|signature| verify_hmac_sha256_hex(&signed_payload, secret, signature));
    if !matched {
        return Ok(WebhookVerificationResult {
            valid: false,
            reason: Some("no signature matches the expected signature".to_string()),
        });
    }

    if tolerance_secs > 0 {
        let skew = (now.timestamp() - parsed.timestamp).unsigned_abs();
        if skew > tolerance_secs {
            return Ok(WebhookVerificationResult {
                valid: false,
                reason: Some(format!("timestamp outside tolerance ({}s)", skew)),
            });
        }
    }

    Ok(WebhookVerificationResult {
        valid: true,
        reason: None,
    })
}

/// Builds a header value for `payload`, as the gateway would send it.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Option<String> {
    let mut signed_payload = format!("{}.", timestamp).into_bytes();
    signed_payload.extend_from_slice(payload);
    let signature = crate::payments::utils::hmac_sha256_hex(&signed_payload, secret)?;
    Some(format!("t={},v1={}", timestamp, signature))
}

pub fn parse_event(payload: &[u8]) -> PaymentResult<WebhookEvent> {
    let parsed: JsonValue = serde_json::from_slice(payload)
        .map_err(|e| PaymentError::webhook(format!("invalid webhook JSON payload: {}", e)))?;

    let event_type = parsed
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PaymentError::webhook("webhook payload has no event type"))?;
    let event_id = parsed
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let created_at = parsed
        .get("created")
        .and_then(|v| v.as_i64())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);

    let object = parsed.get("data").and_then(|v| v.get("object"));
    let payment_intent_id = object
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());
    let status = object
        .and_then(|v| v.get("status"))
        .and_then(|v| v.as_str())
        .map(IntentStatus::parse);
    let metadata = object
        .and_then(|v| v.get("metadata"))
        .and_then(|v| v.as_object())
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    Ok(WebhookEvent {
        event_id,
        event_type: GatewayEventType::parse(event_type),
        payment_intent_id,
        status,
        metadata,
        created_at,
        payload: parsed,
    })
}
