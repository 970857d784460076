use crate::payments::error::{PaymentError, PaymentResult};
use bigdecimal::{BigDecimal, ToPrimitive};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Thin wrapper over `reqwest` for the gateway's form-encoded REST API.
///
/// No retries: redelivery is left to the queue transport.
#[derive(Clone)]
pub struct PaymentHttpClient {
    client: Client,
    timeout: Duration,
}

impl PaymentHttpClient {
    pub fn new(timeout: Duration) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::internal(format!("failed to initialize HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, secret_key: &str) -> PaymentResult<T> {
        let request = self
            .client
            .get(url)
            .timeout(self.timeout)
            .bearer_auth(secret_key);
        Self::execute(request).await
    }

    pub async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        secret_key: &str,
        form: &[(String, String)],
    ) -> PaymentResult<T> {
        let request = self
            .client
            .post(url)
            .timeout(self.timeout)
            .bearer_auth(secret_key)
            .form(form);
        Self::execute(request).await
    }

    async fn execute<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> PaymentResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::internal(format!("gateway request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentError::internal(format!("failed to read gateway response: {}", e)))?;

        if status.is_success() {
            return serde_json::from_str::<T>(&text).map_err(|e| {
                PaymentError::internal(format!("invalid gateway JSON response: {}", e))
            });
        }

        warn!(status = %status, "gateway returned an error response");
        match serde_json::from_str::<GatewayErrorEnvelope>(&text) {
            Ok(envelope) => Err(PaymentError::Gateway {
                message: envelope.error.message,
                code: envelope.error.code,
                http_status: Some(status.as_u16()),
            }),
            Err(_) => Err(PaymentError::Gateway {
                message: format!("HTTP {}: {}", status, text),
                code: None,
                http_status: Some(status.as_u16()),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GatewayErrorEnvelope {
    error: GatewayErrorBody,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Converts major units to the gateway's integer minor units.
///
/// Multiplies by 100 and truncates toward zero: `10.005` becomes `1000`.
pub fn to_minor_units(amount: &BigDecimal) -> PaymentResult<i64> {
    let scaled = (amount.clone() * BigDecimal::from(100)).with_scale(0);
    scaled.to_i64().ok_or_else(|| PaymentError::Validation {
        message: format!("amount out of range: {}", amount),
        field: Some("amount".to_string()),
    })
}

pub fn from_minor_units(minor: i64) -> BigDecimal {
    BigDecimal::new(minor.into(), 2)
}

pub fn verify_hmac_sha256_hex(payload: &[u8], secret: &str, signature: &str) -> bool {
    let computed = match hmac_sha256_hex(payload, secret) {
        Some(v) => v,
        None => return false,
    };
    secure_eq(computed.as_bytes(), signature.trim().as_bytes())
}

pub fn hmac_sha256_hex(payload: &[u8], secret: &str) -> Option<String> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
