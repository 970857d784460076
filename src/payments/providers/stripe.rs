use crate::config::GatewayConfig;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::PaymentGateway;
use crate::payments::types::{CreatePaymentRequest, IntentStatus, PaymentStatus};
use crate::payments::utils::{from_minor_units, to_minor_units, PaymentHttpClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{error, info};

const CANCELLATION_REASON: &str = "requested_by_customer";

/// Stripe PaymentIntents adapter.
///
/// Intents are created with manual capture and manual confirmation so the
/// order flow decides when funds are confirmed and captured.
pub struct StripeGateway {
    config: GatewayConfig,
    http: PaymentHttpClient,
}

impl StripeGateway {
    pub fn new(config: GatewayConfig) -> PaymentResult<Self> {
        if config.secret_key.trim().is_empty() {
            return Err(PaymentError::Validation {
                message: "stripe secret key is not configured".to_string(),
                field: Some("STRIPE_SECRET_KEY".to_string()),
            });
        }
        let http = PaymentHttpClient::new(config.timeout())?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn ensure_intent_id(payment_intent_id: &str) -> PaymentResult<&str> {
        let trimmed = payment_intent_id.trim();
        if trimmed.is_empty() {
            return Err(PaymentError::Validation {
                message: "payment intent id is required".to_string(),
                field: Some("payment_intent_id".to_string()),
            });
        }
        Ok(trimmed)
    }

    fn create_form(request: &CreatePaymentRequest, amount: i64) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), request.currency.to_lowercase()),
            ("description".to_string(), request.description.clone()),
            ("capture_method".to_string(), "manual".to_string()),
            ("confirmation_method".to_string(), "manual".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("payment_method_types[1]".to_string(), "boleto".to_string()),
        ];
        if !request.receipt_email.trim().is_empty() {
            form.push(("receipt_email".to_string(), request.receipt_email.clone()));
        }

        let mut metadata = BTreeMap::new();
        metadata.insert("id_pedido".to_string(), request.order_id.clone());
        metadata.insert("nome_cliente".to_string(), request.customer_name.clone());
        // caller-supplied keys override the base pair
        for (key, value) in &request.metadata {
            metadata.insert(key.clone(), value.clone());
        }
        for (key, value) in metadata {
            form.push((format!("metadata[{}]", key), value));
        }
        form
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment(&self, request: &CreatePaymentRequest) -> PaymentResult<String> {
        let amount = to_minor_units(&request.amount)?;
        if amount <= 0 {
            return Err(PaymentError::Validation {
                message: format!("amount must be positive, got {}", request.amount),
                field: Some("amount".to_string()),
            });
        }

        let form = Self::create_form(request, amount);
        let intent: StripePaymentIntent = self
            .http
            .post_form(
                &self.endpoint("/v1/payment_intents"),
                &self.config.secret_key,
                &form,
            )
            .await
            .map_err(|e| {
                error!(order_id = %request.order_id, error = %e, "failed to create stripe payment intent");
                e
            })?;

        info!(
            payment_intent_id = %intent.id,
            order_id = %request.order_id,
            "stripe payment intent created"
        );
        Ok(intent.id)
    }

    async fn get_payment_status(&self, payment_intent_id: &str) -> PaymentResult<PaymentStatus> {
        let id = Self::ensure_intent_id(payment_intent_id)?;
        let intent: StripePaymentIntent = self
            .http
            .get_json(
                &self.endpoint(&format!("/v1/payment_intents/{}", id)),
                &self.config.secret_key,
            )
            .await
            .map_err(|e| {
                error!(payment_intent_id = %id, error = %e, "failed to fetch stripe payment intent");
                e
            })?;

        Ok(intent.into_status())
    }

    async fn cancel_payment(&self, payment_intent_id: &str) -> PaymentResult<bool> {
        let id = Self::ensure_intent_id(payment_intent_id)?;
        let form = vec![(
            "cancellation_reason".to_string(),
            CANCELLATION_REASON.to_string(),
        )];
        let intent: StripePaymentIntent = self
            .http
            .post_form(
                &self.endpoint(&format!("/v1/payment_intents/{}/cancel", id)),
                &self.config.secret_key,
                &form,
            )
            .await
            .map_err(|e| {
                error!(payment_intent_id = %id, error = %e, "failed to cancel stripe payment intent");
                e
            })?;

        info!(payment_intent_id = %id, status = %intent.status, "stripe payment intent cancelled");
        Ok(true)
    }

    async fn confirm_payment(
        &self,
        payment_intent_id: &str,
        payment_method_id: &str,
    ) -> PaymentResult<bool> {
        let id = Self::ensure_intent_id(payment_intent_id)?;
        let form = vec![
            ("payment_method".to_string(), payment_method_id.to_string()),
            ("return_url".to_string(), self.config.return_url.clone()),
        ];
        let intent: StripePaymentIntent = self
            .http
            .post_form(
                &self.endpoint(&format!("/v1/payment_intents/{}/confirm", id)),
                &self.config.secret_key,
                &form,
            )
            .await
            .map_err(|e| {
                error!(payment_intent_id = %id, error = %e, "failed to confirm stripe payment intent");
                e
            })?;

        info!(payment_intent_id = %id, status = %intent.status, "stripe payment intent confirmed");
        Ok(intent.status.is_confirmed())
    }

    async fn capture_payment(&self, payment_intent_id: &str) -> PaymentResult<bool> {
        let id = Self::ensure_intent_id(payment_intent_id)?;
        let intent: StripePaymentIntent = self
            .http
            .post_form(
                &self.endpoint(&format!("/v1/payment_intents/{}/capture", id)),
                &self.config.secret_key,
                &[],
            )
            .await
            .map_err(|e| {
                error!(payment_intent_id = %id, error = %e, "failed to capture stripe payment intent");
                e
            })?;

        info!(payment_intent_id = %id, status = %intent.status, "stripe payment intent captured");
        Ok(intent.status.is_captured())
    }

    fn name(&self) -> &'static str {
        "stripe"
    }
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    status: IntentStatus,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl StripePaymentIntent {
    fn into_status(self) -> PaymentStatus {
        let created_at = self
            .created
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);

        PaymentStatus {
            payment_intent_id: self.id,
            status: self.status,
            amount: from_minor_units(self.amount),
            currency: self.currency,
            created_at,
            confirmed_at: None,
            metadata: self.metadata,
        }
    }
}
