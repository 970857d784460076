use crate::payments::error::PaymentResult;
use crate::payments::types::{CreatePaymentRequest, PaymentStatus};
use async_trait::async_trait;

/// Port to the external payment processor.
///
/// Every operation is a single round trip; implementations translate any
/// processor or transport failure into a `PaymentError` and never panic.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent and returns its id.
    async fn create_payment(&self, request: &CreatePaymentRequest) -> PaymentResult<String>;

    async fn get_payment_status(&self, payment_intent_id: &str) -> PaymentResult<PaymentStatus>;

    /// Cancels an intent. The processor always receives the fixed
    /// `requested_by_customer` reason.
    async fn cancel_payment(&self, payment_intent_id: &str) -> PaymentResult<bool>;

    async fn confirm_payment(
        &self,
        payment_intent_id: &str,
        payment_method_id: &str,
    ) -> PaymentResult<bool>;

    async fn capture_payment(&self, payment_intent_id: &str) -> PaymentResult<bool>;

    fn name(&self) -> &'static str;
}
