//! Use cases and webhook handling

pub mod cancel_payment;
pub mod order_mapping;
pub mod query_payment_status;
pub mod start_payment;
pub mod webhook_processor;

use crate::cancellation::CancelSignal;
use crate::error::AppResult;
use async_trait::async_trait;

pub use cancel_payment::{CancelPaymentHandler, CancelPaymentRequest, CancelPaymentResponse};
pub use query_payment_status::{
    QueryPaymentStatusHandler, QueryPaymentStatusRequest, QueryPaymentStatusResponse,
};
pub use start_payment::{StartPaymentHandler, StartPaymentRequest, StartPaymentResponse};
pub use webhook_processor::{WebhookProcessor, WebhookProcessorError, WebhookSettings};

/// One orchestration unit: a request kind in, a response kind out.
#[async_trait]
pub trait UseCase: Send + Sync {
    type Request: Send + 'static;
    type Response: Send + 'static;

    async fn handle(
        &self,
        request: Self::Request,
        cancel: &CancelSignal,
    ) -> AppResult<Self::Response>;
}
