pub mod error;
pub mod provider;
pub mod providers;
pub mod types;
pub mod utils;
pub mod webhook;

pub use error::{PaymentError, PaymentResult};
pub use provider::PaymentGateway;
pub use providers::StripeGateway;
pub use types::{CreatePaymentRequest, GatewayEventType, IntentStatus, PaymentStatus, WebhookEvent};
