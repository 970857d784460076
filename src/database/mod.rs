pub mod error;
pub mod models;
pub mod order_repository;
pub mod payment_repository;

use crate::config::AwsConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use tracing::info;

pub use error::{DatabaseError, DatabaseErrorKind};
pub use models::{Order, OrderDetails, PaymentRecord};
pub use order_repository::{DynamoOrderRepository, OrderRepository};
pub use payment_repository::{DynamoPaymentRepository, PaymentRepository};

/// Loads shared AWS settings with the configured region and per-operation timeout.
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    let timeouts = TimeoutConfig::builder()
        .operation_timeout(config.operation_timeout())
        .build();

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(timeouts);
    if let Some(region) = &config.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    loader.load().await
}

/// DynamoDB client, honouring a local endpoint override.
pub fn dynamodb_client(sdk_config: &SdkConfig, config: &AwsConfig) -> aws_sdk_dynamodb::Client {
    match &config.dynamodb_endpoint_url {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "using DynamoDB endpoint override");
            let dynamo_config = aws_sdk_dynamodb::config::Builder::from(sdk_config)
                .endpoint_url(endpoint)
                .build();
            aws_sdk_dynamodb::Client::from_conf(dynamo_config)
        }
        None => aws_sdk_dynamodb::Client::new(sdk_config),
    }
}
